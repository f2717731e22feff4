//! Assistente conversazionale sui referti
//!
//! Due percorsi: `reply` per la chat storica (cronologia salvata) e `ask` per MediBot
//! (domanda singola con contesto JSON completo del referto). Entrambi restituiscono
//! sempre un testo: errori del modello diventano risposte fisse.

use super::prompts::{
    CHATBOT_ERROR_RESPONSE, CHATBOT_STOP_WORDS, MEDIBOT_ERROR_RESPONSE, MEDIBOT_REFUSAL_RESPONSE,
    MEDIBOT_SYSTEM_PROMPT, chatbot_system_prompt, contains_forbidden_phrase, is_diagnosis_request,
    is_unsafe_question, refusal_for,
};
use super::{ChatTurn, CompletionRequest, LanguageModel};
use crate::entities::{Report, ReportExplanation, ReportParameter};
use serde_json::json;
use tracing::{info, instrument, warn};

/// Turni di cronologia inviati al modello
pub const HISTORY_WINDOW: usize = 5;

/// Parametri elencati nel riepilogo del prompt di chat
const SUMMARY_PARAMETERS: usize = 5;

pub struct ChatAssistant<'a> {
    llm: &'a dyn LanguageModel,
}

impl<'a> ChatAssistant<'a> {
    pub fn new(llm: &'a dyn LanguageModel) -> Self {
        Self { llm }
    }

    #[instrument(skip_all, fields(model = self.llm.name(), history = history.len()))]
    pub async fn reply(
        &self,
        message: &str,
        report_type: &str,
        parameters_summary: &str,
        history: &[ChatTurn],
    ) -> String {
        if is_diagnosis_request(message) {
            info!("Diagnosis or treatment request refused");
            return refusal_for(message).to_string();
        }

        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let mut turns: Vec<ChatTurn> = history[start..].to_vec();
        turns.push(ChatTurn::user(message));

        let request = CompletionRequest::new(turns)
            .with_system(chatbot_system_prompt(report_type, parameters_summary))
            .with_temperature(0.7)
            .with_max_tokens(300)
            .with_stop(&CHATBOT_STOP_WORDS);

        match self.llm.complete(request).await {
            Ok(text) if contains_forbidden_phrase(&text) => {
                warn!("Model reply contained diagnostic language, replaced with refusal");
                refusal_for(message).to_string()
            }
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Chat completion failed: {}", e);
                CHATBOT_ERROR_RESPONSE.to_string()
            }
        }
    }

    #[instrument(skip_all, fields(model = self.llm.name(), report_id = %report.id))]
    pub async fn ask(
        &self,
        question: &str,
        report: &Report,
        parameters: &[ReportParameter],
        explanations: &[ReportExplanation],
    ) -> String {
        if is_unsafe_question(question) {
            info!("Unsafe MediBot question refused");
            return MEDIBOT_REFUSAL_RESPONSE.to_string();
        }

        let context = report_context(report, parameters, explanations);
        let prompt = format!("CONTEXT:\n{context}\n\nUser Question: {question}");
        let request = CompletionRequest::new(vec![ChatTurn::user(prompt)])
            .with_system(MEDIBOT_SYSTEM_PROMPT)
            .with_temperature(0.4)
            .with_max_tokens(800);

        match self.llm.complete(request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("MediBot completion failed: {}", e);
                MEDIBOT_ERROR_RESPONSE.to_string()
            }
        }
    }
}

/// Nomi dei primi parametri, usati nel prompt di sistema della chat
pub fn parameters_summary(parameters: &[ReportParameter]) -> String {
    parameters
        .iter()
        .take(SUMMARY_PARAMETERS)
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Contesto JSON del referto per MediBot
pub fn report_context(
    report: &Report,
    parameters: &[ReportParameter],
    explanations: &[ReportExplanation],
) -> String {
    let params: Vec<_> = parameters
        .iter()
        .map(|p| {
            let mut item = json!({
                "name": p.name,
                "value": p.value,
                "unit": p.unit,
                "ref_range": p.normal_range,
                "flag": p.flag,
            });
            if let Some(exp) = explanations.iter().find(|e| e.parameter_id == p.id) {
                item["explanation_meaning"] = json!(exp.meaning);
            }
            item
        })
        .collect();

    let context = json!({
        "report_metadata": {
            "type": report.report_type,
            "date": report.date,
            "lab": report.lab_name,
            "overall_flag": report.flag_level,
        },
        "parameters": params,
    });
    serde_json::to_string_pretty(&context).unwrap_or_else(|_| context.to_string())
}
