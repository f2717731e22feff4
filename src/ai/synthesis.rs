//! Sintesi di un referto rispetto allo storico dell'utente

use super::prompts::{SYNTHESIS_SYSTEM_PROMPT, synthesis_user_prompt};
use super::{ChatTurn, CompletionRequest, LanguageModel, LlmError, parse_json_reply};
use crate::entities::{Report, ReportParameter};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument};

pub const FALLBACK_STATUS_SUMMARY: &str = "Could not generate synthesis.";
pub const FALLBACK_DOCTOR_PRECIS: &str = "AI Synthesis unavailable.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    #[serde(default = "default_summary")]
    pub status_summary: String,
    #[serde(default)]
    pub key_trends: Vec<String>,
    #[serde(default = "default_precis")]
    pub doctor_precis: String,
}

fn default_summary() -> String {
    FALLBACK_STATUS_SUMMARY.to_string()
}

fn default_precis() -> String {
    FALLBACK_DOCTOR_PRECIS.to_string()
}

/// Versione compatta di un referto: d=data, t=tipo, p=parametri (n, v, u, f)
pub fn minify_report(report: &Report, parameters: &[ReportParameter]) -> Value {
    let date = report
        .date
        .clone()
        .unwrap_or_else(|| report.created_at.date_naive().to_string());
    json!({
        "d": date,
        "t": report.report_type,
        "p": parameters
            .iter()
            .map(|p| json!({ "n": p.name, "v": p.value, "u": p.unit, "f": p.flag }))
            .collect::<Vec<_>>(),
    })
}

/// Chiede al modello la sintesi del referto corrente alla luce dello storico.
///
/// Gli errori sono propagati: il chiamante decide se salvare o meno il risultato.
#[instrument(skip_all, fields(report_id = %current.0.id, history = history.len(), model = llm.name()))]
pub async fn generate_synthesis(
    llm: &dyn LanguageModel,
    current: (&Report, &[ReportParameter]),
    history: &[(Report, Vec<ReportParameter>)],
) -> Result<SynthesisResult, LlmError> {
    let current_json = minify_report(current.0, current.1).to_string();
    let history_json = Value::Array(
        history
            .iter()
            .map(|(report, params)| minify_report(report, params))
            .collect(),
    )
    .to_string();

    let request = CompletionRequest::new(vec![ChatTurn::user(synthesis_user_prompt(
        &current_json,
        &history_json,
    ))])
    .with_system(SYNTHESIS_SYSTEM_PROMPT)
    .with_temperature(0.3)
    .with_max_tokens(1000)
    .json();

    let reply = llm.complete(request).await?;
    let result: SynthesisResult = parse_json_reply(&reply)?;
    info!("Synthesis generated with {} trends", result.key_trends.len());
    Ok(result)
}
