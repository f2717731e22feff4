//! Spiegazioni educative dei parametri, generate con una sola chiamata per referto

use super::prompts::{BATCH_EXPLANATION_SYSTEM_PROMPT, FORBIDDEN_PHRASES, batch_explanation_prompt};
use super::{ChatTurn, CompletionRequest, LanguageModel, LlmError, strip_code_fences};
use crate::entities::ParameterFlag;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const DEFAULT_WHAT: &str = "This test measures a health parameter.";
pub const DEFAULT_MEANING: &str = "Your result is within normal range.";
pub const CONSULT_DOCTOR: &str = "Consult your doctor for personalized medical advice.";
const SAFE_REPLACEMENT: &str = "may indicate";

lazy_static! {
    static ref FORBIDDEN: Regex = Regex::new(&format!(
        "(?i){}",
        FORBIDDEN_PHRASES
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .unwrap();
}

/// Parametro da spiegare, serializzato così com'è nel prompt
#[derive(Debug, Clone, Serialize)]
pub struct ExplanationInput {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "range")]
    pub normal_range: Option<String>,
    pub flag: ParameterFlag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub what: String,
    pub meaning: String,
    pub causes: Vec<String>,
    pub next_steps: Vec<String>,
}

impl Explanation {
    /// Spiegazione deterministica usata quando il modello non risponde
    pub fn fallback(name: &str, flag: ParameterFlag) -> Self {
        let range = if flag.is_abnormal() {
            "outside normal range"
        } else {
            "within normal range"
        };
        Self {
            what: format!("{name} is a medical test parameter that measures specific health indicators."),
            meaning: format!("Your result is {range}. Please consult your doctor for interpretation."),
            causes: Vec::new(),
            next_steps: vec![
                CONSULT_DOCTOR.to_string(),
                "Review your medical history with a healthcare provider.".to_string(),
            ],
        }
    }
}

/// Genera una spiegazione per ogni parametro, nello stesso ordine dell'input.
///
/// Non fallisce mai: se la chiamata o il parsing falliscono tutti i parametri ricevono
/// la spiegazione di fallback, e lo stesso vale per i parametri senza corrispondenza.
#[instrument(skip_all, fields(parameters = parameters.len(), model = llm.name()))]
pub async fn generate_report_explanations(
    llm: &dyn LanguageModel,
    parameters: &[ExplanationInput],
) -> Vec<Explanation> {
    if parameters.is_empty() {
        return Vec::new();
    }

    let items = match request_items(llm, parameters).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Batch explanation failed, using fallbacks: {}", e);
            Vec::new()
        }
    };
    info!("Model returned {} explanation items", items.len());

    parameters
        .iter()
        .enumerate()
        .map(|(index, param)| match find_item(&items, &param.name, index) {
            Some(item) => validate_explanation(item, param.flag),
            None => Explanation::fallback(&param.name, param.flag),
        })
        .collect()
}

async fn request_items(
    llm: &dyn LanguageModel,
    parameters: &[ExplanationInput],
) -> Result<Vec<Value>, LlmError> {
    let params_json = serde_json::to_string(parameters)?;
    let request = CompletionRequest::new(vec![ChatTurn::user(batch_explanation_prompt(&params_json))])
        .with_system(BATCH_EXPLANATION_SYSTEM_PROMPT)
        .with_temperature(0.3)
        .with_max_tokens(4096)
        .json();

    let reply = llm.complete(request).await?;
    let value: Value = serde_json::from_str(strip_code_fences(&reply))?;
    Ok(extract_items(value))
}

/// Accetta un array nudo oppure un oggetto che contiene un array
fn extract_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Corrispondenza per nome; un elemento senza nome viene associato per posizione
fn find_item<'a>(items: &'a [Value], name: &str, index: usize) -> Option<&'a Value> {
    let wanted = normalize(name);
    items
        .iter()
        .find(|item| {
            item.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| normalize(n) == wanted)
        })
        .or_else(|| {
            items
                .get(index)
                .filter(|item| item.is_object() && item.get("name").is_none())
        })
}

fn string_field(item: &Value, key: &str, default: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn list_field(item: &Value, key: &str) -> Vec<String> {
    match item.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Completa i campi mancanti e applica le regole di sicurezza
pub fn validate_explanation(item: &Value, flag: ParameterFlag) -> Explanation {
    let mut next_steps: Vec<String> = list_field(item, "next_steps")
        .iter()
        .map(|s| sanitize_text(s))
        .collect();

    if flag.is_abnormal() && !next_steps.join(" ").to_lowercase().contains("consult") {
        next_steps.push(CONSULT_DOCTOR.to_string());
    }

    Explanation {
        what: sanitize_text(&string_field(item, "what", DEFAULT_WHAT)),
        meaning: sanitize_text(&string_field(item, "meaning", DEFAULT_MEANING)),
        causes: list_field(item, "causes"),
        next_steps,
    }
}

/// Sostituisce le frasi diagnostiche, senza distinzione tra maiuscole e minuscole
pub fn sanitize_text(text: &str) -> String {
    FORBIDDEN.replace_all(text, SAFE_REPLACEMENT).into_owned()
}
