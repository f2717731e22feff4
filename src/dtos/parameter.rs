//! Parameter DTOs - Data Transfer Objects per parametri e spiegazioni

use crate::entities::{ParameterFlag, ReportExplanation, ReportParameter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateParameterDTO {
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub flag: ParameterFlag,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateExplanationDTO {
    pub parameter_id: Uuid,
    pub what: String,
    pub meaning: String,
    pub causes: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Parametro con la spiegazione incorporata, come atteso dal client
#[derive(Serialize, Debug)]
pub struct ParameterDTO {
    pub id: Uuid,
    pub report_id: Uuid,
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    /// Alias di `normal_range`
    pub range: Option<String>,
    pub flag: ParameterFlag,
    pub is_critical: bool,
    pub created_at: DateTime<Utc>,
    pub explanation: Option<ReportExplanation>,
}

impl ParameterDTO {
    pub fn new(parameter: ReportParameter, explanation: Option<ReportExplanation>) -> Self {
        Self {
            id: parameter.id,
            report_id: parameter.report_id,
            name: parameter.name,
            value: parameter.value,
            unit: parameter.unit,
            range: parameter.normal_range.clone(),
            normal_range: parameter.normal_range,
            flag: parameter.flag,
            is_critical: parameter.is_critical,
            created_at: parameter.created_at,
            explanation,
        }
    }
}
