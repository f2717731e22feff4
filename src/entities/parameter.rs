//! ReportParameter entity - Singolo valore di laboratorio estratto da un referto

use super::enums::ParameterFlag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ReportParameter {
    pub id: Uuid,
    pub report_id: Uuid,
    pub name: String,
    // il valore resta testuale: alcuni referti riportano "Positive", "< 0.5", ...
    pub value: String,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub flag: ParameterFlag,
    pub is_critical: bool,
    pub created_at: DateTime<Utc>,
}
