//! ReportSynthesis entity - Sintesi AI di un referto rispetto allo storico (cache)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ReportSynthesis {
    pub report_id: Uuid,
    pub status_summary: String,
    pub key_trends: Vec<String>,
    pub doctor_precis: String,
    pub generated_at: DateTime<Utc>,
}
