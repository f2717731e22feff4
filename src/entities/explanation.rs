//! ReportExplanation entity - Spiegazione divulgativa di un parametro

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ReportExplanation {
    pub id: Uuid,
    pub parameter_id: Uuid,
    pub what: String,
    pub meaning: String,
    pub causes: Vec<String>,
    pub next_steps: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
