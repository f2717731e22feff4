//! Report entity - Referto caricato dall'utente

use super::enums::{FlagLevel, ReportStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub report_type: String,
    pub lab_name: Option<String>,
    /// Data riportata sul referto, così come letta (preferibilmente YYYY-MM-DD)
    pub date: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<String>,
    pub patient_gender: Option<String>,
    pub status: ReportStatus,
    pub flag_level: FlagLevel,
    /// Avanzamento dell'elaborazione, 0-100
    pub progress: i32,
    pub error_message: Option<String>,
    /// Path dell'oggetto nello storage (`{user_id}/{report_id}.{ext}`)
    pub image_url: Option<String>,
    pub uploaded_to_abdm: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
