//! Query DTOs - Data Transfer Objects per query string

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Finestra temporale per il filtro dei referti
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Istante minimo di `created_at`, `None` per `all`
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::Quarter => Some(now - Duration::days(90)),
            Self::All => None,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// DTO per query parameters della lista referti
#[derive(Deserialize, Debug, Validate)]
pub struct ReportListQuery {
    pub search: Option<String>,
    pub report_type: Option<String>,
    pub flag_level: Option<String>,
    #[serde(default)]
    pub time_range: TimeRange,
    pub target_user_id: Option<Uuid>,
    /// limitata: `page * limit` non deve andare in overflow
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 10_000, message = "Page must be between 1 and 10000"))]
    pub page: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: i64,
}

/// Query string dell'upload (`?report_type=`)
#[derive(Deserialize, Debug, Default)]
pub struct UploadQuery {
    pub report_type: Option<String>,
}

fn default_admin_limit() -> i64 {
    50
}

#[derive(Deserialize, Debug, Validate)]
pub struct AllReportsQuery {
    #[serde(default = "default_admin_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: i64,
}
