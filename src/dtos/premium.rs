//! Premium DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct PremiumStatusDTO {
    pub is_premium: bool,
    pub subscription_tier: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub reports_used_this_month: i64,
    /// `None` per gli utenti premium (illimitati)
    pub reports_limit: Option<i64>,
    pub family_members_count: i64,
    pub family_members_limit: Option<i64>,
}
