//! Premium services - Stato dell'abbonamento e limiti del piano gratuito

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::PremiumStatusDTO;
use axum::{
    Extension,
    extract::{Json, State},
};
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const FREE_TIER: &str = "free";

/// Inizio del mese solare corrente (UTC), da cui si contano i referti del piano gratuito
pub(crate) fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    date.with_day(1)
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

pub(crate) async fn is_premium(state: &AppState, user_id: &Uuid) -> Result<bool, AppError> {
    Ok(state.subscription.find_active(user_id).await?.is_some())
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_premium_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<PremiumStatusDTO>, AppError> {
    debug!("Loading premium status");
    let subscription = state.subscription.find_active(&current_user.id).await?;
    let reports_used = state
        .report
        .count_since(&current_user.id, month_start(Utc::now()))
        .await?;
    let family_count = state.family.count_connected(&current_user.id).await?;

    let is_premium = subscription.is_some();
    let limits = (!is_premium).then_some((
        state.config.free_tier_reports_per_month,
        state.config.free_tier_family_members,
    ));

    Ok(Json(PremiumStatusDTO {
        is_premium,
        subscription_tier: subscription
            .as_ref()
            .map(|s| s.tier.clone())
            .unwrap_or_else(|| FREE_TIER.to_string()),
        expires_at: subscription.and_then(|s| s.expires_at),
        reports_used_this_month: reports_used,
        reports_limit: limits.map(|l| l.0),
        family_members_count: family_count,
        family_members_limit: limits.map(|l| l.1),
    }))
}
