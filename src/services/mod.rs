//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod admin;
pub mod chat;
pub mod chatbot;
pub mod family;
pub mod premium;
pub mod report;

// Re-exports per facilitare l'import
pub use admin::{
    admin_delete_report, admin_upload_report, list_all_reports, list_user_reports, list_users,
};
pub use chat::{get_chat_history, send_message};
pub use chatbot::ask_chatbot;
pub use family::{accept_invite, invite_member, list_members, list_pending, remove_connection};
pub use premium::get_premium_status;
pub use report::{
    compare_reports, delete_report, generate_synthesis, get_explanations, get_parameters,
    get_report, get_report_status, get_synthesis, list_reports, upload_report,
};

use crate::AppState;
use crate::core::{AppError, AuthUser};
use crate::entities::Report;
use crate::repositories::Read;
use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Root endpoint
pub async fn root(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "MediGuide API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Referto leggibile dall'utente: il proprietario oppure un familiare collegato.
/// Chi non ha accesso riceve 404, così da non rivelare l'esistenza del referto.
pub(crate) async fn readable_report(
    state: &AppState,
    report_id: &Uuid,
    user: &AuthUser,
) -> Result<Report, AppError> {
    let report = state
        .report
        .read(report_id)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))?;

    if report.user_id == user.id || state.family.are_connected(&user.id, &report.user_id).await? {
        return Ok(report);
    }
    warn!("User {} has no access to report {}", user.id, report_id);
    Err(AppError::not_found("Report not found"))
}

/// Referto di proprietà dell'utente; i familiari collegati ricevono 403
pub(crate) async fn owned_report(
    state: &AppState,
    report_id: &Uuid,
    user: &AuthUser,
) -> Result<Report, AppError> {
    let report = readable_report(state, report_id, user).await?;
    if report.user_id != user.id {
        warn!("User {} is not the owner of report {}", user.id, report_id);
        return Err(AppError::forbidden("Only the report owner can do this"));
    }
    Ok(report)
}
