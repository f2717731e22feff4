//! Chatbot services - MediBot, domande singole con il contesto completo del referto

use super::readable_report;
use crate::ai::ChatAssistant;
use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{AskRequestDTO, AskResponseDTO};
use axum::{
    Extension,
    extract::{Json, State},
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, report_id = %body.report_id))]
pub async fn ask_chatbot(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<AskRequestDTO>,
) -> Result<Json<AskResponseDTO>, AppError> {
    body.validate()?;

    let report = readable_report(&state, &body.report_id, &current_user).await?;
    let parameters = state.parameter.find_by_report(&report.id).await?;
    let explanations = state.explanation.find_by_report(&report.id).await?;

    let response = ChatAssistant::new(state.llm.as_ref())
        .ask(&body.question, &report, &parameters, &explanations)
        .await;

    info!("MediBot answered");
    Ok(Json(AskResponseDTO { response }))
}
