//! Chat services - Conversazione sul contesto di un referto, con cronologia salvata

use super::readable_report;
use crate::ai::chatbot::{HISTORY_WINDOW, parameters_summary};
use crate::ai::{ChatAssistant, ChatTurn};
use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{ChatHistoryDTO, ChatMessageDTO, CreateChatMessageDTO, SendMessageDTO};
use crate::entities::ChatMessage;
use crate::repositories::Create;
use axum::{
    Extension,
    extract::{Json, Path, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Massimo numero di messaggi restituiti dalla cronologia
pub const HISTORY_LIMIT: i64 = 50;

/// Ogni scambio salvato diventa una domanda e una risposta
fn to_turns(messages: &[ChatMessage]) -> Vec<ChatTurn> {
    messages
        .iter()
        .flat_map(|m| [ChatTurn::user(m.message.clone()), ChatTurn::assistant(m.response.clone())])
        .collect()
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
    Json(body): Json<SendMessageDTO>,
) -> Result<Json<ChatMessageDTO>, AppError> {
    debug!("Chat message received");
    // 1. Validare il messaggio e la coerenza tra path e body
    // 2. Verificare l'accesso al referto (proprietario o familiare collegato)
    // 3. Costruire il contesto (parametri e cronologia recente) e interrogare l'assistente
    // 4. Salvare lo scambio e restituirlo
    body.validate()?;
    if body.report_id != report_id {
        warn!("Body report_id {} does not match path", body.report_id);
        return Err(AppError::bad_request("report_id does not match the URL"));
    }

    let report = readable_report(&state, &report_id, &current_user).await?;
    let parameters = state.parameter.find_by_report(&report_id).await?;
    let recent = state
        .chat
        .find_recent_by_report(&report_id, &current_user.id, HISTORY_WINDOW as i64)
        .await?;

    let response = ChatAssistant::new(state.llm.as_ref())
        .reply(
            &body.message,
            &report.report_type,
            &parameters_summary(&parameters),
            &to_turns(&recent),
        )
        .await;

    let saved = state
        .chat
        .create(&CreateChatMessageDTO {
            report_id,
            user_id: current_user.id,
            message: body.message,
            response,
        })
        .await?;

    info!("Chat message stored");
    Ok(Json(ChatMessageDTO::from(saved)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ChatHistoryDTO>, AppError> {
    readable_report(&state, &report_id, &current_user).await?;
    let messages: Vec<ChatMessageDTO> = state
        .chat
        .find_recent_by_report(&report_id, &current_user.id, HISTORY_LIMIT)
        .await?
        .into_iter()
        .map(ChatMessageDTO::from)
        .collect();

    Ok(Json(ChatHistoryDTO {
        total: messages.len(),
        messages,
    }))
}
