//! Chat DTOs - Data Transfer Objects per chat sui referti e MediBot

use crate::entities::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Debug, Validate)]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub message: String,
    pub report_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CreateChatMessageDTO {
    pub report_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub response: String,
}

#[derive(Serialize, Debug)]
pub struct ChatMessageDTO {
    pub id: Uuid,
    pub report_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageDTO {
    fn from(value: ChatMessage) -> Self {
        Self {
            id: value.id,
            report_id: value.report_id,
            user_id: value.user_id,
            message: value.message,
            response: value.response,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatHistoryDTO {
    pub messages: Vec<ChatMessageDTO>,
    pub total: usize,
}

#[derive(Deserialize, Debug, Validate)]
pub struct AskRequestDTO {
    pub report_id: Uuid,
    #[validate(length(min = 1, max = 2000, message = "Question must be between 1 and 2000 characters"))]
    pub question: String,
}

#[derive(Serialize, Debug)]
pub struct AskResponseDTO {
    pub response: String,
}
