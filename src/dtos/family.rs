//! Family DTOs - Data Transfer Objects per i collegamenti familiari

use crate::entities::{ConnectionStatus, FamilyConnection, FlagLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Debug, Validate)]
pub struct InviteDTO {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 50, message = "Nickname must be at most 50 characters"))]
    pub nickname: Option<String>,
}

#[derive(Deserialize, Debug, Default, Validate)]
pub struct AcceptInviteDTO {
    #[validate(length(max = 50, message = "Nickname must be at most 50 characters"))]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateFamilyConnectionDTO {
    pub user_id: Uuid,
    pub connected_user_id: Option<Uuid>,
    pub invited_email: String,
    pub nickname: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct InviteResponseDTO {
    pub connection_id: Uuid,
    pub message: &'static str,
}

/// Stato del collegamento dal punto di vista di chi guarda
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerConnectionStatus {
    Connected,
    PendingSent,
    PendingReceived,
}

impl ViewerConnectionStatus {
    pub fn for_viewer(connection: &FamilyConnection, viewer: &Uuid) -> Self {
        match connection.status {
            ConnectionStatus::Connected => Self::Connected,
            ConnectionStatus::Pending if connection.user_id == *viewer => Self::PendingSent,
            ConnectionStatus::Pending => Self::PendingReceived,
        }
    }
}

/// Stato di salute di un familiare, derivato dall'ultimo referto
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    Good,
    NeedsReview,
    Critical,
    Pending,
}

impl From<Option<FlagLevel>> for HealthStatus {
    fn from(value: Option<FlagLevel>) -> Self {
        match value {
            Some(FlagLevel::Green) => Self::Good,
            Some(FlagLevel::Yellow) => Self::NeedsReview,
            Some(FlagLevel::Red) => Self::Critical,
            None => Self::Pending,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FamilyMemberDTO {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub connection_status: ViewerConnectionStatus,
    pub status: HealthStatus,
    pub last_report_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
