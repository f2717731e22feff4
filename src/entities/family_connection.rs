//! FamilyConnection entity - Collegamento tra due utenti per la condivisione dei referti

use super::enums::ConnectionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct FamilyConnection {
    pub id: Uuid,
    /// Utente che ha inviato l'invito
    pub user_id: Uuid,
    /// Utente invitato, valorizzato se l'email corrisponde a un profilo o all'accettazione
    pub connected_user_id: Option<Uuid>,
    pub invited_email: String,
    pub nickname: Option<String>,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FamilyConnection {
    /// L'altro capo del collegamento visto da `viewer`
    pub fn other_user(&self, viewer: &Uuid) -> Option<Uuid> {
        if self.user_id == *viewer {
            self.connected_user_id
        } else {
            Some(self.user_id)
        }
    }

    pub fn involves(&self, user_id: &Uuid) -> bool {
        self.user_id == *user_id || self.connected_user_id.as_ref() == Some(user_id)
    }
}
