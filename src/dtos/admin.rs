//! Admin DTOs

use crate::entities::{Profile, ProfileRole};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Utente visto dall'amministratore: dati di Supabase Auth uniti al profilo
#[derive(Serialize, Debug, Clone)]
pub struct AdminUserDTO {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: ProfileRole,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl From<Profile> for AdminUserDTO {
    fn from(value: Profile) -> Self {
        Self {
            id: value.id,
            email: value.email,
            full_name: value.full_name,
            phone_number: value.phone_number,
            role: value.role,
            created_at: Some(value.created_at),
            last_sign_in_at: None,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct DeletedResponse {
    pub status: &'static str,
}
