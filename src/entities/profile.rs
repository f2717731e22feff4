//! Profile entity - Profilo applicativo associato a un utente di Supabase Auth

use super::enums::ProfileRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    /// Coincide con l'id dell'utente in auth.users
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: ProfileRole,
    pub created_at: DateTime<Utc>,
}
