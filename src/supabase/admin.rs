use super::StorageError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

/// Utente come restituito da `GET /auth/v1/admin/users`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUserRecord {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<AuthUserRecord>,
}

/// Client per le API admin di Supabase Auth
pub struct AuthAdmin {
    client: Client,
    base_url: String,
    service_key: String,
}

impl AuthAdmin {
    pub fn new(client: Client, supabase_url: &str, service_key: &str) -> Self {
        Self {
            client,
            base_url: supabase_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<AuthUserRecord>, StorageError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/admin/users", self.base_url))
            .query(&[("page", "1"), ("per_page", "1000")])
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api { status: status.as_u16(), body });
        }
        Ok(response.json::<UsersPage>().await?.users)
    }
}
