//! ProfileRepository - Repository per i profili utente

use super::Read;
use crate::entities::Profile;
use sqlx::{Error, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct ProfileRepository {
    connection_pool: PgPool,
}

impl ProfileRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Cerca il profilo con l'email indicata (confronto case-insensitive)
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, Error> {
        debug!("Looking up profile by email");
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Recupera più profili in una sola query
    pub async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Profile>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Tutti i profili, dal più recente
    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<Profile>, Error> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY created_at DESC")
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Read<Profile, Uuid> for ProfileRepository {
    #[instrument(skip(self), fields(profile_id = %id))]
    async fn read(&self, id: &Uuid) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
