//! FamilyConnectionRepository - Repository per i collegamenti familiari

use super::{Create, Delete, Read};
use crate::dtos::CreateFamilyConnectionDTO;
use crate::entities::{ConnectionStatus, FamilyConnection};
use sqlx::{Error, PgPool};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub struct FamilyConnectionRepository {
    connection_pool: PgPool,
}

impl FamilyConnectionRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Collegamenti attivi in cui l'utente compare da una delle due parti
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_connected(&self, user_id: &Uuid) -> Result<Vec<FamilyConnection>, Error> {
        sqlx::query_as::<_, FamilyConnection>(
            "SELECT * FROM family_connections \
             WHERE (user_id = $1 OR connected_user_id = $1) AND status = $2 \
             ORDER BY created_at",
        )
        .bind(user_id)
        .bind(ConnectionStatus::Connected)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Inviti in attesa inviati o ricevuti dall'utente. Un invito è ricevuto se è già legato
    /// al suo id oppure se è stato spedito alla sua email.
    #[instrument(skip(self, email), fields(user_id = %user_id))]
    pub async fn find_pending(
        &self,
        user_id: &Uuid,
        email: Option<&str>,
    ) -> Result<Vec<FamilyConnection>, Error> {
        sqlx::query_as::<_, FamilyConnection>(
            "SELECT * FROM family_connections \
             WHERE status = $1 AND (user_id = $2 OR connected_user_id = $2 \
                OR ($3::text IS NOT NULL AND lower(invited_email) = lower($3))) \
             ORDER BY created_at DESC",
        )
        .bind(ConnectionStatus::Pending)
        .bind(user_id)
        .bind(email)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Numero di collegamenti attivi dell'utente (limite del piano gratuito)
    pub async fn count_connected(&self, user_id: &Uuid) -> Result<i64, Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM family_connections \
             WHERE (user_id = $1 OR connected_user_id = $1) AND status = $2",
        )
        .bind(user_id)
        .bind(ConnectionStatus::Connected)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// Collegamento già esistente tra l'utente e un'email, in qualunque direzione
    pub async fn find_between(
        &self,
        user_id: &Uuid,
        email: &str,
        other_user_id: Option<&Uuid>,
    ) -> Result<Option<FamilyConnection>, Error> {
        sqlx::query_as::<_, FamilyConnection>(
            "SELECT * FROM family_connections \
             WHERE (user_id = $1 AND lower(invited_email) = lower($2)) \
                OR ($3::uuid IS NOT NULL AND ( \
                    (user_id = $1 AND connected_user_id = $3) \
                    OR (user_id = $3 AND connected_user_id = $1))) \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(email)
        .bind(other_user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// `true` se i due utenti hanno un collegamento attivo
    #[instrument(skip(self))]
    pub async fn are_connected(&self, a: &Uuid, b: &Uuid) -> Result<bool, Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM family_connections WHERE status = $1 AND \
             ((user_id = $2 AND connected_user_id = $3) OR (user_id = $3 AND connected_user_id = $2)))",
        )
        .bind(ConnectionStatus::Connected)
        .bind(a)
        .bind(b)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// Accetta un invito in attesa destinato all'utente (per id o per email).
    ///
    /// # Returns
    /// * `Ok(Some(_))` - collegamento aggiornato
    /// * `Ok(None)` - nessun invito in attesa con quell'id per questo utente
    #[instrument(skip(self, email, nickname), fields(connection_id = %id, user_id = %user_id))]
    pub async fn accept(
        &self,
        id: &Uuid,
        user_id: &Uuid,
        email: Option<&str>,
        nickname: Option<&str>,
    ) -> Result<Option<FamilyConnection>, Error> {
        let connection = sqlx::query_as::<_, FamilyConnection>(
            "UPDATE family_connections \
             SET status = $1, connected_user_id = $2, nickname = COALESCE($3, nickname), updated_at = now() \
             WHERE id = $4 AND status = $5 AND user_id <> $2 \
               AND (connected_user_id = $2 OR ($6::text IS NOT NULL AND lower(invited_email) = lower($6))) \
             RETURNING *",
        )
        .bind(ConnectionStatus::Connected)
        .bind(user_id)
        .bind(nickname)
        .bind(id)
        .bind(ConnectionStatus::Pending)
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await?;

        if connection.is_some() {
            info!("Family connection accepted");
        }
        Ok(connection)
    }
}

impl Create<FamilyConnection, CreateFamilyConnectionDTO> for FamilyConnectionRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id))]
    async fn create(&self, data: &CreateFamilyConnectionDTO) -> Result<FamilyConnection, Error> {
        debug!("Creating family invite");
        sqlx::query_as::<_, FamilyConnection>(
            "INSERT INTO family_connections (user_id, connected_user_id, invited_email, nickname, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.connected_user_id)
        .bind(&data.invited_email)
        .bind(&data.nickname)
        .bind(ConnectionStatus::Pending)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<FamilyConnection, Uuid> for FamilyConnectionRepository {
    async fn read(&self, id: &Uuid) -> Result<Option<FamilyConnection>, Error> {
        sqlx::query_as::<_, FamilyConnection>("SELECT * FROM family_connections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Delete<Uuid> for FamilyConnectionRepository {
    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM family_connections WHERE id = $1")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
