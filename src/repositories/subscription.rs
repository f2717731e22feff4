//! SubscriptionRepository - Repository per gli abbonamenti premium

use crate::entities::Subscription;
use sqlx::{Error, PgPool};
use tracing::instrument;
use uuid::Uuid;

pub struct SubscriptionRepository {
    connection_pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Abbonamento attivo e non scaduto dell'utente, se presente
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_active(&self, user_id: &Uuid) -> Result<Option<Subscription>, Error> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions \
             WHERE user_id = $1 AND status = 'active' AND (expires_at IS NULL OR expires_at > now()) \
             ORDER BY expires_at DESC NULLS FIRST LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
