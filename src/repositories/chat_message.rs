//! ChatMessageRepository - Repository per la cronologia della chat sui referti

use super::Create;
use crate::dtos::CreateChatMessageDTO;
use crate::entities::ChatMessage;
use sqlx::{Error, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct ChatMessageRepository {
    connection_pool: PgPool,
}

impl ChatMessageRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Ultimi `limit` scambi di un utente su un referto, dal più vecchio al più recente
    #[instrument(skip(self), fields(report_id = %report_id, user_id = %user_id))]
    pub async fn find_recent_by_report(
        &self,
        report_id: &Uuid,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, Error> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE report_id = $1 AND user_id = $2 \
             ORDER BY created_at DESC, id LIMIT $3",
        )
        .bind(report_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.connection_pool)
        .await?;

        messages.reverse();
        debug!("Loaded {} chat messages", messages.len());
        Ok(messages)
    }
}

impl Create<ChatMessage, CreateChatMessageDTO> for ChatMessageRepository {
    #[instrument(skip(self, data), fields(report_id = %data.report_id, user_id = %data.user_id))]
    async fn create(&self, data: &CreateChatMessageDTO) -> Result<ChatMessage, Error> {
        sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO chat_messages (report_id, user_id, message, response) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.report_id)
        .bind(data.user_id)
        .bind(&data.message)
        .bind(&data.response)
        .fetch_one(&self.connection_pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("profiles", "reports")))]
    async fn test_history_is_oldest_first_and_limited(pool: PgPool) -> sqlx::Result<()> {
        let repo = ChatMessageRepository::new(pool);
        let report_id = Uuid::parse_str("aaaaaaaa-0000-0000-0000-000000000002").unwrap();
        let user_id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();

        for i in 0..3 {
            repo.create(&CreateChatMessageDTO {
                report_id,
                user_id,
                message: format!("question {}", i),
                response: format!("answer {}", i),
            })
            .await?;
        }

        let history = repo.find_recent_by_report(&report_id, &user_id, 2).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "question 1");
        assert_eq!(history[1].message, "question 2");

        let bob = Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap();
        assert!(repo.find_recent_by_report(&report_id, &bob, 10).await?.is_empty());
        Ok(())
    }
}
