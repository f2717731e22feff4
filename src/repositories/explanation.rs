//! ExplanationRepository - Repository per le spiegazioni dei parametri

use super::Create;
use crate::dtos::CreateExplanationDTO;
use crate::entities::ReportExplanation;
use sqlx::{Error, PgPool};
use tracing::instrument;
use uuid::Uuid;

pub struct ExplanationRepository {
    connection_pool: PgPool,
}

impl ExplanationRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self, explanations), fields(count = explanations.len()))]
    pub async fn create_many(
        &self,
        explanations: &[CreateExplanationDTO],
    ) -> Result<Vec<ReportExplanation>, Error> {
        let mut tx = self.connection_pool.begin().await?;
        let mut created = Vec::with_capacity(explanations.len());
        for data in explanations {
            created.push(insert(&mut *tx, data).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Spiegazioni di tutti i parametri di un referto
    pub async fn find_by_report(&self, report_id: &Uuid) -> Result<Vec<ReportExplanation>, Error> {
        sqlx::query_as::<_, ReportExplanation>(
            "SELECT e.* FROM report_explanations e \
             JOIN report_parameters p ON p.id = e.parameter_id \
             WHERE p.report_id = $1 ORDER BY p.created_at, p.name",
        )
        .bind(report_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}

async fn insert<'e, E>(executor: E, data: &CreateExplanationDTO) -> Result<ReportExplanation, Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, ReportExplanation>(
        "INSERT INTO report_explanations (parameter_id, what, meaning, causes, next_steps) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(data.parameter_id)
    .bind(&data.what)
    .bind(&data.meaning)
    .bind(&data.causes)
    .bind(&data.next_steps)
    .fetch_one(executor)
    .await
}

impl Create<ReportExplanation, CreateExplanationDTO> for ExplanationRepository {
    async fn create(&self, data: &CreateExplanationDTO) -> Result<ReportExplanation, Error> {
        insert(&self.connection_pool, data).await
    }
}
