//! ParameterRepository - Repository per i parametri estratti dai referti

use crate::dtos::CreateParameterDTO;
use crate::entities::ReportParameter;
use sqlx::{Error, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct ParameterRepository {
    connection_pool: PgPool,
}

impl ParameterRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Inserisce tutti i parametri di un referto in un'unica transazione, preservandone l'ordine
    #[instrument(skip(self, parameters), fields(report_id = %report_id, count = parameters.len()))]
    pub async fn create_many(
        &self,
        report_id: &Uuid,
        parameters: &[CreateParameterDTO],
    ) -> Result<Vec<ReportParameter>, Error> {
        let mut tx = self.connection_pool.begin().await?;
        let mut created = Vec::with_capacity(parameters.len());

        for parameter in parameters {
            let row = sqlx::query_as::<_, ReportParameter>(
                "INSERT INTO report_parameters \
                 (report_id, name, value, unit, normal_range, flag, is_critical) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
            )
            .bind(report_id)
            .bind(&parameter.name)
            .bind(&parameter.value)
            .bind(&parameter.unit)
            .bind(&parameter.normal_range)
            .bind(parameter.flag)
            .bind(parameter.is_critical)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        debug!("Stored {} parameters", created.len());
        Ok(created)
    }

    pub async fn find_by_report(&self, report_id: &Uuid) -> Result<Vec<ReportParameter>, Error> {
        sqlx::query_as::<_, ReportParameter>(
            "SELECT * FROM report_parameters WHERE report_id = $1 ORDER BY created_at, name",
        )
        .bind(report_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Parametri di più referti (usato per la sintesi sullo storico)
    pub async fn find_by_reports(&self, report_ids: &[Uuid]) -> Result<Vec<ReportParameter>, Error> {
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ReportParameter>(
            "SELECT * FROM report_parameters WHERE report_id = ANY($1) ORDER BY created_at, name",
        )
        .bind(report_ids)
        .fetch_all(&self.connection_pool)
        .await
    }
}
