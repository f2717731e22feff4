//! SynthesisRepository - Cache delle sintesi AI dei referti

use super::Read;
use crate::entities::ReportSynthesis;
use sqlx::{Error, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct SynthesisRepository {
    connection_pool: PgPool,
}

impl SynthesisRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Inserisce o sostituisce la sintesi del referto
    #[instrument(skip(self, status_summary, key_trends, doctor_precis), fields(report_id = %report_id))]
    pub async fn upsert(
        &self,
        report_id: &Uuid,
        status_summary: &str,
        key_trends: &[String],
        doctor_precis: &str,
    ) -> Result<ReportSynthesis, Error> {
        let synthesis = sqlx::query_as::<_, ReportSynthesis>(
            "INSERT INTO report_syntheses (report_id, status_summary, key_trends, doctor_precis) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (report_id) DO UPDATE SET \
                status_summary = EXCLUDED.status_summary, \
                key_trends = EXCLUDED.key_trends, \
                doctor_precis = EXCLUDED.doctor_precis, \
                generated_at = now() \
             RETURNING *",
        )
        .bind(report_id)
        .bind(status_summary)
        .bind(key_trends)
        .bind(doctor_precis)
        .fetch_one(&self.connection_pool)
        .await?;

        info!("Synthesis cached");
        Ok(synthesis)
    }
}

impl Read<ReportSynthesis, Uuid> for SynthesisRepository {
    async fn read(&self, report_id: &Uuid) -> Result<Option<ReportSynthesis>, Error> {
        sqlx::query_as::<_, ReportSynthesis>("SELECT * FROM report_syntheses WHERE report_id = $1")
            .bind(report_id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
