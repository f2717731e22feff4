//! ReportRepository - Repository per la gestione dei referti

use super::{Create, Delete, Read, Update};
use crate::dtos::{CreateReportDTO, ReportMetadataDTO};
use crate::entities::{FlagLevel, Report, ReportStatus};
use chrono::{DateTime, Utc};
use sqlx::{Error, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Filtri della lista referti di un utente
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub user_id: Uuid,
    /// Ricerca parziale su tipo e laboratorio
    pub search: Option<String>,
    pub report_type: Option<String>,
    pub flag_level: Option<FlagLevel>,
    pub created_since: Option<DateTime<Utc>>,
}

impl ReportFilter {
    fn push_where(&self, query_builder: &mut QueryBuilder<'_, Postgres>) {
        query_builder.push(" WHERE user_id = ");
        query_builder.push_bind(self.user_id);

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query_builder.push(" AND (type ILIKE ");
            query_builder.push_bind(pattern.clone());
            query_builder.push(" OR lab_name ILIKE ");
            query_builder.push_bind(pattern);
            query_builder.push(")");
        }
        if let Some(ref report_type) = self.report_type {
            query_builder.push(" AND type = ");
            query_builder.push_bind(report_type.clone());
        }
        if let Some(flag_level) = self.flag_level {
            query_builder.push(" AND flag_level = ");
            query_builder.push_bind(flag_level);
        }
        if let Some(since) = self.created_since {
            query_builder.push(" AND created_at >= ");
            query_builder.push_bind(since);
        }
    }
}

// REPORT REPO
pub struct ReportRepository {
    connection_pool: PgPool,
}

impl ReportRepository {
    pub fn new(connection_pool: PgPool) -> Self {
        Self { connection_pool }
    }

    /// Pagina di referti filtrata, dal più recente, insieme al totale dei risultati
    ///
    /// # Arguments
    /// * `filter` - Filtri da applicare
    /// * `page` - Pagina (1-based)
    /// * `limit` - Elementi per pagina
    #[instrument(skip(self, filter), fields(user_id = %filter.user_id))]
    pub async fn find_page(
        &self,
        filter: &ReportFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Report>, i64), Error> {
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM reports");
        filter.push_where(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut query_builder = QueryBuilder::new("SELECT * FROM reports");
        filter.push_where(&mut query_builder);
        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(page.saturating_sub(1).saturating_mul(limit));

        let reports = query_builder
            .build_query_as::<Report>()
            .fetch_all(&self.connection_pool)
            .await?;

        debug!("Found {} of {} reports", reports.len(), total);
        Ok((reports, total))
    }

    /// Numero di referti creati dall'utente a partire da `since`
    pub async fn count_since(&self, user_id: &Uuid, since: DateTime<Utc>) -> Result<i64, Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE user_id = $1 AND created_at >= $2")
            .bind(user_id)
            .bind(since)
            .fetch_one(&self.connection_pool)
            .await
    }

    /// Ultimo referto completato dell'utente
    pub async fn find_latest_completed(&self, user_id: &Uuid) -> Result<Option<Report>, Error> {
        sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE user_id = $1 AND status = 'completed' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Referti completati dello stesso utente precedenti a `report`, dal più recente
    pub async fn find_history(&self, report: &Report, limit: i64) -> Result<Vec<Report>, Error> {
        sqlx::query_as::<_, Report>(
            "SELECT * FROM reports \
             WHERE user_id = $1 AND id <> $2 AND status = 'completed' AND created_at <= $3 \
             ORDER BY created_at DESC LIMIT $4",
        )
        .bind(report.user_id)
        .bind(report.id)
        .bind(report.created_at)
        .bind(limit)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn find_by_user(&self, user_id: &Uuid) -> Result<Vec<Report>, Error> {
        sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Tutti i referti della piattaforma, dal più recente (vista admin)
    pub async fn find_all(&self, limit: i64) -> Result<Vec<Report>, Error> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self), fields(report_id = %id))]
    pub async fn set_progress(&self, id: &Uuid, progress: i32) -> Result<(), Error> {
        sqlx::query("UPDATE reports SET progress = $1, updated_at = now() WHERE id = $2")
            .bind(progress.clamp(0, 100))
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(report_id = %id))]
    pub async fn mark_completed(&self, id: &Uuid, flag_level: FlagLevel) -> Result<(), Error> {
        sqlx::query(
            "UPDATE reports SET status = $1, flag_level = $2, progress = 100, \
             error_message = NULL, updated_at = now() WHERE id = $3",
        )
        .bind(ReportStatus::Completed)
        .bind(flag_level)
        .bind(id)
        .execute(&self.connection_pool)
        .await?;
        info!("Report marked as completed");
        Ok(())
    }

    #[instrument(skip(self, error_message), fields(report_id = %id))]
    pub async fn mark_failed(&self, id: &Uuid, error_message: &str) -> Result<(), Error> {
        sqlx::query(
            "UPDATE reports SET status = $1, error_message = $2, updated_at = now() WHERE id = $3",
        )
        .bind(ReportStatus::Failed)
        .bind(error_message)
        .bind(id)
        .execute(&self.connection_pool)
        .await?;
        info!("Report marked as failed");
        Ok(())
    }
}

impl Create<Report, CreateReportDTO> for ReportRepository {
    #[instrument(skip(self, data), fields(report_id = %data.id, user_id = %data.user_id))]
    async fn create(&self, data: &CreateReportDTO) -> Result<Report, Error> {
        debug!("Creating report");
        let report = sqlx::query_as::<_, Report>(
            "INSERT INTO reports (id, user_id, type, status, flag_level, progress, image_url) \
             VALUES ($1, $2, $3, $4, $5, 0, $6) RETURNING *",
        )
        .bind(data.id)
        .bind(data.user_id)
        .bind(&data.report_type)
        .bind(ReportStatus::Processing)
        .bind(FlagLevel::Green)
        .bind(&data.image_url)
        .fetch_one(&self.connection_pool)
        .await?;

        info!("Report created");
        Ok(report)
    }
}

impl Read<Report, Uuid> for ReportRepository {
    async fn read(&self, id: &Uuid) -> Result<Option<Report>, Error> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<Report, ReportMetadataDTO, Uuid> for ReportRepository {
    /// Scrive i metadati estratti dal referto
    #[instrument(skip(self, data), fields(report_id = %id))]
    async fn update(&self, id: &Uuid, data: &ReportMetadataDTO) -> Result<Report, Error> {
        sqlx::query_as::<_, Report>(
            "UPDATE reports SET type = $1, lab_name = $2, date = $3, patient_name = $4, \
             patient_age = $5, patient_gender = $6, updated_at = now() \
             WHERE id = $7 RETURNING *",
        )
        .bind(&data.report_type)
        .bind(&data.lab_name)
        .bind(&data.date)
        .bind(&data.patient_name)
        .bind(&data.patient_age)
        .bind(&data.patient_gender)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }
}

impl Delete<Uuid> for ReportRepository {
    /// Elimina il referto; parametri, spiegazioni, sintesi e chat seguono in cascata
    #[instrument(skip(self), fields(report_id = %id))]
    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("Report deleted");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn alice() -> Uuid {
        Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("profiles", "reports")))]
    async fn test_find_page_with_filters(pool: PgPool) -> sqlx::Result<()> {
        let repo = ReportRepository::new(pool);

        let all = ReportFilter {
            user_id: alice(),
            ..Default::default()
        };
        let (items, total) = repo.find_page(&all, 1, 2).await?;
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);

        let search = ReportFilter {
            user_id: alice(),
            search: Some("metro".to_string()),
            ..Default::default()
        };
        let (items, total) = repo.find_page(&search, 1, 20).await?;
        assert_eq!(total, 1);
        assert_eq!(items[0].report_type, "Lipid Panel");

        let recent_yellow = ReportFilter {
            user_id: alice(),
            flag_level: Some(FlagLevel::Yellow),
            created_since: Some(Utc::now() - Duration::days(7)),
            ..Default::default()
        };
        let (_, total) = repo.find_page(&recent_yellow, 1, 20).await?;
        assert_eq!(total, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("profiles", "reports")))]
    async fn test_status_transitions(pool: PgPool) -> sqlx::Result<()> {
        let repo = ReportRepository::new(pool);
        let id = Uuid::parse_str("aaaaaaaa-0000-0000-0000-000000000003").unwrap();

        repo.set_progress(&id, 60).await?;
        assert_eq!(repo.read(&id).await?.unwrap().progress, 60);

        repo.mark_failed(&id, "OCR failed").await?;
        let failed = repo.read(&id).await?.unwrap();
        assert_eq!(failed.status, ReportStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("OCR failed"));

        repo.mark_completed(&id, FlagLevel::Red).await?;
        let done = repo.read(&id).await?.unwrap();
        assert_eq!(done.status, ReportStatus::Completed);
        assert_eq!(done.flag_level, FlagLevel::Red);
        assert_eq!(done.progress, 100);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("profiles", "reports")))]
    async fn test_history_and_monthly_count(pool: PgPool) -> sqlx::Result<()> {
        let repo = ReportRepository::new(pool);
        let lipid = repo
            .read(&Uuid::parse_str("aaaaaaaa-0000-0000-0000-000000000002").unwrap())
            .await?
            .unwrap();

        let history = repo.find_history(&lipid, 5).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].report_type, "Complete Blood Count");

        let recent = repo.count_since(&alice(), Utc::now() - Duration::days(30)).await?;
        assert_eq!(recent, 2);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("profiles", "reports")))]
    async fn test_delete_cascades(pool: PgPool) -> sqlx::Result<()> {
        let repo = ReportRepository::new(pool.clone());
        let id = Uuid::parse_str("aaaaaaaa-0000-0000-0000-000000000002").unwrap();

        assert!(repo.delete(&id).await?);
        assert!(!repo.delete(&id).await?);

        let orphans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM report_parameters WHERE report_id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(orphans, 0);
        Ok(())
    }
}
