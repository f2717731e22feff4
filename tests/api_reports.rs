//! Integration tests per gli endpoints dei referti
//!
//! Test per:
//! - POST /api/v1/reports/upload - upload_report
//! - GET /api/v1/reports - list_reports
//! - GET /api/v1/reports/{report_id} (+ status, parameters, synthesis)
//! - DELETE /api/v1/reports/{report_id} - delete_report
//! - POST /api/v1/reports/{report_id}/generate-synthesis
//! - POST /api/v1/reports/compare - compare_reports

mod common;

#[cfg(test)]
mod report_tests {
    use super::common::*;
    use axum::http::{HeaderName, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::json;
    use sqlx::PgPool;
    use std::sync::Arc;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

    fn image_form(bytes: Vec<u8>, mime: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(bytes).file_name("report.png").mime_type(mime),
        )
    }

    fn auth() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    // ============================================================
    // Validazione dell'upload (nessun accesso al database)
    // ============================================================

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let server = create_test_server(create_offline_state());

        let response = server
            .post("/api/v1/reports/upload")
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .multipart(image_form(b"%PDF-1.4".to_vec(), "application/pdf"))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INVALID_FILE_TYPE");
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let server = create_test_server(create_offline_state());
        // il limite di test è 1 MiB
        let bytes = vec![0u8; 1024 * 1024 + 1];

        let response = server
            .post("/api/v1/reports/upload")
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .multipart(image_form(bytes, "image/png"))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let server = create_test_server(create_offline_state());
        let form = MultipartForm::new().add_text("report_type", "CBC");

        let response = server
            .post("/api/v1/reports/upload")
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .multipart(form)
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_pagination() {
        let server = create_test_server(create_offline_state());

        let response = server
            .get("/api/v1/reports")
            .add_query_param("limit", 500)
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Validation error");
    }

    #[tokio::test]
    async fn test_list_rejects_overflowing_page() {
        let server = create_test_server(create_offline_state());

        let response = server
            .get("/api/v1/reports")
            .add_query_param("page", i64::MAX)
            .add_query_param("limit", 100)
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Validation error");
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_flag_level() {
        let server = create_test_server(create_offline_state());

        let response = server
            .get("/api/v1/reports")
            .add_query_param("flag_level", "purple")
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_bad_request();
    }

    // ============================================================
    // Test con database
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "subscriptions")))]
    async fn test_upload_success_stores_image_under_owner(pool: PgPool) -> sqlx::Result<()> {
        let storage = Arc::new(MemoryStorage::default());
        let state = create_test_state_with(pool, storage.clone(), "ok");
        let server = create_test_server(state);

        let response = server
            .post("/api/v1/reports/upload")
            .add_header(auth(), bearer(BOB, "bob@example.com"))
            .multipart(image_form(PNG_BYTES.to_vec(), "image/png"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "processing");
        let report_id = body["report_id"].as_str().unwrap().to_string();

        let uploaded = storage.uploaded.lock().unwrap().clone();
        assert_eq!(uploaded, vec![format!("{}/{}.png", BOB, report_id)]);

        let status = server
            .get(&format!("/api/v1/reports/{}/status", report_id))
            .add_header(auth(), bearer(BOB, "bob@example.com"))
            .await;
        status.assert_status_ok();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "subscriptions")))]
    async fn test_upload_removes_image_when_report_insert_fails(pool: PgPool) -> sqlx::Result<()> {
        // utente autenticato ma senza profilo: l'INSERT viola la foreign key
        let ghost = uuid::Uuid::from_u128(0x99999999_9999_9999_9999_999999999999);
        let storage = Arc::new(MemoryStorage::default());
        let server = create_test_server(create_test_state_with(pool, storage.clone(), "ok"));

        let response = server
            .post("/api/v1/reports/upload")
            .add_header(auth(), bearer(ghost, "ghost@example.com"))
            .multipart(image_form(PNG_BYTES.to_vec(), "image/png"))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let uploaded = storage.uploaded.lock().unwrap().clone();
        let removed = storage.removed.lock().unwrap().clone();
        assert_eq!(uploaded.len(), 1);
        assert!(uploaded[0].starts_with(&ghost.to_string()));
        assert_eq!(removed, uploaded);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "subscriptions")))]
    async fn test_free_tier_monthly_limit(pool: PgPool) -> sqlx::Result<()> {
        // Carol ha un abbonamento scaduto: vale il limite di 3 referti al mese
        for _ in 0..3 {
            sqlx::query(
                "INSERT INTO reports (id, user_id, type, status, flag_level, progress, created_at) \
                 VALUES (gen_random_uuid(), $1, 'Unknown', 'completed', 'green', 100, now())",
            )
            .bind(CAROL)
            .execute(&pool)
            .await?;
        }
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/v1/reports/upload")
            .add_header(auth(), bearer(CAROL, "carol@example.com"))
            .multipart(image_form(PNG_BYTES.to_vec(), "image/jpeg"))
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "REPORT_LIMIT_REACHED");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports")))]
    async fn test_list_filters_by_flag_level(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/v1/reports")
            .add_query_param("flag_level", "yellow")
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["type"], "Lipid Panel");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports", "family")))]
    async fn test_list_for_unconnected_target_is_forbidden(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        // l'invito verso Carol è ancora in attesa
        let response = server
            .get("/api/v1/reports")
            .add_query_param("target_user_id", CAROL)
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports", "family")))]
    async fn test_family_member_can_read_but_not_delete(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let read = server
            .get(&format!("/api/v1/reports/{}/parameters", ALICE_LIPID))
            .add_header(auth(), bearer(BOB, "bob@example.com"))
            .await;
        read.assert_status_ok();
        let parameters: Vec<serde_json::Value> = read.json();
        assert_eq!(parameters.len(), 2);

        let delete = server
            .delete(&format!("/api/v1/reports/{}", ALICE_LIPID))
            .add_header(auth(), bearer(BOB, "bob@example.com"))
            .await;
        delete.assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports", "family")))]
    async fn test_stranger_gets_not_found(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get(&format!("/api/v1/reports/{}", CAROL_BMP))
            .add_header(auth(), bearer(BOB, "bob@example.com"))
            .await;

        response.assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports")))]
    async fn test_owner_deletes_report_and_image(pool: PgPool) -> sqlx::Result<()> {
        let storage = Arc::new(MemoryStorage::default());
        let server = create_test_server(create_test_state_with(pool, storage.clone(), "ok"));

        let response = server
            .delete(&format!("/api/v1/reports/{}", ALICE_CBC))
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
        assert_eq!(storage.removed.lock().unwrap().len(), 1);

        let again = server
            .get(&format!("/api/v1/reports/{}", ALICE_CBC))
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;
        again.assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports")))]
    async fn test_synthesis_not_generated_yet(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get(&format!("/api/v1/reports/{}/synthesis", ALICE_CBC))
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("profiles", "reports", "subscriptions")))]
    async fn test_generate_synthesis_requires_premium(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post(&format!("/api/v1/reports/{}/generate-synthesis", ALICE_CBC))
            .add_header(auth(), bearer(ALICE, "alice@example.com"))
            .await;

        response.assert_status_forbidden();
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "PREMIUM_REQUIRED");
        Ok(())
    }

    #[sqlx::test(fixtures(
        path = "../fixtures",
        scripts("profiles", "reports", "family", "subscriptions")
    ))]
    async fn test_compare_connected_reports(pool: PgPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/v1/reports/compare")
            .add_header(auth(), bearer(BOB, "bob@example.com"))
            .json(&json!({
                "report_id_1": ALICE_CBC,
                "report_id_2": ALICE_LIPID,
                "parameter_name": "hemoglobin"
            }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let comparisons = body["comparisons"].as_array().unwrap();
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0]["change"], -1.3);
        assert_eq!(comparisons[0]["direction"], "decreased");
        Ok(())
    }
}
