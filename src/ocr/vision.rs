//! Motore OCR basato su Google Cloud Vision (`images:annotate`, TEXT_DETECTION)

use super::{OcrEngine, OcrError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

const VISION_BASE_URL: &str = "https://vision.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GoogleVisionOcr {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleVisionOcr {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: VISION_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    text: String,
}

#[derive(Deserialize)]
struct EntityAnnotation {
    description: String,
}

#[derive(Deserialize, Serialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl OcrEngine for GoogleVisionOcr {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        if self.api_key.is_empty() {
            return Err(OcrError::Unavailable(
                "GOOGLE_VISION_API_KEY is not configured".to_string(),
            ));
        }

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let response = self
            .client
            .post(format!("{}/v1/images:annotate", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnnotateResponse = response.json().await?;
        let first = parsed.responses.into_iter().next().ok_or(OcrError::NoText)?;

        if let Some(error) = first.error {
            return Err(OcrError::Failed(format!("{}: {}", error.code, error.message)));
        }

        // fullTextAnnotation conserva l'impaginazione, la prima textAnnotation è il fallback
        let text = first
            .full_text_annotation
            .map(|a| a.text)
            .or_else(|| first.text_annotations.into_iter().next().map(|a| a.description))
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OcrError::NoText);
        }
        debug!("Vision extracted {} characters", text.len());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "google_vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_extracts_full_text_annotation() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/images:annotate")
                    .header("x-goog-api-key", "vision-key")
                    .body_contains("TEXT_DETECTION");
                then.status(200).json_body(json!({
                    "responses": [{
                        "fullTextAnnotation": { "text": "Hemoglobin 14.2 g/dL (13.5-17.5)\n" }
                    }]
                }));
            })
            .await;

        let ocr = GoogleVisionOcr::new(reqwest::Client::new(), "vision-key")
            .with_base_url(server.base_url());
        let text = ocr.extract_text(b"png-bytes").await.unwrap();

        mock.assert_async().await;
        assert!(text.starts_with("Hemoglobin"));
    }

    #[tokio::test]
    async fn test_empty_annotation_is_no_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images:annotate");
                then.status(200).json_body(json!({ "responses": [{}] }));
            })
            .await;

        let ocr = GoogleVisionOcr::new(reqwest::Client::new(), "vision-key")
            .with_base_url(server.base_url());
        assert!(matches!(ocr.extract_text(b"x").await, Err(OcrError::NoText)));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_key() {
        // porta chiusa: la richiesta fallisce prima di ricevere una risposta
        let ocr = GoogleVisionOcr::new(reqwest::Client::new(), "SECRET-VISION-KEY")
            .with_base_url("http://127.0.0.1:1");
        let err = ocr.extract_text(b"x").await.unwrap_err();

        assert!(matches!(err, OcrError::Http(_)));
        assert!(!err.to_string().contains("SECRET-VISION-KEY"));
        assert!(!format!("{:?}", err).contains("SECRET-VISION-KEY"));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let ocr = GoogleVisionOcr::new(reqwest::Client::new(), "");
        assert!(matches!(
            ocr.extract_text(b"x").await,
            Err(OcrError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images:annotate");
                then.status(403).body("API key invalid");
            })
            .await;

        let ocr = GoogleVisionOcr::new(reqwest::Client::new(), "bad")
            .with_base_url(server.base_url());
        match ocr.extract_text(b"x").await {
            Err(OcrError::Api { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "API key invalid");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
