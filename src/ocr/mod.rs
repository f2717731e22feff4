//! OCR - Estrazione del testo dalle immagini dei referti e parsing strutturato
//!
//! Il motore OCR è dietro il trait [`OcrEngine`] così che la pipeline possa usare
//! indifferentemente la CLI di tesseract, Google Vision o un fake nei test.

pub mod parser;
pub mod tesseract;
pub mod vision;

pub use parser::{ParsedParameter, ParsedReport, parse_report};
pub use tesseract::TesseractOcr;
pub use vision::GoogleVisionOcr;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("no text could be extracted from the image")]
    NoText,

    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("OCR engine failed: {0}")]
    Failed(String),

    #[error("OCR request failed: {0}")]
    Http(reqwest::Error),

    #[error("OCR service returned {status}: {body}")]
    Api { status: u16, body: String },
}

// l'URL viene rimosso: alcune API (Google) autenticano anche tramite query string
impl From<reqwest::Error> for OcrError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Estrae il testo grezzo dall'immagine. Un risultato vuoto è `OcrError::NoText`.
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError>;

    fn name(&self) -> &'static str;
}
