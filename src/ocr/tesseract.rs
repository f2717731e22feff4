//! Motore OCR basato sulla CLI di tesseract

use super::{OcrEngine, OcrError};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{ImageError, ImageFormat};
use std::io::{Cursor, ErrorKind};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Page segmentation: blocco uniforme di testo, poi testo sparso come secondo tentativo
const PRIMARY_PSM: &str = "6";
const SPARSE_PSM: &str = "11";

/// Intervallo di larghezza dell'immagine passata a tesseract (1800px bastano per un A4)
const MIN_WIDTH: u32 = 300;
const MAX_WIDTH: u32 = 1800;

/// Nuove dimensioni a rapporto costante, `None` se la larghezza è già nell'intervallo
fn target_dimensions(width: u32, height: u32) -> Option<(u32, u32)> {
    let target = match width {
        0 => return None,
        w if w < MIN_WIDTH => MIN_WIDTH,
        w if w > MAX_WIDTH => MAX_WIDTH,
        _ => return None,
    };
    let scale = f64::from(target) / f64::from(width);
    let height = ((f64::from(height) * scale) as u32).max(1);
    Some((target, height))
}

/// Converte in RGB, ridimensiona (Lanczos) e ricodifica in PNG
fn prepare_image(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let rgb = match target_dimensions(rgb.width(), rgb.height()) {
        Some((width, height)) => {
            debug!("Resizing {}x{} to {}x{}", rgb.width(), rgb.height(), width, height);
            imageops::resize(&rgb, width, height, FilterType::Lanczos3)
        }
        None => rgb,
    };

    let mut png = Cursor::new(Vec::new());
    rgb.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

pub struct TesseractOcr {
    command: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Esegue `tesseract stdin stdout` passando l'immagine su stdin
    async fn run(&self, image: &[u8], psm: &str) -> Result<String, OcrError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", "eng", "--oem", "3", "--psm", psm])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    OcrError::Unavailable(format!("'{}' not found in PATH", self.command))
                }
                _ => OcrError::Failed(e.to_string()),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Failed("tesseract stdin not captured".to_string()))?;
        stdin
            .write_all(image)
            .await
            .map_err(|e| OcrError::Failed(e.to_string()))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::Failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("tesseract exited with {}: {}", output.status, stderr.trim());
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        // decodifica e resize sono CPU-bound: fuori dal runtime async
        let original = image.to_vec();
        let prepared = tokio::task::spawn_blocking(move || prepare_image(&original))
            .await
            .map_err(|e| OcrError::Failed(e.to_string()))?;
        let prepared = match prepared {
            Ok(png) => png,
            Err(e) => {
                // tesseract riconosce formati che il decoder non gestisce
                warn!("Image preprocessing failed, using original bytes: {}", e);
                image.to_vec()
            }
        };
        let image = prepared.as_slice();

        let text = self.run(image, PRIMARY_PSM).await?;
        if !text.trim().is_empty() {
            return Ok(text);
        }

        debug!("No text with psm {}, retrying as sparse text", PRIMARY_PSM);
        let text = self.run(image, SPARSE_PSM).await?;
        if text.trim().is_empty() {
            return Err(OcrError::NoText);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}
