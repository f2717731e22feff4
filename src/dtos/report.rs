//! Report DTOs - Data Transfer Objects per i referti

use crate::entities::{Report, ReportStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// DTO per creare un nuovo referto (l'id è generato prima dell'upload su storage)
#[derive(Debug, Clone)]
pub struct CreateReportDTO {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_type: String,
    pub image_url: String,
}

/// Metadati estratti dall'OCR, scritti a metà elaborazione
#[derive(Debug, Clone, Default)]
pub struct ReportMetadataDTO {
    pub report_type: String,
    pub lab_name: Option<String>,
    pub date: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<String>,
    pub patient_gender: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct UploadResponseDTO {
    pub report_id: Uuid,
    pub status: ReportStatus,
    pub message: &'static str,
}

#[derive(Serialize, Debug)]
pub struct ReportStatusDTO {
    pub report_id: Uuid,
    pub status: ReportStatus,
    pub progress: i32,
    pub error_message: Option<String>,
}

impl From<&Report> for ReportStatusDTO {
    fn from(value: &Report) -> Self {
        Self {
            report_id: value.id,
            status: value.status,
            progress: value.progress,
            error_message: value.error_message.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SynthesisAcceptedDTO {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Deserialize, Debug)]
pub struct CompareReportsDTO {
    pub report_id_1: Uuid,
    pub report_id_2: Uuid,
    pub parameter_name: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ParameterComparisonDTO {
    pub name: String,
    pub unit: Option<String>,
    pub value_1: Option<String>,
    pub value_2: Option<String>,
    /// Differenza `value_2 - value_1`, solo se entrambi numerici
    pub change: Option<f64>,
    /// `increased`, `decreased` o `unchanged`
    pub direction: Option<&'static str>,
}

#[derive(Serialize, Debug)]
pub struct CompareResponseDTO {
    pub report_1: Report,
    pub report_2: Report,
    pub comparisons: Vec<ParameterComparisonDTO>,
}
