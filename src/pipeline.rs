//! Pipeline di elaborazione di un referto caricato
//!
//! OCR → parsing → classificazione dei parametri → spiegazioni → semaforo complessivo.
//! Le fasi pure sono esposte singolarmente (e composte da [`analyze`]) così che
//! [`process_report`] possa salvare l'avanzamento tra una fase e l'altra.

use crate::ai::{Explanation, ExplanationInput, LanguageModel, anonymize_text, generate_report_explanations};
use crate::core::AppState;
use crate::dtos::{CreateExplanationDTO, CreateParameterDTO, ReportMetadataDTO};
use crate::entities::FlagLevel;
use crate::ocr::{OcrEngine, OcrError, ParsedReport, parse_report};
use crate::repositories::Update;
use crate::safety::{self, Assessment};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const PROGRESS_STARTED: i32 = 10;
pub const PROGRESS_TEXT_EXTRACTED: i32 = 40;
pub const PROGRESS_PARAMETERS_SAVED: i32 = 60;
pub const PROGRESS_EXPLAINED: i32 = 80;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Ocr(#[from] OcrError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PipelineError {
    /// Messaggio salvato in `reports.error_message` e quindi visibile al client:
    /// mai il testo dell'errore sottostante, che può contenere URL o risposte dei servizi esterni
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Ocr(OcrError::NoText) => {
                "No text could be extracted from the image. Please upload a clearer photo."
            }
            Self::Ocr(OcrError::Unavailable(_)) => "Text recognition is currently unavailable.",
            Self::Ocr(_) => "Text recognition failed.",
            Self::Database(_) => "Report could not be saved.",
        }
    }
}

/// Risultato completo dell'analisi di un'immagine, prima della persistenza
#[derive(Debug, Clone)]
pub struct ReportAnalysis {
    pub metadata: ReportMetadataDTO,
    pub parameters: Vec<CreateParameterDTO>,
    /// Una spiegazione per parametro, nello stesso ordine
    pub explanations: Vec<Explanation>,
    pub flag_level: FlagLevel,
}

/// Metadati da salvare; il tipo indicato dall'utente prevale su quello rilevato
pub fn metadata_from(parsed: &ParsedReport, user_type: Option<&str>) -> ReportMetadataDTO {
    let report_type = user_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&parsed.report_type)
        .to_string();
    ReportMetadataDTO {
        report_type,
        lab_name: Some(parsed.lab_name.clone()),
        date: parsed.date.clone(),
        patient_name: parsed.patient_name.clone(),
        patient_age: parsed.patient_age.clone(),
        patient_gender: parsed.patient_gender.clone(),
    }
}

/// Classifica i parametri estratti e restituisce anche le valutazioni per il semaforo
pub fn assess_parameters(parsed: &ParsedReport) -> (Vec<CreateParameterDTO>, Vec<Assessment>) {
    parsed
        .parameters
        .iter()
        .map(|p| {
            let assessment = safety::assess(&p.name, &p.value, p.range.as_deref());
            let dto = CreateParameterDTO {
                name: p.name.clone(),
                value: p.value.clone(),
                unit: p.unit.clone(),
                normal_range: p.range.clone(),
                flag: assessment.flag,
                is_critical: assessment.is_critical,
            };
            (dto, assessment)
        })
        .unzip()
}

pub async fn explain_parameters(
    llm: &dyn LanguageModel,
    parameters: &[CreateParameterDTO],
) -> Vec<Explanation> {
    let inputs: Vec<ExplanationInput> = parameters
        .iter()
        .map(|p| ExplanationInput {
            name: p.name.clone(),
            value: p.value.clone(),
            unit: p.unit.clone(),
            normal_range: p.normal_range.clone(),
            flag: p.flag,
        })
        .collect();
    generate_report_explanations(llm, &inputs).await
}

/// Analisi completa, senza accesso al database
#[instrument(skip_all, fields(ocr = ocr.name(), size = image.len()))]
pub async fn analyze(
    ocr: &dyn OcrEngine,
    llm: &dyn LanguageModel,
    image: &[u8],
    user_type: Option<&str>,
) -> Result<ReportAnalysis, OcrError> {
    let text = ocr.extract_text(image).await?;
    let parsed = parse_report(&text);
    let (parameters, assessments) = assess_parameters(&parsed);
    let explanations = explain_parameters(llm, &parameters).await;

    Ok(ReportAnalysis {
        metadata: metadata_from(&parsed, user_type),
        flag_level: safety::flag_level(&assessments),
        parameters,
        explanations,
    })
}

/// Elabora un referto in background; ogni errore viene registrato sul referto stesso
#[instrument(skip(state, image, user_type), fields(report_id = %report_id, user_id = %user_id))]
pub async fn process_report(
    state: Arc<AppState>,
    report_id: Uuid,
    user_id: Uuid,
    image: Vec<u8>,
    user_type: Option<String>,
) {
    match run(&state, &report_id, &image, user_type.as_deref()).await {
        Ok(level) => info!("Report processed, flag level {:?}", level),
        Err(e) => {
            error!("Report processing failed: {}", e);
            if let Err(db) = state.report.mark_failed(&report_id, e.public_message()).await {
                error!("Could not record failure on report: {}", db);
            }
        }
    }
}

async fn run(
    state: &AppState,
    report_id: &Uuid,
    image: &[u8],
    user_type: Option<&str>,
) -> Result<FlagLevel, PipelineError> {
    state.report.set_progress(report_id, PROGRESS_STARTED).await?;

    let text = state.ocr.extract_text(image).await?;
    debug!("OCR text: {}", anonymize_text(&text));
    state.report.set_progress(report_id, PROGRESS_TEXT_EXTRACTED).await?;

    let parsed = parse_report(&text);
    if parsed.parameters.is_empty() {
        warn!("No parameters recognised in report");
    }
    state
        .report
        .update(report_id, &metadata_from(&parsed, user_type))
        .await?;

    let (parameters, assessments) = assess_parameters(&parsed);
    let saved = state.parameter.create_many(report_id, &parameters).await?;
    state.report.set_progress(report_id, PROGRESS_PARAMETERS_SAVED).await?;

    let explanations = explain_parameters(state.llm.as_ref(), &parameters).await;
    let rows: Vec<CreateExplanationDTO> = saved
        .iter()
        .zip(explanations)
        .map(|(param, exp)| CreateExplanationDTO {
            parameter_id: param.id,
            what: exp.what,
            meaning: exp.meaning,
            causes: exp.causes,
            next_steps: exp.next_steps,
        })
        .collect();
    state.explanation.create_many(&rows).await?;
    state.report.set_progress(report_id, PROGRESS_EXPLAINED).await?;

    let level = safety::flag_level(&assessments);
    state.report.mark_completed(report_id, level).await?;
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DisabledModel;
    use crate::entities::ParameterFlag;
    use async_trait::async_trait;

    struct FixedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn extract_text(&self, _image: &[u8]) -> Result<String, OcrError> {
            if self.0.trim().is_empty() {
                return Err(OcrError::NoText);
            }
            Ok(self.0.to_string())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    const CBC: &str = "\
City Diagnostics Lab
Date: 2024-01-15
COMPLETE BLOOD COUNT (CBC)
Hemoglobin 8.5 g/dL (13.0 - 17.0)
Total WBC Count 11,500 /cumm (4000 - 11000)
Platelet Count 2.5 lakh/cumm (1.5 - 4.5)
";

    #[tokio::test]
    async fn test_analyze_flags_and_explains_every_parameter() {
        let analysis = analyze(&FixedOcr(CBC), &DisabledModel, b"img", None)
            .await
            .unwrap();

        assert_eq!(analysis.metadata.report_type, "Complete Blood Count");
        assert_eq!(analysis.metadata.lab_name.as_deref(), Some("City Diagnostics Lab"));
        assert_eq!(analysis.metadata.date.as_deref(), Some("2024-01-15"));

        let flags: Vec<_> = analysis.parameters.iter().map(|p| p.flag).collect();
        assert_eq!(flags, vec![ParameterFlag::Low, ParameterFlag::High, ParameterFlag::Normal]);
        assert_eq!(analysis.explanations.len(), 3);
        // emoglobina oltre il 25% sotto il limite
        assert_eq!(analysis.flag_level, FlagLevel::Red);
    }

    #[tokio::test]
    async fn test_user_supplied_type_wins() {
        let analysis = analyze(&FixedOcr(CBC), &DisabledModel, b"img", Some("Annual Checkup"))
            .await
            .unwrap();
        assert_eq!(analysis.metadata.report_type, "Annual Checkup");
    }

    #[tokio::test]
    async fn test_blank_image_is_an_ocr_error() {
        let result = analyze(&FixedOcr("  "), &DisabledModel, b"img", None).await;
        assert!(matches!(result, Err(OcrError::NoText)));
    }

    #[tokio::test]
    async fn test_report_without_parameters_is_green() {
        let analysis = analyze(&FixedOcr("Acme Clinic\nthank you"), &DisabledModel, b"img", None)
            .await
            .unwrap();
        assert!(analysis.parameters.is_empty());
        assert!(analysis.explanations.is_empty());
        assert_eq!(analysis.flag_level, FlagLevel::Green);
    }

    #[test]
    fn test_public_message_hides_error_details() {
        let err = PipelineError::from(OcrError::Api {
            status: 403,
            body: "API key not valid: AIza-SECRET".to_string(),
        });
        assert_eq!(err.public_message(), "Text recognition failed.");
        assert!(!err.public_message().contains("SECRET"));

        let err = PipelineError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.public_message(), "Report could not be saved.");

        let err = PipelineError::from(OcrError::NoText);
        assert!(err.public_message().starts_with("No text could be extracted"));
    }
}
