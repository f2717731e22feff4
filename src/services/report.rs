//! Report services - Upload, consultazione, sintesi e confronto dei referti

use super::premium::{is_premium, month_start};
use super::{owned_report, readable_report};
use crate::ai::generate_synthesis as synthesize;
use crate::core::{AppError, AppState, AuthUser, require_premium};
use crate::dtos::{
    CompareReportsDTO, CompareResponseDTO, CreateReportDTO, Paginated, ParameterComparisonDTO,
    ParameterDTO, ReportListQuery, ReportStatusDTO, SynthesisAcceptedDTO, UploadQuery,
    UploadResponseDTO,
};
use crate::entities::{
    FlagLevel, Report, ReportExplanation, ReportParameter, ReportStatus, ReportSynthesis,
};
use crate::pipeline;
use crate::repositories::{Create, Delete, Read, ReportFilter};
use crate::safety::numeric_value;
use axum::{
    Extension,
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Tipo assegnato ai referti finché la pipeline non ne rileva uno
pub const UNKNOWN_REPORT_TYPE: &str = "Unknown";

/// Referti precedenti considerati dalla sintesi
const SYNTHESIS_HISTORY: i64 = 5;

const ALLOWED_IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Immagine ricevuta via multipart e già validata
pub(crate) struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.trim().to_lowercase();
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Legge il campo `file` del multipart controllando tipo e dimensione
pub(crate) async fn read_image(
    multipart: &mut Multipart,
    max_size: usize,
) -> Result<UploadedImage, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = extension_for(&content_type).ok_or_else(|| {
            warn!("Rejected upload with content type {:?}", content_type);
            AppError::bad_request("Invalid file type. Allowed: JPEG, PNG, WEBP")
                .with_code("INVALID_FILE_TYPE")
        })?;

        let bytes = field.bytes().await?;
        if bytes.len() > max_size {
            warn!("Rejected upload of {} bytes", bytes.len());
            return Err(AppError::payload_too_large("File too large"));
        }
        if bytes.is_empty() {
            return Err(AppError::bad_request("Uploaded file is empty"));
        }

        return Ok(UploadedImage {
            bytes: bytes.to_vec(),
            content_type,
            extension,
        });
    }
    Err(AppError::bad_request("Missing 'file' field in multipart body"))
}

/// Carica l'immagine su storage, crea il referto e avvia l'elaborazione in background
pub(crate) async fn start_processing(
    state: &Arc<AppState>,
    owner: Uuid,
    image: UploadedImage,
    report_type: Option<String>,
) -> Result<UploadResponseDTO, AppError> {
    let report_type = report_type
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let report_id = Uuid::new_v4();
    let path = format!("{}/{}.{}", owner, report_id, image.extension);

    state
        .storage
        .upload(&path, &image.bytes, &image.content_type)
        .await?;

    let created = state
        .report
        .create(&CreateReportDTO {
            id: report_id,
            user_id: owner,
            report_type: report_type
                .clone()
                .unwrap_or_else(|| UNKNOWN_REPORT_TYPE.to_string()),
            image_url: path.clone(),
        })
        .await;
    if let Err(e) = created {
        // nessun referto punta all'immagine: va rimossa subito
        if let Err(storage_err) = state.storage.remove(&path).await {
            warn!("Could not remove orphaned image {}: {}", path, storage_err);
        }
        return Err(e.into());
    }

    tokio::spawn(pipeline::process_report(
        state.clone(),
        report_id,
        owner,
        image.bytes,
        report_type,
    ));

    info!("Report {} accepted for processing", report_id);
    Ok(UploadResponseDTO {
        report_id,
        status: ReportStatus::Processing,
        message: "Report uploaded successfully. Processing started.",
    })
}

#[instrument(skip(state, current_user, multipart), fields(user_id = %current_user.id))]
pub async fn upload_report(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    debug!("Receiving report upload");
    // 1. Validare il file (tipo e dimensione) prima di qualunque accesso al database
    // 2. Verificare il limite mensile del piano gratuito
    // 3. Salvare immagine e referto, poi avviare la pipeline in background
    let image = read_image(&mut multipart, state.config.max_upload_size).await?;

    if !is_premium(&state, &current_user.id).await? {
        let used = state
            .report
            .count_since(&current_user.id, month_start(Utc::now()))
            .await?;
        if used >= state.config.free_tier_reports_per_month {
            warn!("Monthly report limit reached ({} reports)", used);
            return Err(AppError::too_many_requests(
                "Monthly report limit reached. Upgrade to premium for unlimited reports.",
            )
            .with_code("REPORT_LIMIT_REACHED"));
        }
    }

    let response = start_processing(&state, current_user.id, image, query.report_type).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, current_user, query), fields(user_id = %current_user.id))]
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<Paginated<Report>>, AppError> {
    query.validate()?;

    let flag_level = match query.flag_level.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<FlagLevel>()
                .map_err(|_| AppError::bad_request("Invalid flag_level filter"))?,
        ),
    };

    let owner = match query.target_user_id {
        Some(target) if target != current_user.id => {
            if !state.family.are_connected(&current_user.id, &target).await? {
                warn!("Listing reports of unconnected user {}", target);
                return Err(AppError::forbidden("Not connected to this user"));
            }
            target
        }
        _ => current_user.id,
    };

    let filter = ReportFilter {
        user_id: owner,
        search: query.search,
        report_type: query
            .report_type
            .filter(|t| !t.trim().is_empty() && t != "all"),
        flag_level,
        created_since: query.time_range.since(Utc::now()),
    };

    let (items, total) = state.report.find_page(&filter, query.page, query.limit).await?;
    info!("Listed {} of {} reports", items.len(), total);
    Ok(Json(Paginated::new(items, total, query.page, query.limit)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    Ok(Json(readable_report(&state, &report_id, &current_user).await?))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn get_report_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportStatusDTO>, AppError> {
    let report = readable_report(&state, &report_id, &current_user).await?;
    Ok(Json(ReportStatusDTO::from(&report)))
}

/// Elimina righe del referto e immagine; un errore dello storage non blocca la cancellazione
pub(crate) async fn remove_report(state: &AppState, report: &Report) -> Result<(), AppError> {
    if !state.report.delete(&report.id).await? {
        return Err(AppError::not_found("Report not found"));
    }
    if let Some(path) = report.image_url.as_deref() {
        if let Err(e) = state.storage.remove(path).await {
            warn!("Report {} deleted but image removal failed: {}", report.id, e);
        }
    }
    info!("Report {} deleted", report.id);
    Ok(())
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let report = owned_report(&state, &report_id, &current_user).await?;
    remove_report(&state, &report).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unisce ogni parametro alla sua spiegazione
fn with_explanations(
    parameters: Vec<ReportParameter>,
    explanations: Vec<ReportExplanation>,
) -> Vec<ParameterDTO> {
    let mut by_parameter: HashMap<Uuid, ReportExplanation> = explanations
        .into_iter()
        .map(|e| (e.parameter_id, e))
        .collect();
    parameters
        .into_iter()
        .map(|p| {
            let explanation = by_parameter.remove(&p.id);
            ParameterDTO::new(p, explanation)
        })
        .collect()
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn get_parameters(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Vec<ParameterDTO>>, AppError> {
    readable_report(&state, &report_id, &current_user).await?;
    let parameters = state.parameter.find_by_report(&report_id).await?;
    let explanations = state.explanation.find_by_report(&report_id).await?;
    debug!("Loaded {} parameters", parameters.len());
    Ok(Json(with_explanations(parameters, explanations)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn get_explanations(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Vec<ReportExplanation>>, AppError> {
    readable_report(&state, &report_id, &current_user).await?;
    Ok(Json(state.explanation.find_by_report(&report_id).await?))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn get_synthesis(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportSynthesis>, AppError> {
    readable_report(&state, &report_id, &current_user).await?;
    state
        .synthesis
        .read(&report_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Synthesis not generated yet"))
}

async fn synthesize_and_store(state: &AppState, report: &Report) -> Result<(), AppError> {
    let history = state.report.find_history(report, SYNTHESIS_HISTORY).await?;

    let mut ids: Vec<Uuid> = history.iter().map(|r| r.id).collect();
    ids.push(report.id);
    let mut by_report: HashMap<Uuid, Vec<ReportParameter>> = HashMap::new();
    for parameter in state.parameter.find_by_reports(&ids).await? {
        by_report.entry(parameter.report_id).or_default().push(parameter);
    }

    let current_params = by_report.remove(&report.id).unwrap_or_default();
    let history: Vec<(Report, Vec<ReportParameter>)> = history
        .into_iter()
        .map(|r| {
            let params = by_report.remove(&r.id).unwrap_or_default();
            (r, params)
        })
        .collect();

    let result = synthesize(state.llm.as_ref(), (report, &current_params), &history).await?;
    state
        .synthesis
        .upsert(
            &report.id,
            &result.status_summary,
            &result.key_trends,
            &result.doctor_precis,
        )
        .await?;
    Ok(())
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, report_id = %report_id))]
pub async fn generate_synthesis(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let report = owned_report(&state, &report_id, &current_user).await?;
    require_premium(&state, &current_user.id).await?;

    if report.status != ReportStatus::Completed {
        return Err(AppError::conflict("Report is still being processed"));
    }

    let task_state = state.clone();
    tokio::spawn(async move {
        match synthesize_and_store(&task_state, &report).await {
            Ok(()) => info!("Synthesis stored for report {}", report.id),
            Err(e) => error!("Synthesis for report {} failed: {}", report.id, e.message()),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SynthesisAcceptedDTO {
            status: "accepted",
            message: "Synthesis generation started",
        }),
    ))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Confronta i parametri dei due referti per nome (senza distinzione di maiuscole),
/// nell'ordine in cui compaiono nel primo e poi nel secondo
pub fn compare_parameters(
    first: &[ReportParameter],
    second: &[ReportParameter],
    only: Option<&str>,
) -> Vec<ParameterComparisonDTO> {
    let key = |name: &str| name.trim().to_lowercase();
    let wanted = only.map(key).filter(|k| !k.is_empty());

    let mut names: Vec<(String, &ReportParameter)> = Vec::new();
    for p in first.iter().chain(second) {
        let k = key(&p.name);
        if wanted.as_ref().is_some_and(|w| *w != k) || names.iter().any(|(n, _)| *n == k) {
            continue;
        }
        names.push((k, p));
    }

    names
        .into_iter()
        .map(|(k, sample)| {
            let a = first.iter().find(|p| key(&p.name) == k);
            let b = second.iter().find(|p| key(&p.name) == k);
            let change = match (
                a.and_then(|p| numeric_value(&p.value)),
                b.and_then(|p| numeric_value(&p.value)),
            ) {
                (Some(x), Some(y)) => Some(round2(y - x)),
                _ => None,
            };
            let direction = change.map(|c| {
                if c > 0.0 {
                    "increased"
                } else if c < 0.0 {
                    "decreased"
                } else {
                    "unchanged"
                }
            });
            ParameterComparisonDTO {
                name: sample.name.clone(),
                unit: a.or(b).and_then(|p| p.unit.clone()),
                value_1: a.map(|p| p.value.clone()),
                value_2: b.map(|p| p.value.clone()),
                change,
                direction,
            }
        })
        .collect()
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn compare_reports(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<CompareReportsDTO>,
) -> Result<Json<CompareResponseDTO>, AppError> {
    require_premium(&state, &current_user.id).await?;

    let report_1 = readable_report(&state, &body.report_id_1, &current_user).await?;
    let report_2 = readable_report(&state, &body.report_id_2, &current_user).await?;

    let params_1 = state.parameter.find_by_report(&report_1.id).await?;
    let params_2 = state.parameter.find_by_report(&report_2.id).await?;
    let comparisons = compare_parameters(&params_1, &params_2, body.parameter_name.as_deref());

    info!("Compared {} parameters", comparisons.len());
    Ok(Json(CompareResponseDTO {
        report_1,
        report_2,
        comparisons,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ParameterFlag;

    fn param(name: &str, value: &str) -> ReportParameter {
        ReportParameter {
            id: Uuid::new_v4(),
            report_id: Uuid::nil(),
            name: name.to_string(),
            value: value.to_string(),
            unit: Some("mg/dL".to_string()),
            normal_range: None,
            flag: ParameterFlag::Normal,
            is_critical: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compare_numeric_and_missing_values() {
        let first = [param("LDL", "160"), param("HDL", "45"), param("Urine Color", "Yellow")];
        let second = [param("ldl", "130.5"), param("Urine Color", "Pale"), param("Triglycerides", "150")];

        let out = compare_parameters(&first, &second, None);
        assert_eq!(out.len(), 4);

        assert_eq!(out[0].name, "LDL");
        assert_eq!(out[0].change, Some(-29.5));
        assert_eq!(out[0].direction, Some("decreased"));

        assert_eq!(out[1].value_2, None);
        assert_eq!(out[1].change, None);

        assert_eq!(out[2].value_2.as_deref(), Some("Pale"));
        assert_eq!(out[2].direction, None);

        assert_eq!(out[3].name, "Triglycerides");
        assert_eq!(out[3].value_1, None);
    }

    #[test]
    fn test_compare_single_parameter() {
        let first = [param("LDL", "130"), param("HDL", "45")];
        let second = [param("LDL", "130"), param("HDL", "50")];
        let out = compare_parameters(&first, &second, Some(" hdl "));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].direction, Some("increased"));
        assert_eq!(compare_parameters(&first, &second, Some("ldl"))[0].direction, Some("unchanged"));
    }

    #[test]
    fn test_allowed_image_types() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[test]
    fn test_explanations_are_attached_by_parameter() {
        let ldl = param("LDL", "160");
        let hdl = param("HDL", "45");
        let explanation = ReportExplanation {
            id: Uuid::new_v4(),
            parameter_id: hdl.id,
            what: "HDL".to_string(),
            meaning: "Normal".to_string(),
            causes: vec![],
            next_steps: vec![],
            generated_at: Utc::now(),
        };
        let out = with_explanations(vec![ldl, hdl], vec![explanation]);
        assert!(out[0].explanation.is_none());
        assert_eq!(out[1].explanation.as_ref().map(|e| e.meaning.as_str()), Some("Normal"));
    }
}
