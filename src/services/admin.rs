//! Admin services - Gestione utenti e referti riservata agli amministratori

use super::report::{read_image, remove_report, start_processing};
use crate::core::{AppError, AppState};
use crate::dtos::{AdminUserDTO, AllReportsQuery, DeletedResponse, UploadQuery};
use crate::entities::{Profile, ProfileRole, Report};
use crate::repositories::Read;
use crate::supabase::AuthUserRecord;
use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Unisce gli utenti di Supabase Auth con i profili applicativi
pub fn merge_users(auth_users: Vec<AuthUserRecord>, profiles: Vec<Profile>) -> Vec<AdminUserDTO> {
    let mut profiles: HashMap<Uuid, Profile> = profiles.into_iter().map(|p| (p.id, p)).collect();
    let mut merged: Vec<AdminUserDTO> = auth_users
        .into_iter()
        .map(|user| {
            let profile = profiles.remove(&user.id);
            AdminUserDTO {
                id: user.id,
                email: user.email.or_else(|| profile.as_ref().and_then(|p| p.email.clone())),
                full_name: profile.as_ref().and_then(|p| p.full_name.clone()),
                phone_number: profile
                    .as_ref()
                    .and_then(|p| p.phone_number.clone())
                    .or(user.phone),
                role: profile.as_ref().map(|p| p.role).unwrap_or(ProfileRole::User),
                created_at: user.created_at.or(profile.as_ref().map(|p| p.created_at)),
                last_sign_in_at: user.last_sign_in_at,
            }
        })
        .collect();

    // profili senza utente auth corrispondente
    merged.extend(profiles.into_values().map(AdminUserDTO::from));
    merged
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdminUserDTO>>, AppError> {
    debug!("Listing users for admin");
    let profiles = state.profile.find_all().await?;

    let users = match state.auth_admin.list_users().await {
        Ok(auth_users) => merge_users(auth_users, profiles),
        Err(e) => {
            warn!("Auth admin API unavailable, listing profiles only: {}", e);
            profiles.into_iter().map(AdminUserDTO::from).collect()
        }
    };

    info!("Listed {} users", users.len());
    Ok(Json(users))
}

#[instrument(skip(state, multipart), fields(target_user = %user_id))]
pub async fn admin_upload_report(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let image = read_image(&mut multipart, state.config.max_upload_size).await?;

    if state.profile.read(&user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let response = start_processing(&state, user_id, image, query.report_type).await?;
    info!("Admin upload accepted for user {}", user_id);
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state))]
pub async fn list_all_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AllReportsQuery>,
) -> Result<Json<Vec<Report>>, AppError> {
    query.validate()?;
    Ok(Json(state.report.find_all(query.limit).await?))
}

#[instrument(skip(state), fields(target_user = %user_id))]
pub async fn list_user_reports(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Report>>, AppError> {
    Ok(Json(state.report.find_by_user(&user_id).await?))
}

#[instrument(skip(state), fields(report_id = %report_id))]
pub async fn admin_delete_report(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let report = state
        .report
        .read(&report_id)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))?;
    remove_report(&state, &report).await?;
    Ok(Json(DeletedResponse { status: "deleted" }))
}
