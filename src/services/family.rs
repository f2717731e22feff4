//! Family services - Inviti e collegamenti familiari per la condivisione dei referti

use super::premium::is_premium;
use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{
    AcceptInviteDTO, CreateFamilyConnectionDTO, FamilyMemberDTO, HealthStatus, InviteDTO,
    InviteResponseDTO, ViewerConnectionStatus,
};
use crate::entities::{FamilyConnection, Profile};
use crate::repositories::{Create, Delete, Read};
use axum::{
    Extension,
    body::Bytes,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn same_email(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| normalize_email(a) == normalize_email(b))
}

/// Profili delle controparti, indicizzati per id
async fn counterpart_profiles(
    state: &AppState,
    connections: &[FamilyConnection],
    viewer: &Uuid,
) -> Result<HashMap<Uuid, Profile>, AppError> {
    let ids: Vec<Uuid> = connections.iter().filter_map(|c| c.other_user(viewer)).collect();
    Ok(state
        .profile
        .find_many(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

/// Email da mostrare: quella del profilo, altrimenti quella dell'invito se l'ha scritta il viewer
fn display_email(connection: &FamilyConnection, profile: Option<&Profile>, viewer: &Uuid) -> String {
    profile
        .and_then(|p| p.email.clone())
        .or_else(|| (connection.user_id == *viewer).then(|| connection.invited_email.clone()))
        .unwrap_or_default()
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<Vec<FamilyMemberDTO>>, AppError> {
    debug!("Listing family members");
    // 1. Recuperare i collegamenti attivi in entrambe le direzioni
    // 2. Caricare i profili delle controparti con una sola query
    // 3. Per ogni membro, l'ultimo referto completato determina lo stato di salute
    let connections = state.family.find_connected(&current_user.id).await?;
    let profiles = counterpart_profiles(&state, &connections, &current_user.id).await?;

    let latest = try_join_all(connections.iter().map(|c| {
        let state = state.clone();
        let other = c.other_user(&current_user.id);
        async move {
            match other {
                Some(id) => state.report.find_latest_completed(&id).await,
                None => Ok(None),
            }
        }
    }))
    .await?;

    let members: Vec<FamilyMemberDTO> = connections
        .iter()
        .zip(latest)
        .map(|(connection, last_report)| {
            let other = connection.other_user(&current_user.id);
            let profile = other.and_then(|id| profiles.get(&id));
            FamilyMemberDTO {
                id: connection.id,
                user_id: other,
                email: display_email(connection, profile, &current_user.id),
                name: profile.and_then(|p| p.full_name.clone()),
                nickname: connection.nickname.clone(),
                connection_status: ViewerConnectionStatus::for_viewer(connection, &current_user.id),
                status: HealthStatus::from(last_report.as_ref().map(|r| r.flag_level)),
                last_report_at: last_report.map(|r| r.created_at),
                created_at: connection.created_at,
            }
        })
        .collect();

    info!("Found {} family members", members.len());
    Ok(Json(members))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<Vec<FamilyMemberDTO>>, AppError> {
    let connections = state
        .family
        .find_pending(&current_user.id, current_user.email.as_deref())
        .await?;
    let profiles = counterpart_profiles(&state, &connections, &current_user.id).await?;

    let pending = connections
        .iter()
        .map(|connection| {
            // per un invito ricevuto via email la controparte è chi lo ha inviato
            let other = if connection.user_id == current_user.id {
                connection.connected_user_id
            } else {
                Some(connection.user_id)
            };
            let profile = other.and_then(|id| profiles.get(&id));
            FamilyMemberDTO {
                id: connection.id,
                user_id: other,
                email: display_email(connection, profile, &current_user.id),
                name: profile.and_then(|p| p.full_name.clone()),
                nickname: connection.nickname.clone(),
                connection_status: ViewerConnectionStatus::for_viewer(connection, &current_user.id),
                status: HealthStatus::Pending,
                last_report_at: None,
                created_at: connection.created_at,
            }
        })
        .collect();

    Ok(Json(pending))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn invite_member(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<InviteDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Creating family invite");
    // 1. Validare l'email e impedire l'auto-invito
    // 2. Rifiutare inviti duplicati in qualunque direzione
    // 3. Applicare il limite del piano gratuito sui collegamenti attivi
    // 4. Creare l'invito, legandolo subito al profilo se l'email è già registrata
    body.validate()?;
    let email = normalize_email(&body.email);

    if same_email(current_user.email.as_deref(), &email) {
        return Err(AppError::bad_request("You cannot invite yourself"));
    }

    let invitee = state.profile.find_by_email(&email).await?;
    if invitee.as_ref().is_some_and(|p| p.id == current_user.id) {
        return Err(AppError::bad_request("You cannot invite yourself"));
    }
    let invitee_id = invitee.map(|p| p.id);

    if state
        .family
        .find_between(&current_user.id, &email, invitee_id.as_ref())
        .await?
        .is_some()
    {
        warn!("Duplicate family invite");
        return Err(AppError::conflict("A connection with this user already exists"));
    }

    if !is_premium(&state, &current_user.id).await? {
        let connected = state.family.count_connected(&current_user.id).await?;
        if connected >= state.config.free_tier_family_members {
            warn!("Family member limit reached ({} connections)", connected);
            return Err(AppError::forbidden(
                "Family member limit reached. Upgrade to premium to add more members.",
            )
            .with_code("FAMILY_LIMIT_REACHED"));
        }
    }

    let connection = state
        .family
        .create(&CreateFamilyConnectionDTO {
            user_id: current_user.id,
            connected_user_id: invitee_id,
            invited_email: email,
            nickname: body.nickname.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    info!("Family invite {} created", connection.id);
    Ok((
        StatusCode::CREATED,
        Json(InviteResponseDTO {
            connection_id: connection.id,
            message: "Invitation sent",
        }),
    ))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, connection_id = %connection_id))]
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(connection_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<FamilyConnection>, AppError> {
    // il body è facoltativo
    let body: AcceptInviteDTO = if body.iter().all(u8::is_ascii_whitespace) {
        AcceptInviteDTO::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::bad_request("Invalid JSON body").with_details(e.to_string()))?
    };
    body.validate()?;

    state
        .family
        .accept(
            &connection_id,
            &current_user.id,
            current_user.email.as_deref(),
            body.nickname.as_deref().filter(|n| !n.trim().is_empty()),
        )
        .await?
        .map(Json)
        .ok_or_else(|| {
            warn!("No pending invite for this user");
            AppError::not_found("Invitation not found")
        })
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, connection_id = %connection_id))]
pub async fn remove_connection(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(connection_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let connection = state
        .family
        .read(&connection_id)
        .await?
        .filter(|c| {
            c.involves(&current_user.id) || same_email(current_user.email.as_deref(), &c.invited_email)
        })
        .ok_or_else(|| AppError::not_found("Connection not found"))?;

    state.family.delete(&connection.id).await?;
    info!("Family connection removed");
    Ok(StatusCode::NO_CONTENT)
}
