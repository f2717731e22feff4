use crate::core::{AppError, AppState};
use crate::entities::ProfileRole;
use crate::repositories::Read;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Audience dei token emessi da Supabase Auth per gli utenti loggati
pub const SUPABASE_AUDIENCE: &str = "authenticated";

// struct che codifica il contenuto del token jwt emesso da Supabase
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize, // Expiry time of the token
    #[serde(default)]
    pub iat: usize, // Issued at time of the token
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Utente autenticato, inserito nelle Extension dal middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role.unwrap_or_else(|| SUPABASE_AUDIENCE.to_string()),
        }
    }
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    debug!("Decoding JWT token");
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SUPABASE_AUDIENCE]);

    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .inspect(|data| debug!("JWT token decoded successfully for user: {}", data.claims.sub))
    .inspect_err(|e| warn!("Failed to decode JWT token: {:?}", e))
}

/// Estrae il token dall'header Authorization (`Bearer <token>`)
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Invalid Authorization header format")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::unauthorized("Authorization header missing"));
        }
    };

    let token = bearer_token(auth_header).ok_or_else(|| {
        warn!("Authorization header is not a bearer token");
        AppError::unauthorized("Invalid Authorization header format")
    })?;

    let token_data = decode_jwt(token, &state.config.supabase_jwt_secret)
        .map_err(|_| AppError::unauthorized("Invalid token"))?;

    let current_user = AuthUser::from(token_data.claims);
    debug!("User authenticated: {}", current_user.id);
    req.extensions_mut().insert(current_user);

    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente abbia il ruolo admin nel proprio profilo.
/// Deve essere applicato dopo `authentication_middleware`.
#[instrument(skip(state, req, next))]
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let current_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    let profile = state.profile.read(&current_user.id).await?.ok_or_else(|| {
        warn!("Profile not found for user {}", current_user.id);
        AppError::forbidden("Admin privileges required")
    })?;

    if profile.role != ProfileRole::Admin {
        warn!("User {} is not an admin", current_user.id);
        return Err(AppError::forbidden("Admin privileges required"));
    }

    info!("Admin access granted to user {}", current_user.id);
    Ok(next.run(req).await)
}

/// Verifica che l'utente abbia un abbonamento premium attivo
///
/// # Returns
/// * `Ok(())` se l'utente è premium
/// * `Err(AppError)` 403 con codice `PREMIUM_REQUIRED` altrimenti
#[instrument(skip(state))]
pub async fn require_premium(state: &AppState, user_id: &Uuid) -> Result<(), AppError> {
    if state.subscription.find_active(user_id).await?.is_some() {
        return Ok(());
    }
    warn!("Premium feature requested by free user {}", user_id);
    Err(AppError::forbidden("This feature requires a premium subscription")
        .with_code("PREMIUM_REQUIRED"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    fn token(aud: &str, expires_in: Duration) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let claims = Claims {
            sub: id,
            exp: (now + expires_in).timestamp() as usize,
            iat: now.timestamp() as usize,
            aud: aud.to_string(),
            email: Some("alice@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        (id, jwt)
    }

    #[test]
    fn test_decode_valid_token() {
        let (id, jwt) = token(SUPABASE_AUDIENCE, Duration::hours(1));
        let data = decode_jwt(&jwt, SECRET).unwrap();
        assert_eq!(data.claims.sub, id);
        let user = AuthUser::from(data.claims);
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_reject_wrong_secret() {
        let (_, jwt) = token(SUPABASE_AUDIENCE, Duration::hours(1));
        assert!(decode_jwt(&jwt, "another-secret").is_err());
    }

    #[test]
    fn test_reject_wrong_audience() {
        let (_, jwt) = token("anon", Duration::hours(1));
        assert!(decode_jwt(&jwt, SECRET).is_err());
    }

    #[test]
    fn test_reject_expired_token() {
        let (_, jwt) = token(SUPABASE_AUDIENCE, Duration::hours(-2));
        assert!(decode_jwt(&jwt, SECRET).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Token abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
    }
}
