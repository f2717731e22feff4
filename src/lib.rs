//! MediGuide server library - espone i moduli principali per i test

pub mod ai;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod ocr;
pub mod pipeline;
pub mod repositories;
pub mod safety;
pub mod services;
pub mod supabase;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, auth, config};
pub use services::{health, root};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Margine per gli header multipart oltre alla dimensione massima del file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", configure_api_routes(state.clone()))
        .layer(cors)
        .with_state(state)
}

/// `*` (o nessuna origine configurata) apre a qualunque origine
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| {
            HeaderValue::from_str(o)
                .inspect_err(|_| warn!("Ignoring invalid CORS origin {}", o))
                .ok()
        })
        .collect();
    base.allow_origin(parsed)
}

fn configure_api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/reports", configure_report_routes(state.clone()))
        .nest("/chat", configure_chat_routes(state.clone()))
        .nest("/chatbot", configure_chatbot_routes(state.clone()))
        .nest("/family", configure_family_routes(state.clone()))
        .nest("/premium", configure_premium_routes(state.clone()))
        .nest("/admin", configure_admin_routes(state))
}

/// Configura le routes per i referti
fn configure_report_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    let upload_limit = state.config.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/upload",
            post(upload_report).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/", get(list_reports))
        .route("/compare", post(compare_reports))
        .route("/{report_id}", get(get_report).delete(delete_report))
        .route("/{report_id}/status", get(get_report_status))
        .route("/{report_id}/parameters", get(get_parameters))
        .route("/{report_id}/explanations", get(get_explanations))
        .route("/{report_id}/synthesis", get(get_synthesis))
        .route("/{report_id}/generate-synthesis", post(generate_synthesis))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes della chat sui referti
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/reports/{report_id}/message", post(send_message))
        .route("/reports/{report_id}/history", get(get_chat_history))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_chatbot_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/ask", post(ask_chatbot))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes per i collegamenti familiari
fn configure_family_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/members", get(list_members))
        .route("/pending", get(list_pending))
        .route("/invite", post(invite_member))
        .route("/accept/{connection_id}", post(accept_invite))
        .route("/connections/{connection_id}", delete(remove_connection))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_premium_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/status", get(get_premium_status))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes di amministrazione (autenticazione + ruolo admin)
fn configure_admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::{admin_middleware, authentication_middleware};
    use services::*;

    let upload_limit = state.config.max_upload_size + MULTIPART_OVERHEAD;

    // l'ultimo layer aggiunto è il primo ad essere eseguito
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/{user_id}/reports/upload",
            post(admin_upload_report).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/users/{user_id}/reports", get(list_user_reports))
        .route("/all-reports", get(list_all_reports))
        .route("/reports/{report_id}", delete(admin_delete_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
