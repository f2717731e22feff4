//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Autenticazione (JWT Supabase) e controlli di accesso
//! - Configurazione
//! - Gestione errori
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{
    AuthUser, Claims, admin_middleware, authentication_middleware, decode_jwt, require_premium,
};
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
