//! Supabase - Client REST per Storage e per le API admin di Auth
//!
//! Entrambi usano la service-role key e quindi girano solo lato server.

pub mod admin;
pub mod storage;

pub use admin::{AuthAdmin, AuthUserRecord};
pub use storage::{ObjectStorage, StorageError, SupabaseStorage};
