//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod chat_message;
pub mod enums;
pub mod explanation;
pub mod family_connection;
pub mod parameter;
pub mod profile;
pub mod report;
pub mod subscription;
pub mod synthesis;

// Re-exports per facilitare l'import
pub use chat_message::ChatMessage;
pub use enums::{
    ConnectionStatus, FlagLevel, ParameterFlag, ProfileRole, ReportStatus, SubscriptionStatus,
};
pub use explanation::ReportExplanation;
pub use family_connection::FamilyConnection;
pub use parameter::ReportParameter;
pub use profile::Profile;
pub use report::Report;
pub use subscription::Subscription;
pub use synthesis::ReportSynthesis;
