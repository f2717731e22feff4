//! Enumerazioni - Tipi enumerati utilizzati nelle entità
//!
//! Ogni enum corrisponde a un tipo ENUM di Postgres (vedi `migrations/`).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ********************* ENUMERAZIONI UTILI **********************//

/// Stato di elaborazione di un referto
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Processing,
    Completed,
    Failed,
}

/// Semaforo complessivo di un referto
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[sqlx(type_name = "flag_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FlagLevel {
    Green,
    Yellow,
    Red,
}

impl FromStr for FlagLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            _ => Err(()),
        }
    }
}

/// Classificazione di un singolo parametro rispetto al range di riferimento
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "parameter_flag", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParameterFlag {
    Normal,
    High,
    Low,
}

impl ParameterFlag {
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Self::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

/// Stato persistito di un collegamento familiare
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Connected,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "profile_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    User,
    Admin,
}
