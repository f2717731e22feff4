//! Configurazione - Caricamento delle variabili d'ambiente

use dotenv::dotenv;
use std::env;
use tracing::{info, warn};

const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Provider LLM selezionato tramite `LLM_PROVIDER`
#[derive(Debug, Clone, PartialEq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
    Disabled,
}

/// Motore OCR selezionato tramite `OCR_SERVICE`
#[derive(Debug, Clone, PartialEq)]
pub enum OcrService {
    Tesseract,
    GoogleVision,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub supabase_jwt_secret: String,
    pub storage_bucket: String,

    pub llm_provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_timeout_secs: u64,

    pub ocr_service: OcrService,
    pub tesseract_cmd: String,
    pub google_vision_api_key: Option<String>,

    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub max_upload_size: usize,
    pub free_tier_reports_per_month: i64,
    pub free_tier_family_members: i64,
    pub cors_origins: Vec<String>,
    pub app_env: String,
    pub debug: bool,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Costruisce la configurazione a partire da una funzione di lookup qualsiasi
    pub fn from_vars<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{} must be set in .env file", key))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        let database_url = required("DATABASE_URL")?;

        let mut supabase_url = required("SUPABASE_URL")?;
        if !supabase_url.ends_with('/') {
            supabase_url.push('/');
        }
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;
        let supabase_jwt_secret = required("SUPABASE_JWT_SECRET")?;

        let llm_provider = match or_default("LLM_PROVIDER", "openai").to_lowercase().as_str() {
            "openai" => LlmProvider::OpenAi,
            "gemini" => LlmProvider::Gemini,
            "none" | "disabled" => LlmProvider::Disabled,
            other => return Err(format!("Unsupported LLM_PROVIDER: {}", other)),
        };

        let ocr_service = match or_default("OCR_SERVICE", "tesseract").to_lowercase().as_str() {
            "tesseract" => OcrService::Tesseract,
            "google_vision" => OcrService::GoogleVision,
            other => return Err(format!("Unsupported OCR_SERVICE: {}", other)),
        };

        let google_vision_api_key = optional("GOOGLE_VISION_API_KEY");
        if ocr_service == OcrService::GoogleVision && google_vision_api_key.is_none() {
            return Err("GOOGLE_VISION_API_KEY must be set when OCR_SERVICE=google_vision".to_string());
        }

        let server_port = or_default("SERVER_PORT", "8000")
            .parse::<u16>()
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = or_default("MAX_DB_CONNECTIONS", "20")
            .parse::<u32>()
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let max_upload_size = match optional("MAX_UPLOAD_SIZE") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| "Invalid MAX_UPLOAD_SIZE: must be a size in bytes".to_string())?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let llm_timeout_secs = or_default("LLM_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|_| "Invalid LLM_TIMEOUT_SECS: must be a positive number".to_string())?;

        let free_tier_reports_per_month = or_default("FREE_TIER_REPORTS_PER_MONTH", "3")
            .parse::<i64>()
            .map_err(|_| "Invalid FREE_TIER_REPORTS_PER_MONTH: must be a number".to_string())?;

        let free_tier_family_members = or_default("FREE_TIER_FAMILY_MEMBERS", "2")
            .parse::<i64>()
            .map_err(|_| "Invalid FREE_TIER_FAMILY_MEMBERS: must be a number".to_string())?;

        let cors_origins = or_default(
            "CORS_ORIGINS",
            "http://localhost:8080,http://localhost:3000,http://localhost:5173",
        )
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

        let debug = matches!(
            or_default("DEBUG", "false").to_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        Ok(Config {
            database_url,
            supabase_url,
            supabase_anon_key,
            supabase_service_role_key: optional("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_jwt_secret,
            storage_bucket: or_default("STORAGE_BUCKET", "medical-reports"),
            llm_provider,
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: or_default("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: or_default("GEMINI_MODEL", "gemini-2.5-flash"),
            llm_timeout_secs,
            ocr_service,
            tesseract_cmd: or_default("TESSERACT_CMD", "tesseract"),
            google_vision_api_key,
            server_host: or_default("SERVER_HOST", "0.0.0.0"),
            server_port,
            max_connections,
            max_upload_size,
            free_tier_reports_per_month,
            free_tier_family_members,
            cors_origins,
            app_env: or_default("APP_ENV", "development"),
            debug,
        })
    }

    /// Chiave usata per le chiamate privilegiate (storage, admin API).
    /// Senza service role si ripiega sulla anon key.
    pub fn service_key(&self) -> &str {
        self.supabase_service_role_key
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Database: {}", Self::mask_url(&self.database_url));
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   Supabase: {}", self.supabase_url);
        info!("   Storage bucket: {}", self.storage_bucket);
        info!("   LLM provider: {:?}", self.llm_provider);
        info!("   OCR service: {:?}", self.ocr_service);
        info!("   Max upload size: {} bytes", self.max_upload_size);
        if self.supabase_service_role_key.is_none() {
            warn!("   SUPABASE_SERVICE_ROLE_KEY not set: storage and admin calls use the anon key");
        }
    }

    /// Maschera l'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://user:pw@localhost/mediguide"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, String> {
        Config::from_vars(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_and_trailing_slash() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.supabase_url, "https://project.supabase.co/");
        assert_eq!(config.storage_bucket, "medical-reports");
        assert_eq!(config.llm_provider, LlmProvider::OpenAi);
        assert_eq!(config.ocr_service, OcrService::Tesseract);
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.free_tier_reports_per_month, 3);
        assert_eq!(config.free_tier_family_members, 2);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.service_key(), "anon");
    }

    #[test]
    fn test_missing_required_variable() {
        let mut vars = base_vars();
        vars.remove("SUPABASE_JWT_SECRET");
        let err = load(&vars).unwrap_err();
        assert!(err.contains("SUPABASE_JWT_SECRET"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut vars = base_vars();
        vars.insert("SERVER_PORT", "not-a-port");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_provider_selection() {
        let mut vars = base_vars();
        vars.insert("LLM_PROVIDER", "Gemini");
        assert_eq!(load(&vars).unwrap().llm_provider, LlmProvider::Gemini);

        vars.insert("LLM_PROVIDER", "claude");
        assert!(load(&vars).unwrap_err().contains("LLM_PROVIDER"));
    }

    #[test]
    fn test_google_vision_requires_key() {
        let mut vars = base_vars();
        vars.insert("OCR_SERVICE", "google_vision");
        assert!(load(&vars).is_err());

        vars.insert("GOOGLE_VISION_API_KEY", "key");
        assert_eq!(load(&vars).unwrap().ocr_service, OcrService::GoogleVision);
    }

    #[test]
    fn test_cors_origins_are_split() {
        let mut vars = base_vars();
        vars.insert("CORS_ORIGINS", "https://a.app, https://b.app ,");
        let config = load(&vars).unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.app", "https://b.app"]);
    }

    #[test]
    fn test_mask_url_hides_credentials() {
        assert_eq!(
            Config::mask_url("postgres://user:pw@db:5432/app"),
            "postgres://***@db:5432/app"
        );
        assert_eq!(Config::mask_url("garbage"), "***");
    }
}
