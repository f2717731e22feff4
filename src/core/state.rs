//! Application State - Stato globale dell'applicazione
//!
//! Contiene tutti i repository, la configurazione e i client verso i servizi esterni
//! (storage, OCR, LLM) condivisi tra route, middleware e task in background.

use crate::ai::{DisabledModel, GeminiClient, LanguageModel, OpenAiClient};
use crate::core::config::{Config, LlmProvider, OcrService};
use crate::ocr::{GoogleVisionOcr, OcrEngine, TesseractOcr};
use crate::repositories::{
    ChatMessageRepository, ExplanationRepository, FamilyConnectionRepository, ParameterRepository,
    ProfileRepository, ReportRepository, SubscriptionRepository, SynthesisRepository,
};
use crate::supabase::{AuthAdmin, ObjectStorage, SupabaseStorage};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Repository per i profili utente
    pub profile: ProfileRepository,

    /// Repository per i referti caricati
    pub report: ReportRepository,

    /// Repository per i parametri estratti dai referti
    pub parameter: ParameterRepository,

    /// Repository per le spiegazioni generate dall'LLM
    pub explanation: ExplanationRepository,

    /// Repository per le sintesi in cache
    pub synthesis: SynthesisRepository,

    /// Repository per i collegamenti familiari
    pub family: FamilyConnectionRepository,

    /// Repository per la cronologia della chat sui referti
    pub chat: ChatMessageRepository,

    /// Repository per gli abbonamenti
    pub subscription: SubscriptionRepository,

    /// Configurazione caricata all'avvio
    pub config: Config,

    /// Storage degli oggetti (immagini dei referti)
    pub storage: Arc<dyn ObjectStorage>,

    /// Motore OCR
    pub ocr: Arc<dyn OcrEngine>,

    /// Modello linguistico per spiegazioni, chat e sintesi
    pub llm: Arc<dyn LanguageModel>,

    /// Client per le API admin di Supabase Auth
    pub auth_admin: AuthAdmin,
}

impl AppState {
    /// Crea una nuova istanza di AppState inizializzando repository e client esterni
    /// a partire dalla configurazione.
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni Postgres condiviso
    /// * `config` - Configurazione dell'applicazione
    pub fn new(pool: PgPool, config: Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build configured HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        let storage: Arc<dyn ObjectStorage> = Arc::new(SupabaseStorage::new(
            http.clone(),
            &config.supabase_url,
            &config.storage_bucket,
            config.service_key(),
        ));

        let ocr: Arc<dyn OcrEngine> = match config.ocr_service {
            OcrService::Tesseract => Arc::new(TesseractOcr::new(config.tesseract_cmd.clone())),
            OcrService::GoogleVision => Arc::new(GoogleVisionOcr::new(
                http.clone(),
                config.google_vision_api_key.clone().unwrap_or_default(),
            )),
        };

        let llm: Arc<dyn LanguageModel> = match (&config.llm_provider, &config.openai_api_key, &config.gemini_api_key) {
            (LlmProvider::OpenAi, Some(key), _) => Arc::new(
                OpenAiClient::new(http.clone(), key.clone(), config.openai_model.clone())
                    .with_base_url(config.openai_base_url.clone()),
            ),
            (LlmProvider::Gemini, _, Some(key)) => Arc::new(GeminiClient::new(
                http.clone(),
                key.clone(),
                config.gemini_model.clone(),
            )),
            (LlmProvider::Disabled, _, _) => Arc::new(DisabledModel),
            (provider, _, _) => {
                warn!("LLM provider {:?} selected but no API key configured, AI features use fallbacks", provider);
                Arc::new(DisabledModel)
            }
        };

        let auth_admin = AuthAdmin::new(http, &config.supabase_url, config.service_key());

        Self::with_services(pool, config, storage, ocr, llm, auth_admin)
    }

    /// Crea AppState con client esterni forniti dal chiamante (usato nei test)
    pub fn with_services(
        pool: PgPool,
        config: Config,
        storage: Arc<dyn ObjectStorage>,
        ocr: Arc<dyn OcrEngine>,
        llm: Arc<dyn LanguageModel>,
        auth_admin: AuthAdmin,
    ) -> Self {
        Self {
            profile: ProfileRepository::new(pool.clone()),
            report: ReportRepository::new(pool.clone()),
            parameter: ParameterRepository::new(pool.clone()),
            explanation: ExplanationRepository::new(pool.clone()),
            synthesis: SynthesisRepository::new(pool.clone()),
            family: FamilyConnectionRepository::new(pool.clone()),
            chat: ChatMessageRepository::new(pool.clone()),
            subscription: SubscriptionRepository::new(pool),
            config,
            storage,
            ocr,
            llm,
            auth_admin,
        }
    }
}
