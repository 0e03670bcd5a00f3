//! HTTP surface: health check, sign-in and photo upload.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

pub mod error;
pub mod routes;

use crate::app_config::AppConfig;
use crate::estimator::EstimatorClient;
use crate::identity::{GoogleIdentity, IdentityProvider};
use crate::pipeline::{NutritionPipeline, PipelineLogger};
use crate::prompt::NUTRITION_INSTRUCTION;
use crate::providers::create_provider;
use crate::store::{BlobStore, EntryStore, MemoryStore, SessionStore, SupabaseStore};
use routes::{image_handler, oauth_handler, root_handler};

pub struct AppState {
    pub pipeline: NutritionPipeline,
    pub instruction: String,
    pub blobs: Arc<dyn BlobStore>,
    pub entries: Arc<dyn EntryStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    /// State backed by one store for blobs, entries and sessions.
    pub fn with_store<S>(
        pipeline: NutritionPipeline,
        store: Arc<S>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self
    where
        S: BlobStore + EntryStore + SessionStore + 'static,
    {
        Self {
            pipeline,
            instruction: NUTRITION_INSTRUCTION.to_string(),
            blobs: store.clone(),
            entries: store.clone(),
            sessions: store,
            identity,
        }
    }

    /// Wire collaborators from config and environment.
    pub async fn from_env(config: &AppConfig) -> anyhow::Result<Self> {
        let provider = create_provider().await?;
        provider.validate_config()?;
        log::info!("Vision provider: {}/{}", provider.name(), provider.model());

        let mut estimator = EstimatorClient::new(Arc::from(provider));
        if let Some(temperature) = config.pipeline.temperature {
            estimator = estimator.with_temperature(temperature);
        }

        let mut pipeline =
            NutritionPipeline::new(estimator, config.pipeline.to_pipeline_config())?;
        if let Some(dir) = &config.pipeline.event_log_dir {
            let logger = PipelineLogger::new(Path::new(dir))
                .with_context(|| format!("opening pipeline event log in {dir}"))?;
            log::info!("Pipeline events -> {}", logger.path().display());
            pipeline = pipeline.with_logger(logger);
        }

        let identity = match GoogleIdentity::from_env() {
            Some(google) => {
                let google: Arc<dyn IdentityProvider> = Arc::new(google?);
                Some(google)
            }
            None => {
                log::warn!("GOOGLE_* not set, /oauth disabled");
                None
            }
        };

        let state = match SupabaseStore::from_env(config.storage.clone()) {
            Some(store) => Self::with_store(pipeline, Arc::new(store?), identity),
            None => {
                log::warn!("SUPABASE_URL/SUPABASE_KEY not set, using in-memory store");
                Self::with_store(pipeline, Arc::new(MemoryStore::new()), identity)
            }
        };
        Ok(state)
    }
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/oauth", get(oauth_handler))
        .route("/image", post(image_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    log::info!("Initializing state...");
    let state = Arc::new(AppState::from_env(&config).await?);

    let app = router(state, config.server.max_upload_mb * 1024 * 1024);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    log::info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
