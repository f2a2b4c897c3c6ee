//! Remedy API Gateway
//!
//! HTTP front end for the symptom assistant.
//! Handles:
//! - Symptom entry, suggestions and analysis
//! - Treatment lookup with optional enhancement
//! - Consultation sessions and follow-up chat
//! - Rate limiting and observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use remedy_common::{
    assistant::TreatmentEnhancer,
    config::{AppConfig, ObservabilityConfig},
    llm::{create_language_model, LanguageModel},
    metrics::{self, LATENCY_BUCKETS, LLM_BUCKETS, METRICS_PREFIX},
    session::SessionStore,
    KnowledgeBase, SymptomIndex,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{create_rate_limiter, rate_limit_middleware, RateLimitState};

/// How often idle sessions are swept
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub kb: Arc<KnowledgeBase>,
    pub index: Arc<SymptomIndex>,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub enhancer: Arc<TreatmentEnhancer>,
    pub sessions: Arc<SessionStore>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        kb: KnowledgeBase,
        llm: Option<Arc<dyn LanguageModel>>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let index = SymptomIndex::build(&kb);
        let sessions = SessionStore::from_config(&config.session);

        Self {
            kb: Arc::new(kb),
            index: Arc::new(index),
            enhancer: Arc::new(TreatmentEnhancer::new(llm.clone())),
            llm,
            sessions: Arc::new(sessions),
            metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.observability);

    info!("Starting Remedy API Gateway v{}", remedy_common::VERSION);

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        metrics::register_metrics();
        Some(install_prometheus()?)
    } else {
        None
    };

    // A missing knowledge base is not fatal: the service stays up and reports not ready
    let kb = KnowledgeBase::load(&config.knowledge_base.path).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load knowledge base, continuing with none");
        KnowledgeBase::default()
    });

    let llm = create_language_model(&config.llm);

    let rate_limit = if config.rate_limit.enabled {
        Some(create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        )?)
    } else {
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let shutdown_timeout = config.shutdown_timeout();

    // Create app state
    let state = AppState::new(&config, kb, llm, metrics_handle);

    spawn_session_purger(state.sessions.clone());

    // Build the router
    let app = create_router(state, rate_limit);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            })
            .await
    });

    shutdown_signal().await;
    stop_tx.send(()).ok();

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => result??,
        Err(_) => warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing; `RUST_LOG` wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Install the Prometheus recorder with SLO-aligned buckets
fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_analysis_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_llm_duration_seconds", METRICS_PREFIX)),
            LLM_BUCKETS,
        )?
        .install_recorder()?;

    Ok(handle)
}

fn spawn_session_purger(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            sessions.purge_expired().await;
        }
    });
}

/// Create the main application router
fn create_router(state: AppState, rate_limit: Option<RateLimitState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        // Symptom entry
        .route("/symptoms/segment", post(handlers::symptoms::segment))
        .route("/symptoms/suggest", get(handlers::symptoms::suggest))
        .route("/symptoms/common", get(handlers::symptoms::common))
        .route("/symptoms/{symptom}/diseases", get(handlers::symptoms::diseases))
        .route("/symptoms/extract", post(handlers::symptoms::extract))
        .route("/body-regions/{region}", get(handlers::symptoms::body_region))

        // Analysis and treatments
        .route("/analyze", post(handlers::analysis::analyze))
        .route("/diseases/{name}/treatments", get(handlers::treatments::get_treatments))

        // Session endpoints
        .route("/sessions", post(handlers::sessions::create_session))
        .route("/sessions/{id}", get(handlers::sessions::get_session))
        .route(
            "/sessions/{id}/symptoms",
            post(handlers::sessions::add_symptoms).delete(handlers::sessions::clear_symptoms),
        )
        .route(
            "/sessions/{id}/symptoms/{symptom}",
            delete(handlers::sessions::remove_symptom),
        )
        .route("/sessions/{id}/describe", post(handlers::sessions::describe))
        .route("/sessions/{id}/analyze", post(handlers::sessions::analyze_session))
        .route("/sessions/{id}/selection", put(handlers::sessions::update_selection))
        .route("/sessions/{id}/mode", put(handlers::sessions::set_mode))
        .route("/sessions/{id}/treatments", get(handlers::sessions::session_treatments))
        .route("/sessions/{id}/chat", post(handlers::sessions::chat));

    if let Some(limiter) = rate_limit {
        api_routes = api_routes.layer(from_fn_with_state(limiter, rate_limit_middleware));
    }

    // Compose the app
    Router::new()
        // Probes and metrics (not rate limited)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/v1", api_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
