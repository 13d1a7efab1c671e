use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::Method,
    http::Request,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use clap::Parser;
use dotenvy::dotenv;
use eco_common::{
    config::PipelineConfig,
    logging::{init_tracing_subscriber, install_tracing_panic_hook},
    pipeline::{Collaborators, MatchingPipeline},
    services::{
        CatalogService, HttpCatalogService, HttpLanguageService,
        HttpUserDataService, IntentResolver, Narrator, Reranker, UserDataService,
    },
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod error;
pub mod handlers;
pub mod telemetry;

use error::ApiError;
use handlers::{health, matches, similar};

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);
const BODY_LIMIT_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "eco-api", about = "HTTP API for EcoNexo volunteer matching")]
struct Cli {
    /// Server port; takes precedence over MCP_SERVER_PORT
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Server port used when PORT is unset
    #[arg(long, env = "MCP_SERVER_PORT", default_value_t = 8001)]
    server_port: u16,

    /// Base URL of the EcoNexo API serving profiles, registrations and projects
    #[arg(long, env = "ECONEXO_API_URL", default_value = "http://localhost:3000/api")]
    econexo_api_url: String,

    /// Base URL of the language service; language stages fall back when unset
    #[arg(long, env = "ECO_LANGUAGE_SERVICE_URL")]
    language_service_url: Option<String>,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "ECO_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Timeout for every outbound call, in seconds
    #[arg(long, env = "ECO_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    http_timeout_secs: u64,

    /// Refinement rounds allowed per request
    #[arg(long, env = "ECO_MAX_REFINEMENTS", default_value_t = 3)]
    max_refinements: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub econexo_api_url: String,
    pub language_service_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub http_timeout: Duration,
    pub max_refinements: u32,
    pub pipeline: PipelineConfig,
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "ECO_CORS_ORIGINS must list explicit origins".into(),
            ));
        }

        if !is_http_url(&cli.econexo_api_url) {
            return Err(ApiError::BadRequest(
                "ECONEXO_API_URL must be an http(s) URL".into(),
            ));
        }

        let language_service_url = cli
            .language_service_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if language_service_url.as_deref().is_some_and(|url| !is_http_url(url)) {
            return Err(ApiError::BadRequest(
                "ECO_LANGUAGE_SERVICE_URL must be an http(s) URL".into(),
            ));
        }

        if cli.http_timeout_secs == 0 {
            return Err(ApiError::BadRequest(
                "ECO_HTTP_TIMEOUT_SECS must be positive".into(),
            ));
        }

        let http_timeout = Duration::from_secs(cli.http_timeout_secs);
        let pipeline = PipelineConfig::from_env()
            .with_call_timeout(http_timeout)
            .with_max_iterations(cli.max_refinements);

        Ok(Self {
            port: cli.port.unwrap_or(cli.server_port),
            econexo_api_url: cli.econexo_api_url,
            language_service_url,
            cors_origins,
            http_timeout,
            max_refinements: cli.max_refinements,
            pipeline,
        })
    }

    pub fn for_tests() -> Self {
        Self {
            port: 8001,
            econexo_api_url: "http://localhost:3000/api".into(),
            language_service_url: None,
            cors_origins: vec!["http://localhost:3000".into()],
            http_timeout: Duration::from_secs(1),
            max_refinements: 3,
            pipeline: PipelineConfig::default()
                .with_call_timeout(Duration::from_secs(1))
                .with_max_iterations(3),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MatchingPipeline>,
    pub config: AppConfig,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

fn internal(err: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(err.to_string())
}

/// Wires the HTTP collaborators described by `config`.
pub fn build_collaborators(config: &AppConfig) -> Result<Collaborators, ApiError> {
    let user_data: Arc<dyn UserDataService> = Arc::new(
        HttpUserDataService::new(&config.econexo_api_url, config.http_timeout).map_err(internal)?,
    );
    let catalog: Arc<dyn CatalogService> = Arc::new(
        HttpCatalogService::new(&config.econexo_api_url, config.http_timeout).map_err(internal)?,
    );

    let Some(url) = config.language_service_url.as_deref() else {
        info!("no language service configured; intent, rerank and summaries use fallbacks");
        return Ok(Collaborators::without_language(user_data, catalog));
    };

    let language = Arc::new(HttpLanguageService::new(url, config.http_timeout).map_err(internal)?);
    let intent: Arc<dyn IntentResolver> = language.clone();
    let reranker: Arc<dyn Reranker> = language.clone();
    let narrator: Arc<dyn Narrator> = language;

    Ok(Collaborators {
        user_data,
        catalog,
        intent,
        reranker,
        narrator,
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    error::with_request_id(request_id, next.run(req)).await
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(health::health))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .route("/match", post(matches::run_match))
        .route("/refine", post(matches::refine))
        .route("/explain", post(matches::explain))
        .route("/api/users/similar", post(similar::similar_users))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
        .layer(cors)
        .with_state(state)
}

/// State over the given collaborators with test configuration.
pub fn test_state(collaborators: Collaborators) -> SharedState {
    let config = AppConfig::for_tests();
    let pipeline = MatchingPipeline::new(collaborators, config.pipeline_config());

    Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        config,
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));
    telemetry::init_metrics("ECO_METRICS_PORT", telemetry::DEFAULT_METRICS_PORT);

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let collaborators = build_collaborators(&config)?;
    let pipeline = MatchingPipeline::new(collaborators, config.pipeline_config());

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        config: config.clone(),
        readiness: Arc::new(AtomicBool::new(true)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(
        %addr,
        econexo_api_url = %config.econexo_api_url,
        language_service = config.language_service_url.is_some(),
        instance_id = eco_common::run_id::instance(),
        "eco-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(internal)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(internal)?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.readiness.store(false, Ordering::SeqCst);

    // Lets load balancers see /readyz fail before connections stop being accepted.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}
