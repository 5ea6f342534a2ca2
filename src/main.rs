use actix_cors::Cors;
use actix_web::{error, middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use campus_match::config::Settings;
use campus_match::core::{KeywordScorer, Matcher};
use campus_match::models::ErrorResponse;
use campus_match::routes::{self, matches::AppState};
use campus_match::services::{CandidateStore, DisabledOracle, InMemoryStore, LlmOracle, RankingOracle};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Reject malformed JSON bodies with the same error shape the handlers use
fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    });
    error::InternalError::from_response(err, response).into()
}

fn to_io_error<E: std::fmt::Display>(context: &str, e: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

fn init_logging(settings: &Settings) {
    // LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| to_io_error("Configuration error", e))?;

    init_logging(&settings);

    info!("Starting Campus Match ranking service...");

    // Initialize the read-only candidate store
    let store = InMemoryStore::load(
        settings.store.hosts_path.as_deref().map(Path::new),
        settings.store.events_path.as_deref().map(Path::new),
    )
    .map_err(|e| {
        error!("Failed to load candidate data: {}", e);
        to_io_error("Store error", e)
    })?;
    let store: Arc<dyn CandidateStore> = Arc::new(store);

    info!("Candidate store initialized");

    // Initialize the ranking oracle (optional - keyword scoring covers its absence)
    let oracle: Arc<dyn RankingOracle> = match settings.oracle_credential() {
        Some(credential) => {
            let oracle = LlmOracle::new(&settings.oracle, Some(credential))
                .map_err(|e| to_io_error("Oracle client error", e))?;
            let oracle = if settings.oracle.agentic {
                oracle.with_store(store.clone())
            } else {
                oracle
            };
            info!(
                "Oracle enabled (model: {}, timeout: {}s, max steps: {})",
                settings.oracle.model, settings.oracle.timeout_secs, settings.oracle.max_steps
            );
            Arc::new(oracle)
        }
        None => {
            warn!("No oracle API key configured, rankings will use keyword scoring");
            Arc::new(DisabledOracle)
        }
    };

    // Initialize matcher with configured weights and rules
    let scorer = KeywordScorer::new(
        Arc::new(settings.conflict_table()),
        settings.host_weights(),
        settings.event_weights(),
    );
    let rules = settings.match_rules();
    let matcher = Matcher::new(oracle, scorer, rules);

    info!("Matcher initialized with rules: {:?}", rules);

    // Build application state
    let app_state = AppState { store, matcher };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
