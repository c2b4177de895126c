use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod report;

pub use crate::config::ServerConfig;
pub use crate::report::AppState;

use crate::report::{ReportGenerator, SlotRegistry};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::report::handlers::get_registry,
        crate::report::handlers::preview_report,
        crate::report::handlers::generate_report,
    ),
    components(
        schemas(
            report::handlers::RegistryResponse,
            report::handlers::SlotKeywords,
            report::handlers::SectionInfo,
            report::handlers::RequirementInfo,
            report::handlers::RequirementTable,
            report::handlers::PreviewResponse,
            report::handlers::AssignedFile,
            report::SlotCollision,
            report::Slot,
            report::ChecklistType,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Report Service", description = "Photographic installation report endpoints.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost server")
    )
)]
pub struct ApiDoc;

/// Shared state with the standard slot registry, checked for consistency.
pub fn build_app_state(config: &ServerConfig) -> Result<AppState, report::ReportError> {
    let registry = SlotRegistry::standard();
    registry.check_consistency()?;
    log::info!(
        "Slot registry v{} loaded: {} slots, {} sections",
        registry.version(),
        registry.keywords().len(),
        registry.sections().len()
    );

    Ok(AppState {
        generator: ReportGenerator::new(Arc::new(registry)),
        max_upload_bytes: config.max_upload_bytes,
    })
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    let app_state = match build_app_state(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Refusing to start: {}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("cef_wifi_report_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::other(format!("Failed to create Prometheus metrics middleware: {}", e)))?;

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let origins = config.cors_allowed_origins.clone();
    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(web::scope("/api").configure(report::config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
