mod config;
mod error;
mod geometry;
mod handlers;
mod middleware;
mod migration;
mod models;
mod normalize;
mod routes;
mod services;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use config::{RateLimitConfig, ServerConfig};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use services::upload::UploadConfig;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Field reports
        crate::handlers::calamity::list_incidents,
        crate::handlers::calamity::list_polygons,
        crate::handlers::calamity::list_types,
        crate::handlers::calamity::create_incident,
        // Management
        crate::handlers::manage::list_incidents,
        crate::handlers::manage::list_types,
        crate::handlers::manage::get_incident,
        crate::handlers::manage::create_incident,
        crate::handlers::manage::update_incident,
        crate::handlers::manage::delete_incident,
        // Dashboard
        crate::handlers::graph::filter_options,
        crate::handlers::graph::total_incidents,
        crate::handlers::graph::type_counts,
        crate::handlers::graph::area_by_type,
        crate::handlers::graph::incident_trend,
        crate::handlers::graph::summary,
    ),
    components(
        schemas(
            crate::error::AppError,
            crate::models::IncidentStatus,
            crate::models::Severity,
            crate::normalize::IncidentResponse,
            // Field reports
            crate::handlers::calamity::ListIncidentsQuery,
            crate::handlers::calamity::PolygonsQuery,
            crate::handlers::calamity::IncidentForm,
            // Management
            crate::handlers::manage::IncidentInput,
            crate::handlers::manage::TypeName,
            crate::handlers::manage::DeleteResponse,
            // Dashboard
            crate::handlers::graph::LocationQuery,
            crate::handlers::graph::TrendQuery,
            crate::services::stats::TotalCount,
            crate::services::stats::TypeCount,
            crate::services::stats::TypeArea,
            crate::services::stats::MonthTotal,
            crate::services::stats::Summary,
            crate::services::stats::FilterOptions,
        )
    ),
    tags(
        (name = "calamities", description = "Field incident reports and map export"),
        (name = "managecalamities", description = "Incident administration"),
        (name = "graphs", description = "Dashboard statistics"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calamity=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let server_config = ServerConfig::from_env()?;
    std::fs::create_dir_all(&server_config.upload_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create upload directory '{}': {}",
            server_config.upload_dir,
            e
        )
    })?;
    let rate_limit = RateLimitConfig::from_env();

    tracing::info!("Starting Calamity API v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database(&server_config.database_url).await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let upload_config = UploadConfig {
        upload_dir: server_config.upload_dir.clone(),
    };

    let app = create_app(&server_config, &rate_limit)
        .layer(Extension(Arc::new(db)))
        .layer(Extension(upload_config));

    let addr = server_config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app(server: &ServerConfig, rate_limit: &RateLimitConfig) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes(rate_limit, server.max_body_bytes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(&server.upload_dir))
        .layer(axum::middleware::from_fn(
            middleware::security::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Calamity API",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
