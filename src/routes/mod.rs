use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use axum::{extract::DefaultBodyLimit, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes(rate_limit: &RateLimitConfig, max_body_bytes: usize) -> Router {
    Router::new().nest(
        "/api",
        read_routes(rate_limit).merge(write_routes(rate_limit, max_body_bytes)),
    )
}

/// Listings, lookups and dashboard charts.
fn read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Field reports
        .route(
            "/calamities",
            routing::get(handlers::calamity::list_incidents),
        )
        .route(
            "/calamities/polygons",
            routing::get(handlers::calamity::list_polygons),
        )
        .route(
            "/calamities/types",
            routing::get(handlers::calamity::list_types),
        )
        // Management
        .route(
            "/managecalamities",
            routing::get(handlers::manage::list_incidents),
        )
        .route(
            "/managecalamities/types",
            routing::get(handlers::manage::list_types),
        )
        .route(
            "/managecalamities/{id}",
            routing::get(handlers::manage::get_incident),
        )
        // Dashboard
        .route("/graphs/filters", routing::get(handlers::graph::filter_options))
        .route(
            "/graphs/total-incidents",
            routing::get(handlers::graph::total_incidents),
        )
        .route(
            "/graphs/incident-type-counts",
            routing::get(handlers::graph::type_counts),
        )
        .route(
            "/graphs/incident-area-by-type",
            routing::get(handlers::graph::area_by_type),
        )
        .route(
            "/graphs/incident-trend",
            routing::get(handlers::graph::incident_trend),
        )
        .route("/graphs/summary", routing::get(handlers::graph::summary));

    with_optional_rate_limit(router, config.enabled, config.read)
}

/// Submissions, edits and deletes.
fn write_routes(config: &RateLimitConfig, max_body_bytes: usize) -> Router {
    let router = Router::new()
        .route(
            "/calamities",
            routing::post(handlers::calamity::create_incident)
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route(
            "/managecalamities",
            routing::post(handlers::manage::create_incident),
        )
        .route(
            "/managecalamities/{id}",
            routing::put(handlers::manage::update_incident)
                .delete(handlers::manage::delete_incident),
        );

    with_optional_rate_limit(router, config.enabled, config.write)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .expect("Invalid rate limit configuration");

    router.layer(GovernorLayer::new(governor_conf))
}
