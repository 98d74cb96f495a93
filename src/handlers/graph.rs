use crate::error::{AppError, AppResult};
use crate::services::stats::{
    clamp_months, FilterOptions, LocationFilter, MonthTotal, StatsService, Summary, TotalCount,
    TypeArea, TypeCount,
};
use axum::{extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct LocationQuery {
    /// City name, or `all`
    #[validate(length(max = 100))]
    pub city: Option<String>,
    /// Barangay name, or `all`
    #[validate(length(max = 100))]
    pub barangay: Option<String>,
}

impl LocationQuery {
    fn filter(&self) -> AppResult<LocationFilter> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(LocationFilter::new(
            self.city.as_deref(),
            self.barangay.as_deref(),
        ))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TrendQuery {
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub barangay: Option<String>,
    /// Lookback window in months (1-36, default 12). Non-numeric values fall
    /// back to the default.
    #[validate(length(max = 16))]
    pub months: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/graphs/filters",
    responses(
        (status = 200, description = "Cities and barangays present in the data", body = FilterOptions),
    ),
    tag = "graphs"
)]
pub async fn filter_options(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<impl IntoResponse> {
    let service = StatsService::new(&db);
    Ok(Json(service.filter_options().await?))
}

#[utoipa::path(
    get,
    path = "/api/graphs/total-incidents",
    params(
        ("city" = Option<String>, Query, description = "City filter"),
        ("barangay" = Option<String>, Query, description = "Barangay filter"),
    ),
    responses(
        (status = 200, description = "Incident count", body = TotalCount),
    ),
    tag = "graphs"
)]
pub async fn total_incidents(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<LocationQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = params.filter()?;
    let service = StatsService::new(&db);
    Ok(Json(service.total(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/graphs/incident-type-counts",
    params(
        ("city" = Option<String>, Query, description = "City filter"),
        ("barangay" = Option<String>, Query, description = "Barangay filter"),
    ),
    responses(
        (status = 200, description = "Incident count per type, largest first", body = Vec<TypeCount>),
    ),
    tag = "graphs"
)]
pub async fn type_counts(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<LocationQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = params.filter()?;
    let service = StatsService::new(&db);
    Ok(Json(service.count_by_type(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/graphs/incident-area-by-type",
    params(
        ("city" = Option<String>, Query, description = "City filter"),
        ("barangay" = Option<String>, Query, description = "Barangay filter"),
    ),
    responses(
        (status = 200, description = "Affected hectares per type, largest first", body = Vec<TypeArea>),
    ),
    tag = "graphs"
)]
pub async fn area_by_type(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<LocationQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = params.filter()?;
    let service = StatsService::new(&db);
    Ok(Json(service.area_by_type(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/graphs/incident-trend",
    params(
        ("city" = Option<String>, Query, description = "City filter"),
        ("barangay" = Option<String>, Query, description = "Barangay filter"),
        ("months" = Option<i32>, Query, description = "Lookback in months (1-36, default 12)"),
    ),
    responses(
        (status = 200, description = "Incidents per month, oldest first", body = Vec<MonthTotal>),
    ),
    tag = "graphs"
)]
pub async fn incident_trend(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<TrendQuery>,
) -> AppResult<impl IntoResponse> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let filter = LocationFilter::new(params.city.as_deref(), params.barangay.as_deref());
    let months = clamp_months(params.months.as_deref());

    let service = StatsService::new(&db);
    Ok(Json(service.monthly_trend(&filter, months).await?))
}

#[utoipa::path(
    get,
    path = "/api/graphs/summary",
    params(
        ("city" = Option<String>, Query, description = "City filter"),
        ("barangay" = Option<String>, Query, description = "Barangay filter"),
    ),
    responses(
        (status = 200, description = "Headline figures", body = Summary),
    ),
    tag = "graphs"
)]
pub async fn summary(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<LocationQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = params.filter()?;
    let service = StatsService::new(&db);
    Ok(Json(service.summary(&filter).await?))
}
