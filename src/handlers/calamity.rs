use crate::error::{AppError, AppResult};
use crate::geometry::feature_collection;
use crate::normalize::IncidentResponse;
use crate::services::incident::{IncidentFilter, IncidentService};
use crate::services::upload::{UploadConfig, UploadedFile};
use axum::{
    extract::{multipart::MultipartError, Multipart, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

const PHOTO_FIELDS: &[&str] = &["photos", "photos[]"];
const VIDEO_FIELDS: &[&str] = &["videos", "videos[]"];

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListIncidentsQuery {
    /// Exact incident type
    #[serde(rename = "type")]
    #[validate(length(max = 100))]
    pub incident_type: Option<String>,
    /// Exact status (case-insensitive)
    #[validate(length(max = 20))]
    pub status: Option<String>,
    /// Only incidents reported on or after this date (YYYY-MM-DD)
    #[validate(length(max = 10))]
    pub since: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PolygonsQuery {
    /// Exact incident type
    #[serde(rename = "type")]
    #[validate(length(max = 100))]
    pub incident_type: Option<String>,
}

/// Multipart form accepted by the field report endpoint. Documentation only;
/// the handler reads the parts directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct IncidentForm {
    /// Incident type (`incident_type` also accepted)
    pub calamity_type: String,
    /// Free text (`note` also accepted)
    pub description: String,
    /// JSON array of `[longitude, latitude]` pairs, at least 3
    pub coordinates: String,
    /// Reporting account ID (`reporter_id` also accepted)
    pub admin_id: i32,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub severity_level: Option<String>,
    /// Hectares (`area_ha` also accepted)
    pub affected_area: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(value_type = Vec<String>, format = Binary)]
    pub photos: Vec<Vec<u8>>,
    #[schema(value_type = Vec<String>, format = Binary)]
    pub videos: Vec<Vec<u8>>,
}

#[utoipa::path(
    get,
    path = "/api/calamities",
    params(
        ("type" = Option<String>, Query, description = "Filter by incident type"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("since" = Option<String>, Query, description = "Reported on or after (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Incidents, newest first", body = Vec<IncidentResponse>),
        (status = 400, description = "Invalid filter", body = AppError),
    ),
    tag = "calamities"
)]
pub async fn list_incidents(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<ListIncidentsQuery>,
) -> AppResult<impl IntoResponse> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let filter = IncidentFilter::new(
        params.incident_type.as_deref(),
        params.status.as_deref(),
        params.since.as_deref(),
    )?;

    let service = IncidentService::new(&db);
    let items: Vec<IncidentResponse> = service
        .list(&filter)
        .await?
        .into_iter()
        .map(IncidentResponse::from)
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/calamities/polygons",
    params(("type" = Option<String>, Query, description = "Filter by incident type")),
    responses(
        (status = 200, description = "GeoJSON FeatureCollection of incident boundaries", body = serde_json::Value),
    ),
    tag = "calamities"
)]
pub async fn list_polygons(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<PolygonsQuery>,
) -> AppResult<impl IntoResponse> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = IncidentService::new(&db);
    let rows = service.polygons(params.incident_type.as_deref()).await?;

    Ok(Json(feature_collection(&rows)))
}

#[utoipa::path(
    get,
    path = "/api/calamities/types",
    responses(
        (status = 200, description = "Distinct incident types", body = Vec<String>),
    ),
    tag = "calamities"
)]
pub async fn list_types(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<impl IntoResponse> {
    let service = IncidentService::new(&db);
    Ok(Json(service.distinct_types().await?))
}

#[utoipa::path(
    post,
    path = "/api/calamities",
    request_body(content = IncidentForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 413, description = "Request body too large", body = AppError),
        (status = 500, description = "Storage error", body = AppError),
    ),
    tag = "calamities"
)]
pub async fn create_incident(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<UploadConfig>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let (form, files) = read_submission(multipart).await?;

    let service = IncidentService::new(&db);
    let created = service.ingest(&config, &form, &files).await?;

    Ok((StatusCode::CREATED, Json(IncidentResponse::from(created))))
}

/// Split a multipart body into text fields and media files. File parts are
/// only accepted under the photo and video field names.
async fn read_submission(
    mut multipart: Multipart,
) -> AppResult<(Map<String, Value>, Vec<UploadedFile>)> {
    let mut form = Map::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read upload", e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(&format!("Failed to read field {}", name), e))?;
            form.insert(name, Value::String(text));
            continue;
        };

        if !PHOTO_FIELDS.contains(&name.as_str()) && !VIDEO_FIELDS.contains(&name.as_str()) {
            return Err(AppError::Validation(format!("Unexpected file field: {}", name)));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file data", e))?;

        // Browsers send an empty part for an untouched file input.
        if file_name.is_empty() && data.is_empty() {
            continue;
        }

        files.push(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    Ok((form, files))
}

/// Bodies over the route's byte limit keep their 413; every other malformed
/// part is a 400.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("{}: {}", context, e.body_text()))
    }
}
