use crate::error::{AppError, AppResult};
use crate::normalize::IncidentResponse;
use crate::services::incident::{IncidentFilter, IncidentService};
use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON body for create and update. Every field also accepts its legacy
/// alias (`calamity_type`, `note`, `admin_id`, `severity_text`,
/// `affected_area`, `reported_at`). Documentation only.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct IncidentInput {
    pub incident_type: Option<String>,
    pub description: Option<String>,
    pub reporter_id: Option<i32>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub severity_level: Option<String>,
    /// Numeric score, used when no textual level is given
    pub severity: Option<f64>,
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub coordinates: Option<Value>,
    pub area_ha: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_reported: Option<String>,
    /// Array of URLs or a comma-separated string
    pub photos: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TypeName {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub ok: bool,
}

fn into_object(body: Value) -> AppResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/managecalamities",
    responses(
        (status = 200, description = "All incidents, newest first", body = Vec<IncidentResponse>),
    ),
    tag = "managecalamities"
)]
pub async fn list_incidents(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<impl IntoResponse> {
    let service = IncidentService::new(&db);
    let items: Vec<IncidentResponse> = service
        .list(&IncidentFilter::default())
        .await?
        .into_iter()
        .map(IncidentResponse::from)
        .collect();
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/managecalamities/types",
    responses(
        (status = 200, description = "Distinct incident types", body = Vec<TypeName>),
    ),
    tag = "managecalamities"
)]
pub async fn list_types(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<impl IntoResponse> {
    let service = IncidentService::new(&db);
    let types: Vec<TypeName> = service
        .distinct_types()
        .await?
        .into_iter()
        .map(|name| TypeName { name })
        .collect();
    Ok(Json(types))
}

#[utoipa::path(
    get,
    path = "/api/managecalamities/{id}",
    params(("id" = i32, Path, description = "Incident ID")),
    responses(
        (status = 200, description = "Incident", body = IncidentResponse),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "managecalamities"
)]
pub async fn get_incident(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = IncidentService::new(&db);
    let incident = service.get_by_id(id).await?;
    Ok(Json(IncidentResponse::from(incident)))
}

#[utoipa::path(
    post,
    path = "/api/managecalamities",
    request_body = IncidentInput,
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "managecalamities"
)]
pub async fn create_incident(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let body = into_object(body)?;
    let service = IncidentService::new(&db);
    let created = service.create_from_json(&body).await?;
    Ok((StatusCode::CREATED, Json(IncidentResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/managecalamities/{id}",
    params(("id" = i32, Path, description = "Incident ID")),
    request_body = IncidentInput,
    responses(
        (status = 200, description = "Incident updated", body = IncidentResponse),
        (status = 400, description = "No recognized fields or invalid value", body = AppError),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "managecalamities"
)]
pub async fn update_incident(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let body = into_object(body)?;
    let service = IncidentService::new(&db);
    let updated = service.update(id, &body).await?;
    Ok(Json(IncidentResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/managecalamities/{id}",
    params(("id" = i32, Path, description = "Incident ID")),
    responses(
        (status = 200, description = "Incident deleted", body = DeleteResponse),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "managecalamities"
)]
pub async fn delete_incident(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = IncidentService::new(&db);
    service.delete(id).await?;
    Ok(Json(DeleteResponse { ok: true }))
}
