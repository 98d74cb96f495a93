use crate::{
    error::{AppError, AppResult},
    geometry::PolygonRow,
    models::{incident, Incident, IncidentModel, IncidentStatus},
    normalize::FieldSource,
    services::{
        submission::{Channel, IncidentPatch, NewIncident},
        upload::{UploadConfig, UploadService, UploadedFile},
    },
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde_json::{Map, Value};

/// Filters accepted by the incident listing.
#[derive(Debug, Default, Clone)]
pub struct IncidentFilter {
    pub incident_type: Option<String>,
    pub status: Option<String>,
    pub since: Option<NaiveDate>,
}

impl IncidentFilter {
    pub fn new(
        incident_type: Option<&str>,
        status: Option<&str>,
        since: Option<&str>,
    ) -> AppResult<Self> {
        fn non_empty(v: Option<&str>) -> Option<String> {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        let since = non_empty(since)
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                    AppError::Validation("Invalid since date, expected YYYY-MM-DD".to_string())
                })
            })
            .transpose()?;

        // Stored statuses are canonical; match regardless of the caller's casing.
        let status = non_empty(status).map(|s| {
            s.parse::<IncidentStatus>()
                .map(|st| st.to_string())
                .unwrap_or(s)
        });

        Ok(Self {
            incident_type: non_empty(incident_type),
            status,
            since,
        })
    }
}

pub struct IncidentService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> IncidentService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest first; ties broken by id so the order is stable.
    pub async fn list(&self, filter: &IncidentFilter) -> AppResult<Vec<IncidentModel>> {
        let mut query = Incident::find();

        if let Some(t) = &filter.incident_type {
            query = query.filter(incident::Column::IncidentType.eq(t.as_str()));
        }
        if let Some(s) = &filter.status {
            query = query.filter(incident::Column::Status.eq(s.as_str()));
        }
        if let Some(since) = filter.since {
            if let Some(start) = since.and_hms_opt(0, 0, 0) {
                query = query.filter(incident::Column::DateReported.gte(start));
            }
        }

        let incidents = query
            .order_by_desc(incident::Column::DateReported)
            .order_by_desc(incident::Column::Id)
            .all(self.db)
            .await?;
        Ok(incidents)
    }

    /// Rows that carry a boundary, for map export.
    pub async fn polygons(&self, incident_type: Option<&str>) -> AppResult<Vec<PolygonRow>> {
        let mut query = Incident::find()
            .select_only()
            .columns([
                incident::Column::Id,
                incident::Column::IncidentType,
                incident::Column::Barangay,
                incident::Column::SeverityLevel,
                incident::Column::Coordinates,
            ])
            .filter(incident::Column::Coordinates.is_not_null());

        if let Some(t) = incident_type.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(incident::Column::IncidentType.eq(t));
        }

        let rows = query
            .order_by_desc(incident::Column::DateReported)
            .into_model::<PolygonRow>()
            .all(self.db)
            .await?;
        Ok(rows)
    }

    /// Distinct non-empty incident types, ascending.
    pub async fn distinct_types(&self) -> AppResult<Vec<String>> {
        let types: Vec<String> = Incident::find()
            .select_only()
            .column(incident::Column::IncidentType)
            .distinct()
            .filter(incident::Column::IncidentType.ne(""))
            .order_by_asc(incident::Column::IncidentType)
            .into_tuple()
            .all(self.db)
            .await?;

        Ok(types
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<IncidentModel> {
        Incident::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(&self, new: NewIncident) -> AppResult<IncidentModel> {
        let now = chrono::Utc::now().naive_utc();
        let model = new.into_active_model(now)?.insert(self.db).await?;
        tracing::info!("Created incident {} ({})", model.id, model.incident_type);
        Ok(model)
    }

    /// JSON create from the management API.
    pub async fn create_from_json(&self, body: &Map<String, Value>) -> AppResult<IncidentModel> {
        let new = NewIncident::from_fields(&FieldSource::new(body), Channel::Manage)?;
        self.create(new).await
    }

    /// Field report with media: validate the form, then the files, then
    /// write the files and insert the row.
    ///
    /// Files are written before the insert. If the insert fails they stay on
    /// disk and are logged.
    pub async fn ingest(
        &self,
        upload: &UploadConfig,
        form: &Map<String, Value>,
        files: &[UploadedFile],
    ) -> AppResult<IncidentModel> {
        let mut new = NewIncident::from_fields(&FieldSource::new(form), Channel::Upload)?;

        let saved = UploadService::save_media(upload, files).await?;
        new.photos = saved.photos.clone();
        new.videos = saved.videos.clone();

        match self.create(new).await {
            Ok(model) => Ok(model),
            Err(e) => {
                tracing::warn!(
                    "Incident insert failed; orphaned uploads: {:?} {:?}",
                    saved.photos,
                    saved.videos
                );
                Err(e)
            }
        }
    }

    pub async fn update(&self, id: i32, body: &Map<String, Value>) -> AppResult<IncidentModel> {
        let patch = IncidentPatch::from_fields(&FieldSource::new(body))?;
        if patch.is_empty() {
            return Err(AppError::Validation("No fields to update.".to_string()));
        }

        let existing = self.get_by_id(id).await?;
        let mut active: incident::ActiveModel = existing.into();
        patch.apply(&mut active)?;

        let updated = active.update(self.db).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = Incident::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        tracing::info!("Deleted incident {}", id);
        Ok(())
    }
}
