//! Turns loosely-typed request fields into validated incident writes.
//!
//! Both the multipart ingestion form and the JSON management API feed a
//! `Map<String, Value>` through [`FieldSource`], so canonical names and legacy
//! aliases are accepted on every write path.

use crate::error::{AppError, AppResult};
use crate::geometry::Boundary;
use crate::models::{incident, IncidentStatus, Severity};
use crate::normalize::FieldSource;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sea_orm::ActiveValue::Set;
use serde_json::Value;

/// Where a new incident comes from. Uploads must carry a boundary and always
/// get a server-assigned timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Upload,
    Manage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub reporter_id: i32,
    pub incident_type: String,
    pub description: String,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub status: IncidentStatus,
    pub severity: Option<Severity>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub boundary: Option<Boundary>,
    pub area_ha: Option<f64>,
    pub photos: Vec<String>,
    pub videos: Vec<String>,
    pub date_reported: Option<NaiveDateTime>,
}

impl NewIncident {
    pub fn from_fields(src: &FieldSource<'_>, channel: Channel) -> AppResult<Self> {
        let incident_type = src.text("incident_type").flatten();
        let description = src.text("description").flatten();
        let coordinates = src.lookup("coordinates").filter(|v| !is_blank(v));

        let (Some(incident_type), Some(description)) = (incident_type, description) else {
            return Err(required_error(channel));
        };
        if channel == Channel::Upload && coordinates.is_none() {
            return Err(required_error(channel));
        }

        let reporter_id = src
            .number("reporter_id")
            .flatten()
            .and_then(positive_id)
            .ok_or_else(|| AppError::Validation("admin_id is required".to_string()))?;

        let boundary = coordinates.map(Boundary::parse).transpose()?;
        let first = boundary.as_ref().map(Boundary::first);

        let date_reported = match channel {
            Channel::Upload => None,
            Channel::Manage => src
                .text("date_reported")
                .flatten()
                .map(|raw| parse_timestamp(&raw))
                .transpose()?,
        };

        Ok(Self {
            reporter_id,
            incident_type,
            description,
            barangay: src.text("barangay").flatten(),
            city: src.text("city").flatten(),
            status: IncidentStatus::parse_or_default(src.text("status").flatten().as_deref()),
            severity: src.severity().flatten(),
            latitude: src.number("latitude").flatten().or(first.map(|v| v[1])),
            longitude: src.number("longitude").flatten().or(first.map(|v| v[0])),
            boundary,
            area_ha: src.number("area_ha").flatten(),
            photos: src.list("photos").unwrap_or_default(),
            videos: src.list("videos").unwrap_or_default(),
            date_reported,
        })
    }

    pub fn into_active_model(self, now: NaiveDateTime) -> AppResult<incident::ActiveModel> {
        Ok(incident::ActiveModel {
            reporter_id: Set(self.reporter_id),
            incident_type: Set(self.incident_type),
            description: Set(self.description),
            barangay: Set(self.barangay),
            city: Set(self.city),
            status: Set(self.status.to_string()),
            severity_level: Set(self.severity.map(|s| s.to_string())),
            latitude: Set(self.latitude),
            longitude: Set(self.longitude),
            coordinates: Set(encode_boundary(self.boundary.as_ref())?),
            area_ha: Set(self.area_ha),
            photos: Set(encode_list(&self.photos)?),
            videos: Set(encode_list(&self.videos)?),
            date_reported: Set(self.date_reported.unwrap_or(now)),
            ..Default::default()
        })
    }
}

/// Partial update. Outer `None` means "leave alone"; an inner `None` clears
/// a nullable column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentPatch {
    pub incident_type: Option<String>,
    pub description: Option<String>,
    pub barangay: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub status: Option<IncidentStatus>,
    pub severity: Option<Option<Severity>>,
    pub boundary: Option<Option<Boundary>>,
    pub area_ha: Option<Option<f64>>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub date_reported: Option<NaiveDateTime>,
    pub photos: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
}

impl IncidentPatch {
    pub fn from_fields(src: &FieldSource<'_>) -> AppResult<Self> {
        let incident_type = src
            .text("incident_type")
            .map(|v| v.ok_or_else(|| empty_error("incident_type")))
            .transpose()?;
        let description = src
            .text("description")
            .map(|v| v.ok_or_else(|| empty_error("description")))
            .transpose()?;

        let status = src
            .text("status")
            .map(|raw| {
                raw.as_deref()
                    .and_then(|s| s.parse::<IncidentStatus>().ok())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "status must be one of: Pending, Verified, Resolved, Rejected"
                                .to_string(),
                        )
                    })
            })
            .transpose()?;

        let boundary = src
            .lookup("coordinates")
            .map(|v| {
                if is_blank(v) {
                    Ok(None)
                } else {
                    Boundary::parse(v).map(Some)
                }
            })
            .transpose()?;

        let date_reported = src
            .text("date_reported")
            .map(|raw| {
                raw.ok_or_else(|| empty_error("reported_at"))
                    .and_then(|s| parse_timestamp(&s))
            })
            .transpose()?;

        Ok(Self {
            incident_type,
            description,
            barangay: src.text("barangay"),
            city: src.text("city"),
            status,
            severity: src.severity(),
            boundary,
            area_ha: src.number("area_ha"),
            latitude: src.number("latitude"),
            longitude: src.number("longitude"),
            date_reported,
            photos: src.list("photos"),
            videos: src.list("videos"),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, active: &mut incident::ActiveModel) -> AppResult<()> {
        if let Some(v) = self.incident_type {
            active.incident_type = Set(v);
        }
        if let Some(v) = self.description {
            active.description = Set(v);
        }
        if let Some(v) = self.barangay {
            active.barangay = Set(v);
        }
        if let Some(v) = self.city {
            active.city = Set(v);
        }
        if let Some(v) = self.status {
            active.status = Set(v.to_string());
        }
        if let Some(v) = self.severity {
            active.severity_level = Set(v.map(|s| s.to_string()));
        }
        if let Some(v) = self.boundary {
            active.coordinates = Set(encode_boundary(v.as_ref())?);
        }
        if let Some(v) = self.area_ha {
            active.area_ha = Set(v);
        }
        if let Some(v) = self.latitude {
            active.latitude = Set(v);
        }
        if let Some(v) = self.longitude {
            active.longitude = Set(v);
        }
        if let Some(v) = self.date_reported {
            active.date_reported = Set(v);
        }
        if let Some(v) = self.photos {
            active.photos = Set(encode_list(&v)?);
        }
        if let Some(v) = self.videos {
            active.videos = Set(encode_list(&v)?);
        }
        Ok(())
    }
}

fn required_error(channel: Channel) -> AppError {
    AppError::Validation(match channel {
        Channel::Upload => "calamity_type, description, and coordinates are required".to_string(),
        Channel::Manage => "calamity_type and description are required".to_string(),
    })
}

fn empty_error(field: &str) -> AppError {
    AppError::Validation(format!("{} cannot be empty", field))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn positive_id(n: f64) -> Option<i32> {
    (n >= 1.0 && n.fract() == 0.0 && n <= f64::from(i32::MAX)).then_some(n as i32)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date.
pub fn parse_timestamp(raw: &str) -> AppResult<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AppError::Validation("Invalid reported_at timestamp".to_string()))
}

fn encode_boundary(boundary: Option<&Boundary>) -> AppResult<Option<String>> {
    boundary
        .map(|b| b.to_json().map_err(anyhow::Error::from))
        .transpose()
        .map_err(AppError::from)
}

/// Lists are stored as JSON arrays; an empty list is stored as NULL.
fn encode_list(items: &[String]) -> AppResult<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    let encoded = serde_json::to_string(items).map_err(anyhow::Error::from)?;
    Ok(Some(encoded))
}
