//! Mapping between stored incident rows and the JSON shape the dashboard
//! frontend consumes.
//!
//! The frontend predates the current schema and still reads several fields
//! under their old names, so every response carries both vocabularies. The
//! pairs live in [`FIELD_ALIASES`]; the write side resolves input through the
//! same table via [`FieldSource`].

use crate::models::{IncidentModel, IncidentStatus, Severity};
use chrono::{NaiveDateTime, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Public path prefix under which uploaded media is served.
pub const UPLOADS_PREFIX: &str = "/uploads/";
/// Subdirectory of the upload area that incident media is written to.
pub const UPLOAD_SUBDIR: &str = "calamity";

/// Canonical field name → legacy names accepted on write and echoed on read.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("id", &["calamity_id"]),
    ("reporter_id", &["admin_id"]),
    ("incident_type", &["calamity_type"]),
    ("description", &["note"]),
    ("severity_level", &["severity_text"]),
    ("area_ha", &["affected_area"]),
    ("date_reported", &["reported_at"]),
];

pub fn aliases_of(canonical: &str) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Public URL for a file stored in the incident upload subdirectory.
pub fn media_url(file_name: &str) -> String {
    format!("{}{}/{}", UPLOADS_PREFIX, UPLOAD_SUBDIR, file_name)
}

/// Decode a stored list column. Accepts a JSON array, a comma-separated
/// string, or a single bare value. Never fails: a malformed JSON array falls
/// back to comma/single-value handling.
pub fn decode_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    if raw.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
            return items.into_iter().filter_map(truthy_string).collect();
        }
    }

    if raw.contains(',') {
        return raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    vec![raw.to_string()]
}

fn truthy_string(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Map a stored media reference to a servable URL.
///
/// `/uploads/...` paths and absolute `http(s)://` URLs pass through; anything
/// else is treated as a legacy bare filename and prefixed with the incident
/// upload directory. Not idempotent for relative paths outside `/uploads/`:
/// feeding `calamity/a.jpg` back in yields `/uploads/calamity/calamity/a.jpg`.
pub fn normalize_media_path(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() {
        return None;
    }
    if v.starts_with(UPLOADS_PREFIX) || is_http_url(v) {
        return Some(v.to_string());
    }
    Some(media_url(v))
}

pub fn normalize_media<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .filter_map(|p| normalize_media_path(p.as_ref()))
        .collect()
}

fn is_http_url(v: &str) -> bool {
    let lower = v.get(..8).unwrap_or(v).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read-only view over a request body (JSON object or multipart text fields)
/// that resolves each canonical field through its aliases.
pub struct FieldSource<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> FieldSource<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    /// First non-null value among the canonical name and its aliases, in
    /// that order. A key that is present but null yields `Some(Null)` so
    /// callers can tell "clear this field" from "not supplied".
    pub fn lookup(&self, canonical: &str) -> Option<&'a Value> {
        static NULL: Value = Value::Null;
        let mut seen_null = None;
        for key in std::iter::once(canonical).chain(aliases_of(canonical).iter().copied()) {
            match self.fields.get(key) {
                Some(Value::Null) => seen_null = Some(&NULL),
                Some(v) => return Some(v),
                None => {}
            }
        }
        seen_null
    }

    pub fn is_supplied(&self, canonical: &str) -> bool {
        self.lookup(canonical).is_some()
    }

    /// Trimmed text; empty strings and null collapse to `Some(None)`.
    pub fn text(&self, canonical: &str) -> Option<Option<String>> {
        self.lookup(canonical).map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    /// Numeric value; strings are parsed, anything unparseable is `Some(None)`.
    pub fn number(&self, canonical: &str) -> Option<Option<f64>> {
        self.lookup(canonical).map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        })
    }

    /// Severity from either the textual label or the numeric score. A
    /// non-blank label wins; a null or blank label only clears the level
    /// when no score is given.
    pub fn severity(&self) -> Option<Option<Severity>> {
        let label = self.text("severity_level");
        if let Some(Some(text)) = &label {
            return Some(Severity::parse_lenient(text));
        }
        match self.number("severity") {
            Some(score) => Some(score.and_then(Severity::from_score)),
            None => label.map(|_| None),
        }
    }

    /// List field given as a JSON array of strings or as an encoded string.
    pub fn list(&self, canonical: &str) -> Option<Vec<String>> {
        self.lookup(canonical).map(|v| match v {
            Value::Array(items) => items.iter().cloned().filter_map(truthy_string).collect(),
            Value::String(s) => decode_list(Some(s)),
            _ => Vec::new(),
        })
    }
}

/// Normalized incident as returned by every read and write endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IncidentResponse {
    /// Incident ID
    pub id: i32,
    /// Legacy alias of `id`
    pub calamity_id: i32,
    /// Reporting account ID
    pub reporter_id: i32,
    /// Legacy alias of `reporter_id`
    pub admin_id: i32,
    /// Incident category label
    pub incident_type: String,
    /// Legacy alias of `incident_type`
    pub calamity_type: String,
    pub description: String,
    /// Legacy alias of `description`
    pub note: String,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub status: IncidentStatus,
    pub severity_level: Option<Severity>,
    /// Legacy alias of `severity_level`
    pub severity_text: Option<Severity>,
    /// Derived numeric score (0, 1, 3, 5 or 6)
    pub severity: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Boundary ring as `[longitude, latitude]` pairs
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub coordinates: Option<Value>,
    /// Affected area in hectares
    pub area_ha: Option<f64>,
    /// Legacy alias of `area_ha`
    pub affected_area: Option<f64>,
    /// RFC 3339 timestamp
    pub date_reported: String,
    /// Legacy alias of `date_reported`
    pub reported_at: String,
    /// First photo, if any
    pub photo: Option<String>,
    pub photos: Vec<String>,
    pub videos: Vec<String>,
}

impl From<IncidentModel> for IncidentResponse {
    fn from(m: IncidentModel) -> Self {
        let severity_level = m.severity_level.as_deref().and_then(Severity::parse_lenient);
        let status = IncidentStatus::parse_or_default(Some(&m.status));
        let coordinates = m.coordinates.as_deref().and_then(|raw| {
            serde_json::from_str::<Value>(raw)
                .map_err(|e| {
                    tracing::warn!("Invalid coordinates for incident {}: {}", m.id, e);
                })
                .ok()
        });
        let photos = normalize_media(decode_list(m.photos.as_deref()));
        let videos = normalize_media(decode_list(m.videos.as_deref()));
        let date_reported = format_timestamp(m.date_reported);

        Self {
            id: m.id,
            calamity_id: m.id,
            reporter_id: m.reporter_id,
            admin_id: m.reporter_id,
            calamity_type: m.incident_type.clone(),
            incident_type: m.incident_type,
            note: m.description.clone(),
            description: m.description,
            barangay: m.barangay,
            city: m.city,
            status,
            severity_level,
            severity_text: severity_level,
            severity: severity_level.map_or(0, Severity::score),
            latitude: m.latitude,
            longitude: m.longitude,
            coordinates,
            area_ha: m.area_ha,
            affected_area: m.area_ha,
            reported_at: date_reported.clone(),
            date_reported,
            photo: photos.first().cloned(),
            photos,
            videos,
        }
    }
}
