use crate::error::AppError;
use crate::models::Severity;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use sea_orm::FromQueryResult;
use serde_json::Value;
use thiserror::Error;

/// `[longitude, latitude]`
pub type Vertex = [f64; 2];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("Invalid coordinates JSON")]
    InvalidJson,
    #[error("Coordinates must be an array with at least 3 points")]
    TooFewPoints,
    #[error("Each coordinate must be a [longitude, latitude] pair")]
    InvalidVertex,
}

impl From<BoundaryError> for AppError {
    fn from(e: BoundaryError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Incident boundary ring with at least three vertices. Stored as given;
/// closing the ring is left to export.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary(Vec<Vertex>);

impl Boundary {
    pub const MIN_POINTS: usize = 3;

    /// Parse a ring from a JSON array or from a string holding one.
    pub fn parse(value: &Value) -> Result<Self, BoundaryError> {
        let decoded;
        let value = match value {
            Value::String(raw) => {
                decoded = serde_json::from_str::<Value>(raw)
                    .map_err(|_| BoundaryError::InvalidJson)?;
                &decoded
            }
            other => other,
        };

        let Value::Array(points) = value else {
            return Err(BoundaryError::TooFewPoints);
        };
        if points.len() < Self::MIN_POINTS {
            return Err(BoundaryError::TooFewPoints);
        }

        points
            .iter()
            .map(parse_vertex)
            .collect::<Option<Vec<_>>>()
            .map(Self)
            .ok_or(BoundaryError::InvalidVertex)
    }

    pub fn from_stored(raw: &str) -> Result<Self, BoundaryError> {
        Self::parse(&Value::String(raw.to_string()))
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    pub fn first(&self) -> Vertex {
        self.0[0]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Ring with the first vertex repeated at the end when it is not
    /// already closed.
    pub fn closed_ring(&self) -> Vec<Vertex> {
        let mut ring = self.0.clone();
        if ring.first() != ring.last() {
            ring.push(ring[0]);
        }
        ring
    }
}

fn parse_vertex(point: &Value) -> Option<Vertex> {
    match point.as_array()?.as_slice() {
        [lon, lat, ..] => Some([lon.as_f64()?, lat.as_f64()?]),
        _ => None,
    }
}

/// Columns needed to render one incident as a map feature.
#[derive(Debug, Clone, FromQueryResult)]
pub struct PolygonRow {
    pub id: i32,
    pub incident_type: String,
    pub barangay: Option<String>,
    pub severity_level: Option<String>,
    pub coordinates: Option<String>,
}

pub fn incident_feature(row: &PolygonRow) -> Result<Feature, BoundaryError> {
    let raw = row.coordinates.as_deref().ok_or(BoundaryError::TooFewPoints)?;
    let ring = Boundary::from_stored(raw)?.closed_ring();

    let severity = row
        .severity_level
        .as_deref()
        .and_then(Severity::parse_lenient);

    let mut properties = JsonObject::new();
    properties.insert("id".into(), row.id.into());
    properties.insert("incident_type".into(), row.incident_type.clone().into());
    properties.insert("calamity_type".into(), row.incident_type.clone().into());
    properties.insert(
        "barangay".into(),
        row.barangay
            .clone()
            .filter(|b| !b.is_empty())
            .map_or(Value::Null, Value::from),
    );
    properties.insert(
        "severity_level".into(),
        severity.map_or(Value::Null, |s| Value::from(s.as_ref())),
    );

    let positions = ring.iter().map(|v| v.to_vec()).collect();
    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Polygon(vec![positions]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Builds the collection, skipping rows whose ring cannot be rendered.
pub fn feature_collection(rows: &[PolygonRow]) -> FeatureCollection {
    let features = rows
        .iter()
        .filter_map(|row| match incident_feature(row) {
            Ok(feature) => Some(feature),
            Err(e) => {
                tracing::warn!("Skipping polygon for incident {}: {}", row.id, e);
                None
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
