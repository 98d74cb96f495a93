use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored incident row. Array-valued columns (`photos`, `videos`) and the
/// boundary ring (`coordinates`) are kept as text; see `crate::normalize`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reporter_id: i32,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub incident_type: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    pub barangay: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    pub city: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub status: String,
    #[sea_orm(column_type = "String(StringLen::N(20))", nullable)]
    pub severity_level: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub coordinates: Option<String>,
    pub area_ha: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub photos: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub videos: Option<String>,
    pub date_reported: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
