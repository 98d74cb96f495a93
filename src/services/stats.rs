//! Dashboard statistics over the incident table.
//!
//! Every query takes a [`LocationFilter`] (city / barangay). The list and map
//! endpoints use a different vocabulary (`IncidentFilter`) and never share
//! this one.

use crate::error::AppResult;
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, Statement, Value};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

pub const DEFAULT_TREND_MONTHS: i32 = 12;
pub const MAX_TREND_MONTHS: i32 = 36;
pub const UNKNOWN_LABEL: &str = "Unknown";
pub const PLACEHOLDER: &str = "—";
/// Key in `barangaysByCity` holding every barangay regardless of city.
pub const ALL_BARANGAYS_KEY: &str = "_all";

/// Optional city / barangay restriction. Empty values and the literal `all`
/// mean "no restriction".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocationFilter {
    pub city: Option<String>,
    pub barangay: Option<String>,
}

impl LocationFilter {
    pub fn new(city: Option<&str>, barangay: Option<&str>) -> Self {
        fn keep(v: Option<&str>) -> Option<String> {
            v.map(str::trim)
                .filter(|s| !s.is_empty() && *s != "all")
                .map(str::to_string)
        }
        Self {
            city: keep(city),
            barangay: keep(barangay),
        }
    }

    fn conditions(&self) -> Conditions {
        let mut c = Conditions::default();
        if let Some(city) = &self.city {
            c.push("city = {}", city.clone());
        }
        if let Some(barangay) = &self.barangay {
            c.push("barangay = {}", barangay.clone());
        }
        c
    }
}

/// Positional `$n` conditions joined with `AND`.
#[derive(Debug, Default)]
struct Conditions {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Conditions {
    /// `template` holds a single `{}` where the placeholder goes.
    fn push(&mut self, template: &str, value: impl Into<Value>) {
        self.values.push(value.into());
        let placeholder = format!("${}", self.values.len());
        self.clauses.push(template.replace("{}", &placeholder));
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Lookback window for the monthly trend: clamped to `[1, 36]`, 12 when
/// absent or not a number.
pub fn clamp_months(raw: Option<&str>) -> i32 {
    let parsed = raw.map(str::trim).and_then(|s| {
        s.parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
    });

    match parsed {
        Some(n) => n.clamp(1, i64::from(MAX_TREND_MONTHS)) as i32,
        None => DEFAULT_TREND_MONTHS,
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

#[derive(Debug, FromQueryResult)]
struct TypeCountRow {
    incident_type: Option<String>,
    total: i64,
}

#[derive(Debug, FromQueryResult)]
struct TypeAreaRow {
    incident_type: Option<String>,
    total: f64,
}

#[derive(Debug, FromQueryResult)]
struct MonthRow {
    month: String,
    total: i64,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct TopRow {
    pub label: Option<String>,
    pub value: f64,
}

#[derive(Debug, FromQueryResult)]
struct LocationRow {
    city: String,
    barangay: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TotalCount {
    pub total: i64,
}

/// One bar of a per-type chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotal<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: T,
}

/// `TypeTotal<i64>` as it appears in the API docs.
#[derive(Debug, Serialize, ToSchema)]
#[allow(dead_code)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: i64,
}

/// `TypeTotal<f64>` as it appears in the API docs. Hectares.
#[derive(Debug, Serialize, ToSchema)]
#[allow(dead_code)]
pub struct TypeArea {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub most_common_type: String,
    pub top_barangay: String,
    pub largest_area_type: String,
    pub largest_area_ha: f64,
}

impl Summary {
    pub fn from_top_rows(
        by_count: Option<TopRow>,
        by_barangay: Option<TopRow>,
        by_area: Option<TopRow>,
    ) -> Self {
        fn label(row: &Option<TopRow>) -> String {
            row.as_ref()
                .and_then(|r| r.label.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        }

        Self {
            most_common_type: label(&by_count),
            top_barangay: label(&by_barangay),
            largest_area_type: label(&by_area),
            largest_area_ha: by_area.map_or(0.0, |r| r.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct FilterOptions {
    pub cities: Vec<String>,
    #[serde(rename = "barangaysByCity")]
    pub barangays_by_city: BTreeMap<String, Vec<String>>,
}

impl FilterOptions {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cities: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut all = BTreeSet::new();
        for (city, barangay) in pairs {
            all.insert(barangay.clone());
            cities.entry(city).or_default().insert(barangay);
        }

        let mut barangays_by_city: BTreeMap<String, Vec<String>> = cities
            .iter()
            .map(|(city, set)| (city.clone(), set.iter().cloned().collect()))
            .collect();
        barangays_by_city.insert(ALL_BARANGAYS_KEY.to_string(), all.into_iter().collect());

        Self {
            cities: cities.into_keys().collect(),
            barangays_by_city,
        }
    }
}

/// Fold null or blank types into the `Unknown` bucket and order by total,
/// largest first. Ties keep their incoming order.
pub fn rank_by_type<T>(rows: Vec<(Option<String>, T)>) -> Vec<TypeTotal<T>>
where
    T: Copy + PartialOrd + std::ops::AddAssign,
{
    let mut ranked: Vec<TypeTotal<T>> = Vec::with_capacity(rows.len());
    for (kind, total) in rows {
        let kind = kind
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        match ranked.iter_mut().find(|t| t.kind == kind) {
            Some(existing) => existing.total += total,
            None => ranked.push(TypeTotal { kind, total }),
        }
    }
    ranked.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

pub struct StatsService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> StatsService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    fn statement(&self, sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.db.get_database_backend(), sql, values)
    }

    pub async fn total(&self, filter: &LocationFilter) -> AppResult<TotalCount> {
        let c = filter.conditions();
        let sql = format!(
            "SELECT COUNT(*) AS total FROM incidents {}",
            c.where_sql()
        );
        let row = CountRow::find_by_statement(self.statement(&sql, c.values))
            .one(self.db)
            .await?;
        Ok(TotalCount {
            total: row.map_or(0, |r| r.total),
        })
    }

    pub async fn count_by_type(&self, filter: &LocationFilter) -> AppResult<Vec<TypeTotal<i64>>> {
        let c = filter.conditions();
        let sql = format!(
            "SELECT incident_type, COUNT(*) AS total FROM incidents {} \
                GROUP BY incident_type \
                ORDER BY total DESC, incident_type ASC",
            c.where_sql()
        );
        let rows = TypeCountRow::find_by_statement(self.statement(&sql, c.values))
            .all(self.db)
            .await?;
        Ok(rank_by_type(
            rows.into_iter().map(|r| (r.incident_type, r.total)).collect(),
        ))
    }

    pub async fn area_by_type(&self, filter: &LocationFilter) -> AppResult<Vec<TypeTotal<f64>>> {
        let c = filter.conditions();
        let sql = format!(
            "SELECT incident_type, COALESCE(SUM(area_ha), 0)::double precision AS total \
                FROM incidents {} \
                GROUP BY incident_type \
                ORDER BY total DESC, incident_type ASC",
            c.where_sql()
        );
        let rows = TypeAreaRow::find_by_statement(self.statement(&sql, c.values))
            .all(self.db)
            .await?;
        Ok(rank_by_type(
            rows.into_iter().map(|r| (r.incident_type, r.total)).collect(),
        ))
    }

    pub async fn monthly_trend(
        &self,
        filter: &LocationFilter,
        months: i32,
    ) -> AppResult<Vec<MonthTotal>> {
        let mut c = filter.conditions();
        c.push(
            "date_reported >= CURRENT_DATE - make_interval(months => {})",
            months.clamp(1, MAX_TREND_MONTHS),
        );
        let sql = format!(
            "SELECT to_char(date_reported, 'YYYY-MM') AS month, COUNT(*) AS total \
                FROM incidents {} \
                GROUP BY month \
                ORDER BY month ASC",
            c.where_sql()
        );
        let rows = MonthRow::find_by_statement(self.statement(&sql, c.values))
            .all(self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| MonthTotal {
                month: r.month,
                total: r.total,
            })
            .collect())
    }

    /// Three independent top-1 reductions. Any failing sub-query fails the
    /// whole summary.
    pub async fn summary(&self, filter: &LocationFilter) -> AppResult<Summary> {
        let by_count = self
            .top_row(filter, "incident_type", "COUNT(*)::double precision")
            .await?;
        let by_barangay = self
            .top_row(filter, "barangay", "COUNT(*)::double precision")
            .await?;
        let by_area = self
            .top_row(
                filter,
                "incident_type",
                "COALESCE(SUM(area_ha), 0)::double precision",
            )
            .await?;

        Ok(Summary::from_top_rows(by_count, by_barangay, by_area))
    }

    async fn top_row(
        &self,
        filter: &LocationFilter,
        group_column: &str,
        value_expr: &str,
    ) -> AppResult<Option<TopRow>> {
        let c = filter.conditions();
        let sql = format!(
            "SELECT {group_column} AS label, {value_expr} AS value \
                FROM incidents {} \
                GROUP BY {group_column} \
                ORDER BY value DESC \
                LIMIT 1",
            c.where_sql()
        );
        let row = TopRow::find_by_statement(self.statement(&sql, c.values))
            .one(self.db)
            .await?;
        Ok(row)
    }

    pub async fn filter_options(&self) -> AppResult<FilterOptions> {
        let rows = LocationRow::find_by_statement(self.statement(
            "SELECT DISTINCT city, barangay FROM incidents \
                WHERE city IS NOT NULL AND city <> '' \
                AND barangay IS NOT NULL AND barangay <> ''",
            Vec::new(),
        ))
        .all(self.db)
        .await?;

        Ok(FilterOptions::from_pairs(
            rows.into_iter().map(|r| (r.city, r.barangay)),
        ))
    }
}
