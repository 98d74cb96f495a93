#![allow(dead_code)]

use axum::{
    body::Body,
    extract::Extension,
    http::{header, Request},
    response::Response,
    Router,
};
use calamity::config::rate_limit::RateLimitConfig;
use calamity::config::server::DEFAULT_MAX_BODY_BYTES;
use calamity::models::IncidentModel;
use calamity::services::upload::UploadConfig;
use reqwest::Client;
use sea_orm::{DatabaseConnection, Transaction};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tokio::sync::OnceCell;

static INIT: Once = Once::new();
static MIGRATIONS: OnceCell<()> = OnceCell::const_new();

pub const BOUNDARY: &str = "calamity-test-boundary";

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

/// Fresh upload directory under the system temp dir.
pub fn temp_upload_dir() -> PathBuf {
    std::env::temp_dir().join(format!("calamity-test-{}", uuid::Uuid::new_v4()))
}

/// Number of files written into the incident media subdirectory.
pub fn stored_file_count(upload_dir: &Path) -> usize {
    std::fs::read_dir(upload_dir.join("calamity"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// API router wired the way `main` wires it, minus rate limiting (oneshot
/// requests carry no peer address).
pub fn build_router(db: Arc<DatabaseConnection>, upload_dir: &Path) -> Router {
    build_router_with_limit(db, upload_dir, DEFAULT_MAX_BODY_BYTES)
}

pub fn build_router_with_limit(
    db: Arc<DatabaseConnection>,
    upload_dir: &Path,
    max_body_bytes: usize,
) -> Router {
    let upload_config = UploadConfig {
        upload_dir: upload_dir.to_string_lossy().into_owned(),
    };

    Router::new()
        .merge(calamity::routes::create_routes(
            &RateLimitConfig::disabled(),
            max_body_bytes,
        ))
        .layer(axum::middleware::from_fn(
            calamity::middleware::security::security_headers_middleware,
        ))
        .layer(Extension(db))
        .layer(Extension(upload_config))
}

/// Statements a mock connection saw. Call once the router that shared the
/// connection has been consumed.
pub fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<Transaction> {
    Arc::try_unwrap(db)
        .unwrap_or_else(|_| panic!("Connection is still shared with a router"))
        .into_transaction_log()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// A file part: (field name, file name, content type, bytes).
pub type FilePart<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

pub fn multipart_request(uri: &str, fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content_type, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn incident(id: i32) -> IncidentModel {
    IncidentModel {
        id,
        reporter_id: 7,
        incident_type: "Flood".into(),
        description: "River overflow".into(),
        barangay: Some("Estefania".into()),
        city: Some("Bacolod".into()),
        status: "Pending".into(),
        severity_level: None,
        latitude: Some(10.67),
        longitude: Some(122.95),
        coordinates: Some("[[122.95,10.67],[122.96,10.67],[122.96,10.68]]".into()),
        area_ha: Some(2.5),
        photos: None,
        videos: None,
        date_reported: chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap(),
    }
}

pub struct TestApp {
    pub addr: String,
    pub db: Arc<DatabaseConnection>,
    pub client: Client,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.addr, path)
    }
}

/// Server on a random port against a real database. `None` when no
/// database is configured, so live tests skip instead of failing.
pub async fn spawn_app() -> Option<TestApp> {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    MIGRATIONS
        .get_or_init(|| async {
            calamity::migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
        })
        .await;

    let db = Arc::new(db);
    let upload_dir = temp_upload_dir();
    let app = build_router(db.clone(), &upload_dir);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some(TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
        upload_dir,
    })
}

/// City name no other test uses, so aggregates can be scoped per test.
pub fn unique_city() -> String {
    format!("City-{}", uuid::Uuid::new_v4().simple())
}
