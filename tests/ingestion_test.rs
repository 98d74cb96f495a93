mod common;

use axum::http::StatusCode;
use sea_orm::{DatabaseBackend, MockDatabase};
use std::sync::Arc;
use tower::ServiceExt;

const RING: &str = "[[122.95,10.67],[122.96,10.67],[122.96,10.68]]";

fn form<'a>(coordinates: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("calamity_type", "Flood"),
        ("description", "River overflow"),
        ("coordinates", coordinates),
        ("admin_id", "7"),
        ("barangay", "Estefania"),
        ("affected_area", "2.5"),
    ]
}

#[tokio::test]
async fn two_point_boundary_is_rejected_before_anything_is_written() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router(db.clone(), &upload_dir);

    let resp = app
        .oneshot(common::multipart_request(
            "/api/calamities",
            &form("[[122.95,10.67],[122.96,10.67]]"),
            &[("photos", "field.jpg", "image/jpeg", b"jpeg-bytes")],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(resp).await;
    assert_eq!(
        body["error"],
        "Coordinates must be an array with at least 3 points"
    );
    assert_eq!(common::stored_file_count(&upload_dir), 0);
    assert!(common::transaction_log(db).is_empty());
}

#[tokio::test]
async fn missing_required_fields() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router(db.clone(), &upload_dir);

    let resp = app
        .oneshot(common::multipart_request(
            "/api/calamities",
            &[("calamity_type", "Flood"), ("admin_id", "7")],
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(resp).await;
    assert_eq!(
        body["error"],
        "calamity_type, description, and coordinates are required"
    );
    assert!(common::transaction_log(db).is_empty());
}

#[tokio::test]
async fn missing_reporter() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router(db, &upload_dir);

    let mut fields = form(RING);
    fields.retain(|(k, _)| *k != "admin_id");

    let resp = app
        .oneshot(common::multipart_request("/api/calamities", &fields, &[]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(resp).await;
    assert_eq!(body["error"], "admin_id is required");
}

#[tokio::test]
async fn unsupported_media_type_writes_nothing() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router(db.clone(), &upload_dir);

    let resp = app
        .oneshot(common::multipart_request(
            "/api/calamities",
            &form(RING),
            &[
                ("photos", "ok.jpg", "image/jpeg", b"jpeg-bytes"),
                ("photos", "anim.gif", "image/gif", b"gif-bytes"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(resp).await;
    assert_eq!(body["error"], "Unsupported file type: image/gif");
    assert_eq!(common::stored_file_count(&upload_dir), 0);
    assert!(common::transaction_log(db).is_empty());
}

#[tokio::test]
async fn file_under_unknown_field_is_rejected() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router(db, &upload_dir);

    let resp = app
        .oneshot(common::multipart_request(
            "/api/calamities",
            &form(RING),
            &[("attachment", "a.jpg", "image/jpeg", b"jpeg-bytes")],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(resp).await;
    assert_eq!(body["error"], "Unexpected file field: attachment");
}

#[tokio::test]
async fn body_over_route_limit_is_413() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router_with_limit(db.clone(), &upload_dir, 1024);

    let big = vec![0u8; 8 * 1024];
    let resp = app
        .oneshot(common::multipart_request(
            "/api/calamities",
            &form(RING),
            &[("photos", "big.jpg", "image/jpeg", &big)],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = common::body_json(resp).await;
    assert!(body["error"].is_string());
    assert_eq!(common::stored_file_count(&upload_dir), 0);
    assert!(common::transaction_log(db).is_empty());
}

#[tokio::test]
async fn valid_submission_stores_media_and_returns_created() {
    let mut stored = common::incident(31);
    stored.photos = Some(r#"["/uploads/calamity/1700000000000_field.jpg"]"#.into());
    stored.videos = Some(r#"["/uploads/calamity/1700000000000_clip.mp4"]"#.into());

    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored]])
            .into_connection(),
    );
    let upload_dir = common::temp_upload_dir();
    let app = common::build_router(db.clone(), &upload_dir);

    let resp = app
        .oneshot(common::multipart_request(
            "/api/calamities",
            &form(RING),
            &[
                ("photos[]", "field.jpg", "image/jpeg", b"jpeg-bytes"),
                ("videos", "clip.mp4", "video/mp4", b"mp4-bytes"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = common::body_json(resp).await;
    assert_eq!(body["id"], 31);
    assert_eq!(body["calamity_id"], 31);
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["severity_level"], serde_json::Value::Null);
    assert_eq!(body["photo"], "/uploads/calamity/1700000000000_field.jpg");
    assert_eq!(body["videos"][0], "/uploads/calamity/1700000000000_clip.mp4");

    assert_eq!(common::stored_file_count(&upload_dir), 2);
    assert_eq!(common::transaction_log(db).len(), 1);

    let _ = std::fs::remove_dir_all(&upload_dir);
}

#[tokio::test]
async fn live_submission_round_trip() {
    let Some(app) = common::spawn_app().await else {
        return;
    };
    let city = common::unique_city();

    let form = reqwest::multipart::Form::new()
        .text("calamity_type", "Flood")
        .text("description", "Live ingestion")
        .text("coordinates", RING)
        .text("admin_id", "7")
        .text("city", city.clone())
        .text("severity_level", "high")
        .part(
            "photos",
            reqwest::multipart::Part::bytes(b"jpeg-bytes".to_vec())
                .file_name("my field.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        );

    let resp = app
        .client
        .post(app.url("/calamities"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["severity_level"], "High");
    assert_eq!(body["severity"], 5);
    assert_eq!(body["longitude"], 122.95);
    assert_eq!(body["latitude"], 10.67);
    assert_eq!(body["coordinates"].as_array().map(Vec::len), Some(3));
    let photo = body["photo"].as_str().unwrap();
    assert!(photo.starts_with("/uploads/calamity/"));
    assert!(photo.ends_with("_my_field.jpg"));
    assert_eq!(common::stored_file_count(&app.upload_dir), 1);

    let id = body["id"].as_i64().unwrap();
    let resp = app
        .client
        .get(app.url(&format!("/managecalamities/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(fetched["photos"], body["photos"]);

    let resp = app
        .client
        .get(app.url("/calamities/polygons?type=Flood"))
        .send()
        .await
        .unwrap();
    let geo: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(geo["type"], "FeatureCollection");
    let feature = geo["features"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["properties"]["id"] == id)
        .expect("new incident exported");
    let ring = feature["geometry"]["coordinates"][0].as_array().unwrap();
    assert_eq!(ring.len(), 4);
    assert_eq!(ring.first(), ring.last());

    app.client
        .delete(app.url(&format!("/managecalamities/{}", id)))
        .send()
        .await
        .unwrap();
    let _ = std::fs::remove_dir_all(&app.upload_dir);
}
