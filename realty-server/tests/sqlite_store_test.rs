//! The HTTP surface over the SQLite store

mod common;

use common::{create_app_with, schedule_viewing, test_config, FakeIdentityProvider, MockNotifier, TestApp};
use realty_core::Role;
use realty_server::store::ViewingStore;
use realty_server::SqliteStore;
use serde_json::{json, Value};
use tempfile::TempDir;

fn create_sqlite_app() -> (TestApp<SqliteStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("realty.db");
    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
    let app = create_app_with(test_config(), store, FakeIdentityProvider::default(), MockNotifier::new());
    (app, dir)
}

#[tokio::test]
async fn test_viewing_round_trip_through_sqlite() {
    let (app, _dir) = create_sqlite_app();
    let admin = app.login_as("admin", Role::Admin);
    let property = app.create_property("Brick Colonial", 410_000);

    let id = schedule_viewing(&app, &admin, property.id, "visitor@example.com").await;
    assert_eq!(app.notifier().confirmation_count(), 1);

    let response = app
        .server
        .post("/api/rpc/viewingsAdmin.updateStatus")
        .add_cookie(admin.clone())
        .json(&json!({ "id": id, "status": "cancelled", "cancellationReason": "Seller withdrew" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(app.notifier().cancellation_count(), 1);

    let viewing = app.store().get_viewing(id).unwrap().unwrap();
    assert_eq!(viewing.cancellation_reason.as_deref(), Some("Seller withdrew"));
}

#[tokio::test]
async fn test_viewing_for_missing_property_is_not_found() {
    let (app, _dir) = create_sqlite_app();
    let visitor = app.login_as("visitor", Role::User);

    let response = app
        .server
        .post("/api/rpc/viewings.create")
        .add_cookie(visitor)
        .json(&common::viewing_request(9999, "visitor@example.com"))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_image_reorder_through_sqlite() {
    let (app, _dir) = create_sqlite_app();
    let admin = app.login_as("admin", Role::Admin);
    let property = app.create_property("Gallery", 1);

    let mut ids = Vec::new();
    for url in ["https://img/1.jpg", "https://img/2.jpg", "https://img/3.jpg"] {
        let response = app
            .server
            .post("/api/rpc/images.add")
            .add_cookie(admin.clone())
            .json(&json!({ "propertyId": property.id, "url": url }))
            .await;
        ids.push(response.json::<Value>()["id"].as_i64().unwrap());
    }

    // Swapping orders must not trip the uniqueness constraint
    let response = app
        .server
        .post("/api/rpc/images.reorder")
        .add_cookie(admin)
        .json(&json!({ "propertyId": property.id, "imageIds": [ids[2], ids[1], ids[0]] }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());

    let images: Vec<Value> = response.json();
    let order: Vec<i64> = images.iter().map(|img| img["id"].as_i64().unwrap()).collect();
    assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
}

#[tokio::test]
async fn test_comparison_cap_through_sqlite() {
    let (app, _dir) = create_sqlite_app();
    let buyer = app.login_as("buyer", Role::User);

    for n in 0..5 {
        let property = app.create_property(&format!("Option {}", n), n);
        let response = app
            .server
            .post("/api/rpc/comparison.add")
            .add_cookie(buyer.clone())
            .json(&json!({ "propertyId": property.id }))
            .await;
        let expected = if n < 4 { 200 } else { 400 };
        assert_eq!(response.status_code(), expected);
    }
}
