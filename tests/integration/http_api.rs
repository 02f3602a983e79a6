#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use dynasty::{
    demo::demo_dataset,
    persist::MemoryPersistence,
    server::{build_router, ServerOptions},
    store::{Catalog, CatalogOptions},
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, Arc<MemoryPersistence>) {
    let persistence = Arc::new(MemoryPersistence::new(demo_dataset()));
    let catalog = Catalog::open(Arc::clone(&persistence), CatalogOptions::default())
        .expect("open catalog");
    let router = build_router(Arc::new(catalog), &ServerOptions::default());
    (router, persistence)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(router, request).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(router, request).await
}

#[tokio::test]
async fn health_reports_ok() {
    let (router, _) = app();
    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn models_list_filters_and_envelopes() {
    let (router, _) = app();
    let (status, body) = get(&router, "/api/models").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(12));

    let (_, dynasty) = get(&router, "/api/models?series_id=1&energy_type=").await;
    let names: Vec<&str> = dynasty["data"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|model| model["model_name"].as_str())
        .collect();
    assert_eq!(names, vec!["秦PLUS DM-i", "宋PLUS DM-i", "唐DM-i", "汉DM-i", "汉EV"]);

    let (status, body) = get(&router, "/api/models?series_id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn model_detail_maps_missing_and_unknown_ids() {
    let (router, _) = app();
    let (status, body) = get(&router, "/api/model?id=9006").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model_name"], "海豹");
    assert_eq!(body["data"]["series_name"], "海洋");

    let (status, _) = get(&router, "/api/model").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&router, "/api/model?id=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap_or_default().contains("not found"));
}

#[tokio::test]
async fn search_requires_keyword() {
    let (router, _) = app();
    let (status, _) = get(&router, "/api/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&router, "/api/search?q=%E6%B5%B7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn series_techs_stats_and_graph() {
    let (router, _) = app();
    let (_, series) = get(&router, "/api/series").await;
    assert_eq!(series["data"][0]["series_name"], "王朝");
    assert_eq!(series["data"][0]["model_count"], 5);

    let (_, techs) = get(&router, "/api/techs").await;
    assert_eq!(techs["data"].as_array().map(Vec::len), Some(6));

    let (_, stats) = get(&router, "/api/stats").await;
    assert_eq!(stats["data"]["node_count"], 24);
    assert_eq!(stats["data"]["edge_count"], 47);

    let (_, graph) = get(&router, "/api/graph").await;
    assert_eq!(graph["data"]["nodes"].as_array().map(Vec::len), Some(23));
    assert_eq!(graph["data"]["links"].as_array().map(Vec::len), Some(42));
}

#[tokio::test]
async fn add_model_strict_and_deferred() {
    let (router, persistence) = app();
    let saves = persistence.save_count();

    let (status, body) = post(
        &router,
        "/api/model/add",
        json!({
            "model_name": "元PLUS",
            "series_id": 2,
            "price": 13.58,
            "energy_type": "EV",
            "tech_ids": [101, 102]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model_id"], 9013);
    assert_eq!(body["data"]["tech_ids"], json!([101, 102]));
    assert_eq!(persistence.save_count(), saves + 1);

    let (status, body) = post(
        &router,
        "/api/model/add",
        json!({
            "model_name": "海狮",
            "series_id": 2,
            "price": 18.98,
            "energy_type": "EV"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model_id"], 9014);

    let (status, body) = post(
        &router,
        "/api/model/link",
        json!({ "model_id": 9014, "tech_id": 101 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], true);
    assert!(persistence
        .stored()
        .associations
        .contains(&(9014, 101)));
}

#[tokio::test]
async fn constraint_failures_map_to_status_codes() {
    let (router, persistence) = app();
    let saves = persistence.save_count();

    let (status, body) = post(
        &router,
        "/api/model/add",
        json!({
            "model_name": "幽灵",
            "series_id": 99,
            "price": 10.0,
            "energy_type": "EV",
            "tech_ids": [101]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["ok"], false);

    let (status, _) = post(
        &router,
        "/api/model/add",
        json!({
            "model_name": "海豹",
            "series_id": 2,
            "price": 10.0,
            "energy_type": "EV",
            "tech_ids": [101]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(
        &router,
        "/api/model/add",
        json!({
            "model_name": "海豹2",
            "series_id": 2,
            "price": -1.0,
            "energy_type": "EV",
            "tech_ids": [101]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let comma_name = json!({
        "model_name": "海,豹",
        "series_id": 2,
        "price": 10.0,
        "energy_type": "EV",
        "tech_ids": [101]
    });
    let (status, _) = post(&router, "/api/model/add", comma_name.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&router, "/api/model/add", comma_name).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(
        &router,
        "/api/model/link",
        json!({ "model_id": 9001, "tech_id": 999 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method("POST")
        .uri("/api/tech/add")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);

    // Only the comma-named model was saved.
    assert_eq!(persistence.save_count(), saves + 1);
    assert!(persistence
        .stored()
        .models
        .iter()
        .any(|model| model.name == "海,豹"));
}

#[tokio::test]
async fn add_tech_and_series_allocate_from_floors() {
    let (router, _) = app();
    let (status, body) = post(
        &router,
        "/api/tech/add",
        json!({ "tech_name": "天神之眼", "intro": "高阶智驾，全系标配" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tech_id"], 200);

    let (status, _) = post(&router, "/api/tech/add", json!({ "tech_name": "天神之眼" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = post(
        &router,
        "/api/series/add",
        json!({ "series_name": "腾势N" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["series_id"], 6);
}

#[tokio::test]
async fn concurrent_adds_get_distinct_ids() {
    let (router, _) = app();
    let mut handles = Vec::new();
    for index in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let (status, body) = post(
                &router,
                "/api/model/add",
                json!({
                    "model_name": format!("并发{index}"),
                    "series_id": 1,
                    "price": 10.0 + f64::from(index),
                    "energy_type": "PHEV",
                    "tech_ids": [100]
                }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            body["data"]["model_id"].as_i64().expect("model id")
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.expect("task"));
    }
    ids.sort_unstable();
    assert_eq!(ids, (9013..9021).collect::<Vec<i64>>());
}
