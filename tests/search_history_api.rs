mod common;

use common::{app, request, send};
use serde_json::{json, Value};

async fn save(app: &axum::Router, uid: u64, body: Value) -> u16 {
    send(app, request("POST", "/api/search/history", Some(uid), Some(body)))
        .await
        .0
}

fn queries(body: &Value, field: &str) -> Vec<String> {
    body[field]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["query"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn save_get_and_clear() {
    let app = app();
    for query in ["A", "B", "C"] {
        assert_eq!(save(&app, 1, json!({ "query": query })).await, 200);
    }

    let (status, body) = send(&app, request("GET", "/api/search/history", Some(1), None)).await;
    assert_eq!(status, 200);
    assert_eq!(queries(&body, "searches"), vec!["C", "B", "A"]);
    assert_eq!(body["searches"][0]["searchIn"], "titles");
    assert!(body["searches"][0]["timestamp"].is_i64());

    let (status, body) = send(&app, request("DELETE", "/api/search/history", Some(1), None)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (_, body) = send(&app, request("GET", "/api/search/history", Some(1), None)).await;
    assert_eq!(body["searches"], json!([]));
}

#[tokio::test]
async fn history_keeps_ten_most_recent() {
    let app = app();
    for i in 1..=11 {
        save(&app, 1, json!({ "query": format!("query-{i}") })).await;
    }

    let (_, body) = send(&app, request("GET", "/api/search/history?limit=50", Some(1), None)).await;
    let saved = queries(&body, "searches");
    assert_eq!(saved.len(), 10);
    assert_eq!(saved.first().unwrap(), "query-11");
    assert_eq!(saved.last().unwrap(), "query-2");

    let (_, body) = send(&app, request("GET", "/api/search/history?limit=3", Some(1), None)).await;
    assert_eq!(queries(&body, "searches"), vec!["query-11", "query-10", "query-9"]);
}

#[tokio::test]
async fn save_validates_input() {
    let app = app();
    assert_eq!(save(&app, 1, json!({ "query": "   " })).await, 400);
    assert_eq!(save(&app, 1, json!({})).await, 400);
    assert_eq!(
        save(&app, 1, json!({ "query": "rust", "searchIn": "everything" })).await,
        400
    );
    assert_eq!(save(&app, 1, json!({ "query": "rust", "searchIn": "posts" })).await, 200);

    let (status, _) = send(
        &app,
        request("POST", "/api/search/history", None, Some(json!({ "query": "rust" }))),
    )
    .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn autocomplete_matches_own_history() {
    let app = app();
    for query in ["episode", "Epic games", "rust"] {
        save(&app, 1, json!({ "query": query })).await;
    }
    save(&app, 2, json!({ "query": "epilogue" })).await;

    let (status, body) = send(
        &app,
        request("GET", "/api/search/autocomplete?query=ep", Some(1), None),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(queries(&body, "suggestions"), vec!["Epic games", "episode"]);

    let (_, body) = send(
        &app,
        request("GET", "/api/search/autocomplete?query=ep&limit=1", Some(1), None),
    )
    .await;
    assert_eq!(queries(&body, "suggestions"), vec!["Epic games"]);

    let (_, body) = send(&app, request("GET", "/api/search/autocomplete", Some(1), None)).await;
    assert_eq!(body["suggestions"], json!([]));
}
