use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use poll_search_backend::{db::Store, routes::create_routes, state::AppState};
use serde_json::Value;
use tower::ServiceExt;

pub fn app() -> Router {
    create_routes(AppState::new(Store::memory()))
}

pub fn request(method: &str, uri: &str, uid: Option<u64>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(uid) = uid {
        builder = builder.header("x-uid", uid.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends one request through the router, returning the status and JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (u16, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
