// src/routes.rs
use axum::{
    body::Body,
    routing::{get, post},
    Router,
};
use http::{HeaderValue, Request};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use uuid::Uuid;

use crate::handlers;
use crate::state::AppState;

/// Tags every request with a random v4 UUID unless it already has an id.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/polls", get(handlers::get_polls).post(handlers::create_poll))
        .route(
            "/polls/{poll_id}",
            get(handlers::get_poll).delete(handlers::delete_poll),
        )
        .route("/polls/{poll_id}/vote", post(handlers::vote))
        .route("/polls/{poll_id}/close", post(handlers::close_poll))
        .route(
            "/search/history",
            get(handlers::get_history)
                .post(handlers::save_history)
                .delete(handlers::clear_history),
        )
        .route("/search/autocomplete", get(handlers::autocomplete));

    Router::new()
        .nest("/api", api)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
