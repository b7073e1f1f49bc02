// src/handlers.rs
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde_json::{json, Value};

use crate::caller::Caller;
use crate::error::AppError;
use crate::history::{HistoryError, HISTORY_LIMIT};
use crate::models::{
    AutocompleteParams, CreatePollRequest, HistoryParams, HistoryResponse, PollView,
    SaveHistoryRequest, SearchIn, SuggestionsResponse, VoteRequest,
};
use crate::poll::PollError;
use crate::state::AppState;

/// Create a poll owned by the caller
pub async fn create_poll(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<Json<PollView>, AppError> {
    let Json(request) = payload?;

    let poll = state
        .polls
        .create(
            request.title.as_deref().unwrap_or_default(),
            request.question.as_deref().unwrap_or_default(),
            request.options.as_deref().unwrap_or_default(),
            caller.uid,
        )
        .await?;

    Ok(Json(poll))
}

/// All polls, newest first
pub async fn get_polls(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<PollView>>, AppError> {
    Ok(Json(state.polls.get_all(caller.uid).await?))
}

pub async fn get_poll(
    State(state): State<AppState>,
    caller: Caller,
    Path(poll_id): Path<String>,
) -> Result<Json<PollView>, AppError> {
    Ok(Json(state.polls.get(&poll_id, caller.uid).await?))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    _caller: Caller,
    Path(poll_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.polls.delete(&poll_id).await?;
    Ok(Json(json!({ "message": "Poll deleted successfully" })))
}

/// Cast or change the caller's vote
pub async fn vote(
    State(state): State<AppState>,
    caller: Caller,
    Path(poll_id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<PollView>, AppError> {
    let Json(request) = payload?;
    let option_id = request.option_id.resolve().ok_or_else(|| {
        PollError::Validation("optionId must be a non-negative integer".to_string())
    })?;

    Ok(Json(state.polls.vote(&poll_id, option_id, caller.uid).await?))
}

/// Close the poll to further votes (creator only)
pub async fn close_poll(
    State(state): State<AppState>,
    caller: Caller,
    Path(poll_id): Path<String>,
) -> Result<Json<PollView>, AppError> {
    Ok(Json(state.polls.close(&poll_id, caller.uid).await?))
}

pub async fn get_history(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(HISTORY_LIMIT);

    let searches = state.history.get(caller.uid, limit).await?;
    Ok(Json(HistoryResponse { searches }))
}

pub async fn save_history(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<SaveHistoryRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;
    let search_in = match request.search_in.as_deref() {
        Some(raw) => raw.parse::<SearchIn>().map_err(HistoryError::from)?,
        None => SearchIn::default(),
    };

    state
        .history
        .save(caller.uid, &request.query, search_in)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn clear_history(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Value>, AppError> {
    state.history.clear(caller.uid).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn autocomplete(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<AutocompleteParams>, QueryRejection>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(HISTORY_LIMIT);

    let suggestions = state
        .history
        .autocomplete(caller.uid, &params.query, limit)
        .await?;
    Ok(Json(SuggestionsResponse { suggestions }))
}
