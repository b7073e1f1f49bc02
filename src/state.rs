// src/state.rs
use crate::db::Store;
use crate::history::SearchHistory;
use crate::poll::Polls;

#[derive(Clone)]
pub struct AppState {
    pub polls: Polls,
    pub history: SearchHistory,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            polls: Polls::new(store.clone()),
            history: SearchHistory::new(store),
        }
    }
}
