// src/suggest.rs
//! Search box behaviour that drives the history and autocomplete endpoints.
//!
//! Each search input owns one [`InlineCompletion`]; nothing here is shared
//! between inputs.
use std::time::Duration;

use crate::models::HistoryEntry;

/// Idle time before the inline suggestion is fetched.
pub const INLINE_DEBOUNCE: Duration = Duration::from_millis(150);
/// Idle time before the dropdown refreshes.
pub const DROPDOWN_DEBOUNCE: Duration = Duration::from_millis(300);
/// How long results survive a blur, so clicks on them still land.
pub const BLUR_GRACE: Duration = Duration::from_millis(200);

/// Queries at least this long go to full-text search instead of history.
pub const FULL_SEARCH_MIN_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownMode {
    /// Nothing typed: show the whole history.
    History,
    /// One or two characters: filter history through autocomplete.
    Autocomplete,
    /// Long enough for the full-text search service.
    FullSearch,
}

impl DropdownMode {
    pub fn for_query(query: &str) -> Self {
        match query.chars().count() {
            0 => DropdownMode::History,
            n if n < FULL_SEARCH_MIN_CHARS => DropdownMode::Autocomplete,
            _ => DropdownMode::FullSearch,
        }
    }
}

/// "Ghost text" completion for a single input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InlineCompletion {
    suggestion: Option<String>,
}

impl InlineCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Takes the first autocomplete result as the suggestion, as long as it
    /// really extends what was typed.
    pub fn update(&mut self, typed: &str, suggestions: &[HistoryEntry]) {
        self.suggestion = match suggestions.first() {
            Some(first) if !typed.is_empty() && extends(&first.query, typed) => Some(first.query.clone()),
            _ => None,
        };
    }

    /// The part of the suggestion drawn after the typed text.
    pub fn ghost_suffix(&self, typed: &str) -> Option<&str> {
        let suggestion = self.suggestion.as_deref()?;
        if !extends(suggestion, typed) {
            return None;
        }
        suggestion.get(typed.len()..).filter(|rest| !rest.is_empty())
    }

    /// Right arrow: replaces the input with the suggestion, but only when
    /// the cursor is at the end of the input.
    pub fn accept(&mut self, cursor: usize, input_len: usize) -> Option<String> {
        if cursor != input_len {
            return None;
        }
        self.suggestion.take()
    }

    pub fn clear(&mut self) {
        self.suggestion = None;
    }
}

fn extends(suggestion: &str, typed: &str) -> bool {
    suggestion.to_lowercase().starts_with(&typed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchIn;
    use rstest::rstest;

    fn entries(queries: &[&str]) -> Vec<HistoryEntry> {
        queries
            .iter()
            .enumerate()
            .map(|(i, query)| HistoryEntry {
                query: query.to_string(),
                search_in: SearchIn::Titles,
                timestamp: i as i64,
            })
            .collect()
    }

    #[rstest]
    #[case("", DropdownMode::History)]
    #[case("e", DropdownMode::Autocomplete)]
    #[case("ep", DropdownMode::Autocomplete)]
    #[case("epi", DropdownMode::FullSearch)]
    #[case("éé", DropdownMode::Autocomplete)]
    fn dropdown_mode_follows_query_length(#[case] query: &str, #[case] expected: DropdownMode) {
        assert_eq!(DropdownMode::for_query(query), expected);
    }

    #[test]
    fn shows_remaining_text_of_first_suggestion() {
        let mut completion = InlineCompletion::new();
        completion.update("ep", &entries(&["epic games", "epl"]));

        assert_eq!(completion.suggestion(), Some("epic games"));
        assert_eq!(completion.ghost_suffix("ep"), Some("ic games"));
    }

    #[test]
    fn matching_ignores_case() {
        let mut completion = InlineCompletion::new();
        completion.update("NODE", &entries(&["nodejs"]));

        assert_eq!(completion.ghost_suffix("NODE"), Some("js"));
    }

    #[test]
    fn no_suggestion_without_results_or_input() {
        let mut completion = InlineCompletion::new();

        completion.update("xyz", &[]);
        assert_eq!(completion.suggestion(), None);

        completion.update("", &entries(&["anything"]));
        assert_eq!(completion.suggestion(), None);
    }

    #[test]
    fn exact_match_has_no_ghost_text() {
        let mut completion = InlineCompletion::new();
        completion.update("epl", &entries(&["epl"]));

        assert_eq!(completion.ghost_suffix("epl"), None);
    }

    #[test]
    fn accept_needs_cursor_at_end() {
        let mut completion = InlineCompletion::new();
        completion.update("ep", &entries(&["epic games"]));

        assert_eq!(completion.accept(1, 2), None);
        assert_eq!(completion.accept(2, 2), Some("epic games".to_string()));
        assert_eq!(completion.suggestion(), None);
    }

    #[test]
    fn clear_drops_suggestion() {
        let mut completion = InlineCompletion::new();
        completion.update("ep", &entries(&["epic games"]));

        completion.clear();

        assert_eq!(completion.ghost_suffix("ep"), None);
    }

    #[test]
    fn inputs_do_not_share_state() {
        let mut header = InlineCompletion::new();
        let page = InlineCompletion::new();

        header.update("ep", &entries(&["epic games"]));

        assert!(header.suggestion().is_some());
        assert!(page.suggestion().is_none());
    }
}
