// src/models.rs
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Uid = u64;
pub type OptionId = u32;

/// A poll as it is stored. `responses` maps each voter to the option they
/// currently back; its keys are the poll's voter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub poll_id: String,
    pub title: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub creator_uid: Uid,
    pub timestamp: i64,
    pub total_votes: u32,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub responses: BTreeMap<Uid, OptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub option_id: OptionId,
    pub text: String,
    pub votes: u32,
}

/// A poll as one particular viewer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub poll_id: String,
    pub title: String,
    pub question: String,
    pub options: Vec<OptionView>,
    pub creator_uid: Uid,
    pub timestamp: i64,
    pub total_votes: u32,
    pub is_closed: bool,
    pub has_voted: bool,
    pub is_creator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub option_id: OptionId,
    pub text: String,
    pub votes: u32,
    pub percentage: u32,
}

/// Where a search was run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchIn {
    #[default]
    Titles,
    TitlesPosts,
    Posts,
    Categories,
    Users,
    Tags,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown search filter: {0}")]
pub struct UnknownSearchFilter(pub String);

impl SearchIn {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchIn::Titles => "titles",
            SearchIn::TitlesPosts => "titlesposts",
            SearchIn::Posts => "posts",
            SearchIn::Categories => "categories",
            SearchIn::Users => "users",
            SearchIn::Tags => "tags",
        }
    }
}

impl fmt::Display for SearchIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchIn {
    type Err = UnknownSearchFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "titles" => Ok(SearchIn::Titles),
            "titlesposts" => Ok(SearchIn::TitlesPosts),
            "posts" => Ok(SearchIn::Posts),
            "categories" => Ok(SearchIn::Categories),
            "users" => Ok(SearchIn::Users),
            "tags" => Ok(SearchIn::Tags),
            other => Err(UnknownSearchFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub query: String,
    pub search_in: SearchIn,
    pub timestamp: i64,
}

#[derive(Deserialize)]
pub struct CreatePollRequest {
    pub title: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
}

/// Option ids arrive either as numbers or as the string value of a form
/// control.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OptionRef {
    Number(i64),
    Text(String),
}

impl OptionRef {
    pub fn resolve(&self) -> Option<OptionId> {
        match self {
            OptionRef::Number(n) => OptionId::try_from(*n).ok(),
            OptionRef::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: OptionRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest {
    pub query: String,
    pub search_in: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub searches: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(2), Some(2))]
    #[case(json!("1"), Some(1))]
    #[case(json!(" 3 "), Some(3))]
    #[case(json!(-1), None)]
    #[case(json!("red"), None)]
    fn option_ref_accepts_numbers_and_numeric_strings(
        #[case] raw: serde_json::Value,
        #[case] expected: Option<OptionId>,
    ) {
        let request: VoteRequest = serde_json::from_value(json!({ "optionId": raw })).unwrap();
        assert_eq!(request.option_id.resolve(), expected);
    }

    #[rstest]
    #[case("titles", SearchIn::Titles)]
    #[case("titlesposts", SearchIn::TitlesPosts)]
    #[case("users", SearchIn::Users)]
    #[case("tags", SearchIn::Tags)]
    fn search_in_parses_and_serializes_alike(#[case] raw: &str, #[case] expected: SearchIn) {
        assert_eq!(raw.parse::<SearchIn>(), Ok(expected));
        assert_eq!(serde_json::to_value(expected).unwrap(), json!(raw));
    }

    #[test]
    fn unknown_search_filter_is_rejected() {
        assert_eq!(
            "everything".parse::<SearchIn>(),
            Err(UnknownSearchFilter("everything".into()))
        );
    }

    #[test]
    fn stored_poll_uses_camel_case() {
        let poll = Poll {
            poll_id: "poll:1".into(),
            title: "T".into(),
            question: "Q".into(),
            options: vec![],
            creator_uid: 1,
            timestamp: 1,
            total_votes: 0,
            is_closed: false,
            responses: BTreeMap::from([(7, 0)]),
        };

        let value = serde_json::to_value(&poll).unwrap();
        assert_eq!(value["pollId"], "poll:1");
        assert_eq!(value["creatorUid"], 1);
        assert_eq!(value["responses"]["7"], 0);

        let back: Poll = serde_json::from_value(value).unwrap();
        assert_eq!(back, poll);
    }
}
