// src/poll.rs
//! Poll lifecycle: create, read, vote, close and delete.
//!
//! A poll lives in one stored object keyed by its id, which also holds the
//! per-voter responses. Every mutation is a compare-and-swap on the
//! object's version, retried a few times before giving up with
//! [`PollError::Contention`].
use std::cmp::Ordering;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::db::{Store, StoreError};
use crate::models::{OptionId, OptionView, Poll, PollOption, PollView, Uid};

/// Sorted set of poll ids scored by creation time.
pub const POLL_INDEX: &str = "polls:created";
pub const POLL_KEY_PREFIX: &str = "poll:";

const MAX_UPDATE_ATTEMPTS: usize = 8;
const MAX_ID_ATTEMPTS: usize = 16;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Poll data not valid, {0}")]
    Validation(String),

    #[error("Poll not found: {0}")]
    NotFound(String),

    #[error("Option not found: {0}")]
    OptionNotFound(OptionId),

    #[error("Only the poll creator can do that")]
    Permission,

    #[error("Poll is closed")]
    Closed,

    #[error("Poll is already closed")]
    AlreadyClosed,

    #[error("Poll {0} is busy, try again")]
    Contention(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        PollError::Store(err.into())
    }
}

pub fn poll_key(timestamp: i64) -> String {
    format!("{POLL_KEY_PREFIX}{timestamp}")
}

impl Poll {
    pub fn has_voted(&self, uid: Uid) -> bool {
        self.responses.contains_key(&uid)
    }

    fn option_index(&self, option_id: OptionId) -> Option<usize> {
        self.options.iter().position(|option| option.option_id == option_id)
    }

    /// Points `uid`'s response at `option_id`.
    ///
    /// A first vote adds one to the option and to `total_votes`. Switching
    /// moves one vote from the old option to the new one. Repeating the
    /// current choice changes nothing. Returns whether the poll changed.
    pub fn cast_vote(&mut self, uid: Uid, option_id: OptionId) -> Result<bool, PollError> {
        if self.is_closed {
            return Err(PollError::Closed);
        }
        let target = self
            .option_index(option_id)
            .ok_or(PollError::OptionNotFound(option_id))?;

        match self.responses.insert(uid, option_id) {
            Some(previous) if previous == option_id => return Ok(false),
            Some(previous) => match self.option_index(previous) {
                Some(old) => {
                    let old = &mut self.options[old];
                    old.votes = old.votes.saturating_sub(1);
                }
                // The old choice no longer exists, so its vote was not counted.
                None => self.total_votes += 1,
            },
            None => self.total_votes += 1,
        }
        self.options[target].votes += 1;

        Ok(true)
    }

    pub fn close_by(&mut self, uid: Uid) -> Result<(), PollError> {
        if self.creator_uid != uid {
            return Err(PollError::Permission);
        }
        if self.is_closed {
            return Err(PollError::AlreadyClosed);
        }
        self.is_closed = true;
        Ok(())
    }
}

impl PollView {
    /// The poll as `viewer` sees it. Nothing here is stored.
    pub fn project(poll: &Poll, viewer: Uid) -> Self {
        let votes: Vec<u32> = poll.options.iter().map(|option| option.votes).collect();
        let percentages = percentages(&votes, poll.total_votes);

        Self {
            poll_id: poll.poll_id.clone(),
            title: poll.title.clone(),
            question: poll.question.clone(),
            options: poll
                .options
                .iter()
                .zip(percentages)
                .map(|(option, percentage)| OptionView {
                    option_id: option.option_id,
                    text: option.text.clone(),
                    votes: option.votes,
                    percentage,
                })
                .collect(),
            creator_uid: poll.creator_uid,
            timestamp: poll.timestamp,
            total_votes: poll.total_votes,
            is_closed: poll.is_closed,
            has_voted: poll.has_voted(viewer),
            is_creator: poll.creator_uid == viewer,
        }
    }
}

/// Rounded share of `total` for each count. All zero when `total` is zero.
///
/// Plain rounding can overshoot 100 (eight equal options round to 13 each),
/// so the options rounded up the most give back a point until the sum fits.
pub fn percentages(votes: &[u32], total: u32) -> Vec<u32> {
    if total == 0 {
        return vec![0; votes.len()];
    }

    let exact: Vec<f64> = votes
        .iter()
        .map(|&count| f64::from(count) * 100.0 / f64::from(total))
        .collect();
    let mut rounded: Vec<u32> = exact.iter().map(|share| share.round() as u32).collect();

    let mut excess = rounded.iter().sum::<u32>().saturating_sub(100);
    if excess > 0 {
        let overshoot = |index: usize| f64::from(rounded[index]) - exact[index];
        let mut order: Vec<usize> = (0..votes.len()).collect();
        order.sort_by(|&a, &b| overshoot(b).partial_cmp(&overshoot(a)).unwrap_or(Ordering::Equal));

        for index in order {
            if excess == 0 {
                break;
            }
            if f64::from(rounded[index]) > exact[index] {
                rounded[index] -= 1;
                excess -= 1;
            }
        }
    }

    rounded
}

#[derive(Clone)]
pub struct Polls {
    store: Store,
}

impl Polls {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, options))]
    pub async fn create(
        &self,
        title: &str,
        question: &str,
        options: &[String],
        creator_uid: Uid,
    ) -> Result<PollView, PollError> {
        let title = title.trim();
        let question = question.trim();
        let options: Vec<PollOption> = options
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .enumerate()
            .map(|(index, text)| PollOption {
                option_id: index as OptionId,
                text: text.to_string(),
                votes: 0,
            })
            .collect();

        if title.is_empty() || question.is_empty() || options.len() < 2 {
            return Err(PollError::Validation(
                "need title, question, and at least 2 options".to_string(),
            ));
        }

        let mut timestamp = Utc::now().timestamp_millis();
        let mut poll = Poll {
            poll_id: poll_key(timestamp),
            title: title.to_string(),
            question: question.to_string(),
            options,
            creator_uid,
            timestamp,
            total_votes: 0,
            is_closed: false,
            responses: Default::default(),
        };

        for _ in 0..MAX_ID_ATTEMPTS {
            if self
                .store
                .insert_object(&poll.poll_id, serde_json::to_value(&poll)?)
                .await?
            {
                self.store
                    .sorted_set_add(POLL_INDEX, timestamp, &poll.poll_id)
                    .await?;
                info!(poll_id = %poll.poll_id, "Poll created");
                return Ok(PollView::project(&poll, creator_uid));
            }

            // Another poll was created in the same millisecond.
            timestamp += 1;
            poll.timestamp = timestamp;
            poll.poll_id = poll_key(timestamp);
        }

        Err(PollError::Contention(poll.poll_id))
    }

    pub async fn get(&self, poll_id: &str, uid: Uid) -> Result<PollView, PollError> {
        let (poll, _) = self.load(poll_id).await?;
        Ok(PollView::project(&poll, uid))
    }

    /// Every indexed poll, newest first.
    pub async fn get_all(&self, uid: Uid) -> Result<Vec<PollView>, PollError> {
        let poll_ids: Vec<String> = self
            .store
            .sorted_set_rev_range(POLL_INDEX, 0, None)
            .await?
            .into_iter()
            .map(|entry| entry.member)
            .collect();

        self.get_multiple(&poll_ids, uid).await
    }

    /// The requested polls that still exist, newest first.
    pub async fn get_multiple(&self, poll_ids: &[String], uid: Uid) -> Result<Vec<PollView>, PollError> {
        if poll_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut polls = Vec::with_capacity(poll_ids.len());
        for stored in self.store.get_objects(poll_ids).await?.into_iter().flatten() {
            polls.push(serde_json::from_value::<Poll>(stored.value)?);
        }
        polls.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(polls.iter().map(|poll| PollView::project(poll, uid)).collect())
    }

    #[instrument(skip(self))]
    pub async fn vote(&self, poll_id: &str, option_id: OptionId, uid: Uid) -> Result<PollView, PollError> {
        let poll = self
            .update(poll_id, |poll| poll.cast_vote(uid, option_id))
            .await?;
        info!(total_votes = poll.total_votes, "Vote recorded");

        Ok(PollView::project(&poll, uid))
    }

    #[instrument(skip(self))]
    pub async fn close(&self, poll_id: &str, uid: Uid) -> Result<PollView, PollError> {
        let poll = self
            .update(poll_id, |poll| poll.close_by(uid).map(|()| true))
            .await?;
        info!("Poll closed");

        Ok(PollView::project(&poll, uid))
    }

    /// Removes the poll, its responses and its index entry. Ids outside the
    /// poll keyspace are never polls, so there is nothing to delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, poll_id: &str) -> Result<(), PollError> {
        if !poll_id.starts_with(POLL_KEY_PREFIX) {
            return Ok(());
        }

        self.store.delete(poll_id).await?;
        self.store.sorted_set_remove(POLL_INDEX, poll_id).await?;
        info!("Poll deleted");
        Ok(())
    }

    async fn load(&self, poll_id: &str) -> Result<(Poll, i64), PollError> {
        if !poll_id.starts_with(POLL_KEY_PREFIX) {
            return Err(PollError::NotFound(poll_id.to_string()));
        }

        let stored = self
            .store
            .get_object(poll_id)
            .await?
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))?;

        Ok((serde_json::from_value(stored.value)?, stored.version))
    }

    /// Read, mutate, then write back only if nobody else wrote in between.
    async fn update<F>(&self, poll_id: &str, mut mutate: F) -> Result<Poll, PollError>
    where
        F: FnMut(&mut Poll) -> Result<bool, PollError>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (mut poll, version) = self.load(poll_id).await?;
            if !mutate(&mut poll)? {
                return Ok(poll);
            }

            let value = serde_json::to_value(&poll)?;
            if self.store.replace_object(poll_id, version, value).await? {
                return Ok(poll);
            }
            debug!(poll_id, attempt, "Poll changed during update, retrying");
        }

        Err(PollError::Contention(poll_id.to_string()))
    }
}
