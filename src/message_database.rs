use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, StorageError, ValidationError};
use crate::storage::{JsonFileStorage, Storage};

pub const DEFAULT_USERNAME: &str = "Anon";
pub const DEFAULT_MAX_MESSAGES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64, // unix milliseconds, bumped past the previous id on collision
    pub username: String,
    pub text: String,
    pub timestamp: String,
}

pub type Messages = Vec<Message>;

/// What a client posts. `user` is accepted for `username`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewMessage {
    #[serde(default, alias = "user")]
    pub username: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl NewMessage {
    /// Returns the username to store and the trimmed text.
    fn validate(self) -> Result<(String, String), ValidationError> {
        let text = self.text.unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let username = match self.username {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_USERNAME.to_string(),
        };
        Ok((username, text))
    }
}

/// Watermark for `GET /messages?since=...`.
///
/// A value that parses as an integer is a message id, anything else is
/// compared to message timestamps as a plain string. Fixed-width UTC
/// timestamps sort lexically in chronological order, and malformed ones
/// just filter differently instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinceFilter {
    All,
    ById(i64),
    ByTimestamp(String),
}

impl SinceFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => SinceFilter::All,
            Some(value) => match value.trim().parse::<i64>() {
                Ok(id) => SinceFilter::ById(id),
                Err(_) => SinceFilter::ByTimestamp(value.to_string()),
            },
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            SinceFilter::All => true,
            SinceFilter::ById(id) => message.id > *id,
            SinceFilter::ByTimestamp(ts) => message.timestamp.as_str() > ts.as_str(),
        }
    }
}

/// How many messages the database keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Unbounded,
    LastN(usize),
}

impl Retention {
    /// `0` means no cap.
    pub fn from_cap(cap: usize) -> Self {
        if cap == 0 {
            Retention::Unbounded
        } else {
            Retention::LastN(cap)
        }
    }

    /// Drops the oldest messages beyond the cap and returns how many went.
    fn apply(&self, messages: &mut Messages) -> usize {
        match *self {
            Retention::LastN(cap) if messages.len() > cap => {
                let excess = messages.len() - cap;
                messages.drain(0..excess);
                excess
            }
            _ => 0,
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Retention::LastN(DEFAULT_MAX_MESSAGES)
    }
}

/// Renders `instant` as ISO-8601 UTC with fixed microsecond precision and a `Z` suffix.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Ordered message history on top of a [`Storage`].
///
/// Every operation holds `lock` for its whole load/modify/save cycle, so
/// concurrent appends never lose each other's writes and readers never see
/// a half-finished one.
pub struct MessageDatabase<S = JsonFileStorage> {
    storage: S,
    retention: Retention,
    lock: Mutex<()>,
}

impl<S: Storage> MessageDatabase<S> {
    pub fn new(storage: S, retention: Retention) -> Self {
        MessageDatabase {
            storage,
            retention,
            lock: Mutex::new(()),
        }
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn ensure_initialized(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        self.storage.init()
    }

    pub fn append(&self, candidate: NewMessage) -> Result<Message, ChatError> {
        self.append_at(candidate, Utc::now)
    }

    /// Like [`append`](Self::append), with `clock` sampled once while the lock is held.
    pub(crate) fn append_at(
        &self,
        candidate: NewMessage,
        clock: impl FnOnce() -> DateTime<Utc>,
    ) -> Result<Message, ChatError> {
        let (username, text) = candidate.validate()?;

        let _guard = self.lock.lock();
        let mut messages = self.storage.load()?;

        let mut now = clock();
        // Same-millisecond sends or a clock stepping back: move past the last message
        // so ids and timestamps both keep increasing in storage order.
        if let Some(last) = messages.last() {
            if now.timestamp_millis() <= last.id {
                now = last
                    .id
                    .checked_add(1)
                    .and_then(|id| Utc.timestamp_millis_opt(id).single())
                    .ok_or(StorageError::IdExhausted(last.id))?;
            }
        }
        let message = Message {
            id: now.timestamp_millis(),
            username,
            text,
            timestamp: format_timestamp(now),
        };
        messages.push(message.clone());

        let evicted = self.retention.apply(&mut messages);
        if evicted > 0 {
            tracing::debug!(evicted, "dropping messages over retention cap");
        }

        self.storage.save(&messages)?;
        tracing::debug!(id = message.id, username = %message.username, "stored message");
        Ok(message)
    }

    pub fn query(&self, since: &SinceFilter) -> Result<Messages, StorageError> {
        let _guard = self.lock.lock();
        let messages = self.storage.load()?;
        Ok(match since {
            SinceFilter::All => messages,
            _ => messages.into_iter().filter(|m| since.matches(m)).collect(),
        })
    }
}
