//! Per-session message history.
//!
//! The [`HistoryStore`] trait is the contract the window manager relies on:
//! an append-only, time-ordered log per session that can drop everything
//! older than a cutoff. [`SqliteHistoryStore`] is the production backend.

pub mod clock;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::HistoryError;

pub use clock::{MonotonicClock, SystemTimeSource, TimeSource};
pub use sqlite::SqliteHistoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    /// Role name understood by chat-completion APIs.
    pub fn completion_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "bot" => Ok(Role::Bot),
            other => Err(HistoryError::Corrupt(format!("unknown role '{}'", other))),
        }
    }
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub session_id: String,
    pub role: Role,
    pub text: String,
    /// Microseconds since the Unix epoch, strictly increasing per session.
    pub timestamp: i64,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends a message to the session log.
    async fn append(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        timestamp: i64,
    ) -> Result<(), HistoryError>;

    /// Returns every message of the session, oldest first.
    async fn query_ordered(&self, session_id: &str) -> Result<Vec<Message>, HistoryError>;

    /// Deletes all messages with `timestamp < cutoff`. Returns the number removed.
    async fn delete_before(&self, session_id: &str, cutoff: i64) -> Result<u64, HistoryError>;

    /// Deletes everything older than `cutoff` and appends `replacement` as one unit.
    ///
    /// The default composes [`delete_before`](Self::delete_before) and
    /// [`append`](Self::append); backends with transactions should override it.
    async fn replace_before(
        &self,
        session_id: &str,
        cutoff: i64,
        replacement: &Message,
    ) -> Result<u64, HistoryError> {
        let removed = self.delete_before(session_id, cutoff).await?;
        self.append(
            session_id,
            replacement.role,
            &replacement.text,
            replacement.timestamp,
        )
        .await?;
        Ok(removed)
    }
}
