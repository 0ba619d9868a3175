//! Per-user state store
//!
//! Tracks whether a user has been greeted and which mode they are in.
//! Records are created lazily on the first observed event and live for the
//! whole process; nothing is persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Telegram user identifier
pub type UserId = i64;

/// Message-handling behavior selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Canned affectionate replies and the external link prompt
    #[default]
    Affection,
    /// App name in, storefront poster out
    PosterLookup,
}

/// All modes, in the order they are offered to the user.
pub const ALL_MODES: [Mode; 2] = [Mode::Affection, Mode::PosterLookup];

impl Mode {
    /// Tag carried in inline button callback data
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Mode::Affection => "love",
            Mode::PosterLookup => "playstore",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Mode::Affection => "I Love U",
            Mode::PosterLookup => "Play Store",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A mode tag that does not name any [`Mode`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode tag: {0:?}")]
pub struct UnknownModeTag(pub String);

impl FromStr for Mode {
    type Err = UnknownModeTag;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ALL_MODES
            .into_iter()
            .find(|mode| mode.tag() == tag)
            .ok_or_else(|| UnknownModeTag(tag.to_string()))
    }
}

/// State kept for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Owner of the record
    pub user_id: UserId,
    /// First-contact flow completed
    pub started: bool,
    /// Active mode
    pub mode: Mode,
}

impl UserRecord {
    /// A record for a user that has not been greeted yet
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            started: false,
            mode: Mode::default(),
        }
    }
}

/// In-memory store of [`UserRecord`]s.
///
/// The map lock is held only long enough to find or insert a user's slot.
/// Each slot has its own mutex, so updates for one user are applied in
/// arrival order while different users never wait on each other.
#[derive(Default)]
pub struct UserStateStore {
    users: RwLock<HashMap<UserId, Arc<Mutex<UserRecord>>>>,
}

impl UserStateStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, user_id: UserId) -> Arc<Mutex<UserRecord>> {
        {
            let users = self.users.read().await;
            if let Some(slot) = users.get(&user_id) {
                return slot.clone();
            }
        }

        let mut users = self.users.write().await;
        users
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserRecord::new(user_id))))
            .clone()
    }

    /// Snapshot of the user's record, creating it if absent
    pub async fn get_or_init(&self, user_id: UserId) -> UserRecord {
        self.update(user_id, |record| record.clone()).await
    }

    /// Mark the first-contact flow as done. Idempotent.
    pub async fn mark_started(&self, user_id: UserId) {
        self.update(user_id, |record| record.started = true).await;
    }

    /// Overwrite the user's mode
    pub async fn set_mode(&self, user_id: UserId, mode: Mode) {
        self.update(user_id, |record| record.mode = mode).await;
    }

    /// Run `f` over the user's record inside that user's critical section.
    ///
    /// `f` is synchronous, so nothing can await while the lock is held.
    pub async fn update<R>(&self, user_id: UserId, f: impl FnOnce(&mut UserRecord) -> R) -> R {
        let slot = self.slot(user_id).await;
        let mut record = slot.lock().await;
        f(&mut record)
    }

    /// Number of users seen since process start
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// `true` if no user has been seen yet
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
