//! Mode router
//!
//! The per-user state machine. Takes an inbound event, updates the user's
//! record under that user's lock, and returns the replies to send. Poster
//! lookups run after the lock is released so a slow storefront never
//! blocks other events.

use crate::poster::PosterResolver;
use crate::state::{Mode, UserId, UserRecord, UserStateStore};
use crate::views::{DefaultModeView, ModeView};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phrase answered with the affectionate reply (compared case-folded)
pub const AFFECTION_PHRASE: &str = "i love u";

/// Event delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// First-contact command (`/start`)
    Start,
    /// Mode button pressed; carries the raw callback tag
    SelectMode(String),
    /// Free-text message
    Text(String),
}

/// Transport-neutral outbound reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text message
    Text(String),
    /// Text with the mode-selection buttons
    ModePrompt(String),
    /// Text with a single external link button
    LinkPrompt {
        /// Message text
        text: String,
        /// Link target
        url: String,
    },
    /// Photo sent by URL
    Photo {
        /// Absolute image URL
        url: String,
        /// Photo caption
        caption: String,
    },
    /// Acknowledgment of a mode button press
    Ack(String),
}

/// Outcome of the locked part of a transition
enum Step {
    Done(Vec<Reply>),
    Lookup(String),
}

/// Is `text` the affection phrase, ignoring case and surrounding whitespace?
#[must_use]
pub fn is_affection_phrase(text: &str) -> bool {
    text.trim().to_lowercase() == AFFECTION_PHRASE
}

/// Routes events through the per-user mode state machine
pub struct ModeRouter<V = DefaultModeView> {
    store: Arc<UserStateStore>,
    resolver: Arc<dyn PosterResolver>,
    link_url: String,
    _view: PhantomData<fn() -> V>,
}

impl ModeRouter {
    /// Create a router with the default texts
    #[must_use]
    pub fn new(
        store: Arc<UserStateStore>,
        resolver: Arc<dyn PosterResolver>,
        link_url: impl Into<String>,
    ) -> Self {
        Self::with_view(store, resolver, link_url)
    }
}

impl<V: ModeView> ModeRouter<V> {
    /// Create a router rendering its texts with `V`
    #[must_use]
    pub fn with_view(
        store: Arc<UserStateStore>,
        resolver: Arc<dyn PosterResolver>,
        link_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            resolver,
            link_url: link_url.into(),
            _view: PhantomData,
        }
    }

    /// The state store this router updates
    #[must_use]
    pub const fn store(&self) -> &Arc<UserStateStore> {
        &self.store
    }

    /// Handle one event for `user_id` and return the replies, in send order.
    ///
    /// Text that is empty after trimming is ignored: no reply, no state change.
    pub async fn handle(&self, user_id: UserId, inbound: Inbound) -> Vec<Reply> {
        if matches!(&inbound, Inbound::Text(text) if text.trim().is_empty()) {
            debug!(user_id, "Ignoring event without text");
            return Vec::new();
        }

        let link_url = &self.link_url;
        let step = self
            .store
            .update(user_id, |record| Self::transition(record, inbound, link_url))
            .await;

        match step {
            Step::Done(replies) => replies,
            Step::Lookup(app_name) => self.lookup(user_id, &app_name).await,
        }
    }

    fn transition(record: &mut UserRecord, inbound: Inbound, link_url: &str) -> Step {
        let user_id = record.user_id;

        if !record.started {
            record.started = true;
            record.mode = Mode::default();
            info!(user_id, "New user started");
            return Step::Done(vec![
                Reply::Text(V::greeting().to_string()),
                Reply::ModePrompt(V::choose_mode().to_string()),
            ]);
        }

        match inbound {
            Inbound::Start => Step::Done(vec![Reply::ModePrompt(
                V::already_started().to_string(),
            )]),
            Inbound::SelectMode(tag) => match tag.parse::<Mode>() {
                Ok(mode) => {
                    info!(user_id, from = ?record.mode, to = ?mode, "Mode switched");
                    record.mode = mode;
                    Step::Done(vec![
                        Reply::Ack(V::mode_switched(mode)),
                        Reply::ModePrompt(V::current_mode(mode)),
                    ])
                }
                Err(e) => {
                    warn!(user_id, "Rejected mode selection: {e}");
                    Step::Done(vec![Reply::Ack(V::unknown_mode().to_string())])
                }
            },
            Inbound::Text(text) => match record.mode {
                Mode::Affection if is_affection_phrase(&text) => {
                    Step::Done(vec![Reply::Text(V::affection_reply().to_string())])
                }
                Mode::Affection => Step::Done(vec![Reply::LinkPrompt {
                    text: V::link_prompt().to_string(),
                    url: link_url.to_string(),
                }]),
                Mode::PosterLookup => Step::Lookup(text.trim().to_string()),
            },
        }
    }

    async fn lookup(&self, user_id: UserId, app_name: &str) -> Vec<Reply> {
        info!(user_id, app = %app_name, "Poster lookup");

        let first = match self.resolver.resolve(app_name).await {
            Some(url) => Reply::Photo {
                url,
                caption: V::poster_caption(app_name),
            },
            None => Reply::Text(V::poster_not_found(app_name)),
        };

        // The user may have switched modes while the lookup was in flight
        let mode = self.store.get_or_init(user_id).await.mode;
        vec![first, Reply::ModePrompt(V::current_mode(mode))]
    }
}
