//! Incoming chat events.
//!
//! Every event from a chat source is a [`Message`]: a sending [`User`], the
//! room it happened in, and a closed [`MessageBody`] describing what kind of
//! event it was. The body enum is deliberately closed — routing works off the
//! explicit [`Category`] it maps to, never off open-ended type strings.
//!
//! A message also carries two flags shared by every derived view of it:
//!
//! - `done` — set by [`Message::finish`]; the only way a handler can suppress
//!   the remaining listeners of the dispatch pass.
//! - `command` — set by the router when the message was addressed to the bot
//!   and something matched. Informational; it never gates dispatch.
//!
//! Derived views (the address-stripped text the router hands to respond
//! listeners, or the catch-all wrapper) share the flags of their origin, so
//! finishing any view finishes the logical message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;

use crate::user::User;

/// Routing category of a message.
///
/// Listener collections are keyed by this enum. `Respond` is a listener
/// collection key only — no message ever reports it as its own category;
/// respond listeners are selected by the router's addressing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Chat text.
    Text,
    /// Chat text addressed to the bot (listener collection key only).
    Respond,
    /// Topic change notification.
    Topic,
    /// A user entered the room.
    Enter,
    /// A user left the room.
    Leave,
    /// Synthetic wrapper dispatched to last-resort listeners.
    CatchAll,
}

/// Payload of a message variant.
#[derive(Debug, Clone)]
pub enum MessageBody {
    /// Chat text with the source-assigned message id.
    Text {
        /// The raw text.
        text: String,
        /// Source-assigned message id.
        id: String,
    },
    /// Entrance notification.
    Enter,
    /// Exit notification.
    Leave,
    /// Topic change notification.
    Topic,
    /// Wraps an already-processed message for the catch-all pass.
    CatchAll(Arc<Message>),
}

/// An incoming event from the chat source.
///
/// Cloning is cheap and yields another view of the same logical message:
/// the `done` and `command` flags are shared between clones.
#[derive(Debug, Clone)]
pub struct Message {
    user: User,
    room: Option<String>,
    body: MessageBody,
    done: Arc<AtomicBool>,
    command: Arc<AtomicBool>,
}

impl Message {
    fn new(user: User, body: MessageBody) -> Self {
        Self {
            room: user.room.clone(),
            user,
            body,
            done: Arc::new(AtomicBool::new(false)),
            command: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a text message.
    pub fn text(user: User, text: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(
            user,
            MessageBody::Text {
                text: text.into(),
                id: id.into(),
            },
        )
    }

    /// Creates an entrance notification.
    pub fn enter(user: User) -> Self {
        Self::new(user, MessageBody::Enter)
    }

    /// Creates an exit notification.
    pub fn leave(user: User) -> Self {
        Self::new(user, MessageBody::Leave)
    }

    /// Creates a topic change notification.
    pub fn topic_change(user: User) -> Self {
        Self::new(user, MessageBody::Topic)
    }

    /// Wraps an already-processed message for the catch-all pass.
    ///
    /// The wrapper shares the inner message's flags, so finishing either
    /// stops the same dispatch pass.
    pub(crate) fn catch_all(inner: Arc<Message>) -> Self {
        Self {
            user: inner.user.clone(),
            room: inner.room.clone(),
            done: Arc::clone(&inner.done),
            command: Arc::clone(&inner.command),
            body: MessageBody::CatchAll(inner),
        }
    }

    /// Derives a text message with different text but shared flags.
    ///
    /// Used by the router to build the address-stripped view handed to
    /// respond listeners.
    pub(crate) fn with_text(&self, text: impl Into<String>) -> Self {
        let id = self.id().unwrap_or_default().to_string();
        Self {
            user: self.user.clone(),
            room: self.room.clone(),
            body: MessageBody::Text {
                text: text.into(),
                id,
            },
            done: Arc::clone(&self.done),
            command: Arc::clone(&self.command),
        }
    }

    /// The sending user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// The room the event happened in, when known.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// The message payload.
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// The text of a text body; `None` for every other variant.
    pub fn text_body(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The source-assigned id of a text body.
    pub fn id(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The routing category of this message.
    pub fn category(&self) -> Category {
        match &self.body {
            MessageBody::Text { .. } => Category::Text,
            MessageBody::Enter => Category::Enter,
            MessageBody::Leave => Category::Leave,
            MessageBody::Topic => Category::Topic,
            MessageBody::CatchAll(_) => Category::CatchAll,
        }
    }

    /// The wrapped original when this is a catch-all view.
    pub fn inner(&self) -> Option<&Arc<Message>> {
        match &self.body {
            MessageBody::CatchAll(inner) => Some(inner),
            _ => None,
        }
    }

    /// Marks the message done: no further listener is invoked on it in the
    /// current dispatch pass.
    pub fn finish(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Whether a handler has marked the message done.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_command(&self, command: bool) {
        self.command.store(command, Ordering::SeqCst);
    }

    /// Whether the message was addressed to the bot and matched something.
    pub fn is_command(&self) -> bool {
        self.command.load(Ordering::SeqCst)
    }

    /// Matches the given pattern against a text body.
    ///
    /// Non-text messages never match.
    pub fn match_pattern(&self, pattern: &Regex) -> Option<MatchCaptures> {
        self.text_body()
            .and_then(|text| pattern.captures(text))
            .map(|captures| MatchCaptures::from_captures(&captures))
    }
}

/// Owned capture groups from a pattern match.
///
/// `regex::Captures` borrows the haystack, so the groups are copied out
/// before the response is queued. Group 0 is the whole match.
#[derive(Debug, Clone, Default)]
pub struct MatchCaptures {
    groups: Vec<Option<String>>,
}

impl MatchCaptures {
    fn from_captures(captures: &regex::Captures<'_>) -> Self {
        Self {
            groups: captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// The capture group at `index`, when it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// The whole match (group 0).
    pub fn whole(&self) -> Option<&str> {
        self.get(0)
    }

    /// Number of groups, counting group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups were captured (always-true matchers).
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_user() -> User {
        User::new("1").named("Shell").in_room("Shell")
    }

    #[test]
    fn room_is_derived_from_user() {
        let message = Message::text(shell_user(), "hello", "m1");
        assert_eq!(message.room(), Some("Shell"));
        assert_eq!(message.category(), Category::Text);
    }

    #[test]
    fn finish_marks_done() {
        let message = Message::enter(shell_user());
        assert!(!message.is_done());
        message.finish();
        assert!(message.is_done());
    }

    #[test]
    fn derived_views_share_flags() {
        let message = Arc::new(Message::text(shell_user(), "Brobbot: deploy", "m2"));
        let stripped = message.with_text("deploy");
        stripped.finish();
        assert!(message.is_done());

        let wrapped = Message::catch_all(Arc::clone(&message));
        assert!(wrapped.is_done());
        assert_eq!(wrapped.category(), Category::CatchAll);
        assert_eq!(wrapped.inner().unwrap().text_body(), Some("Brobbot: deploy"));
    }

    #[test]
    fn pattern_match_captures_groups() {
        let message = Message::text(shell_user(), "deploy api to prod", "m3");
        let pattern = Regex::new(r"^deploy (\w+) to (\w+)$").unwrap();
        let captures = message.match_pattern(&pattern).unwrap();
        assert_eq!(captures.whole(), Some("deploy api to prod"));
        assert_eq!(captures.get(1), Some("api"));
        assert_eq!(captures.get(2), Some("prod"));
    }

    #[test]
    fn non_text_messages_never_match() {
        let pattern = Regex::new(".*").unwrap();
        assert!(Message::enter(shell_user()).match_pattern(&pattern).is_none());
        assert!(
            Message::topic_change(shell_user())
                .match_pattern(&pattern)
                .is_none()
        );
    }
}
