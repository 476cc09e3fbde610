//! Handler execution context.
//!
//! A [`Response`] is what a handler receives when its listener matched: the
//! message, the captured groups, and the delegated chat operations. Send,
//! reply, topic, and emote all route through the adapter the router was
//! connected to; the core never talks to the chat source directly.

use std::sync::{Arc, OnceLock};

use rand::Rng;
use tracing::warn;

use crate::adapter::{Adapter, Envelope};
use crate::error::AdapterResult;
use crate::message::{MatchCaptures, Message};
use crate::user::User;

/// Shared slot holding the adapter once the transport is connected.
///
/// Listeners capture a clone at registration time; the router installs the
/// adapter before opening its receive gate, so by the time a handler runs
/// the slot is populated.
#[derive(Clone, Default)]
pub(crate) struct ChatHandle {
    adapter: Arc<OnceLock<Arc<dyn Adapter>>>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Installs the adapter. Later installs are ignored.
    pub(crate) fn install(&self, adapter: Arc<dyn Adapter>) {
        if self.adapter.set(adapter).is_err() {
            warn!("adapter already attached, ignoring replacement");
        }
    }

    fn adapter(&self) -> Option<&Arc<dyn Adapter>> {
        let adapter = self.adapter.get();
        if adapter.is_none() {
            warn!("no adapter attached, dropping outgoing operation");
        }
        adapter
    }

    pub(crate) async fn send(
        &self,
        envelope: &Envelope,
        strings: &[String],
    ) -> AdapterResult<()> {
        match self.adapter() {
            Some(adapter) => adapter.send(envelope, strings).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn reply(
        &self,
        envelope: &Envelope,
        strings: &[String],
    ) -> AdapterResult<()> {
        match self.adapter() {
            Some(adapter) => adapter.reply(envelope, strings).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn topic(
        &self,
        envelope: &Envelope,
        strings: &[String],
    ) -> AdapterResult<()> {
        match self.adapter() {
            Some(adapter) => adapter.topic(envelope, strings).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn emote(
        &self,
        envelope: &Envelope,
        strings: &[String],
    ) -> AdapterResult<()> {
        match self.adapter() {
            Some(adapter) => adapter.emote(envelope, strings).await,
            None => Ok(()),
        }
    }
}

/// Context handed to a handler whose listener matched a message.
#[derive(Clone)]
pub struct Response {
    message: Arc<Message>,
    captures: MatchCaptures,
    chat: ChatHandle,
}

impl Response {
    pub(crate) fn new(message: Arc<Message>, captures: MatchCaptures, chat: ChatHandle) -> Self {
        Self {
            message,
            captures,
            chat,
        }
    }

    /// Rebuilds the response around the wrapped original when the message
    /// is a catch-all view; otherwise returns self unchanged.
    pub(crate) fn unwrap_catch_all(self) -> Self {
        let inner = self.message.inner().cloned();
        match inner {
            Some(inner) => Self {
                message: inner,
                captures: self.captures,
                chat: self.chat,
            },
            None => self,
        }
    }

    /// The matched message.
    pub fn message(&self) -> &Arc<Message> {
        &self.message
    }

    /// The sending user.
    pub fn user(&self) -> &User {
        self.message.user()
    }

    /// The capture groups produced by the matcher. Empty for always-true
    /// and predicate matchers.
    pub fn captures(&self) -> &MatchCaptures {
        &self.captures
    }

    /// Shorthand for capture group `index`.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index)
    }

    /// The addressing envelope for outgoing operations on this message.
    pub fn envelope(&self) -> Envelope {
        Envelope::for_user(self.message.user())
    }

    /// Sends a message back to the room the message came from.
    pub async fn send(&self, text: impl Into<String>) -> AdapterResult<()> {
        self.send_all(vec![text.into()]).await
    }

    /// Sends several messages back in order.
    pub async fn send_all(&self, texts: Vec<String>) -> AdapterResult<()> {
        self.chat.send(&self.envelope(), &texts).await
    }

    /// Replies, addressed at the sending user.
    pub async fn reply(&self, text: impl Into<String>) -> AdapterResult<()> {
        self.reply_all(vec![text.into()]).await
    }

    /// Sends several replies in order.
    pub async fn reply_all(&self, texts: Vec<String>) -> AdapterResult<()> {
        self.chat.reply(&self.envelope(), &texts).await
    }

    /// Sets the room topic.
    pub async fn topic(&self, text: impl Into<String>) -> AdapterResult<()> {
        self.chat.topic(&self.envelope(), &[text.into()]).await
    }

    /// Sends an emote.
    pub async fn emote(&self, text: impl Into<String>) -> AdapterResult<()> {
        self.chat.emote(&self.envelope(), &[text.into()]).await
    }

    /// Picks a uniformly random element, for variety in canned replies.
    pub fn random<'a, T>(&self, choices: &'a [T]) -> Option<&'a T> {
        if choices.is_empty() {
            None
        } else {
            choices.get(rand::rng().random_range(0..choices.len()))
        }
    }

    /// Marks the message done so no later listener in the current dispatch
    /// pass is invoked.
    pub fn finish(&self) {
        self.message.finish();
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("category", &self.message.category())
            .field("captures", &self.captures.len())
            .finish()
    }
}
