//! The router.
//!
//! A [`Robot`] owns the listener collections, decides which listeners are
//! interested in an incoming message, and delegates execution to the
//! matched listeners' queues. Dispatch decisions run on the caller's task;
//! only handler execution is spawned, so the order in which listeners are
//! *enqueued* is deterministic while completion order across listeners is
//! not.
//!
//! # Addressing
//!
//! A text message is "addressed to the bot" when it starts with the bot's
//! name or configured alias (`"Brobbot: hello"`, `"@Brobbot hello"`).
//! Addressed messages additionally consult the respond listeners, which see
//! the message with the address prefix chopped off — respond patterns are
//! written without the bot name.
//!
//! # Dispatch order
//!
//! Matched respond listeners run first (they are the more specific match),
//! then the listeners of the message's own category, then every catch-all
//! listener. A message marked done by any earlier handler in the pass stops
//! the iteration.

use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tokio::sync::watch;
use tracing::{Level, debug, span};

use crate::adapter::{Adapter, Envelope};
use crate::brain::Brain;
use crate::error::{AdapterResult, BoxError};
use crate::listener::{ErrorSink, HandlerFn, HandlerResult, Listener, into_handler};
use crate::message::{Category, Message};
use crate::response::{ChatHandle, Response};

/// Callback observing handler failures.
pub type ErrorHandler = Box<dyn Fn(&BoxError, &Message) + Send + Sync>;

/// Listener collections keyed by routing category.
#[derive(Default)]
struct ListenerSet {
    text: Vec<Listener>,
    respond: Vec<Listener>,
    topic: Vec<Listener>,
    enter: Vec<Listener>,
    leave: Vec<Listener>,
    catchall: Vec<Listener>,
}

impl ListenerSet {
    fn for_category(&self, category: Category) -> &[Listener] {
        match category {
            Category::Text => &self.text,
            Category::Respond => &self.respond,
            Category::Topic => &self.topic,
            Category::Enter => &self.enter,
            Category::Leave => &self.leave,
            Category::CatchAll => &self.catchall,
        }
    }
}

struct HelpCommand {
    command: String,
    description: String,
}

/// Builds the addressing pattern for a name: optional leading whitespace,
/// optional `@`, the name, optional `:`, then at least one space.
fn address_pattern(name: &str) -> Regex {
    // The escaped literal cannot invalidate the surrounding pattern.
    Regex::new(&format!(r"(?i)^\s*@?{}:?\s+", regex::escape(name)))
        .expect("address pattern is valid for any escaped name")
}

/// The message router: listener registry, addressing detection, and
/// ordered dispatch.
///
/// Registration happens during an initialization phase; `receive` waits on
/// the readiness gate until the orchestrating runtime calls
/// [`mark_ready`](Robot::mark_ready).
pub struct Robot {
    name: String,
    alias: Option<String>,
    name_pattern: Regex,
    alias_pattern: Option<Regex>,
    brain: Arc<dyn Brain>,
    listeners: RwLock<ListenerSet>,
    error_handlers: Arc<RwLock<Vec<ErrorHandler>>>,
    commands: RwLock<Vec<HelpCommand>>,
    chat: ChatHandle,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl Robot {
    /// Creates a robot with the given name, optional alias, and brain.
    pub fn new(name: impl Into<String>, alias: Option<String>, brain: Arc<dyn Brain>) -> Self {
        let name = name.into();
        let name_pattern = address_pattern(&name);
        let alias_pattern = alias.as_deref().map(address_pattern);
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            name,
            alias,
            name_pattern,
            alias_pattern,
            brain,
            listeners: RwLock::new(ListenerSet::default()),
            error_handlers: Arc::new(RwLock::new(Vec::new())),
            commands: RwLock::new(Vec::new()),
            chat: ChatHandle::new(),
            ready_tx,
            ready_rx,
        }
    }

    /// The bot's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bot's alias, when configured.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The root brain.
    pub fn brain(&self) -> &Arc<dyn Brain> {
        &self.brain
    }

    // ------------------------------------------------------------------
    // Registration (initialization phase)
    // ------------------------------------------------------------------

    /// Adds a listener matching any text message against `pattern`.
    pub fn hear<F, Fut>(&self, pattern: Regex, handler: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let listener = Listener::text(
            pattern,
            into_handler(handler),
            self.error_sink(),
            self.chat.clone(),
        );
        self.listeners.write().text.push(listener);
    }

    /// Adds a listener matching messages addressed to the bot. The pattern
    /// is applied to the text with the address prefix stripped.
    pub fn respond<F, Fut>(&self, pattern: Regex, handler: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let listener = Listener::text(
            pattern,
            into_handler(handler),
            self.error_sink(),
            self.chat.clone(),
        );
        self.listeners.write().respond.push(listener);
    }

    /// Adds a listener triggered when anyone enters the room.
    pub fn enter<F, Fut>(&self, handler: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let listener =
            Listener::always(into_handler(handler), self.error_sink(), self.chat.clone());
        self.listeners.write().enter.push(listener);
    }

    /// Adds a listener triggered when anyone leaves the room.
    pub fn leave<F, Fut>(&self, handler: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let listener =
            Listener::always(into_handler(handler), self.error_sink(), self.chat.clone());
        self.listeners.write().leave.push(listener);
    }

    /// Adds a listener triggered when anyone changes the topic.
    pub fn topic<F, Fut>(&self, handler: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let listener =
            Listener::always(into_handler(handler), self.error_sink(), self.chat.clone());
        self.listeners.write().topic.push(listener);
    }

    /// Adds a last-resort listener, invoked when no earlier listener marked
    /// the message done. The handler receives the original message, not
    /// the catch-all wrapper.
    pub fn catch_all<F, Fut>(&self, handler: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler = into_handler(handler);
        let unwrapping: HandlerFn =
            Arc::new(move |response: Response| handler(response.unwrap_catch_all()));
        let listener = Listener::always(unwrapping, self.error_sink(), self.chat.clone());
        self.listeners.write().catchall.push(listener);
    }

    /// Adds a callback observing handler failures.
    ///
    /// This is the explicit error channel: failures stay local to the
    /// failing listener's queue and are fanned out here for the host to
    /// log, count, or page on.
    pub fn on_error(&self, handler: impl Fn(&BoxError, &Message) + Send + Sync + 'static) {
        self.error_handlers.write().push(Box::new(handler));
    }

    fn error_sink(&self) -> ErrorSink {
        let handlers = Arc::clone(&self.error_handlers);
        Arc::new(move |err, message| {
            for handler in handlers.read().iter() {
                handler(err, message);
            }
        })
    }

    /// Registers a help entry for the command listing.
    pub fn help_command(&self, command: impl Into<String>, description: impl Into<String>) {
        self.commands.write().push(HelpCommand {
            command: command.into(),
            description: description.into(),
        });
    }

    /// All registered help entries, formatted.
    pub fn help_commands(&self) -> Vec<String> {
        self.commands
            .read()
            .iter()
            .map(|entry| format!("{} - {}", entry.command, entry.description))
            .collect()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Connects the adapter the delegated chat operations route through.
    pub fn attach_adapter(&self, adapter: Arc<dyn Adapter>) {
        self.chat.install(adapter);
    }

    /// Opens the receive gate. Called by the orchestrating runtime once
    /// the store and every handler provider reported ready.
    pub fn mark_ready(&self) {
        let _ = self.ready_tx.send(true);
    }

    /// Whether the receive gate is open.
    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Whether the message is addressed to the bot by name or alias.
    pub fn addressed(&self, message: &Message) -> bool {
        match message.text_body() {
            Some(text) => {
                self.name_pattern.is_match(text)
                    || self
                        .alias_pattern
                        .as_ref()
                        .is_some_and(|pattern| pattern.is_match(text))
            }
            None => false,
        }
    }

    /// Derives the message with the bot's name or alias chopped off.
    fn strip_address(&self, message: &Message) -> Arc<Message> {
        let text = message.text_body().unwrap_or_default();
        let stripped = self.name_pattern.replace(text, "");
        let stripped = match &self.alias_pattern {
            Some(pattern) => pattern.replace(&stripped, "").into_owned(),
            None => stripped.into_owned(),
        };
        Arc::new(message.with_text(stripped))
    }

    /// Passes the message to every interested listener.
    ///
    /// Waits for the readiness gate, then: selects the listeners of the
    /// message's category, selects respond listeners against the stripped
    /// text when the message is addressed, flags the message as a command
    /// when addressed-and-matched, and invokes `process` in order —
    /// respond, category, catch-all — stopping as soon as the message is
    /// marked done. The returned future completes when the pass is over;
    /// handler completion is not awaited.
    pub async fn receive(&self, message: Message) {
        let mut ready = self.ready_rx.clone();
        let _ = ready.wait_for(|ready| *ready).await;

        let message = Arc::new(message);
        let span = span!(Level::DEBUG, "receive", category = ?message.category());
        let _enter = span.enter();

        let addressed = self.addressed(&message);

        let listeners = self.listeners.read();
        let matched: Vec<Listener> = listeners
            .for_category(message.category())
            .iter()
            .filter(|listener| listener.matches(&message).is_some())
            .cloned()
            .collect();

        let (respond_message, matched_respond) = if addressed {
            let stripped = self.strip_address(&message);
            let matched_respond: Vec<Listener> = listeners
                .respond
                .iter()
                .filter(|listener| listener.matches(&stripped).is_some())
                .cloned()
                .collect();
            (Some(stripped), matched_respond)
        } else {
            (None, Vec::new())
        };
        let catchall = listeners.catchall.to_vec();
        drop(listeners);

        message.mark_command(addressed && !(matched.is_empty() && matched_respond.is_empty()));

        debug!(
            addressed,
            matched = matched.len(),
            respond = matched_respond.len(),
            "dispatching"
        );

        if let Some(stripped) = respond_message {
            for listener in &matched_respond {
                if message.is_done() {
                    return;
                }
                listener.process(Arc::clone(&stripped));
            }
        }
        for listener in &matched {
            if message.is_done() {
                return;
            }
            listener.process(Arc::clone(&message));
        }
        if !catchall.is_empty() {
            let wrapped = Arc::new(Message::catch_all(Arc::clone(&message)));
            for listener in &catchall {
                if message.is_done() {
                    return;
                }
                listener.process(Arc::clone(&wrapped));
            }
        }
    }

    // ------------------------------------------------------------------
    // Delegated chat operations
    // ------------------------------------------------------------------

    /// Sends message strings through the adapter.
    pub async fn send(&self, envelope: &Envelope, texts: &[String]) -> AdapterResult<()> {
        self.chat.send(envelope, texts).await
    }

    /// Sends replies through the adapter.
    pub async fn reply(&self, envelope: &Envelope, texts: &[String]) -> AdapterResult<()> {
        self.chat.reply(envelope, texts).await
    }

    /// Messages a room directly.
    pub async fn message_room(&self, room: &str, texts: &[String]) -> AdapterResult<()> {
        self.chat.send(&Envelope::for_room(room), texts).await
    }

    /// Returns a registration facade whose brain is the correspondingly
    /// named segment. Scripts receive one of these so their keys cannot
    /// collide.
    pub fn segment(self: &Arc<Self>, name: &str) -> RobotSegment {
        RobotSegment {
            brain: crate::brain::segment(&self.brain, name),
            robot: Arc::clone(self),
        }
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// A namespaced view of a [`Robot`].
///
/// Derefs to the underlying robot, so all registration and chat operations
/// are available directly; the inherent [`brain`](RobotSegment::brain)
/// accessor shadows [`Robot::brain`] with the namespaced segment.
#[derive(Clone)]
pub struct RobotSegment {
    robot: Arc<Robot>,
    brain: Arc<dyn Brain>,
}

impl RobotSegment {
    /// The namespaced brain segment.
    pub fn brain(&self) -> &Arc<dyn Brain> {
        &self.brain
    }

    /// The underlying shared robot.
    pub fn robot(&self) -> &Arc<Robot> {
        &self.robot
    }
}

impl std::ops::Deref for RobotSegment {
    type Target = Robot;

    fn deref(&self) -> &Robot {
        &self.robot
    }
}
