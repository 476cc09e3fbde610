//! Listeners: matcher + handler pairs with serialized execution.
//!
//! Every registered listener owns a private FIFO queue of pending
//! [`Response`]s and runs at most one handler invocation at a time.
//! Different listeners execute fully independently, so one slow handler
//! never stalls another listener's queue.
//!
//! # Queue discipline
//!
//! The queue is bounded at [`QUEUE_CAPACITY`] entries with a drop-oldest
//! overflow policy: the most recent pending triggers are preserved and the
//! oldest are silently discarded. Draining is an explicit worker loop — a
//! spawned task pulls responses one at a time — rather than a recursive
//! continuation chain, so deep queues cannot grow the call stack.
//!
//! # Synchronous settlement
//!
//! A handler future that completes on its first poll is settled inline,
//! before `process` returns. That makes a synchronous
//! [`finish`](Response::finish) visible to the router while it is still
//! walking the listener list for the same message.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, error, trace};

use crate::error::BoxError;
use crate::message::{MatchCaptures, Message};
use crate::response::{ChatHandle, Response};

/// Maximum number of pending responses per listener.
pub const QUEUE_CAPACITY: usize = 100;

/// What a handler invocation resolves to.
pub type HandlerResult = Result<(), BoxError>;

/// A boxed handler invocation in flight.
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// A type-erased handler.
pub type HandlerFn = Arc<dyn Fn(Response) -> HandlerFuture + Send + Sync>;

/// Fan-out target for handler failures (the router's error channel).
pub(crate) type ErrorSink = Arc<dyn Fn(&BoxError, &Message) + Send + Sync>;

/// Adapts an async closure into a [`HandlerFn`].
pub(crate) fn into_handler<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |response| -> HandlerFuture { Box::pin(handler(response)) })
}

/// How a listener decides whether a message interests it.
enum MatcherKind {
    /// Matches every message (presence, topic, and catch-all listeners).
    Always,
    /// Matches when the predicate passes.
    Predicate(Arc<dyn Fn(&Message) -> bool + Send + Sync>),
    /// Matches text bodies against a pattern; never matches other bodies.
    Pattern(Regex),
}

struct QueueState {
    queue: VecDeque<Response>,
    in_flight: bool,
}

struct ListenerInner {
    matcher: MatcherKind,
    handler: HandlerFn,
    state: Mutex<QueueState>,
    errors: ErrorSink,
    chat: ChatHandle,
}

/// A registered matcher + handler pair with its own execution queue.
///
/// Cloning is cheap and yields a handle to the same queue.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerInner>,
}

impl Listener {
    fn with_matcher(
        matcher: MatcherKind,
        handler: HandlerFn,
        errors: ErrorSink,
        chat: ChatHandle,
    ) -> Self {
        Self {
            inner: Arc::new(ListenerInner {
                matcher,
                handler,
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    in_flight: false,
                }),
                errors,
                chat,
            }),
        }
    }

    /// A listener that matches every message.
    pub(crate) fn always(handler: HandlerFn, errors: ErrorSink, chat: ChatHandle) -> Self {
        Self::with_matcher(MatcherKind::Always, handler, errors, chat)
    }

    /// A listener gated on a predicate over the message.
    pub(crate) fn predicate(
        predicate: impl Fn(&Message) -> bool + Send + Sync + 'static,
        handler: HandlerFn,
        errors: ErrorSink,
        chat: ChatHandle,
    ) -> Self {
        Self::with_matcher(
            MatcherKind::Predicate(Arc::new(predicate)),
            handler,
            errors,
            chat,
        )
    }

    /// A text listener: matches the pattern against text bodies only.
    pub(crate) fn text(
        pattern: Regex,
        handler: HandlerFn,
        errors: ErrorSink,
        chat: ChatHandle,
    ) -> Self {
        Self::with_matcher(MatcherKind::Pattern(pattern), handler, errors, chat)
    }

    /// Evaluates the matcher against `message`.
    ///
    /// Always-true and predicate matchers yield empty captures.
    pub fn matches(&self, message: &Message) -> Option<MatchCaptures> {
        match &self.inner.matcher {
            MatcherKind::Always => Some(MatchCaptures::default()),
            MatcherKind::Predicate(predicate) => {
                predicate(message).then(MatchCaptures::default)
            }
            MatcherKind::Pattern(pattern) => {
                let captures = message.match_pattern(pattern);
                if captures.is_some() {
                    debug!(pattern = %pattern, "message matched pattern");
                } else {
                    trace!(pattern = %pattern, "message did not match pattern");
                }
                captures
            }
        }
    }

    /// Builds and enqueues a response when the matcher passes.
    ///
    /// Returns false when the message did not match.
    pub fn process(&self, message: Arc<Message>) -> bool {
        let Some(captures) = self.matches(&message) else {
            return false;
        };
        self.enqueue(Response::new(message, captures, self.inner.chat.clone()));
        true
    }

    /// Queues a response, or executes it immediately when idle.
    fn enqueue(&self, response: Response) {
        let run_now = {
            let mut state = self.inner.state.lock();
            if state.in_flight || !state.queue.is_empty() {
                if state.queue.len() >= QUEUE_CAPACITY {
                    state.queue.pop_front();
                    debug!("listener queue full, dropping oldest pending response");
                }
                state.queue.push_back(response);
                None
            } else {
                state.in_flight = true;
                Some(response)
            }
        };
        if let Some(response) = run_now {
            self.exec(response);
        }
    }

    /// Runs responses until the handler suspends or the queue is dry.
    ///
    /// The first poll happens inline with a noop waker: a handler that
    /// completes without suspending settles synchronously. A pending
    /// future is moved into a spawned task that finishes it and then
    /// drains the queue.
    fn exec(&self, mut response: Response) {
        loop {
            let message = Arc::clone(response.message());
            let mut future = (self.inner.handler)(response);
            let mut cx = Context::from_waker(noop_waker_ref());
            match future.as_mut().poll(&mut cx) {
                Poll::Ready(result) => {
                    self.settle(result, &message);
                    match self.next_or_idle() {
                        Some(next) => response = next,
                        None => return,
                    }
                }
                Poll::Pending => {
                    let listener = self.clone();
                    tokio::spawn(async move {
                        let result = future.await;
                        listener.settle(result, &message);
                        listener.drain().await;
                    });
                    return;
                }
            }
        }
    }

    /// Worker loop: runs queued responses to completion, one at a time.
    async fn drain(&self) {
        while let Some(response) = self.next_or_idle() {
            let message = Arc::clone(response.message());
            let result = (self.inner.handler)(response).await;
            self.settle(result, &message);
        }
    }

    /// Pops the next pending response, or clears the in-flight flag.
    fn next_or_idle(&self) -> Option<Response> {
        let mut state = self.inner.state.lock();
        let next = state.queue.pop_front();
        if next.is_none() {
            state.in_flight = false;
        }
        next
    }

    /// Uniform settlement for success and failure: failures are logged and
    /// surfaced to the error channel, and never stop the queue.
    fn settle(&self, result: HandlerResult, message: &Message) {
        if let Err(err) = result {
            error!(error = %err, "listener handler failed");
            (self.inner.errors)(&err, message);
        }
    }

    /// Number of pending responses (excluding the one in flight).
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;
    use parking_lot::Mutex as SyncMutex;
    use std::time::Duration;
    use tokio::sync::watch;

    fn noop_errors() -> ErrorSink {
        Arc::new(|_, _| {})
    }

    fn text_message(text: &str) -> Arc<Message> {
        Arc::new(Message::text(User::new("1").named("tester"), text, "id"))
    }

    /// Polls until `check` passes or a generous deadline expires.
    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..500 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn pattern_matcher_ignores_non_text() {
        let listener = Listener::text(
            Regex::new(".*").unwrap(),
            into_handler(|_| async { Ok(()) }),
            noop_errors(),
            ChatHandle::new(),
        );
        let enter = Arc::new(Message::enter(User::new("1")));
        assert!(!listener.process(enter));
        assert!(listener.process(text_message("anything")));
    }

    #[tokio::test]
    async fn predicate_matcher_gates_processing() {
        let listener = Listener::predicate(
            |message| message.room() == Some("ops"),
            into_handler(|_| async { Ok(()) }),
            noop_errors(),
            ChatHandle::new(),
        );
        let outside = Arc::new(Message::enter(User::new("1").in_room("general")));
        let inside = Arc::new(Message::enter(User::new("1").in_room("ops")));
        assert!(!listener.process(outside));
        assert!(listener.process(inside));
    }

    #[tokio::test]
    async fn synchronous_handlers_settle_before_process_returns() {
        let log = Arc::new(SyncMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let listener = Listener::always(
            into_handler(move |response: Response| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock()
                        .push(response.message().text_body().unwrap_or("").to_string());
                    response.finish();
                    Ok(())
                }
            }),
            noop_errors(),
            ChatHandle::new(),
        );

        let message = text_message("first");
        listener.process(Arc::clone(&message));
        // No awaits in the handler: it ran to completion inline.
        assert_eq!(log.lock().as_slice(), ["first"]);
        assert!(message.is_done());
    }

    #[tokio::test]
    async fn fifo_order_with_single_flight() {
        let log = Arc::new(SyncMutex::new(Vec::new()));
        let (release, released) = watch::channel(false);

        let sink = Arc::clone(&log);
        let listener = Listener::always(
            into_handler(move |response: Response| {
                let sink = Arc::clone(&sink);
                let mut released = released.clone();
                async move {
                    let _ = released.wait_for(|go| *go).await;
                    sink.lock()
                        .push(response.message().text_body().unwrap_or("").to_string());
                    Ok(())
                }
            }),
            noop_errors(),
            ChatHandle::new(),
        );

        for index in 0..5 {
            listener.process(text_message(&format!("msg-{index}")));
        }
        assert_eq!(log.lock().len(), 0, "all handlers blocked on the gate");
        assert_eq!(listener.pending(), 4);

        release.send(true).unwrap();
        let probe = Arc::clone(&log);
        wait_until(move || probe.lock().len() == 5).await;

        let expected: Vec<String> = (0..5).map(|index| format!("msg-{index}")).collect();
        assert_eq!(*log.lock(), expected);
    }

    #[tokio::test]
    async fn overflow_drops_the_oldest_pending_response() {
        let log = Arc::new(SyncMutex::new(Vec::new()));
        let (release, released) = watch::channel(false);

        let sink = Arc::clone(&log);
        let listener = Listener::always(
            into_handler(move |response: Response| {
                let sink = Arc::clone(&sink);
                let mut released = released.clone();
                async move {
                    let _ = released.wait_for(|go| *go).await;
                    sink.lock()
                        .push(response.message().text_body().unwrap_or("").to_string());
                    Ok(())
                }
            }),
            noop_errors(),
            ChatHandle::new(),
        );

        // "blocker" goes in flight; msg-1..=msg-100 fill the queue; msg-101
        // overflows it, discarding msg-1.
        listener.process(text_message("blocker"));
        for index in 1..=101 {
            listener.process(text_message(&format!("msg-{index}")));
        }
        assert_eq!(listener.pending(), QUEUE_CAPACITY);

        release.send(true).unwrap();
        let probe = Arc::clone(&log);
        wait_until(move || probe.lock().len() == 101).await;

        let log = log.lock();
        assert_eq!(log[0], "blocker");
        assert_eq!(log[1], "msg-2");
        assert_eq!(log[100], "msg-101");
        assert!(!log.iter().any(|entry| entry == "msg-1"));
    }

    #[tokio::test]
    async fn failures_surface_and_do_not_stall_the_queue() {
        let log = Arc::new(SyncMutex::new(Vec::new()));
        let failures = Arc::new(SyncMutex::new(Vec::new()));
        let (release, released) = watch::channel(false);

        let failure_sink = Arc::clone(&failures);
        let errors: ErrorSink = Arc::new(move |err, _message| {
            failure_sink.lock().push(err.to_string());
        });

        let sink = Arc::clone(&log);
        let listener = Listener::always(
            into_handler(move |response: Response| {
                let sink = Arc::clone(&sink);
                let mut released = released.clone();
                async move {
                    let _ = released.wait_for(|go| *go).await;
                    let text = response.message().text_body().unwrap_or("").to_string();
                    sink.lock().push(text.clone());
                    if text == "bad" {
                        return Err("boom".into());
                    }
                    Ok(())
                }
            }),
            errors,
            ChatHandle::new(),
        );

        for text in ["good-1", "bad", "good-2"] {
            listener.process(text_message(text));
        }
        release.send(true).unwrap();

        let probe = Arc::clone(&log);
        wait_until(move || probe.lock().len() == 3).await;
        assert_eq!(*log.lock(), ["good-1", "bad", "good-2"]);
        assert_eq!(*failures.lock(), ["boom"]);
    }
}
