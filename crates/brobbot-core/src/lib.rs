//! # Brobbot Core
//!
//! The core engine of the Brobbot chat framework: message routing with
//! per-listener serialized execution, and a namespaced structured
//! key-value store.
//!
//! ## Architecture
//!
//! Everything flows through the central [`Robot`]:
//!
//! ```text
//! ┌─────────────┐     ┌─────────┐     ┌──────────────────┐
//! │   Adapter   │────▶│  Robot  │────▶│ Listener (queue) │──▶ handler
//! │ (shell, ...)│     │ (router)│────▶│ Listener (queue) │──▶ handler
//! └─────────────┘     └─────────┘────▶│ Listener (queue) │──▶ handler
//!        ▲                            └──────────────────┘      │
//!        └──────────────── send / reply / topic ────────────────┘
//! ```
//!
//! - [`Message`]: one incoming event (text, presence, topic change) with
//!   the sending [`User`] and the shared done/command flags.
//! - [`Robot`]: addressing detection, listener matching, and ordered
//!   dispatch, gated on a readiness signal.
//! - [`Listener`]: a matcher + handler pair with a bounded drop-oldest
//!   queue and at most one handler invocation in flight.
//! - [`Brain`]: scalar/list/set/hash storage under composable namespace
//!   prefixes ([`BrainSegment`]), with a serialize/deserialize seam for
//!   pluggable backends. [`MemoryBrain`] is the volatile default.
//! - [`Adapter`] and [`Script`]: the seams for transports and handler
//!   providers, implemented outside the core.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use brobbot_core::{MemoryBrain, Message, Robot, User};
//! use regex::Regex;
//!
//! #[tokio::main]
//! async fn main() {
//!     let robot = Arc::new(Robot::new("Brobbot", None, Arc::new(MemoryBrain::new())));
//!
//!     robot.respond(Regex::new("(?i)^ping$").unwrap(), |res| async move {
//!         res.send("PONG").await?;
//!         Ok(())
//!     });
//!
//!     robot.mark_ready();
//!     let user = User::new("1").named("Shell");
//!     robot.receive(Message::text(user, "Brobbot: ping", "m1")).await;
//! }
//! ```

pub mod adapter;
pub mod brain;
pub mod error;
pub mod listener;
pub mod message;
pub mod response;
pub mod robot;
pub mod script;
pub mod user;

pub use adapter::{Adapter, BoxedAdapter, Envelope};
pub use brain::{Brain, BrainSegment, MemoryBrain, Placement, segment};
pub use error::{
    AdapterError, AdapterResult, BoxError, EntryKind, ScriptError, StoreError, StoreResult,
};
pub use listener::{HandlerFn, HandlerFuture, HandlerResult, Listener, QUEUE_CAPACITY};
pub use message::{Category, MatchCaptures, Message, MessageBody};
pub use response::Response;
pub use robot::{ErrorHandler, Robot, RobotSegment};
pub use script::Script;
pub use user::{User, UserOptions};

/// Prelude for common imports.
pub mod prelude {
    pub use super::adapter::{Adapter, Envelope};
    pub use super::brain::{Brain, MemoryBrain, Placement};
    pub use super::error::{AdapterResult, BoxError, ScriptError, StoreResult};
    pub use super::listener::HandlerResult;
    pub use super::message::{Category, Message, MessageBody};
    pub use super::response::Response;
    pub use super::robot::{Robot, RobotSegment};
    pub use super::script::Script;
    pub use super::user::{User, UserOptions};
}
