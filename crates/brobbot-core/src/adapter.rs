//! The adapter seam: how the core talks to a chat source.
//!
//! An [`Adapter`] is a protocol-specific collaborator. Inbound, it
//! constructs [`Message`](crate::message::Message) values and feeds them to
//! [`Robot::receive`](crate::robot::Robot::receive). Outbound, the core
//! hands it an addressing [`Envelope`] plus one or more strings and expects
//! no result beyond success or failure.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AdapterResult;
use crate::robot::Robot;
use crate::user::User;

/// Addressing details for an outgoing operation.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    /// The user the operation concerns, when there is one.
    pub user: Option<User>,
    /// The room to deliver into, when known.
    pub room: Option<String>,
}

impl Envelope {
    /// An envelope addressed at a user (room taken from the user record).
    pub fn for_user(user: &User) -> Self {
        Self {
            room: user.room.clone(),
            user: Some(user.clone()),
        }
    }

    /// An envelope addressed at a room only.
    pub fn for_room(room: impl Into<String>) -> Self {
        Self {
            user: None,
            room: Some(room.into()),
        }
    }
}

/// A specific interface to a chat source.
///
/// `topic` defaults to a no-op and `emote` to an alias for `send`, since
/// many chat sources support neither natively.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Delivers raw message strings to the chat source.
    async fn send(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()>;

    /// Builds replies addressed at the envelope's user and delivers them.
    async fn reply(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()>;

    /// Sets a topic on the chat source.
    async fn topic(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        let _ = (envelope, strings);
        Ok(())
    }

    /// Delivers emote strings to the chat source.
    async fn emote(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.send(envelope, strings).await
    }

    /// Drives the adapter's event loop, feeding inbound events to
    /// `robot.receive` until the source closes or the adapter is told to
    /// stop.
    async fn run(&self, robot: Arc<Robot>) -> AdapterResult<()>;

    /// Shuts the adapter down; must unblock a concurrent [`run`](Self::run).
    async fn close(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// A shared adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;
