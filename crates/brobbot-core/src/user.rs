//! Chat participants.
//!
//! A [`User`] is the identity record attached to every incoming message and
//! cached in the store's user directory. Chat sources rarely report a full
//! profile up front, so everything beyond the id is optional and the display
//! name falls back to the id itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A participating user in the chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique id assigned by the chat source.
    pub id: String,
    /// Display name; defaults to the id's string form.
    pub name: String,
    /// Room the user was last seen in, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Arbitrary source-specific attributes (avatar, email, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl User {
    /// Creates a user with only an id; the name defaults to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            room: None,
            attrs: Map::new(),
        }
    }

    /// Builds a user from an id plus optional attributes.
    pub fn with_options(id: impl Into<String>, options: UserOptions) -> Self {
        let id = id.into();
        Self {
            name: options.name.unwrap_or_else(|| id.clone()),
            id,
            room: options.room,
            attrs: options.attrs,
        }
    }

    /// Sets the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the room.
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }
}

/// Optional attributes accepted by the user directory when creating or
/// refreshing a [`User`] (see `Brain::user_for_id`).
#[derive(Debug, Clone, Default)]
pub struct UserOptions {
    /// Display name; falls back to the id when absent.
    pub name: Option<String>,
    /// Room the user was seen in. Supplying a room that differs from the
    /// cached one evicts the stale directory entry.
    pub room: Option<String>,
    /// Extra attributes merged into the record.
    pub attrs: Map<String, Value>,
}

impl UserOptions {
    /// Options carrying just a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the room.
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }
}
