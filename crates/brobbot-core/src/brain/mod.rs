//! The brain: a namespaced structured key-value store.
//!
//! The [`Brain`] trait is the storage contract handlers program against. It
//! offers four entry shapes under string keys — scalars, ordered lists,
//! unordered sets, field hashes — plus a user directory, all with
//! redis-flavored operation names inherited from the chat-ops tradition the
//! framework grew out of.
//!
//! # Namespacing
//!
//! [`BrainSegment`] wraps any brain in a child namespace: every key is
//! prefixed with `"<name>:"` on the way down and stripped on the way back
//! up. Segments nest, and `unkey(key(k)) == k` holds at any depth. Scripts
//! normally receive a segment named after them so their keys cannot collide.
//!
//! # Serialization seam
//!
//! Every write passes the value through [`Brain::serialize`] and every read
//! through [`Brain::deserialize`] (identity by default). A durable or
//! encoding-aware backend overrides the pair without touching call sites.
//! Set membership, list pivot lookup, and list removal compare the
//! *serialized* forms structurally, so two values that encode identically
//! are the same member.
//!
//! # Failure policy
//!
//! Absent keys, out-of-range indices, and wrong-typed entries on reads all
//! yield `Ok(None)` or an empty collection — never an error. Container
//! writes against an entry of a different kind report
//! [`StoreError::WrongKind`](crate::error::StoreError::WrongKind) rather
//! than clobbering data. There are no transactions: single operations are
//! internally locked, but read-modify-write sequences from concurrently
//! executing handlers need external serialization.

mod memory;
mod segment;

pub use memory::MemoryBrain;
pub use segment::BrainSegment;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EntryKind, StoreResult};
use crate::user::{User, UserOptions};

/// Where `linsert` places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Insert immediately before the pivot element.
    Before,
    /// Insert immediately after the pivot element.
    After,
}

/// The storage contract: scalars, lists, sets, hashes, and the user
/// directory, all behind composable key namespaces.
///
/// Object-safe so segments and pluggable backends can be used
/// interchangeably as `Arc<dyn Brain>`.
#[async_trait]
pub trait Brain: Send + Sync {
    // ------------------------------------------------------------------
    // Key transforms and value hooks
    // ------------------------------------------------------------------

    /// Transforms a user-facing key into the physical key. Identity at the
    /// root; segments prepend their prefix and delegate upward.
    fn key(&self, key: &str) -> String {
        key.to_string()
    }

    /// Inverse of [`key`](Self::key): physical key back to user-facing.
    /// Segments delegate the strip upward before removing their own prefix.
    fn unkey(&self, key: &str) -> String {
        key.to_string()
    }

    /// Pre-write value hook; identity by default.
    fn serialize(&self, value: &Value) -> Value {
        value.clone()
    }

    /// Post-read value hook; identity by default.
    fn deserialize(&self, value: Value) -> Value {
        value
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Completes when the backend is usable. The router's receive gate
    /// stays closed until this resolves.
    async fn ready(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Releases backend resources on shutdown.
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Destroys all data, including the user directory.
    async fn reset(&self) -> StoreResult<()>;

    // ------------------------------------------------------------------
    // Scalars and key enumeration
    // ------------------------------------------------------------------

    /// Stores a scalar value.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Fetches a scalar value; `None` when absent or not a scalar.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Whether any entry exists at `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Deletes the entry at `key`, whatever its kind.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Adds `amount` to the numeric scalar at `key`, treating a missing key
    /// as 0, and returns the post-increment value. Passes through the same
    /// serialize/deserialize hooks as every other scalar path.
    async fn incr_by(&self, key: &str, amount: i64) -> StoreResult<i64>;

    /// The kind of entry stored at `key`, when present.
    async fn kind(&self, key: &str) -> StoreResult<Option<EntryKind>>;

    /// All user-facing keys whose physical key starts with the namespaced
    /// `prefix`; an empty prefix lists the caller's whole namespace.
    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    // ------------------------------------------------------------------
    // Lists (ordered, duplicates allowed)
    // ------------------------------------------------------------------

    /// Pushes onto the head of the list, creating it if missing.
    async fn lpush(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Pushes onto the tail of the list, creating it if missing.
    async fn rpush(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Pops the head; `None` on empty or missing.
    async fn lpop(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Pops the tail; `None` on empty or missing.
    async fn rpop(&self, key: &str) -> StoreResult<Option<Value>>;

    /// The element at `index`; `None` out of range.
    async fn lindex(&self, key: &str, index: usize) -> StoreResult<Option<Value>>;

    /// The elements from `start` through `end` inclusive. Negative offsets
    /// count from the tail (`-1` is the last element). Empty for a missing
    /// list or an inverted range.
    async fn lrange(&self, key: &str, start: i64, end: i64) -> StoreResult<Vec<Value>>;

    /// Replaces the element at `index`; out-of-range indices append.
    async fn lset(&self, key: &str, index: usize, value: Value) -> StoreResult<()>;

    /// Inserts `value` adjacent to the first element equal to the
    /// serialized `pivot`; no-op when the pivot is absent.
    async fn linsert(
        &self,
        key: &str,
        placement: Placement,
        pivot: Value,
        value: Value,
    ) -> StoreResult<()>;

    /// Removes the first element equal to the serialized `value`.
    async fn lrem(&self, key: &str, value: Value) -> StoreResult<()>;

    /// List length; `None` for a missing list.
    async fn llen(&self, key: &str) -> StoreResult<Option<usize>>;

    // ------------------------------------------------------------------
    // Sets (unordered, unique under serialized structural equality)
    // ------------------------------------------------------------------

    /// Adds a member; idempotent.
    async fn sadd(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Removes a member.
    async fn srem(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Whether `value` is a member.
    async fn sismember(&self, key: &str, value: Value) -> StoreResult<bool>;

    /// Set cardinality; `None` for a missing set.
    async fn scard(&self, key: &str) -> StoreResult<Option<usize>>;

    /// Snapshot of all members.
    async fn smembers(&self, key: &str) -> StoreResult<Vec<Value>>;

    /// A uniformly random member; `None` when empty or missing.
    async fn srandmember(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Removes and returns a uniformly random member; `None` when empty or
    /// missing.
    async fn spop(&self, key: &str) -> StoreResult<Option<Value>>;

    // ------------------------------------------------------------------
    // Hashes (field-to-value tables under one key)
    // ------------------------------------------------------------------

    /// Sets a field, creating the table if missing.
    async fn hset(&self, table: &str, field: &str, value: Value) -> StoreResult<()>;

    /// Fetches a field; `None` when table or field is absent.
    async fn hget(&self, table: &str, field: &str) -> StoreResult<Option<Value>>;

    /// Deletes a field.
    async fn hdel(&self, table: &str, field: &str) -> StoreResult<()>;

    /// All field names.
    async fn hkeys(&self, table: &str) -> StoreResult<Vec<String>>;

    /// All field values.
    async fn hvals(&self, table: &str) -> StoreResult<Vec<Value>>;

    /// Snapshot of the whole table.
    async fn hgetall(&self, table: &str) -> StoreResult<Vec<(String, Value)>>;

    /// Number of fields; `None` for a missing table.
    async fn hlen(&self, table: &str) -> StoreResult<Option<usize>>;

    /// Adds `amount` to the numeric field, treating a missing field as 0,
    /// and returns the post-increment value. Honors the value hooks like
    /// [`incr_by`](Self::incr_by).
    async fn hincr_by(&self, table: &str, field: &str, amount: i64) -> StoreResult<i64>;

    // ------------------------------------------------------------------
    // User directory (not namespaced; segments delegate unchanged)
    // ------------------------------------------------------------------

    /// All known users.
    async fn users(&self) -> StoreResult<Vec<User>>;

    /// Caches a user, replacing any entry with the same id.
    async fn add_user(&self, user: User) -> StoreResult<User>;

    /// Returns the cached user for `id`, creating it from `options` when
    /// absent. An explicit room differing from the cached one evicts the
    /// stale entry and caches a fresh record.
    async fn user_for_id(&self, id: &str, options: UserOptions) -> StoreResult<User>;

    /// Case-insensitive exact name lookup.
    async fn user_for_name(&self, name: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive prefix match over all user names.
    async fn users_for_raw_fuzzy_name(&self, fuzzy_name: &str) -> StoreResult<Vec<User>>;

    /// Exact case-insensitive match short-circuits to a singleton result;
    /// otherwise falls back to the prefix match.
    async fn users_for_fuzzy_name(&self, fuzzy_name: &str) -> StoreResult<Vec<User>>;
}

/// Returns a child namespace view over `brain`.
///
/// Operations through the segment are indistinguishable from root
/// operations apart from key scoping.
pub fn segment(brain: &Arc<dyn Brain>, name: impl Into<String>) -> Arc<dyn Brain> {
    Arc::new(BrainSegment::new(Arc::clone(brain), name))
}
