//! The default volatile brain.
//!
//! Entries live in a process-local map and vanish on shutdown. This is the
//! reference implementation of the [`Brain`] contract; a durable backend
//! implements the same trait (usually overriding the serialize hooks) and
//! slots in behind the same `Arc<dyn Brain>`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use serde_json::Value;

use super::{Brain, Placement};
use crate::error::{EntryKind, StoreError, StoreResult};
use crate::user::{User, UserOptions};

/// One stored entry. Values are kept in their serialized form; membership
/// and pivot comparisons are structural equality over that form.
#[derive(Debug, Clone)]
enum Entry {
    Scalar(Value),
    List(Vec<Value>),
    Set(Vec<Value>),
    Hash(HashMap<String, Value>),
}

impl Entry {
    fn kind(&self) -> EntryKind {
        match self {
            Entry::Scalar(_) => EntryKind::Scalar,
            Entry::List(_) => EntryKind::List,
            Entry::Set(_) => EntryKind::Set,
            Entry::Hash(_) => EntryKind::Hash,
        }
    }
}

/// In-memory, volatile [`Brain`].
///
/// Individual operations are internally locked; compound read-modify-write
/// sequences still need external serialization (one listener queue, in
/// practice).
#[derive(Default)]
pub struct MemoryBrain {
    data: RwLock<HashMap<String, Entry>>,
    users: RwLock<HashMap<String, User>>,
}

impl MemoryBrain {
    /// Creates an empty brain.
    pub fn new() -> Self {
        Self::default()
    }

    fn wrong_kind(key: &str, expected: EntryKind, found: &Entry) -> StoreError {
        StoreError::WrongKind {
            key: key.to_string(),
            expected,
            found: found.kind(),
        }
    }

    fn list_entry<'a>(
        data: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> StoreResult<&'a mut Vec<Value>> {
        match data
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(list) => Ok(list),
            entry => Err(Self::wrong_kind(key, EntryKind::List, entry)),
        }
    }

    fn set_entry<'a>(
        data: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> StoreResult<&'a mut Vec<Value>> {
        match data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(Vec::new()))
        {
            Entry::Set(set) => Ok(set),
            entry => Err(Self::wrong_kind(key, EntryKind::Set, entry)),
        }
    }

    fn hash_entry<'a>(
        data: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> StoreResult<&'a mut HashMap<String, Value>> {
        match data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()))
        {
            Entry::Hash(hash) => Ok(hash),
            entry => Err(Self::wrong_kind(key, EntryKind::Hash, entry)),
        }
    }

    /// Resolves a possibly-negative range offset against `len`.
    fn offset(len: usize, index: i64) -> i64 {
        if index < 0 { len as i64 + index } else { index }
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn reset(&self) -> StoreResult<()> {
        self.data.write().clear();
        self.users.write().clear();
        Ok(())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.data
            .write()
            .insert(key.to_string(), Entry::Scalar(self.serialize(&value)));
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::Scalar(value)) => Some(self.deserialize(value.clone())),
            _ => None,
        })
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.data.read().contains_key(key))
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn incr_by(&self, key: &str, amount: i64) -> StoreResult<i64> {
        let mut data = self.data.write();
        let current = match data.get(key) {
            None => 0,
            Some(Entry::Scalar(value)) => {
                self.deserialize(value.clone()).as_i64().unwrap_or(0)
            }
            Some(entry) => return Err(Self::wrong_kind(key, EntryKind::Scalar, entry)),
        };
        let next = current + amount;
        data.insert(
            key.to_string(),
            Entry::Scalar(self.serialize(&Value::from(next))),
        );
        Ok(next)
    }

    async fn kind(&self, key: &str) -> StoreResult<Option<EntryKind>> {
        Ok(self.data.read().get(key).map(Entry::kind))
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .data
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .map(|key| self.unkey(key))
            .collect())
    }

    async fn lpush(&self, key: &str, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        Self::list_entry(&mut self.data.write(), key)?.insert(0, serialized);
        Ok(())
    }

    async fn rpush(&self, key: &str, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        Self::list_entry(&mut self.data.write(), key)?.push(serialized);
        Ok(())
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut data = self.data.write();
        Ok(match data.get_mut(key) {
            Some(Entry::List(list)) if !list.is_empty() => {
                Some(self.deserialize(list.remove(0)))
            }
            _ => None,
        })
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut data = self.data.write();
        Ok(match data.get_mut(key) {
            Some(Entry::List(list)) => list.pop().map(|value| self.deserialize(value)),
            _ => None,
        })
    }

    async fn lindex(&self, key: &str, index: usize) -> StoreResult<Option<Value>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::List(list)) => list
                .get(index)
                .map(|value| self.deserialize(value.clone())),
            _ => None,
        })
    }

    async fn lrange(&self, key: &str, start: i64, end: i64) -> StoreResult<Vec<Value>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::List(list)) if !list.is_empty() => {
                let start = Self::offset(list.len(), start).max(0) as usize;
                let end = Self::offset(list.len(), end);
                if end < 0 {
                    return Ok(Vec::new());
                }
                let end = (end as usize).min(list.len() - 1);
                if start > end {
                    Vec::new()
                } else {
                    list[start..=end]
                        .iter()
                        .map(|value| self.deserialize(value.clone()))
                        .collect()
                }
            }
            _ => Vec::new(),
        })
    }

    async fn lset(&self, key: &str, index: usize, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        let mut data = self.data.write();
        let list = Self::list_entry(&mut data, key)?;
        if index < list.len() {
            list[index] = serialized;
        } else {
            list.push(serialized);
        }
        Ok(())
    }

    async fn linsert(
        &self,
        key: &str,
        placement: Placement,
        pivot: Value,
        value: Value,
    ) -> StoreResult<()> {
        let pivot = self.serialize(&pivot);
        let serialized = self.serialize(&value);
        let mut data = self.data.write();
        if let Some(Entry::List(list)) = data.get_mut(key)
            && let Some(index) = list.iter().position(|element| *element == pivot)
        {
            let index = match placement {
                Placement::Before => index,
                Placement::After => index + 1,
            };
            list.insert(index, serialized);
        }
        Ok(())
    }

    async fn lrem(&self, key: &str, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        let mut data = self.data.write();
        if let Some(Entry::List(list)) = data.get_mut(key)
            && let Some(index) = list.iter().position(|element| *element == serialized)
        {
            list.remove(index);
        }
        Ok(())
    }

    async fn llen(&self, key: &str) -> StoreResult<Option<usize>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::List(list)) => Some(list.len()),
            _ => None,
        })
    }

    async fn sadd(&self, key: &str, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        let mut data = self.data.write();
        let set = Self::set_entry(&mut data, key)?;
        if !set.contains(&serialized) {
            set.push(serialized);
        }
        Ok(())
    }

    async fn srem(&self, key: &str, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        let mut data = self.data.write();
        if let Some(Entry::Set(set)) = data.get_mut(key)
            && let Some(index) = set.iter().position(|member| *member == serialized)
        {
            set.remove(index);
        }
        Ok(())
    }

    async fn sismember(&self, key: &str, value: Value) -> StoreResult<bool> {
        let serialized = self.serialize(&value);
        Ok(match self.data.read().get(key) {
            Some(Entry::Set(set)) => set.contains(&serialized),
            _ => false,
        })
    }

    async fn scard(&self, key: &str) -> StoreResult<Option<usize>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::Set(set)) => Some(set.len()),
            _ => None,
        })
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<Value>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::Set(set)) => set
                .iter()
                .map(|member| self.deserialize(member.clone()))
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn srandmember(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(match self.data.read().get(key) {
            Some(Entry::Set(set)) if !set.is_empty() => {
                let index = rand::rng().random_range(0..set.len());
                Some(self.deserialize(set[index].clone()))
            }
            _ => None,
        })
    }

    async fn spop(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut data = self.data.write();
        Ok(match data.get_mut(key) {
            Some(Entry::Set(set)) if !set.is_empty() => {
                let index = rand::rng().random_range(0..set.len());
                Some(self.deserialize(set.remove(index)))
            }
            _ => None,
        })
    }

    async fn hset(&self, table: &str, field: &str, value: Value) -> StoreResult<()> {
        let serialized = self.serialize(&value);
        let mut data = self.data.write();
        Self::hash_entry(&mut data, table)?.insert(field.to_string(), serialized);
        Ok(())
    }

    async fn hget(&self, table: &str, field: &str) -> StoreResult<Option<Value>> {
        Ok(match self.data.read().get(table) {
            Some(Entry::Hash(hash)) => hash
                .get(field)
                .map(|value| self.deserialize(value.clone())),
            _ => None,
        })
    }

    async fn hdel(&self, table: &str, field: &str) -> StoreResult<()> {
        if let Some(Entry::Hash(hash)) = self.data.write().get_mut(table) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn hkeys(&self, table: &str) -> StoreResult<Vec<String>> {
        Ok(match self.data.read().get(table) {
            Some(Entry::Hash(hash)) => hash.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn hvals(&self, table: &str) -> StoreResult<Vec<Value>> {
        Ok(match self.data.read().get(table) {
            Some(Entry::Hash(hash)) => hash
                .values()
                .map(|value| self.deserialize(value.clone()))
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn hgetall(&self, table: &str) -> StoreResult<Vec<(String, Value)>> {
        Ok(match self.data.read().get(table) {
            Some(Entry::Hash(hash)) => hash
                .iter()
                .map(|(field, value)| (field.clone(), self.deserialize(value.clone())))
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn hlen(&self, table: &str) -> StoreResult<Option<usize>> {
        Ok(match self.data.read().get(table) {
            Some(Entry::Hash(hash)) => Some(hash.len()),
            _ => None,
        })
    }

    async fn hincr_by(&self, table: &str, field: &str, amount: i64) -> StoreResult<i64> {
        let mut data = self.data.write();
        let hash = Self::hash_entry(&mut data, table)?;
        let current = hash
            .get(field)
            .map(|value| self.deserialize(value.clone()))
            .and_then(|value| value.as_i64())
            .unwrap_or(0);
        let next = current + amount;
        hash.insert(field.to_string(), self.serialize(&Value::from(next)));
        Ok(next)
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().values().cloned().collect())
    }

    async fn add_user(&self, user: User) -> StoreResult<User> {
        self.users.write().insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn user_for_id(&self, id: &str, options: UserOptions) -> StoreResult<User> {
        let cached = self.users.read().get(id).cloned();
        match cached {
            Some(user) if options.room.is_none() || user.room == options.room => Ok(user),
            // Missing, or the caller saw the user in a different room: the
            // cached record is stale and gets replaced.
            _ => self.add_user(User::with_options(id, options)).await,
        }
    }

    async fn user_for_name(&self, name: &str) -> StoreResult<Option<User>> {
        let lower = name.to_lowercase();
        Ok(self
            .users
            .read()
            .values()
            .find(|user| user.name.to_lowercase() == lower)
            .cloned())
    }

    async fn users_for_raw_fuzzy_name(&self, fuzzy_name: &str) -> StoreResult<Vec<User>> {
        let lower = fuzzy_name.to_lowercase();
        Ok(self
            .users
            .read()
            .values()
            .filter(|user| user.name.to_lowercase().starts_with(&lower))
            .cloned()
            .collect())
    }

    async fn users_for_fuzzy_name(&self, fuzzy_name: &str) -> StoreResult<Vec<User>> {
        let matched = self.users_for_raw_fuzzy_name(fuzzy_name).await?;
        let lower = fuzzy_name.to_lowercase();
        match matched
            .iter()
            .find(|user| user.name.to_lowercase() == lower)
        {
            Some(exact) => Ok(vec![exact.clone()]),
            None => Ok(matched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scalar_round_trip() {
        let brain = MemoryBrain::new();
        brain.set("somekey", json!({"somevalue": 12})).await.unwrap();

        assert!(brain.exists("somekey").await.unwrap());
        assert_eq!(
            brain.get("somekey").await.unwrap(),
            Some(json!({"somevalue": 12}))
        );
        assert_eq!(brain.get("beans").await.unwrap(), None);
        assert!(!brain.exists("beans").await.unwrap());
        assert_eq!(brain.keys("").await.unwrap(), vec!["somekey".to_string()]);

        brain.remove("somekey").await.unwrap();
        assert!(!brain.exists("somekey").await.unwrap());
    }

    #[tokio::test]
    async fn incr_by_defaults_missing_to_zero() {
        let brain = MemoryBrain::new();
        assert_eq!(brain.incr_by("somenumber", 2).await.unwrap(), 2);
        assert_eq!(brain.incr_by("somenumber", 1).await.unwrap(), 3);
        assert_eq!(brain.get("somenumber").await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn list_push_pop_and_range() {
        let brain = MemoryBrain::new();
        brain.lpush("l", json!("a")).await.unwrap();
        brain.rpush("l", json!("b")).await.unwrap();

        assert_eq!(brain.llen("l").await.unwrap(), Some(2));
        assert_eq!(
            brain.lrange("l", 0, -1).await.unwrap(),
            vec![json!("a"), json!("b")]
        );
        assert_eq!(brain.lindex("l", 1).await.unwrap(), Some(json!("b")));
        assert_eq!(brain.lindex("l", 9).await.unwrap(), None);

        assert_eq!(brain.lpop("l").await.unwrap(), Some(json!("a")));
        assert_eq!(brain.rpop("l").await.unwrap(), Some(json!("b")));
        assert_eq!(brain.lpop("l").await.unwrap(), None);
        assert_eq!(brain.llen("l").await.unwrap(), Some(0));
        assert_eq!(brain.lpop("missing").await.unwrap(), None);
        assert_eq!(brain.llen("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_length_grows_by_one_per_push() {
        let brain = MemoryBrain::new();
        for expected in 1..=5 {
            brain.rpush("counted", json!(expected)).await.unwrap();
            assert_eq!(brain.llen("counted").await.unwrap(), Some(expected));
        }
    }

    #[tokio::test]
    async fn linsert_places_around_pivot() {
        let brain = MemoryBrain::new();
        brain.rpush("l", json!(1)).await.unwrap();
        brain.rpush("l", json!(3)).await.unwrap();

        brain
            .linsert("l", Placement::Before, json!(3), json!(2))
            .await
            .unwrap();
        brain
            .linsert("l", Placement::After, json!(3), json!(4))
            .await
            .unwrap();
        // Absent pivot: no-op.
        brain
            .linsert("l", Placement::Before, json!(99), json!(0))
            .await
            .unwrap();

        assert_eq!(
            brain.lrange("l", 0, -1).await.unwrap(),
            vec![json!(1), json!(2), json!(3), json!(4)]
        );
    }

    #[tokio::test]
    async fn lrem_removes_first_structural_match() {
        let brain = MemoryBrain::new();
        for value in [json!({"n": 1}), json!({"n": 2}), json!({"n": 1})] {
            brain.rpush("l", value).await.unwrap();
        }
        brain.lrem("l", json!({"n": 1})).await.unwrap();
        assert_eq!(
            brain.lrange("l", 0, -1).await.unwrap(),
            vec![json!({"n": 2}), json!({"n": 1})]
        );
    }

    #[tokio::test]
    async fn lset_replaces_in_range() {
        let brain = MemoryBrain::new();
        brain.rpush("l", json!("a")).await.unwrap();
        brain.rpush("l", json!("b")).await.unwrap();
        brain.lset("l", 1, json!("c")).await.unwrap();
        assert_eq!(
            brain.lrange("l", 0, -1).await.unwrap(),
            vec![json!("a"), json!("c")]
        );
    }

    #[tokio::test]
    async fn negative_range_offsets_count_from_tail() {
        let brain = MemoryBrain::new();
        for value in ["a", "b", "c", "d"] {
            brain.rpush("l", json!(value)).await.unwrap();
        }
        assert_eq!(
            brain.lrange("l", 1, -2).await.unwrap(),
            vec![json!("b"), json!("c")]
        );
        assert_eq!(brain.lrange("l", -2, -1).await.unwrap(), vec![
            json!("c"),
            json!("d")
        ]);
        assert!(brain.lrange("l", 3, 1).await.unwrap().is_empty());
        assert!(brain.lrange("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sadd_is_idempotent_under_structural_equality() {
        let brain = MemoryBrain::new();
        brain.sadd("s", json!({"id": 7})).await.unwrap();
        brain.sadd("s", json!({"id": 7})).await.unwrap();

        assert_eq!(brain.scard("s").await.unwrap(), Some(1));
        assert!(brain.sismember("s", json!({"id": 7})).await.unwrap());
        assert!(!brain.sismember("s", json!({"id": 8})).await.unwrap());

        brain.srem("s", json!({"id": 7})).await.unwrap();
        assert_eq!(brain.scard("s").await.unwrap(), Some(0));
        assert_eq!(brain.scard("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn random_set_operations() {
        let brain = MemoryBrain::new();
        assert_eq!(brain.srandmember("s").await.unwrap(), None);
        assert_eq!(brain.spop("s").await.unwrap(), None);

        brain.sadd("s", json!("only")).await.unwrap();
        assert_eq!(brain.srandmember("s").await.unwrap(), Some(json!("only")));
        assert_eq!(brain.spop("s").await.unwrap(), Some(json!("only")));
        assert_eq!(brain.scard("s").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn hash_operations() {
        let brain = MemoryBrain::new();
        brain.hset("h", "a", json!(1)).await.unwrap();
        brain.hset("h", "b", json!(2)).await.unwrap();

        assert_eq!(brain.hget("h", "a").await.unwrap(), Some(json!(1)));
        assert_eq!(brain.hget("h", "z").await.unwrap(), None);
        assert_eq!(brain.hlen("h").await.unwrap(), Some(2));
        assert_eq!(brain.hlen("missing").await.unwrap(), None);

        let mut keys = brain.hkeys("h").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        let mut all = brain.hgetall("h").await.unwrap();
        all.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(all, vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2))
        ]);

        assert_eq!(brain.hincr_by("h", "a", 4).await.unwrap(), 5);
        assert_eq!(brain.hincr_by("h", "fresh", 2).await.unwrap(), 2);

        brain.hdel("h", "b").await.unwrap();
        assert_eq!(brain.hget("h", "b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_kind_write_is_rejected() {
        let brain = MemoryBrain::new();
        brain.set("scalar", json!(1)).await.unwrap();

        let err = brain.rpush("scalar", json!(2)).await.unwrap_err();
        assert!(matches!(err, StoreError::WrongKind { .. }));

        // Reads against the wrong kind stay quiet.
        assert_eq!(brain.llen("scalar").await.unwrap(), None);
        assert!(brain.smembers("scalar").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_directory_lookup_rules() {
        let brain = MemoryBrain::new();
        brain
            .add_user(User::new("42").named("bob"))
            .await
            .unwrap();
        brain
            .add_user(User::new("13").named("alice"))
            .await
            .unwrap();
        brain
            .add_user(User::new("17").named("alicexXx"))
            .await
            .unwrap();

        let found = brain.user_for_id("13", UserOptions::default()).await.unwrap();
        assert_eq!(found.name, "alice");

        let raw = brain.users_for_raw_fuzzy_name("Alice").await.unwrap();
        let mut names: Vec<_> = raw.iter().map(|u| u.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["alice", "alicexXx"]);

        let fuzzy = brain.users_for_fuzzy_name("Alice").await.unwrap();
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].id, "13");

        let by_name = brain.user_for_name("ALICE").await.unwrap().unwrap();
        assert_eq!(by_name.id, "13");
        assert!(brain.user_for_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_for_id_evicts_stale_room() {
        let brain = MemoryBrain::new();
        let first = brain
            .user_for_id("9", UserOptions::named("eve").in_room("general"))
            .await
            .unwrap();
        assert_eq!(first.room.as_deref(), Some("general"));

        // Same room: cached entry returned untouched.
        let same = brain
            .user_for_id("9", UserOptions::named("ignored").in_room("general"))
            .await
            .unwrap();
        assert_eq!(same.name, "eve");

        // Different room: stale entry replaced.
        let moved = brain
            .user_for_id("9", UserOptions::named("eve").in_room("ops"))
            .await
            .unwrap();
        assert_eq!(moved.room.as_deref(), Some("ops"));
        assert_eq!(brain.users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reset_destroys_everything() {
        let brain = MemoryBrain::new();
        brain.set("k", json!(1)).await.unwrap();
        brain.add_user(User::new("1")).await.unwrap();

        brain.reset().await.unwrap();
        assert!(brain.keys("").await.unwrap().is_empty());
        assert!(brain.users().await.unwrap().is_empty());
    }
}
