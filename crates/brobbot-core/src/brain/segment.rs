//! Namespaced views over a brain.
//!
//! A [`BrainSegment`] is plain composition: a parent `Arc<dyn Brain>` and a
//! prefix string. Every data operation delegates upward with the key
//! prefixed, so an N-deep chain of segments produces the physical key
//! `seg1:seg2:...:segN:original` and strips it back off symmetrically.
//! User-directory and lifecycle operations are not namespaced and delegate
//! unchanged.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{Brain, Placement};
use crate::error::{EntryKind, StoreResult};
use crate::user::{User, UserOptions};

/// A child namespace sharing its parent's underlying storage.
pub struct BrainSegment {
    parent: Arc<dyn Brain>,
    prefix: String,
}

impl BrainSegment {
    /// Creates a segment named `name` over `parent`.
    pub fn new(parent: Arc<dyn Brain>, name: impl Into<String>) -> Self {
        Self {
            parent,
            prefix: format!("{}:", name.into()),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn strip(&self, key: String) -> String {
        key.strip_prefix(&self.prefix)
            .map(str::to_string)
            .unwrap_or(key)
    }
}

#[async_trait]
impl Brain for BrainSegment {
    fn key(&self, key: &str) -> String {
        self.parent.key(&self.scoped(key))
    }

    fn unkey(&self, key: &str) -> String {
        self.strip(self.parent.unkey(key))
    }

    fn serialize(&self, value: &Value) -> Value {
        self.parent.serialize(value)
    }

    fn deserialize(&self, value: Value) -> Value {
        self.parent.deserialize(value)
    }

    async fn ready(&self) -> StoreResult<()> {
        self.parent.ready().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.parent.close().await
    }

    async fn reset(&self) -> StoreResult<()> {
        self.parent.reset().await
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.parent.set(&self.scoped(key), value).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.parent.get(&self.scoped(key)).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.parent.exists(&self.scoped(key)).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.parent.remove(&self.scoped(key)).await
    }

    async fn incr_by(&self, key: &str, amount: i64) -> StoreResult<i64> {
        self.parent.incr_by(&self.scoped(key), amount).await
    }

    async fn kind(&self, key: &str) -> StoreResult<Option<EntryKind>> {
        self.parent.kind(&self.scoped(key)).await
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .parent
            .keys(&self.scoped(prefix))
            .await?
            .into_iter()
            .map(|key| self.strip(key))
            .collect())
    }

    async fn lpush(&self, key: &str, value: Value) -> StoreResult<()> {
        self.parent.lpush(&self.scoped(key), value).await
    }

    async fn rpush(&self, key: &str, value: Value) -> StoreResult<()> {
        self.parent.rpush(&self.scoped(key), value).await
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<Value>> {
        self.parent.lpop(&self.scoped(key)).await
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<Value>> {
        self.parent.rpop(&self.scoped(key)).await
    }

    async fn lindex(&self, key: &str, index: usize) -> StoreResult<Option<Value>> {
        self.parent.lindex(&self.scoped(key), index).await
    }

    async fn lrange(&self, key: &str, start: i64, end: i64) -> StoreResult<Vec<Value>> {
        self.parent.lrange(&self.scoped(key), start, end).await
    }

    async fn lset(&self, key: &str, index: usize, value: Value) -> StoreResult<()> {
        self.parent.lset(&self.scoped(key), index, value).await
    }

    async fn linsert(
        &self,
        key: &str,
        placement: Placement,
        pivot: Value,
        value: Value,
    ) -> StoreResult<()> {
        self.parent
            .linsert(&self.scoped(key), placement, pivot, value)
            .await
    }

    async fn lrem(&self, key: &str, value: Value) -> StoreResult<()> {
        self.parent.lrem(&self.scoped(key), value).await
    }

    async fn llen(&self, key: &str) -> StoreResult<Option<usize>> {
        self.parent.llen(&self.scoped(key)).await
    }

    async fn sadd(&self, key: &str, value: Value) -> StoreResult<()> {
        self.parent.sadd(&self.scoped(key), value).await
    }

    async fn srem(&self, key: &str, value: Value) -> StoreResult<()> {
        self.parent.srem(&self.scoped(key), value).await
    }

    async fn sismember(&self, key: &str, value: Value) -> StoreResult<bool> {
        self.parent.sismember(&self.scoped(key), value).await
    }

    async fn scard(&self, key: &str) -> StoreResult<Option<usize>> {
        self.parent.scard(&self.scoped(key)).await
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<Value>> {
        self.parent.smembers(&self.scoped(key)).await
    }

    async fn srandmember(&self, key: &str) -> StoreResult<Option<Value>> {
        self.parent.srandmember(&self.scoped(key)).await
    }

    async fn spop(&self, key: &str) -> StoreResult<Option<Value>> {
        self.parent.spop(&self.scoped(key)).await
    }

    async fn hset(&self, table: &str, field: &str, value: Value) -> StoreResult<()> {
        self.parent.hset(&self.scoped(table), field, value).await
    }

    async fn hget(&self, table: &str, field: &str) -> StoreResult<Option<Value>> {
        self.parent.hget(&self.scoped(table), field).await
    }

    async fn hdel(&self, table: &str, field: &str) -> StoreResult<()> {
        self.parent.hdel(&self.scoped(table), field).await
    }

    async fn hkeys(&self, table: &str) -> StoreResult<Vec<String>> {
        self.parent.hkeys(&self.scoped(table)).await
    }

    async fn hvals(&self, table: &str) -> StoreResult<Vec<Value>> {
        self.parent.hvals(&self.scoped(table)).await
    }

    async fn hgetall(&self, table: &str) -> StoreResult<Vec<(String, Value)>> {
        self.parent.hgetall(&self.scoped(table)).await
    }

    async fn hlen(&self, table: &str) -> StoreResult<Option<usize>> {
        self.parent.hlen(&self.scoped(table)).await
    }

    async fn hincr_by(&self, table: &str, field: &str, amount: i64) -> StoreResult<i64> {
        self.parent.hincr_by(&self.scoped(table), field, amount).await
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        self.parent.users().await
    }

    async fn add_user(&self, user: User) -> StoreResult<User> {
        self.parent.add_user(user).await
    }

    async fn user_for_id(&self, id: &str, options: UserOptions) -> StoreResult<User> {
        self.parent.user_for_id(id, options).await
    }

    async fn user_for_name(&self, name: &str) -> StoreResult<Option<User>> {
        self.parent.user_for_name(name).await
    }

    async fn users_for_raw_fuzzy_name(&self, fuzzy_name: &str) -> StoreResult<Vec<User>> {
        self.parent.users_for_raw_fuzzy_name(fuzzy_name).await
    }

    async fn users_for_fuzzy_name(&self, fuzzy_name: &str) -> StoreResult<Vec<User>> {
        self.parent.users_for_fuzzy_name(fuzzy_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{MemoryBrain, segment};
    use serde_json::json;

    fn root() -> Arc<dyn Brain> {
        Arc::new(MemoryBrain::new())
    }

    #[tokio::test]
    async fn keys_are_prefixed_physically() {
        let root = root();
        let scripts = segment(&root, "scripts");

        scripts.set("color", json!("teal")).await.unwrap();

        // Visible at the root under the physical key only.
        assert_eq!(root.get("scripts:color").await.unwrap(), Some(json!("teal")));
        assert_eq!(root.get("color").await.unwrap(), None);
        assert_eq!(scripts.get("color").await.unwrap(), Some(json!("teal")));
    }

    #[tokio::test]
    async fn unkey_inverts_key_at_any_depth() {
        let root = root();
        let outer = segment(&root, "outer");
        let inner: Arc<dyn Brain> = Arc::new(BrainSegment::new(Arc::clone(&outer), "inner"));
        let deepest: Arc<dyn Brain> = Arc::new(BrainSegment::new(Arc::clone(&inner), "deep"));

        for brain in [&outer, &inner, &deepest] {
            let physical = brain.key("original");
            assert_eq!(brain.unkey(&physical), "original");
        }
        assert_eq!(deepest.key("original"), "outer:inner:deep:original");
        assert_eq!(root.key("original"), "original");
    }

    #[tokio::test]
    async fn key_listing_is_scoped() {
        let root = root();
        let a = segment(&root, "a");
        let b = segment(&root, "b");

        a.set("one", json!(1)).await.unwrap();
        a.set("two", json!(2)).await.unwrap();
        b.set("three", json!(3)).await.unwrap();

        let mut keys = a.keys("").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["one".to_string(), "two".to_string()]);

        let prefixed = a.keys("tw").await.unwrap();
        assert_eq!(prefixed, vec!["two".to_string()]);

        let mut all = root.keys("").await.unwrap();
        all.sort();
        assert_eq!(all, vec![
            "a:one".to_string(),
            "a:two".to_string(),
            "b:three".to_string()
        ]);
    }

    #[tokio::test]
    async fn nested_segments_compose() {
        let root = root();
        let outer = segment(&root, "outer");
        let inner: Arc<dyn Brain> = Arc::new(BrainSegment::new(outer, "inner"));

        inner.rpush("log", json!("first")).await.unwrap();
        inner.rpush("log", json!("second")).await.unwrap();

        assert_eq!(
            root.lrange("outer:inner:log", 0, -1).await.unwrap(),
            vec![json!("first"), json!("second")]
        );
        assert_eq!(inner.llen("log").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn operations_behave_like_root_apart_from_scoping() {
        let root = root();
        let seg = segment(&root, "scoped");

        assert_eq!(seg.incr_by("n", 2).await.unwrap(), 2);
        assert_eq!(seg.incr_by("n", 1).await.unwrap(), 3);

        seg.sadd("members", json!("x")).await.unwrap();
        seg.sadd("members", json!("x")).await.unwrap();
        assert_eq!(seg.scard("members").await.unwrap(), Some(1));

        seg.hset("table", "f", json!(9)).await.unwrap();
        assert_eq!(seg.hget("table", "f").await.unwrap(), Some(json!(9)));
        assert_eq!(seg.kind("table").await.unwrap(), Some(EntryKind::Hash));
    }

    #[tokio::test]
    async fn user_directory_is_shared_across_segments() {
        let root = root();
        let seg = segment(&root, "scripts");

        seg.add_user(User::new("7").named("grace")).await.unwrap();
        let found = root.user_for_name("grace").await.unwrap().unwrap();
        assert_eq!(found.id, "7");
    }
}
