//! A generic, single-owner-task concurrent map cache.
//!
//! One background task owns a plain `HashMap` and serves requests sent over
//! an `mpsc` channel, each carrying a `oneshot` reply channel. Callers clone
//! the cheap `Cache<V>` handle and never touch the map directly, so every
//! operation is linearizable with respect to every other caller: the owner
//! task processes commands one at a time, in the order they arrive.
//!
//! `snapshot()` and `clear()`/`reset()` return an owned copy of the map, not
//! a view, so a reader can never observe a mutation that happened after its
//! snapshot was taken.

use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

enum Command<V> {
    Get(String, oneshot::Sender<Option<V>>),
    Set(String, V, oneshot::Sender<Option<V>>),
    Delete(String, oneshot::Sender<Option<V>>),
    Clear(oneshot::Sender<HashMap<String, V>>),
    Reset(HashMap<String, V>, oneshot::Sender<HashMap<String, V>>),
    Snapshot(oneshot::Sender<HashMap<String, V>>),
}

/// Handle to a running cache owner task. Cheap to clone; all clones share
/// the same underlying map.
pub struct Cache<V> {
    tx: mpsc::Sender<Command<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// A request was sent to a cache whose owner task has already shut down
/// (the `mpsc` channel receiver was dropped).
#[derive(Debug, thiserror::Error)]
#[error("cache owner task is no longer running")]
pub struct CacheClosed;

impl<V> Cache<V>
where
    V: Clone + Send + 'static,
{
    /// Spawn the owner task and return a handle to it.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(queue_depth: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command<V>>(queue_depth);

        tokio::spawn(async move {
            let mut map: HashMap<String, V> = HashMap::new();
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Get(key, reply) => {
                        let _ = reply.send(map.get(&key).cloned());
                    }
                    Command::Set(key, value, reply) => {
                        let old = map.insert(key, value);
                        let _ = reply.send(old);
                    }
                    Command::Delete(key, reply) => {
                        let old = map.remove(&key);
                        let _ = reply.send(old);
                    }
                    Command::Clear(reply) => {
                        let old = std::mem::take(&mut map);
                        let _ = reply.send(old);
                    }
                    Command::Reset(new_map, reply) => {
                        let old = std::mem::replace(&mut map, new_map);
                        let _ = reply.send(old);
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(map.clone());
                    }
                }
            }
            tracing::debug!("cache owner task shutting down, channel closed");
        });

        Self { tx }
    }

    pub async fn get(&self, key: &str) -> Result<Option<V>, CacheClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Get(key.to_string(), reply_tx))
            .await
            .map_err(|_| CacheClosed)?;
        reply_rx.await.map_err(|_| CacheClosed)
    }

    pub async fn set(&self, key: impl Into<String>, value: V) -> Result<Option<V>, CacheClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Set(key.into(), value, reply_tx))
            .await
            .map_err(|_| CacheClosed)?;
        reply_rx.await.map_err(|_| CacheClosed)
    }

    pub async fn delete(&self, key: &str) -> Result<Option<V>, CacheClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Delete(key.to_string(), reply_tx))
            .await
            .map_err(|_| CacheClosed)?;
        reply_rx.await.map_err(|_| CacheClosed)
    }

    /// Empties the map and returns the map as it was before clearing.
    pub async fn clear(&self) -> Result<HashMap<String, V>, CacheClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Clear(reply_tx))
            .await
            .map_err(|_| CacheClosed)?;
        reply_rx.await.map_err(|_| CacheClosed)
    }

    /// Atomically swaps in a whole new map, returning the old one.
    pub async fn reset(&self, new_map: HashMap<String, V>) -> Result<HashMap<String, V>, CacheClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Reset(new_map, reply_tx))
            .await
            .map_err(|_| CacheClosed)?;
        reply_rx.await.map_err(|_| CacheClosed)
    }

    /// A shallow copy of the map at the instant this call was served by the
    /// owner task. Later mutations from any caller are never visible in it.
    pub async fn snapshot(&self) -> Result<HashMap<String, V>, CacheClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| CacheClosed)?;
        reply_rx.await.map_err(|_| CacheClosed)
    }

    /// Drop the sender clone held by the caller. Once every handle (and the
    /// one held by the owner task's loop condition) is dropped, the owner
    /// task exits on its own; there is no separate shutdown signal.
    pub fn close(self) {
        drop(self.tx);
    }
}

impl<V> Default for Cache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache: Cache<i32> = Cache::new();
        assert_eq!(cache.set("a", 1).await.unwrap(), None);
        assert_eq!(cache.set("a", 2).await.unwrap(), Some(1));
        assert_eq!(cache.get("a").await.unwrap(), Some(2));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_returns_old_value() {
        let cache: Cache<&'static str> = Cache::new();
        cache.set("k", "v").await.unwrap();
        assert_eq!(cache.delete("k").await.unwrap(), Some("v"));
        assert_eq!(cache.delete("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_is_isolated_from_later_writes() {
        let cache: Cache<i32> = Cache::new();
        cache.set("a", 1).await.unwrap();
        let snap = cache.snapshot().await.unwrap();
        cache.set("a", 2).await.unwrap();
        cache.set("b", 3).await.unwrap();
        assert_eq!(snap.get("a"), Some(&1));
        assert_eq!(snap.get("b"), None);
        assert_eq!(cache.get("a").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn reset_swaps_the_whole_map_atomically() {
        let cache: Cache<i32> = Cache::new();
        cache.set("a", 1).await.unwrap();
        cache.set("b", 2).await.unwrap();

        let mut next = HashMap::new();
        next.insert("c".to_string(), 3);
        let old = cache.reset(next).await.unwrap();

        assert_eq!(old.len(), 2);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("c").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn cloned_handles_share_state() {
        let cache: Cache<i32> = Cache::new();
        let other = cache.clone();
        other.set("shared", 42).await.unwrap();
        assert_eq!(cache.get("shared").await.unwrap(), Some(42));
    }
}
