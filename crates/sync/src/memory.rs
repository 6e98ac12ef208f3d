//! In-process reference backend
//!
//! A JSON tree behind a mutex with snapshot fan-out. Peers in the same
//! process (tests, hotseat simulations) share one instance through an
//! `Arc`. `transact` holds the tree lock across the read-modify-write,
//! so concurrent increments from different threads never lose updates.
//! Sinks are fired with no backend lock held, so a sink may call back
//! into the backend, including subscribing or unsubscribing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::backend::{Backend, SnapshotSink, SubscriptionId};
use crate::error::Result;

struct Subscription {
    path: String,
    sink: Arc<SnapshotSink>,
}

/// Shared in-memory backend
pub struct MemoryBackend {
    tree: Mutex<Value>,
    subscriptions: Mutex<HashMap<u64, Subscription>>,
    next_subscription: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Value::Object(Map::new())),
            subscriptions: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    fn value_at(tree: &Value, path: &str) -> Option<Value> {
        let mut current = tree;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    fn set_at(tree: &mut Value, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = tree;
        for (idx, segment) in segments.iter().enumerate() {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let map = current.as_object_mut().expect("just ensured object");
            if idx == segments.len() - 1 {
                map.insert(segment.to_string(), value);
                return;
            }
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        // Empty path replaces the whole tree
        if segments.is_empty() {
            *current = value;
        }
    }

    /// Whether a write at `written` affects a subscription at `watched`
    fn overlaps(watched: &str, written: &str) -> bool {
        let w: Vec<&str> = watched.split('/').filter(|s| !s.is_empty()).collect();
        let p: Vec<&str> = written.split('/').filter(|s| !s.is_empty()).collect();
        let shorter = w.len().min(p.len());
        w[..shorter] == p[..shorter]
    }

    fn notify(&self, written_path: &str) {
        // Snapshot each affected subscription's view and clone its
        // sink handle, then fire with no lock held. A sink that calls
        // back into the backend must not deadlock.
        let pending: Vec<(Arc<SnapshotSink>, Value)> = {
            let tree = self.tree.lock().unwrap();
            let subscriptions = self.subscriptions.lock().unwrap();
            subscriptions
                .values()
                .filter(|sub| Self::overlaps(&sub.path, written_path))
                .map(|sub| {
                    (
                        sub.sink.clone(),
                        Self::value_at(&tree, &sub.path).unwrap_or(Value::Null),
                    )
                })
                .collect()
        };

        for (sink, snapshot) in pending {
            sink(snapshot);
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn put(&self, path: &str, value: Value) -> Result<()> {
        {
            let mut tree = self.tree.lock().unwrap();
            Self::set_at(&mut tree, path, value);
        }
        self.notify(path);
        Ok(())
    }

    fn transact(
        &self,
        path: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Value,
    ) -> Result<Value> {
        let next = {
            let mut tree = self.tree.lock().unwrap();
            let current = Self::value_at(&tree, path);
            let next = apply(current);
            Self::set_at(&mut tree, path, next.clone());
            next
        };
        self.notify(path);
        Ok(next)
    }

    fn read_once(&self, path: &str) -> Result<Option<Value>> {
        let tree = self.tree.lock().unwrap();
        Ok(Self::value_at(&tree, path))
    }

    fn subscribe(&self, path: &str, sink: SnapshotSink) -> Result<SubscriptionId> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let initial = {
            let tree = self.tree.lock().unwrap();
            Self::value_at(&tree, path).unwrap_or(Value::Null)
        };
        // Initial snapshot fires before the subscription can observe
        // later writes, matching subscribe-then-replay semantics.
        sink(initial);
        self.subscriptions.lock().unwrap().insert(
            id,
            Subscription {
                path: path.to_string(),
                sink: Arc::new(sink),
            },
        );
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().unwrap().remove(&id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc;
    use std::sync::Arc;

    #[test]
    fn test_put_and_read() {
        let backend = MemoryBackend::new();
        backend.put("rooms/TEST/scores/p1", json!(3)).unwrap();
        assert_eq!(
            backend.read_once("rooms/TEST/scores/p1").unwrap(),
            Some(json!(3))
        );
        assert_eq!(
            backend.read_once("rooms/TEST/scores").unwrap(),
            Some(json!({ "p1": 3 }))
        );
    }

    #[test]
    fn test_read_missing() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.read_once("rooms/NOPE").unwrap(), None);
    }

    #[test]
    fn test_deep_put_creates_parents() {
        let backend = MemoryBackend::new();
        backend
            .put("rooms/TEST/history/a1/vetoed", json!(true))
            .unwrap();
        assert_eq!(
            backend.read_once("rooms/TEST/history/a1").unwrap(),
            Some(json!({ "vetoed": true }))
        );
    }

    #[test]
    fn test_subscribe_fires_immediately_and_on_writes() {
        let backend = MemoryBackend::new();
        backend.put("rooms/TEST/scores/p1", json!(1)).unwrap();

        let (tx, rx) = mpsc::channel();
        backend
            .subscribe(
                "rooms/TEST/scores",
                Box::new(move |value| {
                    let _ = tx.send(value);
                }),
            )
            .unwrap();

        // Initial snapshot
        assert_eq!(rx.try_recv().unwrap(), json!({ "p1": 1 }));

        // A leaf write below the watched path re-fires the collection
        backend.put("rooms/TEST/scores/p2", json!(5)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), json!({ "p1": 1, "p2": 5 }));

        // Writes elsewhere do not
        backend.put("rooms/OTHER/scores/p1", json!(9)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let backend = MemoryBackend::new();
        let (tx, rx) = mpsc::channel();
        let id = backend
            .subscribe(
                "rooms/TEST",
                Box::new(move |value| {
                    let _ = tx.send(value);
                }),
            )
            .unwrap();
        let _ = rx.try_recv();

        backend.unsubscribe(id);
        backend.put("rooms/TEST/scores/p1", json!(1)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sink_may_reenter_backend() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("rooms/TEST/scores/p1", json!(1)).unwrap();

        // The settings sink reads back through the backend and adds a
        // second watcher while its own notification is being delivered
        let (tx, rx) = mpsc::channel();
        let inner = backend.clone();
        backend
            .subscribe(
                "rooms/TEST/settings",
                Box::new(move |value| {
                    if value.is_null() {
                        return;
                    }
                    let scores = inner.read_once("rooms/TEST/scores").unwrap();
                    let tx = tx.clone();
                    inner
                        .subscribe(
                            "rooms/TEST/scores",
                            Box::new(move |snapshot| {
                                let _ = tx.send(snapshot);
                            }),
                        )
                        .unwrap();
                    assert_eq!(scores, Some(json!({ "p1": 1 })));
                }),
            )
            .unwrap();

        backend
            .put("rooms/TEST/settings/game_paused", json!(true))
            .unwrap();

        // The re-entrant subscription took hold and saw its snapshot
        assert_eq!(rx.try_recv().unwrap(), json!({ "p1": 1 }));
    }

    #[test]
    fn test_transact_is_atomic_across_threads() {
        let backend = Arc::new(MemoryBackend::new());
        let path = "rooms/TEST/scores/p1";
        let threads = 8;
        let per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let backend = backend.clone();
                std::thread::spawn(move || {
                    // Half the callers decrement, matching interleaved taps and vetoes
                    let delta: i64 = if t % 2 == 0 { 1 } else { -1 };
                    for _ in 0..per_thread {
                        backend
                            .transact(path, &mut |current| {
                                serde_json::json!(tally_core::scoring::bump(
                                    current.and_then(|v| v.as_i64()),
                                    delta
                                ))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Equal numbers of +1 and -1 callers cancel out exactly
        assert_eq!(backend.read_once(path).unwrap(), Some(json!(0)));
    }
}
