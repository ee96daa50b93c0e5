//! Singleflight for cache fills.
//!
//! The first caller for a key becomes the leader: its producer is spawned on
//! the runtime and the resulting future is shared with every caller that
//! arrives before it settles. The producer runs to completion even if every
//! caller goes away, so its result still lands in the cache for the next
//! consumer.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{MediaError, Result};

type SharedOutcome<T> = Shared<BoxFuture<'static, Result<T>>>;
type InFlight<T> = Arc<Mutex<HashMap<String, SharedOutcome<T>>>>;

pub struct Deduplicator<T> {
    in_flight: InFlight<T>,
    leaders: AtomicU64,
    waiters: AtomicU64,
}

impl<T> Default for Deduplicator<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            leaders: AtomicU64::new(0),
            waiters: AtomicU64::new(0),
        }
    }
}

impl<T> fmt::Debug for Deduplicator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deduplicator")
            .field("in_flight", &self.in_flight.lock().len())
            .field("leaders", &self.leaders.load(Ordering::Relaxed))
            .field("waiters", &self.waiters.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T> Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `producer` for `key` unless a run is already in flight, in which
    /// case wait for that one. Every caller sees the same outcome; the
    /// record is dropped once it settles, so failures are never sticky.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn run<F, Fut>(&self, key: &str, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = {
            let mut map = self.in_flight.lock();
            if let Some(existing) = map.get(key) {
                let waiters = self.waiters.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(key, waiters, "singleflight wait");
                existing.clone()
            } else {
                let leaders = self.leaders.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(key, leaders, "singleflight lead");
                let shared = self.spawn_leader(key, producer());
                map.insert(key.to_string(), shared.clone());
                shared
            }
        };
        shared.await
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    pub fn leaders(&self) -> u64 {
        self.leaders.load(Ordering::Relaxed)
    }

    pub fn waiters(&self) -> u64 {
        self.waiters.load(Ordering::Relaxed)
    }

    fn spawn_leader<Fut>(&self, key: &str, work: Fut) -> SharedOutcome<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let in_flight = Arc::clone(&self.in_flight);
        let owned_key = key.to_string();
        let task = tokio::spawn(async move {
            let outcome = work.await;
            // The map lock is held by `run` while it registers this task, so
            // this removal always happens after the insert.
            in_flight.lock().remove(&owned_key);
            debug!(
                key = %owned_key,
                ok = outcome.is_ok(),
                "singleflight complete"
            );
            outcome
        });

        let reference = key.to_string();
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(MediaError::Interrupted {
                    reference,
                    message: join_err.to_string(),
                }),
            }
        }
        .boxed()
        .shared()
    }
}
