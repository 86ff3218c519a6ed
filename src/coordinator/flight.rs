//! Build coalescing: concurrent callers asking for the same `(userId,
//! Artifact)` share one build instead of each kicking off its own. This
//! generalizes the single shutdown-flag idiom the teacher uses for its
//! idle reaper (`AtomicBool` guarding one-time work) to a per-key map of
//! in-flight builds, woken via [`tokio::sync::Notify`] rather than polled.
//!
//! The build itself always runs on a detached `tokio::spawn` task, never
//! inline in a caller's own future. A caller's deadline only bounds how
//! long it waits for the wake-up; letting the caller's future time out
//! must never cancel the build, since the point of coalescing is that the
//! next caller benefits from whatever the first one started.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// One in-flight build. `outcome` is filled in by the builder task just
/// before it calls `notify_waiters`, so every waiter that wakes can read
/// the same result without re-running anything.
struct Handle {
    notify: Notify,
    outcome: Mutex<Option<Result<(), String>>>,
}

/// Why [`FlightMap::run`] returned without the caller observing a
/// completed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWaitError {
    /// The caller's deadline elapsed before the build (or this caller's
    /// wait for someone else's build) finished. The build keeps running.
    TimedOut,
    /// The build ran and failed; carries its error message.
    Build(String),
}

impl std::fmt::Display for BuildWaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildWaitError::TimedOut => write!(f, "timed out waiting for build"),
            BuildWaitError::Build(msg) => write!(f, "build failed: {msg}"),
        }
    }
}

pub struct FlightMap<K: Eq + Hash + Clone> {
    inflight: Mutex<HashMap<K, Arc<Handle>>>,
}

impl<K: Eq + Hash + Clone> FlightMap<K> {
    pub fn new() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }

    fn finish(&self, key: &K, outcome: Result<(), String>) {
        let handle = self.inflight.lock().remove(key);
        if let Some(handle) = handle {
            *handle.outcome.lock() = Some(outcome);
            handle.notify.notify_waiters();
        }
    }
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> FlightMap<K> {
    /// Joins an in-flight build for `key`, or starts one. Exactly one
    /// concurrent caller runs `build` (detached on its own task); every
    /// caller, including that one, waits up to `deadline` for it to land.
    ///
    /// The `Notified` future is constructed and registered *while still
    /// holding `inflight`'s lock* — `finish` needs that same lock to
    /// remove the map entry before it calls `notify_waiters`, so the
    /// registration always happens-before any notification that could
    /// apply to it. Registering after dropping the lock would leave a
    /// window where the builder could finish and notify before this
    /// caller ever subscribes, which `notify_waiters` does not queue for
    /// latecomers.
    pub async fn run<F, Fut>(self: &Arc<Self>, key: K, deadline: Duration, build: F) -> Result<(), BuildWaitError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let (handle, is_leader) = {
            let mut map = self.inflight.lock();
            match map.get(&key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let handle = Arc::new(Handle { notify: Notify::new(), outcome: Mutex::new(None) });
                    map.insert(key.clone(), handle.clone());
                    (handle, true)
                }
            }
        };

        let notified = handle.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if is_leader {
            let map = self.clone();
            let spawn_key = key.clone();
            tokio::spawn(async move {
                let outcome = build().await;
                map.finish(&spawn_key, outcome);
            });
        }

        match tokio::time::timeout(deadline, notified).await {
            Ok(()) => match handle.outcome.lock().clone() {
                Some(Ok(())) | None => Ok(()),
                Some(Err(msg)) => Err(BuildWaitError::Build(msg)),
            },
            Err(_) => Err(BuildWaitError::TimedOut),
        }
    }
}

impl<K: Eq + Hash + Clone> Default for FlightMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
