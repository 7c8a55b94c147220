//! Application state management
//!
//! This module contains the shared application state that is passed
//! to all request handlers via Axum's State extractor.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    config::Config,
    db::EngineRepository,
    notify::{self, Notification, Notifier},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Storage backend
    repo: Arc<dyn EngineRepository>,

    /// Notification backend
    notifier: Arc<dyn Notifier>,

    /// In-process write serialization
    locks: EntityLocks,

    /// Application configuration
    config: Config,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        repo: Arc<dyn EngineRepository>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                repo,
                notifier,
                locks: EntityLocks::default(),
                config,
            }),
        }
    }

    pub fn repo(&self) -> &dyn EngineRepository {
        self.inner.repo.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }

    pub fn locks(&self) -> &EntityLocks {
        &self.inner.locks
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Best-effort delivery of a committed change
    pub async fn notify(&self, notification: Notification) {
        notify::emit(
            self.notifier(),
            self.config().engine.notification_timeout(),
            notification,
        )
        .await;
    }
}

/// Entity a write operation serializes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// Every judge assignment of a hackathon
    Assignments(Uuid),
    /// A round's configuration and progress record
    Round(Uuid, i32),
    /// A problem statement's configuration
    ProblemStatement(Uuid, i32),
    /// Scores of one submission
    Submission(Uuid),
    /// A hackathon's winner board
    Winners(Uuid),
}

/// Per-entity async mutexes.
///
/// Guards the read-modify-write sections of this process. Writes from other
/// processes are caught by the repository's version checks instead. An entry
/// lives only while someone holds or waits for it.
#[derive(Default)]
pub struct EntityLocks {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

/// Exclusive hold on one entity; releases and evicts on drop
pub struct EntityGuard {
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Guards held for the duration of an operation
pub struct LockSet {
    _guards: Vec<EntityGuard>,
}

impl EntityLocks {
    pub async fn acquire(&self, key: LockKey) -> EntityGuard {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        EntityGuard {
            key,
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    /// Lock several entities, always in key order
    pub async fn acquire_all(&self, mut keys: Vec<LockKey>) -> LockSet {
        keys.sort_unstable();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        LockSet { _guards: guards }
    }

    /// Entities currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(EntityLocks::default());
        let key = LockKey::Round(Uuid::new_v4(), 0);

        let guard = locks.acquire(key).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = EntityLocks::default();
        let h = Uuid::new_v4();
        let _a = locks.acquire(LockKey::Round(h, 0)).await;
        let _b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire_all(vec![LockKey::Round(h, 1), LockKey::Winners(h)]),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_released_entries_are_evicted() {
        let locks = Arc::new(EntityLocks::default());
        let key = LockKey::Submission(Uuid::new_v4());

        let guard = locks.acquire(key).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(key).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The waiter keeps the entry alive after the first release
        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());

        {
            let _set = locks
                .acquire_all(vec![LockKey::Winners(Uuid::new_v4()), key])
                .await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }
}
