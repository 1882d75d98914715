//! Process-wide cache of payload dispatchers.
//!
//! Dispatchers are stateless, so one instance per payload type is enough.
//! [`DispatcherCache`] builds each one lazily on first use and hands out the
//! same `Arc` afterwards.
//!
//! Concurrent first calls for the same payload type agree on a single
//! instance: the map shard is locked only to find or insert the per-key cell,
//! and construction itself is serialized by that cell. Different payload
//! types never wait on each other. A failed construction leaves the cell
//! empty, so the next call tries again.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use skillet_core::{SkillError, SkillResult};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::dispatcher::RequestDispatcher;

type Slot = Arc<OnceCell<Arc<dyn RequestDispatcher>>>;

static GLOBAL: LazyLock<Arc<DispatcherCache>> = LazyLock::new(|| Arc::new(DispatcherCache::new()));

/// Thread-safe map from payload [`TypeId`] to its dispatcher.
#[derive(Default)]
pub struct DispatcherCache {
    entries: DashMap<TypeId, Slot>,
}

impl DispatcherCache {
    /// Creates an empty, private cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide cache shared by default-built mediators.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Returns the dispatcher for `payload_type`, building it with `factory`
    /// if none exists yet.
    ///
    /// `factory` runs at most once per successful construction, even when
    /// many tasks ask for the same type at the same time.
    pub async fn get_or_create<F>(
        &self,
        payload_type: TypeId,
        factory: F,
    ) -> SkillResult<Arc<dyn RequestDispatcher>>
    where
        F: FnOnce() -> SkillResult<Arc<dyn RequestDispatcher>>,
    {
        // ── Fast path: already built ────────────────────────────────────────
        if let Some(slot) = self.entries.get(&payload_type)
            && let Some(dispatcher) = slot.value().get()
        {
            return Ok(Arc::clone(dispatcher));
        }

        // ── Slow path: initialize through the per-key cell ──────────────────
        let slot = Arc::clone(self.entries.entry(payload_type).or_default().value());
        let dispatcher = slot
            .get_or_try_init(|| async {
                let dispatcher = factory()?;
                debug!(payload = dispatcher.payload_name(), "Dispatcher created");
                Ok::<_, SkillError>(dispatcher)
            })
            .await?;

        Ok(Arc::clone(dispatcher))
    }

    /// Returns `true` if a dispatcher for `payload_type` has been built.
    pub fn contains(&self, payload_type: TypeId) -> bool {
        self.entries
            .get(&payload_type)
            .is_some_and(|slot| slot.value().initialized())
    }

    /// Returns the number of dispatchers built so far.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached dispatcher.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for DispatcherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherCache")
            .field("dispatchers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::HandlerDispatcher;
    use skillet_core::{IntentRequest, LaunchRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn launch_dispatcher() -> SkillResult<Arc<dyn RequestDispatcher>> {
        Ok(Arc::new(HandlerDispatcher::<LaunchRequest>::new()))
    }

    #[tokio::test]
    async fn reuses_built_dispatcher() {
        let cache = DispatcherCache::new();
        let key = TypeId::of::<LaunchRequest>();

        let first = cache.get_or_create(key, launch_dispatcher).await.unwrap();
        let second = cache
            .get_or_create(key, || panic!("factory must not run twice"))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.contains(key));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_builds_once() {
        let cache = Arc::new(DispatcherCache::new());
        let built = Arc::new(AtomicUsize::new(0));
        let key = TypeId::of::<IntentRequest>();

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let built = Arc::clone(&built);
                tokio::spawn(async move {
                    cache
                        .get_or_create(key, || {
                            built.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(5));
                            Ok(Arc::new(HandlerDispatcher::<IntentRequest>::new())
                                as Arc<dyn RequestDispatcher>)
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut dispatchers = Vec::new();
        for task in tasks {
            dispatchers.push(task.await.unwrap());
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(dispatchers.iter().all(|d| Arc::ptr_eq(d, &dispatchers[0])));
    }

    #[tokio::test]
    async fn failed_construction_is_not_cached() {
        let cache = DispatcherCache::new();
        let key = TypeId::of::<LaunchRequest>();

        let error = cache
            .get_or_create(key, || Err(SkillError::UnsupportedPayload { payload: "LaunchRequest" }))
            .await
            .err()
            .unwrap();
        assert!(matches!(error, SkillError::UnsupportedPayload { .. }));
        assert!(!cache.contains(key));
        assert!(cache.is_empty());

        cache.get_or_create(key, launch_dispatcher).await.unwrap();
        assert!(cache.contains(key));
    }

    #[tokio::test]
    async fn clear_forgets_dispatchers() {
        let cache = DispatcherCache::new();
        let key = TypeId::of::<LaunchRequest>();
        let first = cache.get_or_create(key, launch_dispatcher).await.unwrap();

        cache.clear();
        let second = cache.get_or_create(key, launch_dispatcher).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }
}
