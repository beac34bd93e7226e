//! LRU model-residency controller.
//!
//! Keeps at most `max_loaded` models resident in the runtime by
//! unloading the least-recently-used one before a newly requested model
//! is used. Admission is advisory: the runtime has its own memory
//! limits, so every failure here degrades to "do nothing" and the
//! caller's generation proceeds regardless.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::RuntimeError;

/// The slice of the registry the controller needs: residency ground
/// truth and the unload command.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Models currently resident in runtime memory.
    async fn list_loaded(&self) -> Result<Vec<String>, RuntimeError>;

    /// Requests an unload; `true` only on confirmation.
    async fn unload(&self, name: &str) -> bool;
}

/// Outcome of an admission check. The caller is expected to discard it
/// (`let _ = …`); it exists so tests and logs can see what the policy
/// decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Policy disabled (`max_loaded <= 0`).
    Disabled,
    /// The requested model is already resident.
    Resident,
    /// Headroom available, nothing evicted.
    Capacity,
    /// The named victim was unloaded to make room.
    Evicted(String),
    /// A victim was selected but the unload was not confirmed; the
    /// runtime is left over capacity.
    EvictionFailed(String),
    /// The registry could not be queried; enforcement skipped.
    RegistryUnavailable,
}

/// Tracks per-model recency and enforces the residency bound.
///
/// The recency table is the authority for ordering; the registry's
/// loaded set is the authority for membership. The lock is held only
/// for table reads/writes, never across a registry call.
pub struct ResidencyController {
    registry: Arc<dyn ModelRegistry>,
    /// Maximum resident models; zero or negative disables enforcement.
    max_loaded: i64,
    /// Model name -> last-used stamp, nanoseconds since the Unix epoch.
    /// A model absent from the table orders as 0 (least recent).
    recency: Mutex<HashMap<String, u64>>,
}

impl ResidencyController {
    pub fn new(registry: Arc<dyn ModelRegistry>, max_loaded: i64) -> Self {
        Self { registry, max_loaded, recency: Mutex::new(HashMap::new()) }
    }

    /// Ensures capacity for `requested` before it is used, evicting the
    /// least-recently-used resident model when the bound is hit.
    ///
    /// Best-effort: a registry failure or a failed unload is reported
    /// in the returned `Admission` but never raised.
    pub async fn admit(&self, requested: &str) -> Admission {
        // Intent to use: stamped before the eviction decision so the
        // requested model can never be chosen as its own victim.
        self.touch(requested);

        if self.max_loaded <= 0 {
            return Admission::Disabled;
        }

        let loaded = match self.registry.list_loaded().await {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!(error = %e, "registry unavailable, skipping residency enforcement");
                return Admission::RegistryUnavailable;
            }
        };

        if loaded.iter().any(|m| m == requested) {
            return Admission::Resident;
        }
        if (loaded.len() as i64) < self.max_loaded {
            return Admission::Capacity;
        }

        let victim = {
            let recency = self.recency.lock().expect("recency lock poisoned");
            loaded
                .iter()
                .filter(|m| m.as_str() != requested)
                .min_by(|a, b| {
                    let sa = recency.get(a.as_str()).copied().unwrap_or(0);
                    let sb = recency.get(b.as_str()).copied().unwrap_or(0);
                    sa.cmp(&sb).then_with(|| a.cmp(b))
                })
                .cloned()
        };
        let Some(victim) = victim else {
            return Admission::Capacity;
        };

        if self.registry.unload(&victim).await {
            self.recency.lock().expect("recency lock poisoned").remove(&victim);
            info!(victim = %victim, requested = %requested, "evicted least-recently-used model");
            Admission::Evicted(victim)
        } else {
            warn!(victim = %victim, "unload not confirmed, runtime left over capacity");
            Admission::EvictionFailed(victim)
        }
    }

    /// Unconditionally refreshes the model's last-used stamp. Called
    /// after every successful generation so recency reflects actual
    /// completions, not just attempts.
    pub fn touch(&self, model: &str) {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        self.recency.lock().expect("recency lock poisoned").insert(model.to_string(), stamp);
    }

    /// Last-used stamp for a model, if it has ever been touched.
    #[must_use]
    pub fn last_used(&self, model: &str) -> Option<u64> {
        self.recency.lock().expect("recency lock poisoned").get(model).copied()
    }
}

impl std::fmt::Debug for ResidencyController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResidencyController")
            .field("max_loaded", &self.max_loaded)
            .field("tracked", &self.recency.lock().expect("recency lock poisoned").len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubRegistry {
        loaded: Mutex<Vec<String>>,
        unloads: Mutex<Vec<String>>,
        list_calls: AtomicUsize,
        fail_list: bool,
        fail_unload: bool,
    }

    impl StubRegistry {
        fn with_loaded(loaded: &[&str]) -> Self {
            Self {
                loaded: Mutex::new(loaded.iter().map(|s| s.to_string()).collect()),
                unloads: Mutex::new(Vec::new()),
                list_calls: AtomicUsize::new(0),
                fail_list: false,
                fail_unload: false,
            }
        }

        fn loaded(&self) -> Vec<String> {
            self.loaded.lock().unwrap().clone()
        }

        fn unloads(&self) -> Vec<String> {
            self.unloads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelRegistry for StubRegistry {
        async fn list_loaded(&self) -> Result<Vec<String>, RuntimeError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list {
                return Err(RuntimeError::Unreachable {
                    attempts: vec!["stub -> down".to_string()],
                });
            }
            Ok(self.loaded())
        }

        async fn unload(&self, name: &str) -> bool {
            if self.fail_unload {
                return false;
            }
            self.unloads.lock().unwrap().push(name.to_string());
            self.loaded.lock().unwrap().retain(|m| m != name);
            true
        }
    }

    #[tokio::test]
    async fn disabled_policy_never_queries_the_registry() {
        let registry = Arc::new(StubRegistry::with_loaded(&["a", "b", "c"]));
        let controller = ResidencyController::new(registry.clone(), 0);

        assert_eq!(controller.admit("d").await, Admission::Disabled);
        assert_eq!(registry.list_calls.load(Ordering::SeqCst), 0);
        // Intent is still recorded.
        assert!(controller.last_used("d").is_some());
    }

    #[tokio::test]
    async fn resident_model_causes_no_eviction() {
        let registry = Arc::new(StubRegistry::with_loaded(&["a", "b"]));
        let controller = ResidencyController::new(registry.clone(), 2);

        assert_eq!(controller.admit("a").await, Admission::Resident);
        assert!(registry.unloads().is_empty());
    }

    #[tokio::test]
    async fn headroom_causes_no_eviction() {
        let registry = Arc::new(StubRegistry::with_loaded(&["a"]));
        let controller = ResidencyController::new(registry.clone(), 2);

        assert_eq!(controller.admit("b").await, Admission::Capacity);
        assert!(registry.unloads().is_empty());
    }

    #[tokio::test]
    async fn evicts_least_recently_used_model() {
        let registry = Arc::new(StubRegistry::with_loaded(&["a", "b"]));
        let controller = ResidencyController::new(registry.clone(), 2);

        controller.touch("a");
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.touch("b");

        assert_eq!(controller.admit("c").await, Admission::Evicted("a".to_string()));
        assert_eq!(registry.unloads(), vec!["a".to_string()]);
        // The confirmed unload clears the victim's recency record.
        assert!(controller.last_used("a").is_none());
    }

    #[tokio::test]
    async fn untouched_model_is_evicted_before_touched_one() {
        let registry = Arc::new(StubRegistry::with_loaded(&["x", "y"]));
        let controller = ResidencyController::new(registry.clone(), 2);

        // Only y has a recorded stamp; x orders as epoch and goes first.
        controller.touch("y");

        assert_eq!(controller.admit("z").await, Admission::Evicted("x".to_string()));
    }

    #[tokio::test]
    async fn touch_protects_a_model_from_eviction() {
        let registry = Arc::new(StubRegistry::with_loaded(&["m", "n"]));
        let controller = ResidencyController::new(registry.clone(), 2);

        controller.touch("n");
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.touch("m");

        // n is now the older of the two.
        assert_eq!(controller.admit("q").await, Admission::Evicted("n".to_string()));
    }

    #[tokio::test]
    async fn tie_break_is_lexicographic() {
        let registry = Arc::new(StubRegistry::with_loaded(&["beta", "alpha"]));
        let controller = ResidencyController::new(registry.clone(), 2);

        // Neither model has a stamp: both order as 0, name decides.
        assert_eq!(controller.admit("gamma").await, Admission::Evicted("alpha".to_string()));
    }

    #[tokio::test]
    async fn requested_model_is_never_the_victim() {
        let registry = Arc::new(StubRegistry::with_loaded(&["a", "b"]));
        let controller = ResidencyController::new(registry.clone(), 1);

        // Over capacity and the requested model has no older stamp than
        // anyone, yet it must not be selected.
        let admission = controller.admit("a").await;
        assert_eq!(admission, Admission::Resident);
        assert!(registry.unloads().is_empty());

        // And when it is not resident, only the others are candidates.
        let admission = controller.admit("zzz").await;
        match admission {
            Admission::Evicted(victim) => assert_ne!(victim, "zzz"),
            other => panic!("expected eviction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registry_failure_is_fail_open() {
        let mut registry = StubRegistry::with_loaded(&["a", "b", "c"]);
        registry.fail_list = true;
        let registry = Arc::new(registry);
        let controller = ResidencyController::new(registry.clone(), 1);

        assert_eq!(controller.admit("d").await, Admission::RegistryUnavailable);
        assert!(registry.unloads().is_empty());
    }

    #[tokio::test]
    async fn failed_unload_is_reported_not_raised() {
        let mut registry = StubRegistry::with_loaded(&["a", "b"]);
        registry.fail_unload = true;
        let registry = Arc::new(registry);
        let controller = ResidencyController::new(registry.clone(), 2);

        controller.touch("b");
        let admission = controller.admit("c").await;
        assert_eq!(admission, Admission::EvictionFailed("a".to_string()));
        // The victim's recency record survives a failed unload.
        assert_eq!(controller.last_used("a"), None); // never touched
        assert!(controller.last_used("b").is_some());
    }

    #[tokio::test]
    async fn loaded_set_stays_within_bound_across_admissions() {
        let registry = Arc::new(StubRegistry::with_loaded(&["a"]));
        let controller = ResidencyController::new(registry.clone(), 1);

        for model in ["b", "c", "d"] {
            let admission = controller.admit(model).await;
            assert!(matches!(admission, Admission::Evicted(_)), "got {admission:?}");
            assert!(registry.loaded().len() <= 1);
            // Simulate the runtime loading the model on generation.
            registry.loaded.lock().unwrap().push(model.to_string());
            controller.touch(model);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}
