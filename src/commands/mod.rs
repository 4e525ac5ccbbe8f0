//! Query surface consumed by the presentation layer, organized by domain.
//!
//! - `rules`: app list, per-app block flags, bulk toggles, profile copy
//! - `system`: master switch, import/export, preferences, tunnel status
//! - `logic`: pure decision functions (unit-testable)
//! - `state`: shared `FirewallState` definition

mod logic;
pub mod rules;
mod state;
pub mod system;

pub use state::FirewallState;

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::FirewallState;
    use crate::config;
    use crate::core::{AppCatalog, FirewallProfile, InstalledApp, RestartCoordinator, RuleStore};
    use crate::db::{KeyValueStore, MemoryStore, NamespaceBatch, PrefValue};
    use crate::tunnel::tests::{spawn_handle, MockPlatform};

    /// In-memory app inventory.
    #[derive(Default)]
    pub struct StaticCatalog {
        pub apps: Mutex<Vec<InstalledApp>>,
        pub fail: bool,
    }

    impl AppCatalog for StaticCatalog {
        fn installed_apps(&self) -> anyhow::Result<Vec<InstalledApp>> {
            if self.fail {
                anyhow::bail!("package manager unavailable");
            }
            Ok(self.apps.lock().unwrap().clone())
        }
    }

    pub fn app(package: &str, label: &str, is_system: bool) -> InstalledApp {
        InstalledApp {
            package_name: package.to_string(),
            label: label.to_string(),
            is_system,
            has_internet: true,
        }
    }

    /// Memory backend whose profile commits start failing after `limit` successes.
    ///
    /// Settings writes are never counted or failed.
    pub struct FlakyRuleStore {
        inner: MemoryStore,
        rule_commits_left: AtomicUsize,
    }

    impl FlakyRuleStore {
        pub fn new(limit: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                rule_commits_left: AtomicUsize::new(limit),
            }
        }
    }

    impl KeyValueStore for FlakyRuleStore {
        fn get(&self, namespace: &str, key: &str) -> anyhow::Result<Option<PrefValue>> {
            self.inner.get(namespace, key)
        }
        fn entries(&self, namespace: &str) -> anyhow::Result<BTreeMap<String, PrefValue>> {
            self.inner.entries(namespace)
        }
        fn commit(&self, namespace: &str, key: &str, value: PrefValue) -> anyhow::Result<()> {
            if namespace != config::SETTINGS_NAMESPACE {
                let left = self.rule_commits_left.load(Ordering::SeqCst);
                if left == 0 {
                    anyhow::bail!("disk full");
                }
                self.rule_commits_left.store(left - 1, Ordering::SeqCst);
            }
            self.inner.commit(namespace, key, value)
        }
        fn replace(&self, batches: &[NamespaceBatch]) -> anyhow::Result<()> {
            self.inner.replace(batches)
        }
    }

    /// State over a memory store, a mock platform and a live tunnel worker.
    pub fn test_state(apps: Vec<InstalledApp>) -> (FirewallState, Arc<MockPlatform>) {
        test_state_with(Arc::new(MemoryStore::new()), apps)
    }

    pub fn test_state_with(
        storage: Arc<dyn KeyValueStore>,
        apps: Vec<InstalledApp>,
    ) -> (FirewallState, Arc<MockPlatform>) {
        let platform = Arc::new(MockPlatform::new());
        let store = RuleStore::new(storage);
        let tunnel = spawn_handle(&platform, &store);
        let state = FirewallState {
            restarts: RestartCoordinator::new(store.clone(), tunnel.clone()),
            store,
            tunnel,
            catalog: Arc::new(StaticCatalog {
                apps: Mutex::new(apps),
                fail: false,
            }),
            profile: FirewallProfile::Vpn,
        };
        (state, platform)
    }
}
