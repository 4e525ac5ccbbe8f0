//! Installed-app inventory merged with the stored rules.

use serde::Serialize;

use super::rule_store::{AppRule, FirewallProfile, RuleStore};

/// One installed application as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledApp {
    pub package_name: String,
    pub label: String,
    pub is_system: bool,
    /// Whether the app requested the internet permission.
    pub has_internet: bool,
}

/// Source of the installed-app list (the platform package manager).
pub trait AppCatalog: Send + Sync {
    fn installed_apps(&self) -> anyhow::Result<Vec<InstalledApp>>;
}

/// An installed app together with its rule, serializable for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppEntry {
    pub package_name: String,
    pub label: String,
    pub is_system: bool,
    pub has_internet: bool,
    pub rule: AppRule,
}

/// Attach each app's current rule from `profile`.
pub fn merge_rules(apps: Vec<InstalledApp>, store: &RuleStore, profile: FirewallProfile) -> Vec<AppEntry> {
    apps.into_iter()
        .map(|app| AppEntry {
            rule: store.rule(profile, &app.package_name),
            package_name: app.package_name,
            label: app.label,
            is_system: app.is_system,
            has_internet: app.has_internet,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule_store::tests::memory_store;
    use crate::core::Transport;

    #[test]
    fn test_merge_rules_reads_both_flags() {
        let store = memory_store();
        store
            .set_blocked(FirewallProfile::Vpn, "com.video", Transport::Data, true)
            .unwrap();

        let apps = vec![
            InstalledApp {
                package_name: "com.video".into(),
                label: "Video".into(),
                is_system: false,
                has_internet: true,
            },
            InstalledApp {
                package_name: "com.clock".into(),
                label: "Clock".into(),
                is_system: true,
                has_internet: false,
            },
        ];

        let merged = merge_rules(apps, &store, FirewallProfile::Vpn);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged[0].rule,
            AppRule {
                wifi_blocked: false,
                data_blocked: true
            }
        );
        assert_eq!(merged[1].rule, AppRule::default());
        assert!(merged[1].is_system);
    }
}
