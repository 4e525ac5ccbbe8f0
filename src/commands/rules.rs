//! App list, per-app block flags and profile commands.

use crate::core::apps::merge_rules;
use crate::core::{filter_and_sort, AppEntry, AppRule, FirewallProfile, Transport};
use crate::error::FirewallError;

use super::logic::{toggle_targets, toggled_rule, validate_packages};
use super::state::FirewallState;

// ---- App list ----

/// Every installed app with its rule, unfiltered and in catalog order.
pub fn list_apps(state: &FirewallState) -> Result<Vec<AppEntry>, FirewallError> {
    let apps = state
        .catalog
        .installed_apps()
        .map_err(|e| FirewallError::Platform(format!("Failed to list installed apps: {e:#}")))?;
    Ok(merge_rules(apps, &state.store, state.profile))
}

/// The app list as shown: stored filter chips and sort order applied, then `query`.
pub fn visible_apps(
    state: &FirewallState,
    query: Option<&str>,
) -> Result<Vec<AppEntry>, FirewallError> {
    let apps = list_apps(state)?;
    let filters = state.store.selected_filters();
    Ok(filter_and_sort(
        &apps,
        &filters,
        query,
        state.store.is_sort_blocked_first(),
    ))
}

// ---- Block flags ----

pub fn is_blocked(state: &FirewallState, package: &str, transport: Transport) -> bool {
    state.store.is_blocked(state.profile, package, transport)
}

/// Set one flag and schedule a rebuild.
pub fn set_blocked(
    state: &FirewallState,
    package: &str,
    transport: Transport,
    blocked: bool,
) -> Result<(), FirewallError> {
    state
        .store
        .set_blocked(state.profile, package, transport, blocked)?;
    state.restarts.notify_rule_changed();
    Ok(())
}

/// Flip `transport` on the clicked app and copy the resulting rule to every target.
///
/// With a non-empty `selection` the selected packages are the targets;
/// otherwise only `clicked`. Both flags are written for each target and a
/// single rebuild is scheduled for the whole batch. Returns the rule written.
pub fn toggle_apps(
    state: &FirewallState,
    clicked: &str,
    transport: Transport,
    selection: &[String],
) -> Result<AppRule, FirewallError> {
    let targets = toggle_targets(clicked, selection);
    validate_packages(&targets)?;

    let rule = toggled_rule(state.store.rule(state.profile, clicked), transport);
    let mut committed = 0usize;
    let mut failure = None;
    'targets: for package in &targets {
        for t in Transport::ALL {
            match state
                .store
                .set_blocked(state.profile, package, t, rule.is_blocked(t))
            {
                Ok(()) => committed += 1,
                Err(e) => {
                    failure = Some(e);
                    break 'targets;
                }
            }
        }
    }

    if let Some(e) = failure {
        // Writes already committed must still reach the tunnel.
        if committed > 0 {
            state.restarts.notify_rule_changed();
        }
        tracing::warn!("Toggle stopped after {committed} writes: {e}");
        return Err(e);
    }

    tracing::info!(
        "Toggled {} for {} apps: wifi_blocked={} data_blocked={}",
        transport.suffix(),
        targets.len(),
        rule.wifi_blocked,
        rule.data_blocked
    );

    state.restarts.notify_rule_changed();
    Ok(rule)
}

// ---- Profiles ----

/// Replace `to` with the rules of `from`.
pub fn copy_profile(
    state: &FirewallState,
    from: FirewallProfile,
    to: FirewallProfile,
) -> Result<(), FirewallError> {
    state.store.copy(from, to)?;
    if to == state.profile {
        state.restarts.notify_rule_changed();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{app, test_state, test_state_with, FlakyRuleStore, StaticCatalog};
    use crate::core::FilterChip;
    use crate::tunnel::tests::PlatformEvent;
    use crate::tunnel::TunnelState;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    fn established(events: &[PlatformEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, PlatformEvent::Established(_)))
            .count()
    }

    #[test]
    fn test_list_apps_merges_rules() {
        let (state, _) = test_state(vec![app("com.a", "Alpha", false), app("com.b", "Beta", true)]);
        state
            .store
            .set_blocked(state.profile, "com.b", Transport::Wifi, true)
            .unwrap();

        let apps = list_apps(&state).unwrap();
        assert_eq!(apps.len(), 2);
        assert!(!apps[0].rule.any_blocked());
        assert!(apps[1].rule.wifi_blocked);
    }

    #[test]
    fn test_list_apps_reports_catalog_failure() {
        let (mut state, _) = test_state(vec![]);
        state.catalog = Arc::new(StaticCatalog {
            apps: Mutex::new(vec![]),
            fail: true,
        });
        assert_eq!(list_apps(&state).unwrap_err().kind(), "Platform");
    }

    #[test]
    fn test_visible_apps_uses_stored_filters() {
        let (state, _) = test_state(vec![
            app("com.maps", "Maps", false),
            app("com.settings", "Settings", true),
            app("com.camera", "Camera", false),
        ]);
        state
            .store
            .set_blocked(state.profile, "com.maps", Transport::Data, true)
            .unwrap();

        // Default selection: user apps only.
        let labels: Vec<String> = visible_apps(&state, None)
            .unwrap()
            .into_iter()
            .map(|a| a.label)
            .collect();
        assert_eq!(labels, vec!["Camera", "Maps"]);

        state
            .store
            .save_selected_filters(&BTreeSet::from([FilterChip::All, FilterChip::Blocked]));
        let visible = visible_apps(&state, Some("ma")).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].package_name, "com.maps");
    }

    #[test]
    fn test_set_blocked_with_master_off_does_not_touch_tunnel() {
        let (state, platform) = test_state(vec![]);
        set_blocked(&state, "com.a", Transport::Wifi, true).unwrap();
        assert!(is_blocked(&state, "com.a", Transport::Wifi));
        assert!(!state.restarts.is_pending());
        assert_eq!(platform.consent_requests(), 0);
    }

    #[test]
    fn test_toggle_writes_both_flags_for_selection() {
        let (state, _) = test_state(vec![]);
        state
            .store
            .set_blocked(state.profile, "com.clicked", Transport::Data, true)
            .unwrap();
        state
            .store
            .set_blocked(state.profile, "com.b", Transport::Wifi, true)
            .unwrap();

        let selection = vec!["com.clicked".to_string(), "com.b".to_string()];
        let rule = toggle_apps(&state, "com.clicked", Transport::Wifi, &selection).unwrap();
        let expected = AppRule {
            wifi_blocked: true,
            data_blocked: true,
        };
        assert_eq!(rule, expected);
        assert_eq!(state.store.rule(state.profile, "com.clicked"), expected);
        assert_eq!(state.store.rule(state.profile, "com.b"), expected);
    }

    #[test]
    fn test_toggle_rejects_empty_package() {
        let (state, _) = test_state(vec![]);
        let err = toggle_apps(&state, "", Transport::Wifi, &[]).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[tokio::test]
    async fn test_bulk_toggle_rebuilds_tunnel_once() {
        let (state, platform) = test_state(vec![]);
        state.store.set_master_enabled(true).unwrap();
        state.tunnel.start().await.unwrap();

        let selection: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        toggle_apps(&state, "a", Transport::Wifi, &selection).unwrap();

        let status = state.tunnel.status().await.unwrap();
        assert_eq!(status.state, TunnelState::Running);
        assert_eq!(status.excluded.len(), 5);
        assert_eq!(established(&platform.events()), 2);
    }

    #[tokio::test]
    async fn test_partial_toggle_failure_still_rebuilds_tunnel() {
        let storage = Arc::new(FlakyRuleStore::new(4));
        let (state, _) = test_state_with(storage, vec![]);
        state.store.set_master_enabled(true).unwrap();
        state.tunnel.start().await.unwrap();

        let selection: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let err = toggle_apps(&state, "a", Transport::Wifi, &selection).unwrap_err();
        assert_eq!(err.kind(), "StorageCommit");

        let committed = state.store.blocked_packages(state.profile, Transport::Wifi);
        assert_eq!(committed, BTreeSet::from(["a".to_string(), "b".to_string()]));

        let status = state.tunnel.status().await.unwrap();
        assert_eq!(status.state, TunnelState::Running);
        assert_eq!(status.excluded, committed);
        assert_eq!(status.generation, 2);
    }

    #[tokio::test]
    async fn test_copy_profile_onto_active_profile_schedules_rebuild() {
        let (state, platform) = test_state(vec![]);
        state.store.set_master_enabled(true).unwrap();
        state.tunnel.start().await.unwrap();

        copy_profile(&state, FirewallProfile::Vpn, FirewallProfile::Vpn).unwrap();
        state.tunnel.status().await.unwrap();
        assert_eq!(established(&platform.events()), 2);
    }
}
