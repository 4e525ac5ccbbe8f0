//! Master switch, import/export, preferences and tunnel status commands.

use std::collections::BTreeSet;

use crate::core::{apply_chip_transition, FilterChip, GlobalSettings, ThemeMode};
use crate::error::FirewallError;
use crate::tunnel::TunnelStatus;

use super::state::FirewallState;

// ---- Master switch ----

pub fn is_master_enabled(state: &FirewallState) -> bool {
    state.store.is_master_enabled()
}

/// Persist the master switch, then bring the tunnel up or down to match.
///
/// The flag is committed first and is not rolled back when consent is
/// denied or establishment fails.
pub async fn set_master_enabled(state: &FirewallState, enabled: bool) -> Result<(), FirewallError> {
    state.store.set_master_enabled(enabled)?;
    tracing::info!("Master switch set to {enabled}");

    if enabled {
        match state.tunnel.start().await {
            // Already up or coming up.
            Err(FirewallError::InvalidState(_)) => Ok(()),
            result => result,
        }
    } else {
        state.tunnel.stop().await
    }
}

// ---- Import / export ----

pub fn export_settings(state: &FirewallState) -> Result<String, FirewallError> {
    state.store.export_all()
}

/// Import a previously exported document and reconcile the tunnel with it.
pub async fn import_settings(state: &FirewallState, json: &str) -> Result<(), FirewallError> {
    state.store.import_all(json)?;

    if state.store.is_master_enabled() {
        state.restarts.notify_rule_changed();
    } else if state.tunnel.state().is_active() {
        state.tunnel.stop().await?;
    }
    Ok(())
}

// ---- Preferences ----

pub fn get_settings(state: &FirewallState) -> GlobalSettings {
    state.store.settings()
}

pub fn set_theme_mode(state: &FirewallState, mode: ThemeMode) {
    state.store.set_theme_mode(mode);
}

pub fn set_sort_blocked_first(state: &FirewallState, enabled: bool) {
    state.store.set_sort_blocked_first(enabled);
}

pub fn set_reboot_reminder_enabled(state: &FirewallState, enabled: bool) {
    state.store.set_reboot_reminder_enabled(enabled);
}

/// Apply a chip click to the stored selection and persist the result.
pub fn select_filter_chip(
    state: &FirewallState,
    chip_id: &str,
    checked: bool,
) -> Result<BTreeSet<FilterChip>, FirewallError> {
    let chip = FilterChip::from_id(chip_id)
        .ok_or_else(|| FirewallError::InvalidInput(format!("Unknown filter chip '{chip_id}'")))?;
    let next = apply_chip_transition(&state.store.selected_filters(), chip, checked);
    state.store.save_selected_filters(&next);
    Ok(next)
}

// ---- Tunnel ----

pub async fn tunnel_status(state: &FirewallState) -> Result<TunnelStatus, FirewallError> {
    state.tunnel.status().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_state;
    use crate::core::Transport;
    use crate::tunnel::tests::PlatformEvent;
    use crate::tunnel::{ConsentOutcome, TunnelState};

    #[tokio::test]
    async fn test_master_switch_starts_and_stops_tunnel() {
        let (state, _) = test_state(vec![]);

        set_master_enabled(&state, true).await.unwrap();
        assert!(is_master_enabled(&state));
        assert_eq!(state.tunnel.state(), TunnelState::Running);

        // Enabling twice is harmless.
        set_master_enabled(&state, true).await.unwrap();

        set_master_enabled(&state, false).await.unwrap();
        assert!(!is_master_enabled(&state));
        assert_eq!(state.tunnel.state(), TunnelState::Stopped);
    }

    #[tokio::test]
    async fn test_consent_denied_keeps_flag_and_reports() {
        let (state, platform) = test_state(vec![]);
        platform.set_consent(ConsentOutcome::Denied);

        let err = set_master_enabled(&state, true).await.unwrap_err();
        assert_eq!(err.kind(), "ConsentDenied");
        assert!(is_master_enabled(&state));
        assert_eq!(state.tunnel.state(), TunnelState::Stopped);
    }

    #[tokio::test]
    async fn test_import_with_master_enabled_rebuilds_from_imported_rules() {
        let (state, platform) = test_state(vec![]);
        set_master_enabled(&state, true).await.unwrap();

        import_settings(
            &state,
            r#"{"vpn_prefs":{"com.x_wifi":true},"defaults":{"is_firewall_enabled":true}}"#,
        )
        .await
        .unwrap();

        let status = tunnel_status(&state).await.unwrap();
        assert_eq!(status.state, TunnelState::Running);
        assert!(status.excluded.contains("com.x"));
        assert_eq!(
            platform.events().last(),
            Some(&PlatformEvent::Established(2))
        );
    }

    #[tokio::test]
    async fn test_import_disabling_master_stops_tunnel() {
        let (state, _) = test_state(vec![]);
        set_master_enabled(&state, true).await.unwrap();

        import_settings(&state, r#"{"vpn_prefs":{},"defaults":{"is_firewall_enabled":false}}"#)
            .await
            .unwrap();
        assert_eq!(state.tunnel.state(), TunnelState::Stopped);
    }

    #[tokio::test]
    async fn test_failed_import_leaves_tunnel_alone() {
        let (state, platform) = test_state(vec![]);
        state
            .store
            .set_blocked(state.profile, "keep", Transport::Wifi, true)
            .unwrap();
        set_master_enabled(&state, true).await.unwrap();

        let err = import_settings(&state, "{").await.unwrap_err();
        assert_eq!(err.kind(), "Import");
        assert!(state.store.is_blocked(state.profile, "keep", Transport::Wifi));
        assert_eq!(platform.configs().len(), 1);
    }

    #[test]
    fn test_export_contains_defaults() {
        let (state, _) = test_state(vec![]);
        set_theme_mode(&state, ThemeMode::Dark);
        let json = export_settings(&state).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["defaults"]["theme_mode"], "dark");
    }

    #[test]
    fn test_preferences_round_trip_through_settings() {
        let (state, _) = test_state(vec![]);
        set_sort_blocked_first(&state, true);
        set_reboot_reminder_enabled(&state, true);
        set_theme_mode(&state, ThemeMode::Light);

        let settings = get_settings(&state);
        assert!(settings.sort_blocked_first);
        assert!(settings.reboot_reminder_enabled);
        assert_eq!(settings.theme_mode, ThemeMode::Light);
    }

    #[test]
    fn test_select_filter_chip_persists_transition() {
        let (state, _) = test_state(vec![]);
        let next = select_filter_chip(&state, "blocked", true).unwrap();
        assert_eq!(next, BTreeSet::from([FilterChip::User, FilterChip::Blocked]));

        let next = select_filter_chip(&state, "user", false).unwrap();
        assert_eq!(next, BTreeSet::from([FilterChip::All, FilterChip::Blocked]));
        assert_eq!(state.store.selected_filters(), next);

        let err = select_filter_chip(&state, "internet", true).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }
}
