//! Global settings stored alongside the rules.
//!
//! The master switch gates enforcement, so it is committed like a block flag.
//! Everything else here is cosmetic and written with `apply`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config;
use crate::db::PrefValue;
use crate::error::FirewallError;

use super::filters::FilterChip;
use super::rule_store::RuleStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn storage_value(self) -> &'static str {
        match self {
            ThemeMode::System => "system",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    /// Unknown or missing values fall back to [`ThemeMode::System`].
    pub fn from_storage(value: Option<&str>) -> Self {
        match value {
            Some("light") => ThemeMode::Light,
            Some("dark") => ThemeMode::Dark,
            _ => ThemeMode::System,
        }
    }
}

/// Snapshot of every global setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalSettings {
    pub master_enabled: bool,
    pub sort_blocked_first: bool,
    pub reboot_reminder_enabled: bool,
    pub theme_mode: ThemeMode,
    /// Keyed by chip id.
    pub filter_chips: BTreeMap<String, bool>,
}

fn chip_key(chip: FilterChip) -> String {
    format!("{}{}", config::FILTER_CHIP_KEY_PREFIX, chip.id())
}

impl RuleStore {
    pub fn is_master_enabled(&self) -> bool {
        self.read_bool(config::SETTINGS_NAMESPACE, config::KEY_MASTER_ENABLED, false)
    }

    pub fn set_master_enabled(&self, enabled: bool) -> Result<(), FirewallError> {
        self.storage
            .commit(
                config::SETTINGS_NAMESPACE,
                config::KEY_MASTER_ENABLED,
                PrefValue::Bool(enabled),
            )
            .map_err(|e| FirewallError::StorageCommit(format!("Failed to store master switch: {e:#}")))
    }

    pub fn is_sort_blocked_first(&self) -> bool {
        self.read_bool(config::SETTINGS_NAMESPACE, config::KEY_SORT_BLOCKED_FIRST, false)
    }

    pub fn set_sort_blocked_first(&self, enabled: bool) {
        self.storage.apply(
            config::SETTINGS_NAMESPACE,
            config::KEY_SORT_BLOCKED_FIRST,
            PrefValue::Bool(enabled),
        );
    }

    pub fn is_reboot_reminder_enabled(&self) -> bool {
        self.read_bool(config::SETTINGS_NAMESPACE, config::KEY_REBOOT_REMINDER, false)
    }

    pub fn set_reboot_reminder_enabled(&self, enabled: bool) {
        self.storage.apply(
            config::SETTINGS_NAMESPACE,
            config::KEY_REBOOT_REMINDER,
            PrefValue::Bool(enabled),
        );
    }

    pub fn theme_mode(&self) -> ThemeMode {
        match self.storage.get(config::SETTINGS_NAMESPACE, config::KEY_THEME_MODE) {
            Ok(value) => ThemeMode::from_storage(value.as_ref().and_then(PrefValue::as_str)),
            Err(e) => {
                tracing::warn!("Failed to read theme mode: {e:#}");
                ThemeMode::default()
            }
        }
    }

    pub fn set_theme_mode(&self, mode: ThemeMode) {
        self.storage.apply(
            config::SETTINGS_NAMESPACE,
            config::KEY_THEME_MODE,
            PrefValue::Str(mode.storage_value().to_string()),
        );
    }

    pub fn filter_chip_state(&self, chip: FilterChip) -> bool {
        self.read_bool(config::SETTINGS_NAMESPACE, &chip_key(chip), chip.default_checked())
    }

    pub fn set_filter_chip_state(&self, chip: FilterChip, checked: bool) {
        self.storage
            .apply(config::SETTINGS_NAMESPACE, &chip_key(chip), PrefValue::Bool(checked));
    }

    /// Currently checked chips.
    pub fn selected_filters(&self) -> BTreeSet<FilterChip> {
        FilterChip::ALL
            .into_iter()
            .filter(|chip| self.filter_chip_state(*chip))
            .collect()
    }

    /// Persist the checked state of every chip from `selected`.
    pub fn save_selected_filters(&self, selected: &BTreeSet<FilterChip>) {
        for chip in FilterChip::ALL {
            self.set_filter_chip_state(chip, selected.contains(&chip));
        }
    }

    pub fn settings(&self) -> GlobalSettings {
        GlobalSettings {
            master_enabled: self.is_master_enabled(),
            sort_blocked_first: self.is_sort_blocked_first(),
            reboot_reminder_enabled: self.is_reboot_reminder_enabled(),
            theme_mode: self.theme_mode(),
            filter_chips: FilterChip::ALL
                .into_iter()
                .map(|chip| (chip.id().to_string(), self.filter_chip_state(chip)))
                .collect(),
        }
    }
}
