//! Core logic: rule storage, settings, import/export, filtering, restart coalescing.
//!
//! - [`RuleStore`]: per-app, per-transport block flags over a [`KeyValueStore`](crate::db::KeyValueStore)
//! - [`settings`]: master switch, sort, theme and filter-chip preferences
//! - [`transfer`]: whole-state JSON export/import
//! - [`filters`]: filter-chip transitions and app list filtering
//! - [`apps`]: installed-app inventory merged with rules
//! - [`RestartCoordinator`]: collapses rule-edit bursts into one tunnel rebuild

pub mod apps;
pub mod filters;
pub mod restart;
pub mod rule_store;
pub mod settings;
pub mod transfer;

pub use apps::{AppCatalog, AppEntry, InstalledApp};
pub use filters::{apply_chip_transition, filter_and_sort, FilterChip};
pub use restart::RestartCoordinator;
pub use rule_store::{AppRule, FirewallProfile, RuleStore, Transport};
pub use settings::{GlobalSettings, ThemeMode};
