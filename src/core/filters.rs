//! Filter chips for the app list and the pure logic behind them.
//!
//! Chips form two groups. Type chips (`all`, `user`, `system`) are mutually
//! exclusive and at least one is always selected. Status chips (`allowed`,
//! `blocked`) are mutually exclusive but may both be off.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::apps::AppEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterChip {
    All,
    User,
    System,
    Allowed,
    Blocked,
}

impl FilterChip {
    pub const ALL: [FilterChip; 5] = [
        FilterChip::All,
        FilterChip::User,
        FilterChip::System,
        FilterChip::Allowed,
        FilterChip::Blocked,
    ];

    pub fn id(self) -> &'static str {
        match self {
            FilterChip::All => "all",
            FilterChip::User => "user",
            FilterChip::System => "system",
            FilterChip::Allowed => "allowed",
            FilterChip::Blocked => "blocked",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// Checked state before the user has touched any chip.
    pub fn default_checked(self) -> bool {
        self == FilterChip::User
    }

    fn is_type_chip(self) -> bool {
        matches!(self, FilterChip::All | FilterChip::User | FilterChip::System)
    }
}

/// Compute the chip selection after `toggled` is checked or unchecked.
pub fn apply_chip_transition(
    current: &BTreeSet<FilterChip>,
    toggled: FilterChip,
    checked: bool,
) -> BTreeSet<FilterChip> {
    use FilterChip::*;

    let mut next = current.clone();
    match (toggled, checked) {
        (All, true) => {
            next.retain(|c| !c.is_type_chip());
            next.insert(All);
        }
        (User, true) | (System, true) => {
            next.retain(|c| !c.is_type_chip());
            next.insert(toggled);
        }
        (Allowed, true) => {
            next.remove(&Blocked);
            next.insert(Allowed);
        }
        (Blocked, true) => {
            next.remove(&Allowed);
            next.insert(Blocked);
        }
        (All, false) => {
            next.clear();
            next.insert(User);
        }
        (User, false) | (System, false) => {
            next.remove(&toggled);
            if !next.iter().any(|c| c.is_type_chip()) {
                next.insert(All);
            }
        }
        (Allowed, false) | (Blocked, false) => {
            next.remove(&toggled);
        }
    }
    next
}

/// Filter `apps` by search query and chips, then sort by label
/// (optionally putting apps blocked on any transport first).
pub fn filter_and_sort(
    apps: &[AppEntry],
    filters: &BTreeSet<FilterChip>,
    query: Option<&str>,
    blocked_first: bool,
) -> Vec<AppEntry> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut visible: Vec<AppEntry> = apps
        .iter()
        .filter(|app| match &query {
            Some(q) => app.label.to_lowercase().contains(q),
            None => true,
        })
        .filter(|app| {
            if filters.contains(&FilterChip::User) {
                !app.is_system
            } else if filters.contains(&FilterChip::System) {
                app.is_system
            } else {
                true
            }
        })
        .filter(|app| {
            if filters.contains(&FilterChip::Allowed) {
                !app.rule.any_blocked()
            } else if filters.contains(&FilterChip::Blocked) {
                app.rule.any_blocked()
            } else {
                true
            }
        })
        .cloned()
        .collect();

    if blocked_first {
        visible.sort_by_cached_key(|a| (!a.rule.any_blocked(), a.label.to_lowercase()));
    } else {
        visible.sort_by_cached_key(|a| a.label.to_lowercase());
    }
    visible
}
