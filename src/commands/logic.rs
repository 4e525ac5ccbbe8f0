//! Pure decision functions behind the command handlers.
//!
//! These take plain parameters (no shared state) and can be unit-tested
//! without a storage backend or tunnel worker.

use crate::core::{AppRule, Transport};
use crate::error::FirewallError;

/// Rule written to every toggle target: the clicked app's rule with one transport flipped.
pub fn toggled_rule(clicked: AppRule, transport: Transport) -> AppRule {
    clicked.with_blocked(transport, !clicked.is_blocked(transport))
}

/// Packages a toggle applies to.
///
/// A non-empty multi-selection wins over the clicked package. Duplicates are
/// dropped, first occurrence kept.
pub fn toggle_targets(clicked: &str, selection: &[String]) -> Vec<String> {
    if selection.is_empty() {
        return vec![clicked.to_string()];
    }
    let mut targets: Vec<String> = Vec::with_capacity(selection.len());
    for package in selection {
        if !targets.contains(package) {
            targets.push(package.clone());
        }
    }
    targets
}

/// Reject empty package names before anything is written.
pub fn validate_packages(packages: &[String]) -> Result<(), FirewallError> {
    if packages.iter().any(|p| p.trim().is_empty()) {
        return Err(FirewallError::InvalidInput(
            "Package name must not be empty".into(),
        ));
    }
    Ok(())
}
