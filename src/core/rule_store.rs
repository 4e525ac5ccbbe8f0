//! Durable per-app, per-transport block flags.
//!
//! Rules are stored flat inside a profile namespace as `"<package>_wifi"` and
//! `"<package>_data"` boolean keys. An app has no entry until it is first
//! edited; absent keys read as "allowed". Entries are never removed when an
//! app is uninstalled, only when a copy or import overwrites the profile.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::{KeyValueStore, NamespaceBatch, PrefValue};
use crate::error::FirewallError;

/// A named bucket of per-app rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallProfile {
    /// Rules enforced through the local VPN tunnel.
    Vpn,
}

impl FirewallProfile {
    pub const ALL: &'static [FirewallProfile] = &[FirewallProfile::Vpn];

    /// Storage namespace, also used as the profile's key in export documents.
    pub fn namespace(self) -> &'static str {
        match self {
            FirewallProfile::Vpn => "vpn_prefs",
        }
    }
}

/// Network medium a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Wifi,
    Data,
}

impl Transport {
    pub const ALL: [Transport; 2] = [Transport::Wifi, Transport::Data];

    pub fn suffix(self) -> &'static str {
        match self {
            Transport::Wifi => "wifi",
            Transport::Data => "data",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.suffix() == suffix)
    }
}

/// Block flags for one package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRule {
    pub wifi_blocked: bool,
    pub data_blocked: bool,
}

impl AppRule {
    pub fn is_blocked(&self, transport: Transport) -> bool {
        match transport {
            Transport::Wifi => self.wifi_blocked,
            Transport::Data => self.data_blocked,
        }
    }

    pub fn with_blocked(mut self, transport: Transport, blocked: bool) -> Self {
        match transport {
            Transport::Wifi => self.wifi_blocked = blocked,
            Transport::Data => self.data_blocked = blocked,
        }
        self
    }

    /// Blocked on at least one transport.
    pub fn any_blocked(&self) -> bool {
        self.wifi_blocked || self.data_blocked
    }
}

/// Storage key of a package's flag for one transport.
pub fn rule_key(package: &str, transport: Transport) -> String {
    format!("{package}_{}", transport.suffix())
}

/// Split a rule key back into package and transport.
pub fn parse_rule_key(key: &str) -> Option<(&str, Transport)> {
    let (package, suffix) = key.rsplit_once('_')?;
    let transport = Transport::from_suffix(suffix)?;
    if package.is_empty() {
        return None;
    }
    Some((package, transport))
}

/// Rule and settings store over an injected [`KeyValueStore`].
///
/// Cloning is cheap; all clones share the same backend.
#[derive(Clone)]
pub struct RuleStore {
    pub(crate) storage: Arc<dyn KeyValueStore>,
}

impl RuleStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Persist one block flag. Returns only after the write is durable.
    pub fn set_blocked(
        &self,
        profile: FirewallProfile,
        package: &str,
        transport: Transport,
        blocked: bool,
    ) -> Result<(), FirewallError> {
        if package.is_empty() {
            return Err(FirewallError::InvalidInput(
                "Package name must not be empty".into(),
            ));
        }
        self.storage
            .commit(
                profile.namespace(),
                &rule_key(package, transport),
                PrefValue::Bool(blocked),
            )
            .map_err(|e| {
                FirewallError::StorageCommit(format!(
                    "Failed to store {} rule for {package}: {e:#}",
                    transport.suffix()
                ))
            })?;
        tracing::debug!(
            "Set {package} {} blocked={blocked} in {}",
            transport.suffix(),
            profile.namespace()
        );
        Ok(())
    }

    pub fn is_blocked(&self, profile: FirewallProfile, package: &str, transport: Transport) -> bool {
        self.read_bool(profile.namespace(), &rule_key(package, transport), false)
    }

    /// Both flags of a package.
    pub fn rule(&self, profile: FirewallProfile, package: &str) -> AppRule {
        AppRule {
            wifi_blocked: self.is_blocked(profile, package, Transport::Wifi),
            data_blocked: self.is_blocked(profile, package, Transport::Data),
        }
    }

    /// Packages blocked for `transport`, derived by scanning the whole profile.
    pub fn blocked_packages(&self, profile: FirewallProfile, transport: Transport) -> BTreeSet<String> {
        self.entries_or_empty(profile.namespace())
            .iter()
            .filter(|(_, value)| value.as_bool() == Some(true))
            .filter_map(|(key, _)| parse_rule_key(key))
            .filter(|(_, t)| *t == transport)
            .map(|(package, _)| package.to_string())
            .collect()
    }

    /// Replace `to` with every boolean entry of `from`. Other value kinds are dropped.
    pub fn copy(&self, from: FirewallProfile, to: FirewallProfile) -> Result<(), FirewallError> {
        self.copy_namespace(from.namespace(), to.namespace())
    }

    fn copy_namespace(&self, from: &str, to: &str) -> Result<(), FirewallError> {
        let source = self.storage.entries(from).map_err(|e| {
            FirewallError::StorageCommit(format!("Failed to read profile {from}: {e:#}"))
        })?;
        let entries: BTreeMap<String, PrefValue> = source
            .into_iter()
            .filter(|(_, value)| value.as_bool().is_some())
            .collect();
        let copied = entries.len();

        self.storage
            .replace(&[NamespaceBatch {
                namespace: to.to_string(),
                entries,
            }])
            .map_err(|e| {
                FirewallError::StorageCommit(format!("Failed to write profile {to}: {e:#}"))
            })?;
        tracing::info!("Copied {copied} rules from {from} to {to}");
        Ok(())
    }

    pub(crate) fn read_bool(&self, namespace: &str, key: &str, default: bool) -> bool {
        match self.storage.get(namespace, key) {
            Ok(value) => value.and_then(|v| v.as_bool()).unwrap_or(default),
            Err(e) => {
                tracing::warn!("Failed to read {namespace}/{key}: {e:#}");
                default
            }
        }
    }

    pub(crate) fn entries_or_empty(&self, namespace: &str) -> BTreeMap<String, PrefValue> {
        self.storage.entries(namespace).unwrap_or_else(|e| {
            tracing::warn!("Failed to read namespace {namespace}: {e:#}");
            BTreeMap::new()
        })
    }
}
