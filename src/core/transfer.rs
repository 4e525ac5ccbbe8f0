//! Whole-state export and import as a JSON document.
//!
//! The document has one object per profile namespace (`"<pkg>_wifi"` /
//! `"<pkg>_data"` → bool) plus a `"defaults"` object with the boolean and
//! string global settings:
//!
//! ```json
//! {
//!   "vpn_prefs": { "com.example_wifi": true },
//!   "defaults": { "is_firewall_enabled": true, "theme_mode": "dark" }
//! }
//! ```
//!
//! Import validates the whole document before touching storage and then
//! replaces every affected namespace in one storage transaction.

use serde_json::{Map, Value};

use crate::config;
use crate::db::{NamespaceBatch, PrefValue};
use crate::error::FirewallError;

use super::rule_store::{FirewallProfile, RuleStore};

impl RuleStore {
    /// Serialize all profiles and settings as pretty-printed JSON (2-space indent).
    pub fn export_all(&self) -> Result<String, FirewallError> {
        let mut document = Map::new();

        for profile in FirewallProfile::ALL {
            let entries = self.storage.entries(profile.namespace()).map_err(|e| {
                FirewallError::Serialization(format!(
                    "Failed to read profile {}: {e:#}",
                    profile.namespace()
                ))
            })?;
            let rules: Map<String, Value> = entries
                .into_iter()
                .filter_map(|(key, value)| value.as_bool().map(|b| (key, Value::Bool(b))))
                .collect();
            document.insert(profile.namespace().to_string(), Value::Object(rules));
        }

        let settings = self
            .storage
            .entries(config::SETTINGS_NAMESPACE)
            .map_err(|e| FirewallError::Serialization(format!("Failed to read settings: {e:#}")))?;
        let defaults: Map<String, Value> = settings
            .into_iter()
            .filter_map(|(key, value)| match value {
                PrefValue::Bool(b) => Some((key, Value::Bool(b))),
                PrefValue::Str(s) => Some((key, Value::String(s))),
                PrefValue::Int(_) => None,
            })
            .collect();
        document.insert(config::EXPORT_DEFAULTS_KEY.to_string(), Value::Object(defaults));

        let json = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| FirewallError::Serialization(e.to_string()))?;
        tracing::info!("Exported {} bytes of settings", json.len());
        Ok(json)
    }

    /// Replace all profiles (and settings, when `"defaults"` is present) from `json`.
    ///
    /// Nothing is written unless the entire document is valid.
    pub fn import_all(&self, json: &str) -> Result<(), FirewallError> {
        let batches = parse_document(json)?;
        self.storage.replace(&batches).map_err(|e| {
            FirewallError::StorageCommit(format!("Failed to store imported settings: {e:#}"))
        })?;
        tracing::info!(
            "Imported settings: {} namespaces replaced",
            batches.len()
        );
        Ok(())
    }
}

fn parse_document(json: &str) -> Result<Vec<NamespaceBatch>, FirewallError> {
    if json.trim().is_empty() {
        return Err(FirewallError::Import("Import document is empty".into()));
    }
    let document: Value = serde_json::from_str(json)?;
    let root = document
        .as_object()
        .ok_or_else(|| FirewallError::Import("Import document must be a JSON object".into()))?;

    let mut batches = Vec::new();

    for profile in FirewallProfile::ALL {
        let namespace = profile.namespace();
        let section = section(root, namespace)?
            .ok_or_else(|| FirewallError::Import(format!("Missing profile section '{namespace}'")))?;

        let mut entries = std::collections::BTreeMap::new();
        for (key, value) in section {
            let blocked = value.as_bool().ok_or_else(|| {
                FirewallError::Import(format!("Rule '{key}' in '{namespace}' is not a boolean"))
            })?;
            entries.insert(key.clone(), PrefValue::Bool(blocked));
        }
        batches.push(NamespaceBatch {
            namespace: namespace.to_string(),
            entries,
        });
    }

    if let Some(section) = section(root, config::EXPORT_DEFAULTS_KEY)? {
        let mut entries = std::collections::BTreeMap::new();
        for (key, value) in section {
            match value {
                Value::Bool(b) => {
                    entries.insert(key.clone(), PrefValue::Bool(*b));
                }
                Value::String(s) => {
                    entries.insert(key.clone(), PrefValue::Str(s.clone()));
                }
                _ => tracing::debug!("Skipping non-bool/string setting '{key}' on import"),
            }
        }
        batches.push(NamespaceBatch {
            namespace: config::SETTINGS_NAMESPACE.to_string(),
            entries,
        });
    }

    Ok(batches)
}

/// Look up an optional object-valued section.
fn section<'a>(
    root: &'a Map<String, Value>,
    name: &str,
) -> Result<Option<&'a Map<String, Value>>, FirewallError> {
    match root.get(name) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(FirewallError::Import(format!(
            "Section '{name}' must be a JSON object"
        ))),
    }
}
