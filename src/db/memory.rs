//! In-memory [`KeyValueStore`] backed by `DashMap`.
//!
//! Each namespace is one map entry, so a namespace is always replaced as a
//! unit; `replace` across several namespaces swaps them one after another.

use std::collections::BTreeMap;

use anyhow::Result;
use dashmap::DashMap;

use super::{KeyValueStore, NamespaceBatch, PrefValue};

/// Thread-safe in-memory store. Keyed by namespace.
#[derive(Default)]
pub struct MemoryStore {
    namespaces: DashMap<String, BTreeMap<String, PrefValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<PrefValue>> {
        Ok(self
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned()))
    }

    fn entries(&self, namespace: &str) -> Result<BTreeMap<String, PrefValue>> {
        Ok(self
            .namespaces
            .get(namespace)
            .map(|ns| ns.value().clone())
            .unwrap_or_default())
    }

    fn commit(&self, namespace: &str, key: &str, value: PrefValue) -> Result<()> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn replace(&self, batches: &[NamespaceBatch]) -> Result<()> {
        for batch in batches {
            self.namespaces
                .insert(batch.namespace.clone(), batch.entries.clone());
        }
        Ok(())
    }
}
