//! Durable key-value persistence for rules and settings.
//!
//! Data lives in flat namespaces of `key → PrefValue`: one namespace per
//! firewall profile and one for global settings. Two backends implement
//! [`KeyValueStore`]:
//! - [`Database`]: SQLite via `rusqlite` (bundled, WAL)
//! - [`MemoryStore`]: concurrent in-memory map, used by tests and ephemeral setups

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// A single stored preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PrefValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrefValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PrefValue::Bool(_) => "bool",
            PrefValue::Int(_) => "int",
            PrefValue::Str(_) => "str",
        }
    }

    fn to_sql(&self) -> Value {
        match self {
            PrefValue::Bool(b) => Value::Integer(*b as i64),
            PrefValue::Int(i) => Value::Integer(*i),
            PrefValue::Str(s) => Value::Text(s.clone()),
        }
    }
}

/// Full replacement contents for one namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceBatch {
    pub namespace: String,
    pub entries: BTreeMap<String, PrefValue>,
}

/// Namespaced key-value storage.
///
/// `commit` must be durable before it returns. `apply` may defer or drop
/// failures and is reserved for cosmetic values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<PrefValue>>;

    /// All entries of a namespace, ordered by key.
    fn entries(&self, namespace: &str) -> Result<BTreeMap<String, PrefValue>>;

    fn commit(&self, namespace: &str, key: &str, value: PrefValue) -> Result<()>;

    /// Clear each listed namespace and write its entries, all or nothing.
    fn replace(&self, batches: &[NamespaceBatch]) -> Result<()>;

    fn apply(&self, namespace: &str, key: &str, value: PrefValue) {
        if let Err(e) = self.commit(namespace, key, value) {
            tracing::warn!("Deferred write of {namespace}/{key} failed: {e:#}");
        }
    }
}

/// SQLite-backed [`KeyValueStore`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // WAL gives readers a consistent view while a commit is in flight.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS preferences (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                kind TEXT NOT NULL,
                value NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for Database {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<PrefValue>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare_cached(
            "SELECT kind, value FROM preferences WHERE namespace = ?1 AND key = ?2",
        )?;
        let mut rows = stmt.query(params![namespace, key])?;
        let value = match rows.next()? {
            Some(row) => Some(decode_value(row)?),
            None => None,
        };
        Ok(value)
    }

    fn entries(&self, namespace: &str) -> Result<BTreeMap<String, PrefValue>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare_cached(
            "SELECT key, kind, value FROM preferences WHERE namespace = ?1",
        )?;
        let mut rows = stmt.query(params![namespace])?;

        let mut results = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let kind: String = row.get(1)?;
            results.insert(key, decode_columns(&kind, row, 2)?);
        }
        Ok(results)
    }

    fn commit(&self, namespace: &str, key: &str, value: PrefValue) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO preferences (namespace, key, kind, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![namespace, key, value.kind(), value.to_sql()],
        )?;
        Ok(())
    }

    fn replace(&self, batches: &[NamespaceBatch]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO preferences (namespace, key, kind, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for batch in batches {
                tx.execute(
                    "DELETE FROM preferences WHERE namespace = ?1",
                    params![batch.namespace],
                )?;
                for (key, value) in &batch.entries {
                    insert.execute(params![batch.namespace, key, value.kind(), value.to_sql()])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn decode_value(row: &rusqlite::Row) -> Result<PrefValue> {
    let kind: String = row.get(0)?;
    decode_columns(&kind, row, 1)
}

fn decode_columns(kind: &str, row: &rusqlite::Row, idx: usize) -> Result<PrefValue> {
    Ok(match kind {
        "bool" => PrefValue::Bool(row.get::<_, i64>(idx)? != 0),
        "int" => PrefValue::Int(row.get(idx)?),
        "str" => PrefValue::Str(row.get(idx)?),
        other => bail!("unknown preference kind '{other}'"),
    })
}
