//! Instance registry
//!
//! (project, instance) pairs are opaque namespace keys; each maps to an
//! `Instance` owning that namespace's tables. Instances are created on
//! first use and live for the process lifetime; there is no persistence.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, TabletError};

use super::table::Table;

/// Opaque namespace key for one connected client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub project: String,
    pub instance: String,
}

impl InstanceKey {
    /// Validate non-emptiness; no other interpretation is applied.
    pub fn new(project: impl Into<String>, instance: impl Into<String>) -> Result<Self> {
        let key = Self {
            project: project.into(),
            instance: instance.into(),
        };
        if key.project.is_empty() || key.instance.is_empty() {
            return Err(TabletError::InvalidArgument(
                "project and instance must be non-empty".to_string(),
            ));
        }
        Ok(key)
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project, self.instance)
    }
}

/// All tables belonging to one (project, instance) pair.
#[derive(Default)]
pub struct Instance {
    tables: DashMap<String, Arc<Table>>,
}

impl Instance {
    /// Create a table. Table names are case-sensitive exact strings;
    /// creating an existing name fails with AlreadyExists.
    pub fn create_table(&self, name: &str) -> Result<Arc<Table>> {
        match self.tables.entry(name.to_string()) {
            Entry::Occupied(_) => Err(TabletError::AlreadyExists(format!("table {:?}", name))),
            Entry::Vacant(slot) => {
                let table = Arc::new(Table::new(name));
                slot.insert(table.clone());
                Ok(table)
            }
        }
    }

    /// Delete a table and all its rows immediately. The name is reusable
    /// right away. Fails with NotFound if absent.
    pub fn delete_table(&self, name: &str) -> Result<()> {
        match self.tables.remove(name) {
            Some(_) => Ok(()),
            None => Err(TabletError::NotFound(format!("table {:?}", name))),
        }
    }

    /// Resolve a table or fail fast with NotFound. Every data operation
    /// goes through here before touching row state.
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TabletError::NotFound(format!("table {:?}", name)))
    }

    /// Sorted names of every table in the instance.
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Top-level map from namespace key to instance.
#[derive(Default)]
pub struct Registry {
    namespaces: DashMap<InstanceKey, Arc<Instance>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (creating on demand) the instance for a namespace.
    pub fn instance(&self, key: &InstanceKey) -> Arc<Instance> {
        self.namespaces
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Instance::default()))
            .clone()
    }
}
