//! In-memory [`ServiceRegistry`] implementation.

use std::collections::HashMap;
use tollgate_kernel::{GatewayError, ServiceRegistry, ServiceRegistryEntry};

/// [`ServiceRegistry`] backed by a simple `HashMap`.
///
/// Filled once at startup and shared read-only behind an `Arc` afterwards.
#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    store: HashMap<String, ServiceRegistryEntry>,
}

impl InMemoryServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ServiceRegistryEntry>,
    ) -> Result<Self, GatewayError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry)?;
        }
        Ok(registry)
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn register(&mut self, entry: ServiceRegistryEntry) -> Result<(), GatewayError> {
        if self.store.contains_key(&entry.name) {
            return Err(GatewayError::DuplicateService(entry.name));
        }
        self.store.insert(entry.name.clone(), entry);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&ServiceRegistryEntry> {
        self.store.get(name)
    }

    fn list_all(&self) -> Vec<&ServiceRegistryEntry> {
        let mut all: Vec<_> = self.store.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
