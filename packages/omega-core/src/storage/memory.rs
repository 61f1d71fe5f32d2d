use parking_lot::RwLock;
use std::collections::HashMap;

use super::SessionStorage;
use crate::error::Result;

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    memory: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn retrieve(&self, key: &str) -> Result<Option<String>> {
        Ok(self.memory.read().get(key).cloned())
    }

    fn store_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut memory = self.memory.write();
        for (key, value) in entries {
            memory.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn delete_all(&self, keys: &[&str]) -> Result<()> {
        let mut memory = self.memory.write();
        for key in keys {
            memory.remove(*key);
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
