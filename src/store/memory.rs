use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::Result;

use super::KeyValueStore;

/// In-memory store. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every slot, as if the durable store had been wiped externally.
    pub fn wipe(&self) {
        self.slots.borrow_mut().clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, raw: &str) -> Result<()> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
        Ok(())
    }
}
