use dashmap::DashMap;

/// Key/value storage that lives as long as one client session.
///
/// Created once at startup and handed to whatever needs per-session flags;
/// nothing in it survives a restart.
pub struct SessionStorage {
    entries: DashMap<String, String>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// True when `key` holds the literal `"true"`
    pub fn flag(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.value() == "true")
            .unwrap_or(false)
    }

    pub fn set_flag(&self, key: &str) {
        self.set(key, "true");
    }
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_roundtrip() {
        let storage = SessionStorage::new();
        assert!(!storage.flag("splashShown"));

        storage.set_flag("splashShown");
        assert!(storage.flag("splashShown"));

        storage.set("splashShown", "false");
        assert!(!storage.flag("splashShown"));
    }

    #[test]
    fn test_flags_are_per_key() {
        let storage = SessionStorage::new();
        storage.set_flag("a");
        storage.set("b", "yes");

        assert!(storage.flag("a"));
        assert!(!storage.flag("b"));
        assert!(!storage.flag("c"));
    }
}
