//! User preference lookups.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Key of the boolean heading-mode preference. `true` selects
/// compass-normalised yaw, `false` raw FPV yaw.
///
/// The polarity is inverted relative to the Android ground station, which
/// stores `true` under this key for FPV.
pub const PREF_HEADING_MODE: &str = "pref_heading_mode";

/// Read-only view of persisted user preferences.
pub trait Preferences: Send + Sync {
    /// Return the boolean stored under `key`, or `default` when unset.
    fn get_bool(&self, key: &str, default: bool) -> bool;
}

/// In-memory [`Preferences`]. Clones share the same values, so a test or
/// REPL can flip a preference that a running component reads later.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: Arc<RwLock<HashMap<String, bool>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
    }

    /// Builder-style [`MemoryPreferences::set_bool`].
    pub fn with_bool(self, key: &str, value: bool) -> Self {
        self.set_bool(key, value);
        self
    }
}

impl Preferences for MemoryPreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(key).copied())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_key_returns_default() {
        let prefs = MemoryPreferences::new();
        assert!(!prefs.get_bool(PREF_HEADING_MODE, false));
        assert!(prefs.get_bool(PREF_HEADING_MODE, true));
    }

    #[test]
    fn clones_share_values() {
        let prefs = MemoryPreferences::new();
        let view = prefs.clone();
        prefs.set_bool(PREF_HEADING_MODE, true);
        assert!(view.get_bool(PREF_HEADING_MODE, false));
    }
}
