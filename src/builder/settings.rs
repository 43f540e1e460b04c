//! Tunable machine settings.

use crate::core::{InstantiationMode, DEFAULT_TRIM_THRESHOLD, MIN_TRIM_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Runtime knobs that do not belong to the state graph.
///
/// Every field has a default, so partial JSON documents are accepted.
///
/// # Example
///
/// ```rust
/// use solid_state::builder::MachineSettings;
/// use solid_state::core::InstantiationMode;
///
/// let settings = MachineSettings::from_json(r#"{ "instantiation_mode": "per_transition" }"#).unwrap();
/// assert_eq!(settings.instantiation_mode, InstantiationMode::PerTransition);
/// assert_eq!(settings.history_trim_threshold, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Instance caching policy
    pub instantiation_mode: InstantiationMode,

    /// History length that triggers trimming
    pub history_trim_threshold: usize,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            instantiation_mode: InstantiationMode::Singleton,
            history_trim_threshold: DEFAULT_TRIM_THRESHOLD,
        }
    }
}

impl MachineSettings {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.normalized())
    }

    pub fn instantiation_mode(mut self, mode: InstantiationMode) -> Self {
        self.instantiation_mode = mode;
        self
    }

    pub fn history_trim_threshold(mut self, threshold: usize) -> Self {
        self.history_trim_threshold = threshold;
        self
    }

    /// Clamp values to their accepted ranges.
    pub fn normalized(mut self) -> Self {
        self.history_trim_threshold = self.history_trim_threshold.max(MIN_TRIM_THRESHOLD);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_machine_defaults() {
        let settings = MachineSettings::default();
        assert_eq!(settings.instantiation_mode, InstantiationMode::Singleton);
        assert_eq!(settings.history_trim_threshold, 100);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let settings = MachineSettings::from_json("{}").unwrap();
        assert_eq!(settings, MachineSettings::default());
    }

    #[test]
    fn low_threshold_is_clamped() {
        let settings = MachineSettings::from_json(r#"{ "history_trim_threshold": 2 }"#).unwrap();
        assert_eq!(settings.history_trim_threshold, MIN_TRIM_THRESHOLD);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(MachineSettings::from_json(r#"{ "instantiation_mode": "sometimes" }"#).is_err());
    }

    #[test]
    fn fluent_setters_apply() {
        let settings = MachineSettings::default()
            .instantiation_mode(InstantiationMode::PerTransition)
            .history_trim_threshold(25);
        assert_eq!(settings.instantiation_mode, InstantiationMode::PerTransition);
        assert_eq!(settings.history_trim_threshold, 25);
    }
}
