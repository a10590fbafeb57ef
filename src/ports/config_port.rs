//! Configuration access port trait.

use crate::domain::error::PulsetraderError;

/// Typed access to run configuration. Required keys surface as
/// `ConfigMissing`/`ConfigInvalid`; optional keys take a caller default.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    fn require_string(&self, section: &str, key: &str) -> Result<String, PulsetraderError> {
        self.get_string(section, key)
            .ok_or_else(|| PulsetraderError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
