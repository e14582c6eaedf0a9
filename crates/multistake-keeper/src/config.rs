//! Keeper configuration

use serde::{Deserialize, Serialize};

/// Default module name, also the seed of the escrow account address
pub const DEFAULT_MODULE_NAME: &str = "multistaking";

/// Keeper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Module name; the escrow account is derived from it
    pub module_name: String,
    /// Run invariants every N blocks (0 disables the periodic check)
    pub invariant_check_period: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            invariant_check_period: 1,
        }
    }
}

impl KeeperConfig {
    /// Create config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            module_name: std::env::var("MULTISTAKE_MODULE_NAME")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.module_name),
            invariant_check_period: std::env::var("MULTISTAKE_INVARIANT_CHECK_PERIOD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.invariant_check_period),
        }
    }

    /// Whether the periodic invariant check is due at a height
    pub fn invariants_due(&self, height: i64) -> bool {
        self.invariant_check_period != 0
            && height >= 0
            && (height as u64) % self.invariant_check_period == 0
    }
}
