//! Process configuration.
//!
//! The environment is read on demand; [`set_override`] replaces it for the
//! whole process. Only configuration lives here, never per-call traversal
//! state or caches.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub const ENV_ENABLE_TYPE_INFERENCE_CACHE: &str = "CTY_ENABLE_TYPE_INFERENCE_CACHE";
pub const ENV_MAX_VALIDATION_DEPTH: &str = "CTY_MAX_VALIDATION_DEPTH";
pub const DEFAULT_MAX_VALIDATION_DEPTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtyConfig {
    #[serde(default = "default_true")]
    pub enable_type_inference_cache: bool,

    #[serde(default = "default_max_validation_depth")]
    pub max_validation_depth: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_validation_depth() -> usize {
    DEFAULT_MAX_VALIDATION_DEPTH
}

impl Default for CtyConfig {
    fn default() -> Self {
        CtyConfig {
            enable_type_inference_cache: default_true(),
            max_validation_depth: default_max_validation_depth(),
        }
    }
}

static OVERRIDE: Lazy<RwLock<Option<CtyConfig>>> = Lazy::new(|| RwLock::new(None));

impl CtyConfig {
    /// Defaults, adjusted by whatever environment variables are set.
    pub fn from_env() -> Self {
        let mut config = CtyConfig::default();
        if let Ok(flag) = std::env::var(ENV_ENABLE_TYPE_INFERENCE_CACHE) {
            config.enable_type_inference_cache = is_truthy(&flag);
        }
        if let Ok(depth) = std::env::var(ENV_MAX_VALIDATION_DEPTH) {
            match depth.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_validation_depth = n,
                _ => tracing::warn!(value = %depth, "ignoring invalid {}", ENV_MAX_VALIDATION_DEPTH),
            }
        }
        config
    }

    /// The programmatic override if one is set, else the environment.
    pub fn current() -> Self {
        match OVERRIDE.read().as_ref() {
            Some(config) => config.clone(),
            None => CtyConfig::from_env(),
        }
    }
}

/// Replace (or with `None`, clear) the process-wide configuration override.
pub fn set_override(config: Option<CtyConfig>) {
    *OVERRIDE.write() = config;
}

fn is_truthy(flag: &str) -> bool {
    matches!(
        flag.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
