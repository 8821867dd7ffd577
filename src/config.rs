//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - matchplan.toml (default configuration)
//! - matchplan.local.toml (git-ignored local overrides)
//! - Environment variables (MATCHPLAN_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # matchplan.toml
//! [compiler]
//! verify_plans = true
//! parallel = true
//! num_threads = 4
//!
//! [session]
//! max_bindings = 100000
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! MATCHPLAN_COMPILER__PARALLEL=false
//! MATCHPLAN_SESSION__MAX_BINDINGS=5000
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Constraint compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Check every compiled plan for reads of unbound variables
    #[serde(default = "default_true")]
    pub verify_plans: bool,

    /// Compile the constraints of a set in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Worker threads for parallel compilation (0 = rayon default)
    #[serde(default)]
    pub num_threads: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            verify_plans: true,
            parallel: true,
            num_threads: 0,
        }
    }
}

/// Reference evaluator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on intermediate bindings per evaluation (0 = unlimited)
    #[serde(default = "default_max_bindings")]
    pub max_bindings: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_bindings: default_max_bindings(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_bindings() -> usize {
    1_000_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. matchplan.toml (base configuration)
    /// 2. matchplan.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (MATCHPLAN_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("matchplan.toml"))
            .merge(Toml::file("matchplan.local.toml"))
            .merge(Env::prefixed("MATCHPLAN_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("MATCHPLAN_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.compiler.verify_plans);
        assert!(config.compiler.parallel);
        assert_eq!(config.compiler.num_threads, 0);
        assert_eq!(config.session.max_bindings, 1_000_000);
    }

    #[test]
    fn test_default_logging_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[compiler]"));
        assert!(toml_str.contains("[session]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = Figment::new()
            .merge(Toml::string("[compiler]\nparallel = false\n"))
            .extract()
            .unwrap();
        assert!(!config.compiler.parallel);
        assert!(config.compiler.verify_plans);
        assert_eq!(config.session.max_bindings, 1_000_000);
    }
}
