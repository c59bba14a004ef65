//! Configuration: settings, their sources, and compiled rules.

/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// JSON and source file rule matching
pub mod matcher;
/// Configuration types and settings
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::ConfigManager;
pub use matcher::{
    CompiledRule,
    JsonFileSpec,
    MatcherError,
    RuleSet,
};
pub use types::{
    CheckerSettings,
    ConfigError,
    Rule,
    ServerSettings,
    ValidationError,
};
