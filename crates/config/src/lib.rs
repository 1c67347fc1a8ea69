//! Configuration loading, validation, and env substitution.
//!
//! Config files: `tidings.toml`, `tidings.yaml`, or `tidings.json`
//! Searched in `./` then `~/.config/tidings/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{
        config_dir, discover_and_load, find_config_file, find_or_default_config_path, load_config,
        resolve_streams_path, write_default_config,
    },
    schema::{
        DeliveryConfig, DeliveryKind, ScheduleConfig, SourcesConfig, StreamsConfig, TidingsConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
