//! Configuration validation.
//!
//! Checks a TOML configuration file for syntax and type errors, unknown
//! sections, and settings that would make `tidings serve` misbehave.

use std::path::{Path, PathBuf};

use crate::{
    env_subst::substitute_env,
    schema::{DeliveryKind, TidingsConfig},
};

/// Top-level sections understood by [`TidingsConfig`].
const KNOWN_SECTIONS: &[&str] = &["streams", "sources", "schedule", "delivery"];

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "type-error", "unknown-field", "schedule", "delivery", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "schedule.time"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => validate_toml_str(&substitute_env(&content)),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    if let Some(table) = toml_value.as_table() {
        for key in table.keys() {
            if !KNOWN_SECTIONS.contains(&key.as_str()) {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "unknown-field",
                    key.clone(),
                    format!("unknown section '{key}'"),
                ));
            }
        }
    }

    match toml::from_str::<TidingsConfig>(toml_str) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_semantics(config: &TidingsConfig, diagnostics: &mut Vec<Diagnostic>) {
    if let Err(e) = config.schedule.parsed_time() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "schedule",
            "schedule.time",
            e.to_string(),
        ));
    }

    if let Err(e) = config.schedule.parsed_timezone() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "schedule",
            "schedule.timezone",
            e.to_string(),
        ));
    }

    if config.sources.timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "schedule",
            "sources.timeout_secs",
            "timeout of 0 seconds makes every event source time out",
        ));
    }

    if config.delivery.kind == DeliveryKind::Webhook {
        match config.delivery.webhook_url.as_deref().map(str::trim) {
            None | Some("") => diagnostics.push(Diagnostic::new(
                Severity::Error,
                "delivery",
                "delivery.webhook_url",
                "delivery.kind is \"webhook\" but no webhook_url is set",
            )),
            Some(url) if url.contains("${") => diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "delivery",
                "delivery.webhook_url",
                format!("unresolved environment variable in webhook_url: {url}"),
            )),
            Some(_) => {},
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn paths(result: &ValidationResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn empty_config_is_valid() {
        let result = validate_toml_str("");
        assert!(
            !result.has_errors(),
            "empty config should be valid, got: {:?}",
            result.diagnostics
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("[schedule\ntime = ");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_detected() {
        let result = validate_toml_str("[sources]\ntimeout_secs = \"soon\"\n");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn unknown_section_warned() {
        let result = validate_toml_str("[sheduel]\ntime = \"10:00\"\n");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(paths(&result), vec!["sheduel"]);
    }

    #[test]
    fn bad_schedule_reported() {
        let result =
            validate_toml_str("[schedule]\ntime = \"25:99\"\ntimezone = \"Mars/Olympus\"\n");
        assert_eq!(result.count(Severity::Error), 2);
        assert_eq!(paths(&result), vec!["schedule.time", "schedule.timezone"]);
    }

    #[test]
    fn webhook_without_url_is_error() {
        let result = validate_toml_str("[delivery]\nkind = \"webhook\"\n");
        assert!(result.has_errors());
        assert_eq!(paths(&result), vec!["delivery.webhook_url"]);
    }

    #[test]
    fn webhook_with_unresolved_env_warned() {
        let result = validate_toml_str(
            "[delivery]\nkind = \"webhook\"\nwebhook_url = \"${TIDINGS_UNSET_FOR_TEST}\"\n",
        );
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = validate(Some(Path::new("/nonexistent/tidings.toml")));
        assert!(result.has_errors());
        assert_eq!(
            result.config_path,
            Some(PathBuf::from("/nonexistent/tidings.toml"))
        );
    }
}
