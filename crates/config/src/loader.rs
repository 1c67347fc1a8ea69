use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::TidingsConfig, template::default_config_template};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "tidings.toml",
    "tidings.yaml",
    "tidings.yml",
    "tidings.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<TidingsConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./tidings.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/tidings/tidings.{toml,yaml,yml,json}` (user-global)
///
/// Returns the config together with the file it came from. Falls back to
/// `TidingsConfig::default()` when no file is found or the file is invalid.
pub fn discover_and_load() -> (TidingsConfig, Option<PathBuf>) {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return (TidingsConfig::default(), None);
    };

    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => (cfg, Some(path)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            (TidingsConfig::default(), Some(path))
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/tidings/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tidings").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tidings.toml")
}

/// Resolve the stream store location. Relative paths are taken relative to
/// the directory of the config file, or the working directory when the
/// config came from defaults.
pub fn resolve_streams_path(config: &TidingsConfig, config_path: Option<&Path>) -> PathBuf {
    let path = &config.streams.path;
    if path.is_absolute() {
        return path.clone();
    }
    match config_path.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(path),
        _ => path.clone(),
    }
}

/// Write the documented default template to `path` unless a file already
/// exists there. Returns `true` when a file was written.
pub fn write_default_config(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, default_config_template())?;
    debug!(path = %path.display(), "wrote default config");
    Ok(true)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<TidingsConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
