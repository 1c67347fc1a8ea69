//! Executable event sources.
//!
//! The source reference is a path to a program. The program is run with no
//! arguments and must print a JSON array of events on stdout:
//!
//! - exit 0, empty stdout → no events
//! - exit 0, `["text", {"message": "...", "url": "..."}, ...]` → events
//! - non-zero exit → invocation failure, stderr as reason
//! - timeout → the child is killed and the stream skipped
//!
//! `TIDINGS_STREAM` carries the stream name; the working directory is the
//! program's own directory.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use {
    async_trait::async_trait,
    serde_json::Value,
    tokio::process::Command,
    tracing::{debug, warn},
};

use crate::{
    event::Event,
    source::{EventSource, PluginError, SourceLoader},
    types::Stream,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable holding the stream name for the child process.
pub const STREAM_ENV: &str = "TIDINGS_STREAM";

/// Raw OS error for "text file busy", seen when a freshly written program is
/// executed while another thread still holds a write handle to it.
#[cfg(target_os = "linux")]
const ETXTBSY: i32 = 26;

/// Resolves references to executables on disk.
#[derive(Debug, Clone)]
pub struct ProcessLoader {
    timeout: Duration,
}

impl ProcessLoader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessLoader {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

fn resolve(reference: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(reference);
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[async_trait]
impl SourceLoader for ProcessLoader {
    async fn load(
        &self,
        stream: &Stream,
        base_dir: Option<&Path>,
    ) -> Result<Arc<dyn EventSource>, PluginError> {
        let reference = stream.source.trim();
        if reference.is_empty() {
            return Err(PluginError::not_found("<empty>"));
        }

        let path = resolve(reference, base_dir);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PluginError::not_found(path.display().to_string()));
            },
            Err(e) => {
                return Err(PluginError::invocation(reference, e.to_string()));
            },
        };

        if !metadata.is_file() {
            return Err(PluginError::missing_entry_point(reference, "not a regular file"));
        }
        if !is_executable(&metadata) {
            return Err(PluginError::missing_entry_point(reference, "file is not executable"));
        }

        debug!(stream = %stream.name, path = %path.display(), "resolved executable source");
        Ok(Arc::new(ProcessSource {
            reference: reference.to_string(),
            stream_name: stream.name.clone(),
            path,
            timeout: self.timeout,
        }))
    }
}

/// A resolved executable, run once per poll.
#[derive(Debug)]
pub struct ProcessSource {
    reference: String,
    stream_name: String,
    path: PathBuf,
    timeout: Duration,
}

impl ProcessSource {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.env(STREAM_ENV, &self.stream_name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn spawn(&self) -> std::io::Result<tokio::process::Child> {
        #[cfg_attr(not(target_os = "linux"), allow(unused_mut))]
        let mut attempt = 0;
        loop {
            match self.command().spawn() {
                #[cfg(target_os = "linux")]
                Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempt < 5 => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                },
                result => return result,
            }
        }
    }

    fn parse_output(&self, stdout: &str) -> Result<Vec<Event>, PluginError> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => Ok(items.into_iter().map(Event::from).collect()),
            Ok(other) => Err(PluginError::invalid_output(
                &self.reference,
                format!("expected a JSON array, got {}", json_kind(&other)),
            )),
            Err(e) => Err(PluginError::invalid_output(&self.reference, e.to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl EventSource for ProcessSource {
    fn name(&self) -> &str {
        &self.reference
    }

    async fn get_new_events(&self) -> Result<Vec<Event>, PluginError> {
        let child = self
            .spawn()
            .await
            .map_err(|e| PluginError::invocation(&self.reference, format!("spawn failed: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| PluginError::invocation(&self.reference, e.to_string()))?,
            Err(_) => {
                warn!(source = %self.reference, timeout = ?self.timeout, "event source timed out");
                return Err(PluginError::Timeout {
                    reference: self.reference.clone(),
                    timeout: self.timeout,
                });
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            source = %self.reference,
            status = %output.status,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "event source completed"
        );

        if !output.status.success() {
            let reason = match stderr.trim() {
                "" => output.status.to_string(),
                msg => format!("{}: {msg}", output.status),
            };
            return Err(PluginError::invocation(&self.reference, reason));
        }

        self.parse_output(&stdout)
    }
}
