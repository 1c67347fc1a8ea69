//! TOML file-backed stream store with atomic writes.

use std::{
    ffi::OsString,
    io::Write,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    tokio::fs,
    tracing::{debug, warn},
};

use crate::{
    Error, Result, codec,
    error::Context,
    store::StreamStore,
    types::Stream,
};

/// Stream definitions in a single hand-editable TOML file.
pub struct FileStore {
    path: PathBuf,
    base_dir: Option<PathBuf>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| Some(PathBuf::from(".")));
        Self { path, base_dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic write: keep the previous file as `.bak`, write a uniquely named
    /// temp file next to the target, rename it over the target.
    async fn atomic_write(&self, contents: String) -> Result<()> {
        self.ensure_parent().await?;

        if fs::try_exists(&self.path).await.unwrap_or(false)
            && let Err(e) = fs::copy(&self.path, sibling(&self.path, "bak")).await
        {
            warn!(path = %self.path.display(), error = %e, "failed to back up stream store");
        }

        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || replace_file(&path, &contents))
            .await
            .map_err(std::io::Error::other)?;
        written.with_context(|| format!("failed to replace {}", self.path.display()))
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Write `contents` to a fresh temp file in `path`'s directory and persist it
/// as `path`. Concurrent writers never share a temp file.
fn replace_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut prefix = OsString::from(".");
    prefix.push(path.file_name().unwrap_or_default());
    prefix.push(".");

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// `streams.toml` → `streams.toml.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[async_trait]
impl StreamStore for FileStore {
    async fn load(&self) -> Result<Vec<Stream>> {
        self.ensure_exists().await?;
        let data = fs::read_to_string(&self.path).await?;
        let streams = codec::decode(&data).map_err(|e| Error::parse(&self.path, e))?;
        debug!(path = %self.path.display(), count = streams.len(), "loaded streams");
        Ok(streams)
    }

    async fn save(&self, streams: &[Stream]) -> Result<()> {
        self.atomic_write(codec::encode(streams)?).await?;
        debug!(path = %self.path.display(), count = streams.len(), "saved streams");
        Ok(())
    }

    async fn ensure_exists(&self) -> Result<()> {
        if fs::try_exists(&self.path).await? {
            return Ok(());
        }
        self.ensure_parent().await?;
        // `create_new` so a concurrent creator's file is never clobbered.
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                file.write_all(codec::EMPTY_STORE.as_bytes()).await?;
                file.flush().await?;
                debug!(path = %self.path.display(), "created empty stream store");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }
}
