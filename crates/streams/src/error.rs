use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The stream store exists but cannot be parsed.
    #[error("failed to parse stream store {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to encode stream store: {0}")]
    Encode(#[from] toml::ser::Error),

    /// An I/O failure with the operation that hit it.
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn parse(path: &Path, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl tidings_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

tidings_common::impl_context!();
