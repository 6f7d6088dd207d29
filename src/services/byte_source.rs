//! src/services/byte_source.rs
//!
//! Where bitstream bytes come from and go to. The model only talks to the
//! [`ByteSource`] trait; [`StdByteSource`] is the stock implementation using
//! the local disk and a blocking HTTP client for `http(s)://` locators.

use crate::config::SafConfig;
use bytes::Bytes;
use reqwest::{blocking::Client, header::CONTENT_LENGTH};
use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ByteSourceError {
    #[error("network error fetching `{locator}`: {reason}")]
    Network { locator: String, reason: String },
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("size of `{0}` unavailable")]
    Unavailable(String),
    #[error("`{}` already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ByteSourceResult<T> = Result<T, ByteSourceError>;

/// Capability for reading and writing bitstream payloads.
pub trait ByteSource {
    /// Fetch a remote resource.
    fn fetch(&self, locator: &str, timeout: Duration) -> ByteSourceResult<Bytes>;

    /// Size announced by the remote resource, without downloading it.
    fn head_size(&self, locator: &str) -> ByteSourceResult<u64>;

    fn local_size(&self, path: &Path) -> ByteSourceResult<u64>;

    fn read_local(&self, path: &Path) -> ByteSourceResult<Bytes>;

    /// Whether a local file already occupies `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Write a new file; fails with `AlreadyExists` instead of overwriting.
    fn write_local(&self, path: &Path, bytes: &[u8]) -> ByteSourceResult<()>;
}

/// Local disk plus blocking `reqwest` client.
#[derive(Clone, Debug)]
pub struct StdByteSource {
    client: Client,
}

impl StdByteSource {
    pub fn new(user_agent: &str) -> ByteSourceResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|err| ByteSourceError::Network {
                locator: String::new(),
                reason: err.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn from_config(cfg: &SafConfig) -> ByteSourceResult<Self> {
        Self::new(&cfg.user_agent)
    }
}

fn map_not_found(err: io::Error, path: &Path) -> ByteSourceError {
    if err.kind() == ErrorKind::NotFound {
        ByteSourceError::NotFound(path.display().to_string())
    } else {
        ByteSourceError::Io(err)
    }
}

impl ByteSource for StdByteSource {
    fn fetch(&self, locator: &str, timeout: Duration) -> ByteSourceResult<Bytes> {
        debug!("fetching remote bitstream {}", locator);
        let network = |err: reqwest::Error| ByteSourceError::Network {
            locator: locator.to_string(),
            reason: err.to_string(),
        };
        let response = self
            .client
            .get(locator)
            .timeout(timeout)
            .send()
            .map_err(network)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ByteSourceError::NotFound(locator.to_string()));
        }
        response
            .error_for_status()
            .and_then(|r| r.bytes())
            .map_err(network)
    }

    fn head_size(&self, locator: &str) -> ByteSourceResult<u64> {
        let network = |err: reqwest::Error| ByteSourceError::Network {
            locator: locator.to_string(),
            reason: err.to_string(),
        };
        let response = self.client.head(locator).send().map_err(network)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ByteSourceError::NotFound(locator.to_string()));
        }
        response
            .error_for_status()
            .map_err(network)?
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ByteSourceError::Unavailable(locator.to_string()))
    }

    fn local_size(&self, path: &Path) -> ByteSourceResult<u64> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|err| map_not_found(err, path))
    }

    fn read_local(&self, path: &Path) -> ByteSourceResult<Bytes> {
        fs::read(path)
            .map(Bytes::from)
            .map_err(|err| map_not_found(err, path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Writes to a sibling temp file, then renames it into place, so a
    /// failed write never leaves a partial file under the final name.
    fn write_local(&self, path: &Path, bytes: &[u8]) -> ByteSourceResult<()> {
        if self.exists(path) {
            return Err(ByteSourceError::AlreadyExists(path.to_path_buf()));
        }
        let parent = path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ByteSourceError::Io(io::Error::new(
                ErrorKind::Other,
                "destination path missing parent directory",
            ))
        })?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(err) = written.and_then(|_| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ByteSourceError::Io(err));
        }
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
