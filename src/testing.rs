//! Deterministic collaborators for unit tests.

use crate::services::{
    byte_source::{ByteSource, ByteSourceError, ByteSourceResult},
    image_transform::{ImageTransform, ImageTransformError},
};
use bytes::Bytes;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing_subscriber::fmt::MakeWriter;

/// In-memory byte source keyed by locator / path.
#[derive(Default)]
pub struct MemorySource {
    pub remote: HashMap<String, Bytes>,
    pub local: RefCell<HashMap<PathBuf, Bytes>>,
    pub announced_sizes: HashMap<String, u64>,
    /// Payload reads served so far, remote and local.
    pub reads: Cell<usize>,
}

impl MemorySource {
    pub fn with_local(path: impl Into<PathBuf>, bytes: &'static [u8]) -> Self {
        let source = Self::default();
        source
            .local
            .borrow_mut()
            .insert(path.into(), Bytes::from_static(bytes));
        source
    }
}

impl ByteSource for MemorySource {
    fn fetch(&self, locator: &str, _timeout: Duration) -> ByteSourceResult<Bytes> {
        self.reads.set(self.reads.get() + 1);
        self.remote
            .get(locator)
            .cloned()
            .ok_or_else(|| ByteSourceError::NotFound(locator.to_string()))
    }

    fn head_size(&self, locator: &str) -> ByteSourceResult<u64> {
        self.announced_sizes
            .get(locator)
            .copied()
            .ok_or_else(|| ByteSourceError::Unavailable(locator.to_string()))
    }

    fn local_size(&self, path: &Path) -> ByteSourceResult<u64> {
        self.local
            .borrow()
            .get(path)
            .map(|b| b.len() as u64)
            .ok_or_else(|| ByteSourceError::NotFound(path.display().to_string()))
    }

    fn read_local(&self, path: &Path) -> ByteSourceResult<Bytes> {
        self.reads.set(self.reads.get() + 1);
        self.local
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| ByteSourceError::NotFound(path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.local.borrow().contains_key(path)
    }

    fn write_local(&self, path: &Path, bytes: &[u8]) -> ByteSourceResult<()> {
        let mut local = self.local.borrow_mut();
        if local.contains_key(path) {
            return Err(ByteSourceError::AlreadyExists(path.to_path_buf()));
        }
        local.insert(path.to_path_buf(), Bytes::copy_from_slice(bytes));
        Ok(())
    }
}

/// Reports fixed dimensions and records every requested downscale factor.
pub struct FixedImage {
    pub size: (u32, u32),
    pub factors: RefCell<Vec<u32>>,
}

impl FixedImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            factors: RefCell::new(Vec::new()),
        }
    }
}

impl ImageTransform for FixedImage {
    fn dimensions(&self, _bytes: &[u8]) -> Result<(u32, u32), ImageTransformError> {
        Ok(self.size)
    }

    fn downscale(&self, _bytes: &[u8], factor: u32) -> Result<Bytes, ImageTransformError> {
        self.factors.borrow_mut().push(factor);
        Ok(Bytes::from(format!("reduced-by-{}", factor)))
    }
}

/// Collects formatted log output so tests can assert on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Run `f` with a subscriber writing WARN and above into this buffer.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn count(&self, needle: &str) -> usize {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).matches(needle).count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
