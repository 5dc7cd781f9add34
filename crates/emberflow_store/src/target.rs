//! Storage-path resolution for object-store targets.
//!
//! A [`StoreTarget`] addresses one `scheme://bucket/key` object. When the
//! injected [`StoreConfig`] carries a local root, every operation resolves
//! to `<root>/bucket/key` on the local filesystem; otherwise operations
//! are forwarded to the remote [`ObjectStore`] client.
//!
//! The resolver hands out raw byte handles. Compression framing belongs
//! to the caller; this layer never assumes knowledge of the codec.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::object_store::ObjectStore;
use crate::uri::StoreUri;

/// Requested handle direction. Only `"r"` and `"w"` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            other => Err(StoreError::InvalidMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
        }
    }
}

/// Resolver for one object-store target.
pub struct StoreTarget {
    uri: StoreUri,
    config: StoreConfig,
    remote: Arc<dyn ObjectStore>,
}

impl StoreTarget {
    pub fn new(uri: StoreUri, config: StoreConfig, remote: Arc<dyn ObjectStore>) -> Self {
        Self {
            uri,
            config,
            remote,
        }
    }

    /// Parse `uri` and build a resolver for it.
    pub fn from_uri(uri: &str, config: StoreConfig, remote: Arc<dyn ObjectStore>) -> Result<Self> {
        Ok(Self::new(StoreUri::parse(uri)?, config, remote))
    }

    pub fn uri(&self) -> &StoreUri {
        &self.uri
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Local stand-in path for this target, when a local root is set.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.config
            .local_root()
            .map(|root| root.join(self.uri.relative_path()))
    }

    pub fn exists(&self) -> Result<bool> {
        match self.local_path() {
            Some(path) => Ok(path.is_file()),
            None => self.remote.exists(&self.uri),
        }
    }

    /// Open with a string mode. Anything but `"r"`/`"w"` fails before any
    /// I/O is attempted.
    pub fn open(&self, mode: &str) -> Result<TargetHandle> {
        match OpenMode::parse(mode)? {
            OpenMode::Read => self.reader().map(TargetHandle::Reader),
            OpenMode::Write => self.writer().map(TargetHandle::Writer),
        }
    }

    pub fn reader(&self) -> Result<TargetReader> {
        match self.local_path() {
            Some(path) => {
                let file = File::open(&path)?;
                debug!(path = %path.display(), "Opened local target for read");
                Ok(TargetReader::Local(BufReader::new(file)))
            }
            None => {
                let bytes = self.remote.get(&self.uri)?;
                debug!(uri = %self.uri, bytes = bytes.len(), "Fetched remote target");
                Ok(TargetReader::Remote(Cursor::new(bytes)))
            }
        }
    }

    pub fn writer(&self) -> Result<TargetWriter> {
        match self.local_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let file = File::create(&path)?;
                debug!(path = %path.display(), "Opened local target for write");
                Ok(TargetWriter {
                    inner: Some(WriterInner::Local {
                        file: BufWriter::new(file),
                        path,
                    }),
                })
            }
            None => Ok(TargetWriter {
                inner: Some(WriterInner::Remote {
                    buf: Vec::new(),
                    uri: self.uri.clone(),
                    remote: Arc::clone(&self.remote),
                }),
            }),
        }
    }
}

/// Byte handle returned by the string-mode [`StoreTarget::open`].
pub enum TargetHandle {
    Reader(TargetReader),
    Writer(TargetWriter),
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(_) => f.write_str("TargetHandle::Reader"),
            Self::Writer(_) => f.write_str("TargetHandle::Writer"),
        }
    }
}

/// Read half of a resolved target: a buffered local file, or the fully
/// fetched remote object served from memory.
pub enum TargetReader {
    Local(BufReader<File>),
    Remote(Cursor<Vec<u8>>),
}

impl fmt::Debug for TargetReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.write_str("TargetReader::Local"),
            Self::Remote(_) => f.write_str("TargetReader::Remote"),
        }
    }
}

impl Read for TargetReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Local(reader) => reader.read(buf),
            Self::Remote(cursor) => cursor.read(buf),
        }
    }
}

/// Write half of a resolved target.
///
/// Local targets write through a buffered file; remote targets stage bytes
/// in memory and upload them once on [`TargetWriter::finish`]. `finish`
/// must be called on the success path: dropping an unfinished writer
/// discards the staged remote object.
pub struct TargetWriter {
    inner: Option<WriterInner>,
}

enum WriterInner {
    Local {
        file: BufWriter<File>,
        path: PathBuf,
    },
    Remote {
        buf: Vec<u8>,
        uri: StoreUri,
        remote: Arc<dyn ObjectStore>,
    },
}

impl TargetWriter {
    /// Flush local bytes or upload the staged remote object.
    pub fn finish(mut self) -> Result<()> {
        match self.inner.take() {
            Some(WriterInner::Local { mut file, path }) => {
                file.flush()?;
                info!(path = %path.display(), "Finished local target write");
                Ok(())
            }
            Some(WriterInner::Remote { buf, uri, remote }) => {
                remote.put(&uri, &buf)?;
                info!(uri = %uri, bytes = buf.len(), "Uploaded target");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Write for TargetWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(WriterInner::Local { file, .. }) => file.write(buf),
            Some(WriterInner::Remote { buf: staged, .. }) => {
                staged.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "target writer already finished",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(WriterInner::Local { file, .. }) => file.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for TargetWriter {
    fn drop(&mut self) {
        match self.inner.take() {
            Some(WriterInner::Local { path, .. }) => {
                // BufWriter flushes what it can on drop.
                warn!(path = %path.display(), "Target writer dropped without finish");
            }
            Some(WriterInner::Remote { buf, uri, .. }) => {
                warn!(
                    uri = %uri,
                    bytes = buf.len(),
                    "Target writer dropped without finish; staged upload discarded"
                );
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MemoryStore;

    fn target(uri: &str, config: StoreConfig) -> StoreTarget {
        StoreTarget::from_uri(uri, config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_open_mode_parse() {
        assert_eq!(OpenMode::parse("r").unwrap(), OpenMode::Read);
        assert_eq!(OpenMode::parse("w").unwrap(), OpenMode::Write);
        for bad in ["a", "rb", "w+", ""] {
            let err = OpenMode::parse(bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidMode(_)), "{bad}");
        }
    }

    #[test]
    fn test_local_path_joins_bucket_and_key() {
        let t = target("s3://bucket/key.csv", StoreConfig::local("/tmp/root"));
        assert_eq!(t.local_path(), Some(PathBuf::from("/tmp/root/bucket/key.csv")));
    }

    #[test]
    fn test_no_local_path_without_root() {
        let t = target("s3://bucket/key.csv", StoreConfig::remote());
        assert_eq!(t.local_path(), None);
    }
}
