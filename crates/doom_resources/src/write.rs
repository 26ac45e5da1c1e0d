//! Types for writing resource indexes and data files
//!

use binrw::BinWrite;
use flate2::Compression;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, Level};

use crate::compression::deflate;
use crate::error::{Error, Result};
use crate::read::ResourceIndex;
use crate::types::IndexHeader;

/// Where a payload ended up in a data file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoredPayload {
    /// Offset of the first byte
    pub offset: i64,
    /// Length before compression
    pub size: i32,
    /// Length in the data file
    pub compressed_size: i32,
}

impl StoredPayload {
    /// Whether the payload was stored deflated
    pub fn is_compressed(&self) -> bool {
        self.size != self.compressed_size
    }
}

/// Data file generator
///
/// Payloads are appended back to back starting at offset 0. Every payload is deflated and kept that way
/// only when that makes it smaller.
///
/// ```
/// # fn doit() -> doom_resources::error::Result<()>
/// # {
/// use doom_resources::write::PayloadWriter;
/// use flate2::Compression;
///
/// // We use a buffer here, though you'd normally use a `File`
/// let mut data = PayloadWriter::new(Vec::new(), Compression::default());
///
/// let stored = data.write_payload(b"Hello, World!")?;
/// assert_eq!(stored.offset, 0);
///
/// let bytes = data.finish()?;
/// assert_eq!(bytes.len() as i32, stored.compressed_size);
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct PayloadWriter<W: Write> {
    inner: W,
    position: u64,
    compression: Compression,
}

impl<W: Write> PayloadWriter<W> {
    /// Start a data file at offset 0 of `inner`
    pub fn new(inner: W, compression: Compression) -> PayloadWriter<W> {
        PayloadWriter {
            inner,
            position: 0,
            compression,
        }
    }

    /// Offset the next payload will be written at
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append one payload, deflated if that makes it smaller
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size = data.len()))]
    pub fn write_payload(&mut self, data: &[u8]) -> Result<StoredPayload> {
        let size = i32::try_from(data.len())
            .map_err(|_| Error::CustomError(format!("payload is too large: {} bytes", data.len())))?;
        let offset = i64::try_from(self.position)
            .map_err(|_| Error::CustomError("data file is too large".into()))?;

        let compressed = if data.is_empty() {
            None
        } else {
            Some(deflate(data, self.compression)?).filter(|c| c.len() < data.len())
        };

        let stored = match compressed {
            Some(compressed) => {
                self.inner.write_all(&compressed)?;
                compressed.len()
            }
            None => {
                self.inner.write_all(data)?;
                data.len()
            }
        };
        self.position += stored as u64;

        Ok(StoredPayload {
            offset,
            size,
            compressed_size: stored as i32,
        })
    }

    /// Flush and return the inner writer
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl ResourceIndex {
    /// Encode the header and all entries, in their current order
    pub fn write_manifest<W: Write>(&self, writer: &mut W) -> Result<()> {
        let version = self.header().version;

        let mut block = Vec::new();
        for entry in self.entries() {
            entry.write(&mut block, version)?;
        }

        let header = IndexHeader {
            index_size: u32::try_from(block.len())
                .map_err(|_| Error::CustomError("index is too large".into()))?,
            entry_count: i32::try_from(self.len())
                .map_err(|_| Error::CustomError("too many entries".into()))?,
            ..*self.header()
        };

        let mut encoded = Cursor::new(Vec::with_capacity(0x24));
        header.write(&mut encoded)?;
        writer.write_all(encoded.get_ref())?;
        writer.write_all(&block)?;

        Ok(())
    }

    /// Write the index back to the file it is bound to
    pub fn save(&self) -> Result<()> {
        self.save_to(self.path())
    }

    /// Write the index to `path`
    ///
    /// The index goes to a temporary sibling first which then replaces `path`, so a failed write leaves the
    /// previous index in place.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), entries = self.len()), err)]
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let temporary = with_suffix(path, "_tmp");

        let mut out = BufWriter::new(File::create(&temporary)?);
        self.write_manifest(&mut out)?;
        out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;

        std::fs::rename(&temporary, path)?;
        debug!("saved {}", path.display());

        Ok(())
    }
}

/// `path` with `suffix` appended to its file name
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
