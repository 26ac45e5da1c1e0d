//! Payload compression and decompression handling.

use std::io::{self, Cursor, Read, Seek, Write};

use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use tracing::instrument;

use crate::error::Result;

/// A stream over one entry's payload
///
/// Created through [`crate::ResourceIndex::open`]. Reads never go past the end of the entry.
pub enum PayloadReader<'a, R: Read + Seek> {
    /// Bytes exactly as they are stored in the data file
    Raw(io::Take<&'a mut R>),

    /// Inflated bytes of a compressed payload
    Compressed(Box<io::Take<DeflateDecoder<Cursor<Vec<u8>>>>>),
}

impl<'a, R: Read + Seek> PayloadReader<'a, R> {
    /// Position `reader` at `start` and limit it to the stored length of the payload.
    ///
    /// When `size` is given the stored bytes are buffered and inflated, yielding at most `size` bytes.
    #[instrument(skip(reader))]
    pub fn new(reader: &'a mut R, start: u64, stored: u64, size: Option<u64>) -> Result<Self> {
        reader.seek(io::SeekFrom::Start(start))?;

        Ok(match size {
            None => PayloadReader::Raw(reader.take(stored)),
            Some(size) => {
                let mut block = vec![0u8; stored as usize];
                reader.read_exact(&mut block)?;
                PayloadReader::Compressed(Box::new(
                    DeflateDecoder::new(Cursor::new(block)).take(size),
                ))
            }
        })
    }

    /// Whether the stream inflates the stored bytes
    pub fn is_inflating(&self) -> bool {
        matches!(self, PayloadReader::Compressed(_))
    }
}

impl<R: Read + Seek> Read for PayloadReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PayloadReader::Raw(r) => r.read(buf),
            PayloadReader::Compressed(r) => r.read(buf),
        }
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            PayloadReader::Raw(r) => r.read_to_end(buf),
            PayloadReader::Compressed(r) => r.read_to_end(buf),
        }
    }
}

/// Compress `data` as a raw DEFLATE stream without any zlib or gzip framing
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn deflate(data: &[u8], level: Compression) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), level);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a raw DEFLATE stream
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn inflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Read};

    use flate2::Compression;
    use pretty_assertions::assert_eq;

    use crate::compression::{deflate, inflate, PayloadReader};
    use crate::error::Result;

    const HELLO: &[u8] = b"Hello World";

    #[test]
    fn deflate_has_no_zlib_header() -> Result<()> {
        let compressed = deflate(HELLO, Compression::default())?;

        assert_ne!(&compressed[..2], &[0x78, 0x9C]);
        assert_eq!(inflate(&compressed)?, HELLO);

        Ok(())
    }

    #[test]
    fn repetitive_payload_survives_deflate() -> Result<()> {
        let payload = b"renderParm allowOverlays { } ".repeat(64);
        let compressed = deflate(&payload, Compression::best())?;

        assert!(compressed.len() < payload.len());
        assert_eq!(inflate(&compressed)?, payload);

        Ok(())
    }

    #[test]
    fn raw_reader_stops_at_entry_end() -> Result<()> {
        let mut data = Cursor::new(b"xxxHello Worldyyy".to_vec());

        let mut reader = PayloadReader::new(&mut data, 3, HELLO.len() as u64, None)?;
        assert!(!reader.is_inflating());

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        assert_eq!(buffer, HELLO);

        Ok(())
    }

    #[test]
    fn compressed_reader_inflates() -> Result<()> {
        let compressed = deflate(HELLO, Compression::default())?;
        let mut data = vec![0xEE; 5];
        data.extend_from_slice(&compressed);
        data.extend_from_slice(&[0xEE; 5]);
        let mut data = Cursor::new(data);

        let mut reader = PayloadReader::new(
            &mut data,
            5,
            compressed.len() as u64,
            Some(HELLO.len() as u64),
        )?;
        assert!(reader.is_inflating());

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        assert_eq!(buffer, HELLO);

        Ok(())
    }

    #[test]
    fn compressed_reader_is_bounded_by_size() -> Result<()> {
        let compressed = deflate(HELLO, Compression::default())?;
        let mut data = Cursor::new(compressed.clone());

        let mut reader = PayloadReader::new(&mut data, 0, compressed.len() as u64, Some(5))?;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        assert_eq!(buffer, b"Hello");

        Ok(())
    }
}
