//! Base types for structure of the index file.

use binrw::{BinRead, BinWrite};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use std::ops::RangeInclusive;

use crate::error::{Error, Result};

/// Size of the [`IndexHeader`] in bytes, entries start right after it
pub const HEADER_SIZE: u64 = 0x24;

/// Header versions this library knows how to lay out
pub const SUPPORTED_VERSIONS: RangeInclusive<u8> = 1..=5;

/// Kind given to entries without an explicit resource type
pub const DEFAULT_KIND: &str = "file";

/// Index file header
///
/// Starts with "RES" directly followed by the header version byte.
/// All data is stored in big endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(big, magic = b"RES")]
pub struct IndexHeader {
    /// Header version, decides the width of [`ResourceEntry::reserved`]
    pub version: u8,

    /// The size of the entry block following the header
    pub index_size: u32,

    /// The patch level this index writes its data into
    pub patch_level: u8,

    /// Unused bytes, written back as they were read
    pub padding: [u8; 23],

    /// The number of entries following the header
    pub entry_count: i32,
}

impl Default for IndexHeader {
    fn default() -> Self {
        Self {
            version: *SUPPORTED_VERSIONS.end(),
            index_size: Default::default(),
            patch_level: Default::default(),
            padding: Default::default(),
            entry_count: Default::default(),
        }
    }
}

/// Index file entry
///
/// Metadata for one named resource. The payload itself lives in the data file of
/// [`ResourceEntry::patch_level`] at [`ResourceEntry::offset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Identifier other resources use to refer to this one
    pub id: i32,

    /// Resource type, [`DEFAULT_KIND`] for plain files
    pub kind: String,

    /// Name other resources use to refer to this one
    pub short_name: String,

    /// Full path of the resource, blank for most placeholders
    pub full_name: String,

    /// Offset of the payload inside the owning data file
    pub offset: i64,

    /// The size of the payload after decompression
    pub size: i32,

    /// The size of the payload inside the data file
    pub compressed_size: i32,

    /// Usually 0, 16 for string tables and a handful of images
    pub reserved: i64,

    /// Patch level of the data file holding the payload
    pub patch_level: u8,
}

impl ResourceEntry {
    /// Name used to display and look up this entry
    ///
    /// Falls back from the full name to the short name and finally to the kind.
    pub fn name(&self) -> &str {
        if !self.full_name.is_empty() {
            &self.full_name
        } else if !self.short_name.is_empty() {
            &self.short_name
        } else {
            &self.kind
        }
    }

    /// Whether the payload is stored deflated
    pub fn is_compressed(&self) -> bool {
        self.size != self.compressed_size
    }

    /// Whether this entry has no payload at all
    pub fn is_placeholder(&self) -> bool {
        self.size == 0 && self.compressed_size == 0
    }

    /// Number of bytes this entry takes up in an index of the given version
    pub fn encoded_len(&self, version: u8) -> usize {
        let reserved = if version <= 4 { 8 } else { 4 };
        4 + (4 + self.kind.len())
            + (4 + self.short_name.len())
            + (4 + self.full_name.len())
            + 8
            + 4
            + 4
            + reserved
            + 1
    }

    /// Decode one entry from the remaining bytes of `reader`
    pub fn read(reader: &mut Cursor<&[u8]>, version: u8) -> Result<ResourceEntry> {
        let id = reader.read_i32::<BigEndian>().map_err(truncated)?;
        let kind = read_string(reader)?;
        let short_name = read_string(reader)?;
        let full_name = read_string(reader)?;

        let offset = reader.read_i64::<BigEndian>().map_err(truncated)?;
        let size = reader.read_i32::<BigEndian>().map_err(truncated)?;
        let compressed_size = reader.read_i32::<BigEndian>().map_err(truncated)?;
        let reserved = if version <= 4 {
            reader.read_i64::<BigEndian>().map_err(truncated)?
        } else {
            reader.read_i32::<BigEndian>().map_err(truncated)? as i64
        };
        let patch_level = reader.read_u8().map_err(truncated)?;

        if size < 0 || compressed_size < 0 {
            return Err(Error::MalformedEntry(format!(
                "{full_name} has a negative size ({size}/{compressed_size})"
            )));
        }

        Ok(ResourceEntry {
            id,
            kind,
            short_name,
            full_name,
            offset,
            size,
            compressed_size,
            reserved,
            patch_level,
        })
    }

    /// Encode this entry for an index of the given version
    pub fn write<W: Write>(&self, writer: &mut W, version: u8) -> Result<()> {
        writer.write_i32::<BigEndian>(self.id)?;
        write_string(writer, &self.kind)?;
        write_string(writer, &self.short_name)?;
        write_string(writer, &self.full_name)?;

        writer.write_i64::<BigEndian>(self.offset)?;
        writer.write_i32::<BigEndian>(self.size)?;
        writer.write_i32::<BigEndian>(self.compressed_size)?;
        if version <= 4 {
            writer.write_i64::<BigEndian>(self.reserved)?;
        } else {
            writer.write_i32::<BigEndian>(self.reserved as i32)?;
        }
        writer.write_u8(self.patch_level)?;

        Ok(())
    }
}

fn truncated(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::MalformedEntry("entry is truncated".into())
    } else {
        Error::IOError(err)
    }
}

// String lengths are little-endian, unlike everything around them.
fn read_string(reader: &mut Cursor<&[u8]>) -> Result<String> {
    let len = reader.read_i32::<LittleEndian>().map_err(truncated)?;
    if len < 0 {
        return Err(Error::MalformedEntry(format!(
            "negative string length {len}"
        )));
    }

    let remaining = (reader.get_ref().len() as u64).saturating_sub(reader.position());
    if len as u64 > remaining {
        return Err(Error::MalformedEntry(format!(
            "string length {len} exceeds the {remaining} remaining bytes"
        )));
    }

    let mut buffer = vec![0u8; len as usize];
    reader.read_exact(&mut buffer).map_err(truncated)?;

    if !buffer.is_ascii() {
        return Err(Error::MalformedEntry("string is not ASCII".into()));
    }

    String::from_utf8(buffer).map_err(|e| Error::MalformedEntry(e.to_string()))
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let len = i32::try_from(value.len())
        .map_err(|_| Error::CustomError(format!("name is too long: {} bytes", value.len())))?;
    writer.write_i32::<LittleEndian>(len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}
