//! This library handles reading from and rebuilding the **resource containers** used by *DOOM* (2016).
//!
//! # Resource Container Format Documentation
//!
//! A container is made of one **index** file describing a flat list of named, typed entries, and one
//! or more **data** files holding the entries' payloads. Containers grow through a chain of *patch
//! levels*: every level owns one data file, and a later level may add, replace or shadow entries from
//! earlier levels without touching their files.
//!
//! ## File Naming
//!
//! All files of a container share a base name (for example `gameresources`).
//!
//! | Patch level | Index file               | Data file                 |
//! |-------------|--------------------------|---------------------------|
//! | 0           | `gameresources.index`    | `gameresources.resources` |
//! | N >= 1      | `gameresources_NNN.pindex` | `gameresources_NNN.patch` |
//!
//! ## Index File Structure
//!
//! The index starts with a fixed size header followed by the entry records.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 3 bytes: "RES"                                             |
//! | 0x0003         | Version                | 1 byte: Header version, controls the entry layout          |
//! | 0x0004         | Index Size             | 4 bytes: Size of the entry block in bytes                  |
//! | 0x0008         | Patch Level            | 1 byte: Patch level this index writes into                 |
//! | 0x0009         | Padding                | 23 bytes: Unused, kept as found                            |
//! | 0x0020         | Entry Count            | 4 bytes: Number of entries following the header            |
//!
//! ### Entry Record
//!
//! | Field            | Size     | Description                                                       |
//! |------------------|----------|-------------------------------------------------------------------|
//! | ID               | 4        | Identifier other resources use to refer to this one               |
//! | Kind             | 4 + n    | Little-endian length followed by the ASCII resource type          |
//! | Short Name       | 4 + n    | Little-endian length followed by the ASCII name                   |
//! | Full Name        | 4 + n    | Little-endian length followed by the ASCII path                   |
//! | Offset           | 8        | Offset of the payload inside the owning data file                 |
//! | Size             | 4        | Size of the payload when decompressed                             |
//! | Compressed Size  | 4        | Size of the payload in the data file                              |
//! | Reserved         | 8 or 4   | 8 bytes up to version 4, 4 bytes from version 5 on                |
//! | Patch Level      | 1        | Patch level of the data file that holds the payload               |
//!
//! ## Additional Information
//!
//! - **Endianness**: Big-endian for every fixed size field, little-endian for the string lengths
//! - **Compression**: Raw DEFLATE, used whenever `compressed size != size`
//! - **Placeholders**: Entries with both sizes set to zero have no payload
//!

pub mod compression;
pub mod error;
pub mod extract;
pub mod locator;
pub mod overrides;
pub mod read;
pub mod rebuild;
pub mod types;
pub mod write;

pub use extract::{extract, ExtractOptions};
pub use locator::PatchLocator;
pub use read::ResourceIndex;
pub use rebuild::{RebuildOptions, RebuildReport};
pub use types::ResourceEntry;
