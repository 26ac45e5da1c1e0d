//! Types for reading resource indexes
//!

use binrw::BinRead;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    compression::PayloadReader,
    error::{Error, Result},
    locator::PatchLocator,
    types::{IndexHeader, ResourceEntry, HEADER_SIZE, SUPPORTED_VERSIONS},
};

/// Number of entries owned by one patch level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    /// The patch level
    pub level: u8,
    /// The data file of that level
    pub data_path: PathBuf,
    /// How many entries keep their payload in it
    pub entries: usize,
}

/// Resource container index
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_container_contents(path: &str) -> doom_resources::error::Result<()> {
///     let mut index = doom_resources::ResourceIndex::new(path);
///     index.load()?;
///
///     for entry in index.entries().to_vec() {
///         println!("Filename: {}", entry.name());
///         index.copy_entry(&entry, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ResourceIndex {
    path: PathBuf,
    header: IndexHeader,
    entries: Vec<ResourceEntry>,
    locator: PatchLocator,
}

impl ResourceIndex {
    /// Create an empty index bound to `path`, nothing is read until [`ResourceIndex::load`]
    pub fn new(path: impl AsRef<Path>) -> ResourceIndex {
        let path = path.as_ref().to_path_buf();
        ResourceIndex {
            locator: PatchLocator::from_index_path(&path),
            path,
            header: IndexHeader::default(),
            entries: Vec::new(),
        }
    }

    /// Read the index file at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<ResourceIndex> {
        let mut index = Self::new(path);
        index.load()?;
        Ok(index)
    }

    /// Read the header and every entry from the bound index file
    ///
    /// On failure the index keeps whatever it held before.
    #[instrument(skip(self), fields(path = %self.path.display()), err)]
    pub fn load(&mut self) -> Result<()> {
        let bytes = std::fs::read(&self.path)?;
        let (header, entries) = Self::parse(&bytes)?;

        info!(
            "loaded {} entries (version {}, patch level {})",
            entries.len(),
            header.version,
            header.patch_level
        );

        self.header = header;
        self.entries = entries;
        Ok(())
    }

    /// Parse an in-memory index file
    pub fn parse(bytes: &[u8]) -> Result<(IndexHeader, Vec<ResourceEntry>)> {
        let mut reader = Cursor::new(bytes);

        let header = IndexHeader::read(&mut reader)
            .map_err(|e| Error::CorruptIndex(format!("unreadable header: {e}")))?;

        if !SUPPORTED_VERSIONS.contains(&header.version) {
            return Err(Error::CorruptIndex(format!(
                "unsupported header version {}",
                header.version
            )));
        }
        if header.entry_count < 0 {
            return Err(Error::CorruptIndex(format!(
                "negative entry count {}",
                header.entry_count
            )));
        }

        let mut entries = Vec::with_capacity(header.entry_count.min(1 << 16) as usize);
        for i in 0..header.entry_count {
            let entry = ResourceEntry::read(&mut reader, header.version).map_err(|e| match e {
                Error::MalformedEntry(reason) => {
                    Error::CorruptIndex(format!("entry {i} of {}: {reason}", header.entry_count))
                }
                other => other,
            })?;
            entries.push(entry);
        }

        let consumed = reader.position() - HEADER_SIZE;
        if consumed != header.index_size as u64 {
            warn!(
                "index size is {} but the entries took {consumed} bytes",
                header.index_size
            );
        }
        let trailing = bytes.len() as u64 - reader.position();
        if trailing > 0 {
            debug!("ignoring {trailing} trailing bytes");
        }

        Ok((header, entries))
    }

    /// The index file this container is bound to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebind the index to another file, the data files stay where they are
    pub fn set_path(&mut self, path: impl AsRef<Path>) {
        self.path = path.as_ref().to_path_buf();
    }

    /// The header as it was read, or as it will be written
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Header version of the index, decides the entry layout
    pub fn header_version(&self) -> i32 {
        self.header.version as i32
    }

    /// Change the header version used when saving
    pub fn set_header_version(&mut self, version: i32) -> Result<()> {
        match u8::try_from(version) {
            Ok(v) if SUPPORTED_VERSIONS.contains(&v) => {
                self.header.version = v;
                Ok(())
            }
            _ => Err(Error::CustomError(format!(
                "unsupported header version {version}"
            ))),
        }
    }

    /// Patch level new and rebuilt entries are written into
    pub fn patch_level(&self) -> u8 {
        self.header.patch_level
    }

    /// Change the patch level new and rebuilt entries are written into
    pub fn set_patch_level(&mut self, level: u8) {
        self.header.patch_level = level;
    }

    /// Move the index one patch level up so a rebuild creates a new overlay
    ///
    /// The index is rebound to the index file of the new level. Returns the new level.
    pub fn prepare_patch(&mut self) -> Result<u8> {
        let next = self
            .patch_level()
            .checked_add(1)
            .ok_or(Error::CustomError("no patch levels left".into()))?;

        self.set_patch_level(next);
        self.path = self.locator.index_path(next);
        info!("prepared patch level {next} at {}", self.path.display());

        Ok(next)
    }

    /// Entries in index order
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Mutable access to the entries, order is kept when saving
    pub fn entries_mut(&mut self) -> &mut Vec<ResourceEntry> {
        &mut self.entries
    }

    /// Borrow the entries and the locator at the same time
    pub fn split_mut(&mut self) -> (&mut Vec<ResourceEntry>, &mut PatchLocator) {
        (&mut self.entries, &mut self.locator)
    }

    /// Number of entries contained in this index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this index contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Search for an entry by its display name
    pub fn by_name(&self, name: &str) -> Option<&ResourceEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Search for an entry by id
    pub fn by_id(&self, id: i32) -> Option<&ResourceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Remove an entry, comparing names case-insensitively and accepting `\` as separator
    pub fn remove_by_name(&mut self, name: &str) -> Result<ResourceEntry> {
        let wanted = name.replace('\\', "/");
        let position = self
            .entries
            .iter()
            .position(|e| e.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::EntryNotFound(name.to_owned()))?;

        let removed = self.entries.remove(position);
        info!("removed {}", removed.name());
        Ok(removed)
    }

    /// Remove every entry named in `names`, skipping names that have no entry with a warning
    ///
    /// Returns how many entries were removed.
    pub fn remove_all_by_name<S: AsRef<str>>(&mut self, names: &[S]) -> Result<usize> {
        let mut removed = 0;
        for name in names {
            match self.remove_by_name(name.as_ref()) {
                Ok(_) => removed += 1,
                Err(Error::EntryNotFound(name)) => warn!("failed to find {name} in container"),
                Err(err) => return Err(err),
            }
        }

        Ok(removed)
    }

    /// The locator resolving patch levels of this container
    pub fn locator(&self) -> &PatchLocator {
        &self.locator
    }

    /// Mutable access to the locator
    pub fn locator_mut(&mut self) -> &mut PatchLocator {
        &mut self.locator
    }

    /// Open a stream over the payload of `entry`
    ///
    /// See [`PatchLocator::open_entry`].
    pub fn open(
        &mut self,
        entry: &ResourceEntry,
        decompress: bool,
    ) -> Result<Option<PayloadReader<'_, File>>> {
        self.locator.open_entry(entry, decompress)
    }

    /// Copy the decompressed payload of `entry` into `writer`
    ///
    /// Returns the number of bytes copied, zero for placeholders and unavailable data files.
    #[instrument(skip(self, entry, writer), fields(entry = entry.name()), err)]
    pub fn copy_entry<W: Write>(&mut self, entry: &ResourceEntry, writer: &mut W) -> Result<u64> {
        match self.open(entry, true)? {
            Some(mut reader) => Ok(std::io::copy(&mut reader, writer)?),
            None => Ok(0),
        }
    }

    /// Count the entries per patch level
    pub fn summary(&self) -> Vec<LevelSummary> {
        let mut levels = BTreeMap::new();
        for entry in &self.entries {
            *levels.entry(entry.patch_level).or_insert(0usize) += 1;
        }

        levels
            .into_iter()
            .map(|(level, entries)| LevelSummary {
                level,
                data_path: self.locator.data_path(level),
                entries,
            })
            .collect()
    }

    /// Release every open data file
    pub fn close(&mut self) {
        self.locator.close();
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::read::ResourceIndex;
    use crate::types::ResourceEntry;

    #[rustfmt::skip]
    const ONE_ENTRY: [u8; 82] = [
        // Header
        0x52, 0x45, 0x53, 0x05,
        0x00, 0x00, 0x00, 0x2E,
        0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x01,
        // Entry
        0x00, 0x00, 0x00, 0x01,
        0x04, 0x00, 0x00, 0x00, 0x66, 0x69, 0x6C, 0x65,
        0x00, 0x00, 0x00, 0x00,
        0x05, 0x00, 0x00, 0x00, 0x61, 0x2E, 0x74, 0x78, 0x74,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x64,
        0x00, 0x00, 0x00, 0x64,
        0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    #[test]
    fn parse_single_entry() -> Result<()> {
        let (header, entries) = ResourceIndex::parse(&ONE_ENTRY)?;

        assert_eq!(header.version, 5);
        assert_eq!(header.patch_level, 0);
        assert_eq!(
            entries,
            vec![ResourceEntry {
                id: 1,
                kind: "file".into(),
                full_name: "a.txt".into(),
                size: 100,
                compressed_size: 100,
                ..Default::default()
            }]
        );

        Ok(())
    }

    #[test]
    fn parse_rejects_unknown_version() {
        let mut input = ONE_ENTRY;
        input[3] = 9;

        assert!(matches!(
            ResourceIndex::parse(&input),
            Err(Error::CorruptIndex(_))
        ));
    }

    #[test]
    fn parse_rejects_missing_entries() {
        let mut input = ONE_ENTRY;
        input[35] = 2;

        assert!(matches!(
            ResourceIndex::parse(&input),
            Err(Error::CorruptIndex(_))
        ));
    }

    #[test]
    fn parse_rejects_truncated_header() {
        assert!(matches!(
            ResourceIndex::parse(&ONE_ENTRY[..20]),
            Err(Error::CorruptIndex(_))
        ));
    }

    #[traced_test]
    #[test]
    fn parse_ignores_trailing_bytes() -> Result<()> {
        let mut input = ONE_ENTRY.to_vec();
        input.extend_from_slice(&[0x00, 0x00, 0x00, 0x02, 0x00]);

        let (_, entries) = ResourceIndex::parse(&input)?;
        assert_eq!(entries.len(), 1);

        Ok(())
    }

    #[test]
    fn failed_load_keeps_previous_state() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gameresources.index");
        std::fs::write(&path, ONE_ENTRY)?;

        let mut index = ResourceIndex::from_path(&path)?;
        assert_eq!(index.len(), 1);

        std::fs::write(&path, &ONE_ENTRY[..60])?;
        assert!(matches!(index.load(), Err(Error::CorruptIndex(_))));
        assert_eq!(index.len(), 1);
        assert_eq!(index.header_version(), 5);

        Ok(())
    }

    #[test]
    fn remove_by_name_ignores_case_and_separators() -> Result<()> {
        let (header, mut entries) = ResourceIndex::parse(&ONE_ENTRY)?;
        entries[0].full_name = "generated/decls/a.decl".into();

        let mut index = ResourceIndex::new("gameresources.index");
        index.set_patch_level(header.patch_level);
        *index.entries_mut() = entries;

        assert!(matches!(
            index.remove_by_name("b.decl"),
            Err(Error::EntryNotFound(_))
        ));

        let removed = index.remove_by_name("Generated\\Decls\\A.decl")?;
        assert_eq!(removed.id, 1);
        assert!(index.is_empty());

        Ok(())
    }

    #[traced_test]
    #[test]
    fn remove_all_by_name_skips_missing_names() -> Result<()> {
        let mut index = ResourceIndex::new("gameresources.index");
        for (id, name) in [(1, "a.txt"), (2, "b.txt"), (3, "c.txt")] {
            index.entries_mut().push(ResourceEntry {
                id,
                full_name: name.into(),
                ..Default::default()
            });
        }

        let removed = index.remove_all_by_name(&["nope.txt", "C.TXT", "a.txt"])?;

        assert_eq!(removed, 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].id, 2);
        assert!(logs_contain("failed to find nope.txt in container"));

        assert_eq!(index.remove_all_by_name(&["a.txt"])?, 0);
        assert_eq!(index.len(), 1);

        Ok(())
    }

    #[test]
    fn summary_counts_levels() {
        let mut index = ResourceIndex::new("base/gameresources.pindex");
        for (id, level) in [(1, 0), (2, 1), (3, 0), (4, 2)] {
            index.entries_mut().push(ResourceEntry {
                id,
                patch_level: level,
                ..Default::default()
            });
        }

        let summary = index.summary();
        assert_eq!(
            summary
                .iter()
                .map(|s| (s.level, s.entries))
                .collect::<Vec<_>>(),
            vec![(0, 2), (1, 1), (2, 1)]
        );
        assert!(summary[2].data_path.ends_with("gameresources_002.patch"));
    }

    #[test]
    fn prepare_patch_moves_to_next_level() -> Result<()> {
        let mut index = ResourceIndex::new("base/gameresources.pindex");
        index.set_patch_level(1);

        assert_eq!(index.prepare_patch()?, 2);
        assert_eq!(index.patch_level(), 2);
        assert!(index.path().ends_with("gameresources_002.pindex"));

        index.set_patch_level(u8::MAX);
        assert!(index.prepare_patch().is_err());

        Ok(())
    }
}
