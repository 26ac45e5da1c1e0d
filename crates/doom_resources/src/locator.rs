//! Resolution of patch levels to their physical files.

use std::{
    collections::HashMap,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument, warn};

use crate::compression::PayloadReader;
use crate::error::Result;
use crate::types::ResourceEntry;

/// Extension of the base index file
pub const INDEX_EXTENSION: &str = "index";

/// Extension of the index files of patch levels 1 and up
pub const PATCH_INDEX_EXTENSION: &str = "pindex";

/// Extension of the base data file
pub const DATA_EXTENSION: &str = "resources";

/// Extension of the data files of patch levels 1 and up
pub const PATCH_DATA_EXTENSION: &str = "patch";

/// Maps patch levels to data files and keeps them open
///
/// Handles are opened on first use and kept until [`PatchLocator::close`] is called or the locator is
/// dropped.
#[derive(Debug)]
pub struct PatchLocator {
    directory: PathBuf,
    base_name: String,
    handles: HashMap<u8, File>,
}

impl PatchLocator {
    /// Create a locator for the container the given index file belongs to
    ///
    /// Any member of the chain works, `gameresources.index`, `gameresources.pindex` and
    /// `gameresources_002.pindex` all share the base name `gameresources`.
    pub fn from_index_path(path: impl AsRef<Path>) -> PatchLocator {
        let path = path.as_ref();
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        PatchLocator {
            directory,
            base_name: strip_level_suffix(&stem).to_owned(),
            handles: HashMap::new(),
        }
    }

    /// The name shared by all files of the container
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Path of the data file owning the given patch level
    pub fn data_path(&self, level: u8) -> PathBuf {
        self.level_path(level, DATA_EXTENSION, PATCH_DATA_EXTENSION)
    }

    /// Path of the index file written for the given patch level
    pub fn index_path(&self, level: u8) -> PathBuf {
        self.level_path(level, INDEX_EXTENSION, PATCH_INDEX_EXTENSION)
    }

    fn level_path(&self, level: u8, base: &str, patch: &str) -> PathBuf {
        match level {
            0 => self.directory.join(format!("{}.{base}", self.base_name)),
            n => self
                .directory
                .join(format!("{}_{n:03}.{patch}", self.base_name)),
        }
    }

    /// Whether a handle for the given level is currently cached
    pub fn is_open(&self, level: u8) -> bool {
        self.handles.contains_key(&level)
    }

    /// Get the data file of a patch level, opening it on first use
    ///
    /// Returns `None` when the file does not exist. Containers are regularly shipped without the files of
    /// levels nobody reads from, so it is up to the caller to decide whether that matters.
    #[instrument(skip(self))]
    pub fn open(&mut self, level: u8) -> Result<Option<&mut File>> {
        if !self.handles.contains_key(&level) {
            let path = self.data_path(level);
            match File::open(&path) {
                Ok(file) => {
                    debug!("opened {}", path.display());
                    self.handles.insert(level, file);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    warn!("data file {} is missing", path.display());
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(self.handles.get_mut(&level))
    }

    /// Open a stream over the payload of `entry`
    ///
    /// Returns `None` for placeholders and for entries whose data file is unavailable. Compressed payloads
    /// are inflated when `decompress` is set, otherwise the stored bytes are returned.
    pub fn open_entry(
        &mut self,
        entry: &ResourceEntry,
        decompress: bool,
    ) -> Result<Option<PayloadReader<'_, File>>> {
        if entry.is_placeholder() {
            return Ok(None);
        }

        let Some(file) = self.open(entry.patch_level)? else {
            return Ok(None);
        };

        let inflate = (decompress && entry.is_compressed()).then_some(entry.size as u64);
        PayloadReader::new(
            file,
            entry.offset as u64,
            entry.compressed_size as u64,
            inflate,
        )
        .map(Some)
    }

    /// Drop the cached handle of one level
    ///
    /// Needed before the data file of that level gets replaced on disk.
    pub fn release(&mut self, level: u8) {
        if self.handles.remove(&level).is_some() {
            debug!("released patch level {level}");
        }
    }

    /// Drop every cached handle
    pub fn close(&mut self) {
        self.handles.clear();
    }
}

fn strip_level_suffix(stem: &str) -> &str {
    match stem.rsplit_once('_') {
        Some((base, digits)) if digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()) => {
            base
        }
        _ => stem,
    }
}

#[cfg(test)]
mod test {
    use std::io::Read;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::Result;
    use crate::locator::PatchLocator;
    use crate::types::ResourceEntry;

    #[test]
    fn paths_for_levels() {
        let locator = PatchLocator::from_index_path("base/gameresources.index");

        assert_eq!(locator.base_name(), "gameresources");
        assert_eq!(
            locator.data_path(0),
            PathBuf::from("base/gameresources.resources")
        );
        assert_eq!(
            locator.index_path(0),
            PathBuf::from("base/gameresources.index")
        );
        assert_eq!(
            locator.data_path(2),
            PathBuf::from("base/gameresources_002.patch")
        );
        assert_eq!(
            locator.index_path(17),
            PathBuf::from("base/gameresources_017.pindex")
        );
    }

    #[test]
    fn base_name_ignores_level_suffix() {
        for path in [
            "base/snap_gameresources.pindex",
            "base/snap_gameresources_001.pindex",
            "base/snap_gameresources_255.patch",
        ] {
            let locator = PatchLocator::from_index_path(path);
            assert_eq!(locator.base_name(), "snap_gameresources", "{path}");
        }
    }

    #[traced_test]
    #[test]
    fn missing_level_is_unavailable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut locator = PatchLocator::from_index_path(dir.path().join("gameresources.index"));

        assert!(locator.open(3)?.is_none());
        assert!(!locator.is_open(3));
        assert!(logs_contain("is missing"));

        Ok(())
    }

    #[test]
    fn handles_are_cached_until_released() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("gameresources_001.patch"), b"Hello World")?;
        let mut locator = PatchLocator::from_index_path(dir.path().join("gameresources.pindex"));

        assert!(locator.open(1)?.is_some());
        assert!(locator.is_open(1));

        locator.release(1);
        assert!(!locator.is_open(1));

        locator.open(1)?;
        locator.close();
        assert!(!locator.is_open(1));

        Ok(())
    }

    #[test]
    fn placeholders_are_never_opened() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("gameresources.resources"), b"Hello World")?;
        let mut locator = PatchLocator::from_index_path(dir.path().join("gameresources.index"));

        let placeholder = ResourceEntry {
            kind: "file".into(),
            ..Default::default()
        };
        assert!(locator.open_entry(&placeholder, true)?.is_none());
        assert!(!locator.is_open(0));

        let world = ResourceEntry {
            full_name: "world.txt".into(),
            offset: 6,
            size: 5,
            compressed_size: 5,
            ..Default::default()
        };
        let mut buffer = String::new();
        locator
            .open_entry(&world, true)?
            .expect("level 0 exists")
            .read_to_string(&mut buffer)?;
        assert_eq!(buffer, "World");

        Ok(())
    }
}
