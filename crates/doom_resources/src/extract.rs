//! Writing entries out as loose files
//!
//! The folder layout matches what [`crate::overrides::OverrideSet::discover`] reads, so an extracted
//! container can be edited and fed straight back into [`ResourceIndex::rebuild`].

use bon::Builder;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Component, Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{Error, Result},
    overrides::{ID_MANIFEST, KIND_SEPARATOR},
    read::ResourceIndex,
    types::{ResourceEntry, DEFAULT_KIND},
};

/// Which entries to extract and how
#[derive(Debug, Clone, Builder)]
pub struct ExtractOptions {
    /// Only extract entries whose name contains one of these, compared case-insensitively
    #[builder(default)]
    pub names: Vec<String>,

    /// Only extract entries of one of these kinds, compared case-insensitively
    #[builder(default)]
    pub kinds: Vec<String>,

    /// Write into a destination that already has files in it
    #[builder(default)]
    pub force: bool,

    /// Report what would be written without touching the disk
    #[builder(default)]
    pub simulate: bool,

    /// Name of the id manifest written next to the extracted files
    #[builder(into, default = ID_MANIFEST.to_owned())]
    pub id_manifest: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExtractOptions {
    /// Whether `entry` passes the name and kind filters
    pub fn matches(&self, entry: &ResourceEntry) -> bool {
        let name = entry.name().to_ascii_lowercase();
        let by_name = self.names.is_empty()
            || self
                .names
                .iter()
                .any(|n| name.contains(&n.to_ascii_lowercase()));
        let by_kind = self.kinds.is_empty() || self
                .kinds
                .iter()
                .any(|k| k.eq_ignore_ascii_case(&entry.kind));

        by_name && by_kind
    }
}

/// What an extraction did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries written, or that would have been written in simulate mode
    pub extracted: usize,
    /// Placeholders, which have nothing to write
    pub skipped_empty: usize,
    /// Entries rejected by the name or kind filters
    pub filtered: usize,
    /// Entries whose data file is missing
    pub unavailable: usize,
    /// Entries whose name would land outside of the destination
    pub rejected: usize,
}

/// File name an entry is extracted to, relative to the destination
///
/// Entries of a kind other than [`DEFAULT_KIND`] get it appended after a `;`.
pub fn entry_file_name(entry: &ResourceEntry) -> String {
    let name = entry.name().replace('\\', "/");
    if entry.kind == DEFAULT_KIND {
        name
    } else {
        format!("{name}{KIND_SEPARATOR}{}", entry.kind)
    }
}

/// Write every entry of `index` that passes the filters of `options` below `destination`
///
/// Placeholders are skipped. The ids of the written entries end up in the id manifest, sorted by name.
#[instrument(skip_all, fields(destination = %destination.display(), simulate = options.simulate), err)]
pub fn extract(
    index: &mut ResourceIndex,
    destination: &Path,
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    if !options.force && has_files(destination)? {
        return Err(Error::DestinationNotEmpty(destination.to_path_buf()));
    }

    let mut report = ExtractReport::default();
    let mut ids = Vec::new();
    let (entries, locator) = index.split_mut();

    for entry in entries.iter() {
        if !options.matches(entry) {
            report.filtered += 1;
            continue;
        }
        if entry.is_placeholder() {
            debug!("skipping placeholder {}", entry.name());
            report.skipped_empty += 1;
            continue;
        }

        let file_name = entry_file_name(entry);
        let Some(target) = safe_join(destination, &file_name) else {
            warn!("refusing to extract {file_name} outside of the destination");
            report.rejected += 1;
            continue;
        };

        if options.simulate {
            info!("would write {}", target.display());
        } else {
            let Some(mut reader) = locator.open_entry(entry, true)? else {
                report.unavailable += 1;
                continue;
            };

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::new(File::create(&target)?);
            io::copy(&mut reader, &mut out)?;
            out.flush()?;
            debug!("wrote {}", target.display());
        }

        report.extracted += 1;
        ids.push((entry.name().replace('\\', "/"), entry.id));
    }

    if !options.simulate && !ids.is_empty() {
        ids.sort();
        let mut manifest = BufWriter::new(File::create(destination.join(&options.id_manifest))?);
        for (name, id) in &ids {
            writeln!(manifest, "{name}={id}")?;
        }
        manifest.flush()?;
    }

    info!(
        "extracted {} entries ({} placeholders, {} filtered, {} unavailable)",
        report.extracted, report.skipped_empty, report.filtered, report.unavailable
    );

    Ok(report)
}

fn has_files(directory: &Path) -> Result<bool> {
    match std::fs::read_dir(directory) {
        Ok(mut items) => Ok(items.next().is_some()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn safe_join(root: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let mut components = relative.components().peekable();
    components.peek()?;

    components
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| root.join(relative))
}
