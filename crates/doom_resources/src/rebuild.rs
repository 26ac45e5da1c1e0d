//! Rebuilding the data file of the current patch level

use bon::Builder;
use flate2::Compression;
use std::{
    fs::File,
    io::{self, BufWriter, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{ConflictError, Error, Result},
    locator::PatchLocator,
    overrides::{OverrideSet, ID_MANIFEST},
    read::ResourceIndex,
    types::{ResourceEntry, DEFAULT_KIND},
    write::PayloadWriter,
};

/// Options for how a container is rebuilt
#[derive(Debug, Clone, Builder)]
pub struct RebuildOptions {
    /// DEFLATE level between 0 and 9 used for every rewritten payload
    #[builder(default = 6)]
    pub compression_level: u32,

    /// Name of the id manifest in the root of the override folder
    #[builder(into, default = ID_MANIFEST.to_owned())]
    pub id_manifest: String,

    /// Where the rebuilt index goes, defaults to the index file of the current patch level
    #[builder(into)]
    pub index_path: Option<PathBuf>,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What a rebuild did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Entries carried over from earlier patch levels without touching their bytes
    pub inherited: usize,
    /// Existing entries whose payload was written to the new data file
    pub rewritten: usize,
    /// Entries created from override files without a matching entry
    pub added: usize,
    /// Size of the new data file
    pub bytes_written: u64,
    /// Override files that were shadowed by another file with the same name
    pub conflicts: Vec<ConflictError>,
}

enum Source {
    Inherited,
    Previous(ResourceEntry),
    Loose(PathBuf),
}

impl ResourceIndex {
    /// Write a new data file for the current patch level and save the matching index
    ///
    /// Entries owned by earlier levels are kept as they are unless a file in `overrides` replaces them.
    /// Owned and replaced entries get their payload written to `destination`, override files without an
    /// entry become new entries. The manifest is sorted by id and saved once the data file is complete.
    ///
    /// `destination` must not be the data file of the current level, as the owned payloads are read from
    /// it. Move it into place afterwards. Nothing in memory changes when the rebuild fails.
    #[instrument(skip_all, fields(destination = %destination.as_ref().display(), level = self.patch_level()), err)]
    pub fn rebuild(
        &mut self,
        destination: impl AsRef<Path>,
        overrides: Option<&Path>,
        options: &RebuildOptions,
    ) -> Result<RebuildReport> {
        let destination = destination.as_ref();
        let current = self.patch_level();

        let live = self.locator().data_path(current);
        if live.exists() && same_file(destination, &live) {
            return Err(Error::CustomError(format!(
                "refusing to rebuild into {} while reading from it",
                live.display()
            )));
        }

        let mut set = match overrides {
            Some(root) => OverrideSet::discover(root, &options.id_manifest)?,
            None => OverrideSet::default(),
        };

        let mut report = RebuildReport::default();
        let mut plan = Vec::with_capacity(self.len() + set.len());

        for entry in self.entries() {
            let mut entry = entry.clone();
            if let Some(id) = set.id_for(entry.name()) {
                entry.id = id;
            }

            if let Some(file) = set.take(entry.name()) {
                debug!("{} is overridden by {}", entry.name(), file.path.display());
                if let Some(kind) = file.kind {
                    entry.kind = kind;
                }
                report.rewritten += 1;
                plan.push((entry, Source::Loose(file.path)));
            } else if entry.patch_level == current {
                report.rewritten += 1;
                plan.push((entry.clone(), Source::Previous(entry)));
            } else {
                if entry.patch_level > current {
                    warn!(
                        "{} belongs to patch level {} above the current level {current}",
                        entry.name(),
                        entry.patch_level
                    );
                }
                report.inherited += 1;
                plan.push((entry, Source::Inherited));
            }
        }

        let additions = set.drain().collect::<Vec<_>>();
        let mut next_id = plan
            .iter()
            .map(|(e, _)| e.id)
            .chain(additions.iter().filter_map(|f| set.id_for(&f.full_name)))
            .max()
            .map_or(Some(0), |id| id.checked_add(1));
        for file in additions {
            let id = match set.id_for(&file.full_name) {
                Some(id) => id,
                None => {
                    let id = next_id.ok_or_else(|| {
                        Error::CustomError(format!("no entry id left for {}", file.full_name))
                    })?;
                    next_id = id.checked_add(1);
                    id
                }
            };
            debug!("adding {} as {id}", file.full_name);
            report.added += 1;
            plan.push((
                ResourceEntry {
                    id,
                    kind: file.kind.unwrap_or_else(|| DEFAULT_KIND.to_owned()),
                    short_name: file.full_name.clone(),
                    full_name: file.full_name,
                    patch_level: current,
                    ..Default::default()
                },
                Source::Loose(file.path),
            ));
        }
        report.conflicts = set.take_conflicts();

        plan.sort_by_key(|(entry, _)| entry.id);

        let compression = Compression::new(options.compression_level.min(9));
        report.bytes_written =
            match write_data(self.locator_mut(), destination, &mut plan, current, compression) {
                Ok(written) => written,
                Err(err) => {
                    if let Err(cleanup) = std::fs::remove_file(destination) {
                        debug!("unable to remove {}: {cleanup}", destination.display());
                    }
                    return Err(err);
                }
            };

        let index_path = options
            .index_path
            .clone()
            .unwrap_or_else(|| self.locator().index_path(current));
        let rebuilt = plan.into_iter().map(|(entry, _)| entry).collect();
        let previous = std::mem::replace(self.entries_mut(), rebuilt);
        if let Err(err) = self.save_to(&index_path) {
            *self.entries_mut() = previous;
            return Err(err);
        }
        self.locator_mut().release(current);

        info!(
            "rebuilt {} entries ({} inherited, {} rewritten, {} added), {} bytes",
            self.len(),
            report.inherited,
            report.rewritten,
            report.added,
            report.bytes_written
        );

        Ok(report)
    }
}

#[instrument(skip(locator, plan, compression), err)]
fn write_data(
    locator: &mut PatchLocator,
    destination: &Path,
    plan: &mut [(ResourceEntry, Source)],
    current: u8,
    compression: Compression,
) -> Result<u64> {
    let mut writer = PayloadWriter::new(BufWriter::new(File::create(destination)?), compression);
    let mut buffer = Vec::new();

    for (entry, source) in plan.iter_mut() {
        buffer.clear();
        match source {
            Source::Inherited => continue,
            Source::Loose(path) => {
                File::open(path)?.read_to_end(&mut buffer)?;
            }
            Source::Previous(previous) if previous.is_placeholder() => {}
            Source::Previous(previous) => {
                let level = previous.patch_level;
                let missing = locator.data_path(level);
                match locator.open_entry(previous, true)? {
                    Some(mut reader) => {
                        reader.read_to_end(&mut buffer)?;
                    }
                    None => return Err(Error::MissingPhysicalFile { level, path: missing }),
                }
                if buffer.len() != previous.size as usize {
                    warn!(
                        "{} should be {} bytes but {} were read",
                        previous.name(),
                        previous.size,
                        buffer.len()
                    );
                }
            }
        }

        let stored = writer.write_payload(&buffer)?;
        entry.offset = stored.offset;
        entry.size = stored.size;
        entry.compressed_size = stored.compressed_size;
        entry.patch_level = current;
    }

    let written = writer.position();
    writer
        .finish()?
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?
        .sync_all()?;

    Ok(written)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
