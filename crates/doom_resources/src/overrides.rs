//! Discovery of loose override files for a rebuild.

use indexmap::IndexMap;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::{ConflictError, Error, Result};

/// Name of the id manifest in the root of an override folder
pub const ID_MANIFEST: &str = "fileIds.txt";

/// Separates an entry name from its kind in a loose file name, e.g. `allowoverlays.decl;renderParm`
pub const KIND_SEPARATOR: char = ';';

/// A loose file replacing or adding one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFile {
    /// Entry name, the path relative to the folder root without the kind suffix
    pub full_name: String,
    /// Kind taken from the `;kind` suffix, if the file had one
    pub kind: Option<String>,
    /// Where the file lives on disk
    pub path: PathBuf,
}

/// The loose files of an override folder, keyed by their lower-cased entry name
#[derive(Debug, Default)]
pub struct OverrideSet {
    files: IndexMap<String, OverrideFile>,
    ids: HashMap<String, i32>,
    conflicts: Vec<ConflictError>,
}

impl OverrideSet {
    /// Walk `root` recursively and collect every file in it
    ///
    /// `manifest` in the root of the folder is read as id manifest instead of being treated as an entry.
    #[instrument(skip_all, fields(root = %root.display()), err)]
    pub fn discover(root: &Path, manifest: &str) -> Result<OverrideSet> {
        let mut set = OverrideSet::default();

        for item in WalkDir::new(root).sort_by_file_name() {
            let item = item?;
            if item.file_type().is_dir() {
                continue;
            }

            let relative = relative_name(root, item.path())?;
            if relative.eq_ignore_ascii_case(manifest) {
                let text = std::fs::read_to_string(item.path())?;
                set.ids = parse_id_manifest(&text)?;
                debug!("read {} ids from {}", set.ids.len(), item.path().display());
                continue;
            }

            let (full_name, kind) = split_kind(&relative);
            set.insert(OverrideFile {
                full_name: full_name.to_owned(),
                kind: kind.map(str::to_owned),
                path: item.path().to_path_buf(),
            });
        }

        info!(
            "found {} override files ({} conflicts)",
            set.files.len(),
            set.conflicts.len()
        );
        Ok(set)
    }

    /// Add a file, replacing and reporting an earlier file with the same name
    pub fn insert(&mut self, file: OverrideFile) {
        let key = file.full_name.to_ascii_lowercase();
        if let Some(previous) = self.files.get(&key) {
            let conflict = ConflictError {
                name: file.full_name.clone(),
                first: previous.path.clone(),
                second: file.path.clone(),
            };
            warn!("{conflict}");
            self.conflicts.push(conflict);
        }
        self.files.insert(key, file);
    }

    /// Number of override files not taken yet
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether every override file was taken
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the file overriding the entry called `name`
    pub fn get(&self, name: &str) -> Option<&OverrideFile> {
        self.files.get(&name.to_ascii_lowercase())
    }

    /// Remove and return the file overriding the entry called `name`
    pub fn take(&mut self, name: &str) -> Option<OverrideFile> {
        self.files.shift_remove(&name.to_ascii_lowercase())
    }

    /// The files not taken yet, in discovery order
    pub fn files(&self) -> impl Iterator<Item = &OverrideFile> {
        self.files.values()
    }

    /// Remove and return every file not taken yet, in discovery order
    pub fn drain(&mut self) -> impl Iterator<Item = OverrideFile> + '_ {
        self.files.drain(..).map(|(_, file)| file)
    }

    /// The id the manifest assigns to `name`
    pub fn id_for(&self, name: &str) -> Option<i32> {
        self.ids.get(&name.to_ascii_lowercase()).copied()
    }

    /// Files that were replaced by a later file with the same name
    pub fn conflicts(&self) -> &[ConflictError] {
        &self.conflicts
    }

    /// Take the collected conflicts
    pub fn take_conflicts(&mut self) -> Vec<ConflictError> {
        std::mem::take(&mut self.conflicts)
    }
}

/// Split a `;kind` suffix off a loose file name
///
/// An empty suffix is dropped without giving the file a kind.
pub fn split_kind(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(KIND_SEPARATOR) {
        Some((name, kind)) if !kind.contains('/') => {
            (name, Some(kind).filter(|k| !k.is_empty()))
        }
        _ => (name, None),
    }
}

/// Parse `name=id` lines, later lines win
pub fn parse_id_manifest(text: &str) -> Result<HashMap<String, i32>> {
    let mut ids = HashMap::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (name, id) = line.rsplit_once('=').ok_or(Error::InvalidIdManifest {
            line: number + 1,
            reason: "expected name=id".into(),
        })?;
        let id = id.trim().parse::<i32>().map_err(|e| Error::InvalidIdManifest {
            line: number + 1,
            reason: e.to_string(),
        })?;

        ids.insert(name.trim().replace('\\', "/").to_ascii_lowercase(), id);
    }

    Ok(ids)
}

fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::CustomError(format!("{} is outside of {}", path.display(), root.display())))?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                Error::CustomError(format!("unable to convert {} to a string", path.display()))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(parts.join("/"))
}
