#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use doom_resources::{error::Result, ResourceEntry, ResourceIndex};

/// Bytes deflate can not shrink, so payloads built from them are stored raw
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Write a container named `gameresources` into `dir`
///
/// Every `(id, name, level, payload)` is appended raw to the data file of its level, the index is saved as
/// `gameresources.index` with the given header version and current level 0.
pub fn container(
    dir: &Path,
    version: i32,
    entries: &[(i32, &str, u8, &[u8])],
) -> Result<ResourceIndex> {
    let path = dir.join("gameresources.index");
    let mut index = ResourceIndex::new(&path);
    index.set_header_version(version)?;

    let mut levels: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    for (id, name, level, payload) in entries {
        let data = levels.entry(*level).or_default();
        index.entries_mut().push(ResourceEntry {
            id: *id,
            kind: "file".into(),
            full_name: (*name).into(),
            offset: data.len() as i64,
            size: payload.len() as i32,
            compressed_size: payload.len() as i32,
            patch_level: *level,
            ..Default::default()
        });
        data.extend_from_slice(payload);
    }

    for (level, data) in levels {
        std::fs::write(index.locator().data_path(level), data)?;
    }
    index.save()?;

    ResourceIndex::from_path(&path)
}

/// Decompressed payload of the entry called `name`
pub fn payload(index: &mut ResourceIndex, name: &str) -> Result<Vec<u8>> {
    let entry = index
        .by_name(name)
        .cloned()
        .ok_or_else(|| doom_resources::error::Error::EntryNotFound(name.into()))?;

    let mut buffer = Vec::new();
    index.copy_entry(&entry, &mut buffer)?;
    Ok(buffer)
}
