use pretty_assertions::assert_eq;
use std::fs;

use doom_resources::{error::Result, extract, ExtractOptions, RebuildOptions, ResourceEntry};
use tracing_test::traced_test;

mod common;
use common::{container, noise, payload};

#[traced_test]
#[test]
fn extracted_folder_rebuilds_into_patch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (a, b) = (noise(64, 13), b"decl { }".repeat(20));
    let mut index = container(dir.path(), 5, &[(10, "maps/e1m1.map", 0, &a), (4, "decls/b.decl", 0, &b)])?;
    index.entries_mut()[1].kind = "renderParm".into();
    index.entries_mut().push(ResourceEntry {
        id: 20,
        kind: "file".into(),
        ..Default::default()
    });

    let folder = dir.path().join("extracted");
    let report = extract(&mut index, &folder, &ExtractOptions::default())?;
    assert_eq!(report.extracted, 2);
    assert_eq!(report.skipped_empty, 1);
    assert!(folder.join("decls/b.decl;renderParm").exists());

    let before = index.entries().to_vec();
    index.prepare_patch()?;
    let destination = index.locator().data_path(1);
    let rebuilt = index.rebuild(&destination, Some(&folder), &RebuildOptions::default())?;

    assert_eq!(rebuilt.rewritten, 2);
    assert_eq!(rebuilt.inherited, 1);
    assert_eq!(rebuilt.added, 0);
    assert!(rebuilt.conflicts.is_empty());

    for entry in index.entries() {
        let original = before
            .iter()
            .find(|e| e.id == entry.id)
            .expect("ids survive the round trip");
        assert_eq!(entry.kind, original.kind);
        assert_eq!(entry.name(), original.name());
    }
    assert_eq!(payload(&mut index, "maps/e1m1.map")?, a);
    assert_eq!(payload(&mut index, "decls/b.decl")?, b);

    Ok(())
}

#[traced_test]
#[test]
fn filtered_extract_writes_subset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut index = container(
        dir.path(),
        3,
        &[(1, "maps/e1m1.map", 0, &noise(8, 14)), (2, "strings/english.lang", 0, b"hello")],
    )?;

    let folder = dir.path().join("out");
    let options = ExtractOptions::builder().names(vec!["ENGLISH".into()]).build();
    let report = extract(&mut index, &folder, &options)?;

    assert_eq!(report.extracted, 1);
    assert_eq!(report.filtered, 1);
    assert!(!folder.join("maps").exists());
    assert_eq!(fs::read(folder.join("strings/english.lang"))?, b"hello");
    assert_eq!(fs::read_to_string(folder.join("fileIds.txt"))?, "strings/english.lang=2\n");

    Ok(())
}
