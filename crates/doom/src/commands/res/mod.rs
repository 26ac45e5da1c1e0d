use doom_resources::{write::with_suffix, RebuildOptions, RebuildReport, ResourceIndex};
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tracing::info;

pub mod create_patch;
pub mod delete;
pub mod extract;
pub mod info;
pub mod repack;

#[derive(clap::Subcommand)]
pub enum ResCommands {
    /// Show the patch levels and entries of a container
    Info(info::InfoArgs),
    /// Extract a container into a directory
    Extract(extract::ExtractArgs),
    /// Rebuild the current patch level, optionally merging a directory into it
    Repack(repack::RepackArgs),
    /// Merge a directory into a new patch level
    CreatePatch(create_patch::CreatePatchArgs),
    /// Remove entries and rebuild the current patch level
    Delete(delete::DeleteArgs),
}

impl ResCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            ResCommands::Info(info) => info.handle(),
            ResCommands::Extract(extract) => extract.handle(),
            ResCommands::Repack(repack) => repack.handle(),
            ResCommands::CreatePatch(create_patch) => create_patch.handle(),
            ResCommands::Delete(delete) => delete.handle(),
        }
    }
}

/// Rebuild the current level next to its data file, then move the result over it
fn rebuild_in_place(
    index: &mut ResourceIndex,
    overrides: Option<&Path>,
    options: &RebuildOptions,
) -> Result<RebuildReport> {
    let live = index.locator().data_path(index.patch_level());
    let temporary = with_suffix(&live, "_tmp");

    let report = index
        .rebuild(&temporary, overrides, options)
        .context(format!("rebuilding into {}", temporary.display()))?;
    index.close();

    std::fs::rename(&temporary, &live)
        .into_diagnostic()
        .context(format!("replacing {}", live.display()))?;
    info!("wrote {}", live.display());

    for conflict in &report.conflicts {
        eprintln!("{} {conflict}", "conflict:".yellow());
    }
    println!(
        "{} entries: {} inherited, {} rewritten, {} added ({} bytes)",
        index.len(),
        report.inherited,
        report.rewritten,
        report.added.green(),
        report.bytes_written
    );

    Ok(report)
}
