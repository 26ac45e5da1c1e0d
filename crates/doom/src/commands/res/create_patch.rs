use clap::Args;
use doom_resources::{RebuildOptions, ResourceIndex};
use miette::{miette, Context, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct CreatePatchArgs {
    /// The index file of the newest patch level
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A directory of files replacing or adding entries
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// DEFLATE level for written entries
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression: u32,

    /// Allow replacing the files of an existing patch level
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl CreatePatchArgs {
    pub fn handle(&self) -> Result<()> {
        let mut index = ResourceIndex::from_path(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        let level = index.prepare_patch()?;
        let data = index.locator().data_path(level);
        if data.exists() && !self.overwrite {
            return Err(miette!(
                "patch level {level} already exists at {}",
                data.display()
            ));
        }
        info!("creating patch level {level}");

        let options = RebuildOptions::builder()
            .compression_level(self.compression)
            .build();
        super::rebuild_in_place(&mut index, Some(&self.directory), &options)?;

        Ok(())
    }
}
