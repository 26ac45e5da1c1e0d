use clap::Args;
use doom_resources::{RebuildOptions, ResourceIndex};
use miette::{Context, Result};
use std::path::PathBuf;

#[derive(Args)]
pub struct RepackArgs {
    /// An input index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A directory of files replacing or adding entries
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// DEFLATE level for rewritten entries
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression: u32,
}

impl RepackArgs {
    pub fn handle(&self) -> Result<()> {
        let mut index = ResourceIndex::from_path(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        let options = RebuildOptions::builder()
            .compression_level(self.compression)
            .index_path(self.file.clone())
            .build();

        super::rebuild_in_place(&mut index, self.directory.as_deref(), &options)?;

        Ok(())
    }
}
