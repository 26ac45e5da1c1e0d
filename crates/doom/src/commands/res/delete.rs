use clap::Args;
use doom_resources::{RebuildOptions, ResourceIndex};
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct DeleteArgs {
    /// An input index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Names of the entries to remove
    #[arg(required = true, value_name = "NAME")]
    names: Vec<String>,
}

impl DeleteArgs {
    pub fn handle(&self) -> Result<()> {
        let mut index = ResourceIndex::from_path(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        let removed = index.remove_all_by_name(&self.names)?;
        if removed == 0 {
            println!("no entries removed, {} left unchanged", self.file.display());
            return Ok(());
        }

        let options = RebuildOptions::builder().index_path(self.file.clone()).build();
        super::rebuild_in_place(&mut index, None, &options)?;
        println!("removed {} entries", removed.red());

        Ok(())
    }
}
