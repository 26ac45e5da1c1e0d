use clap::Args;
use doom_resources::{extract, ExtractOptions, ResourceIndex};
use miette::{Context, Result};
use std::path::PathBuf;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Only extract entries whose name contains this, may be repeated
    #[arg(short, long = "name", value_name = "TEXT")]
    names: Vec<String>,

    /// Only extract entries of this kind, may be repeated
    #[arg(short, long = "kind", value_name = "KIND")]
    kinds: Vec<String>,

    /// Allow writing into a directory that is not empty
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Only list what would be written
    #[arg(long, default_value_t = false)]
    simulate: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut index = ResourceIndex::from_path(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        let options = ExtractOptions::builder()
            .names(self.names.clone())
            .kinds(self.kinds.clone())
            .force(self.force)
            .simulate(self.simulate)
            .build();

        let report = extract(&mut index, &self.directory, &options)
            .context(format!("extracting into {}", self.directory.display()))?;

        println!(
            "{} extracted, {} placeholders, {} filtered, {} unavailable",
            report.extracted, report.skipped_empty, report.filtered, report.unavailable
        );

        Ok(())
    }
}
