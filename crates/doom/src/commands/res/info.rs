use clap::Args;
use doom_resources::ResourceIndex;
use itertools::Itertools;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// List every entry
    #[arg(long, default_value_t = false)]
    entries: bool,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let index = ResourceIndex::from_path(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        println!(
            "{} (version {}, patch level {}, {} entries)",
            self.file.display().bold(),
            index.header_version(),
            index.patch_level(),
            index.len()
        );

        for level in index.summary() {
            let name = level.data_path.display().to_string();
            let name = if level.data_path.exists() {
                name
            } else {
                format!("{} (missing)", name.red())
            };
            println!("  {:>3}: {:>6} entries in {name}", level.level, level.entries);
        }

        if self.entries {
            for entry in index.entries().iter().sorted_by(|a, b| a.name().cmp(b.name())) {
                println!(
                    "{:>10} {:<16} {:>3} {:>10} {}",
                    entry.id,
                    entry.kind,
                    entry.patch_level,
                    entry.size,
                    entry.name()
                );
            }
        }

        Ok(())
    }
}
