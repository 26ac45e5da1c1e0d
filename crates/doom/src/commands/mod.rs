pub mod res;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle resource containers
    Res {
        #[command(subcommand)]
        command: res::ResCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Res { command } => command.handle(),
        }
    }
}
