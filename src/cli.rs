pub mod apsystems;
mod burrow;
mod heartbeat;
mod watch;

use clap::{Parser, Subcommand};

use crate::{
    cli::{apsystems::ApiArgs, burrow::BurrowArgs, watch::WatchArgs},
    prelude::*,
    setup::validate,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: poll the system and publish the entity states.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),

    /// Check the credentials and the system ID.
    #[clap(name = "validate")]
    Validate(Box<ValidateArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

impl Command {
    pub async fn run(self) -> Result {
        match self {
            Self::Watch(args) => args.run().await,
            Self::Validate(args) => args.run().await,
            Self::Burrow(args) => args.run().await,
        }
    }
}

#[derive(Parser)]
pub struct ValidateArgs {
    #[clap(flatten)]
    api: ApiArgs,
}

impl ValidateArgs {
    async fn run(self) -> Result {
        let info = validate(&self.api.connect()?).await?;
        println!("{}: {}", info.title, info.system_name);
        Ok(())
    }
}
