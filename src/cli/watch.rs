use std::io::{Write, stdout};

use clap::Parser;
use tokio::{select, signal::ctrl_c};

use crate::{
    api::{Source, apsystems::Api},
    cli::{apsystems::ApiArgs, heartbeat::HeartbeatArgs},
    entity::Record,
    prelude::*,
    setup::Integration,
};

#[derive(Parser)]
pub struct WatchArgs {
    #[clap(flatten)]
    api: ApiArgs,

    #[clap(flatten)]
    heartbeat: HeartbeatArgs,
}

impl WatchArgs {
    pub async fn run(self) -> Result {
        let integration = Integration::setup(self.api.connect()?).await?;
        info!(title = integration.info.title.as_str(), "set up");

        select! {
            () = integration.coordinator.run() => Ok(()),
            result = publish_cycles(&integration, &self.heartbeat) => result,
            result = ctrl_c() => {
                info!("interrupted");
                result.context("failed to listen for Ctrl+C")
            }
        }
    }
}

/// Publish the entity states after every cycle, starting with the current state.
///
/// A failed cycle republishes the previous states marked unavailable.
async fn publish_cycles(integration: &Integration<Api>, heartbeat: &HeartbeatArgs) -> Result {
    let mut receiver = integration.coordinator.subscribe();
    let system_id = integration.coordinator.source().system_id();
    loop {
        let is_available = receiver.borrow_and_update().is_available;
        publish(&integration.records())?;
        heartbeat.send(system_id, is_available).await;
        receiver.changed().await.context("the coordinator is gone")?;
    }
}

/// Write one JSON line per entity.
fn publish(records: &[Record]) -> Result {
    let mut stdout = stdout().lock();
    for record in records {
        serde_json::to_writer(&mut stdout, record)?;
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}
