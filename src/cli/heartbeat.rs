use std::time::Duration;

use clap::Parser;
use reqwest::{Client, Url};

use crate::prelude::*;

/// Ping a dead man's switch after every cycle.
///
/// Failed cycles ping `<url>/fail`, so the monitor goes down along with the system.
#[derive(Parser)]
pub struct HeartbeatArgs {
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub url: Option<Url>,
}

impl HeartbeatArgs {
    pub async fn send(&self, system_id: &str, is_available: bool) {
        if let Some(url) = &self.url
            && let Err(error) = Self::send_fallible(url, system_id, is_available).await
        {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all, fields(system_id = system_id, is_available = is_available))]
    async fn send_fallible(url: &Url, system_id: &str, is_available: bool) -> Result {
        let url = ping_url(url, is_available)?;
        info!("sending a heartbeat…");
        Client::builder()
            .timeout(Duration::from_secs(3))
            .build()?
            .post(url)
            .body(system_id.to_owned())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn ping_url(url: &Url, is_available: bool) -> Result<Url> {
    let mut url = url.clone();
    if !is_available {
        url.path_segments_mut()
            .map_err(|()| anyhow!("the heartbeat URL cannot have a path"))?
            .pop_if_empty()
            .push("fail");
    }
    Ok(url)
}
