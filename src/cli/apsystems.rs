use clap::Parser;
use reqwest::Url;

use crate::{
    api::apsystems::{Api, Credentials, Preset},
    prelude::*,
};

#[derive(Parser)]
pub struct ApiArgs {
    #[clap(long = "app-id", env = "APSYSTEMS_APP_ID")]
    pub app_id: String,

    #[clap(long = "app-secret", env = "APSYSTEMS_APP_SECRET", hide_env_values = true)]
    pub app_secret: String,

    #[clap(long = "system-id", alias = "sid", env = "APSYSTEMS_SYSTEM_ID")]
    pub system_id: String,

    /// Cloud flavour: HMAC-signed EMA API or the static-header OpenAPI.
    #[clap(long, env = "APSYSTEMS_PRESET", value_enum, default_value_t = Preset::Ema)]
    pub preset: Preset,

    /// Override the preset's base URL.
    #[clap(long = "base-url", env = "APSYSTEMS_BASE_URL")]
    pub base_url: Option<Url>,
}

impl ApiArgs {
    pub fn connect(self) -> Result<Api> {
        let credentials = Credentials {
            app_id: self.app_id,
            app_secret: self.app_secret,
            system_id: self.system_id,
        };
        info!(preset = %self.preset, system_id = credentials.system_id.as_str(), "connecting…");
        match self.base_url {
            Some(base_url) => Api::with_base_url(self.preset, credentials, base_url.as_str()),
            None => Api::new(self.preset, credentials),
        }
    }
}
