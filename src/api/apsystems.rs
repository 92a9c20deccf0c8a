//! [APSystems](https://emaapp.apsystemsema.com) cloud client: EMA API and OpenAPI.

mod auth;
mod endpoint;
mod error;
mod models;
mod preset;
mod response;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use self::{
    auth::Credentials,
    endpoint::{Operation, PathParameters},
    error::Error,
    models::{Attributes, EnergyLevel, Inverter, number, text},
    preset::Preset,
};
use self::{
    models::{Inverters, Meters},
    response::Envelope,
};
use crate::{api::Source, prelude::*};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Api {
    client: Client,
    base_url: String,
    preset: Preset,
    credentials: Credentials,
}

impl Api {
    pub fn new(preset: Preset, credentials: Credentials) -> Result<Self> {
        Self::with_base_url(preset, credentials, preset.base_url())
    }

    pub fn with_base_url(
        preset: Preset,
        credentials: Credentials,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build the HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url, preset, credentials })
    }

    /// Call a catalog operation and unwrap the response envelope.
    #[instrument(skip_all, level = Level::DEBUG, fields(%operation))]
    pub async fn call(
        &self,
        operation: Operation,
        parameters: PathParameters<'_>,
        query: &[(&str, String)],
    ) -> Result<Value, Error> {
        let catalog = self.preset.catalog();
        let endpoint = catalog.lookup(operation)?;
        let path = format!("{}{}", catalog.prefix, endpoint.render(&parameters)?);
        let query = endpoint.select_query(query)?;
        let headers = self
            .preset
            .scheme()
            .headers(&self.credentials, &endpoint.method, &path)
            .map_err(|error| Error::Configuration { operation, message: error.to_string() })?;

        let envelope = self
            .client
            .request(endpoint.method.clone(), format!("{}{path}", self.base_url))
            .headers(headers)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<Envelope>()
            .await
            .map_err(|error| Error::Transport(format!("malformed `{path}` response: {error}")))?;
        let data = envelope.into_result(self.preset.success_code())?;
        debug!(path = path.as_str(), "call succeeded");
        Ok(data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str(), ecu_id = ecu_id))]
    pub async fn get_ecu_energy(&self, ecu_id: &str) -> Result<Attributes, Error> {
        let data = self
            .call(Operation::EcuEnergySummary, self.system().ecu(ecu_id), &[])
            .await?;
        decode(Operation::EcuEnergySummary, data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str(), ecu_id = ecu_id, %start, %end))]
    pub async fn get_ecu_energy_period(
        &self,
        ecu_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attributes, Error> {
        let data = self
            .call(Operation::EcuEnergyPeriod, self.system().ecu(ecu_id), &period_query(start, end))
            .await?;
        decode(Operation::EcuEnergyPeriod, data)
    }

    fn system(&self) -> PathParameters<'_> {
        PathParameters::system(&self.credentials.system_id)
    }
}

#[async_trait]
impl Source for Api {
    fn system_id(&self) -> &str {
        &self.credentials.system_id
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str()))]
    async fn get_system_details(&self) -> Result<Attributes, Error> {
        info!("fetching…");
        let data = self.call(Operation::SystemDetails, self.system(), &[]).await?;
        decode(Operation::SystemDetails, data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str()))]
    async fn get_system_energy(&self) -> Result<Attributes, Error> {
        let data = self.call(Operation::SystemEnergySummary, self.system(), &[]).await?;
        decode(Operation::SystemEnergySummary, data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str(), %start, %end))]
    async fn get_system_energy_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attributes, Error> {
        let data = self
            .call(Operation::SystemEnergyPeriod, self.system(), &period_query(start, end))
            .await?;
        decode(Operation::SystemEnergyPeriod, data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str()))]
    async fn get_inverters(&self) -> Result<Vec<Inverter>, Error> {
        let data = self.call(Operation::InverterList, self.system(), &[]).await?;
        let inverters = decode::<Inverters>(Operation::InverterList, data)?.0;
        info!(n_inverters = inverters.len(), "fetched");
        Ok(inverters)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str()))]
    async fn get_meters(&self) -> Result<Vec<Attributes>, Error> {
        let data = self.call(Operation::MeterList, self.system(), &[]).await?;
        Ok(decode::<Meters>(Operation::MeterList, data)?.0)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str(), inverter_id = inverter_id))]
    async fn get_inverter_energy(&self, inverter_id: &str) -> Result<Attributes, Error> {
        let data = self
            .call(Operation::InverterEnergySummary, self.system().inverter(inverter_id), &[])
            .await?;
        decode(Operation::InverterEnergySummary, data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str(), inverter_id = inverter_id, %start, %end))]
    async fn get_inverter_energy_period(
        &self,
        inverter_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attributes, Error> {
        let data = self
            .call(
                Operation::InverterEnergyPeriod,
                self.system().inverter(inverter_id),
                &period_query(start, end),
            )
            .await?;
        decode(Operation::InverterEnergyPeriod, data)
    }

    #[instrument(skip_all, fields(system_id = self.credentials.system_id.as_str(), ecu_id = ecu_id, %level, %date))]
    async fn get_inverter_batch_energy(
        &self,
        ecu_id: &str,
        level: EnergyLevel,
        date: NaiveDate,
    ) -> Result<Attributes, Error> {
        let query = [("energy_level", level.to_string()), ("date_range", format_date(date))];
        let data =
            self.call(Operation::InverterBatchEnergy, self.system().ecu(ecu_id), &query).await?;
        decode(Operation::InverterBatchEnergy, data)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Both spellings of a date range: EMA wants a range, OpenAPI a single day.
fn period_query(start: NaiveDate, end: NaiveDate) -> [(&'static str, String); 3] {
    [("start_date", format_date(start)), ("end_date", format_date(end)), ("date", format_date(start))]
}

/// Deserialize the envelope payload; a missing payload is the empty default.
fn decode<T: DeserializeOwned + Default>(operation: Operation, data: Value) -> Result<T, Error> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
        .map_err(|error| Error::Transport(format!("unexpected `{operation}` payload: {error}")))
}
