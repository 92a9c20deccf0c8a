use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::apsystems::{Attributes, EnergyLevel, Error, Inverter};

/// Everything the coordinator needs from a monitored system.
///
/// Implementations are bound to a single system ID.
#[async_trait]
pub trait Source: Send + Sync {
    fn system_id(&self) -> &str;

    async fn get_system_details(&self) -> Result<Attributes, Error>;

    async fn get_system_energy(&self) -> Result<Attributes, Error>;

    async fn get_system_energy_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attributes, Error>;

    async fn get_inverters(&self) -> Result<Vec<Inverter>, Error>;

    async fn get_meters(&self) -> Result<Vec<Attributes>, Error>;

    async fn get_inverter_energy(&self, inverter_id: &str) -> Result<Attributes, Error>;

    async fn get_inverter_energy_period(
        &self,
        inverter_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attributes, Error>;

    async fn get_inverter_batch_energy(
        &self,
        ecu_id: &str,
        level: EnergyLevel,
        date: NaiveDate,
    ) -> Result<Attributes, Error>;
}
