use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::{
    api::{Source, apsystems::EnergyLevel},
    cli::apsystems::ApiArgs,
    coordinator::Coordinator,
    entity::Entities,
    prelude::*,
    tables::build_entities_table,
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        match self.command {
            BurrowCommand::Snapshot(args) => args.run().await,
            BurrowCommand::InverterEnergyToday(args) => args.run().await,
            BurrowCommand::InverterPower(args) => args.run().await,
            BurrowCommand::InverterBatch(args) => args.run().await,
            BurrowCommand::EcuEnergy(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
pub enum BurrowCommand {
    /// Run a single polling cycle and print the sensors.
    Snapshot(BurrowSnapshotArgs),

    /// Fetch today's energy of a single inverter.
    InverterEnergyToday(BurrowInverterEnergyTodayArgs),

    /// Fetch today's power telemetry of the inverters under an ECU.
    InverterPower(BurrowInverterPowerArgs),

    /// Fetch the power or energy of all inverters under an ECU on the specific date.
    InverterBatch(BurrowInverterBatchArgs),

    /// Fetch the energy summary of an ECU, or its energy on the specific date.
    EcuEnergy(BurrowEcuEnergyArgs),
}

#[derive(Parser)]
pub struct BurrowSnapshotArgs {
    #[clap(flatten)]
    api: ApiArgs,
}

impl BurrowSnapshotArgs {
    async fn run(self) -> Result {
        let coordinator = Coordinator::new(self.api.connect()?);
        let snapshot = coordinator.refresh().await?;
        for error in &snapshot.errors {
            warn!("{error}");
        }
        let entities = Entities::discover(coordinator.source().system_id(), &snapshot);
        println!("{}", build_entities_table(&entities, &snapshot));
        Ok(())
    }
}

#[derive(Parser)]
pub struct BurrowInverterEnergyTodayArgs {
    #[clap(flatten)]
    api: ApiArgs,

    #[clap(long = "inverter-id", alias = "uid")]
    inverter_id: String,
}

impl BurrowInverterEnergyTodayArgs {
    async fn run(self) -> Result {
        let coordinator = Coordinator::new(self.api.connect()?);
        print_json(&Value::Object(coordinator.inverter_energy_today(&self.inverter_id).await))
    }
}

#[derive(Parser)]
pub struct BurrowInverterPowerArgs {
    #[clap(flatten)]
    api: ApiArgs,

    #[clap(long = "ecu-id", alias = "eid")]
    ecu_id: String,
}

impl BurrowInverterPowerArgs {
    async fn run(self) -> Result {
        let coordinator = Coordinator::new(self.api.connect()?);
        print_json(&Value::Object(coordinator.inverter_power(&self.ecu_id).await))
    }
}

#[derive(Parser)]
pub struct BurrowInverterBatchArgs {
    #[clap(flatten)]
    api: ApiArgs,

    #[clap(long = "ecu-id", alias = "eid")]
    ecu_id: String,

    #[clap(long, value_enum, default_value_t = EnergyLevel::Energy)]
    level: EnergyLevel,

    #[clap(long)]
    date: NaiveDate,
}

impl BurrowInverterBatchArgs {
    async fn run(self) -> Result {
        let batch = self
            .api
            .connect()?
            .get_inverter_batch_energy(&self.ecu_id, self.level, self.date)
            .await?;
        print_json(&Value::Object(batch))
    }
}

#[derive(Parser)]
pub struct BurrowEcuEnergyArgs {
    #[clap(flatten)]
    api: ApiArgs,

    #[clap(long = "ecu-id", alias = "eid")]
    ecu_id: String,

    /// Fetch the energy on this date instead of the summary.
    #[clap(long)]
    date: Option<NaiveDate>,
}

impl BurrowEcuEnergyArgs {
    async fn run(self) -> Result {
        let api = self.api.connect()?;
        let energy = match self.date {
            Some(date) => api.get_ecu_energy_period(&self.ecu_id, date, date).await?,
            None => api.get_ecu_energy(&self.ecu_id).await?,
        };
        print_json(&Value::Object(energy))
    }
}

fn print_json(value: &Value) -> Result {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
