use serde::Serialize;

use crate::{
    api::apsystems::{Attributes, number},
    quantity::{KilowattHours, Watts},
    snapshot::Snapshot,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Power,
    Energy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorKind {
    SystemPower,
    SystemEnergyToday,
    SystemEnergyTotal,

    /// Only reported by the OpenAPI.
    SystemMaxPower,

    InverterPower,
    InverterEnergyTotal,
}

impl SensorKind {
    pub const SYSTEM: [Self; 3] =
        [Self::SystemPower, Self::SystemEnergyToday, Self::SystemEnergyTotal];
    pub const INVERTER: [Self; 2] = [Self::InverterPower, Self::InverterEnergyTotal];

    /// Suffix of the unique ID.
    pub const fn key(self) -> &'static str {
        match self {
            Self::SystemPower => "system_power",
            Self::SystemEnergyToday => "system_energy_today",
            Self::SystemEnergyTotal => "system_energy_total",
            Self::SystemMaxPower => "max_power",
            Self::InverterPower => "inverter_power",
            Self::InverterEnergyTotal => "inverter_energy_total",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::SystemPower => "System Power",
            Self::SystemEnergyToday => "System Energy Today",
            Self::SystemEnergyTotal => "System Energy Total",
            Self::SystemMaxPower => "Max Power",
            Self::InverterPower => "Inverter Power",
            Self::InverterEnergyTotal => "Inverter Energy Total",
        }
    }

    pub const fn device_class(self) -> DeviceClass {
        match self {
            Self::SystemPower | Self::SystemMaxPower | Self::InverterPower => DeviceClass::Power,
            Self::SystemEnergyToday | Self::SystemEnergyTotal | Self::InverterEnergyTotal => {
                DeviceClass::Energy
            }
        }
    }

    pub const fn state_class(self) -> StateClass {
        match self.device_class() {
            DeviceClass::Power => StateClass::Measurement,
            DeviceClass::Energy => StateClass::TotalIncreasing,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self.device_class() {
            DeviceClass::Power => Watts::UNIT,
            DeviceClass::Energy => KilowattHours::UNIT,
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::SystemPower | Self::InverterPower => "mdi:solar-power",
            Self::SystemMaxPower => "mdi:flash",
            Self::SystemEnergyToday | Self::SystemEnergyTotal | Self::InverterEnergyTotal => {
                "mdi:solar-panel"
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, derive_more::Display)]
pub enum Reading {
    Power(Watts),
    Energy(KilowattHours),
}

impl Reading {
    fn new(device_class: DeviceClass, value: f64) -> Self {
        match device_class {
            DeviceClass::Power => Self::Power(Watts(value)),
            DeviceClass::Energy => Self::Energy(KilowattHours(value)),
        }
    }

    pub const fn value(self) -> f64 {
        match self {
            Self::Power(Watts(value)) | Self::Energy(KilowattHours(value)) => value,
        }
    }
}

/// Read-only view of one field of the latest snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sensor {
    pub kind: SensorKind,
    pub unique_id: String,
    pub name: String,

    /// Set for the inverter sensors.
    pub inverter_id: Option<String>,
}

impl Sensor {
    pub fn system(system_id: &str, kind: SensorKind) -> Self {
        Self {
            kind,
            unique_id: format!("{system_id}_{}", kind.key()),
            name: format!("APSystems {}", kind.name()),
            inverter_id: None,
        }
    }

    pub fn inverter(system_id: &str, inverter_id: &str, kind: SensorKind) -> Self {
        Self {
            kind,
            unique_id: format!("{system_id}_{inverter_id}_{}", kind.key()),
            name: format!("APSystems Inverter {inverter_id} {}", kind.name()),
            inverter_id: Some(inverter_id.to_owned()),
        }
    }

    /// Current reading, `None` when the field is absent from the snapshot.
    pub fn read(&self, snapshot: &Snapshot) -> Option<Reading> {
        let value = match self.kind {
            SensorKind::SystemPower => number(&snapshot.system_energy, &["power", "currentPower"]),
            SensorKind::SystemEnergyToday => {
                number(&snapshot.system_energy_today, &["energy", "todayEnergy"])
            }
            SensorKind::SystemEnergyTotal => {
                // The OpenAPI reports the lifetime energy along with today's.
                number(&snapshot.system_energy, &["energy", "lifetimeEnergy"])
                    .or_else(|| number(&snapshot.system_energy_today, &["lifetimeEnergy"]))
            }
            SensorKind::SystemMaxPower => number(&snapshot.system_energy, &["maxPower"]),
            SensorKind::InverterPower => {
                self.inverter_data(snapshot).and_then(|data| number(data, &["power"]))
            }
            SensorKind::InverterEnergyTotal => {
                self.inverter_data(snapshot).and_then(|data| number(data, &["energy"]))
            }
        }?;
        Some(Reading::new(self.kind.device_class(), value))
    }

    fn inverter_data<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Attributes> {
        snapshot.inverter_data(self.inverter_id.as_deref()?)
    }
}
