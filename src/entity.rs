//! Read-only projections of the latest [`Snapshot`]: sensors and device trackers.

mod device;
mod sensor;
mod tracker;

use serde::Serialize;

pub use self::{
    device::{DeviceInfo, MANUFACTURER, system_name},
    sensor::{DeviceClass, Reading, Sensor, SensorKind, StateClass},
    tracker::Tracker,
};
use crate::{api::apsystems::number, snapshot::Snapshot};

/// Entities of one system.
///
/// The set is fixed at discovery, states are projected from whatever snapshot is passed in.
#[derive(Debug, Default)]
pub struct Entities {
    system_id: String,
    pub sensors: Vec<Sensor>,
    pub trackers: Vec<Tracker>,
}

impl Entities {
    pub fn discover(system_id: &str, snapshot: &Snapshot) -> Self {
        let mut sensors: Vec<Sensor> =
            SensorKind::SYSTEM.into_iter().map(|kind| Sensor::system(system_id, kind)).collect();
        if number(&snapshot.system_energy, &["maxPower"]).is_some() {
            sensors.push(Sensor::system(system_id, SensorKind::SystemMaxPower));
        }
        let mut trackers = vec![Tracker::system(system_id, snapshot)];

        for inverter_id in snapshot.inverter_ids() {
            sensors.extend(
                SensorKind::INVERTER
                    .into_iter()
                    .map(|kind| Sensor::inverter(system_id, inverter_id, kind)),
            );
            trackers.push(Tracker::inverter(system_id, inverter_id));
        }

        Self { system_id: system_id.to_owned(), sensors, trackers }
    }

    /// Project the entity states.
    ///
    /// After a failed cycle the entities are unavailable, and no tracker reads connected.
    pub fn records(&self, snapshot: &Snapshot, is_available: bool) -> Vec<Record> {
        let sensors = self.sensors.iter().map(|sensor| Record::Sensor {
            unique_id: sensor.unique_id.clone(),
            name: sensor.name.clone(),
            available: is_available,
            state: sensor.read(snapshot).map(Reading::value),
            unit: sensor.kind.unit(),
            device_class: sensor.kind.device_class(),
            state_class: sensor.kind.state_class(),
            icon: sensor.kind.icon(),
            device: self.device(sensor.inverter_id.as_deref(), snapshot),
        });
        let trackers = self.trackers.iter().map(|tracker| Record::DeviceTracker {
            unique_id: tracker.unique_id.clone(),
            name: tracker.name.clone(),
            available: is_available,
            is_connected: is_available && tracker.is_connected(snapshot),
            icon: tracker.icon(),
            device: self.device(tracker.inverter_id.as_deref(), snapshot),
        });
        sensors.chain(trackers).collect()
    }

    fn device(&self, inverter_id: Option<&str>, snapshot: &Snapshot) -> DeviceInfo {
        match inverter_id {
            Some(inverter_id) => DeviceInfo::inverter(&self.system_id, inverter_id, snapshot),
            None => DeviceInfo::system(&self.system_id, snapshot),
        }
    }
}

/// Flat entity state as published to the host.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum Record {
    Sensor {
        unique_id: String,
        name: String,
        available: bool,
        state: Option<f64>,
        unit: &'static str,
        device_class: DeviceClass,
        state_class: StateClass,
        icon: &'static str,
        device: DeviceInfo,
    },

    DeviceTracker {
        unique_id: String,
        name: String,
        available: bool,
        is_connected: bool,
        icon: &'static str,
        device: DeviceInfo,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_abs_diff_eq;
    use chrono::Local;
    use serde_json::{Value, json};

    use super::*;
    use crate::api::apsystems::{Attributes, Inverter};

    fn attributes(value: Value) -> Attributes {
        let Value::Object(attributes) = value else { unreachable!() };
        attributes
    }

    fn inverter(uid: &str) -> Inverter {
        Inverter {
            uid: uid.to_owned(),
            model: Some("DS3".to_owned()),
            firmware: Some("DS3_1.2.5".to_owned()),
            ..Inverter::default()
        }
    }

    fn ema_snapshot() -> Snapshot {
        Snapshot {
            system_details: attributes(json!({"name": "Roof", "type": 1})),
            system_energy: attributes(json!({"power": "812.5", "energy": 1234.5})),
            system_energy_today: attributes(json!({"energy": 4.25})),
            inverters: vec![inverter("INV1"), inverter("INV2"), inverter("")],
            inverter_data: BTreeMap::from([
                ("INV1".to_owned(), attributes(json!({"power": 270.0, "energy": 321.0}))),
                ("INV2".to_owned(), Attributes::new()),
            ]),
            last_update: Some(Local::now()),
            ..Snapshot::default()
        }
    }

    fn sensor_state(records: &[Record], unique_id: &str) -> Option<f64> {
        records.iter().find_map(|record| match record {
            Record::Sensor { unique_id: id, state, .. } if id == unique_id => Some(*state),
            _ => None,
        })?
    }

    fn tracker_state(records: &[Record], unique_id: &str) -> Option<bool> {
        records.iter().find_map(|record| match record {
            Record::DeviceTracker { unique_id: id, is_connected, .. } if id == unique_id => {
                Some(*is_connected)
            }
            _ => None,
        })
    }

    #[test]
    fn discover_ok() {
        let entities = Entities::discover("SYS1", &ema_snapshot());
        assert_eq!(entities.sensors.len(), 3 + 2 * 2);
        assert_eq!(entities.trackers.len(), 1 + 2);
        assert_eq!(entities.sensors[0].unique_id, "SYS1_system_power");
        assert_eq!(entities.sensors[0].name, "APSystems System Power");
        assert_eq!(entities.sensors[3].unique_id, "SYS1_INV1_inverter_power");
        assert_eq!(entities.trackers[0].unique_id, "SYS1_system");
        assert_eq!(entities.trackers[0].name, "APSystems Roof");
        assert_eq!(entities.trackers[2].unique_id, "SYS1_INV2");
    }

    #[test]
    fn records_ok() {
        let snapshot = ema_snapshot();
        let records = Entities::discover("SYS1", &snapshot).records(&snapshot, true);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_system_power").unwrap(), 812.5);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_system_energy_today").unwrap(), 4.25);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_system_energy_total").unwrap(), 1234.5);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_INV1_inverter_energy_total").unwrap(), 321.0);
        assert_eq!(sensor_state(&records, "SYS1_INV2_inverter_power"), None);
        assert_eq!(tracker_state(&records, "SYS1_system"), Some(true));
        assert_eq!(tracker_state(&records, "SYS1_INV1"), Some(true));
        assert_eq!(tracker_state(&records, "SYS1_INV2"), Some(false));
    }

    #[test]
    fn open_api_aliases_ok() {
        let snapshot = Snapshot {
            system_energy: attributes(json!({"currentPower": 640, "maxPower": 2100})),
            system_energy_today: attributes(json!({"todayEnergy": "3.5", "lifetimeEnergy": 987.0})),
            last_update: Some(Local::now()),
            ..Snapshot::default()
        };
        let entities = Entities::discover("SYS1", &snapshot);
        assert_eq!(entities.sensors.len(), 4);
        let records = entities.records(&snapshot, true);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_system_power").unwrap(), 640.0);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_max_power").unwrap(), 2100.0);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_system_energy_today").unwrap(), 3.5);
        assert_abs_diff_eq!(sensor_state(&records, "SYS1_system_energy_total").unwrap(), 987.0);
    }

    #[test]
    fn empty_snapshot_is_absent() {
        let entities = Entities::discover("SYS1", &ema_snapshot());
        let records = entities.records(&Snapshot::default(), true);
        assert_eq!(records.len(), entities.sensors.len() + entities.trackers.len());
        for record in &records {
            match record {
                Record::Sensor { unique_id, state, .. } => assert_eq!(*state, None, "{unique_id}"),
                Record::DeviceTracker { is_connected, .. } => assert!(!is_connected),
            }
        }
    }

    #[test]
    fn unavailable_after_failed_cycle() {
        let snapshot = ema_snapshot();
        let records = Entities::discover("SYS1", &snapshot).records(&snapshot, false);
        for record in &records {
            match record {
                Record::Sensor { available, .. } => assert!(!available),
                Record::DeviceTracker { available, is_connected, .. } => {
                    assert!(!available);
                    assert!(!is_connected);
                }
            }
        }
        assert_eq!(tracker_state(&records, "SYS1_system"), Some(false));
    }

    #[test]
    fn device_info_ok() {
        let snapshot = ema_snapshot();
        let system = DeviceInfo::system("SYS1", &snapshot);
        assert_eq!(system.name, "APSystems Roof");
        assert_eq!(system.model, "1");
        assert_eq!(system.manufacturer, MANUFACTURER);
        assert_eq!(system.via_device, None);

        let inverter = DeviceInfo::inverter("SYS1", "INV1", &snapshot);
        assert_eq!(inverter.identifier, "SYS1_INV1");
        assert_eq!(inverter.model, "DS3");
        assert_eq!(inverter.sw_version, "DS3_1.2.5");
        assert_eq!(inverter.via_device.as_deref(), Some("SYS1"));

        let unknown = DeviceInfo::inverter("SYS1", "INV9", &Snapshot::default());
        assert_eq!(unknown.model, "Unknown");
        assert_eq!(DeviceInfo::system("SYS1", &Snapshot::default()).name, "APSystems Unknown System");
    }

    #[test]
    fn record_serializes_flat() -> serde_json::Result<()> {
        let snapshot = ema_snapshot();
        let records = Entities::discover("SYS1", &snapshot).records(&snapshot, true);
        let value = serde_json::to_value(&records[0])?;
        assert_eq!(value["platform"], "sensor");
        assert_eq!(value["available"], true);
        assert_eq!(value["unit"], "W");
        assert_eq!(value["device_class"], "power");
        assert_eq!(value["state_class"], "measurement");
        assert_eq!(value["device"]["manufacturer"], "APSystems");
        Ok(())
    }
}
