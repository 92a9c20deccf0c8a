use crate::{entity::device::system_name, snapshot::Snapshot};

/// Connectivity of the system or one of its inverters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tracker {
    pub unique_id: String,
    pub name: String,
    pub inverter_id: Option<String>,
}

impl Tracker {
    pub fn system(system_id: &str, snapshot: &Snapshot) -> Self {
        Self {
            unique_id: format!("{system_id}_system"),
            name: format!("APSystems {}", system_name(&snapshot.system_details)),
            inverter_id: None,
        }
    }

    pub fn inverter(system_id: &str, inverter_id: &str) -> Self {
        Self {
            unique_id: format!("{system_id}_{inverter_id}"),
            name: format!("APSystems Inverter {inverter_id}"),
            inverter_id: Some(inverter_id.to_owned()),
        }
    }

    /// The system is connected once anything was committed, an inverter when its energy is known.
    pub fn is_connected(&self, snapshot: &Snapshot) -> bool {
        match &self.inverter_id {
            None => snapshot.is_committed(),
            Some(inverter_id) => snapshot.inverter_data(inverter_id).is_some(),
        }
    }

    pub const fn icon(&self) -> &'static str {
        if self.inverter_id.is_some() { "mdi:solar-power" } else { "mdi:solar-panel" }
    }
}
