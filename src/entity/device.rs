use bon::Builder;
use serde::Serialize;

use crate::{
    api::apsystems::{Attributes, text},
    snapshot::Snapshot,
};

pub const MANUFACTURER: &str = "APSystems";

const UNKNOWN: &str = "Unknown";

/// Device registry entry an entity is attached to.
#[derive(Builder, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DeviceInfo {
    #[builder(into)]
    pub identifier: String,

    #[builder(into)]
    pub name: String,

    #[builder(default = MANUFACTURER)]
    pub manufacturer: &'static str,

    #[builder(into)]
    pub model: String,

    #[builder(into)]
    pub sw_version: String,

    /// Identifier of the parent device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

impl DeviceInfo {
    pub fn system(system_id: &str, snapshot: &Snapshot) -> Self {
        Self::builder()
            .identifier(system_id)
            .name(format!("APSystems {}", system_name(&snapshot.system_details)))
            .model(text(&snapshot.system_details, "type").unwrap_or_else(|| UNKNOWN.to_owned()))
            .sw_version(env!("CARGO_PKG_VERSION"))
            .build()
    }

    pub fn inverter(system_id: &str, inverter_id: &str, snapshot: &Snapshot) -> Self {
        let inverter = snapshot.inverter(inverter_id);
        Self::builder()
            .identifier(format!("{system_id}_{inverter_id}"))
            .name(format!("APSystems Inverter {inverter_id}"))
            .model(or_unknown(inverter.and_then(|inverter| inverter.model.as_deref())))
            .sw_version(or_unknown(inverter.and_then(|inverter| inverter.firmware.as_deref())))
            .via_device(system_id.to_owned())
            .build()
    }
}

/// System name from its details, with a placeholder when absent.
pub fn system_name(details: &Attributes) -> String {
    text(details, "name").unwrap_or_else(|| "Unknown System".to_owned())
}

fn or_unknown(value: Option<&str>) -> String {
    value.filter(|value| !value.is_empty()).unwrap_or(UNKNOWN).to_owned()
}

