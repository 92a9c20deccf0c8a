use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::api::apsystems::{Attributes, Inverter};

/// Point-in-time view of a system, produced by one polling cycle.
///
/// Never mutated after it is published: each cycle builds a new one.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub system_details: Attributes,
    pub system_energy: Attributes,
    pub system_energy_today: Attributes,
    pub inverters: Vec<Inverter>,
    pub meters: Vec<Attributes>,

    /// Energy summary per listed inverter, empty on a per-inverter failure.
    pub inverter_data: BTreeMap<String, Attributes>,

    /// Advisory failure descriptions collected during the cycle.
    pub errors: Vec<String>,

    /// `None` until the first cycle has been committed.
    pub last_update: Option<DateTime<Local>>,
}

impl Snapshot {
    pub const fn is_committed(&self) -> bool {
        self.last_update.is_some()
    }

    pub fn inverter(&self, uid: &str) -> Option<&Inverter> {
        self.inverters.iter().find(|inverter| inverter.uid == uid)
    }

    /// Listed inverters with a usable ID, in the listing order.
    pub fn inverter_ids(&self) -> impl Iterator<Item = &str> {
        self.inverters.iter().map(|inverter| inverter.uid.as_str()).filter(|uid| !uid.is_empty())
    }

    /// Energy mapping of the inverter, empty when unknown.
    pub fn inverter_data(&self, uid: &str) -> Option<&Attributes> {
        self.inverter_data.get(uid).filter(|data| !data.is_empty())
    }
}
