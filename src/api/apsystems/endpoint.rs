use reqwest::Method;

use crate::api::apsystems::Error;

/// Logical operation, independent of the preset that serves it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum Operation {
    #[display("system details")]
    SystemDetails,

    #[display("system energy summary")]
    SystemEnergySummary,

    #[display("system energy period")]
    SystemEnergyPeriod,

    #[display("inverter list")]
    InverterList,

    #[display("meter list")]
    MeterList,

    #[display("ECU energy summary")]
    EcuEnergySummary,

    #[display("ECU energy period")]
    EcuEnergyPeriod,

    #[display("inverter energy summary")]
    InverterEnergySummary,

    #[display("inverter energy period")]
    InverterEnergyPeriod,

    #[display("inverter batch energy")]
    InverterBatchEnergy,
}

/// Identifiers substituted into the path templates.
#[derive(Copy, Clone, Default)]
pub struct PathParameters<'a> {
    pub system_id: Option<&'a str>,
    pub ecu_id: Option<&'a str>,
    pub inverter_id: Option<&'a str>,
}

impl<'a> PathParameters<'a> {
    pub const fn system(system_id: &'a str) -> Self {
        Self { system_id: Some(system_id), ecu_id: None, inverter_id: None }
    }

    pub const fn ecu(mut self, ecu_id: &'a str) -> Self {
        self.ecu_id = Some(ecu_id);
        self
    }

    pub const fn inverter(mut self, inverter_id: &'a str) -> Self {
        self.inverter_id = Some(inverter_id);
        self
    }

    fn get(&self, placeholder: &str) -> Option<&'a str> {
        match placeholder {
            "sid" => self.system_id,
            "eid" => self.ecu_id,
            "uid" => self.inverter_id,
            _ => None,
        }
    }
}

/// Static description of a single remote endpoint.
pub struct Endpoint {
    pub operation: Operation,

    /// Path relative to the catalog prefix, with `{sid}`, `{eid}`, and `{uid}` placeholders.
    pub template: &'static str,

    pub method: Method,

    /// Query parameters the endpoint requires, in the order they are sent.
    pub query: &'static [&'static str],
}

impl Endpoint {
    const fn get(operation: Operation, template: &'static str) -> Self {
        Self::get_with_query(operation, template, &[])
    }

    const fn get_with_query(
        operation: Operation,
        template: &'static str,
        query: &'static [&'static str],
    ) -> Self {
        Self { operation, template, method: Method::GET, query }
    }

    /// Substitute the placeholders. Empty identifiers count as missing.
    pub fn render(&self, parameters: &PathParameters<'_>) -> Result<String, Error> {
        let mut path = String::with_capacity(self.template.len() + 32);
        let mut rest = self.template;
        while let Some(start) = rest.find('{') {
            path.push_str(&rest[..start]);
            let end = rest[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or_else(|| self.misconfigured("unterminated placeholder"))?;
            let placeholder = &rest[start + 1..end];
            let value = parameters
                .get(placeholder)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| self.misconfigured(format!("missing `{placeholder}`")))?;
            path.push_str(value);
            rest = &rest[end + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }

    /// Pick the required query parameters out of the supplied ones.
    ///
    /// Parameters the endpoint does not declare are dropped, so callers may pass
    /// a superset that covers every preset.
    pub fn select_query(&self, supplied: &[(&str, String)]) -> Result<Vec<(String, String)>, Error> {
        self.query
            .iter()
            .map(|name| {
                supplied
                    .iter()
                    .find(|(key, value)| key == name && !value.is_empty())
                    .map(|(key, value)| ((*key).to_owned(), value.clone()))
                    .ok_or_else(|| self.misconfigured(format!("missing query parameter `{name}`")))
            })
            .collect()
    }

    fn misconfigured(&self, message: impl Into<String>) -> Error {
        Error::Configuration { operation: self.operation, message: message.into() }
    }
}

/// Endpoints served by one preset, under a shared path prefix.
pub struct Catalog {
    pub prefix: &'static str,
    pub endpoints: &'static [Endpoint],
}

impl Catalog {
    pub fn lookup(&self, operation: Operation) -> Result<&Endpoint, Error> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.operation == operation)
            .ok_or(Error::Unsupported(operation))
    }
}

const DATE_RANGE: &[&str] = &["start_date", "end_date"];

pub static EMA: Catalog = Catalog {
    prefix: "/user/api/v2",
    endpoints: &[
        Endpoint::get(Operation::SystemDetails, "/systems/details/{sid}"),
        Endpoint::get(Operation::InverterList, "/systems/{sid}/devices/inverter"),
        Endpoint::get(Operation::MeterList, "/systems/{sid}/devices/meter"),
        Endpoint::get(Operation::SystemEnergySummary, "/systems/{sid}/energy/summary"),
        Endpoint::get_with_query(
            Operation::SystemEnergyPeriod,
            "/systems/{sid}/energy/period",
            DATE_RANGE,
        ),
        Endpoint::get(Operation::EcuEnergySummary, "/systems/{sid}/devices/ecu/{eid}/energy/summary"),
        Endpoint::get_with_query(
            Operation::EcuEnergyPeriod,
            "/systems/{sid}/devices/ecu/{eid}/energy/period",
            DATE_RANGE,
        ),
        Endpoint::get(
            Operation::InverterEnergySummary,
            "/systems/{sid}/devices/inverter/{uid}/energy/summary",
        ),
        Endpoint::get_with_query(
            Operation::InverterEnergyPeriod,
            "/systems/{sid}/devices/inverter/{uid}/energy/period",
            DATE_RANGE,
        ),
        Endpoint::get_with_query(
            Operation::InverterBatchEnergy,
            "/systems/{sid}/devices/inverter/batch/energy/{eid}",
            &["energy_level", "date_range"],
        ),
    ],
};

pub static OPEN_API: Catalog = Catalog {
    prefix: "/ecu/v1",
    endpoints: &[
        Endpoint::get(Operation::SystemDetails, "/systems/{sid}/info"),
        Endpoint::get(Operation::SystemEnergySummary, "/systems/{sid}/power"),
        Endpoint::get_with_query(Operation::SystemEnergyPeriod, "/systems/{sid}/energy", &["date"]),
    ],
};
