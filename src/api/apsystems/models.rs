use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::serde_as;

/// Flat JSON object as returned by the API.
pub type Attributes = Map<String, Value>;

/// Inverter descriptor from the system inverter list.
///
/// Read leniently: identifiers may come as numbers, and `type` stands in for a missing `model`.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Attributes")]
pub struct Inverter {
    pub uid: String,
    pub model: Option<String>,
    pub firmware: Option<String>,

    #[serde(flatten)]
    pub extra: Attributes,
}

impl From<Attributes> for Inverter {
    fn from(mut attributes: Attributes) -> Self {
        let uid = take_text(&mut attributes, "uid").unwrap_or_default();
        let model = take_text(&mut attributes, "model")
            .or_else(|| take_text(&mut attributes, "type"));
        let firmware = take_text(&mut attributes, "firmware");
        Self { uid, model, firmware, extra: attributes }
    }
}

/// Remove the attribute and render it as text.
fn take_text(attributes: &mut Attributes, key: &str) -> Option<String> {
    let value = attributes.remove(key)?;
    scalar_text(&value)
}

/// Render a scalar attribute as text, accepting non-empty strings and numbers.
pub fn text(attributes: &Attributes, key: &str) -> Option<String> {
    scalar_text(attributes.get(key)?)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Inverter list, skipping entries that are not objects.
#[serde_as]
#[derive(Default, Deserialize)]
pub struct Inverters(#[serde_as(as = "serde_with::VecSkipError<_>")] pub Vec<Inverter>);

/// Meter list, skipping entries that are not objects.
#[serde_as]
#[derive(Default, Deserialize)]
pub struct Meters(#[serde_as(as = "serde_with::VecSkipError<_>")] pub Vec<Attributes>);

/// Granularity of the batch energy endpoint.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum, derive_more::Display)]
pub enum EnergyLevel {
    #[display("power")]
    Power,

    #[display("energy")]
    Energy,
}

/// Read a numeric attribute, accepting numbers and numeric strings.
///
/// The first key that is present wins, even if its value does not parse.
pub fn number(attributes: &Attributes, keys: &[&str]) -> Option<f64> {
    let value = keys.iter().find_map(|key| attributes.get(*key))?;
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
