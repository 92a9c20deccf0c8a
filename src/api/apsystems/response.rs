use std::fmt::{Display, Formatter};

use serde::Deserialize;
use serde_json::Value;

use crate::api::apsystems::Error;

/// Generic API response: `{code, message, data}`.
///
/// The payload stays a [`Value`] until the caller knows what to expect.
#[derive(Deserialize)]
pub struct Envelope {
    code: Code,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    data: Value,
}

/// The EMA API answers with a number, the OpenAPI with a string.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Code {
    Number(i64),
    Text(String),
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(code) => write!(f, "{code}"),
            Self::Text(code) => f.write_str(code),
        }
    }
}

impl Code {
    fn is_auth_failure(&self) -> bool {
        match self {
            Self::Number(code) => matches!(code, 401 | 403),
            Self::Text(code) => matches!(code.as_str(), "401" | "403"),
        }
    }
}

/// Success sentinel of a preset.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SuccessCode {
    /// Numeric `0`.
    Numeric,

    /// String `"0"`.
    Text,
}

impl SuccessCode {
    fn matches(self, code: &Code) -> bool {
        match (self, code) {
            (Self::Numeric, Code::Number(code)) => *code == 0,
            (Self::Text, Code::Text(code)) => code == "0",
            _ => false,
        }
    }
}

impl Envelope {
    pub fn into_result(self, success: SuccessCode) -> Result<Value, Error> {
        if success.matches(&self.code) {
            return Ok(self.data);
        }
        let message = self.message.unwrap_or_else(|| "unknown error".to_owned());
        if self.code.is_auth_failure() {
            Err(Error::Auth(message))
        } else {
            Err(Error::Api { code: self.code.to_string(), message })
        }
    }
}
