use crate::api::apsystems::{
    auth::Scheme,
    endpoint::{self, Catalog},
    response::SuccessCode,
};

/// One of the two APSystems cloud flavours.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum, derive_more::Display)]
pub enum Preset {
    /// EMA API: HMAC-signed requests, numeric status codes, full device catalog.
    #[display("EMA")]
    Ema,

    /// OpenAPI: static credential headers, textual status codes, system-level data only.
    #[display("OpenAPI")]
    OpenApi,
}

impl Preset {
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Ema => "https://api.apsystemsema.com:9282",
            Self::OpenApi => "https://api.apsystemsema.com",
        }
    }

    pub const fn scheme(self) -> Scheme {
        match self {
            Self::Ema => Scheme::Hmac,
            Self::OpenApi => Scheme::StaticHeaders,
        }
    }

    pub const fn success_code(self) -> SuccessCode {
        match self {
            Self::Ema => SuccessCode::Numeric,
            Self::OpenApi => SuccessCode::Text,
        }
    }

    pub fn catalog(self) -> &'static Catalog {
        match self {
            Self::Ema => &endpoint::EMA,
            Self::OpenApi => &endpoint::OPEN_API,
        }
    }
}
