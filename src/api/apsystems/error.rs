use crate::api::apsystems::endpoint::Operation;

/// Failure of a single APSystems API call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be built: missing path placeholder or query parameter.
    #[error("invalid request for `{operation}`: {message}")]
    Configuration { operation: Operation, message: String },

    /// The operation does not exist in the configured preset's catalog.
    #[error("`{0}` is not offered by this API")]
    Unsupported(Operation),

    /// Credentials were rejected, either by HTTP status or by the envelope code.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Connection failure, timeout, non-2xx status, or a body that is not the expected JSON.
    #[error("transport error: {0}")]
    Transport(String),

    /// The envelope carried a non-success code.
    #[error(r#"APSystems error {code} ("{message}")"#)]
    Api { code: String, message: String },
}

impl Error {
    /// Whether the coordinator may fold this error into the snapshot instead of failing the cycle.
    ///
    /// Configuration errors are programming faults and always abort.
    pub const fn is_isolated(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }

    pub(super) fn transport(error: impl std::fmt::Display) -> Self {
        Self::Transport(format!("{error:#}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status()
            && matches!(status.as_u16(), 401 | 403)
        {
            return Self::Auth(error.to_string());
        }
        Self::transport(error)
    }
}
