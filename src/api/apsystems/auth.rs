use std::fmt::{Debug, Formatter};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use hmac::{Hmac, Mac, digest::InvalidLength};
use http::{
    HeaderMap,
    HeaderValue,
    header::{CONTENT_TYPE, InvalidHeaderValue},
};
use reqwest::Method;
use sha2::Sha256;
use uuid::Uuid;

const SIGNATURE_METHOD: &str = "HmacSHA256";

/// Application credentials and the system they give access to.
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub system_id: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .field("system_id", &self.system_id)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("credentials do not fit into a header")]
    Header(#[from] InvalidHeaderValue),

    #[error("the app secret cannot be used as an HMAC key")]
    Key(#[from] InvalidLength),
}

/// How requests are authenticated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Scheme {
    /// Per-request HMAC-SHA256 signature sent as `X-CA-*` headers.
    Hmac,

    /// App ID and secret sent verbatim.
    StaticHeaders,
}

impl Scheme {
    pub fn headers(
        self,
        credentials: &Credentials,
        method: &Method,
        path: &str,
    ) -> Result<HeaderMap, AuthError> {
        let mut headers = match self {
            Self::Hmac => {
                let timestamp = Utc::now().timestamp_millis();
                let nonce = Uuid::new_v4().simple().to_string();
                Signature::new(credentials, method, path, timestamp, &nonce)?.into_headers()?
            }
            Self::StaticHeaders => {
                let mut headers = HeaderMap::new();
                headers.insert("appid", HeaderValue::from_str(&credentials.app_id)?);
                let mut secret = HeaderValue::from_str(&credentials.app_secret)?;
                secret.set_sensitive(true);
                headers.insert("appsecret", secret);
                headers
            }
        };
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Signed request headers.
///
/// The signed string is `timestamp/nonce/app_id/path/method/HmacSHA256`, where `path`
/// is the full request path including its leading slash.
#[derive(Debug, Eq, PartialEq)]
pub struct Signature {
    pub app_id: String,
    pub timestamp: String,
    pub nonce: String,
    pub value: String,
}

impl Signature {
    pub fn new(
        credentials: &Credentials,
        method: &Method,
        path: &str,
        timestamp_millis: i64,
        nonce: &str,
    ) -> Result<Self, AuthError> {
        let timestamp = timestamp_millis.to_string();
        let string_to_sign = format!(
            "{timestamp}/{nonce}/{app_id}/{path}/{method}/{SIGNATURE_METHOD}",
            app_id = credentials.app_id,
            method = method.as_str(),
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(credentials.app_secret.as_bytes())?;
        mac.update(string_to_sign.as_bytes());
        let value = BASE64.encode(mac.finalize().into_bytes());
        Ok(Self { app_id: credentials.app_id.clone(), timestamp, nonce: nonce.to_owned(), value })
    }

    /// Header names are lowercase, as [`HeaderMap`] requires for static names.
    pub fn into_headers(self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert("x-ca-appid", HeaderValue::from_str(&self.app_id)?);
        headers.insert("x-ca-timestamp", HeaderValue::from_str(&self.timestamp)?);
        headers.insert("x-ca-nonce", HeaderValue::from_str(&self.nonce)?);
        headers.insert("x-ca-signature-method", HeaderValue::from_static(SIGNATURE_METHOD));
        headers.insert("x-ca-signature", HeaderValue::from_str(&self.value)?);
        Ok(headers)
    }
}
