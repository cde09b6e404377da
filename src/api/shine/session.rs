use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::AuthenticationError;

/// The cloud prefixes its JWTs with this literal. The prefix must be stripped
/// before decoding, but the `authorization` header wants the token verbatim.
const TOKEN_PREFIX: &str = "Bearer_";

/// An authenticated Shine session: the original bearer token plus the expiry
/// it claims. Only [`super::Api::login`] creates or replaces it.
pub struct Session {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub(crate) const fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Strict comparison: a session expiring exactly now is already expired.
    /// There is no clock-skew margin, matching the server's own bookkeeping.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Read the `exp` claim from the vendor token.
///
/// The token is opaque and vendor-issued, and we only need its claimed
/// expiry, so the signature is deliberately **not** verified.
pub(crate) fn decode_expiry(token: &str) -> Result<DateTime<Utc>, AuthenticationError> {
    #[derive(Deserialize)]
    struct Claims {
        #[serde(rename = "exp")]
        expires_at: i64,
    }

    let decodable = token.strip_prefix(TOKEN_PREFIX).unwrap_or(token);
    let payload = decodable
        .split('.')
        .nth(1)
        .ok_or(AuthenticationError::MalformedToken("missing payload segment"))?;
    let payload = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthenticationError::MalformedToken("payload is not base64url"))?;
    let claims: Claims = serde_json::from_slice(&payload)
        .map_err(|_| AuthenticationError::MalformedToken("payload is not a claims object"))?;
    DateTime::from_timestamp(claims.expires_at, 0)
        .ok_or(AuthenticationError::MalformedToken("`exp` is out of range"))
}
