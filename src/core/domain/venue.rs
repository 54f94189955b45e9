//! Venue identity and static metadata.

use std::fmt;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::symbol::RenderRule;

/// Opaque identifier for a venue, used as a map key and in log fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Authentication scheme a venue requires for private endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    BearerToken,
    HmacSha256,
    RsaPssSha256,
    PassphraseHmac,
}

/// Credentials resolved from the environment at startup, never persisted in
/// the config file. Absent credentials put the venue in read-only mode:
/// streaming works, trading operations fail with `AuthError`.
#[derive(Debug, Clone, Default)]
pub struct VenueCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
    /// PEM-encoded RSA private key, present only for `RsaPssSha256` venues.
    pub private_key_pem: Option<String>,
}

/// Static per-venue configuration: endpoints, fees, symbol rendering and
/// the authentication scheme to apply. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct VenueSettings {
    pub id: VenueId,
    pub base_url: String,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub auth: AuthScheme,
    pub render_rule: RenderRule,
    pub credentials: Option<VenueCredentials>,
    pub supports_post_only: bool,
}

impl VenueSettings {
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.credentials.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_without_credentials_is_read_only() {
        let v = VenueSettings {
            id: VenueId::new("a"),
            base_url: "https://a.example".to_string(),
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            auth: AuthScheme::HmacSha256,
            render_rule: RenderRule::default(),
            credentials: None,
            supports_post_only: true,
        };
        assert!(v.is_read_only());
    }
}
