//! Builds a [`VenueAdapter`] from static settings plus resolved credentials.
//!
//! Venues are a tagged set (`VenueId` + `AuthScheme`), not one hand-written
//! struct per exchange: the factory composes a [`Signer`] chosen by
//! `AuthScheme` with the generic [`RestVenueAdapter`], matching the
//! tagged-dispatch shape the venue registry used for picking a concrete
//! adapter type by name.

use std::sync::Arc;

use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use crate::core::domain::{AuthScheme, VenueSettings};
use crate::error::{Error, Result};

use super::rest::{EndpointMap, RestVenueAdapter};
use super::signing::{BearerSigner, HmacSigner, PassphraseHmacSigner, RsaPssSigner, Signer};
use super::traits::VenueAdapter;

pub struct VenueFactory;

impl VenueFactory {
    /// Builds the adapter for one venue. Returns a read-only adapter (no
    /// signer) when `settings.credentials` is absent; trading calls against
    /// it fail with `VenueError::AuthError` rather than panicking.
    pub fn build(
        settings: VenueSettings,
        endpoints: EndpointMap,
        per_venue_concurrency: usize,
    ) -> Result<Arc<dyn VenueAdapter>> {
        let signer = match &settings.credentials {
            None => None,
            Some(creds) => Some(Self::signer_for(settings.auth, creds)?),
        };

        Ok(Arc::new(RestVenueAdapter::new(settings, endpoints, signer, per_venue_concurrency)))
    }

    fn signer_for(auth: AuthScheme, creds: &crate::core::domain::VenueCredentials) -> Result<Box<dyn Signer>> {
        match auth {
            AuthScheme::BearerToken => Ok(Box::new(BearerSigner::new(creds.api_key.clone()))),
            AuthScheme::HmacSha256 => Ok(Box::new(HmacSigner::new(creds))),
            AuthScheme::PassphraseHmac => Ok(Box::new(PassphraseHmacSigner::new(creds))),
            AuthScheme::RsaPssSha256 => {
                let pem = creds
                    .private_key_pem
                    .as_deref()
                    .ok_or_else(|| Error::Signing("RSA-PSS venue requires a private_key_pem credential".to_string()))?;
                let key = RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| Error::Signing(e.to_string()))?;
                Ok(Box::new(RsaPssSigner::new(key)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{RenderRule, VenueCredentials, VenueId};
    use rust_decimal::Decimal;

    fn settings(auth: AuthScheme, credentials: Option<VenueCredentials>) -> VenueSettings {
        VenueSettings {
            id: VenueId::new("v"),
            base_url: "https://example.invalid".to_string(),
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            auth,
            render_rule: RenderRule::default(),
            credentials,
            supports_post_only: false,
        }
    }

    fn endpoints() -> EndpointMap {
        EndpointMap {
            orderbook_path: "/book".to_string(),
            order_path: "/order".to_string(),
            cancel_path: "/order".to_string(),
            open_orders_path: "/orders".to_string(),
            balance_path: "/balance".to_string(),
        }
    }

    #[test]
    fn builds_read_only_adapter_without_credentials() {
        let adapter = VenueFactory::build(settings(AuthScheme::HmacSha256, None), endpoints(), 4).unwrap();
        assert!(!adapter.is_authenticated());
    }

    #[test]
    fn builds_authenticated_adapter_with_hmac_credentials() {
        let creds = VenueCredentials {
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
            passphrase: None,
            private_key_pem: None,
        };
        let adapter = VenueFactory::build(settings(AuthScheme::HmacSha256, Some(creds)), endpoints(), 4).unwrap();
        assert!(adapter.is_authenticated());
    }

    #[test]
    fn rsa_pss_without_private_key_is_an_error() {
        let creds = VenueCredentials {
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
            passphrase: None,
            private_key_pem: None,
        };
        let result = VenueFactory::build(settings(AuthScheme::RsaPssSha256, Some(creds)), endpoints(), 4);
        assert!(result.is_err());
    }
}
