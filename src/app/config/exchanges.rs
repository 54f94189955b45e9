//! Per-venue static settings (`[[exchanges]]`) and environment-sourced
//! credentials, following the teacher's `WALLET_PRIVATE_KEY`
//! environment-override precedent: secrets never live in the TOML file.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{AuthScheme, RenderRule, VenueCredentials, VenueId, VenueSettings};
use crate::core::exchange::EndpointMap;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub orderbook_path: String,
    pub order_path: String,
    pub cancel_path: String,
    pub open_orders_path: String,
    pub balance_path: String,
}

impl From<EndpointConfig> for EndpointMap {
    fn from(e: EndpointConfig) -> Self {
        EndpointMap {
            orderbook_path: e.orderbook_path,
            order_path: e.order_path,
            cancel_path: e.cancel_path,
            open_orders_path: e.open_orders_path,
            balance_path: e.balance_path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderRuleConfig {
    pub separator: Option<String>,
    pub irt_family_preference: Option<String>,
}

impl From<RenderRuleConfig> for RenderRule {
    fn from(r: RenderRuleConfig) -> Self {
        RenderRule {
            separator: r.separator.and_then(|s| s.chars().next()),
            irt_family_preference: r.irt_family_preference,
        }
    }
}

/// One `[[exchanges]]` table entry. Credentials are resolved separately,
/// from the environment, after parsing (see [`ExchangeConfig::resolve`]).
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub base_url: String,
    pub auth: AuthScheme,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    #[serde(default)]
    pub supports_post_only: bool,
    #[serde(default)]
    pub render_rule: RenderRuleConfig,
    pub endpoints: EndpointConfig,
}

impl ExchangeConfig {
    /// Builds the runtime [`VenueSettings`] for this entry, reading
    /// `CORE_<NAME>_API_KEY` / `_API_SECRET` / `_PASSPHRASE` /
    /// `_PRIVATE_KEY_PEM` (or `_PRIVATE_KEY_PEM_FILE`) from the process
    /// environment. A venue with no `CORE_<NAME>_API_KEY` set is left
    /// credential-less and runs read-only.
    pub fn resolve(self) -> Result<(VenueId, VenueSettings, EndpointMap)> {
        let id = VenueId::new(self.name.clone());
        let credentials = self.read_credentials()?;

        let settings = VenueSettings {
            id: id.clone(),
            base_url: self.base_url,
            maker_fee: self.maker_fee,
            taker_fee: self.taker_fee,
            auth: self.auth,
            render_rule: self.render_rule.into(),
            credentials,
            supports_post_only: self.supports_post_only,
        };

        Ok((id, settings, self.endpoints.into()))
    }

    fn env_key(&self, suffix: &str) -> String {
        format!("CORE_{}_{}", self.name.to_uppercase(), suffix)
    }

    fn read_credentials(&self) -> Result<Option<VenueCredentials>> {
        let api_key = match std::env::var(self.env_key("API_KEY")) {
            Ok(v) if !v.is_empty() => v,
            _ => return Ok(None),
        };
        let api_secret = std::env::var(self.env_key("API_SECRET")).unwrap_or_default();
        let passphrase = std::env::var(self.env_key("PASSPHRASE")).ok();
        let private_key_pem = self.read_private_key()?;

        Ok(Some(VenueCredentials {
            api_key,
            api_secret,
            passphrase,
            private_key_pem,
        }))
    }

    fn read_private_key(&self) -> Result<Option<String>> {
        if let Ok(pem) = std::env::var(self.env_key("PRIVATE_KEY_PEM")) {
            return Ok(Some(pem));
        }
        if let Ok(path) = std::env::var(self.env_key("PRIVATE_KEY_PEM_FILE")) {
            let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
            return Ok(Some(contents));
        }
        Ok(None)
    }
}
