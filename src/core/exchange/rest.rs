//! Generic REST venue adapter.
//!
//! Venues are a closed, configuration-driven capability set rather than one
//! hand-written struct per exchange: a single adapter is parameterised by an
//! [`EndpointMap`] (paths), a [`Signer`] (auth scheme), and the venue's
//! [`crate::core::domain::RenderRule`] (symbol spelling). Response parsing
//! assumes each venue exposes the reference JSON shape documented on each
//! method; venues with bespoke response bodies plug in by adapting their
//! response into that shape before it reaches this adapter, keeping the
//! signing/retry/rate-limit machinery shared across every venue.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Semaphore;
use std::sync::Arc;
use tracing::warn;

use crate::core::domain::{
    canonicalise, render, Order, OrderId, OrderSide, OrderStatus, OrderType, OrderBookSnapshot, PriceLevel, RenderRule,
    Symbol, VenueId, VenueSettings,
};
use crate::error::VenueError;

use super::retry::{retry_with_backoff, RetryPolicy};
use super::signing::{Signer, SignedRequest, SigningPayload};
use super::traits::{Balance, VenueAdapter};

/// Path templates for the handful of operations every venue must expose.
#[derive(Debug, Clone)]
pub struct EndpointMap {
    pub orderbook_path: String,
    pub order_path: String,
    pub cancel_path: String,
    pub open_orders_path: String,
    pub balance_path: String,
}

pub struct RestVenueAdapter {
    settings: VenueSettings,
    endpoints: EndpointMap,
    client: reqwest::Client,
    signer: Option<Box<dyn Signer>>,
    retry_policy: RetryPolicy,
    /// Bounds outstanding requests to this venue, satisfying the per-venue
    /// concurrency cap `C_v` from the concurrency model.
    concurrency: Arc<Semaphore>,
}

impl RestVenueAdapter {
    #[must_use]
    pub fn new(
        settings: VenueSettings,
        endpoints: EndpointMap,
        signer: Option<Box<dyn Signer>>,
        per_venue_concurrency: usize,
    ) -> Self {
        Self {
            settings,
            endpoints,
            client: reqwest::Client::new(),
            signer,
            retry_policy: RetryPolicy::default(),
            concurrency: Arc::new(Semaphore::new(per_venue_concurrency.max(1))),
        }
    }

    fn render_symbol(&self, symbol: &Symbol) -> String {
        render(symbol, &self.settings.render_rule)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Signs a request, returning both headers and (for signers that rewrite
    /// the body, e.g. RSA-PSS) the augmented body that must be transmitted
    /// in place of the caller's original bytes.
    fn sign_request(&self, method: &str, path: &str, query: &str, body: &[u8]) -> Result<SignedRequest, VenueError> {
        let Some(signer) = &self.signer else {
            return Ok(SignedRequest { headers: Vec::new(), body: None });
        };
        let payload = SigningPayload { method, path, query, body };
        signer.sign(&payload).map_err(|e| VenueError::AuthError(e.to_string()))
    }

    async fn acquire(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.concurrency.acquire().await.expect("semaphore not closed")
    }

    fn classify_response_error(status: reqwest::StatusCode, body: String) -> VenueError {
        match status.as_u16() {
            401 | 403 => VenueError::AuthError(body),
            429 => VenueError::RateLimited { retry_after_ms: None },
            s if s >= 500 => VenueError::NetworkError(format!("server error {s}: {body}")),
            s => VenueError::VenueApi { status: s, body },
        }
    }
}

#[derive(Deserialize)]
struct RawOrderBook {
    bids: Vec<(Decimal, Decimal)>,
    asks: Vec<(Decimal, Decimal)>,
}

#[derive(Deserialize)]
struct RawOrderResponse {
    order_id: String,
    status: String,
    filled_qty: Decimal,
    #[serde(default)]
    avg_price: Option<Decimal>,
    /// Present on list-style endpoints (`get_open_orders`), where a single
    /// response covers orders across multiple symbols; absent on
    /// single-order endpoints where the caller already knows the symbol.
    #[serde(default)]
    symbol: Option<String>,
}

fn parse_status(raw: &str) -> OrderStatus {
    match raw {
        "pending" => OrderStatus::Pending,
        "open" => OrderStatus::Open,
        "partially_filled" => OrderStatus::PartiallyFilled,
        "filled" => OrderStatus::Filled,
        "cancelled" | "canceled" => OrderStatus::Cancelled,
        "rejected" => OrderStatus::Rejected,
        _ => OrderStatus::Unknown,
    }
}

#[async_trait]
impl VenueAdapter for RestVenueAdapter {
    fn id(&self) -> &VenueId {
        &self.settings.id
    }

    async fn fetch_orderbook(&self, symbol: &Symbol, depth: u32) -> Result<OrderBookSnapshot, VenueError> {
        let rendered = self.render_symbol(symbol);
        let url = self.url(&self.endpoints.orderbook_path);
        let depth = depth.max(1);

        retry_with_backoff(&self.retry_policy, || {
            let url = url.clone();
            let rendered = rendered.clone();
            let symbol = symbol.clone();
            let venue = self.settings.id.clone();
            async move {
                let _permit = self.acquire().await;
                let response = self
                    .client
                    .get(&url)
                    .query(&[("symbol", rendered.as_str()), ("depth", &depth.to_string())])
                    .send()
                    .await
                    .map_err(|e| VenueError::NetworkError(e.to_string()))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::classify_response_error(status, body));
                }

                let raw: RawOrderBook = response
                    .json()
                    .await
                    .map_err(|e| VenueError::NetworkError(e.to_string()))?;

                let bids = raw.bids.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect();
                let asks = raw.asks.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect();
                Ok(OrderBookSnapshot::new(venue, symbol, Utc::now().timestamp_millis(), bids, asks))
            }
        })
        .await
    }

    async fn place_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        post_only: bool,
    ) -> Result<Order, VenueError> {
        if quantity <= Decimal::ZERO {
            return Err(VenueError::InvalidInput {
                field: "quantity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if matches!(order_type, OrderType::Limit) && limit_price.filter(|p| *p > Decimal::ZERO).is_none() {
            return Err(VenueError::InvalidInput {
                field: "limit_price",
                reason: "required and must be positive for LIMIT orders".to_string(),
            });
        }
        let effective_post_only = post_only && self.settings.supports_post_only;

        let rendered = self.render_symbol(symbol);
        let side_str = match side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let type_str = match order_type {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        };
        let body = json!({
            "symbol": rendered,
            "side": side_str,
            "type": type_str,
            "quantity": quantity.to_string(),
            "price": limit_price.map(|p| p.to_string()),
            "post_only": effective_post_only,
        });
        let body_bytes = serde_json::to_vec(&body).map_err(|e| VenueError::InvalidInput {
            field: "body",
            reason: e.to_string(),
        })?;
        let signed = self.sign_request("POST", &self.endpoints.order_path, "", &body_bytes)?;
        // A signer that augments the body (e.g. RSA-PSS, which injects
        // `expire_at` and `signature` into the canonical payload) must have
        // its rewritten bytes transmitted instead of the original body,
        // since the signature was computed over the augmented payload.
        let transmitted_body = signed.body.clone().unwrap_or(body_bytes);
        let headers = signed.headers;
        let url = self.url(&self.endpoints.order_path);

        let raw: RawOrderResponse = retry_with_backoff(&self.retry_policy, || {
            let url = url.clone();
            let headers = headers.clone();
            let body_bytes = transmitted_body.clone();
            async move {
                let _permit = self.acquire().await;
                let mut request = self.client.post(&url).body(body_bytes);
                for (k, v) in &headers {
                    request = request.header(k, v);
                }
                let response = request.send().await.map_err(|e| VenueError::NetworkError(e.to_string()))?;
                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Self::classify_response_error(status, text));
                }
                response.json().await.map_err(|e| VenueError::NetworkError(e.to_string()))
            }
        })
        .await?;

        let mut order = Order::new(self.settings.id.clone(), symbol.clone(), side, order_type, quantity, limit_price, Utc::now());
        order.venue_order_id = Some(OrderId::new(raw.order_id));
        order.status = parse_status(&raw.status);
        order.filled_quantity = raw.filled_qty;
        order.average_fill_price = raw.avg_price;
        Ok(order)
    }

    async fn cancel_order(&self, id: &OrderId, _symbol: Option<&Symbol>) -> Result<bool, VenueError> {
        let url = format!("{}/{}", self.url(&self.endpoints.cancel_path), id.as_str());
        let headers = self.sign_request("DELETE", &self.endpoints.cancel_path, "", b"")?.headers;

        retry_with_backoff(&self.retry_policy, || {
            let url = url.clone();
            let headers = headers.clone();
            async move {
                let _permit = self.acquire().await;
                let mut request = self.client.delete(&url);
                for (k, v) in &headers {
                    request = request.header(k, v);
                }
                let response = request.send().await.map_err(|e| VenueError::NetworkError(e.to_string()))?;
                match response.status().as_u16() {
                    200..=299 => Ok(true),
                    404 => Ok(true), // idempotent: already terminal/absent
                    s => {
                        let body = response.text().await.unwrap_or_default();
                        Err(Self::classify_response_error(reqwest::StatusCode::from_u16(s).unwrap(), body))
                    }
                }
            }
        })
        .await
    }

    async fn get_order(&self, id: &OrderId, symbol: Option<&Symbol>) -> Result<Order, VenueError> {
        let url = format!("{}/{}", self.url(&self.endpoints.order_path), id.as_str());
        let headers = self.sign_request("GET", &self.endpoints.order_path, "", b"")?.headers;

        let raw: RawOrderResponse = retry_with_backoff(&self.retry_policy, || {
            let url = url.clone();
            let headers = headers.clone();
            async move {
                let _permit = self.acquire().await;
                let mut request = self.client.get(&url);
                for (k, v) in &headers {
                    request = request.header(k, v);
                }
                let response = request.send().await.map_err(|e| VenueError::NetworkError(e.to_string()))?;
                if response.status().as_u16() == 404 {
                    return Err(VenueError::OrderNotFound(id.as_str().to_string()));
                }
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::classify_response_error(status, body));
                }
                response.json().await.map_err(|e| VenueError::NetworkError(e.to_string()))
            }
        })
        .await?;

        let symbol = symbol.cloned().ok_or_else(|| {
            VenueError::InvalidInput { field: "symbol", reason: "required to reconstruct order".to_string() }
        })?;
        let mut order = Order::new(self.settings.id.clone(), symbol, OrderSide::Buy, OrderType::Limit, raw.filled_qty, raw.avg_price, Utc::now());
        order.venue_order_id = Some(OrderId::new(raw.order_id));
        order.status = parse_status(&raw.status);
        order.filled_quantity = raw.filled_qty;
        order.average_fill_price = raw.avg_price;
        Ok(order)
    }

    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, VenueError> {
        let url = self.url(&self.endpoints.open_orders_path);
        let headers = self.sign_request("GET", &self.endpoints.open_orders_path, "", b"")?.headers;
        let rendered_symbol = symbol.map(|s| self.render_symbol(s));

        let raw: Vec<RawOrderResponse> = retry_with_backoff(&self.retry_policy, || {
            let url = url.clone();
            let headers = headers.clone();
            let rendered_symbol = rendered_symbol.clone();
            async move {
                let _permit = self.acquire().await;
                let mut request = self.client.get(&url);
                if let Some(symbol) = &rendered_symbol {
                    request = request.query(&[("symbol", symbol.as_str())]);
                }
                for (k, v) in &headers {
                    request = request.header(k, v);
                }
                let response = request.send().await.map_err(|e| VenueError::NetworkError(e.to_string()))?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::classify_response_error(status, body));
                }
                response.json().await.map_err(|e| VenueError::NetworkError(e.to_string()))
            }
        })
        .await?;

        let filter = symbol.cloned();
        Ok(raw
            .into_iter()
            .filter_map(|r| {
                let resolved = r
                    .symbol
                    .as_deref()
                    .and_then(|s| canonicalise(s).ok())
                    .or_else(|| filter.clone());
                let Some(resolved) = resolved else {
                    warn!(venue = %self.settings.id, order_id = %r.order_id, "dropping open order with unresolvable symbol");
                    return None;
                };
                let mut order = Order::new(self.settings.id.clone(), resolved, OrderSide::Buy, OrderType::Limit, r.filled_qty, r.avg_price, Utc::now());
                order.venue_order_id = Some(OrderId::new(r.order_id));
                order.status = parse_status(&r.status);
                order.filled_quantity = r.filled_qty;
                order.average_fill_price = r.avg_price;
                Some(order)
            })
            .collect())
    }

    async fn get_balance(&self, currency: &str) -> Result<Balance, VenueError> {
        let url = self.url(&self.endpoints.balance_path);
        let headers = self.sign_request("GET", &self.endpoints.balance_path, "", b"")?.headers;
        let currency = currency.to_string();

        retry_with_backoff(&self.retry_policy, || {
            let url = url.clone();
            let headers = headers.clone();
            let currency = currency.clone();
            async move {
                let _permit = self.acquire().await;
                let mut request = self.client.get(&url).query(&[("currency", currency.as_str())]);
                for (k, v) in &headers {
                    request = request.header(k, v);
                }
                let response = request.send().await.map_err(|e| VenueError::NetworkError(e.to_string()))?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::classify_response_error(status, body));
                }
                #[derive(Deserialize)]
                struct RawBalance {
                    available: Decimal,
                    locked: Decimal,
                }
                let raw: RawBalance = response.json().await.map_err(|e| VenueError::NetworkError(e.to_string()))?;
                Ok(Balance { available: raw.available, locked: raw.locked })
            }
        })
        .await
    }

    fn maker_fee(&self) -> Decimal {
        self.settings.maker_fee
    }

    fn taker_fee(&self) -> Decimal {
        self.settings.taker_fee
    }

    fn supports_post_only(&self) -> bool {
        self.settings.supports_post_only
    }

    fn is_authenticated(&self) -> bool {
        !self.settings.is_read_only()
    }
}
