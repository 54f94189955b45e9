//! Request signing strategies, one per authentication scheme a venue may
//! require (§6 of the design: bearer-token, HMAC-SHA256, RSA-PSS-SHA256,
//! passphrase-HMAC). Signing is deterministic over the exact byte sequence
//! the server receives; callers must build the canonical payload before
//! calling `sign`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::core::domain::VenueCredentials;
use crate::error::{Error, Result};

/// The exact bytes and metadata a signer needs. `body` is the canonical
/// payload already serialised (sorted keys where the venue requires it);
/// signers that inject the signature into the body receive it back via
/// `SignedRequest::body`.
pub struct SigningPayload<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub body: &'a [u8],
}

/// Headers and (optionally) a rewritten body to attach to the outgoing
/// request.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

pub trait Signer: Send + Sync {
    fn sign(&self, payload: &SigningPayload<'_>) -> Result<SignedRequest>;
}

/// Static bearer token in the Authorization header; no request-specific
/// signing.
pub struct BearerSigner {
    token: String,
}

impl BearerSigner {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl Signer for BearerSigner {
    fn sign(&self, _payload: &SigningPayload<'_>) -> Result<SignedRequest> {
        Ok(SignedRequest {
            headers: vec![("Authorization".to_string(), format!("Bearer {}", self.token))],
            body: None,
        })
    }
}

type HmacSha256 = Hmac<sha2::Sha256>;

/// Signs `timestamp + method + path + query + body` with HMAC-SHA256,
/// base64-encodes the digest, and attaches it plus the timestamp as
/// headers. This is the shape every HMAC-SHA256 exchange API in practice
/// settles on.
pub struct HmacSigner {
    api_key: String,
    api_secret: String,
}

impl HmacSigner {
    #[must_use]
    pub fn new(credentials: &VenueCredentials) -> Self {
        Self {
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
        }
    }

    fn signature(&self, timestamp: &str, payload: &SigningPayload<'_>) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| Error::Signing(e.to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(payload.method.as_bytes());
        mac.update(payload.path.as_bytes());
        mac.update(payload.query.as_bytes());
        mac.update(payload.body);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

impl Signer for HmacSigner {
    fn sign(&self, payload: &SigningPayload<'_>) -> Result<SignedRequest> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.signature(&timestamp, payload)?;
        Ok(SignedRequest {
            headers: vec![
                ("API-Key".to_string(), self.api_key.clone()),
                ("API-Timestamp".to_string(), timestamp),
                ("API-Signature".to_string(), signature),
            ],
            body: None,
        })
    }
}

/// HMAC-SHA256 plus a passphrase header, used by venues modelled on the
/// Coinbase-style signing convention.
pub struct PassphraseHmacSigner {
    inner: HmacSigner,
    passphrase: String,
}

impl PassphraseHmacSigner {
    #[must_use]
    pub fn new(credentials: &VenueCredentials) -> Self {
        Self {
            inner: HmacSigner::new(credentials),
            passphrase: credentials.passphrase.clone().unwrap_or_default(),
        }
    }
}

impl Signer for PassphraseHmacSigner {
    fn sign(&self, payload: &SigningPayload<'_>) -> Result<SignedRequest> {
        let mut signed = self.inner.sign(payload)?;
        signed
            .headers
            .push(("API-Passphrase".to_string(), self.passphrase.clone()));
        Ok(signed)
    }
}

/// RSA-PSS-SHA256 over a canonical JSON body with sorted keys and an
/// `expire_at` ISO timestamp. The signature is both injected into the body
/// as a new key and attached as a header, matching venues that require the
/// signed payload to be self-describing.
pub struct RsaPssSigner {
    private_key: RsaPrivateKey,
}

impl RsaPssSigner {
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }
}

impl Signer for RsaPssSigner {
    fn sign(&self, payload: &SigningPayload<'_>) -> Result<SignedRequest> {
        let mut body: serde_json::Value =
            serde_json::from_slice(payload.body).unwrap_or(serde_json::Value::Object(Default::default()));
        let expire_at = (Utc::now() + chrono::Duration::seconds(30)).to_rfc3339();
        if let serde_json::Value::Object(ref mut map) = body {
            map.insert("expire_at".to_string(), serde_json::Value::String(expire_at));
        }
        let canonical = canonical_json(&body);

        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let mut rng = rand::thread_rng();
        let signature = signing_key.sign_with_rng(&mut rng, canonical.as_bytes());
        let encoded = BASE64.encode(signature.to_bytes());

        if let serde_json::Value::Object(ref mut map) = body {
            map.insert("signature".to_string(), serde_json::Value::String(encoded.clone()));
        }

        Ok(SignedRequest {
            headers: vec![("X-Signature".to_string(), encoded)],
            body: Some(serde_json::to_vec(&body)?),
        })
    }
}

/// Serialises a JSON object with keys sorted lexicographically, required by
/// venues whose signature covers the exact byte sequence of the body.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("\"{}\":{}", k, canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_signer_sets_authorization_header() {
        let signer = BearerSigner::new("tok".to_string());
        let payload = SigningPayload {
            method: "GET",
            path: "/orders",
            query: "",
            body: b"",
        };
        let signed = signer.sign(&payload).unwrap();
        assert_eq!(signed.headers[0].1, "Bearer tok");
    }

    #[test]
    fn hmac_signer_is_deterministic_given_same_timestamp() {
        let creds = VenueCredentials {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            passphrase: None,
            private_key_pem: None,
        };
        let signer = HmacSigner::new(&creds);
        let payload = SigningPayload {
            method: "POST",
            path: "/orders",
            query: "",
            body: b"{\"qty\":1}",
        };
        let a = signer.signature("1000", &payload).unwrap();
        let b = signer.signature("1000", &payload).unwrap();
        assert_eq!(a, b);
        let c = signer.signature("1001", &payload).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let value = serde_json::json!({"b": 1, "a": 2});
        assert_eq!(canonical_json(&value), "{\"a\":2,\"b\":1}");
    }
}
