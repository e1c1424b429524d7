// File: ./src/client/core.rs
use crate::client::cert::NoVerifier;
use crate::config::Config;
use crate::error::WorkflowError;
use crate::model::{CascadeTarget, RoundingOption, RoundingPolicy, flexible_bool};

use http::{Method, Request, Uri, header};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

type HttpsClient =
    Client<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>, String>;

/// REST client for the clinic backend's currency endpoints.
///
/// Holds a resolved base URL (trailing slashes already stripped) and the
/// optional bearer token; both come from [`Config`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: HttpsClient,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        insecure: bool,
    ) -> Result<Self, WorkflowError> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        if base.is_empty() {
            return Err(WorkflowError::ConfigMissing);
        }

        let tls_config_builder = rustls::ClientConfig::builder();

        let tls_config = if insecure {
            tls_config_builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        } else {
            let mut root_store = rustls::RootCertStore::empty();
            let result = rustls_native_certs::load_native_certs();
            root_store.add_parsable_certificates(result.certs);
            if root_store.is_empty() {
                return Err(WorkflowError::Network(
                    "No valid system certificates found.".to_string(),
                ));
            }
            tls_config_builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        };

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http = Client::builder(TokioExecutor::new()).build(https_connector);
        Ok(Self { http, base, token })
    }

    /// Build a client from the persisted configuration. An empty
    /// `server_url` maps to `ConfigMissing` so the UI can redirect to
    /// the configuration screen.
    pub fn from_config(config: &Config) -> Result<Self, WorkflowError> {
        Self::new(
            config.api_base(),
            config.token.clone(),
            config.allow_insecure_certs,
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<String, WorkflowError> {
        let uri: Uri = format!("{}{}", self.base, path)
            .parse()
            .map_err(|e: http::uri::InvalidUri| WorkflowError::Network(e.to_string()))?;

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| WorkflowError::Network(e.to_string()))?
            .to_bytes();
        let text = String::from_utf8_lossy(&bytes).to_string();

        if !status.is_success() {
            return Err(WorkflowError::Http {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }
        Ok(text)
    }

    // --- READS ---

    /// `GET /moneda`: current exchange-rate value. The backend reports it
    /// as either a string or a number; stored strings may carry percent
    /// escapes from older clients, so they are decoded here.
    pub async fn get_rate(&self) -> Result<String, WorkflowError> {
        let text = self.send(Method::GET, "/moneda", None).await?;
        let v: Value = serde_json::from_str(&text)
            .map_err(|e| WorkflowError::Network(format!("Malformed rate response: {}", e)))?;

        let value = match v.get("value") {
            Some(Value::String(s)) => decode_rate_value(s),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Ok(value)
    }

    /// `GET /redondeo`: current rounding policy. Unknown option names
    /// yield `None` (policy unconfigured).
    pub async fn get_rounding(&self) -> Result<Option<RoundingPolicy>, WorkflowError> {
        let text = self.send(Method::GET, "/redondeo", None).await?;
        let v: Value = serde_json::from_str(&text)
            .map_err(|e| WorkflowError::Network(format!("Malformed rounding response: {}", e)))?;

        let option = v
            .get("value")
            .and_then(Value::as_str)
            .and_then(RoundingOption::from_wire);
        let credit = v.get("isRedondeoFromPlus").map(flexible_bool).unwrap_or(false);

        Ok(option.map(|option| RoundingPolicy {
            option,
            credit_excess_to_bonus: credit,
        }))
    }

    // --- MUTATIONS ---

    /// `PUT /moneda/updateMoneda`: commit the new rate, optionally
    /// instructing the backend to recompute all product costs in the
    /// chosen currency direction.
    pub async fn update_rate(
        &self,
        value: &str,
        cascade: Option<CascadeTarget>,
    ) -> Result<(), WorkflowError> {
        let body = RateUpdateBody {
            value: encode_rate_value(value),
            config: cascade.map(|target| CascadeConfig {
                is_cambio_costos_productos: true,
                tipo: target.tipo(),
            }),
        };
        let json = serde_json::to_string(&body)
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        log::debug!("updateMoneda body: {}", json);
        self.send(Method::PUT, "/moneda/updateMoneda", Some(json))
            .await?;
        Ok(())
    }

    /// `PUT /redondeo/updateRedondeo`: persist the rounding policy. The
    /// legacy backend expects the boolean as the strings "true"/"false".
    pub async fn update_rounding(&self, policy: &RoundingPolicy) -> Result<(), WorkflowError> {
        let body = RoundingUpdateBody {
            value: policy.option.wire_name(),
            is_redondeo_from_plus: if policy.credit_excess_to_bonus {
                "true"
            } else {
                "false"
            },
        };
        let json = serde_json::to_string(&body)
            .map_err(|e| WorkflowError::Network(e.to_string()))?;

        self.send(Method::PUT, "/redondeo/updateRedondeo", Some(json))
            .await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RateUpdateBody {
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<CascadeConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CascadeConfig {
    is_cambio_costos_productos: bool,
    tipo: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoundingUpdateBody {
    value: &'static str,
    is_redondeo_from_plus: &'static str,
}

/// Most specific message extractable from an error response: a JSON
/// `error`/`message` field, else the raw body text, else a generic
/// fallback.
fn extract_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = v.get(key).and_then(Value::as_str)
                && !msg.trim().is_empty()
            {
                return msg.trim().to_string();
            }
        }
    }
    let raw = body.trim();
    if raw.is_empty() {
        "The server rejected the request".to_string()
    } else {
        raw.to_string()
    }
}

/// Percent-encodes the rate value the way the legacy mobile client did
/// (`encodeURIComponent` semantics), so the backend stores an identical
/// byte sequence regardless of which client committed it.
pub(crate) fn encode_rate_value(value: &str) -> String {
    const UNRESERVED_MARKS: &[u8] = b"-_.!~*'()";
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        if b.is_ascii_alphanumeric() || UNRESERVED_MARKS.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Inverse of [`encode_rate_value`]; malformed escapes pass through as-is.
pub(crate) fn decode_rate_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_val),
                bytes.get(i + 2).copied().and_then(hex_val),
            )
        {
            out.push(hi * 16 + lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).to_string()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
