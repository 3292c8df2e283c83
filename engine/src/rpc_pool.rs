use crate::error::ChainError;
use anyhow::{Context, Result};
use market_core::RpcConfig;
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec, Registry};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, ClientBuilder,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// JSON-RPC over a pooled HTTP client.
#[derive(Clone)]
pub struct RpcPool {
    client: Client,
    url: Url,
    next_id: Arc<AtomicU64>,
    metrics: Arc<RpcMetrics>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcPool {
    pub fn new(cfg: &RpcConfig, registry: &Registry) -> Result<Self> {
        let url = Self::normalize_url(&cfg.url)?;
        let client = ClientBuilder::new()
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(cfg.max_connections)
            .gzip(true)
            .connect_timeout(Duration::from_millis(cfg.timeout_ms))
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .default_headers(Self::default_headers())
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
            metrics: Arc::new(RpcMetrics::new(registry)?),
        })
    }

    // Wallet setups often hand out the websocket endpoint; the HTTP one sits at the same host.
    fn normalize_url(raw: &str) -> Result<Url> {
        let url = if let Some(rest) = raw.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = raw.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            raw.to_string()
        };
        Url::parse(&url).with_context(|| format!("parse rpc url: {}", raw))
    }

    fn default_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(ACCEPT, HeaderValue::from_static("application/json"));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h
    }

    /// Sends one request; a `null` result deserializes into `T` as-is, so
    /// callers expecting "not yet available" ask for an `Option`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let start = Instant::now();
        self.metrics.inflight.with_label_values(&[method]).inc();
        self.metrics.req_total.with_label_values(&[method]).inc();
        let result = self.send(&body).await;
        let dur = start.elapsed().as_secs_f64();
        self.metrics.inflight.with_label_values(&[method]).dec();
        self.metrics
            .latency
            .with_label_values(&[method])
            .observe(dur);

        let dur_ms = (dur * 1000.0) as u64;
        match result {
            Ok(value) => {
                tracing::debug!(target: "rpc", method=%method, id=%id, latency_ms=%dur_ms, "rpc request completed");
                serde_json::from_value(value).map_err(ChainError::from)
            }
            Err(err) => {
                self.metrics.fail_total.with_label_values(&[method]).inc();
                tracing::debug!(target: "rpc", method=%method, id=%id, latency_ms=%dur_ms, error=%err, "rpc request failed");
                Err(err)
            }
        }
    }

    async fn send(&self, body: &Value) -> Result<Value, ChainError> {
        let resp = self.client.post(self.url.clone()).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChainError::HttpStatus { status, text });
        }
        let envelope: RpcEnvelope = resp.json().await?;
        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[derive(Clone)]
struct RpcMetrics {
    req_total: IntCounterVec,
    fail_total: IntCounterVec,
    inflight: IntGaugeVec,
    latency: HistogramVec,
}

impl RpcMetrics {
    fn new(registry: &Registry) -> prometheus::Result<Self> {
        let req_total = IntCounterVec::new(
            prometheus::Opts::new("rpc_requests_total", "JSON-RPC requests total"),
            &["method"],
        )?;
        let fail_total = IntCounterVec::new(
            prometheus::Opts::new("rpc_failures_total", "JSON-RPC failures total"),
            &["method"],
        )?;
        let inflight = IntGaugeVec::new(
            prometheus::Opts::new("rpc_inflight", "JSON-RPC inflight requests"),
            &["method"],
        )?;
        let latency = HistogramVec::new(
            prometheus::HistogramOpts::new("rpc_latency_seconds", "JSON-RPC request latency seconds")
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
            &["method"],
        )?;
        registry.register(Box::new(req_total.clone())).ok();
        registry.register(Box::new(fail_total.clone())).ok();
        registry.register(Box::new(inflight.clone())).ok();
        registry.register(Box::new(latency.clone())).ok();
        Ok(Self {
            req_total,
            fail_total,
            inflight,
            latency,
        })
    }
}
