use std::{env, path::Path};

use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use market_core::MarketConfig;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::info;

pub const RPC_URL_ENV: &str = "MARKET_RPC_URL";

// A key that is absent or `null` keeps the default; any other type mismatch is an error.
fn json_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => bail!("{} must be a string, got {}", key, other),
    }
}

fn json_u64(obj: &Map<String, Value>, key: &str) -> Result<Option<u64>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a non-negative integer, got {}", key, v)),
    }
}

fn json_object<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<Option<&'a Map<String, Value>>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => bail!("{} must be an object, got {}", key, other),
    }
}

fn json_address(obj: &Map<String, Value>, key: &str) -> Result<Option<Address>> {
    json_str(obj, key)?
        .map(|s| {
            s.parse::<Address>()
                .with_context(|| format!("invalid address for {}: {}", key, s))
        })
        .transpose()
}

/// Reads the JSON config at `config_path` over the built-in defaults, then
/// applies `MARKET_RPC_URL` if set.
pub async fn load_config(config_path: &Path) -> Result<MarketConfig> {
    let raw = fs::read(config_path)
        .await
        .with_context(|| format!("read config file: {}", config_path.display()))?;
    let disk_cfg: Value = serde_json::from_slice(&raw).context("parse config json")?;
    let mut cfg = parse_config(&disk_cfg)?;
    if let Ok(url) = env::var(RPC_URL_ENV) {
        apply_rpc_override(&mut cfg, &url);
    }
    info!(
        "loaded config {} (rpc {}, platform {})",
        config_path.display(),
        cfg.rpc.url,
        cfg.contracts.platform
    );
    Ok(cfg)
}

pub fn parse_config(value: &Value) -> Result<MarketConfig> {
    let root = value
        .as_object()
        .ok_or_else(|| anyhow!("config root must be a JSON object"))?;
    let mut cfg = MarketConfig::default();

    if let Some(rpc) = json_object(root, "rpc")? {
        if let Some(url) = json_str(rpc, "url")? {
            cfg.rpc.url = url.to_string();
        }
        if let Some(timeout_ms) = json_u64(rpc, "timeout_ms")? {
            cfg.rpc.timeout_ms = timeout_ms;
        }
        if let Some(max_conn) = json_u64(rpc, "max_connections")? {
            cfg.rpc.max_connections = max_conn as usize;
        }
    }

    let contracts =
        json_object(root, "contracts")?.ok_or_else(|| anyhow!("missing contracts section"))?;
    cfg.contracts.platform = json_address(contracts, "platform")?
        .ok_or_else(|| anyhow!("missing contracts.platform"))?;
    if let Some(payment) = json_address(contracts, "payment_token")? {
        cfg.contracts.payment_token = payment;
    }

    cfg.account = json_address(root, "account")?;
    if let Some(start) = json_u64(root, "start_block")? {
        cfg.start_block = start;
    }
    if let Some(window) = json_u64(root, "log_window_blocks")? {
        if window == 0 {
            return Err(anyhow!("log_window_blocks must be positive"));
        }
        cfg.log_window_blocks = window;
    }
    if let Some(limit) = json_u64(root, "max_concurrent_reads")? {
        cfg.max_concurrent_reads = (limit as usize).max(1);
    }

    if let Some(receipt) = json_object(root, "receipt")? {
        if let Some(poll) = json_u64(receipt, "poll_interval_ms")? {
            cfg.receipt.poll_interval_ms = poll;
        }
        if let Some(timeout) = json_u64(receipt, "timeout_ms")? {
            cfg.receipt.timeout_ms = timeout;
        }
    }
    Ok(cfg)
}

pub fn apply_rpc_override(cfg: &mut MarketConfig, url: &str) {
    let url = url.trim();
    if !url.is_empty() {
        cfg.rpc.url = url.to_string();
    }
}
