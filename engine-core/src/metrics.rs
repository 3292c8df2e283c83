use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub log_windows_fetched: IntCounter,
    pub log_windows_failed: IntCounter,
    pub logs_undecodable: IntCounter,
    pub item_reads_failed: IntCounter,
    pub tx_sent: IntCounter,
    pub tx_confirmed: IntCounter,
    pub tx_failed: IntCounter,
    pub inflight_tx: IntGauge,
}

impl Metrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Arc<Self>> {
        let log_windows_fetched = IntCounter::with_opts(Opts::new(
            "log_windows_fetched",
            "Block windows fetched from eth_getLogs",
        ))?;
        let log_windows_failed = IntCounter::with_opts(Opts::new(
            "log_windows_failed",
            "Block windows that failed and were skipped",
        ))?;
        let logs_undecodable =
            IntCounter::with_opts(Opts::new("logs_undecodable", "Logs that failed to decode"))?;
        let item_reads_failed = IntCounter::with_opts(Opts::new(
            "item_reads_failed",
            "Per-item contract reads that failed inside an aggregation",
        ))?;
        let tx_sent = IntCounter::with_opts(Opts::new("tx_sent", "Transactions submitted"))?;
        let tx_confirmed =
            IntCounter::with_opts(Opts::new("tx_confirmed", "Transactions confirmed"))?;
        let tx_failed = IntCounter::with_opts(Opts::new("tx_failed", "Transactions failed"))?;
        let inflight_tx = IntGauge::with_opts(Opts::new("inflight_tx", "Inflight transactions"))?;
        registry.register(Box::new(log_windows_fetched.clone())).ok();
        registry.register(Box::new(log_windows_failed.clone())).ok();
        registry.register(Box::new(logs_undecodable.clone())).ok();
        registry.register(Box::new(item_reads_failed.clone())).ok();
        registry.register(Box::new(tx_sent.clone())).ok();
        registry.register(Box::new(tx_confirmed.clone())).ok();
        registry.register(Box::new(tx_failed.clone())).ok();
        registry.register(Box::new(inflight_tx.clone())).ok();
        Ok(Arc::new(Self {
            log_windows_fetched,
            log_windows_failed,
            logs_undecodable,
            item_reads_failed,
            tx_sent,
            tx_confirmed,
            tx_failed,
            inflight_tx,
        }))
    }

    /// Metrics bound to a private registry, for callers that don't export them.
    pub fn detached() -> prometheus::Result<Arc<Self>> {
        Self::new(&Registry::new())
    }
}
