use crate::{
    abi::{decode_event, log_filter},
    aggregator::Aggregator,
};
use alloy_primitives::Address;
use market_core::{BlockNumber, ChainReader, EventKind, EventRecord};
use tracing::{debug, warn};

/// Inclusive block range covered by one `eth_getLogs` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub from: BlockNumber,
    pub to: BlockNumber,
}

/// Which events to fetch: one kind on one contract, optionally narrowed to
/// the indexed participant (creator, seller or buyer depending on `kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    pub contract: Address,
    pub kind: EventKind,
    pub participant: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFetch {
    /// Ascending block order.
    pub events: Vec<EventRecord>,
    /// Windows whose request failed and whose events are missing.
    pub failed_windows: Vec<BlockWindow>,
    /// `None` when the head could not be read and nothing was fetched.
    pub head_block: Option<BlockNumber>,
}

impl LogFetch {
    pub fn is_partial(&self) -> bool {
        self.head_block.is_none() || !self.failed_windows.is_empty()
    }
}

/// Splits `[from_block, head]` into windows whose ends sit on
/// `from_block + k * window`: `[s, s + w]`, `[s + w + 1, s + 2w]`, and so on,
/// the last one clipped to `head`. A zero `window` gives one block per window.
pub fn block_windows(from_block: BlockNumber, head: BlockNumber, window: u64) -> Vec<BlockWindow> {
    let mut out = Vec::new();
    if from_block > head {
        return out;
    }
    let step = window.max(1);
    let mut start = from_block;
    let mut boundary = from_block.saturating_add(window);
    loop {
        let end = boundary.min(head);
        out.push(BlockWindow {
            from: start,
            to: end,
        });
        if end >= head {
            break;
        }
        start = end + 1;
        boundary = boundary.saturating_add(step);
    }
    out
}

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// All events matching `query` from the configured start block to head.
    pub async fn fetch_events(&self, query: &EventQuery) -> LogFetch {
        self.fetch_events_from(query, self.start_block).await
    }

    pub async fn fetch_events_from(&self, query: &EventQuery, from_block: BlockNumber) -> LogFetch {
        let head = match self.reader.block_number().await {
            Ok(head) => head,
            Err(err) => {
                warn!(target: "logs", ?err, kind=?query.kind, "failed to read head block");
                return LogFetch::default();
            }
        };

        let mut fetch = LogFetch {
            head_block: Some(head),
            ..LogFetch::default()
        };
        for window in block_windows(from_block, head, self.window_blocks) {
            let filter = log_filter(
                query.contract,
                query.kind,
                query.participant,
                window.from,
                window.to,
            );
            let logs = match self.reader.get_logs(&filter).await {
                Ok(logs) => logs,
                Err(err) => {
                    self.metrics.log_windows_failed.inc();
                    warn!(
                        target: "logs",
                        ?err,
                        kind=?query.kind,
                        from=%window.from,
                        to=%window.to,
                        "error fetching logs in range, skipping window"
                    );
                    fetch.failed_windows.push(window);
                    continue;
                }
            };
            self.metrics.log_windows_fetched.inc();
            debug!(target: "logs", kind=?query.kind, from=%window.from, to=%window.to, count=%logs.len(), "window fetched");
            for log in logs {
                match decode_event(&log) {
                    Ok(record) if record.event.kind() == query.kind => fetch.events.push(record),
                    Ok(record) => {
                        debug!(target: "logs", kind=?record.event.kind(), expected=?query.kind, "ignoring unexpected event kind");
                    }
                    Err(err) => {
                        self.metrics.logs_undecodable.inc();
                        warn!(target: "logs", ?err, tx=%log.transaction_hash, "failed to decode log");
                    }
                }
            }
        }
        fetch
    }
}
