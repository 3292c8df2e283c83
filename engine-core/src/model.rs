use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::math::{holding_value, tokens_for_payment};

pub type BlockNumber = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    MusicTokenCreated,
    TokenListed,
    TokenSold,
}

/// A log exactly as the node returned it, before decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: BlockNumber,
    pub transaction_hash: B256,
}

/// `eth_getLogs` filter: one contract, positional topics (`None` matches anything),
/// inclusive block bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<Option<B256>>,
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
}

impl LogFilter {
    pub fn matches(&self, log: &RawLog) -> bool {
        if log.address != self.address {
            return false;
        }
        if log.block_number < self.from_block || log.block_number > self.to_block {
            return false;
        }
        self.topics.iter().enumerate().all(|(idx, want)| match want {
            Some(topic) => log.topics.get(idx) == Some(topic),
            None => true,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlatformEvent {
    MusicTokenCreated {
        creator: Address,
        token_address: Address,
        name: String,
        symbol: String,
    },
    TokenListed {
        listing_id: U256,
        seller: Address,
        amount: U256,
        price: U256,
    },
    TokenSold {
        listing_id: U256,
        buyer: Address,
        amount: U256,
        total_price: U256,
    },
}

impl PlatformEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlatformEvent::MusicTokenCreated { .. } => EventKind::MusicTokenCreated,
            PlatformEvent::TokenListed { .. } => EventKind::TokenListed,
            PlatformEvent::TokenSold { .. } => EventKind::TokenSold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub block_number: BlockNumber,
    pub transaction_hash: B256,
    pub event: PlatformEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub id: U256,
    pub seller: Address,
    pub token_address: Address,
    /// Remaining quantity, 18 decimals.
    pub amount: U256,
    /// 6 decimals.
    pub price_per_token: U256,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ListingStatus {
    Active,
    SoldOut,
    Cancelled,
}

impl ListingStatus {
    /// The contract only clears `active`; a zero remainder is what separates a
    /// completed sale from a cancellation.
    pub fn from_state(active: bool, remaining: U256) -> Self {
        if active {
            ListingStatus::Active
        } else if remaining.is_zero() {
            ListingStatus::SoldOut
        } else {
            ListingStatus::Cancelled
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ListingStatus::Active => "Active",
            ListingStatus::SoldOut => "Sold Out",
            ListingStatus::Cancelled => "Cancelled",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHolding {
    pub token_address: Address,
    pub name: String,
    pub symbol: String,
    pub balance: U256,
    pub price: U256,
    /// Hash of the creation transaction, unique per holding row.
    pub transaction_hash: B256,
}

impl TokenHolding {
    /// Value in 6-decimal currency units.
    pub fn value(&self) -> U256 {
        holding_value(self.balance, self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PortfolioSummary {
    pub holdings: Vec<TokenHolding>,
    pub total_value: U256,
    /// Some creation events may be missing because a log window failed.
    pub partial: bool,
}

/// A token created by the user, with the user's balance (zero allowed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedToken {
    pub token_address: Address,
    pub name: String,
    pub symbol: String,
    pub balance: U256,
    pub block_number: BlockNumber,
    pub transaction_hash: B256,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingRecord {
    pub listing_id: U256,
    pub token_address: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub initial_amount: U256,
    pub remaining_amount: U256,
    pub price_per_token: U256,
    pub status: ListingStatus,
    pub listed_at: DateTime<Utc>,
    pub transaction_hash: B256,
}

impl ListingRecord {
    pub fn sold_amount(&self) -> U256 {
        self.initial_amount.saturating_sub(self.remaining_amount)
    }

    pub fn listing_date(&self) -> String {
        self.listed_at.format("%b %-d, %Y").to_string()
    }
}

/// A seller's listings; `partial` when some `TokenListed` windows were lost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ListingHistory {
    pub records: Vec<ListingRecord>,
    pub partial: bool,
}

/// One listing as shown to a prospective buyer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingDetail {
    pub listing: Listing,
    pub token_name: String,
    pub token_symbol: String,
    /// Buyer's payment-token balance; `None` without a buyer or when the read failed.
    pub buyer_balance: Option<U256>,
}

impl ListingDetail {
    pub fn status(&self) -> ListingStatus {
        ListingStatus::from_state(self.listing.active, self.listing.amount)
    }

    /// Tokens (18dp) that `payment` (6dp) buys at this listing's price.
    pub fn estimate_tokens(&self, payment: U256) -> U256 {
        tokens_for_payment(payment, self.listing.price_per_token)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityKind {
    Created,
    Listed,
    Bought,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityKind::Created => "Created Token",
            ActivityKind::Listed => "Listed Token",
            ActivityKind::Bought => "Bought Token",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub block_number: BlockNumber,
    pub transaction_hash: B256,
    pub description: String,
    /// 18 decimals; `None` for creations.
    pub amount: Option<U256>,
    /// 6 decimals: price per token for listings, total paid for purchases.
    pub value: Option<U256>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ActivityFeed {
    /// Newest first.
    pub items: Vec<ActivityItem>,
    /// At least one of the three event streams came back incomplete.
    pub partial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueSummary {
    pub token_address: Address,
    pub total_supply: U256,
    pub revenue_per_share: U256,
    /// 6 decimals.
    pub total_revenue: U256,
    pub pending: U256,
    pub claimable: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: BlockNumber,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed { hash: B256, block_number: BlockNumber },
    Failed { message: String },
}

impl TxOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TxOutcome::Confirmed { .. })
    }
}
