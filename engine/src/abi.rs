use alloy_primitives::{Address, B256};
use alloy_sol_types::{sol, SolEvent};
use market_core::{EventKind, EventRecord, LogFilter, PlatformEvent, RawLog};

use crate::error::ChainError;

sol! {
    interface IMusicPlatform {
        struct Listing {
            uint256 id;
            address seller;
            address tokenAddress;
            uint256 amount;
            uint256 pricePerToken;
            bool active;
        }

        event MusicTokenCreated(address indexed creator, address indexed tokenAddress, string name, string symbol);
        event TokenListed(uint256 indexed listingId, address indexed seller, uint256 amount, uint256 price);
        event TokenSold(uint256 indexed listingId, address indexed buyer, uint256 amount, uint256 totalPrice);

        function createMusicToken(string name, string symbol, uint256 maxSupply, address artist) external returns (address tokenAddress);
        function listToken(address tokenAddress, uint256 amount, uint256 pricePerToken) external returns (uint256 listingId);
        function buyToken(uint256 listingId, uint256 usdcAmount) external;
        function cancelListing(uint256 listingId) external;

        function getAllListings() external view returns (Listing[] allListings);
        function getListing(uint256 listingId) external view returns (Listing listing);
        function listings(uint256 listingId) external view returns (address seller, address tokenAddress, uint256 amount, uint256 pricePerToken, bool active);
    }
}

sol! {
    interface IMusicToken {
        function balanceOf(address account) external view returns (uint256 balance);
        function name() external view returns (string value);
        function symbol() external view returns (string value);
        function totalSupply() external view returns (uint256 supply);
        function approve(address spender, uint256 amount) external returns (bool ok);

        function getTotalRevenuePerShare() external view returns (uint256 perShare);
        function pendingRevenue(address account) external view returns (uint256 amount);
        function claimableRevenue(address account) external view returns (uint256 amount);
        function depositRevenue(uint256 amount) external;
        function withdrawRevenue() external;
    }
}

impl From<IMusicPlatform::Listing> for market_core::Listing {
    fn from(l: IMusicPlatform::Listing) -> Self {
        Self {
            id: l.id,
            seller: l.seller,
            token_address: l.tokenAddress,
            amount: l.amount,
            price_per_token: l.pricePerToken,
            active: l.active,
        }
    }
}

pub fn event_signature(kind: EventKind) -> B256 {
    match kind {
        EventKind::MusicTokenCreated => IMusicPlatform::MusicTokenCreated::SIGNATURE_HASH,
        EventKind::TokenListed => IMusicPlatform::TokenListed::SIGNATURE_HASH,
        EventKind::TokenSold => IMusicPlatform::TokenSold::SIGNATURE_HASH,
    }
}

/// Topic slot of the address each event can be filtered by: creator, seller, buyer.
fn participant_topic_index(kind: EventKind) -> usize {
    match kind {
        EventKind::MusicTokenCreated => 1,
        EventKind::TokenListed | EventKind::TokenSold => 2,
    }
}

pub fn log_filter(
    contract: Address,
    kind: EventKind,
    participant: Option<Address>,
    from_block: u64,
    to_block: u64,
) -> LogFilter {
    let mut topics = vec![Some(event_signature(kind))];
    if let Some(addr) = participant {
        let idx = participant_topic_index(kind);
        topics.resize(idx + 1, None);
        topics[idx] = Some(addr.into_word());
    }
    LogFilter {
        address: contract,
        topics,
        from_block,
        to_block,
    }
}

pub fn decode_event(log: &RawLog) -> Result<EventRecord, ChainError> {
    let topic0 = log
        .topics
        .first()
        .copied()
        .ok_or_else(|| ChainError::Decode("log without topics".to_string()))?;
    let topics = log.topics.iter().copied();
    let event = if topic0 == IMusicPlatform::MusicTokenCreated::SIGNATURE_HASH {
        let ev = IMusicPlatform::MusicTokenCreated::decode_raw_log(topics, &log.data, true)?;
        PlatformEvent::MusicTokenCreated {
            creator: ev.creator,
            token_address: ev.tokenAddress,
            name: ev.name,
            symbol: ev.symbol,
        }
    } else if topic0 == IMusicPlatform::TokenListed::SIGNATURE_HASH {
        let ev = IMusicPlatform::TokenListed::decode_raw_log(topics, &log.data, true)?;
        PlatformEvent::TokenListed {
            listing_id: ev.listingId,
            seller: ev.seller,
            amount: ev.amount,
            price: ev.price,
        }
    } else if topic0 == IMusicPlatform::TokenSold::SIGNATURE_HASH {
        let ev = IMusicPlatform::TokenSold::decode_raw_log(topics, &log.data, true)?;
        PlatformEvent::TokenSold {
            listing_id: ev.listingId,
            buyer: ev.buyer,
            amount: ev.amount,
            total_price: ev.totalPrice,
        }
    } else {
        return Err(ChainError::Decode(format!("unknown event topic {}", topic0)));
    };
    Ok(EventRecord {
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
        event,
    })
}
