//! Plain-text rendering of the dashboard views.

use alloy_primitives::U256;
use market_core::{
    format_display, format_units, format_usd, ActivityFeed, ActivityItem, ActivityKind,
    CreatedToken, ListingDetail, ListingHistory, PortfolioSummary, RevenueSummary, TOKEN_DECIMALS,
    USDC_DECIMALS,
};

const PARTIAL_WARNING: &str = "  warning: some block ranges could not be read, results may be incomplete\n";

fn token_amount(value: U256) -> String {
    format_display(value, TOKEN_DECIMALS, 2)
}

pub fn portfolio(summary: &PortfolioSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Portfolio ({} holdings, total {})\n",
        summary.holdings.len(),
        format_usd(summary.total_value)
    ));
    if summary.partial {
        out.push_str("  warning: some block ranges or listing prices could not be read, holdings may be incomplete\n");
    }
    if summary.holdings.is_empty() {
        out.push_str("  No tokens held.\n");
    }
    for h in &summary.holdings {
        out.push_str(&format!(
            "  {:<24} {:<8} {:>16} @ {:>12} = {:>14}  {}\n",
            h.name,
            h.symbol,
            token_amount(h.balance),
            format_usd(h.price),
            format_usd(h.value()),
            h.token_address
        ));
    }
    out
}

pub fn listings(history: &ListingHistory) -> String {
    let records = &history.records;
    let mut out = format!("Listings ({})\n", records.len());
    if history.partial {
        out.push_str(PARTIAL_WARNING);
    }
    if records.is_empty() {
        out.push_str("  No listings.\n");
    }
    for r in records {
        let id = r.listing_id.to_string();
        out.push_str(&format!(
            "  #{:<5} {:<24} {:<8} {:>10} sold {:>14} / {:<14} @ {:>10}  {}\n",
            id,
            r.token_name,
            r.token_symbol,
            r.status,
            token_amount(r.sold_amount()),
            token_amount(r.initial_amount),
            format_usd(r.price_per_token),
            r.listing_date()
        ));
    }
    out
}

fn activity_line(item: &ActivityItem) -> String {
    let mut line = format!(
        "  {:>10}  {:<14} {}",
        item.block_number,
        item.kind,
        item.description
    );
    if let Some(amount) = item.amount {
        line.push_str(&format!("  {} Tokens", token_amount(amount)));
    }
    if let Some(value) = item.value {
        let sign = if item.kind == ActivityKind::Bought { "-" } else { "+" };
        line.push_str(&format!("  {}{}", sign, format_usd(value)));
    }
    line.push_str(&format!("  {}\n", item.transaction_hash));
    line
}

pub fn activity(feed: &ActivityFeed) -> String {
    let mut out = format!("Activity ({})\n", feed.items.len());
    if feed.partial {
        out.push_str(PARTIAL_WARNING);
    }
    if feed.items.is_empty() {
        out.push_str("  No recent activity found.\n");
    }
    for item in &feed.items {
        out.push_str(&activity_line(item));
    }
    out
}

pub fn created_tokens(tokens: &[CreatedToken]) -> String {
    let mut out = format!("Created tokens ({})\n", tokens.len());
    if tokens.is_empty() {
        out.push_str("  No tokens created yet.\n");
    }
    for t in tokens {
        out.push_str(&format!(
            "  {:<24} {:<8} balance {:>16}  {}\n",
            t.name,
            t.symbol,
            token_amount(t.balance),
            t.token_address
        ));
    }
    out
}

/// Listing as seen by a buyer; `payment` adds the token estimate for that spend.
pub fn listing_detail(detail: &ListingDetail, payment: Option<U256>) -> String {
    let listing = &detail.listing;
    let id = listing.id.to_string();
    let mut out = format!(
        "Listing #{} {} ({}) {}\n  available {} @ {}  seller {}  token {}\n",
        id,
        detail.token_name,
        detail.token_symbol,
        detail.status(),
        token_amount(listing.amount),
        format_usd(listing.price_per_token),
        listing.seller,
        listing.token_address
    );
    if let Some(balance) = detail.buyer_balance {
        out.push_str(&format!("  your balance {} USDC\n", format_units(balance, USDC_DECIMALS)));
    }
    if let Some(payment) = payment {
        out.push_str(&format!(
            "  {} buys about {} {}\n",
            format_usd(payment),
            format_display(detail.estimate_tokens(payment), TOKEN_DECIMALS, 4),
            detail.token_symbol
        ));
    }
    out
}

pub fn revenue(summary: &RevenueSummary) -> String {
    format!(
        "Revenue for {}\n  total {}  per token {}  pending {}  claimable {}\n",
        summary.token_address,
        format_usd(summary.total_revenue),
        format_usd(summary.revenue_per_share),
        format_usd(summary.pending),
        format_usd(summary.claimable)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use market_core::{pow10, Listing, TokenHolding};

    #[test]
    fn zero_activity_values_are_rendered() {
        let item = ActivityItem {
            kind: ActivityKind::Listed,
            block_number: 7,
            transaction_hash: B256::ZERO,
            description: "Listed tokens for sale".into(),
            amount: Some(U256::ZERO),
            value: Some(U256::ZERO),
        };
        let line = activity_line(&item);
        assert!(line.contains("0 Tokens"), "{}", line);
        assert!(line.contains("+$0.00"), "{}", line);

        let created = ActivityItem {
            kind: ActivityKind::Created,
            amount: None,
            value: None,
            description: "Created A (A)".into(),
            ..item
        };
        let line = activity_line(&created);
        assert!(!line.contains("Tokens"));
        assert!(!line.contains('$'));
    }

    #[test]
    fn portfolio_shows_totals_and_partial_flag() {
        let summary = PortfolioSummary {
            holdings: vec![TokenHolding {
                token_address: Address::ZERO,
                name: "Night Drive".into(),
                symbol: "NDRV".into(),
                balance: U256::from(2u8) * pow10(TOKEN_DECIMALS),
                price: U256::from(5_000_000u64),
                transaction_hash: B256::ZERO,
            }],
            total_value: U256::from(10_000_000u64),
            partial: true,
        };
        let text = portfolio(&summary);
        assert!(text.contains("total $10.00"));
        assert!(text.contains("warning"));
        assert!(text.contains("Night Drive"));
    }

    #[test]
    fn partial_feeds_carry_a_warning() {
        let feed = ActivityFeed {
            items: Vec::new(),
            partial: true,
        };
        assert!(activity(&feed).contains("warning"));
        assert!(!activity(&ActivityFeed::default()).contains("warning"));

        let history = ListingHistory {
            records: Vec::new(),
            partial: true,
        };
        let text = listings(&history);
        assert!(text.contains("warning"), "{}", text);
        assert!(text.contains("No listings."));
    }

    #[test]
    fn listing_detail_shows_balance_and_estimate() {
        let detail = ListingDetail {
            listing: Listing {
                id: U256::from(4u8),
                seller: Address::with_last_byte(9),
                token_address: Address::with_last_byte(0x50),
                amount: U256::from(40u8) * pow10(TOKEN_DECIMALS),
                price_per_token: U256::from(2_000_000u64),
                active: true,
            },
            token_name: "Night Drive".into(),
            token_symbol: "NDRV".into(),
            buyer_balance: Some(U256::from(25_500_000u64)),
        };
        let text = listing_detail(&detail, Some(U256::from(25_000_000u64)));
        assert!(text.contains("Listing #4 Night Drive (NDRV) Active"), "{}", text);
        assert!(text.contains("your balance 25.5 USDC"), "{}", text);
        assert!(text.contains("$25.00 buys about 12.5 NDRV"), "{}", text);
    }
}
