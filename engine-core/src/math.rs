use alloy_primitives::U256;
use anyhow::{anyhow, bail, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Music token quantities.
pub const TOKEN_DECIMALS: u8 = 18;
/// Payment currency (USDC) quantities.
pub const USDC_DECIMALS: u8 = 6;

pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u8).pow(U256::from(decimals))
}

/// `a * b / 10^18`, used both for `balance × price` and for
/// `revenue_per_share × supply`. Result is in the unit of `b`.
pub fn scaled_product(a: U256, b: U256) -> U256 {
    let scale = pow10(TOKEN_DECIMALS);
    match a.checked_mul(b) {
        Some(product) => product / scale,
        None => (a / scale).saturating_mul(b),
    }
}

/// Value of a token balance (18dp) at a per-token price (6dp), in 6dp units.
pub fn holding_value(balance: U256, price: U256) -> U256 {
    scaled_product(balance, price)
}

/// Token amount (18dp) bought by `payment` (6dp) at `price_per_token` (6dp).
/// Zero when the price is zero.
pub fn tokens_for_payment(payment: U256, price_per_token: U256) -> U256 {
    if price_per_token.is_zero() {
        return U256::ZERO;
    }
    payment.saturating_mul(pow10(TOKEN_DECIMALS)) / price_per_token
}

/// Exact decimal rendering with trailing fractional zeros removed.
pub fn format_units(value: U256, decimals: u8) -> String {
    let scale = pow10(decimals);
    let whole = value / scale;
    let frac = value % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Truncates to at most `max_fraction` digits and groups the integer part.
pub fn format_display(value: U256, decimals: u8, max_fraction: u8) -> String {
    let max_fraction = max_fraction.min(decimals);
    let scale = pow10(decimals);
    let whole = group_thousands(&(value / scale).to_string());
    let frac = (value % scale) / pow10(decimals - max_fraction);
    if frac.is_zero() {
        return whole;
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = max_fraction as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// `$1,234.50` from a 6dp amount; always two fraction digits, truncated.
pub fn format_usd(value: U256) -> String {
    let cents = value / pow10(USDC_DECIMALS - 2);
    let whole = cents / U256::from(100u8);
    let rem = cents % U256::from(100u8);
    format!(
        "${}.{:0>2}",
        group_thousands(&whole.to_string()),
        rem.to_string()
    )
}

/// Parses user input such as `"12.5"` into fixed-point units.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("empty amount");
    }
    let dec = Decimal::from_str(trimmed).map_err(|err| anyhow!("invalid amount '{}': {}", trimmed, err))?;
    if dec.is_sign_negative() && !dec.is_zero() {
        bail!("negative amount '{}'", trimmed);
    }
    let dec = dec.normalize();
    let scale = dec.scale();
    if scale > decimals as u32 {
        bail!(
            "amount '{}' has {} fractional digits, at most {} allowed",
            trimmed,
            scale,
            decimals
        );
    }
    let mantissa = U256::from(dec.mantissa().unsigned_abs());
    Ok(mantissa * pow10(decimals - scale as u8))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
