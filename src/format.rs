// src/format.rs
use crate::types::{BorrowRates, FearGreed, Trend};

pub const TREND_UP: &str = "📈";
pub const TREND_DOWN: &str = "📉";

/// Rounded to a whole number with space-separated thousands: `65 000`.
pub fn format_price(price: f64) -> String {
    let rounded = price.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// GH/s in, whole EH/s out.
pub fn format_hashrate(gh_per_sec: u64) -> String {
    format!("{:.0} EH/s", gh_per_sec as f64 / 1e9)
}

pub fn format_borrow_rate(rate_pct: f64) -> String {
    format!("{rate_pct:.1}%")
}

pub fn trend_marker(trend: Option<Trend>) -> &'static str {
    match trend {
        Some(Trend::Up) => TREND_UP,
        Some(Trend::Down) => TREND_DOWN,
        None => "",
    }
}

pub fn price_segment(trend: Option<Trend>, symbol: &str, price: f64, currency_sign: &str) -> String {
    format!("{}{symbol}: {}{currency_sign}", trend_marker(trend), format_price(price))
}

pub fn sentiment_segment(fng: &FearGreed) -> String {
    let face = if fng.value >= 50 { "🤑" } else { "😨" };
    format!("{face}{}", fng.value)
}

pub fn hashrate_segment(gh_per_sec: u64) -> String {
    format!("⛏{}", format_hashrate(gh_per_sec))
}

pub fn borrow_segment(rates: &BorrowRates) -> String {
    format!("💸€{} ${}", format_borrow_rate(rates.eurc), format_borrow_rate(rates.usdc))
}
