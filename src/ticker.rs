//! Market ticker abstractions.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// One market pair snapshot: how many `quote` units a `base` unit last traded
/// at, plus the fractional price change over the trailing 24 hours.
#[derive(Debug, Clone)]
pub struct Ticker {
    pub market_id: String,
    pub base: String,
    pub quote: String,
    pub last_price: Decimal,
    pub price_variation_24h: Decimal,
}

/// Supplies a snapshot of market tickers, in the upstream's listing order.
/// Resolution outcomes depend on that order, so implementations must not
/// reorder.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>>;
}
