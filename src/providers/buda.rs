use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::providers::util::with_retry;
use crate::ticker::{Ticker, TickerSource};

// BudaProvider implementation for TickerSource
pub struct BudaProvider {
    base_url: String,
}

impl BudaProvider {
    pub fn new(base_url: &str) -> Self {
        BudaProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct TickersResponse {
    tickers: Vec<TickerEntry>,
}

#[derive(Deserialize, Debug)]
struct TickerEntry {
    market_id: String,
    // Buda reports prices as ["857740000.0", "CLP"] pairs.
    last_price: (Decimal, String),
    price_variation_24h: Decimal,
}

/// Converts raw entries into [`Ticker`]s, preserving upstream listing order.
/// Entries whose market id does not split into base and quote are skipped.
fn into_tickers(entries: Vec<TickerEntry>) -> Vec<Ticker> {
    let mut tickers = Vec::with_capacity(entries.len());

    for entry in entries {
        let (base, quote) = match entry.market_id.split_once('-') {
            Some((base, quote)) => (base.to_string(), quote.to_string()),
            None => {
                debug!("Skipping malformed market id: {}", entry.market_id);
                continue;
            }
        };

        tickers.push(Ticker {
            market_id: entry.market_id,
            base,
            quote,
            last_price: entry.last_price.0,
            price_variation_24h: entry.price_variation_24h,
        });
    }

    tickers
}

#[async_trait]
impl TickerSource for BudaProvider {
    #[instrument(name = "BudaTickersFetch", skip(self))]
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let url = format!("{}/api/v2/tickers", self.base_url);
        debug!("Requesting ticker snapshot from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("fiatfolio/0.2")
            .build()?;
        let response = with_retry(
            || async { client.get(&url).send().await?.error_for_status() },
            2,
            std::time::Duration::from_millis(500),
        )
        .await
        .map_err(|e| anyhow!("Ticker request error: {} URL: {}", e, url))?;

        debug!(response = ?response, "Received Buda response");

        let data = response
            .json::<TickersResponse>()
            .await
            .with_context(|| format!("Failed to parse ticker response from {url}"))?;

        let tickers = into_tickers(data.tickers);
        debug!("Fetched {} tickers", tickers.len());

        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "tickers": [
            {
                "market_id": "BTC-CLP",
                "last_price": ["857740000.0", "CLP"],
                "min_ask": ["857740000.0", "CLP"],
                "max_bid": ["857000000.0", "CLP"],
                "volume": ["12.5", "BTC"],
                "price_variation_24h": "0.013",
                "price_variation_7d": "-0.021"
            },
            {
                "market_id": "ETH-BTC",
                "last_price": ["0.052", "BTC"],
                "price_variation_24h": "-0.004",
                "price_variation_7d": "0.01"
            }
        ]
    }"#;

    #[test]
    fn test_response_deserialization() {
        let data: TickersResponse = serde_json::from_str(SAMPLE).unwrap();
        let tickers = into_tickers(data.tickers);

        assert_eq!(tickers.len(), 2);
        assert_eq!(tickers[0].market_id, "BTC-CLP");
        assert_eq!(tickers[0].base, "BTC");
        assert_eq!(tickers[0].quote, "CLP");
        assert_eq!(tickers[0].last_price, "857740000.0".parse().unwrap());
        assert_eq!(
            tickers[0].price_variation_24h,
            "0.013".parse::<Decimal>().unwrap()
        );
        assert_eq!(tickers[1].base, "ETH");
        assert_eq!(tickers[1].quote, "BTC");
    }

    #[test]
    fn test_malformed_market_id_is_skipped() {
        let json = r#"{
            "tickers": [
                {
                    "market_id": "BTCCLP",
                    "last_price": ["1.0", "CLP"],
                    "price_variation_24h": "0.0"
                }
            ]
        }"#;

        let data: TickersResponse = serde_json::from_str(json).unwrap();
        assert!(into_tickers(data.tickers).is_empty());
    }
}
