//! Portfolio valuation against a target fiat currency.
//!
//! Orchestrates the ticker snapshot, conversion graph construction, and
//! per-holding rate resolution, then renders the results. The pricing math
//! lives in [`crate::pricing`]; this module only decides per-holding policy
//! (show unpriced holdings, skip holdings without a 24h rate) and sums.

use anyhow::Result;
use comfy_table::Cell;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{AppConfig, Portfolio};
use crate::pricing::{self, Graph};
use crate::providers::buda::BudaProvider;
use crate::ticker::{Ticker, TickerSource};
use crate::ui;

#[derive(Debug, Clone)]
pub struct HoldingValuation {
    pub symbol: String,
    pub amount: Decimal,
    pub rate: Option<Decimal>,
    pub value: Option<Decimal>,
}

#[derive(Debug)]
pub struct PortfolioValuation {
    pub name: String,
    pub fiat: String,
    pub total: Decimal,
    pub holdings: Vec<HoldingValuation>,
    pub unpriced: Vec<String>,
}

/// Values every holding at current rates. Holdings with no resolvable rate
/// are kept in the report as unpriced instead of failing the whole run.
pub fn value_portfolio(portfolio: &Portfolio, graph: &Graph, fiat: &str) -> PortfolioValuation {
    let fiat = fiat.to_uppercase();
    let mut holdings = Vec::with_capacity(portfolio.holdings.len());
    let mut unpriced = Vec::new();
    let mut total = Decimal::ZERO;

    for holding in &portfolio.holdings {
        let symbol = holding.symbol.to_uppercase();
        let rate = pricing::find_rate(graph, &symbol, &fiat);
        let value = rate.map(|r| holding.amount * r);

        match value {
            Some(v) => total += v,
            None => {
                debug!("No conversion path for {} -> {}", symbol, fiat);
                unpriced.push(symbol.clone());
            }
        }

        holdings.push(HoldingValuation {
            symbol,
            amount: holding.amount,
            rate,
            value,
        });
    }

    PortfolioValuation {
        name: portfolio.name.clone(),
        fiat,
        total,
        holdings,
        unpriced,
    }
}

#[derive(Debug, Clone)]
pub struct HoldingChange {
    pub symbol: String,
    pub amount: Decimal,
    pub value_now: Decimal,
    pub value_24h: Decimal,
    pub delta: Decimal,
    pub delta_pct: Option<Decimal>,
}

#[derive(Debug)]
pub struct PortfolioChange {
    pub name: String,
    pub fiat: String,
    pub total_now: Decimal,
    pub total_24h: Decimal,
    pub total_delta: Decimal,
    pub holdings: Vec<HoldingChange>,
    pub skipped: Vec<String>,
}

/// Values every holding at current and 24h-ago rates. A holding unpriced in
/// either graph is skipped from the totals and reported as such.
pub fn value_portfolio_24h(
    portfolio: &Portfolio,
    graph_now: &Graph,
    graph_24h: &Graph,
    fiat: &str,
) -> PortfolioChange {
    let fiat = fiat.to_uppercase();
    let mut holdings = Vec::new();
    let mut skipped = Vec::new();
    let mut total_now = Decimal::ZERO;
    let mut total_24h = Decimal::ZERO;

    for holding in &portfolio.holdings {
        let symbol = holding.symbol.to_uppercase();
        let rate_now = pricing::find_rate(graph_now, &symbol, &fiat);
        let rate_24h = pricing::find_rate(graph_24h, &symbol, &fiat);

        let (Some(rate_now), Some(rate_24h)) = (rate_now, rate_24h) else {
            debug!("No 24h-comparable rate for {} -> {}", symbol, fiat);
            skipped.push(symbol);
            continue;
        };

        let value_now = holding.amount * rate_now;
        let value_24h = holding.amount * rate_24h;
        let delta = value_now - value_24h;
        let delta_pct = if value_24h.is_zero() {
            None
        } else {
            Some(delta / value_24h * Decimal::from(100))
        };

        total_now += value_now;
        total_24h += value_24h;
        holdings.push(HoldingChange {
            symbol,
            amount: holding.amount,
            value_now,
            value_24h,
            delta,
            delta_pct,
        });
    }

    PortfolioChange {
        name: portfolio.name.clone(),
        fiat,
        total_now,
        total_24h,
        total_delta: total_now - total_24h,
        holdings,
        skipped,
    }
}

impl PortfolioValuation {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Amount"),
            ui::header_cell("Rate"),
            ui::header_cell(&format!("Value ({})", self.fiat)),
        ]);

        for holding in &self.holdings {
            let amount = Cell::new(holding.amount.to_string());
            let rate = ui::format_optional_cell(holding.rate, |r| r.round_dp(6).to_string());
            let value = ui::format_optional_cell(holding.value, |v| v.round_dp(2).to_string());

            table.add_row(vec![Cell::new(&holding.symbol), amount, rate, value]);
        }

        let mut output = format!(
            "Portfolio: {}\n\n",
            ui::style_text(&self.name, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text(&self.fiat, ui::StyleType::TotalLabel),
            ui::style_text(&self.total.round_dp(2).to_string(), ui::StyleType::TotalValue)
        ));

        if !self.unpriced.is_empty() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Unpriced (no conversion path): {}", self.unpriced.join(", ")),
                    ui::StyleType::Error
                )
            ));
        }

        output
    }
}

impl PortfolioChange {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Amount"),
            ui::header_cell(&format!("Value ({})", self.fiat)),
            ui::header_cell(&format!("24h ago ({})", self.fiat)),
            ui::header_cell("Change"),
            ui::header_cell("Change (%)"),
        ]);

        for holding in &self.holdings {
            let delta_cell =
                ui::change_cell(holding.delta, holding.delta.round_dp(2).to_string());
            let pct_cell = match holding.delta_pct {
                Some(pct) => ui::change_cell(pct, format!("{}%", pct.round_dp(2))),
                None => ui::format_optional_cell(None::<Decimal>, |_| String::new()),
            };

            table.add_row(vec![
                Cell::new(&holding.symbol),
                Cell::new(holding.amount.to_string()),
                Cell::new(holding.value_now.round_dp(2).to_string()),
                Cell::new(holding.value_24h.round_dp(2).to_string()),
                delta_cell,
                pct_cell,
            ]);
        }

        let mut output = format!(
            "Portfolio: {}\n\n",
            ui::style_text(&self.name, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\nTotal ({}): {} | 24h ago: {} | Change: {}",
            ui::style_text(&self.fiat, ui::StyleType::TotalLabel),
            ui::style_text(
                &self.total_now.round_dp(2).to_string(),
                ui::StyleType::TotalValue
            ),
            self.total_24h.round_dp(2),
            self.total_delta.round_dp(2)
        ));

        if !self.skipped.is_empty() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Skipped (no 24h rate): {}", self.skipped.join(", ")),
                    ui::StyleType::Subtle
                )
            ));
        }

        output
    }
}

async fn fetch_tickers(source: &dyn TickerSource) -> Result<Vec<Ticker>> {
    let spinner = ui::new_spinner("Fetching tickers...");
    let result = source.fetch_tickers().await;
    spinner.finish_and_clear();
    result
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

/// `value` command: one ticker snapshot, one graph, a valuation per portfolio.
pub async fn run_value(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = BudaProvider::new(config.buda_base_url());

    let tickers = fetch_tickers(&provider).await?;
    let graph = pricing::build_graph(&tickers);

    for portfolio in &config.portfolios {
        let valuation = value_portfolio(portfolio, &graph, &config.fiat);
        println!("{}", valuation.display_as_table());
        ui::print_separator();
    }

    Ok(())
}

/// `change` command: one snapshot feeds both the current and the 24h graph,
/// so both valuations are consistent with each other.
pub async fn run_change(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = BudaProvider::new(config.buda_base_url());

    let tickers = fetch_tickers(&provider).await?;
    let graph_now = pricing::build_graph(&tickers);
    let graph_24h = pricing::build_graph_24h(&tickers);

    for portfolio in &config.portfolios {
        let change = value_portfolio_24h(portfolio, &graph_now, &graph_24h, &config.fiat);
        println!("{}", change.display_as_table());
        ui::print_separator();
    }

    Ok(())
}

/// `tickers` command: dumps the upstream snapshot so rates can be checked by
/// hand against what the valuation reports.
pub async fn run_tickers(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = BudaProvider::new(config.buda_base_url());

    let tickers = fetch_tickers(&provider).await?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Market"),
        ui::header_cell("Base"),
        ui::header_cell("Quote"),
        ui::header_cell("Last Price"),
        ui::header_cell("24h Change (%)"),
    ]);

    for ticker in &tickers {
        let pct = ticker.price_variation_24h * Decimal::from(100);
        table.add_row(vec![
            Cell::new(&ticker.market_id),
            Cell::new(&ticker.base),
            Cell::new(&ticker.quote),
            Cell::new(ticker.last_price.to_string()),
            ui::change_cell(pct, format!("{}%", pct.round_dp(2))),
        ]);
    }

    println!("{table}");
    println!("{} markets", tickers.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Holding;
    use crate::ticker::Ticker;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ticker(base: &str, quote: &str, last_price: &str, variation_24h: &str) -> Ticker {
        Ticker {
            market_id: format!("{base}-{quote}"),
            base: base.to_string(),
            quote: quote.to_string(),
            last_price: dec(last_price),
            price_variation_24h: dec(variation_24h),
        }
    }

    fn portfolio(holdings: &[(&str, &str)]) -> Portfolio {
        Portfolio {
            name: "Test".to_string(),
            holdings: holdings
                .iter()
                .map(|(symbol, amount)| Holding {
                    symbol: symbol.to_string(),
                    amount: dec(amount),
                })
                .collect(),
        }
    }

    #[test]
    fn test_value_portfolio_sums_priced_holdings() {
        let tickers = [
            ticker("BTC", "USD", "50000", "0"),
            ticker("USD", "CLP", "900", "0"),
        ];
        let graph = pricing::build_graph(&tickers);
        let p = portfolio(&[("btc", "2"), ("usd", "100")]);

        let valuation = value_portfolio(&p, &graph, "clp");

        // 2 BTC via the USD hop plus 100 USD directly.
        assert_eq!(valuation.total, dec("90000000") + dec("90000"));
        assert_eq!(valuation.holdings.len(), 2);
        assert_eq!(valuation.holdings[0].symbol, "BTC");
        assert_eq!(valuation.holdings[0].rate, Some(dec("45000000")));
        assert_eq!(valuation.holdings[1].value, Some(dec("90000")));
        assert!(valuation.unpriced.is_empty());
    }

    #[test]
    fn test_value_portfolio_reports_unpriced_holdings() {
        let tickers = [ticker("BTC", "USD", "50000", "0")];
        let graph = pricing::build_graph(&tickers);
        let p = portfolio(&[("BTC", "1"), ("DOGE", "1000")]);

        let valuation = value_portfolio(&p, &graph, "USD");

        assert_eq!(valuation.total, dec("50000"));
        assert_eq!(valuation.unpriced, vec!["DOGE".to_string()]);
        assert_eq!(valuation.holdings[1].rate, None);
        assert_eq!(valuation.holdings[1].value, None);
    }

    #[test]
    fn test_value_portfolio_fiat_holding_is_identity() {
        let graph = pricing::build_graph(&[]);
        let p = portfolio(&[("CLP", "1500")]);

        let valuation = value_portfolio(&p, &graph, "CLP");

        assert_eq!(valuation.total, dec("1500"));
        assert_eq!(valuation.holdings[0].rate, Some(Decimal::ONE));
    }

    #[test]
    fn test_value_portfolio_24h_computes_delta() {
        // Current 110, 24h ago exactly 100.
        let tickers = [ticker("BTC", "USD", "110", "0.10")];
        let graph_now = pricing::build_graph(&tickers);
        let graph_24h = pricing::build_graph_24h(&tickers);
        let p = portfolio(&[("BTC", "3")]);

        let change = value_portfolio_24h(&p, &graph_now, &graph_24h, "USD");

        assert_eq!(change.total_now, dec("330"));
        assert_eq!(change.total_24h, dec("300"));
        assert_eq!(change.total_delta, dec("30"));
        assert_eq!(change.holdings[0].delta, dec("30"));
        assert_eq!(change.holdings[0].delta_pct, Some(dec("10")));
        assert!(change.skipped.is_empty());
    }

    #[test]
    fn test_value_portfolio_24h_skips_holdings_without_both_rates() {
        // BTC prices in both graphs; ETH has a degenerate 24h variation so it
        // is only present in the current graph.
        let tickers = [
            ticker("BTC", "USD", "110", "0.10"),
            ticker("ETH", "USD", "2000", "-1"),
        ];
        let graph_now = pricing::build_graph(&tickers);
        let graph_24h = pricing::build_graph_24h(&tickers);
        let p = portfolio(&[("BTC", "1"), ("ETH", "5")]);

        let change = value_portfolio_24h(&p, &graph_now, &graph_24h, "USD");

        assert_eq!(change.holdings.len(), 1);
        assert_eq!(change.skipped, vec!["ETH".to_string()]);
        assert_eq!(change.total_now, dec("110"));
        assert_eq!(change.total_24h, dec("100"));
    }

    #[test]
    fn test_zero_amount_holding_has_no_percent_change() {
        let tickers = [ticker("BTC", "USD", "110", "0.10")];
        let graph_now = pricing::build_graph(&tickers);
        let graph_24h = pricing::build_graph_24h(&tickers);
        let p = portfolio(&[("BTC", "0")]);

        let change = value_portfolio_24h(&p, &graph_now, &graph_24h, "USD");

        assert_eq!(change.holdings[0].delta, Decimal::ZERO);
        assert_eq!(change.holdings[0].delta_pct, None);
    }

    #[test]
    fn test_display_includes_unpriced_note() {
        let graph = pricing::build_graph(&[ticker("BTC", "USD", "50000", "0")]);
        let p = portfolio(&[("BTC", "1"), ("DOGE", "1")]);

        let valuation = value_portfolio(&p, &graph, "USD");
        let output = valuation.display_as_table();

        assert!(output.contains("BTC"));
        assert!(output.contains("N/A"));
        assert!(output.contains("DOGE"));
        assert!(output.contains("Unpriced"));
    }
}
