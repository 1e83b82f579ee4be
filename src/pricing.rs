//! Conversion graph construction and bounded-hop rate resolution.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::ticker::Ticker;

/// A directed conversion step: one unit of the owning currency is worth
/// `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub to: String,
    pub rate: Decimal,
}

/// Adjacency map from currency symbol to outgoing edges. Edges per node keep
/// ticker ingestion order, which makes resolution reproducible.
pub type Graph = HashMap<String, Vec<Edge>>;

/// Paths longer than two hops are rejected. Most pairs are either listed
/// directly or bridgeable through one common quote currency, and longer
/// chains compound rounding and liquidity assumptions.
const MAX_HOPS: u32 = 2;

fn add_edge(graph: &mut Graph, from: String, to: String, rate: Decimal) {
    graph.entry(from).or_default().push(Edge { to, rate });
}

/// Adds the bidirectional edge pair for one ticker at the given price.
/// Caller guarantees `price > 0`, so the reciprocal is well defined.
fn add_pair(graph: &mut Graph, ticker: &Ticker, price: Decimal) {
    let base = ticker.base.to_uppercase();
    let quote = ticker.quote.to_uppercase();

    add_edge(graph, base.clone(), quote.clone(), price);
    add_edge(graph, quote, base, Decimal::ONE / price);
}

/// Builds the conversion graph at current prices.
///
/// Every ticker BASE-QUOTE with last price `p > 0` contributes two edges:
/// BASE→QUOTE at `p` and QUOTE→BASE at `1/p`. Tickers with a non-positive
/// price are skipped; duplicate pairs yield parallel edges.
pub fn build_graph(tickers: &[Ticker]) -> Graph {
    let mut graph = Graph::new();

    for ticker in tickers {
        if ticker.last_price <= Decimal::ZERO {
            continue;
        }
        add_pair(&mut graph, ticker, ticker.last_price);
    }

    graph
}

/// Price roughly 24 hours ago, reconstructed from
/// `last = prev * (1 + variation)`. `None` when the reported variation
/// implies a non-positive historical price.
fn price_24h_ago(last_price: Decimal, variation_24h: Decimal) -> Option<Decimal> {
    let denom = Decimal::ONE + variation_24h;
    if denom <= Decimal::ZERO {
        return None;
    }
    Some(last_price / denom)
}

/// Builds the conversion graph at prices as of ~24 hours ago. Tickers whose
/// reconstructed previous price is undefined or non-positive are skipped.
pub fn build_graph_24h(tickers: &[Ticker]) -> Graph {
    let mut graph = Graph::new();

    for ticker in tickers {
        let Some(prev) = price_24h_ago(ticker.last_price, ticker.price_variation_24h) else {
            continue;
        };
        if prev <= Decimal::ZERO {
            continue;
        }
        add_pair(&mut graph, ticker, prev);
    }

    graph
}

/// Multiplicative rate converting `from` into `to`.
///
/// Symbols are matched case-insensitively. Self-conversion is always `1`,
/// even for symbols absent from the graph. Otherwise a FIFO breadth-first
/// search follows edges in insertion order up to two hops, accumulating
/// the product of edge rates, and the first path reaching `to` wins; this is
/// first-found resolution, not best-priced. Returns `None` when no path
/// within the bound exists.
pub fn find_rate(graph: &Graph, from: &str, to: &str) -> Option<Decimal> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    if from == to {
        return Some(Decimal::ONE);
    }

    // The same currency may legitimately show up again at a different depth
    // through a different ticker, so visitation is keyed by (node, depth).
    let mut visited: HashSet<(String, u32)> = HashSet::from([(from.clone(), 0)]);
    let mut queue: VecDeque<(String, Decimal, u32)> = VecDeque::from([(from, Decimal::ONE, 0)]);

    while let Some((node, rate, depth)) = queue.pop_front() {
        if depth >= MAX_HOPS {
            continue;
        }

        let Some(edges) = graph.get(&node) else {
            continue;
        };
        for edge in edges {
            let next_rate = rate * edge.rate;
            let next_depth = depth + 1;

            if edge.to == to {
                return Some(next_rate);
            }

            if visited.insert((edge.to.clone(), next_depth)) {
                queue.push_back((edge.to.clone(), next_rate, next_depth));
            }
        }
    }

    None
}
