//! Attaching live prices to stocks.

use futures::stream::{self, StreamExt};
use tracing::warn;

use super::position::Position;
use super::price::Price;
use super::stock::{Stock, StockView};
use crate::ports::quote_port::QuotePort;

/// Price for one symbol. Lookup failures are logged and become
/// [`Price::Unavailable`].
pub async fn current_price(quotes: &dyn QuotePort, symbol: &str) -> Price {
    match quotes.fetch_price(symbol).await {
        Ok(price) => Price::Available(price),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "quote unavailable");
            Price::Unavailable
        }
    }
}

/// Prices for many symbols with at most `workers` lookups in flight.
/// The result is in the order of `symbols`, not completion order.
pub async fn current_prices(quotes: &dyn QuotePort, symbols: &[String], workers: usize) -> Vec<Price> {
    stream::iter(symbols.iter().cloned())
        .map(|symbol| async move { current_price(quotes, &symbol).await })
        .buffered(workers.max(1))
        .collect()
        .await
}

pub async fn price_stock(quotes: &dyn QuotePort, stock: Stock, positions: Vec<Position>) -> StockView {
    let price = current_price(quotes, &stock.symbol).await;
    StockView::detailed(stock, price, positions)
}

pub async fn price_stocks(
    quotes: &dyn QuotePort,
    stocks: Vec<(Stock, Vec<Position>)>,
    workers: usize,
) -> Vec<StockView> {
    let symbols: Vec<String> = stocks.iter().map(|(s, _)| s.symbol.clone()).collect();
    let prices = current_prices(quotes, &symbols, workers).await;
    stocks
        .into_iter()
        .zip(prices)
        .map(|((stock, positions), price)| StockView::detailed(stock, price, positions))
        .collect()
}
