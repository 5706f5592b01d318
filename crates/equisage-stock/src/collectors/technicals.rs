//! Technical indicators from daily price history

use crate::api::{Quote, YahooFinanceClient};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use equisage_core::{Indicator, SlotKey, Technicals, TechnicalsFetcher};
use ta::{
    Next,
    indicators::{MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage},
};
use tracing::info;

const RSI_PERIOD: usize = 14;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const SHORT_MA: usize = 50;
const LONG_MA: usize = 200;

/// Signal used when the history is too short for an indicator
pub const INSUFFICIENT_DATA: &str = "Insufficient data";

fn rsi_signal(value: f64) -> &'static str {
    if value > RSI_OVERBOUGHT {
        "Overbought"
    } else if value < RSI_OVERSOLD {
        "Oversold"
    } else {
        "Neutral"
    }
}

fn insufficient(name: String) -> Indicator {
    Indicator {
        name,
        value: None,
        signal: INSUFFICIENT_DATA.to_string(),
    }
}

/// Summarise a daily history, oldest bar first
///
/// Produces RSI(14), the MACD(12, 26, 9) crossover state and the position of
/// the last close against the 50 and 200 day simple moving averages.
pub fn compute_technicals(symbol: &str, quotes: &[Quote]) -> Result<Technicals> {
    let last = quotes.last().ok_or_else(|| StockError::DataUnavailable {
        symbol: symbol.to_string(),
        reason: "no price history".to_string(),
    })?;
    let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
    let mut indicators = Vec::with_capacity(4);

    let rsi_name = format!("RSI ({RSI_PERIOD})");
    if closes.len() > RSI_PERIOD {
        let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD)
            .map_err(|e| StockError::IndicatorError(e.to_string()))?;
        let value = closes.iter().fold(0.0, |_, &close| rsi.next(close));
        indicators.push(Indicator {
            name: rsi_name,
            value: Some(value),
            signal: rsi_signal(value).to_string(),
        });
    } else {
        indicators.push(insufficient(rsi_name));
    }

    if closes.len() >= MACD_SLOW + MACD_SIGNAL {
        let mut macd = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
            .map_err(|e| StockError::IndicatorError(e.to_string()))?;
        let mut latest = None;
        for &close in &closes {
            latest = Some(macd.next(close));
        }
        if let Some(output) = latest {
            let trend = if output.macd > output.signal {
                "Bullish Crossover"
            } else {
                "Bearish Crossover"
            };
            indicators.push(Indicator {
                name: "MACD".to_string(),
                value: Some(output.histogram),
                signal: trend.to_string(),
            });
        }
    } else {
        indicators.push(insufficient("MACD".to_string()));
    }

    for period in [SHORT_MA, LONG_MA] {
        let name = format!("Price vs {period}-Day MA");
        if closes.len() < period {
            indicators.push(insufficient(name));
            continue;
        }
        let mut sma = SimpleMovingAverage::new(period)
            .map_err(|e| StockError::IndicatorError(e.to_string()))?;
        let average = closes.iter().fold(0.0, |_, &close| sma.next(close));
        let position = if last.close > average { "Above" } else { "Below" };
        indicators.push(Indicator {
            name,
            value: Some(average),
            signal: position.to_string(),
        });
    }

    Ok(Technicals {
        last_close: last.close,
        as_of: last.timestamp.format("%Y-%m-%d").to_string(),
        indicators,
        chart_path: None,
    })
}

/// Technicals from one year of Yahoo Finance history
pub struct YahooTechnicals {
    client: YahooFinanceClient,
    range: String,
}

impl YahooTechnicals {
    /// Create a fetcher reading one year of history
    pub fn new(client: YahooFinanceClient) -> Self {
        Self {
            client,
            range: "1y".to_string(),
        }
    }
}

#[async_trait]
impl TechnicalsFetcher for YahooTechnicals {
    async fn fetch(&self, ticker: &str, company_name: &str) -> equisage_core::Result<Technicals> {
        info!(ticker, company = company_name, "Computing technicals");
        let quotes = self
            .client
            .get_historical_range(ticker, &self.range)
            .await
            .map_err(|e| e.into_collector(SlotKey::Technicals))?;
        compute_technicals(ticker, &quotes).map_err(|e| e.into_collector(SlotKey::Technicals))
    }
}
