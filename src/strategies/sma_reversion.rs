// src/strategies/sma_reversion.rs
use crate::strategies::traits::DecisionRule;
use crate::types::{IndicatorSnapshot, MarketSnapshot, Side};

/// Fades the price back toward its 20-period SMA: sell above, buy at or below.
/// No decision while the SMA is still `null`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmaReversion;

impl DecisionRule for SmaReversion {
    fn name(&self) -> &str {
        "sma-reversion"
    }

    fn decide(&self, market: &MarketSnapshot, indicators: &IndicatorSnapshot) -> Option<Side> {
        let sma_20 = indicators.sma_20?;
        if market.close > sma_20 {
            Some(Side::Sell)
        } else {
            Some(Side::Buy)
        }
    }
}
