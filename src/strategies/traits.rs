// src/strategies/traits.rs
use crate::types::{IndicatorSnapshot, MarketSnapshot, Side};

/// Maps the newest bar and indicator row to a side, or `None` to stay out.
///
/// Rules must be deterministic: the decision engine may evaluate the same
/// pair on consecutive ticks and expects the same answer.
pub trait DecisionRule: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, market: &MarketSnapshot, indicators: &IndicatorSnapshot) -> Option<Side>;
}
