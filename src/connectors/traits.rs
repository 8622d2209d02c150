use crate::error::ServiceError;
use crate::types::{AudioClip, IndicatorSnapshot, Language, MarketSnapshot, TradeIntent};
use async_trait::async_trait;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest bars for `symbol`, oldest first.
    async fn fetch_market_data(&self, symbol: &str) -> Result<Vec<MarketSnapshot>, ServiceError>;

    /// Latest indicator rows for `symbol`, oldest first.
    async fn fetch_indicators(&self, symbol: &str) -> Result<Vec<IndicatorSnapshot>, ServiceError>;
}

#[async_trait]
pub trait CommentarySource: Send + Sync {
    async fn fetch_commentary(&self, language: Language) -> Result<String, ServiceError>;

    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip, ServiceError>;
}

#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    /// Asks the gateway to place one order. The returned value is the gateway's
    /// own acknowledgement, passed through untouched.
    async fn place_order(&self, intent: &TradeIntent) -> Result<serde_json::Value, ServiceError>;
}
