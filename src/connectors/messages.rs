// src/connectors/messages.rs
use crate::types::{Side, TradeIntent};
use serde::{Deserialize, Serialize};

/// Body of `GET /ai-commentary`.
#[derive(Debug, Deserialize)]
pub struct CommentaryResponse {
    pub message: String,
}

/// Body of `POST /text-to-speech`.
#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub language: &'a str,
}

/// Body of `POST /trade`. The gateway lower-cases `type` itself, so the
/// side is sent as the literal `"BUY"` / `"SELL"`.
#[derive(Debug, Serialize)]
pub struct TradeRequest<'a> {
    pub symbol: &'a str,
    pub volume: f64,
    #[serde(rename = "type")]
    pub side: Side,
}

impl<'a> From<&'a TradeIntent> for TradeRequest<'a> {
    fn from(intent: &'a TradeIntent) -> Self {
        Self {
            symbol: &intent.symbol,
            volume: intent.volume,
            side: intent.side,
        }
    }
}
