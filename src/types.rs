// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One OHLC reading as served by `/market-data`. Only `close` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub time: i64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl MarketSnapshot {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

/// Indicator values computed by the backend for a single bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub time: i64,
    /// `null` until the backend has enough bars for the window.
    #[serde(rename = "SMA_20")]
    pub sma_20: Option<f64>,
    #[serde(rename = "RSI_14")]
    pub rsi_14: Option<f64>,
    #[serde(rename = "MACD")]
    pub macd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub symbol: String,
    pub volume: f64,
    pub side: Side,
}

/// Who asked for the trade. Decides how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOrigin {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ur,
    Hi,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ur => "ur",
            Language::Hi => "hi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ur => "اردو",
            Language::Hi => "हिंदी",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Language::En => Language::Ur,
            Language::Ur => Language::Hi,
            Language::Hi => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// User-controlled switches read by the loops on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub auto_trade_enabled: bool,
    pub audio_continuous_enabled: bool,
    pub language: Language,
}

/// Explicit user actions applied through `Orchestrator::apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetAutoTrade(bool),
    SetAudioContinuous(bool),
    SetLanguage(Language),
}

/// Raw synthesized speech returned by the backend.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

// --- Console events ---

#[derive(Debug, Clone)]
pub enum UiEvent {
    MarketUpdate(Arc<Vec<MarketSnapshot>>),
    IndicatorUpdate(Arc<Vec<IndicatorSnapshot>>),
    Commentary(String),
    ControlsChanged(Controls),
    TradeExecuted {
        side: Side,
        origin: TradeOrigin,
        result: serde_json::Value,
    },
    /// Must be acknowledged by the user before the console accepts other input.
    Alert(String),
    Log(String),
}
