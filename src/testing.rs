// src/testing.rs
//! In-process stand-ins for the backend and the audio device.

use crate::audio::{AudioPlayer, Playback};
use crate::connectors::traits::{CommentarySource, ExecutionHandler, MarketDataSource};
use crate::error::{PlaybackError, ServiceError};
use crate::types::{
    AudioClip, IndicatorSnapshot, Language, MarketSnapshot, TradeIntent, UiEvent,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn bar(time: i64, close: f64) -> MarketSnapshot {
    MarketSnapshot {
        time,
        close,
        open: None,
        high: None,
        low: None,
        volume: None,
    }
}

pub fn indicator(time: i64, sma_20: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        time,
        sma_20: Some(sma_20),
        rsi_14: Some(40.0),
        macd: Some(0.1),
    }
}

fn unavailable(endpoint: &'static str) -> ServiceError {
    ServiceError::Status {
        endpoint,
        status: StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub struct FakeBackend {
    market: Mutex<Option<Vec<MarketSnapshot>>>,
    indicators: Mutex<Option<Vec<IndicatorSnapshot>>>,
    commentary: Mutex<Option<String>>,
    speech_ok: AtomicBool,
    trade_ok: AtomicBool,
    latency: Mutex<Duration>,
    market_calls: AtomicUsize,
    indicator_calls: AtomicUsize,
    commentary_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    languages: Mutex<Vec<Language>>,
    trades: Mutex<Vec<TradeIntent>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            market: Mutex::new(Some(Vec::new())),
            indicators: Mutex::new(Some(Vec::new())),
            commentary: Mutex::new(Some("Gold is consolidating.".into())),
            speech_ok: AtomicBool::new(true),
            trade_ok: AtomicBool::new(true),
            latency: Mutex::new(Duration::ZERO),
            market_calls: AtomicUsize::new(0),
            indicator_calls: AtomicUsize::new(0),
            commentary_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
            languages: Mutex::new(Vec::new()),
            trades: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn with_series(market: Vec<MarketSnapshot>, indicators: Vec<IndicatorSnapshot>) -> Self {
        let backend = Self::default();
        backend.set_market(Some(market));
        backend.set_indicators(Some(indicators));
        backend
    }

    /// `None` makes the endpoint fail.
    pub fn set_market(&self, market: Option<Vec<MarketSnapshot>>) {
        *self.market.lock().unwrap() = market;
    }

    pub fn set_indicators(&self, indicators: Option<Vec<IndicatorSnapshot>>) {
        *self.indicators.lock().unwrap() = indicators;
    }

    pub fn set_commentary(&self, text: Option<&str>) {
        *self.commentary.lock().unwrap() = text.map(str::to_string);
    }

    pub fn set_speech_ok(&self, ok: bool) {
        self.speech_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_trade_ok(&self, ok: bool) {
        self.trade_ok.store(ok, Ordering::SeqCst);
    }

    /// Delay applied to every call, so tests can hold requests in flight.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn market_calls(&self) -> usize {
        self.market_calls.load(Ordering::SeqCst)
    }

    pub fn indicator_calls(&self) -> usize {
        self.indicator_calls.load(Ordering::SeqCst)
    }

    pub fn commentary_calls(&self) -> usize {
        self.commentary_calls.load(Ordering::SeqCst)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }

    pub fn languages(&self) -> Vec<Language> {
        self.languages.lock().unwrap().clone()
    }

    pub fn trades(&self) -> Vec<TradeIntent> {
        self.trades.lock().unwrap().clone()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MarketDataSource for FakeBackend {
    async fn fetch_market_data(&self, _symbol: &str) -> Result<Vec<MarketSnapshot>, ServiceError> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.market.lock().unwrap().clone().ok_or_else(|| unavailable("/market-data"))
    }

    async fn fetch_indicators(&self, _symbol: &str) -> Result<Vec<IndicatorSnapshot>, ServiceError> {
        self.indicator_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.indicators
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("/indicators"))
    }
}

#[async_trait]
impl CommentarySource for FakeBackend {
    async fn fetch_commentary(&self, language: Language) -> Result<String, ServiceError> {
        self.commentary_calls.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(language);
        self.delay().await;
        self.commentary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("/ai-commentary"))
    }

    async fn synthesize(&self, text: &str, _language: Language) -> Result<AudioClip, ServiceError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.speech_ok.load(Ordering::SeqCst) {
            Ok(AudioClip {
                bytes: text.as_bytes().to_vec(),
                content_type: Some("audio/mpeg".into()),
            })
        } else {
            Err(unavailable("/text-to-speech"))
        }
    }
}

#[async_trait]
impl ExecutionHandler for FakeBackend {
    async fn place_order(&self, intent: &TradeIntent) -> Result<serde_json::Value, ServiceError> {
        self.trades.lock().unwrap().push(intent.clone());
        if self.trade_ok.load(Ordering::SeqCst) {
            Ok(serde_json::json!({ "status": "ok", "type": intent.side.to_string().to_lowercase() }))
        } else {
            Err(unavailable("/trade"))
        }
    }
}

#[derive(Default)]
struct PlayerCounters {
    live: AtomicUsize,
    max_live: AtomicUsize,
    started: AtomicUsize,
    stopped: AtomicUsize,
    ended: AtomicUsize,
}

/// Records how many clips are audible at once.
#[derive(Default, Clone)]
pub struct FakePlayer {
    counters: Arc<PlayerCounters>,
    fail: bool,
}

impl FakePlayer {
    pub fn failing() -> Self {
        Self {
            counters: Arc::default(),
            fail: true,
        }
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.counters.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.counters.stopped.load(Ordering::SeqCst)
    }

    /// Lets every clip started so far play to its end.
    pub fn end_all(&self) {
        let started = self.counters.started.load(Ordering::SeqCst);
        self.counters.ended.store(started, Ordering::SeqCst);
    }
}

impl AudioPlayer for FakePlayer {
    fn play(&self, _clip: AudioClip) -> Result<Box<dyn Playback>, PlaybackError> {
        if self.fail {
            return Err(PlaybackError::EmptyClip);
        }
        let index = self.counters.started.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(FakePlayback {
            counters: self.counters.clone(),
            index,
            stopped: false,
        }))
    }
}

struct FakePlayback {
    counters: Arc<PlayerCounters>,
    index: usize,
    stopped: bool,
}

impl Playback for FakePlayback {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn finished(&mut self) -> bool {
        self.index < self.counters.ended.load(Ordering::SeqCst)
    }
}

impl Drop for FakePlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drains whatever the loops have sent to the console so far.
pub fn drain(rx: &mut mpsc::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
