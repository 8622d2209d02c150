// src/core/poller.rs
use crate::connectors::traits::MarketDataSource;
use crate::core::feed::MarketFeed;
use crate::core::send_ui_event;
use crate::core::task::stopped;
use crate::types::UiEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Keeps the market and indicator series fresh.
#[derive(Clone)]
pub struct DataPoller {
    source: Arc<dyn MarketDataSource>,
    feed: Arc<MarketFeed>,
    symbol: String,
    period: Duration,
    ui_sender: mpsc::Sender<UiEvent>,
}

impl DataPoller {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        feed: Arc<MarketFeed>,
        symbol: String,
        period: Duration,
        ui_sender: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            source,
            feed,
            symbol,
            period,
            ui_sender,
        }
    }

    /// Polls immediately and then every `period` until told to stop. A tick
    /// never waits for the requests of an earlier tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Data poller running for {} every {:?}", self.symbol, self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inflight = JoinSet::new();

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {
                    let poller = self.clone();
                    inflight.spawn(async move { poller.poll_market().await });
                    let poller = self.clone();
                    inflight.spawn(async move { poller.poll_indicators().await });
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Poll task panicked: {}", e);
                        }
                    }
                }
            }
        }

        inflight.abort_all();
        info!("Data poller stopped");
    }

    pub async fn poll_market(&self) {
        let ticket = self.feed.market.ticket();
        match self.source.fetch_market_data(&self.symbol).await {
            Ok(bars) => match self.feed.market.publish(ticket, bars) {
                Some(series) => {
                    debug!("Market data updated: {} bars", series.len());
                    send_ui_event(&self.ui_sender, UiEvent::MarketUpdate(series));
                }
                None => debug!("Discarded stale market data (request #{})", ticket),
            },
            Err(e) => warn!("Market data fetch error: {}", e),
        }
    }

    pub async fn poll_indicators(&self) {
        let ticket = self.feed.indicators.ticket();
        match self.source.fetch_indicators(&self.symbol).await {
            Ok(rows) => match self.feed.indicators.publish(ticket, rows) {
                Some(series) => {
                    debug!("Indicators updated: {} rows", series.len());
                    send_ui_event(&self.ui_sender, UiEvent::IndicatorUpdate(series));
                }
                None => debug!("Discarded stale indicators (request #{})", ticket),
            },
            Err(e) => warn!("Indicators fetch error: {}", e),
        }
    }
}
