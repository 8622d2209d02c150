// src/core/engine.rs
use crate::core::dispatcher::TradeDispatcher;
use crate::core::feed::MarketFeed;
use crate::core::task::stopped;
use crate::strategies::traits::DecisionRule;
use crate::types::{Controls, TradeIntent, TradeOrigin};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Periodically turns the latest market state into an automatic order.
///
/// The timer always runs; the auto-trade toggle is checked on each tick.
pub struct DecisionEngine<R> {
    rule: R,
    feed: Arc<MarketFeed>,
    controls: watch::Receiver<Controls>,
    dispatcher: Arc<TradeDispatcher>,
    period: Duration,
}

impl<R> DecisionEngine<R>
where
    R: DecisionRule + 'static,
{
    pub fn new(
        rule: R,
        feed: Arc<MarketFeed>,
        controls: watch::Receiver<Controls>,
        dispatcher: Arc<TradeDispatcher>,
        period: Duration,
    ) -> Self {
        Self {
            rule,
            feed,
            controls,
            dispatcher,
            period,
        }
    }

    /// What the engine would send right now, if anything.
    pub fn evaluate(&self) -> Option<TradeIntent> {
        if !self.controls.borrow().auto_trade_enabled {
            return None;
        }
        let (market, indicators) = self.feed.latest_pair()?;
        let side = self.rule.decide(&market, &indicators)?;
        info!(
            "Auto trading triggered: {} at price {} ({}: SMA_20 {:?}, bar t={}, indicators t={})",
            side,
            market.close,
            self.rule.name(),
            indicators.sma_20,
            market.time,
            indicators.time
        );
        Some(self.dispatcher.intent(side))
    }

    /// First evaluation happens one period after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Decision engine running ({}) every {:?}",
            self.rule.name(),
            self.period
        );

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inflight = JoinSet::new();

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {
                    match self.evaluate() {
                        Some(intent) => {
                            let dispatcher = self.dispatcher.clone();
                            inflight.spawn(async move {
                                // Failures are logged by the dispatcher; the next tick re-evaluates.
                                let _ = dispatcher.dispatch(intent, TradeOrigin::Automatic).await;
                            });
                        }
                        None if self.feed.market.is_empty() || self.feed.indicators.is_empty() => {
                            debug!(
                                "Decision tick: waiting for data ({} bars, {} indicator rows)",
                                self.feed.market.len(),
                                self.feed.indicators.len()
                            );
                        }
                        None => debug!("Decision tick: nothing to do"),
                    }
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Auto trade task panicked: {}", e);
                        }
                    }
                }
            }
        }

        inflight.abort_all();
        info!("Decision engine stopped");
    }
}
