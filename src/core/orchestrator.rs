// src/core/orchestrator.rs
use crate::audio::AudioPlayer;
use crate::config::AppConfig;
use crate::connectors::traits::{CommentarySource, ExecutionHandler, MarketDataSource};
use crate::core::commentary::CommentaryPipeline;
use crate::core::dispatcher::TradeDispatcher;
use crate::core::engine::DecisionEngine;
use crate::core::feed::MarketFeed;
use crate::core::poller::DataPoller;
use crate::core::send_ui_event;
use crate::core::task::TaskHandle;
use crate::error::ServiceError;
use crate::strategies::traits::DecisionRule;
use crate::types::{ControlCommand, Controls, Side, TradeOrigin, UiEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// The external collaborators the loops talk to.
pub struct Services {
    pub market: Arc<dyn MarketDataSource>,
    pub commentary: Arc<dyn CommentarySource>,
    pub execution: Arc<dyn ExecutionHandler>,
    pub player: Arc<dyn AudioPlayer>,
}

/// Owns the control state and every background loop.
///
/// All toggle changes go through [`Orchestrator::apply`], which starts or
/// stops the loops they gate. Dropping the orchestrator tears everything down.
pub struct Orchestrator {
    config: AppConfig,
    market_source: Arc<dyn MarketDataSource>,
    controls_tx: watch::Sender<Controls>,
    feed: Arc<MarketFeed>,
    dispatcher: Arc<TradeDispatcher>,
    commentary: CommentaryPipeline,
    ui_sender: mpsc::Sender<UiEvent>,
    poller_task: Option<TaskHandle>,
    engine_task: Option<TaskHandle>,
    audio_task: Option<TaskHandle>,
}

impl Orchestrator {
    pub fn new(config: AppConfig, services: Services, ui_sender: mpsc::Sender<UiEvent>) -> Self {
        let (controls_tx, controls_rx) = watch::channel(Controls {
            language: config.default_language,
            ..Controls::default()
        });

        let dispatcher = Arc::new(TradeDispatcher::new(
            services.execution,
            ui_sender.clone(),
            config.symbol.clone(),
            config.trade_volume,
        ));
        let commentary = CommentaryPipeline::new(
            services.commentary,
            services.player,
            controls_rx,
            ui_sender.clone(),
            config.timing.commentary_interval(),
        );

        Self {
            config,
            market_source: services.market,
            controls_tx,
            feed: Arc::new(MarketFeed::new()),
            dispatcher,
            commentary,
            ui_sender,
            poller_task: None,
            engine_task: None,
            audio_task: None,
        }
    }

    /// Starts the always-on loops: the data poller and the decision engine.
    pub fn start<R>(&mut self, rule: R)
    where
        R: DecisionRule + 'static,
    {
        if self.poller_task.is_none() {
            let poller = DataPoller::new(
                self.market_source.clone(),
                self.feed.clone(),
                self.config.symbol.clone(),
                self.config.timing.poll_interval(),
                self.ui_sender.clone(),
            );
            self.poller_task = Some(TaskHandle::spawn("data-poller", move |shutdown| {
                poller.run(shutdown)
            }));
        }

        if self.engine_task.is_none() {
            let engine = DecisionEngine::new(
                rule,
                self.feed.clone(),
                self.controls_tx.subscribe(),
                self.dispatcher.clone(),
                self.config.timing.decision_interval(),
            );
            self.engine_task = Some(TaskHandle::spawn("decision-engine", move |shutdown| {
                engine.run(shutdown)
            }));
        }

        if self.controls().audio_continuous_enabled {
            self.start_audio();
        }
        info!("Orchestrator started for {}", self.config.symbol);
    }

    /// Applies one user action and starts or stops whatever it gates.
    pub fn apply(&mut self, command: ControlCommand) {
        let before = self.controls();
        self.controls_tx.send_modify(|controls| match command {
            ControlCommand::SetAutoTrade(enabled) => controls.auto_trade_enabled = enabled,
            ControlCommand::SetAudioContinuous(enabled) => {
                controls.audio_continuous_enabled = enabled
            }
            ControlCommand::SetLanguage(language) => controls.language = language,
        });
        let after = self.controls();

        match (before.audio_continuous_enabled, after.audio_continuous_enabled) {
            (false, true) => self.start_audio(),
            (true, false) => self.stop_audio(),
            _ => {}
        }

        if before != after {
            info!("Controls changed: {:?}", after);
            send_ui_event(&self.ui_sender, UiEvent::ControlsChanged(after));
            send_ui_event(&self.ui_sender, UiEvent::Log(describe(command)));
        }
    }

    fn start_audio(&mut self) {
        if self.audio_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let generation = self.commentary.slot().open();
        let pipeline = self.commentary.clone();
        self.audio_task = Some(TaskHandle::spawn("commentary", move |shutdown| {
            pipeline.run(generation, shutdown)
        }));
    }

    /// Silences the live clip before returning, then cancels the timer.
    fn stop_audio(&mut self) {
        self.commentary.slot().close();
        if let Some(task) = self.audio_task.take() {
            task.cancel();
        }
    }

    /// Manual BUY/SELL. Runs in the background so the caller never waits on
    /// the gateway; failures surface as a console alert.
    pub fn manual_trade(&self, side: Side) -> JoinHandle<Result<serde_json::Value, ServiceError>> {
        let dispatcher = self.dispatcher.clone();
        let intent = dispatcher.intent(side);
        info!("Manual {} requested", side);
        tokio::spawn(async move { dispatcher.dispatch(intent, TradeOrigin::Manual).await })
    }

    pub fn controls(&self) -> Controls {
        *self.controls_tx.borrow()
    }

    #[cfg(test)]
    pub fn feed(&self) -> &Arc<MarketFeed> {
        &self.feed
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn audio_is_live(&self) -> bool {
        self.commentary.slot().is_live()
    }

    /// Commentary loops currently alive. Never more than one.
    #[cfg(test)]
    pub fn audio_loops(&self) -> usize {
        self.commentary.running()
    }

    pub fn shutdown(&mut self) {
        self.stop_audio();
        for task in [self.engine_task.take(), self.poller_task.take()]
            .into_iter()
            .flatten()
        {
            info!("Stopping {}", task.name());
            task.cancel();
        }
    }
}

fn describe(command: ControlCommand) -> String {
    let state = |enabled: bool| if enabled { "enabled" } else { "disabled" };
    match command {
        ControlCommand::SetAutoTrade(enabled) => format!("Auto trade {}", state(enabled)),
        ControlCommand::SetAudioContinuous(enabled) => {
            format!("Commentary audio {}", state(enabled))
        }
        ControlCommand::SetLanguage(language) => format!("Language set to {}", language.label()),
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
