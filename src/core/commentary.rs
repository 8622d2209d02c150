// src/core/commentary.rs
use crate::audio::{AudioPlayer, AudioSlot};
use crate::connectors::traits::CommentarySource;
use crate::core::send_ui_event;
use crate::core::task::stopped;
use crate::types::{Controls, UiEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// How a single fetch-and-play cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The pipeline was switched off before or during the cycle.
    Cancelled,
    TextFailed,
    /// Text was shown but no audio could be synthesized.
    TextOnly,
    PlaybackFailed,
    Playing,
}

/// Fetches commentary, synthesizes it and keeps exactly one clip playing.
///
/// The pipeline itself is cheap to clone; the orchestrator spawns one `run`
/// per enable and closes the shared [`AudioSlot`] on disable.
#[derive(Clone)]
pub struct CommentaryPipeline {
    source: Arc<dyn CommentarySource>,
    player: Arc<dyn AudioPlayer>,
    slot: Arc<AudioSlot>,
    controls: watch::Receiver<Controls>,
    ui_sender: mpsc::Sender<UiEvent>,
    period: Duration,
    running: Arc<AtomicUsize>,
}

struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CommentaryPipeline {
    pub fn new(
        source: Arc<dyn CommentarySource>,
        player: Arc<dyn AudioPlayer>,
        controls: watch::Receiver<Controls>,
        ui_sender: mpsc::Sender<UiEvent>,
        period: Duration,
    ) -> Self {
        Self {
            source,
            player,
            slot: Arc::new(AudioSlot::new()),
            controls,
            ui_sender,
            period,
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn slot(&self) -> &Arc<AudioSlot> {
        &self.slot
    }

    /// Number of `run` loops currently alive.
    #[cfg(test)]
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs cycles immediately and then every `period` for `generation`.
    pub async fn run(self, generation: u64, mut shutdown: watch::Receiver<bool>) {
        self.running.fetch_add(1, Ordering::SeqCst);
        let _guard = RunningGuard(self.running.clone());
        info!("Commentary audio started (run #{})", generation);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inflight = JoinSet::new();

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {
                    if !self.slot.is_current(generation) {
                        break;
                    }
                    let cycle = self.clone();
                    inflight.spawn(async move { cycle.run_cycle(generation).await });
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    match joined {
                        Ok(outcome) => debug!("Commentary cycle finished: {:?}", outcome),
                        Err(e) if e.is_panic() => error!("Commentary cycle panicked: {}", e),
                        Err(_) => {}
                    }
                }
            }
        }

        inflight.abort_all();
        info!("Commentary audio stopped (run #{})", generation);
    }

    /// One `Fetching -> Playing` pass. The held clip is stopped before the
    /// text request goes out.
    pub async fn run_cycle(&self, generation: u64) -> CycleOutcome {
        if !self.slot.release(generation) {
            return CycleOutcome::Cancelled;
        }

        let language = self.controls.borrow().language;
        let text = match self.source.fetch_commentary(language).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Error in continuous commentary: {}", e);
                return CycleOutcome::TextFailed;
            }
        };

        if !self.slot.is_current(generation) {
            debug!("Discarding commentary for cancelled run #{}", generation);
            return CycleOutcome::Cancelled;
        }
        send_ui_event(&self.ui_sender, UiEvent::Commentary(text.clone()));

        let clip = match self.source.synthesize(&text, language).await {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Text-to-speech failed: {}", e);
                return CycleOutcome::TextOnly;
            }
        };

        match self.slot.start(generation, self.player.as_ref(), clip) {
            Ok(true) => {
                debug!("Playing commentary ({})", language);
                CycleOutcome::Playing
            }
            Ok(false) => {
                debug!("Discarding audio for cancelled run #{}", generation);
                CycleOutcome::Cancelled
            }
            Err(e) => {
                error!("Audio play error: {}", e);
                CycleOutcome::PlaybackFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{drain, FakeBackend, FakePlayer};
    use crate::types::Language;

    struct Fixture {
        backend: Arc<FakeBackend>,
        player: FakePlayer,
        controls: watch::Sender<Controls>,
        ui_rx: mpsc::Receiver<UiEvent>,
        pipeline: CommentaryPipeline,
    }

    fn fixture_with(player: FakePlayer) -> Fixture {
        let backend = Arc::new(FakeBackend::default());
        let (controls, controls_rx) = watch::channel(Controls::default());
        let (ui_tx, ui_rx) = mpsc::channel(100);
        let pipeline = CommentaryPipeline::new(
            backend.clone(),
            Arc::new(player.clone()),
            controls_rx,
            ui_tx,
            Duration::from_secs(5),
        );
        Fixture {
            backend,
            player,
            controls,
            ui_rx,
            pipeline,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakePlayer::default())
    }

    fn commentary(events: &[UiEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Commentary(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn cycle_shows_text_and_plays_audio() {
        let mut f = fixture();
        let generation = f.pipeline.slot().open();

        let outcome = f.pipeline.run_cycle(generation).await;

        assert_eq!(outcome, CycleOutcome::Playing);
        assert_eq!(f.player.live(), 1);
        assert_eq!(commentary(&drain(&mut f.ui_rx)), vec!["Gold is consolidating."]);
    }

    #[tokio::test]
    async fn text_failure_skips_audio() {
        let mut f = fixture();
        f.backend.set_commentary(None);
        let generation = f.pipeline.slot().open();

        let outcome = f.pipeline.run_cycle(generation).await;

        assert_eq!(outcome, CycleOutcome::TextFailed);
        assert_eq!(f.backend.speech_calls(), 0);
        assert_eq!(f.player.started(), 0);
        assert!(drain(&mut f.ui_rx).is_empty());
    }

    #[tokio::test]
    async fn speech_failure_still_shows_text() {
        let mut f = fixture();
        f.backend.set_speech_ok(false);
        let generation = f.pipeline.slot().open();

        let outcome = f.pipeline.run_cycle(generation).await;

        assert_eq!(outcome, CycleOutcome::TextOnly);
        assert_eq!(f.player.started(), 0);
        assert_eq!(commentary(&drain(&mut f.ui_rx)).len(), 1);
    }

    #[tokio::test]
    async fn playback_failure_leaves_nothing_live() {
        let f = fixture_with(FakePlayer::failing());
        let generation = f.pipeline.slot().open();

        let outcome = f.pipeline.run_cycle(generation).await;

        assert_eq!(outcome, CycleOutcome::PlaybackFailed);
        assert!(!f.pipeline.slot().is_live());
    }

    #[tokio::test]
    async fn previous_clip_stops_before_next_fetch() {
        let f = fixture();
        let generation = f.pipeline.slot().open();
        f.pipeline.run_cycle(generation).await;
        assert_eq!(f.player.live(), 1);

        f.backend.set_commentary(None);
        f.pipeline.run_cycle(generation).await;

        assert_eq!(f.player.live(), 0);
        assert_eq!(f.player.stopped(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn result_arriving_after_close_is_dropped() {
        let f = fixture();
        f.backend.set_latency(Duration::from_secs(3));
        let generation = f.pipeline.slot().open();

        let pipeline = f.pipeline.clone();
        let cycle = tokio::spawn(async move { pipeline.run_cycle(generation).await });

        tokio::time::sleep(Duration::from_secs(4)).await;
        f.pipeline.slot().close();

        assert_eq!(cycle.await.unwrap(), CycleOutcome::Cancelled);
        assert_eq!(f.player.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycles_never_play_twice() {
        let f = fixture();
        f.backend.set_latency(Duration::from_secs(7));
        let generation = f.pipeline.slot().open();

        let (_tx, shutdown) = watch::channel(false);
        let run = tokio::spawn(f.pipeline.clone().run(generation, shutdown));

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(f.player.started() > 2);
        assert_eq!(f.player.max_live(), 1);
        assert!(f.player.live() <= 1);
        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn next_tick_uses_new_language() {
        let f = fixture();
        let generation = f.pipeline.slot().open();
        let (_tx, shutdown) = watch::channel(false);
        let run = tokio::spawn(f.pipeline.clone().run(generation, shutdown));

        tokio::time::sleep(Duration::from_secs(1)).await;
        f.controls.send_modify(|c| c.language = Language::Ur);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(f.backend.languages(), vec![Language::En, Language::Ur]);
        run.abort();
    }
}
