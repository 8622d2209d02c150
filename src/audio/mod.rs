// src/audio/mod.rs
pub mod process;

use crate::error::PlaybackError;
use crate::types::AudioClip;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A clip that has started playing. `stop` must be synchronous: once it
/// returns, nothing is audible and the resource is released.
pub trait Playback: Send {
    fn stop(&mut self);

    /// `true` once the clip has ended by itself.
    fn finished(&mut self) -> bool {
        false
    }
}

pub trait AudioPlayer: Send + Sync {
    fn play(&self, clip: AudioClip) -> Result<Box<dyn Playback>, PlaybackError>;
}

struct SlotState {
    generation: u64,
    live: Option<Box<dyn Playback>>,
}

impl SlotState {
    fn stop_live(&mut self) -> bool {
        match self.live.take() {
            Some(mut playback) => {
                playback.stop();
                true
            }
            None => false,
        }
    }
}

/// Owner of the single live commentary clip.
///
/// Every pipeline run holds a generation number handed out by [`AudioSlot::open`].
/// [`AudioSlot::close`] bumps the generation, so results that arrive for an
/// older run are refused instead of starting playback.
pub struct AudioSlot {
    state: Mutex<SlotState>,
}

impl Default for AudioSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                generation: 0,
                live: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a new run and returns its generation.
    pub fn open(&self) -> u64 {
        let mut state = self.lock();
        state.stop_live();
        state.generation += 1;
        state.generation
    }

    /// Invalidates the current run and stops whatever is playing.
    pub fn close(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if state.stop_live() {
            debug!("Stopped live commentary audio");
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Stops the held clip ahead of a new fetch. Returns `false` when the
    /// run has been cancelled.
    pub fn release(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.stop_live();
        true
    }

    /// Makes `clip` the sole live resource. `Ok(false)` means the run was
    /// cancelled while the clip was being fetched and nothing was played.
    pub fn start(
        &self,
        generation: u64,
        player: &dyn AudioPlayer,
        clip: AudioClip,
    ) -> Result<bool, PlaybackError> {
        let mut state = self.lock();
        if state.generation != generation {
            return Ok(false);
        }
        state.stop_live();
        state.live = Some(player.play(clip)?);
        Ok(true)
    }

    /// Whether a clip is still audible. A clip that played to the end is
    /// released here.
    pub fn is_live(&self) -> bool {
        let mut state = self.lock();
        if state.live.as_mut().is_some_and(|playback| playback.finished()) {
            state.stop_live();
            debug!("Commentary clip ended");
        }
        state.live.is_some()
    }
}
