// src/audio/process.rs
use crate::audio::{AudioPlayer, Playback};
use crate::config::AudioConfig;
use crate::error::PlaybackError;
use crate::types::AudioClip;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, warn};
use uuid::Uuid;

/// Plays clips by handing a temporary file to an external command-line player.
pub struct ProcessPlayer {
    command: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl ProcessPlayer {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            command: config.player_command.clone(),
            args: config.player_args.clone(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    fn extension(clip: &AudioClip) -> &'static str {
        match clip.content_type.as_deref() {
            Some(ct) if ct.contains("wav") => "wav",
            Some(ct) if ct.contains("ogg") => "ogg",
            _ => "mp3",
        }
    }
}

impl ProcessPlayer {
    fn spawn(&self, clip: AudioClip) -> Result<ProcessPlayback, PlaybackError> {
        if clip.bytes.is_empty() {
            return Err(PlaybackError::EmptyClip);
        }

        let path = self.scratch_dir.join(format!(
            "market-narrator-{}.{}",
            Uuid::new_v4(),
            Self::extension(&clip)
        ));
        std::fs::write(&path, &clip.bytes).map_err(PlaybackError::Stage)?;

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match child {
            Ok(child) => {
                debug!("Playing {} via {} (pid {:?})", path.display(), self.command, child.id());
                Ok(ProcessPlayback {
                    child,
                    path,
                    done: false,
                })
            }
            Err(source) => {
                let _ = std::fs::remove_file(&path);
                Err(PlaybackError::Launch {
                    command: self.command.clone(),
                    source,
                })
            }
        }
    }
}

impl AudioPlayer for ProcessPlayer {
    fn play(&self, clip: AudioClip) -> Result<Box<dyn Playback>, PlaybackError> {
        Ok(Box::new(self.spawn(clip)?))
    }
}

struct ProcessPlayback {
    child: Child,
    path: PathBuf,
    done: bool,
}

impl ProcessPlayback {
    fn remove_clip(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Playback for ProcessPlayback {
    fn stop(&mut self) {
        if !self.done {
            self.done = true;
            // Players that exited on their own report an error here.
            if let Err(e) = self.child.start_kill() {
                debug!("Player already gone: {}", e);
            }
        }
        self.remove_clip();
    }

    fn finished(&mut self) -> bool {
        if self.done {
            return true;
        }
        match self.child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                debug!("Player exited with {}", status);
                self.done = true;
                self.remove_clip();
                true
            }
            Err(e) => {
                warn!("Cannot poll player: {}", e);
                false
            }
        }
    }
}

impl Drop for ProcessPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
