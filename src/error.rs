// src/error.rs
use thiserror::Error;

/// Failure talking to the local backend. Every variant is transient from the
/// orchestrator's point of view: the next tick simply tries again.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: &'static str },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("transport error on {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode {endpoint} response: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
}

impl ServiceError {
    pub fn from_reqwest(endpoint: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout { endpoint }
        } else if err.is_decode() {
            ServiceError::Decode {
                endpoint,
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ServiceError::Status { endpoint, status }
        } else {
            ServiceError::Transport {
                endpoint,
                source: err,
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("audio clip is empty")]
    EmptyClip,

    #[error("failed to stage audio clip: {0}")]
    Stage(#[source] std::io::Error),

    #[error("failed to launch player `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
