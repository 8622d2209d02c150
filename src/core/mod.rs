pub mod commentary;
pub mod dispatcher;
pub mod engine;
pub mod feed;
pub mod orchestrator;
pub mod poller;
pub mod task;

use crate::types::UiEvent;
use tokio::sync::mpsc;
use tracing::error;

/// Best-effort delivery to the console. A full queue drops the event; the
/// loops never wait on the UI.
pub(crate) fn send_ui_event(ui_sender: &mpsc::Sender<UiEvent>, event: UiEvent) {
    match ui_sender.try_send(event) {
        Ok(_) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {}
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!("UI Channel closed! Interface is likely dead.");
        }
    }
}
