// src/core/dispatcher.rs
use crate::connectors::traits::ExecutionHandler;
use crate::core::send_ui_event;
use crate::error::ServiceError;
use crate::types::{Side, TradeIntent, TradeOrigin, UiEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

pub const TRADE_FAILED_ALERT: &str = "Trade execution failed. Please check the server connection.";

/// Sends one order per call to the execution gateway. Holds no order state.
pub struct TradeDispatcher {
    execution_handler: Arc<dyn ExecutionHandler>,
    ui_sender: mpsc::Sender<UiEvent>,
    symbol: String,
    volume: f64,
}

impl TradeDispatcher {
    pub fn new(
        execution_handler: Arc<dyn ExecutionHandler>,
        ui_sender: mpsc::Sender<UiEvent>,
        symbol: String,
        volume: f64,
    ) -> Self {
        Self {
            execution_handler,
            ui_sender,
            symbol,
            volume,
        }
    }

    /// An order for the configured symbol and volume.
    pub fn intent(&self, side: Side) -> TradeIntent {
        TradeIntent {
            symbol: self.symbol.clone(),
            volume: self.volume,
            side,
        }
    }

    /// Places the order. A failure on the manual path raises an alert in the
    /// console; on the automatic path it is only logged.
    pub async fn dispatch(
        &self,
        intent: TradeIntent,
        origin: TradeOrigin,
    ) -> Result<serde_json::Value, ServiceError> {
        match self.execution_handler.place_order(&intent).await {
            Ok(result) => {
                info!("✅ Trade executed ({:?} {}): {}", origin, intent.side, result);
                send_ui_event(
                    &self.ui_sender,
                    UiEvent::TradeExecuted {
                        side: intent.side,
                        origin,
                        result: result.clone(),
                    },
                );
                Ok(result)
            }
            Err(e) => {
                match origin {
                    TradeOrigin::Manual => {
                        error!("Trade error: {}", e);
                        // Alerts must not be dropped on a full queue.
                        if self
                            .ui_sender
                            .send(UiEvent::Alert(TRADE_FAILED_ALERT.to_string()))
                            .await
                            .is_err()
                        {
                            error!("UI Channel closed! Trade failure alert lost.");
                        }
                    }
                    TradeOrigin::Automatic => error!("Auto trade error: {}", e),
                }
                Err(e)
            }
        }
    }
}
