pub mod sma_reversion;
pub mod traits;
