//! FrameSink trait - capture output interface

use crate::{CapturedFrame, ContractError};

/// Frame output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one captured frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, frame: &CapturedFrame) -> Result<(), ContractError>;

    /// Flush buffered state (pose tables etc.)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
