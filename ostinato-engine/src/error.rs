//! Engine error types

use thiserror::Error;

/// Errors surfaced by engine setup and loop management.
///
/// Nothing on the real-time path produces these: queue overflow and bad
/// event timing are reported through return values and counters instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot connect to audio driver")]
    DriverConnect,
    #[error("control front end could not bind to port {port}")]
    ControlBind { port: u16 },
    #[error("loop {index} failed to activate")]
    Activation { index: usize },
    #[error("no loop at index {index} (have {len})")]
    NoSuchInstance { index: usize, len: usize },
    #[error("engine is not initialized")]
    NotInitialized,
}
