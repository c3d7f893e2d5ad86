//! Audio driver contract

use std::sync::Weak;

use crate::engine::Engine;

/// Backend that owns the audio device and calls [`Engine::process`] once per
/// fragment from its real-time callback
pub trait AudioDriver: Send + Sync {
    /// Open the device; false if it cannot be reached
    fn initialize(&self) -> bool;

    fn sample_rate(&self) -> u32;

    /// Called before [`AudioDriver::initialize`] so the callback can reach the engine
    fn set_engine(&self, engine: Weak<Engine>);
}

/// What the driver should do with its output buffers after a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Loops ran over the whole fragment
    Rendered,
    /// Loops were busy; output silence for this fragment
    Silence,
    /// Loops were busy; leave the buffers untouched
    Skipped,
}
