//! Processing instance contract
//!
//! The engine schedules loops but never looks inside them. A loop renders a
//! slice of the current fragment on `run` and reacts to events between slices.

use std::sync::Arc;

use crate::driver::AudioDriver;
use crate::event::{Control, RtEvent};

/// One independently addressable loop
pub trait Looper: Send {
    /// One-time setup after construction; false discards the loop
    fn activate(&mut self) -> bool;

    /// Render `nframes` frames starting at `offset` within the current fragment
    fn run(&mut self, offset: u32, nframes: u32);

    fn apply_event(&mut self, event: &RtEvent);

    fn control_value(&self, control: Control) -> f32;
}

/// Everything a new loop is built from
pub struct LooperParams<'a> {
    pub driver: &'a Arc<dyn AudioDriver>,
    /// Position in the registry at creation time
    pub index: usize,
    pub channels: u32,
    pub loop_secs: f32,
}

/// Builds loops for the registry
pub trait LooperFactory: Send + Sync {
    fn create(&self, params: &LooperParams<'_>) -> Box<dyn Looper>;
}

impl<F> LooperFactory for F
where
    F: Fn(&LooperParams<'_>) -> Box<dyn Looper> + Send + Sync,
{
    fn create(&self, params: &LooperParams<'_>) -> Box<dyn Looper> {
        self(params)
    }
}
