//! Event stamping - anchors new events to a frame offset in the current fragment
//!
//! The audio thread marks the start of each fragment; producer threads turn
//! "now" into an offset relative to that mark. Events stamped while fragment N
//! is being rendered are consumed at the start of fragment N+1 and land at the
//! same relative position, so timing between events pushed in quick
//! succession is preserved to the frame.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::event::{EventPayload, EventType, RtEvent, Target};

/// Lock-free clock shared by the audio thread and event producers
pub struct EventGenerator {
    origin: Instant,
    sample_rate: AtomicU32,
    /// Start of the latest fragment, nanoseconds since `origin`
    fragment_start: AtomicU64,
    /// Size of the latest fragment; 0 until the first callback
    fragment_frames: AtomicU32,
}

impl EventGenerator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            origin: Instant::now(),
            sample_rate: AtomicU32::new(sample_rate),
            fragment_start: AtomicU64::new(0),
            fragment_frames: AtomicU32::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
    }

    /// Frames in the latest fragment (0 before the first callback)
    pub fn fragment_frames(&self) -> u32 {
        self.fragment_frames.load(Ordering::Acquire)
    }

    /// Mark the start of a fragment. Called from the audio callback.
    #[inline]
    pub fn update_fragment_time(&self, nframes: u32) {
        let now = self.origin.elapsed().as_nanos() as u64;
        self.fragment_start.store(now, Ordering::Relaxed);
        self.fragment_frames.store(nframes, Ordering::Release);
    }

    /// Forget all timing state
    pub fn reset(&self) {
        self.sample_rate.store(0, Ordering::Relaxed);
        self.fragment_start.store(0, Ordering::Relaxed);
        self.fragment_frames.store(0, Ordering::Release);
    }

    /// Offset for something happening "now"
    pub fn current_offset(&self) -> u32 {
        let frames = self.fragment_frames.load(Ordering::Acquire);
        let start = self.fragment_start.load(Ordering::Relaxed);
        let now = self.origin.elapsed().as_nanos() as u64;
        let elapsed = Duration::from_nanos(now.saturating_sub(start));
        offset_for(elapsed, self.sample_rate(), frames)
    }

    /// Build an event anchored to the current time. Does not enqueue it.
    pub fn create_event(
        &self,
        event_type: EventType,
        payload: EventPayload,
        target: Target,
    ) -> RtEvent {
        RtEvent {
            event_type,
            payload,
            target,
            fragment_offset: self.current_offset(),
        }
    }
}

/// Convert time since the fragment start into a frame offset inside a
/// fragment of `frames` frames
fn offset_for(elapsed: Duration, sample_rate: u32, frames: u32) -> u32 {
    if frames == 0 {
        return 0;
    }
    let elapsed_frames = elapsed.as_nanos() * sample_rate as u128 / 1_000_000_000;
    elapsed_frames.min(frames as u128 - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Command;

    #[test]
    fn test_offset_before_first_fragment_is_zero() {
        let generator = EventGenerator::new(48000);
        assert_eq!(generator.current_offset(), 0);
    }

    #[test]
    fn test_offset_conversion() {
        // 1ms at 48kHz is 48 frames
        assert_eq!(offset_for(Duration::from_millis(1), 48000, 256), 48);
        assert_eq!(offset_for(Duration::ZERO, 48000, 256), 0);
    }

    #[test]
    fn test_offset_clamped_to_fragment() {
        assert_eq!(offset_for(Duration::from_secs(1), 48000, 256), 255);
        assert_eq!(offset_for(Duration::from_secs(1), 48000, 0), 0);
    }

    #[test]
    fn test_create_event_stays_inside_fragment() {
        let generator = EventGenerator::new(48000);
        generator.update_fragment_time(128);
        let event = generator.create_event(
            EventType::CommandHit,
            EventPayload::Command(Command::Record),
            Target::Instance(1),
        );
        assert!(event.fragment_offset < 128);
        assert_eq!(event.target, Target::Instance(1));
    }

    #[test]
    fn test_reset() {
        let generator = EventGenerator::new(44100);
        generator.update_fragment_time(512);
        generator.reset();
        assert_eq!(generator.fragment_frames(), 0);
        assert_eq!(generator.sample_rate(), 0);
        assert_eq!(generator.current_offset(), 0);
    }
}
