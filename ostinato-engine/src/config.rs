//! Engine configuration

use std::time::Duration;

use crate::queue::MAX_EVENTS;

/// What the audio callback does when a loop is being added or removed while
/// it runs. Queued events always wait for the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentionPolicy {
    /// Keep running every loop over the fragment; only event application waits
    #[default]
    ContinueRender,
    /// Skip the cycle and have the driver output silence
    RenderSilence,
    /// Skip the cycle entirely; the driver leaves its buffers as they are
    SkipRender,
}

impl ContentionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentionPolicy::ContinueRender => "continue",
            ContentionPolicy::RenderSilence => "silence",
            ContentionPolicy::SkipRender => "skip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "continue" => Some(ContentionPolicy::ContinueRender),
            "silence" => Some(ContentionPolicy::RenderSilence),
            "skip" => Some(ContentionPolicy::SkipRender),
            _ => None,
        }
    }
}

/// Tunables fixed for the lifetime of an [`Engine`](crate::Engine)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Channels for a new loop when the request says 0
    pub default_channel_count: u32,
    /// Maximum loop length in seconds when the request leaves it unset
    pub default_loop_secs: f32,
    /// Capacity of both event queues
    pub queue_capacity: usize,
    /// Longest the worker sleeps without a wake-up
    pub worker_wake_interval: Duration,
    pub contention_policy: ContentionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_channel_count: 2,
            default_loop_secs: 200.0,
            queue_capacity: MAX_EVENTS,
            worker_wake_interval: Duration::from_secs(5),
            contention_policy: ContentionPolicy::default(),
        }
    }
}
