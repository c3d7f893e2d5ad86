//! Real-time events - sample-accurate commands and control changes
//!
//! An [`RtEvent`] is a small `Copy` record that travels through the lock-free
//! event queue and is consumed exactly once by the audio callback.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a command or control event was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Button pressed
    CommandDown,
    /// Button released
    CommandUp,
    /// Press and release in one go
    CommandHit,
    /// Set a control to a new value
    ControlChange,
    /// Ask an instance to report a control value
    ControlRequest,
}

/// Looper commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Record,
    Overdub,
    Multiply,
    Insert,
    Replace,
    Reverse,
    Mute,
    Undo,
    Redo,
    Scratch,
    Trigger,
    OneShot,
    Substitute,
    UndoAll,
    RedoAll,
    MuteOn,
    MuteOff,
    Solo,
    Pause,
}

impl Command {
    pub const ALL: [Command; 19] = [
        Command::Record,
        Command::Overdub,
        Command::Multiply,
        Command::Insert,
        Command::Replace,
        Command::Reverse,
        Command::Mute,
        Command::Undo,
        Command::Redo,
        Command::Scratch,
        Command::Trigger,
        Command::OneShot,
        Command::Substitute,
        Command::UndoAll,
        Command::RedoAll,
        Command::MuteOn,
        Command::MuteOff,
        Command::Solo,
        Command::Pause,
    ];

    /// Stable lowercase name used by control front ends
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Record => "record",
            Command::Overdub => "overdub",
            Command::Multiply => "multiply",
            Command::Insert => "insert",
            Command::Replace => "replace",
            Command::Reverse => "reverse",
            Command::Mute => "mute",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::Scratch => "scratch",
            Command::Trigger => "trigger",
            Command::OneShot => "oneshot",
            Command::Substitute => "substitute",
            Command::UndoAll => "undo_all",
            Command::RedoAll => "redo_all",
            Command::MuteOn => "mute_on",
            Command::MuteOff => "mute_off",
            Command::Solo => "solo",
            Command::Pause => "pause",
        }
    }
}

/// Per-instance controls.
///
/// The last group are readouts: front ends may query them but setting them
/// has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    TriggerThreshold,
    DryLevel,
    WetLevel,
    InputGain,
    Feedback,
    Rate,
    ScratchPos,
    Quantize,
    Round,
    Sync,
    FadeSamples,
    // Readouts
    State,
    LoopLength,
    LoopPosition,
    CycleLength,
    FreeTime,
    TotalTime,
    Waiting,
}

impl Control {
    pub const ALL: [Control; 18] = [
        Control::TriggerThreshold,
        Control::DryLevel,
        Control::WetLevel,
        Control::InputGain,
        Control::Feedback,
        Control::Rate,
        Control::ScratchPos,
        Control::Quantize,
        Control::Round,
        Control::Sync,
        Control::FadeSamples,
        Control::State,
        Control::LoopLength,
        Control::LoopPosition,
        Control::CycleLength,
        Control::FreeTime,
        Control::TotalTime,
        Control::Waiting,
    ];

    /// Stable lowercase name used by control front ends
    pub fn as_str(self) -> &'static str {
        match self {
            Control::TriggerThreshold => "rec_thresh",
            Control::DryLevel => "dry",
            Control::WetLevel => "wet",
            Control::InputGain => "input_gain",
            Control::Feedback => "feedback",
            Control::Rate => "rate",
            Control::ScratchPos => "scratch_pos",
            Control::Quantize => "quantize",
            Control::Round => "round",
            Control::Sync => "sync",
            Control::FadeSamples => "fade_samples",
            Control::State => "state",
            Control::LoopLength => "loop_len",
            Control::LoopPosition => "loop_pos",
            Control::CycleLength => "cycle_len",
            Control::FreeTime => "free_time",
            Control::TotalTime => "total_time",
            Control::Waiting => "waiting",
        }
    }

    /// Whether this control only reports state
    pub fn is_readout(self) -> bool {
        matches!(
            self,
            Control::State
                | Control::LoopLength
                | Control::LoopPosition
                | Control::CycleLength
                | Control::FreeTime
                | Control::TotalTime
                | Control::Waiting
        )
    }
}

/// Error returned when a command or control name is not recognised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown name: {0}")]
pub struct UnknownName(pub String);

impl FromStr for Command {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl FromStr for Control {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Control::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which instance(s) an event addresses.
///
/// Indices are positional: removing an instance shifts every later index
/// down by one, so a target resolved before a removal may hit a different loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    /// Broadcast to every instance present at dispatch time
    #[default]
    All,
    /// A single instance by position
    Instance(usize),
}

impl Target {
    /// Wire value meaning "all instances"
    pub const ALL_INDEX: i32 = -1;

    /// Convert a signed wire index. `-1` broadcasts; other negatives are invalid.
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            Self::ALL_INDEX => Some(Target::All),
            i if i >= 0 => Some(Target::Instance(i as usize)),
            _ => None,
        }
    }

    /// Signed wire index (`-1` for broadcast). Saturates at `i32::MAX`.
    pub fn as_index(self) -> i32 {
        match self {
            Target::All => Self::ALL_INDEX,
            Target::Instance(i) => i32::try_from(i).unwrap_or(i32::MAX),
        }
    }

    #[inline]
    pub fn matches(self, index: usize) -> bool {
        match self {
            Target::All => true,
            Target::Instance(i) => i == index,
        }
    }
}

/// What an event does once it reaches an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
    Command(Command),
    Control { control: Control, value: f32 },
}

/// A timestamped command or control change for the audio thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RtEvent {
    pub event_type: EventType,
    pub payload: EventPayload,
    pub target: Target,
    /// Frame within the current fragment at which the event takes effect
    pub fragment_offset: u32,
}

impl RtEvent {
    pub fn command(
        event_type: EventType,
        command: Command,
        target: Target,
        fragment_offset: u32,
    ) -> Self {
        Self {
            event_type,
            payload: EventPayload::Command(command),
            target,
            fragment_offset,
        }
    }

    pub fn control(
        event_type: EventType,
        control: Control,
        value: f32,
        target: Target,
        fragment_offset: u32,
    ) -> Self {
        Self {
            event_type,
            payload: EventPayload::Control { control, value },
            target,
            fragment_offset,
        }
    }
}
