//! Demo loop - tracks loop state and timing without touching audio
//!
//! Enough of a looper to exercise the engine end to end: commands move it
//! through record/play/overdub states, `run` advances the loop clock, and the
//! readout controls report what it is doing.

use ostinato_engine::{
    Command, Control, EventPayload, EventType, Looper, LooperFactory, LooperParams, RtEvent,
};

/// Loop state, reported through [`Control::State`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Off,
    Recording,
    Playing,
    Overdubbing,
    Muted,
    Paused,
}

impl LoopState {
    /// Numeric code for the `state` readout
    pub fn code(self) -> f32 {
        match self {
            LoopState::Off => 0.0,
            LoopState::Recording => 2.0,
            LoopState::Playing => 4.0,
            LoopState::Overdubbing => 5.0,
            LoopState::Muted => 10.0,
            LoopState::Paused => 14.0,
        }
    }
}

const SETTABLE: usize = Control::ALL.len();

pub struct DemoLooper {
    index: usize,
    channels: u32,
    sample_rate: u32,
    max_frames: u64,
    state: LoopState,
    loop_frames: u64,
    position: u64,
    values: [f32; SETTABLE],
}

impl DemoLooper {
    pub fn new(params: &LooperParams<'_>) -> Self {
        let sample_rate = params.driver.sample_rate();
        let mut looper = Self {
            index: params.index,
            channels: params.channels,
            sample_rate,
            max_frames: (params.loop_secs.max(0.0) as f64 * sample_rate as f64) as u64,
            state: LoopState::Off,
            loop_frames: 0,
            position: 0,
            values: [0.0; SETTABLE],
        };
        looper.set(Control::DryLevel, 1.0);
        looper.set(Control::WetLevel, 1.0);
        looper.set(Control::InputGain, 1.0);
        looper.set(Control::Feedback, 1.0);
        looper.set(Control::Rate, 1.0);
        looper
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn slot(control: Control) -> usize {
        Control::ALL.iter().position(|c| *c == control).unwrap_or(0)
    }

    fn get(&self, control: Control) -> f32 {
        self.values[Self::slot(control)]
    }

    fn set(&mut self, control: Control, value: f32) {
        self.values[Self::slot(control)] = value;
    }

    fn secs(&self, frames: u64) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (frames as f64 / self.sample_rate as f64) as f32
    }

    fn command(&mut self, command: Command) {
        use LoopState::*;

        self.state = match (command, self.state) {
            (Command::Record, Recording) => {
                self.position = 0;
                if self.loop_frames == 0 {
                    Off
                } else {
                    Playing
                }
            }
            (Command::Record, _) => {
                self.loop_frames = 0;
                self.position = 0;
                Recording
            }
            (Command::Overdub, Overdubbing) => Playing,
            (Command::Overdub, Playing) => Overdubbing,
            (Command::Mute, Muted) | (Command::MuteOff, Muted) => Playing,
            (Command::Mute, Playing | Overdubbing) | (Command::MuteOn, Playing | Overdubbing) => {
                Muted
            }
            (Command::Pause, Paused) => Playing,
            (Command::Pause, Playing | Overdubbing | Muted) => Paused,
            (Command::Trigger, _) if self.loop_frames > 0 => {
                self.position = 0;
                Playing
            }
            (Command::UndoAll, _) => {
                self.loop_frames = 0;
                self.position = 0;
                Off
            }
            // The rest need audio material to work on
            (_, state) => state,
        };
    }
}

impl Looper for DemoLooper {
    fn activate(&mut self) -> bool {
        self.channels > 0 && self.max_frames > 0
    }

    fn run(&mut self, _offset: u32, nframes: u32) {
        let frames = nframes as u64;
        match self.state {
            LoopState::Recording => {
                self.loop_frames += frames;
                if self.loop_frames >= self.max_frames {
                    // Out of memory for this loop: close it and play back
                    self.loop_frames = self.max_frames;
                    self.position = 0;
                    self.state = LoopState::Playing;
                }
            }
            LoopState::Playing | LoopState::Overdubbing | LoopState::Muted => {
                if self.loop_frames > 0 {
                    self.position = (self.position + frames) % self.loop_frames;
                }
            }
            LoopState::Off | LoopState::Paused => {}
        }
    }

    fn apply_event(&mut self, event: &RtEvent) {
        match (event.event_type, event.payload) {
            (EventType::CommandDown | EventType::CommandHit, EventPayload::Command(command)) => {
                self.command(command)
            }
            (EventType::ControlChange, EventPayload::Control { control, value }) => {
                if !control.is_readout() {
                    self.set(control, value);
                }
            }
            // Releases and value requests carry nothing for a non-sustaining loop
            _ => {}
        }
    }

    fn control_value(&self, control: Control) -> f32 {
        match control {
            Control::State => self.state.code(),
            Control::LoopLength | Control::CycleLength => self.secs(self.loop_frames),
            Control::LoopPosition => self.secs(self.position),
            Control::FreeTime => self.secs(self.max_frames - self.loop_frames),
            Control::TotalTime => self.secs(self.max_frames),
            Control::Waiting => 0.0,
            other => self.get(other),
        }
    }
}

/// Builds a [`DemoLooper`] for every new loop
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoLooperFactory;

impl LooperFactory for DemoLooperFactory {
    fn create(&self, params: &LooperParams<'_>) -> Box<dyn Looper> {
        Box::new(DemoLooper::new(params))
    }
}
