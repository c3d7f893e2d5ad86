//! Recording doubles for the engine's collaborators

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::admin::{ConfigUpdateEvent, GetParamEvent, RegisterConfigEvent};
use crate::control::ControlFrontEnd;
use crate::driver::AudioDriver;
use crate::engine::Engine;
use crate::event::{Control, EventPayload, RtEvent};
use crate::looper::{Looper, LooperFactory, LooperParams};

#[derive(Debug, Clone, PartialEq)]
pub enum LoopCall {
    Run { id: usize, offset: u32, nframes: u32 },
    Apply { id: usize, event: RtEvent },
}

pub type CallLog = Arc<Mutex<Vec<LoopCall>>>;

pub struct RecordingLooper {
    id: usize,
    log: CallLog,
    activates: bool,
    last_control: Option<(Control, f32)>,
}

impl RecordingLooper {
    pub fn new(id: usize, log: CallLog) -> Self {
        Self {
            id,
            log,
            activates: true,
            last_control: None,
        }
    }

    pub fn failing(id: usize, log: CallLog) -> Self {
        Self {
            activates: false,
            ..Self::new(id, log)
        }
    }
}

impl Looper for RecordingLooper {
    fn activate(&mut self) -> bool {
        self.activates
    }

    fn run(&mut self, offset: u32, nframes: u32) {
        self.log.lock().push(LoopCall::Run {
            id: self.id,
            offset,
            nframes,
        });
    }

    fn apply_event(&mut self, event: &RtEvent) {
        if let EventPayload::Control { control, value } = event.payload {
            self.last_control = Some((control, value));
        }
        self.log.lock().push(LoopCall::Apply {
            id: self.id,
            event: *event,
        });
    }

    fn control_value(&self, control: Control) -> f32 {
        match self.last_control {
            Some((last, value)) if last == control => value,
            _ => 0.0,
        }
    }
}

/// Loops get ids 0, 1, 2... in creation order, independent of their index
pub fn recording_loops(log: &CallLog, count: usize) -> Vec<Box<dyn Looper>> {
    (0..count)
        .map(|id| Box::new(RecordingLooper::new(id, log.clone())) as Box<dyn Looper>)
        .collect()
}

pub fn runs(log: &CallLog) -> Vec<(usize, u32, u32)> {
    log.lock()
        .iter()
        .filter_map(|call| match call {
            LoopCall::Run { id, offset, nframes } => Some((*id, *offset, *nframes)),
            LoopCall::Apply { .. } => None,
        })
        .collect()
}

pub fn applies(log: &CallLog) -> Vec<(usize, RtEvent)> {
    log.lock()
        .iter()
        .filter_map(|call| match call {
            LoopCall::Apply { id, event } => Some((*id, *event)),
            LoopCall::Run { .. } => None,
        })
        .collect()
}

/// Parameters a [`RecordingFactory`] was asked to build with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Built {
    pub index: usize,
    pub channels: u32,
    pub loop_secs: f32,
}

#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub log: CallLog,
    pub built: Arc<Mutex<Vec<Built>>>,
}

impl LooperFactory for RecordingFactory {
    fn create(&self, params: &LooperParams<'_>) -> Box<dyn Looper> {
        let mut built = self.built.lock();
        let id = built.len();
        built.push(Built {
            index: params.index,
            channels: params.channels,
            loop_secs: params.loop_secs,
        });
        Box::new(RecordingLooper::new(id, self.log.clone()))
    }
}

pub struct MockDriver {
    connects: bool,
    sample_rate: u32,
    engine: Mutex<Weak<Engine>>,
}

impl MockDriver {
    pub fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            connects: true,
            sample_rate,
            engine: Mutex::new(Weak::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            connects: false,
            sample_rate: 48000,
            engine: Mutex::new(Weak::new()),
        })
    }

    pub fn engine(&self) -> Option<Arc<Engine>> {
        self.engine.lock().upgrade()
    }
}

impl AudioDriver for MockDriver {
    fn initialize(&self) -> bool {
        self.connects
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_engine(&self, engine: Weak<Engine>) {
        *self.engine.lock() = engine;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    GetParam(GetParamEvent),
    ConfigUpdate(ConfigUpdateEvent),
    Register(RegisterConfigEvent),
    PingAck { url: String, path: String },
}

pub struct MockControl {
    ready: bool,
    port: u16,
    pub calls: Mutex<Vec<ControlCall>>,
}

impl MockControl {
    pub fn new(port: u16) -> Arc<Self> {
        Arc::new(Self {
            ready: true,
            port,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn unbound(port: u16) -> Arc<Self> {
        Arc::new(Self {
            ready: false,
            port,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().clone()
    }
}

impl ControlFrontEnd for MockControl {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn server_url(&self) -> String {
        format!("osc.udp://localhost:{}/", self.port)
    }

    fn server_port(&self) -> u16 {
        self.port
    }

    fn on_get_param_result(&self, event: &GetParamEvent) {
        self.calls.lock().push(ControlCall::GetParam(event.clone()));
    }

    fn on_config_update_result(&self, event: &ConfigUpdateEvent) {
        self.calls.lock().push(ControlCall::ConfigUpdate(event.clone()));
    }

    fn on_register_result(&self, event: &RegisterConfigEvent) {
        self.calls.lock().push(ControlCall::Register(event.clone()));
    }

    fn send_ping_ack(&self, return_url: &str, return_path: &str) {
        self.calls.lock().push(ControlCall::PingAck {
            url: return_url.to_string(),
            path: return_path.to_string(),
        });
    }
}
