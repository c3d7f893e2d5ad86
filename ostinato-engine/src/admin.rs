//! Administrative (non-real-time) requests
//!
//! Everything that is allowed to block - adding and removing loops, answering
//! queries, registration - travels as an [`AdminEvent`] to the worker thread.

use crate::event::Control;

/// Register or drop a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Register,
    Unregister,
}

/// Add or remove a loop instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopChange {
    Add,
    Remove,
}

/// Query the current value of a control.
///
/// `value` is filled in by the worker before the result is handed back to
/// the control front end.
#[derive(Debug, Clone, PartialEq)]
pub struct GetParamEvent {
    pub control: Control,
    /// Instance index; out-of-range indices resolve to 0.0
    pub instance: i32,
    pub return_url: String,
    pub return_path: String,
    pub value: f32,
}

impl GetParamEvent {
    pub fn new(
        control: Control,
        instance: i32,
        return_url: impl Into<String>,
        return_path: impl Into<String>,
    ) -> Self {
        Self {
            control,
            instance,
            return_url: return_url.into(),
            return_path: return_path.into(),
            value: 0.0,
        }
    }
}

/// Subscribe to (or stop following) updates of a control.
/// The engine only forwards it; the front end owns the subscription list.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdateEvent {
    pub kind: RegistrationKind,
    pub control: Control,
    pub instance: i32,
    pub return_url: String,
    pub return_path: String,
}

/// Add or remove a loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigLoopEvent {
    pub kind: LoopChange,
    /// Channel count for a new loop; 0 uses the engine default
    pub channels: u32,
    /// Maximum loop length in seconds for a new loop; 0 or less uses the engine default
    pub secs: f32,
    /// Loop to remove; -1 removes the last one
    pub index: i32,
}

impl ConfigLoopEvent {
    pub fn add(channels: u32, secs: f32) -> Self {
        Self {
            kind: LoopChange::Add,
            channels,
            secs,
            index: -1,
        }
    }

    pub fn remove(index: i32) -> Self {
        Self {
            kind: LoopChange::Remove,
            channels: 0,
            secs: 0.0,
            index,
        }
    }
}

/// Liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingEvent {
    pub return_url: String,
    pub return_path: String,
}

/// Register a controller for engine-wide notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterConfigEvent {
    pub kind: RegistrationKind,
    pub return_url: String,
    pub return_path: String,
}

/// Requests handled by the non-real-time worker
#[derive(Debug, Clone, PartialEq)]
pub enum AdminEvent {
    GetParam(GetParamEvent),
    ConfigUpdate(ConfigUpdateEvent),
    ConfigLoop(ConfigLoopEvent),
    Ping(PingEvent),
    RegisterConfig(RegisterConfigEvent),
}

impl AdminEvent {
    /// Short name for log output
    pub fn name(&self) -> &'static str {
        match self {
            AdminEvent::GetParam(_) => "get_param",
            AdminEvent::ConfigUpdate(_) => "config_update",
            AdminEvent::ConfigLoop(_) => "config_loop",
            AdminEvent::Ping(_) => "ping",
            AdminEvent::RegisterConfig(_) => "register_config",
        }
    }
}

impl From<GetParamEvent> for AdminEvent {
    fn from(event: GetParamEvent) -> Self {
        AdminEvent::GetParam(event)
    }
}

impl From<ConfigUpdateEvent> for AdminEvent {
    fn from(event: ConfigUpdateEvent) -> Self {
        AdminEvent::ConfigUpdate(event)
    }
}

impl From<ConfigLoopEvent> for AdminEvent {
    fn from(event: ConfigLoopEvent) -> Self {
        AdminEvent::ConfigLoop(event)
    }
}

impl From<PingEvent> for AdminEvent {
    fn from(event: PingEvent) -> Self {
        AdminEvent::Ping(event)
    }
}

impl From<RegisterConfigEvent> for AdminEvent {
    fn from(event: RegisterConfigEvent) -> Self {
        AdminEvent::RegisterConfig(event)
    }
}
