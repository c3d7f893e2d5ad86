//! Looping engine core for Ostinato - event queues, RT dispatch, loop registry
//!
//! This crate schedules commands onto a set of loops with sample accuracy:
//! - Events: real-time commands/control changes and administrative requests
//! - Queue: bounded lock-free SPSC ring buffer with two-span regions
//! - Stamp: anchors new events to an offset inside the current fragment
//! - Registry: the loops, behind a lock the audio thread only ever tries
//! - Dispatch: renders loops piecewise between events in the audio callback
//! - Worker: non-real-time thread for everything that may block
//!
//! The audio driver, the loops themselves and the control front end are
//! supplied by the host through the traits in [`driver`], [`looper`] and
//! [`control`].

pub mod admin;
mod config;
pub mod control;
mod dispatch;
pub mod driver;
mod engine;
mod error;
pub mod event;
pub mod looper;
pub mod queue;
mod registry;
mod stamp;
mod stats;
mod worker;

#[cfg(test)]
mod testing;

pub use admin::{
    AdminEvent, ConfigLoopEvent, ConfigUpdateEvent, GetParamEvent, LoopChange, PingEvent,
    RegisterConfigEvent, RegistrationKind,
};
pub use config::{ContentionPolicy, EngineConfig};
pub use control::{ControlConfig, ControlFrontEnd};
pub use dispatch::{dispatch_fragment, FragmentReport};
pub use driver::{AudioDriver, ProcessOutcome};
pub use engine::Engine;
pub use error::EngineError;
pub use event::{Command, Control, EventPayload, EventType, RtEvent, Target, UnknownName};
pub use looper::{Looper, LooperFactory, LooperParams};
pub use queue::{event_queue, EventConsumer, EventProducer, ReadRegion, WriteRegion, MAX_EVENTS};
pub use registry::{InstanceEvent, InstanceRegistry, Instances, RtAccess};
pub use stamp::EventGenerator;
pub use stats::{EngineStats, StatsSnapshot};
pub use worker::spawn_worker;
