//! Control front end contract
//!
//! The front end (network layer) turns external messages into engine pushes
//! and receives the results of asynchronous requests back through these
//! callbacks, always on the worker thread.

use crate::admin::{ConfigUpdateEvent, GetParamEvent, RegisterConfigEvent};

/// Where the control front end should listen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlConfig {
    /// Port to bind; 0 lets the front end choose
    pub port: u16,
    /// Controller to notify once the engine is up
    pub ping_url: Option<String>,
}

pub trait ControlFrontEnd: Send + Sync {
    /// Bound and accepting requests
    fn is_ready(&self) -> bool;

    fn server_url(&self) -> String;

    fn server_port(&self) -> u16;

    /// `event.value` holds the resolved control value
    fn on_get_param_result(&self, event: &GetParamEvent);

    fn on_config_update_result(&self, event: &ConfigUpdateEvent);

    fn on_register_result(&self, event: &RegisterConfigEvent);

    fn send_ping_ack(&self, return_url: &str, return_path: &str);
}
