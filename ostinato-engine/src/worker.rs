//! Non-real-time worker
//!
//! Drains administrative requests, performs the blocking loop mutations and
//! answers the control front end. Sleeps on a wake channel between batches,
//! with a timeout so it still comes around periodically if a wake-up is lost.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info, warn};

use crate::admin::{AdminEvent, ConfigLoopEvent, LoopChange};
use crate::engine::Engine;

/// Why the worker was woken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerSignal {
    /// New admin events are queued
    Work,
    /// The engine is shutting down
    Shutdown,
}

/// Run [`Engine::run_worker`] on a dedicated thread
pub fn spawn_worker(engine: Arc<Engine>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ostinato-worker".into())
        .spawn(move || engine.run_worker())
}

impl Engine {
    /// Worker loop. Returns once the engine stops being ready.
    pub fn run_worker(&self) {
        info!("worker started");

        while self.is_ready() {
            self.drain_admin_events();
            self.report_stats();

            if !self.is_ready() {
                break;
            }

            match self.wake_rx.recv_timeout(self.config.worker_wake_interval) {
                Ok(WorkerSignal::Work) | Err(RecvTimeoutError::Timeout) => {}
                // The ready flag is already down; the loop condition ends it
                Ok(WorkerSignal::Shutdown) => debug!("worker received shutdown"),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("worker stopped");
    }

    /// Handle every queued admin event. Returns how many were handled.
    pub fn drain_admin_events(&self) -> usize {
        let mut handled = 0;
        while self.is_ready() {
            let next = self.admin_consumer.lock().as_mut().and_then(|queue| queue.pop());
            let Some(event) = next else {
                break;
            };
            self.handle_admin_event(event);
            handled += 1;
        }
        handled
    }

    fn handle_admin_event(&self, event: AdminEvent) {
        debug!(kind = event.name(), "admin event");
        let control = self.control.read().clone();

        match event {
            AdminEvent::GetParam(mut request) => {
                request.value = self.control_value(request.control, request.instance);
                if let Some(control) = &control {
                    control.on_get_param_result(&request);
                }
            }
            AdminEvent::ConfigUpdate(update) => {
                if let Some(control) = &control {
                    control.on_config_update_result(&update);
                }
            }
            AdminEvent::ConfigLoop(change) => self.apply_loop_change(change),
            AdminEvent::Ping(ping) => {
                if let Some(control) = &control {
                    control.send_ping_ack(&ping.return_url, &ping.return_path);
                }
            }
            AdminEvent::RegisterConfig(registration) => {
                if let Some(control) = &control {
                    control.on_register_result(&registration);
                }
            }
        }
    }

    fn apply_loop_change(&self, change: ConfigLoopEvent) {
        match change.kind {
            LoopChange::Add => {
                let channels = match change.channels {
                    0 => self.config.default_channel_count,
                    n => n,
                };
                let secs = if change.secs > 0.0 {
                    change.secs
                } else {
                    self.config.default_loop_secs
                };
                if let Err(err) = self.add_loop(channels, secs) {
                    warn!(%err, "can't create a new loop");
                }
            }
            LoopChange::Remove => {
                let index = match change.index {
                    -1 => self.loop_count().checked_sub(1),
                    i => usize::try_from(i).ok(),
                };
                match index {
                    Some(index) => {
                        if let Err(err) = self.remove_loop(index) {
                            warn!(%err, "can't remove loop");
                        }
                    }
                    None => warn!(index = change.index, "no loop to remove"),
                }
            }
        }
    }

    /// Log what the audio thread counted since the last pass
    fn report_stats(&self) {
        let now = self.stats();
        let mut reported = self.reported.lock();

        let contended = now.contended_cycles - reported.contended_cycles;
        if contended > 0 {
            warn!(cycles = contended, "events deferred while loops were changing");
        }
        let dropped = now.dropped_events - reported.dropped_events;
        if dropped > 0 {
            warn!(events = dropped, "dropped events with out-of-range offsets");
        }

        *reported = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{
        ConfigUpdateEvent, GetParamEvent, PingEvent, RegisterConfigEvent, RegistrationKind,
    };
    use crate::config::EngineConfig;
    use crate::control::ControlConfig;
    use crate::event::{Control, EventType, RtEvent, Target};
    use crate::registry::InstanceEvent;
    use crate::testing::{Built, ControlCall, MockControl, MockDriver, RecordingFactory};
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    struct Fixture {
        engine: Arc<Engine>,
        factory: RecordingFactory,
        control: Arc<MockControl>,
        notifications: Arc<Mutex<Vec<InstanceEvent>>>,
    }

    fn fixture(config: EngineConfig) -> Fixture {
        let factory = RecordingFactory::default();
        let engine = Arc::new(Engine::new(config, factory.clone()));
        let control = MockControl::new(9951);
        let bound = control.clone();
        engine
            .initialize(MockDriver::new(48000), &ControlConfig::default(), move |_| bound)
            .unwrap();

        let notifications = Arc::new(Mutex::new(Vec::new()));
        let sink = notifications.clone();
        engine.subscribe(move |event| sink.lock().push(event));

        Fixture {
            engine,
            factory,
            control,
            notifications,
        }
    }

    #[test]
    fn test_add_then_remove_last() {
        let f = fixture(EngineConfig::default());

        assert!(f.engine.push_admin_event(ConfigLoopEvent::add(2, 0.0)));
        assert_eq!(f.engine.drain_admin_events(), 1);
        assert_eq!(f.engine.loop_count(), 1);
        assert_eq!(*f.notifications.lock(), vec![InstanceEvent::Added(0)]);

        assert!(f.engine.push_admin_event(ConfigLoopEvent::remove(-1)));
        assert_eq!(f.engine.drain_admin_events(), 1);
        assert_eq!(f.engine.loop_count(), 0);
        assert_eq!(
            *f.notifications.lock(),
            vec![InstanceEvent::Added(0), InstanceEvent::Removed(0)]
        );
    }

    #[test]
    fn test_add_uses_configured_defaults() {
        let config = EngineConfig {
            default_channel_count: 6,
            default_loop_secs: 42.0,
            ..EngineConfig::default()
        };
        let f = fixture(config);

        f.engine.push_admin_event(ConfigLoopEvent::add(0, 0.0));
        f.engine.push_admin_event(ConfigLoopEvent::add(1, 8.0));
        f.engine.drain_admin_events();

        assert_eq!(
            *f.factory.built.lock(),
            vec![
                Built {
                    index: 0,
                    channels: 6,
                    loop_secs: 42.0
                },
                Built {
                    index: 1,
                    channels: 1,
                    loop_secs: 8.0
                },
            ]
        );
    }

    #[test]
    fn test_remove_by_index_shifts_later_loops() {
        let f = fixture(EngineConfig::default());
        for _ in 0..3 {
            f.engine.push_admin_event(ConfigLoopEvent::add(2, 0.0));
        }
        f.engine.push_admin_event(ConfigLoopEvent::remove(0));
        f.engine.push_admin_event(ConfigLoopEvent::add(2, 0.0));
        f.engine.drain_admin_events();

        assert_eq!(f.engine.loop_count(), 3);
        assert_eq!(f.notifications.lock().last(), Some(&InstanceEvent::Added(2)));
    }

    #[test]
    fn test_remove_from_empty_registry_is_harmless() {
        let f = fixture(EngineConfig::default());
        f.engine.push_admin_event(ConfigLoopEvent::remove(-1));
        f.engine.push_admin_event(ConfigLoopEvent::remove(4));
        assert_eq!(f.engine.drain_admin_events(), 2);
        assert_eq!(f.engine.loop_count(), 0);
        assert!(f.notifications.lock().is_empty());
    }

    #[test]
    fn test_get_param_resolves_value() {
        let f = fixture(EngineConfig::default());
        f.engine.push_admin_event(ConfigLoopEvent::add(2, 0.0));
        f.engine.drain_admin_events();

        f.engine.push_rt_event(RtEvent::control(
            EventType::ControlChange,
            Control::Feedback,
            0.75,
            Target::Instance(0),
            0,
        ));
        f.engine.process(64);

        for instance in [0, 3] {
            let request =
                GetParamEvent::new(Control::Feedback, instance, "osc.udp://host:1/", "/fb");
            f.engine.push_admin_event(request);
        }
        f.engine.drain_admin_events();

        let values: Vec<(i32, f32)> = f
            .control
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                ControlCall::GetParam(event) => Some((event.instance, event.value)),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![(0, 0.75), (3, 0.0)]);
    }

    #[test]
    fn test_forwards_to_control_front_end() {
        let f = fixture(EngineConfig::default());
        let update = ConfigUpdateEvent {
            kind: RegistrationKind::Register,
            control: Control::LoopPosition,
            instance: 0,
            return_url: "osc.udp://host:1/".into(),
            return_path: "/pos".into(),
        };
        let registration = RegisterConfigEvent {
            kind: RegistrationKind::Unregister,
            return_url: "osc.udp://host:1/".into(),
            return_path: "/cfg".into(),
        };

        f.engine.push_admin_event(update.clone());
        f.engine.push_admin_event(PingEvent {
            return_url: "osc.udp://host:1/".into(),
            return_path: "/pong".into(),
        });
        f.engine.push_admin_event(registration.clone());
        f.engine.drain_admin_events();

        assert_eq!(
            f.control.calls(),
            vec![
                ControlCall::ConfigUpdate(update),
                ControlCall::PingAck {
                    url: "osc.udp://host:1/".into(),
                    path: "/pong".into()
                },
                ControlCall::Register(registration),
            ]
        );
    }

    #[test]
    fn test_drain_does_nothing_once_quit() {
        let f = fixture(EngineConfig::default());
        f.engine.push_admin_event(ConfigLoopEvent::add(2, 0.0));
        f.engine.quit();
        assert_eq!(f.engine.drain_admin_events(), 0);
        assert_eq!(f.engine.loop_count(), 0);
    }

    #[test]
    fn test_push_wakes_worker() {
        let config = EngineConfig {
            worker_wake_interval: Duration::from_secs(60),
            ..EngineConfig::default()
        };
        let f = fixture(config);
        let handle = spawn_worker(f.engine.clone()).unwrap();

        f.engine.push_admin_event(ConfigLoopEvent::add(2, 0.0));
        let deadline = Instant::now() + Duration::from_secs(5);
        while f.engine.loop_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(f.engine.loop_count(), 1);

        f.engine.quit();
        handle.join().unwrap();
    }

    #[test]
    fn test_quit_wakes_idle_worker() {
        let config = EngineConfig {
            worker_wake_interval: Duration::from_secs(60),
            ..EngineConfig::default()
        };
        let f = fixture(config);
        let handle = spawn_worker(f.engine.clone()).unwrap();
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        f.engine.quit();
        handle.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_worker_returns_immediately_when_not_ready() {
        let engine = Engine::new(EngineConfig::default(), RecordingFactory::default());
        engine.run_worker();
        assert!(!engine.is_ready());
    }
}
