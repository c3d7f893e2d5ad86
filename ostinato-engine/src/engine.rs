//! Engine facade - owns the queues, the loop registry and the collaborators
//!
//! Three kinds of threads meet here:
//! - the driver's audio callback calls [`Engine::process`] once per fragment
//! - the worker runs [`Engine::run_worker`] and does everything that may block
//! - any other thread pushes events through the `push_*` methods

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::admin::AdminEvent;
use crate::config::{ContentionPolicy, EngineConfig};
use crate::control::{ControlConfig, ControlFrontEnd};
use crate::dispatch::dispatch_fragment;
use crate::driver::{AudioDriver, ProcessOutcome};
use crate::error::EngineError;
use crate::event::{Command, Control, EventPayload, EventType, RtEvent, Target};
use crate::looper::{Looper, LooperFactory, LooperParams};
use crate::queue::{event_queue, EventConsumer, EventProducer};
use crate::registry::{InstanceEvent, InstanceRegistry, RtAccess};
use crate::stamp::EventGenerator;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::worker::WorkerSignal;

pub struct Engine {
    pub(crate) config: EngineConfig,
    ready: AtomicBool,
    generator: EventGenerator,
    registry: InstanceRegistry,
    factory: Box<dyn LooperFactory>,
    driver: RwLock<Option<Arc<dyn AudioDriver>>>,
    pub(crate) control: RwLock<Option<Arc<dyn ControlFrontEnd>>>,
    // Producer halves sit behind a mutex so several threads can push;
    // the consumer side stays wait-free.
    rt_producer: Mutex<Option<EventProducer<RtEvent>>>,
    rt_consumer: Mutex<Option<EventConsumer<RtEvent>>>,
    admin_producer: Mutex<Option<EventProducer<AdminEvent>>>,
    pub(crate) admin_consumer: Mutex<Option<EventConsumer<AdminEvent>>>,
    wake_tx: Sender<WorkerSignal>,
    pub(crate) wake_rx: Receiver<WorkerSignal>,
    stats: EngineStats,
    pub(crate) reported: Mutex<StatsSnapshot>,
}

impl Engine {
    pub fn new<F>(config: EngineConfig, factory: F) -> Self
    where
        F: LooperFactory + 'static,
    {
        // One pending wake-up is enough; the worker re-checks everything on wake
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            config,
            ready: AtomicBool::new(false),
            generator: EventGenerator::new(0),
            registry: InstanceRegistry::new(),
            factory: Box::new(factory),
            driver: RwLock::new(None),
            control: RwLock::new(None),
            rt_producer: Mutex::new(None),
            rt_consumer: Mutex::new(None),
            admin_producer: Mutex::new(None),
            admin_consumer: Mutex::new(None),
            wake_tx,
            wake_rx,
            stats: EngineStats::default(),
            reported: Mutex::new(StatsSnapshot::default()),
        }
    }

    /// Connect the driver, build the queues and bring up the control front end.
    ///
    /// `bind` constructs the front end from `control`; the engine only becomes
    /// ready if the front end reports it is listening.
    pub fn initialize<F>(
        self: &Arc<Self>,
        driver: Arc<dyn AudioDriver>,
        control: &ControlConfig,
        bind: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&ControlConfig) -> Arc<dyn ControlFrontEnd>,
    {
        driver.set_engine(Arc::downgrade(self));
        if !driver.initialize() {
            error!("cannot connect to audio driver");
            return Err(EngineError::DriverConnect);
        }
        let sample_rate = driver.sample_rate();

        let front_end = bind(control);
        if !front_end.is_ready() {
            error!(port = control.port, "control front end failed to bind");
            return Err(EngineError::ControlBind { port: control.port });
        }

        // Nothing is published until every collaborator is up, so a failed
        // setup leaves no queue behind to accept events
        let capacity = self.config.queue_capacity;
        let (rt_tx, rt_rx) = event_queue(capacity);
        let (admin_tx, admin_rx) = event_queue(capacity);
        *self.rt_producer.lock() = Some(rt_tx);
        *self.rt_consumer.lock() = Some(rt_rx);
        *self.admin_producer.lock() = Some(admin_tx);
        *self.admin_consumer.lock() = Some(admin_rx);

        self.generator.set_sample_rate(sample_rate);
        *self.driver.write() = Some(driver);
        info!(url = %front_end.server_url(), "control front end listening");
        *self.control.write() = Some(front_end);

        self.ready.store(true, Ordering::Release);
        info!(sample_rate, capacity, "engine initialized");
        Ok(())
    }

    /// Ask the worker to stop. Returns immediately.
    pub fn quit(&self) {
        self.ready.store(false, Ordering::Release);
        self.wake(WorkerSignal::Shutdown);
        info!("engine quitting");
    }

    /// Tear down the control front end, the real-time queue and the stamping
    /// clock. Safe to call more than once.
    pub fn cleanup(&self) {
        if self.control.write().take().is_some() {
            debug!("control front end released");
        }
        *self.rt_producer.lock() = None;
        *self.rt_consumer.lock() = None;
        self.generator.reset();
        self.ready.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &EventGenerator {
        &self.generator
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn loop_count(&self) -> usize {
        self.registry.len()
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(InstanceEvent) + Send + Sync + 'static,
    {
        self.registry.subscribe(listener);
    }

    /// URL of the control front end, empty if it is not up
    pub fn control_url(&self) -> String {
        match self.control.read().as_ref() {
            Some(control) if control.is_ready() => control.server_url(),
            _ => String::new(),
        }
    }

    /// Port of the control front end, 0 if it is not up
    pub fn control_port(&self) -> u16 {
        match self.control.read().as_ref() {
            Some(control) if control.is_ready() => control.server_port(),
            _ => 0,
        }
    }

    /// Add a loop with the given channel count and maximum length.
    /// Blocks on the loop registry; never call from the audio thread.
    pub fn add_loop(&self, channels: u32, loop_secs: f32) -> Result<usize, EngineError> {
        let driver = self.driver.read().clone().ok_or(EngineError::NotInitialized)?;
        let index = self.registry.add(|index| {
            self.factory.create(&LooperParams {
                driver: &driver,
                index,
                channels,
                loop_secs,
            })
        })?;
        info!(index, channels, loop_secs, "loop added");
        Ok(index)
    }

    /// Remove a loop. Later loops move down one index.
    pub fn remove_loop(&self, index: usize) -> Result<(), EngineError> {
        self.registry.remove(index)?;
        info!(index, "loop removed");
        Ok(())
    }

    /// Current value of a control on one loop; 0.0 if there is no such loop
    pub fn control_value(&self, control: Control, instance: i32) -> f32 {
        self.registry.control_value(instance, control)
    }

    /// Real-time entry point, called by the driver once per fragment.
    ///
    /// Never blocks. While a loop is being added or removed, queued events
    /// wait for a later fragment and the loops are handled according to the
    /// configured [`ContentionPolicy`].
    pub fn process(&self, nframes: u32) -> ProcessOutcome {
        self.generator.update_fragment_time(nframes);
        self.stats.record_cycle();

        let mut instances = match self.registry.try_acquire() {
            RtAccess::Stable(instances) => instances,
            RtAccess::Mutating(mut instances) => {
                return self.contended(Some(instances.as_mut_slice()), nframes);
            }
            RtAccess::Busy => return self.contended(None, nframes),
        };
        let Some(mut queue) = self.rt_consumer.try_lock() else {
            return self.contended(Some(instances.as_mut_slice()), nframes);
        };

        let report = match queue.as_mut() {
            Some(consumer) => {
                let region = consumer.read_region();
                let report = dispatch_fragment(
                    instances.as_mut_slice(),
                    region.first(),
                    region.second(),
                    nframes,
                );
                region.commit_all();
                report
            }
            None => dispatch_fragment(instances.as_mut_slice(), &[], &[], nframes),
        };
        self.stats.record_events(report.applied, report.dropped);

        ProcessOutcome::Rendered
    }

    /// A cycle that may not deliver events. `instances` is `None` when the
    /// loops could not be reached at all.
    fn contended(&self, instances: Option<&mut [Box<dyn Looper>]>, nframes: u32) -> ProcessOutcome {
        self.stats.record_contention();
        match (self.config.contention_policy, instances) {
            (ContentionPolicy::ContinueRender, Some(instances)) => {
                dispatch_fragment(instances, &[], &[], nframes);
                ProcessOutcome::Rendered
            }
            (ContentionPolicy::ContinueRender | ContentionPolicy::RenderSilence, _) => {
                ProcessOutcome::Silence
            }
            (ContentionPolicy::SkipRender, _) => ProcessOutcome::Skipped,
        }
    }

    /// Stamp a command with the current fragment offset and queue it.
    /// False if the queue is full or the engine is not initialized.
    pub fn push_command_event(
        &self,
        event_type: EventType,
        command: Command,
        target: Target,
    ) -> bool {
        self.push_stamped(event_type, EventPayload::Command(command), target)
    }

    /// Stamp a control change with the current fragment offset and queue it.
    /// False if the queue is full or the engine is not initialized.
    pub fn push_control_event(
        &self,
        event_type: EventType,
        control: Control,
        value: f32,
        target: Target,
    ) -> bool {
        self.push_stamped(event_type, EventPayload::Control { control, value }, target)
    }

    /// Queue an event that already carries its fragment offset
    pub fn push_rt_event(&self, event: RtEvent) -> bool {
        let mut producer = self.rt_producer.lock();
        let Some(producer) = producer.as_mut() else {
            return false;
        };
        if producer.push(event).is_err() {
            debug!("event queue full, dropping event");
            return false;
        }
        true
    }

    fn push_stamped(&self, event_type: EventType, payload: EventPayload, target: Target) -> bool {
        let mut producer = self.rt_producer.lock();
        let Some(producer) = producer.as_mut() else {
            return false;
        };

        let mut region = producer.write_region();
        if region.is_empty() {
            debug!("event queue full, dropping event");
            return false;
        }
        let event = self.generator.create_event(event_type, payload, target);
        if region.push(event).is_err() {
            return false;
        }
        region.commit(1) == 1
    }

    /// Queue a request for the worker and wake it
    pub fn push_admin_event(&self, event: impl Into<AdminEvent>) -> bool {
        let event = event.into();
        let pushed = match self.admin_producer.lock().as_mut() {
            Some(producer) => match producer.push(event) {
                Ok(()) => true,
                Err(event) => {
                    debug!(kind = event.name(), "admin queue full, dropping event");
                    false
                }
            },
            None => false,
        };

        if pushed {
            self.wake(WorkerSignal::Work);
        }
        pushed
    }

    fn wake(&self, signal: WorkerSignal) {
        // A full channel already holds a wake-up
        let _ = self.wake_tx.try_send(signal);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cleanup();
    }
}
