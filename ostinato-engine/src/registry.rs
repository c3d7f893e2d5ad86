//! Ordered collection of loop instances
//!
//! Two lock disciplines meet here. The worker serializes additions and
//! removals on a mutation lock held for the whole change, and only takes the
//! instance lock for the brief moment it edits the list. The audio callback
//! never blocks: [`InstanceRegistry::try_acquire`] tells it whether the loops
//! are reachable and whether their indices are stable enough to deliver events.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::error::EngineError;
use crate::event::Control;
use crate::looper::Looper;

/// Loops in index order
pub type Instances = Vec<Box<dyn Looper>>;

/// Registry change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceEvent {
    Added(usize),
    Removed(usize),
}

type Listener = Arc<dyn Fn(InstanceEvent) + Send + Sync>;

/// Result of a non-blocking attempt to reach the loops
pub enum RtAccess<'a> {
    /// No change in progress; events may be delivered
    Stable(MutexGuard<'a, Instances>),
    /// A loop is being added or removed; loops may run, events must wait
    Mutating(MutexGuard<'a, Instances>),
    /// The list itself is locked; loops are out of reach this cycle
    Busy,
}

pub struct InstanceRegistry {
    instances: Mutex<Instances>,
    mutation: Mutex<()>,
    listeners: RwLock<Vec<Listener>>,
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(Vec::new()),
            mutation: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Tentative access for the audio thread. Never blocks.
    #[inline]
    pub fn try_acquire(&self) -> RtAccess<'_> {
        let Some(instances) = self.instances.try_lock() else {
            return RtAccess::Busy;
        };
        // While the instance guard is held the list cannot change, so the
        // gate only needs to be probed, not kept
        if self.mutation.try_lock().is_some() {
            RtAccess::Stable(instances)
        } else {
            RtAccess::Mutating(instances)
        }
    }

    /// Blocking lock on the list. Never call from the audio thread.
    pub fn lock(&self) -> MutexGuard<'_, Instances> {
        self.instances.lock()
    }

    /// Hold off additions and removals. Never call from the audio thread.
    pub fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build, activate and append a loop. `build` receives the new index.
    ///
    /// Construction and activation run outside the instance lock, so the
    /// audio thread keeps rendering the existing loops meanwhile. Listeners
    /// hear about the new loop after every lock is released.
    pub fn add<F>(&self, build: F) -> Result<usize, EngineError>
    where
        F: FnOnce(usize) -> Box<dyn Looper>,
    {
        let index = {
            let _gate = self.mutation.lock();
            let index = self.instances.lock().len();
            let mut instance = build(index);
            if !instance.activate() {
                return Err(EngineError::Activation { index });
            }
            self.instances.lock().push(instance);
            index
        };

        self.notify(InstanceEvent::Added(index));
        Ok(index)
    }

    /// Remove the loop at `index`; later loops shift down by one
    pub fn remove(&self, index: usize) -> Result<(), EngineError> {
        {
            let _gate = self.mutation.lock();
            let removed = {
                let mut instances = self.instances.lock();
                let len = instances.len();
                if index >= len {
                    return Err(EngineError::NoSuchInstance { index, len });
                }
                instances.remove(index)
            };
            // Freed outside the instance lock so the audio thread is not held up by teardown
            drop(removed);
        }

        self.notify(InstanceEvent::Removed(index));
        Ok(())
    }

    /// Current value of a control, 0.0 for an index that does not exist
    pub fn control_value(&self, index: i32, control: Control) -> f32 {
        let instances = self.instances.lock();
        usize::try_from(index)
            .ok()
            .and_then(|i| instances.get(i))
            .map_or(0.0, |instance| instance.control_value(control))
    }

    /// Register a listener. It runs synchronously on the mutating thread and
    /// may call back into the registry, including `subscribe`.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(InstanceEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    fn notify(&self, event: InstanceEvent) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(event);
        }
    }
}
