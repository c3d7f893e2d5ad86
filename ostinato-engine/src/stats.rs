//! Counters written by the audio thread and read elsewhere
//!
//! The callback may not log, so it only bumps these; the worker turns changes
//! into log lines.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineStats {
    cycles: AtomicU64,
    contended_cycles: AtomicU64,
    applied_events: AtomicU64,
    dropped_events: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Audio callbacks processed
    pub cycles: u64,
    /// Callbacks skipped because the loop registry was busy
    pub contended_cycles: u64,
    /// Events delivered to loops (one per event, not per loop)
    pub applied_events: u64,
    /// Events discarded for a stale or out-of-range offset
    pub dropped_events: u64,
}

impl EngineStats {
    #[inline]
    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_contention(&self) {
        self.contended_cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_events(&self, applied: usize, dropped: usize) {
        if applied > 0 {
            self.applied_events.fetch_add(applied as u64, Ordering::Relaxed);
        }
        if dropped > 0 {
            self.dropped_events.fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            contended_cycles: self.contended_cycles.load(Ordering::Relaxed),
            applied_events: self.applied_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}
