//! Sample-accurate event dispatch for one fragment
//!
//! Loops are rendered piecewise: up to the offset of each event, then the event
//! is applied, then on to the next one. Every loop therefore sees a change at
//! the exact frame it was stamped for.

use crate::event::RtEvent;
use crate::looper::Looper;

/// What happened to the events of one fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FragmentReport {
    /// Events applied (each counted once, however many loops it reached)
    pub applied: usize,
    /// Events skipped for a stale or out-of-range offset
    pub dropped: usize,
}

/// Render `nframes` frames of every loop, interleaving `events` at their offsets.
///
/// Events are taken in queue order, `first` then `second`. An event whose
/// offset lies behind what has already been rendered, or at or beyond the
/// end of the fragment, is dropped without touching any loop.
///
/// Runs on the audio thread: no allocation, no locking, no logging.
pub fn dispatch_fragment(
    instances: &mut [Box<dyn Looper>],
    first: &[RtEvent],
    second: &[RtEvent],
    nframes: u32,
) -> FragmentReport {
    let mut report = FragmentReport::default();
    let mut used = 0u32;

    for event in first.iter().chain(second) {
        let offset = event.fragment_offset;
        if offset < used || offset >= nframes {
            report.dropped += 1;
            continue;
        }

        let frames = offset - used;
        for (index, instance) in instances.iter_mut().enumerate() {
            instance.run(used, frames);
            if event.target.matches(index) {
                instance.apply_event(event);
            }
        }
        used += frames;
        report.applied += 1;
    }

    // The rest of the fragment; the whole of it when nothing was pending
    for instance in instances.iter_mut() {
        instance.run(used, nframes - used);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Command, Control, EventType, Target};
    use crate::testing::{applies, recording_loops, runs, CallLog};

    fn hit(target: Target, offset: u32) -> RtEvent {
        RtEvent::command(EventType::CommandHit, Command::Record, target, offset)
    }

    fn spans_for(log: &CallLog, id: usize) -> Vec<(u32, u32)> {
        runs(log)
            .into_iter()
            .filter(|(run_id, _, _)| *run_id == id)
            .map(|(_, offset, nframes)| (offset, nframes))
            .collect()
    }

    #[test]
    fn test_no_events_renders_whole_fragment() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 2);

        let report = dispatch_fragment(&mut loops, &[], &[], 256);

        assert_eq!(report, FragmentReport::default());
        assert_eq!(runs(&log), vec![(0, 0, 256), (1, 0, 256)]);
        assert!(applies(&log).is_empty());
    }

    #[test]
    fn test_events_partition_fragment() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 2);
        let events = [hit(Target::All, 10), hit(Target::All, 100), hit(Target::All, 200)];

        let report = dispatch_fragment(&mut loops, &events, &[], 256);
        assert_eq!(report.applied, 3);
        assert_eq!(report.dropped, 0);

        for id in 0..2 {
            let spans = spans_for(&log, id);
            assert_eq!(spans, vec![(0, 10), (10, 90), (100, 100), (200, 56)]);
            // Spans are contiguous and cover the fragment exactly once
            let mut cursor = 0;
            for (offset, nframes) in &spans {
                assert_eq!(*offset, cursor);
                cursor += nframes;
            }
            assert_eq!(cursor, 256);
        }
    }

    #[test]
    fn test_events_applied_in_offset_order_after_rendering_up_to_them() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 1);
        let early = hit(Target::All, 5);
        let late =
            RtEvent::control(EventType::ControlChange, Control::Feedback, 0.5, Target::All, 50);

        dispatch_fragment(&mut loops, &[early, late], &[], 64);

        use crate::testing::LoopCall::*;
        assert_eq!(
            *log.lock(),
            vec![
                Run { id: 0, offset: 0, nframes: 5 },
                Apply { id: 0, event: early },
                Run { id: 0, offset: 5, nframes: 45 },
                Apply { id: 0, event: late },
                Run { id: 0, offset: 50, nframes: 14 },
            ]
        );
    }

    #[test]
    fn test_targeted_event_reaches_only_its_loop() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 3);
        let event = hit(Target::Instance(1), 32);

        dispatch_fragment(&mut loops, &[event], &[], 128);

        assert_eq!(applies(&log), vec![(1, event)]);
        // All loops still rendered up to and past the event
        for id in 0..3 {
            assert_eq!(spans_for(&log, id), vec![(0, 32), (32, 96)]);
        }
    }

    #[test]
    fn test_broadcast_reaches_every_loop() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 3);
        let event = hit(Target::All, 0);

        dispatch_fragment(&mut loops, &[event], &[], 128);

        assert_eq!(applies(&log), vec![(0, event), (1, event), (2, event)]);
    }

    #[test]
    fn test_target_beyond_registry_applies_nowhere() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 2);

        let report = dispatch_fragment(&mut loops, &[hit(Target::Instance(7), 3)], &[], 16);

        assert_eq!(report.applied, 1);
        assert!(applies(&log).is_empty());
    }

    #[test]
    fn test_out_of_range_offset_dropped() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 2);

        let report = dispatch_fragment(&mut loops, &[hit(Target::All, 256)], &[], 256);

        assert_eq!(report, FragmentReport { applied: 0, dropped: 1 });
        assert!(applies(&log).is_empty());
        assert_eq!(runs(&log), vec![(0, 0, 256), (1, 0, 256)]);
    }

    #[test]
    fn test_stale_offset_dropped() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 1);
        let first = hit(Target::All, 100);
        let stale = hit(Target::All, 40);
        let later = hit(Target::All, 120);

        let report = dispatch_fragment(&mut loops, &[first, stale, later], &[], 256);

        assert_eq!(report, FragmentReport { applied: 2, dropped: 1 });
        assert_eq!(applies(&log), vec![(0, first), (0, later)]);
        assert_eq!(spans_for(&log, 0), vec![(0, 100), (100, 20), (120, 136)]);
    }

    #[test]
    fn test_same_offset_events_both_apply() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 1);
        let a = hit(Target::All, 64);
        let b = hit(Target::All, 64);

        let report = dispatch_fragment(&mut loops, &[a, b], &[], 128);

        assert_eq!(report.applied, 2);
        assert_eq!(spans_for(&log, 0), vec![(0, 64), (64, 0), (64, 64)]);
    }

    #[test]
    fn test_second_span_continues_first() {
        let log = CallLog::default();
        let mut loops = recording_loops(&log, 1);
        let a = hit(Target::All, 8);
        let b = hit(Target::All, 24);

        dispatch_fragment(&mut loops, &[a], &[b], 32);

        assert_eq!(applies(&log), vec![(0, a), (0, b)]);
        assert_eq!(spans_for(&log, 0), vec![(0, 8), (8, 16), (24, 8)]);
    }

    #[test]
    fn test_empty_registry_consumes_events() {
        let mut loops: Vec<Box<dyn Looper>> = Vec::new();
        let report = dispatch_fragment(&mut loops, &[hit(Target::All, 1)], &[], 8);
        assert_eq!(report.applied, 1);
    }
}
