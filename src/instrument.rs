//! Timing instrumentation for device operations
//!
//! Every buffer transfer and kernel dispatch issued by a
//! [`DeviceBackend`](crate::backend::DeviceBackend) is wrapped in
//! [`Instrument::time`]. Two implementations exist:
//!
//! - [`NoopInstrument`] runs the wrapped work and nothing else. It reads no
//!   clock and holds no state, so instrumented code compiles down to the
//!   bare operation.
//! - [`Recorder`] measures wall-clock time, emits every sample through
//!   `log::debug!`, keeps exact per-phase totals and retains the most recent
//!   [`MAX_RECORDED_SAMPLES`] samples.
//!
//! [`DefaultInstrument`] picks between them with the `instrument` cargo
//! feature.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::constants::MAX_RECORDED_SAMPLES;

/// What kind of work a timing sample covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Host to device or device to host copy
    Transfer,
    /// Kernel dispatch, measured until the device signals completion
    Kernel,
    /// Host-side work between device steps
    Host,
}

impl Phase {
    const COUNT: usize = 3;

    fn slot(self) -> usize {
        match self {
            Phase::Transfer => 0,
            Phase::Kernel => 1,
            Phase::Host => 2,
        }
    }
}

/// One recorded sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub label: &'static str,
    pub phase: Phase,
    pub elapsed: Duration,
}

/// Sink for timing samples
pub trait Instrument: Send + Sync {
    /// Records one finished sample
    fn record(&self, label: &'static str, phase: Phase, elapsed: Duration);

    /// Runs `f` and records how long it took
    fn time<T, F: FnOnce() -> T>(&self, label: &'static str, phase: Phase, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.record(label, phase, start.elapsed());
        result
    }
}

/// Instrument that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrument;

impl Instrument for NoopInstrument {
    #[inline(always)]
    fn record(&self, _label: &'static str, _phase: Phase, _elapsed: Duration) {}

    #[inline(always)]
    fn time<T, F: FnOnce() -> T>(&self, _label: &'static str, _phase: Phase, f: F) -> T {
        f()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PhaseTotal {
    count: usize,
    elapsed: Duration,
}

#[derive(Debug, Default)]
struct Samples {
    recent: VecDeque<Timing>,
    totals: [PhaseTotal; Phase::COUNT],
}

/// Instrument that aggregates samples in memory
///
/// Counts and totals cover every sample since the last [`clear`](Self::clear);
/// the sample list only keeps the most recent ones.
#[derive(Debug, Default)]
pub struct Recorder {
    samples: Mutex<Samples>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the retained samples, oldest first
    pub fn samples(&self) -> Vec<Timing> {
        self.lock().recent.iter().cloned().collect()
    }

    /// Sum of the recorded durations for one phase
    pub fn total(&self, phase: Phase) -> Duration {
        self.lock().totals[phase.slot()].elapsed
    }

    /// Number of samples recorded for one phase
    pub fn count(&self, phase: Phase) -> usize {
        self.lock().totals[phase.slot()].count
    }

    /// Drops all samples and totals
    pub fn clear(&self) {
        *self.lock() = Samples::default();
    }

    fn lock(&self) -> MutexGuard<'_, Samples> {
        // A poisoned sample list is still a valid list
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Instrument for Recorder {
    fn record(&self, label: &'static str, phase: Phase, elapsed: Duration) {
        log::debug!("{:?} {}: {:.3?}", phase, label, elapsed);
        let mut samples = self.lock();

        let total = &mut samples.totals[phase.slot()];
        total.count += 1;
        total.elapsed += elapsed;

        if samples.recent.len() == MAX_RECORDED_SAMPLES {
            samples.recent.pop_front();
        }
        samples.recent.push_back(Timing {
            label,
            phase,
            elapsed,
        });
    }
}

/// Instrument used when none is given explicitly
#[cfg(feature = "instrument")]
pub type DefaultInstrument = Recorder;

/// Instrument used when none is given explicitly
#[cfg(not(feature = "instrument"))]
pub type DefaultInstrument = NoopInstrument;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_runs_closure() {
        let noop = NoopInstrument;
        let value = noop.time("noop", Phase::Host, || 21 * 2);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_recorder_collects_samples() {
        let recorder = Recorder::new();
        recorder.time("upload", Phase::Transfer, || ());
        recorder.time("kron_fill", Phase::Kernel, || ());
        recorder.record("download", Phase::Transfer, Duration::from_millis(2));

        assert_eq!(recorder.count(Phase::Transfer), 2);
        assert_eq!(recorder.count(Phase::Kernel), 1);
        assert!(recorder.total(Phase::Transfer) >= Duration::from_millis(2));

        let labels: Vec<_> = recorder.samples().iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["upload", "kron_fill", "download"]);

        recorder.clear();
        assert!(recorder.samples().is_empty());
    }

    #[test]
    fn test_recorder_bounds_retained_samples() {
        let recorder = Recorder::new();
        let extra = 10;
        for _ in 0..MAX_RECORDED_SAMPLES + extra {
            recorder.record("upload", Phase::Transfer, Duration::from_micros(1));
        }
        recorder.record("mxm_fill", Phase::Kernel, Duration::from_micros(5));

        assert_eq!(recorder.count(Phase::Transfer), MAX_RECORDED_SAMPLES + extra);
        assert_eq!(
            recorder.total(Phase::Transfer),
            Duration::from_micros((MAX_RECORDED_SAMPLES + extra) as u64)
        );

        let samples = recorder.samples();
        assert_eq!(samples.len(), MAX_RECORDED_SAMPLES);
        assert_eq!(samples.last().map(|t| t.label), Some("mxm_fill"));

        recorder.clear();
        assert_eq!(recorder.count(Phase::Transfer), 0);
        assert!(recorder.samples().is_empty());
    }
}
