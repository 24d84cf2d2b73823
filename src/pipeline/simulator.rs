//! Timer-driven simulation of one pipeline run for the overview lesson.
//!
//! [`SimulatorState`] is a plain value with pure transitions. [`PipelineSimulator`]
//! hosts the current value, arms the scheduled transitions on a [`TimerTable`]
//! and publishes every phase change on a watch channel.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::config::TimingsConfig;
use crate::observability::PIPELINE_RUNS;
use crate::scheduler::{lock, TimerTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Done,
}

impl PipelinePhase {
    /// A new run may only begin from a resting phase.
    pub fn can_start(self) -> bool {
        matches!(self, PipelinePhase::Idle | PipelinePhase::Done)
    }

    pub fn is_running(self) -> bool {
        !self.can_start()
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelinePhase::Idle => "idle",
            PipelinePhase::Extracting => "extracting",
            PipelinePhase::Transforming => "transforming",
            PipelinePhase::Loading => "loading",
            PipelinePhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Offsets of the scheduled phase changes, all measured from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub transforming_at: Duration,
    pub loading_at: Duration,
    pub done_at: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self::from(&TimingsConfig::default())
    }
}

impl From<&TimingsConfig> for PhaseTimings {
    fn from(config: &TimingsConfig) -> Self {
        Self {
            transforming_at: Duration::from_millis(config.extract_to_transform_ms),
            loading_at: Duration::from_millis(config.transform_to_load_ms),
            done_at: Duration::from_millis(config.load_to_done_ms),
        }
    }
}

/// A phase change to apply once `after` has elapsed since the run started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledPhase {
    pub run: u64,
    pub after: Duration,
    pub phase: PipelinePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorState {
    pub phase: PipelinePhase,
    /// Generation of the active run; bumped by every start and reset.
    pub run: u64,
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            phase: PipelinePhase::Idle,
            run: 0,
        }
    }
}

impl SimulatorState {
    /// Enter `extracting` and return the transitions to arm. From a running
    /// phase this is a no-op and nothing is scheduled.
    pub fn start(self, timings: &PhaseTimings) -> (Self, Vec<ScheduledPhase>) {
        if !self.phase.can_start() {
            return (self, Vec::new());
        }
        let run = self.run + 1;
        let scheduled = vec![
            ScheduledPhase { run, after: timings.transforming_at, phase: PipelinePhase::Transforming },
            ScheduledPhase { run, after: timings.loading_at, phase: PipelinePhase::Loading },
            ScheduledPhase { run, after: timings.done_at, phase: PipelinePhase::Done },
        ];
        (Self { phase: PipelinePhase::Extracting, run }, scheduled)
    }

    /// Apply a scheduled transition; transitions from an earlier run are dropped.
    pub fn fire(self, scheduled: ScheduledPhase) -> Self {
        if scheduled.run != self.run || !self.phase.is_running() {
            return self;
        }
        Self { phase: scheduled.phase, ..self }
    }

    pub fn reset(self) -> Self {
        Self {
            phase: PipelinePhase::Idle,
            run: self.run + 1,
        }
    }
}

/// What the overview lesson draws for a given phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewView {
    pub phase: PipelinePhase,
    pub source_active: bool,
    pub transform_active: bool,
    pub destination_active: bool,
    pub destination_filled: bool,
    pub packet_visible: bool,
    pub can_start: bool,
    pub button_label: &'static str,
}

impl OverviewView {
    pub fn for_phase(phase: PipelinePhase) -> Self {
        let button_label = match phase {
            PipelinePhase::Idle => "Run Pipeline Job",
            PipelinePhase::Done => "Reset Pipeline",
            _ => "Processing...",
        };
        Self {
            phase,
            source_active: phase == PipelinePhase::Extracting,
            transform_active: phase == PipelinePhase::Transforming,
            destination_active: matches!(phase, PipelinePhase::Loading | PipelinePhase::Done),
            destination_filled: phase == PipelinePhase::Done,
            packet_visible: phase.is_running(),
            can_start: phase.can_start(),
            button_label,
        }
    }
}

/// Hosts a [`SimulatorState`] and drives its scheduled transitions.
pub struct PipelineSimulator {
    state: Arc<Mutex<SimulatorState>>,
    timers: Mutex<TimerTable>,
    tx: Arc<watch::Sender<PipelinePhase>>,
    timings: PhaseTimings,
}

impl PipelineSimulator {
    pub fn new(timings: PhaseTimings) -> Self {
        let (tx, _rx) = watch::channel(PipelinePhase::Idle);
        Self {
            state: Arc::new(Mutex::new(SimulatorState::default())),
            timers: Mutex::new(TimerTable::new("pipeline_simulator")),
            tx: Arc::new(tx),
            timings,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        lock(&self.state).phase
    }

    pub fn view(&self) -> OverviewView {
        OverviewView::for_phase(self.phase())
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelinePhase> {
        self.tx.subscribe()
    }

    /// Begin a run. Returns `false` when a run is already in progress.
    #[instrument(skip(self))]
    pub fn start(&self) -> bool {
        let mut timers = lock(&self.timers);
        let scheduled = {
            let mut state = lock(&self.state);
            let (next, scheduled) = state.start(&self.timings);
            if scheduled.is_empty() {
                debug!("Ignoring start while pipeline is {}", state.phase);
                return false;
            }
            *state = next;
            self.tx.send_replace(next.phase);
            scheduled
        };

        // Timers left over from a finished run are inert but still tracked
        timers.cancel_all();
        for transition in scheduled {
            let shared = self.state.clone();
            let tx = self.tx.clone();
            timers.schedule(transition.after, move || {
                let mut state = lock(&shared);
                let next = state.fire(transition);
                if next != *state {
                    *state = next;
                    debug!(run = next.run, "Pipeline entered {}", next.phase);
                    tx.send_replace(next.phase);
                }
            });
        }

        counter!(PIPELINE_RUNS).increment(1);
        info!("🚀 Pipeline run started");
        true
    }

    /// Start a run and return a receiver that has already seen the
    /// `extracting` phase, so its first change is the next phase.
    pub fn start_and_watch(&self) -> Option<watch::Receiver<PipelinePhase>> {
        let mut rx = self.tx.subscribe();
        if !self.start() {
            return None;
        }
        let _ = rx.borrow_and_update();
        Some(rx)
    }

    #[instrument(skip(self))]
    pub fn reset(&self) {
        let mut timers = lock(&self.timers);
        timers.cancel_all();
        let mut state = lock(&self.state);
        *state = state.reset();
        self.tx.send_replace(state.phase);
        info!("🔄 Pipeline reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_start_schedules_three_transitions_from_start() {
        let timings = PhaseTimings::default();
        let (state, scheduled) = SimulatorState::default().start(&timings);
        assert_eq!(state.phase, PipelinePhase::Extracting);
        let offsets: Vec<_> = scheduled.iter().map(|s| (s.after, s.phase)).collect();
        assert_eq!(
            offsets,
            vec![
                (ms(1500), PipelinePhase::Transforming),
                (ms(3500), PipelinePhase::Loading),
                (ms(5000), PipelinePhase::Done),
            ]
        );
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let timings = PhaseTimings::default();
        let (running, _) = SimulatorState::default().start(&timings);
        let (again, scheduled) = running.start(&timings);
        assert_eq!(again, running);
        assert!(scheduled.is_empty());
    }

    #[test]
    fn test_stale_transition_is_dropped_after_reset() {
        let timings = PhaseTimings::default();
        let (running, scheduled) = SimulatorState::default().start(&timings);
        let reset = running.reset();
        assert_eq!(reset.fire(scheduled[0]).phase, PipelinePhase::Idle);
    }

    #[test]
    fn test_restart_from_done() {
        let timings = PhaseTimings::default();
        let (mut state, scheduled) = SimulatorState::default().start(&timings);
        for s in &scheduled {
            state = state.fire(*s);
        }
        assert_eq!(state.phase, PipelinePhase::Done);

        let (restarted, next) = state.start(&timings);
        assert_eq!(restarted.phase, PipelinePhase::Extracting);
        assert_eq!(next.len(), 3);
        // Transitions from the first run no longer apply
        assert_eq!(restarted.fire(scheduled[2]), restarted);
    }

    #[test]
    fn test_overview_view_flags() {
        let idle = OverviewView::for_phase(PipelinePhase::Idle);
        assert!(idle.can_start && !idle.packet_visible);
        assert_eq!(idle.button_label, "Run Pipeline Job");

        let transforming = OverviewView::for_phase(PipelinePhase::Transforming);
        assert!(transforming.transform_active && !transforming.source_active);
        assert_eq!(transforming.button_label, "Processing...");

        let done = OverviewView::for_phase(PipelinePhase::Done);
        assert!(done.destination_active && done.destination_filled && !done.packet_visible);
        assert_eq!(done.button_label, "Reset Pipeline");
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulator_walks_all_phases() {
        let sim = PipelineSimulator::new(PhaseTimings::default());
        assert!(sim.start());
        assert_eq!(sim.phase(), PipelinePhase::Extracting);

        tokio::time::sleep(ms(1600)).await;
        assert_eq!(sim.phase(), PipelinePhase::Transforming);
        tokio::time::sleep(ms(2000)).await;
        assert_eq!(sim.phase(), PipelinePhase::Loading);
        tokio::time::sleep(ms(1500)).await;
        assert_eq!(sim.phase(), PipelinePhase::Done);
        assert!(sim.view().can_start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_transforming_cancels_timers() {
        let sim = PipelineSimulator::new(PhaseTimings::default());
        let mut rx = sim.subscribe();
        sim.start();
        tokio::time::sleep(ms(2000)).await;
        assert_eq!(sim.phase(), PipelinePhase::Transforming);

        sim.reset();
        assert_eq!(sim.phase(), PipelinePhase::Idle);
        let _ = rx.borrow_and_update();

        tokio::time::sleep(ms(10_000)).await;
        assert_eq!(sim.phase(), PipelinePhase::Idle);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_reports_each_phase_after_extracting_once() {
        let sim = PipelineSimulator::new(PhaseTimings::default());
        let mut rx = sim.start_and_watch().unwrap();
        assert!(sim.start_and_watch().is_none());

        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let phase = *rx.borrow_and_update();
            seen.push(phase);
            if phase == PipelinePhase::Done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![PipelinePhase::Transforming, PipelinePhase::Loading, PipelinePhase::Done]
        );
    }
}
