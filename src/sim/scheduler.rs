//! Fixed-timestep scheduler
//!
//! Decouples deterministic game logic from the host's variable frame rate:
//! the host delivers one `frame(now_ms, ..)` notification per displayed
//! frame, the scheduler drains an accumulator in fixed steps, invoking
//! `update(step)` per drain, then `render()` exactly once per frame.
//!
//! All timestamps come from the host; the scheduler never reads a clock.
//! Feeding a scripted delta sequence reproduces a run exactly.

use log::{debug, warn};

use super::{CallbackError, SimError};
use crate::consts::{DEFAULT_PANIC_THRESHOLD_MS, DEFAULT_TICK_HZ, MS_PER_SEC};

/// Game-logic callbacks driven by the scheduler.
///
/// Input intents must be resolved before `update` runs (the core has no
/// opinion on polling vs events). `render` gets a read-only view of the
/// world; it must not advance simulation state.
pub trait Simulation {
    /// Advance game logic by exactly one fixed step (milliseconds).
    fn update(&mut self, step_ms: f64) -> Result<(), CallbackError>;

    /// Draw the current state. Called once per frame notification,
    /// regardless of how many update steps ran.
    fn render(&mut self) -> Result<(), CallbackError>;
}

/// Loop lifecycle state.
///
/// `Idle -> Running` on the first start; `Running <-> Paused`;
/// `Running | Paused -> Stopped` on stop or callback failure; `Stopped ->
/// Running` on a fresh start, which re-seeds the time bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// What one frame notification did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Fixed steps executed this frame
    pub updates: u32,
    /// Whether render ran (always true for a delivered frame)
    pub rendered: bool,
    /// Whether the raw delta tripped the panic threshold
    pub clamped: bool,
    /// Simulated time still unconsumed after this frame
    pub accumulator_ms: f64,
}

/// Fixed-timestep loop driver.
pub struct Scheduler {
    state: LoopState,
    fixed_step_ms: f64,
    panic_threshold_ms: f64,
    accumulator_ms: f64,
    last_timestamp_ms: f64,
}

impl Scheduler {
    /// 60 Hz, 300 ms panic threshold.
    pub fn with_defaults() -> Self {
        // Defaults are known-valid
        Self::new(DEFAULT_TICK_HZ, DEFAULT_PANIC_THRESHOLD_MS)
            .unwrap_or_else(|_| unreachable!("default scheduler config is valid"))
    }

    /// Fails with a configuration error unless `target_hz` and
    /// `panic_threshold_ms` are positive and finite.
    pub fn new(target_hz: f64, panic_threshold_ms: f64) -> Result<Self, SimError> {
        let mut sched = Scheduler {
            state: LoopState::Idle,
            fixed_step_ms: 0.0,
            panic_threshold_ms: 0.0,
            accumulator_ms: 0.0,
            last_timestamp_ms: 0.0,
        };
        sched.set_target_rate(target_hz)?;
        sched.set_panic_threshold(panic_threshold_ms)?;
        Ok(sched)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn fixed_step_ms(&self) -> f64 {
        self.fixed_step_ms
    }

    pub fn accumulator_ms(&self) -> f64 {
        self.accumulator_ms
    }

    /// Whether the host should keep delivering frame notifications. Becomes
    /// true on start and false on stop (the "cancel pending frame request"
    /// half of the host contract).
    pub fn wants_frame(&self) -> bool {
        matches!(self.state, LoopState::Running | LoopState::Paused)
    }

    /// Begin (or restart) the loop at host time `now_ms`: zeroes the
    /// accumulator, seeds the last-frame timestamp and transitions to
    /// Running. No-op if already Running.
    pub fn start(&mut self, now_ms: f64) {
        if self.state == LoopState::Running {
            return;
        }
        self.accumulator_ms = 0.0;
        self.last_timestamp_ms = now_ms;
        self.state = LoopState::Running;
        debug!(
            "loop started at {now_ms:.1} ms (step {:.3} ms)",
            self.fixed_step_ms
        );
    }

    /// Stop the loop. Terminal until the next `start`. Idempotent; never
    /// interrupts a frame in flight (everything here is single-threaded).
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            debug!("loop stopped");
        }
        self.state = LoopState::Stopped;
    }

    /// Freeze game logic. Frame notifications keep being consumed while
    /// paused so wall-clock bookkeeping stays current. Valid only while
    /// Running.
    pub fn pause(&mut self) -> Result<(), SimError> {
        if self.state != LoopState::Running {
            return Err(SimError::State {
                op: "pause",
                state: self.state,
            });
        }
        self.state = LoopState::Paused;
        Ok(())
    }

    /// Resume from pause. Valid only while Paused.
    pub fn resume(&mut self) -> Result<(), SimError> {
        if self.state != LoopState::Paused {
            return Err(SimError::State {
                op: "resume",
                state: self.state,
            });
        }
        self.state = LoopState::Running;
        Ok(())
    }

    /// Change the logic tick rate. Fails unless `hz` is positive and finite.
    pub fn set_target_rate(&mut self, hz: f64) -> Result<(), SimError> {
        if !(hz > 0.0 && hz.is_finite()) {
            return Err(SimError::Config(format!(
                "target tick rate must be positive, got {hz}"
            )));
        }
        self.fixed_step_ms = MS_PER_SEC / hz;
        Ok(())
    }

    /// Change the stall clamp. Fails unless `ms` is positive and finite.
    /// Conventionally several times the fixed step.
    pub fn set_panic_threshold(&mut self, ms: f64) -> Result<(), SimError> {
        if !(ms > 0.0 && ms.is_finite()) {
            return Err(SimError::Config(format!(
                "panic threshold must be positive, got {ms} ms"
            )));
        }
        self.panic_threshold_ms = ms;
        Ok(())
    }

    /// Frame notification entry point; the host calls this once per
    /// displayed frame with its current timestamp.
    ///
    /// Running: drains the accumulator in fixed steps (calling
    /// `sim.update`), then calls `sim.render` exactly once. A raw delta over
    /// the panic threshold contributes exactly one step's worth of time;
    /// the rest of the stall is deliberately lost rather than replayed,
    /// which is what prevents the spiral of death.
    ///
    /// Paused: consumes the timestamp (no delta is banked, so resuming does
    /// not burst) and still renders once.
    ///
    /// Idle/Stopped: state error; the host was asked not to deliver frames.
    ///
    /// Any error from `update` or `render` stops the loop and is re-raised
    /// as [`SimError::Callback`]. No partial-tick recovery.
    pub fn frame(&mut self, now_ms: f64, sim: &mut impl Simulation) -> Result<FrameReport, SimError> {
        if !self.wants_frame() {
            return Err(SimError::State {
                op: "frame",
                state: self.state,
            });
        }

        // Host clocks are not trusted to be monotonic; a backwards step
        // contributes no time.
        let raw_delta = (now_ms - self.last_timestamp_ms).max(0.0);
        self.last_timestamp_ms = now_ms;

        if self.state == LoopState::Paused {
            if let Err(source) = sim.render() {
                return Err(self.fail("render", source));
            }
            return Ok(FrameReport {
                updates: 0,
                rendered: true,
                clamped: false,
                accumulator_ms: self.accumulator_ms,
            });
        }

        let clamped = raw_delta > self.panic_threshold_ms;
        let delta = if clamped {
            warn!(
                "frame delta {raw_delta:.1} ms over panic threshold {:.1} ms, clamped to one step",
                self.panic_threshold_ms
            );
            self.fixed_step_ms
        } else {
            raw_delta
        };
        self.accumulator_ms += delta;

        let mut updates = 0u32;
        while self.accumulator_ms >= self.fixed_step_ms {
            if let Err(source) = sim.update(self.fixed_step_ms) {
                return Err(self.fail("update", source));
            }
            self.accumulator_ms -= self.fixed_step_ms;
            updates += 1;
        }

        if let Err(source) = sim.render() {
            return Err(self.fail("render", source));
        }

        Ok(FrameReport {
            updates,
            rendered: true,
            clamped,
            accumulator_ms: self.accumulator_ms,
        })
    }

    /// Fail-fast path for callback errors: halt, then re-raise.
    fn fail(&mut self, phase: &'static str, source: CallbackError) -> SimError {
        warn!("{phase} callback failed, stopping loop: {source}");
        self.state = LoopState::Stopped;
        SimError::Callback { phase, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Records every callback invocation.
    #[derive(Default)]
    struct Recorder {
        updates: Vec<f64>,
        renders: u32,
        fail_update: bool,
        fail_render: bool,
    }

    impl Simulation for Recorder {
        fn update(&mut self, step_ms: f64) -> Result<(), crate::sim::CallbackError> {
            if self.fail_update {
                return Err("update exploded".into());
            }
            self.updates.push(step_ms);
            Ok(())
        }

        fn render(&mut self) -> Result<(), crate::sim::CallbackError> {
            if self.fail_render {
                return Err("render exploded".into());
            }
            self.renders += 1;
            Ok(())
        }
    }

    fn sched_60hz() -> Scheduler {
        let mut s = Scheduler::new(60.0, 300.0).unwrap();
        s.start(0.0);
        s
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Scheduler::new(0.0, 300.0).is_err());
        assert!(Scheduler::new(-60.0, 300.0).is_err());
        assert!(Scheduler::new(f64::NAN, 300.0).is_err());
        assert!(Scheduler::new(60.0, 0.0).is_err());

        let mut s = Scheduler::with_defaults();
        assert!(s.set_target_rate(-1.0).is_err());
        assert!(s.set_panic_threshold(f64::INFINITY).is_err());
    }

    #[test]
    fn test_fifty_ms_frame_runs_two_updates_at_60hz() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();

        let report = s.frame(50.0, &mut sim).unwrap();
        assert_eq!(report.updates, 2);
        assert_eq!(sim.updates.len(), 2);
        // 50 - 2 * 16.667 leaves about one step in the bank
        assert!((report.accumulator_ms - (50.0 - 2.0 * s.fixed_step_ms())).abs() < 1e-9);
        assert!((report.accumulator_ms - 16.6667).abs() < 0.01);
    }

    #[test]
    fn test_stall_is_clamped_to_one_step() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();

        // 500 ms stall with a 300 ms threshold: one update, not ~30
        let report = s.frame(500.0, &mut sim).unwrap();
        assert!(report.clamped);
        assert_eq!(report.updates, 1);
        assert!(report.accumulator_ms.abs() < 1e-9);

        // The clamp is per-frame: the next ordinary frame is unaffected
        let report = s.frame(516.0, &mut sim).unwrap();
        assert!(!report.clamped);
    }

    #[test]
    fn test_render_runs_exactly_once_per_frame() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();

        s.frame(5.0, &mut sim).unwrap(); // zero updates
        s.frame(25.0, &mut sim).unwrap(); // one update
        s.frame(125.0, &mut sim).unwrap(); // many updates
        assert_eq!(sim.renders, 3);
        assert_eq!(sim.updates.len(), (125.0 / s.fixed_step_ms()) as usize);
    }

    #[test]
    fn test_every_update_gets_the_fixed_step() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();
        for now in [7.0, 19.0, 77.0, 200.0] {
            s.frame(now, &mut sim).unwrap();
        }
        let step = s.fixed_step_ms();
        assert!(sim.updates.iter().all(|&d| d == step));
    }

    #[test]
    fn test_pause_freezes_logic_without_banking_time() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();

        s.frame(16.0, &mut sim).unwrap();
        s.pause().unwrap();

        // A long paused stretch: timestamps consumed, renders continue,
        // nothing accumulates
        let report = s.frame(2016.0, &mut sim).unwrap();
        assert_eq!(report.updates, 0);
        assert!(report.rendered);

        s.resume().unwrap();
        // Only 17 ms of wall clock since the last consumed timestamp: one
        // step, no two-second burst
        let report = s.frame(2033.0, &mut sim).unwrap();
        assert_eq!(report.updates, 1);
    }

    #[test]
    fn test_pause_resume_state_errors() {
        let mut s = Scheduler::with_defaults();
        assert!(s.pause().is_err()); // Idle
        assert!(s.resume().is_err());

        s.start(0.0);
        assert!(s.resume().is_err()); // Running
        s.pause().unwrap();
        assert!(s.pause().is_err()); // Paused
        s.resume().unwrap();
    }

    #[test]
    fn test_stop_cancels_frames_and_start_reseeds() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();
        s.frame(20.0, &mut sim).unwrap();
        assert!(s.accumulator_ms() > 0.0);

        s.stop();
        assert!(!s.wants_frame());
        assert!(matches!(
            s.frame(40.0, &mut sim),
            Err(SimError::State { op: "frame", .. })
        ));

        // Restart long after the stop: accumulator is zeroed and the
        // timestamp re-seeded, so no time debt carries over
        s.start(10_000.0);
        assert_eq!(s.accumulator_ms(), 0.0);
        let report = s.frame(10_016.0, &mut sim).unwrap();
        assert_eq!(report.updates, 0);
    }

    #[test]
    fn test_start_while_running_is_a_noop() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();
        s.frame(10.0, &mut sim).unwrap();
        let banked = s.accumulator_ms();

        s.start(999.0);
        assert_eq!(s.accumulator_ms(), banked);
        // Timestamp untouched as well: the next delta still counts from 10
        let report = s.frame(26.0, &mut sim).unwrap();
        assert_eq!(report.updates, 1);
    }

    #[test]
    fn test_update_error_stops_the_loop() {
        let mut s = sched_60hz();
        let mut sim = Recorder {
            fail_update: true,
            ..Default::default()
        };

        let err = s.frame(20.0, &mut sim).unwrap_err();
        assert!(matches!(err, SimError::Callback { phase: "update", .. }));
        assert_eq!(s.state(), LoopState::Stopped);
        // Fail-fast: render never ran that frame
        assert_eq!(sim.renders, 0);

        // Stopped is terminal until start
        assert!(s.frame(40.0, &mut sim).is_err());
    }

    #[test]
    fn test_render_error_stops_the_loop() {
        let mut s = sched_60hz();
        let mut sim = Recorder {
            fail_render: true,
            ..Default::default()
        };

        let err = s.frame(20.0, &mut sim).unwrap_err();
        assert!(matches!(err, SimError::Callback { phase: "render", .. }));
        assert_eq!(s.state(), LoopState::Stopped);
        // The update that preceded the failed render still ran; there is no
        // partial-tick rollback
        assert_eq!(sim.updates.len(), 1);
    }

    #[test]
    fn test_backwards_clock_contributes_no_time() {
        let mut s = sched_60hz();
        let mut sim = Recorder::default();
        s.frame(100.0, &mut sim).unwrap();

        let report = s.frame(50.0, &mut sim).unwrap();
        assert_eq!(report.updates, 0);
    }

    proptest! {
        /// Simulated time is conserved modulo one step: executed updates
        /// times the step, plus the leftover accumulator, equals the sum of
        /// effective (clamped) deltas.
        #[test]
        fn prop_simulated_time_is_conserved(deltas in prop::collection::vec(0.0f64..1000.0, 1..60)) {
            let mut s = sched_60hz();
            let mut sim = Recorder::default();
            let step = s.fixed_step_ms();

            let mut now = 0.0;
            let mut effective = 0.0;
            let mut final_acc = 0.0;
            for d in deltas {
                now += d;
                let report = s.frame(now, &mut sim).unwrap();
                effective += if report.clamped { step } else { d };
                final_acc = report.accumulator_ms;
            }

            let consumed = sim.updates.len() as f64 * step + final_acc;
            prop_assert!((consumed - effective).abs() < 1e-6 * effective.max(1.0));

            // The accumulator never holds a full step after a frame
            prop_assert!(final_acc < step);
        }
    }
}
