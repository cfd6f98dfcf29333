/*
 * Process Scheduler
 *
 * This module implements the CLUU process scheduler: process descriptors,
 * ready-queue structures and three interchangeable dispatch disciplines
 * driven by a virtual clock.
 *
 * POLICY / MECHANISM SPLIT:
 * =========================
 *
 * SchedulerState (mechanism) owns every process descriptor, the clock, the
 * wait queue and the idle process. It performs all state transitions and
 * reports them as SchedEvents through SchedulerCore to the active
 * SchedPolicy. The policy owns only its ready structures and answers one
 * question: which process runs next, and for how long.
 *
 * Available policies:
 * - FIFO: run in arrival order, never preempt
 * - RR: fixed quantum, preempt on slice expiry
 * - MLFQ: per-level queues, demotion on full slice, periodic boost
 *
 * PROCESS LIFECYCLE:
 * ==================
 *
 * NEW -> READY -> RUNNING -> READY      (preempted / yielded)
 *                         -> BLOCKED    (block / sleep)
 *                         -> TERMINATED
 * BLOCKED -> READY (wake / sleep deadline)
 *
 * TICK HANDLING:
 * ==============
 *
 * 1. Advance the clock and service a pending reschedule
 * 2. Charge the tick to the running process (or to idle)
 * 3. Wake sleepers whose deadline passed
 * 4. Let the policy demote / boost
 * 5. Flag slice expiry; the switch happens at the start of the next tick
 *
 * IDLE PROCESS:
 * =============
 *
 * PID 0 lives outside the process table and runs whenever nothing is
 * ready. It never appears in ready or wait queues and only contributes
 * idle ticks to the statistics.
 *
 * CONCURRENCY:
 * ============
 *
 * SchedulerState is a plain value and every operation takes `&mut self`.
 * Hosts that deliver ticks and lifecycle calls from several threads wrap it
 * in SharedScheduler, which serializes every operation behind a spin lock.
 */

use spin::{Mutex, MutexGuard};

pub mod config;
pub mod context;
pub mod cpu_context;
pub mod error;
pub mod events;
pub mod policies;
pub mod process;
pub mod process_table;
pub mod queue;
pub mod sched_core;
pub mod scheduler;
pub mod stats;
pub mod traits;
pub mod types;
pub mod wait_queue;

pub use config::{
    MAX_PRIORITY_LEVELS, MAX_PROCESSES, PROCESS_NAME_LEN, SchedulerConfig, SchedulerType,
    TIME_SLICE_BASE,
};
pub use cpu_context::{ContextSwitcher, CpuContext, NoopSwitcher};
pub use error::{Inconsistency, SchedError, SchedResult};
pub use process::{ProcessControlBlock, ProcessFlags, ProcessState};
pub use scheduler::SchedulerState;
pub use stats::SchedulerStats;
pub use types::{BlockReason, Pid};

/// Bring up a scheduler with the given configuration
///
/// The configuration is normalized (out-of-range values clamped) and the
/// idle process is installed as the running process.
pub fn init(config: SchedulerConfig) -> SchedulerState {
    SchedulerState::new(config)
}

// ============================================================================
// SHARED WRAPPER
// ============================================================================

/// SchedulerState behind a spin lock
///
/// Every operation runs inside one critical section, so concurrent callers
/// never observe a half-applied transition.
pub struct SharedScheduler {
    inner: Mutex<SchedulerState>,
}

impl SharedScheduler {
    pub fn new(state: SchedulerState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Initialize a scheduler and wrap it
    pub fn init(config: SchedulerConfig) -> Self {
        Self::new(init(config))
    }

    /// Run `f` inside the critical section
    pub fn with<R>(&self, f: impl FnOnce(&mut SchedulerState) -> R) -> R {
        let mut state = self.inner.lock();
        f(&mut state)
    }

    /// Hold the lock across several operations
    pub fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.lock()
    }

    pub fn tick(&self) {
        self.with(SchedulerState::tick);
    }

    pub fn create_process(&self, name: &str, priority: u8) -> SchedResult<Pid> {
        self.with(|state| state.create_process(name, priority))
    }

    pub fn terminate_process(&self, pid: Pid) -> SchedResult<()> {
        self.with(|state| state.terminate_process(pid))
    }

    pub fn wake(&self, pid: Pid) -> SchedResult<()> {
        self.with(|state| state.wake(pid))
    }

    pub fn stats(&self) -> SchedulerStats {
        self.with(|state| state.stats())
    }

    pub fn into_inner(self) -> SchedulerState {
        self.inner.into_inner()
    }
}
