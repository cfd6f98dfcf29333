/*
 * Process Control Block
 *
 * This module defines the per-process descriptor owned by the process table:
 * identity, lifecycle state, priority and MLFQ bookkeeping, timing
 * statistics and the saved CPU context.
 *
 * Lifecycle:
 *   NEW -> READY -> RUNNING -> (READY | BLOCKED | TERMINATED)
 *   BLOCKED -> (READY | TERMINATED)
 *   READY -> TERMINATED
 *
 * TERMINATED is absorbing; a terminated descriptor is released from the
 * table and never comes back.
 */

use bitflags::bitflags;
use heapless::String;

use super::{
    config::PROCESS_NAME_LEN,
    cpu_context::CpuContext,
    types::{BlockReason, Pid},
};

/// Bounded process name
pub type ProcessName = String<PROCESS_NAME_LEN>;

/// Process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Allocated but not yet admitted to a ready queue
    New,
    /// Runnable, sitting in the active policy's ready structure
    Ready,
    /// Currently executing on the CPU
    Running,
    /// Sitting on the wait queue
    Blocked,
    /// Finished; the descriptor is about to be released
    Terminated,
}

impl ProcessState {
    /// Check if moving from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (New, Ready)
                | (Ready, Running)
                | (Ready, Terminated)
                | (Running, Ready)
                | (Running, Blocked)
                | (Running, Terminated)
                | (Blocked, Ready)
                | (Blocked, Terminated)
        )
    }
}

bitflags! {
    /// Per-process attribute flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcessFlags: u32 {
        /// The idle process
        const IDLE       = 1 << 0;
        /// Kernel-owned process
        const SYSTEM     = 1 << 1;
        /// Admitted under the FIFO policy
        const SCHED_FIFO = 1 << 2;
        /// Admitted under the round-robin policy
        const SCHED_RR   = 1 << 3;
        /// Admitted under the MLFQ policy
        const SCHED_MLFQ = 1 << 4;
        /// Has exhausted at least one full time slice
        const CPU_BOUND  = 1 << 5;
        /// Has yielded or blocked before its slice ran out
        const IO_BOUND   = 1 << 6;
    }
}

/// Process Control Block
///
/// Owned exclusively by the process table. Everything else refers to a
/// process through a [`ProcessHandle`](super::types::ProcessHandle).
#[derive(Clone)]
pub struct ProcessControlBlock {
    pub pid: Pid,
    pub name: ProcessName,
    pub state: ProcessState,
    pub flags: ProcessFlags,

    /// Current priority (0 = highest)
    pub priority: u8,
    /// Priority requested at creation
    pub priority_original: u8,

    // Timing, all in ticks
    pub time_created: u64,
    /// Tick of the most recent dispatch
    pub time_started: u64,
    /// Tick of the first dispatch, if any
    pub time_first_run: Option<u64>,
    pub time_terminated: Option<u64>,
    /// Total ticks spent running
    pub time_used: u64,
    /// Length of the current slice
    pub time_slice: u32,
    /// Ticks consumed from the current slice
    pub time_slice_used: u32,
    pub vruntime: u64,

    // MLFQ bookkeeping
    pub queue_level: u8,
    /// Ticks charged at the current level since the last demotion, yield or boost
    pub time_in_queue: u32,
    pub demotions: u32,
    pub promotions: u32,

    pub context: CpuContext,
    pub wait_reason: Option<BlockReason>,

    /// Process that was running when this one was created
    pub parent: Option<Pid>,
    /// Set when the process is terminated
    pub exit_code: Option<i32>,
    /// Exit status of the child this process last waited for
    pub child_status: Option<(Pid, i32)>,
}

impl ProcessControlBlock {
    /// Create a descriptor in the NEW state
    ///
    /// # Arguments
    /// * `pid` - Identifier handed out by the process table
    /// * `name` - Human readable name, truncated to [`PROCESS_NAME_LEN`] bytes
    /// * `priority` - Already clamped priority
    /// * `now` - Current clock value
    pub fn new(pid: Pid, name: &str, priority: u8, now: u64) -> Self {
        Self {
            pid,
            name: bounded_name(name),
            state: ProcessState::New,
            flags: ProcessFlags::empty(),
            priority,
            priority_original: priority,
            time_created: now,
            time_started: 0,
            time_first_run: None,
            time_terminated: None,
            time_used: 0,
            time_slice: 0,
            time_slice_used: 0,
            vruntime: 0,
            queue_level: 0,
            time_in_queue: 0,
            demotions: 0,
            promotions: 0,
            context: CpuContext::for_process(pid),
            wait_reason: None,
            parent: None,
            exit_code: None,
            child_status: None,
        }
    }

    /// Create the idle process descriptor
    ///
    /// The idle process starts out RUNNING and lives outside the process
    /// table; it only ever alternates between READY and RUNNING.
    pub fn idle() -> Self {
        let mut idle = Self::new(Pid::IDLE, "idle", u8::MAX, 0);
        idle.state = ProcessState::Running;
        idle.flags = ProcessFlags::IDLE | ProcessFlags::SYSTEM;
        idle
    }

    /// Move to a new lifecycle state
    ///
    /// Illegal steps are logged and applied anyway; validate() is the place
    /// that reports the resulting inconsistency.
    pub fn set_state(&mut self, next: ProcessState) {
        if self.state == next {
            return;
        }

        let idle_step = self.flags.contains(ProcessFlags::IDLE)
            && matches!(next, ProcessState::Ready | ProcessState::Running);

        if !idle_step && !self.state.can_transition_to(next) {
            log::warn!(
                "PID {}: illegal state transition {:?} -> {:?}",
                self.pid,
                self.state,
                next
            );
        }

        self.state = next;
    }

    pub fn is_idle(&self) -> bool {
        self.flags.contains(ProcessFlags::IDLE)
    }

    /// Has the process been dispatched at least once?
    pub fn has_run(&self) -> bool {
        self.time_first_run.is_some()
    }

    /// Has the current slice been used up?
    pub fn slice_expired(&self) -> bool {
        self.time_slice_used >= self.time_slice
    }

    /// Mark as CPU bound (slice exhausted)
    pub fn mark_cpu_bound(&mut self) {
        self.flags.remove(ProcessFlags::IO_BOUND);
        self.flags.insert(ProcessFlags::CPU_BOUND);
    }

    /// Mark as I/O bound (gave up the CPU early)
    pub fn mark_io_bound(&mut self) {
        self.flags.remove(ProcessFlags::CPU_BOUND);
        self.flags.insert(ProcessFlags::IO_BOUND);
    }

    /// Time from creation to termination
    pub fn turnaround_time(&self) -> Option<u64> {
        self.time_terminated
            .map(|end| end.saturating_sub(self.time_created))
    }

    /// Time from creation to first dispatch
    pub fn response_time(&self) -> Option<u64> {
        self.time_first_run
            .map(|start| start.saturating_sub(self.time_created))
    }

    /// Time alive but not running, measured up to `now`
    pub fn wait_time(&self, now: u64) -> u64 {
        let end = self.time_terminated.unwrap_or(now);
        end.saturating_sub(self.time_created)
            .saturating_sub(self.time_used)
    }
}

impl core::fmt::Debug for ProcessControlBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessControlBlock")
            .field("pid", &self.pid)
            .field("name", &self.name.as_str())
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("parent", &self.parent)
            .field("priority", &self.priority)
            .field("queue_level", &self.queue_level)
            .field("time_used", &self.time_used)
            .field("time_slice", &self.time_slice)
            .field("time_slice_used", &self.time_slice_used)
            .finish()
    }
}

/// Copy `name` into a bounded string, cutting at a char boundary
fn bounded_name(name: &str) -> ProcessName {
    let mut end = name.len().min(PROCESS_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }

    let mut bounded = ProcessName::new();
    // Cannot fail: `end` never exceeds the capacity.
    let _ = bounded.push_str(&name[..end]);
    bounded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated_on_char_boundaries() {
        let pcb = ProcessControlBlock::new(Pid(1), "a-very-long-process-name-that-overflows", 0, 0);
        assert_eq!(pcb.name.len(), PROCESS_NAME_LEN);

        // 'é' is two bytes; 31 ASCII bytes + 'é' would straddle the limit.
        let name = "abcdefghijklmnopqrstuvwxyzabcdeé";
        let pcb = ProcessControlBlock::new(Pid(2), name, 0, 0);
        assert_eq!(pcb.name.as_str(), "abcdefghijklmnopqrstuvwxyzabcde");
    }

    #[test]
    fn lifecycle_transitions() {
        use ProcessState::*;
        assert!(New.can_transition_to(Ready));
        assert!(Running.can_transition_to(Blocked));
        assert!(Blocked.can_transition_to(Terminated));
        assert!(!Terminated.can_transition_to(Ready));
        assert!(!Blocked.can_transition_to(Running));
        assert!(!New.can_transition_to(Running));
    }

    #[test]
    fn timing_helpers() {
        let mut pcb = ProcessControlBlock::new(Pid(3), "worker", 1, 10);
        pcb.time_first_run = Some(14);
        pcb.time_used = 20;
        pcb.time_terminated = Some(50);

        assert_eq!(pcb.response_time(), Some(4));
        assert_eq!(pcb.turnaround_time(), Some(40));
        assert_eq!(pcb.wait_time(999), 20);
    }

    #[test]
    fn bound_flags_are_exclusive() {
        let mut pcb = ProcessControlBlock::new(Pid(4), "p", 0, 0);
        pcb.mark_cpu_bound();
        pcb.mark_io_bound();
        assert!(pcb.flags.contains(ProcessFlags::IO_BOUND));
        assert!(!pcb.flags.contains(ProcessFlags::CPU_BOUND));
    }

    #[test]
    fn idle_descriptor() {
        let idle = ProcessControlBlock::idle();
        assert!(idle.pid.is_idle());
        assert!(idle.is_idle());
        assert_eq!(idle.state, ProcessState::Running);
    }
}
