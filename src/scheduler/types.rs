/*
 * Scheduler Type Definitions
 *
 * Small Copy types shared by the policies and the mechanism: PIDs, table
 * handles, slice lengths, dispatch decisions and block reasons.
 */

use core::fmt;

use super::config::TIME_SLICE_BASE;

/// Process identifier
///
/// PIDs are handed out by a monotonic counter and are never reused.
/// PID 0 is reserved for the idle process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// The reserved idle process
    pub const IDLE: Pid = Pid(0);

    /// Get the raw PID value
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this is the idle process
    pub fn is_idle(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable reference to a process descriptor
///
/// A handle names a slot in the process table together with the PID that
/// occupied it when the handle was issued. Once the slot is freed and reused
/// by another process the old handle simply stops resolving, so queues can
/// hold handles without ever dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    slot: u32,
    pid: Pid,
}

impl ProcessHandle {
    pub(crate) fn new(slot: usize, pid: Pid) -> Self {
        Self {
            slot: slot as u32,
            pid,
        }
    }

    /// PID of the process this handle refers to
    pub fn pid(self) -> Pid {
        self.pid
    }

    /// Slot index inside the process table
    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID {} (slot {})", self.pid, self.slot)
    }
}

/// Time slice duration in timer ticks
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSliceTicks(pub u32);

impl TimeSliceTicks {
    /// Default time slice
    pub const DEFAULT: TimeSliceTicks = TimeSliceTicks(TIME_SLICE_BASE);

    /// Slice length for an MLFQ level: `base × 2^level`
    ///
    /// Saturates instead of overflowing for absurd quanta.
    pub fn for_level(base: u32, level: u8) -> Self {
        TimeSliceTicks(base.saturating_mul(1u32 << level.min(31)))
    }

    /// Get the value as u32
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Dispatch decision made by a scheduling policy
///
/// After evaluating its ready structures, a policy returns this decision
/// indicating what process should run next and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchDecision {
    /// Process to dispatch next (None = run the idle process)
    pub next: Option<ProcessHandle>,

    /// Time slice for the selected process
    pub timeslice: TimeSliceTicks,
}

impl DispatchDecision {
    /// Create a decision to run a specific process
    pub fn run_process(handle: ProcessHandle, timeslice: TimeSliceTicks) -> Self {
        Self {
            next: Some(handle),
            timeslice,
        }
    }

    /// Create a decision to idle the CPU
    pub fn idle() -> Self {
        Self {
            next: None,
            timeslice: TimeSliceTicks::DEFAULT,
        }
    }
}

/// Reason why a process was blocked
///
/// Kept on the wait queue next to the process so that wakeups can report
/// what the process was waiting for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Waiting for I/O on a device channel
    WaitingForIo { channel: u32 },

    /// Sleeping until the clock reaches `until_tick`
    Sleeping { until_tick: u64 },

    /// Waiting for a lock or semaphore
    WaitingForLock { lock_id: usize },

    /// Waiting for a child process to exit
    WaitingForChild { pid: Pid },

    /// Generic blocking (reason not specified)
    Other,
}

impl BlockReason {
    /// Check if a sleeping process should be woken at `now`
    pub fn sleep_expired(&self, now: u64) -> bool {
        matches!(self, BlockReason::Sleeping { until_tick } if now >= *until_tick)
    }

    /// Is this a wait for `child` to exit?
    pub fn waits_for_child(&self, child: Pid) -> bool {
        matches!(self, BlockReason::WaitingForChild { pid } if *pid == child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_slices_grow_geometrically() {
        assert_eq!(TimeSliceTicks::for_level(10, 0).get(), 10);
        assert_eq!(TimeSliceTicks::for_level(10, 1).get(), 20);
        assert_eq!(TimeSliceTicks::for_level(10, 3).get(), 80);
        assert_eq!(TimeSliceTicks::for_level(u32::MAX, 2).get(), u32::MAX);
    }

    #[test]
    fn sleep_expiry_only_applies_to_sleepers() {
        let sleeping = BlockReason::Sleeping { until_tick: 5 };
        assert!(!sleeping.sleep_expired(4));
        assert!(sleeping.sleep_expired(5));
        assert!(!BlockReason::Other.sleep_expired(100));
    }

    #[test]
    fn child_waits_match_only_their_child() {
        let reason = BlockReason::WaitingForChild { pid: Pid(7) };
        assert!(reason.waits_for_child(Pid(7)));
        assert!(!reason.waits_for_child(Pid(8)));
        assert!(!BlockReason::Other.waits_for_child(Pid(7)));
    }
}
