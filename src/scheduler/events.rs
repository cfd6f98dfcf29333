/*
 * Scheduler Event Definitions
 *
 * Lifecycle and clock notifications sent from SchedulerCore to the active
 * policy, which uses them to keep its ready structures in step with the
 * process table.
 *
 * The mechanism always performs the state transition on the descriptor
 * first and reports the event afterwards, so a policy sees the new state.
 */

use super::types::{BlockReason, ProcessHandle};

/// Events that the scheduler mechanism reports to policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedEvent {
    /// A new process was admitted and is READY
    ///
    /// The policy should add it to its ready structures.
    ProcessCreated {
        handle: ProcessHandle,
        priority: u8,
    },

    /// A blocked process became READY again
    ProcessWoke {
        handle: ProcessHandle,
        was_blocked_on: BlockReason,
    },

    /// The running process gave up the CPU voluntarily
    ///
    /// The process is READY; the policy requeues it at the tail.
    ProcessYielded {
        handle: ProcessHandle,
    },

    /// The running process was taken off the CPU by a reschedule
    ///
    /// The process is READY; the policy requeues it at the tail.
    ProcessPreempted {
        handle: ProcessHandle,
    },

    /// The running process blocked
    ///
    /// The policy should drop it from its ready structures.
    ProcessBlocked {
        handle: ProcessHandle,
        reason: BlockReason,
    },

    /// A process was terminated
    ///
    /// The policy should drop it from all its structures.
    ProcessExited {
        handle: ProcessHandle,
    },

    /// Timer tick
    ///
    /// Fired after the mechanism has charged the tick to the current
    /// process. This is where MLFQ demotes and boosts.
    Tick {
        now: u64,
        current: Option<ProcessHandle>,
    },

    /// A process priority was changed externally
    PriorityChanged {
        handle: ProcessHandle,
        old_priority: u8,
        new_priority: u8,
    },
}

impl SchedEvent {
    /// Get a short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SchedEvent::ProcessCreated { .. } => "ProcessCreated",
            SchedEvent::ProcessWoke { .. } => "ProcessWoke",
            SchedEvent::ProcessYielded { .. } => "ProcessYielded",
            SchedEvent::ProcessPreempted { .. } => "ProcessPreempted",
            SchedEvent::ProcessBlocked { .. } => "ProcessBlocked",
            SchedEvent::ProcessExited { .. } => "ProcessExited",
            SchedEvent::Tick { .. } => "Tick",
            SchedEvent::PriorityChanged { .. } => "PriorityChanged",
        }
    }
}
