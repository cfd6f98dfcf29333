/*
 * Scheduler Errors
 *
 * Every error is recoverable: the scheduler reports problems to its caller
 * and never aborts the host.
 */

use super::{process::ProcessState, types::Pid};

/// Result type used by all fallible scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Scheduler error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    /// Every slot of the process table is in use
    #[error("process table full ({capacity} slots)")]
    ProcessTableFull { capacity: usize },

    /// The PID counter cannot advance any further
    #[error("PID space exhausted")]
    PidSpaceExhausted,

    /// PID was never issued, or does not name a live process
    #[error("process {0} not found")]
    ProcessNotFound(Pid),

    /// PID was issued but the process has already been terminated
    #[error("process {0} already terminated")]
    AlreadyTerminated(Pid),

    /// Requested priority was outside the valid range and has been clamped
    #[error("priority {requested} out of range, clamped to {clamped}")]
    InvalidPriority { requested: u8, clamped: u8 },

    /// Operation needs a running process but the CPU is idle
    #[error("no process is running")]
    NoCurrentProcess,

    /// Operation is not permitted on the idle process
    #[error("operation not permitted on the idle process")]
    IdleProcess,

    /// Accounting check in validate() failed
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(Inconsistency),
}

/// Which accounting invariant failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Inconsistency {
    #[error("{ready} ready + {waiting} waiting + {running} running != {live} live processes")]
    QueueAccounting {
        ready: usize,
        waiting: usize,
        running: usize,
        live: usize,
    },

    #[error("{count} descriptors in RUNNING state, expected exactly one")]
    RunningCount { count: usize },

    #[error("process {pid} is {state:?} but its queue membership disagrees")]
    QueueMembership { pid: Pid, state: ProcessState },

    #[error("process {pid} used {used} ticks of a {slice} tick slice")]
    SliceOverrun { pid: Pid, used: u32, slice: u32 },
}

impl From<Inconsistency> for SchedError {
    fn from(inconsistency: Inconsistency) -> Self {
        SchedError::InternalInconsistency(inconsistency)
    }
}
