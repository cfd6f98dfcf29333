/*
 * Scheduler Trait Definitions
 *
 * Two traits sit on the policy/mechanism boundary:
 *
 * - SchedPolicy: The interface that FIFO, RR and MLFQ implement
 * - KernelSchedCtx: The mechanism interface that policies use to reach process state
 *
 * The mechanism owns every state transition, the clock and the current
 * process. A policy owns only its ready structures and the per-process
 * fields it is responsible for (MLFQ level, time in queue, slice length).
 */

use alloc::vec::Vec;

use super::{
    events::SchedEvent,
    process::ProcessControlBlock,
    types::{DispatchDecision, ProcessHandle},
};

/// Scheduling policy trait
///
/// The SchedulerCore (mechanism) holds a `Box<dyn SchedPolicy>` and forwards
/// events to it.
///
/// Policies are responsible for:
/// - Deciding which process runs next (pick_next)
/// - Keeping their ready structures in sync (on_event)
/// - Saying whether an arrival should preempt the running process (outranks)
pub trait SchedPolicy: Send {
    /// React to a scheduling event
    ///
    /// # Arguments
    /// - `ctx`: Access to process state
    /// - `event`: The event that occurred
    fn on_event(&mut self, ctx: &mut dyn KernelSchedCtx, event: SchedEvent);

    /// Choose the next process to run
    ///
    /// The returned process has already been taken off the ready structures.
    ///
    /// # Returns
    /// Which process to run (or None for idle) and its time slice.
    fn pick_next(&mut self, ctx: &mut dyn KernelSchedCtx) -> DispatchDecision;

    /// Should the READY process `incoming` preempt the running `current`?
    fn outranks(&self, _ctx: &dyn KernelSchedCtx, _incoming: ProcessHandle, _current: ProcessHandle) -> bool {
        false
    }

    /// Does slice expiry take the CPU away from the running process?
    fn is_preemptive(&self) -> bool {
        true
    }

    /// Is `handle` in the ready structures?
    fn is_queued(&self, handle: ProcessHandle) -> bool;

    /// Number of queued processes
    fn ready_count(&self) -> usize;

    /// Queue lengths, highest priority level first
    fn ready_counts_by_level(&self) -> Vec<usize> {
        let mut counts = Vec::with_capacity(1);
        counts.push(self.ready_count());
        counts
    }

    /// Get the policy name for debugging
    fn name(&self) -> &'static str;
}

/// Kernel context interface for scheduling policies
///
/// This trait is the ONLY way policies can reach process descriptors. The
/// mechanism builds a short-lived SchedContext around the process table for
/// every policy call.
pub trait KernelSchedCtx {
    // ========== QUERY OPERATIONS ==========

    /// Look up a live process
    fn process(&self, handle: ProcessHandle) -> Option<&ProcessControlBlock>;

    /// Get the currently running process (None while idle)
    fn current_process(&self) -> Option<ProcessHandle>;

    /// Get the current tick count
    fn now_ticks(&self) -> u64;

    /// Every live process (READY, RUNNING or BLOCKED)
    fn live_processes(&self) -> Vec<ProcessHandle>;

    // ========== STATE MODIFICATION ==========

    /// Mutable access to the policy-owned fields of a live process
    fn process_mut(&mut self, handle: ProcessHandle) -> Option<&mut ProcessControlBlock>;

    /// Ask the mechanism to reschedule at the next opportunity
    fn request_reschedule(&mut self);
}
