/*
 * Policy View of the Process Table
 *
 * SchedContext is the bridge between scheduling policies and the process
 * table. The mechanism creates one for each policy call and reads back the
 * reschedule request afterwards.
 */

use alloc::vec::Vec;

use super::{
    process::ProcessControlBlock,
    process_table::ProcessTable,
    traits::KernelSchedCtx,
    types::ProcessHandle,
};

/// Borrowed process table plus clock, handed to a policy for one call
pub struct SchedContext<'a> {
    table: &'a mut ProcessTable,
    now: u64,
    current: Option<ProcessHandle>,
    reschedule_requested: bool,
}

impl<'a> SchedContext<'a> {
    /// Create a new scheduling context
    ///
    /// # Arguments
    /// - `table`: The process table
    /// - `now`: Current clock value
    /// - `current`: Running process (None while idle)
    pub fn new(table: &'a mut ProcessTable, now: u64, current: Option<ProcessHandle>) -> Self {
        Self {
            table,
            now,
            current,
            reschedule_requested: false,
        }
    }

    /// Consume a pending reschedule request made by the policy
    pub fn take_reschedule_request(&mut self) -> bool {
        core::mem::take(&mut self.reschedule_requested)
    }
}

impl<'a> KernelSchedCtx for SchedContext<'a> {
    fn process(&self, handle: ProcessHandle) -> Option<&ProcessControlBlock> {
        self.table.get(handle)
    }

    fn current_process(&self) -> Option<ProcessHandle> {
        self.current
    }

    fn now_ticks(&self) -> u64 {
        self.now
    }

    fn live_processes(&self) -> Vec<ProcessHandle> {
        self.table.handles()
    }

    fn process_mut(&mut self, handle: ProcessHandle) -> Option<&mut ProcessControlBlock> {
        self.table.get_mut(handle)
    }

    fn request_reschedule(&mut self) {
        self.reschedule_requested = true;
    }
}

impl<'a> core::fmt::Debug for SchedContext<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedContext")
            .field("now", &self.now)
            .field("current", &self.current)
            .field("live_processes", &self.table.live_count())
            .field("reschedule_requested", &self.reschedule_requested)
            .finish()
    }
}
