/*
 * FIFO Scheduling Policy
 *
 * First come, first served. Processes run in arrival order until they
 * block, yield or terminate; slice expiry never takes the CPU away.
 */

use super::super::{
    events::SchedEvent,
    queue::ReadyQueue,
    traits::{KernelSchedCtx, SchedPolicy},
    types::{DispatchDecision, ProcessHandle, TimeSliceTicks},
};

/// FIFO scheduling policy
pub struct FifoPolicy {
    ready_queue: ReadyQueue,

    /// Nominal slice reported with every dispatch (accounting only)
    quantum: TimeSliceTicks,
}

impl FifoPolicy {
    pub fn new(quantum: u32) -> Self {
        Self {
            ready_queue: ReadyQueue::new(),
            quantum: TimeSliceTicks(quantum),
        }
    }
}

impl Default for FifoPolicy {
    fn default() -> Self {
        Self::new(TimeSliceTicks::DEFAULT.get())
    }
}

impl SchedPolicy for FifoPolicy {
    fn on_event(&mut self, _ctx: &mut dyn KernelSchedCtx, event: SchedEvent) {
        match event {
            SchedEvent::ProcessCreated { handle, .. }
            | SchedEvent::ProcessWoke { handle, .. }
            | SchedEvent::ProcessYielded { handle }
            | SchedEvent::ProcessPreempted { handle } => {
                self.ready_queue.enqueue(handle);
            }

            SchedEvent::ProcessBlocked { handle, .. } | SchedEvent::ProcessExited { handle } => {
                self.ready_queue.remove(handle);
            }

            SchedEvent::Tick { .. } | SchedEvent::PriorityChanged { .. } => {}
        }
    }

    fn pick_next(&mut self, ctx: &mut dyn KernelSchedCtx) -> DispatchDecision {
        while let Some(handle) = self.ready_queue.dequeue() {
            if ctx.process(handle).is_some() {
                return DispatchDecision::run_process(handle, self.quantum);
            }
            log::warn!("[FIFO] dropping stale {}", handle);
        }

        DispatchDecision::idle()
    }

    fn is_preemptive(&self) -> bool {
        false
    }

    fn is_queued(&self, handle: ProcessHandle) -> bool {
        self.ready_queue.contains(handle)
    }

    fn ready_count(&self) -> usize {
        self.ready_queue.len()
    }

    fn name(&self) -> &'static str {
        "FIFO"
    }
}
