/*
 * Round-Robin Scheduling Policy
 *
 * One ready queue, one quantum for everybody. When the running process
 * uses up its quantum the mechanism preempts it and it rejoins the tail.
 */

use super::super::{
    events::SchedEvent,
    queue::ReadyQueue,
    traits::{KernelSchedCtx, SchedPolicy},
    types::{DispatchDecision, ProcessHandle, TimeSliceTicks},
};

/// Round-Robin scheduling policy
///
/// On each scheduling decision (pick_next) it pops the front process and
/// hands it a full quantum. A preempted or yielding process goes to the
/// back of the queue.
pub struct RoundRobinPolicy {
    /// FIFO queue of processes ready to run
    ready_queue: ReadyQueue,

    /// Slice given to every dispatched process
    quantum: TimeSliceTicks,
}

impl RoundRobinPolicy {
    /// Create a new Round-Robin policy
    pub fn new(quantum: u32) -> Self {
        Self {
            ready_queue: ReadyQueue::new(),
            quantum: TimeSliceTicks(quantum),
        }
    }

    pub fn quantum(&self) -> TimeSliceTicks {
        self.quantum
    }
}

impl Default for RoundRobinPolicy {
    fn default() -> Self {
        Self::new(TimeSliceTicks::DEFAULT.get())
    }
}

impl SchedPolicy for RoundRobinPolicy {
    fn on_event(&mut self, _ctx: &mut dyn KernelSchedCtx, event: SchedEvent) {
        match event {
            SchedEvent::ProcessCreated { handle, .. } => {
                self.ready_queue.enqueue(handle);
            }

            SchedEvent::ProcessWoke { handle, .. } => {
                log::debug!("[RR Policy] ProcessWoke: adding {} to ready queue", handle);
                self.ready_queue.enqueue(handle);
            }

            SchedEvent::ProcessYielded { handle } | SchedEvent::ProcessPreempted { handle } => {
                // It was removed from the queue when picked, so re-add it at the back
                self.ready_queue.enqueue(handle);
            }

            SchedEvent::ProcessBlocked { handle, .. } | SchedEvent::ProcessExited { handle } => {
                self.ready_queue.remove(handle);
            }

            SchedEvent::Tick { .. } => {
                // Slice expiry is detected by the mechanism
            }

            SchedEvent::PriorityChanged { .. } => {}
        }
    }

    fn pick_next(&mut self, ctx: &mut dyn KernelSchedCtx) -> DispatchDecision {
        while let Some(handle) = self.ready_queue.dequeue() {
            if ctx.process(handle).is_some() {
                return DispatchDecision::run_process(handle, self.quantum);
            }
            log::warn!("[RR Policy] dropping stale {}", handle);
        }

        DispatchDecision::idle()
    }

    fn is_queued(&self, handle: ProcessHandle) -> bool {
        self.ready_queue.contains(handle)
    }

    fn ready_count(&self) -> usize {
        self.ready_queue.len()
    }

    fn name(&self) -> &'static str {
        "RR"
    }
}
