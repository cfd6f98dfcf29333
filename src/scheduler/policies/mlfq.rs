/*
 * Multi-Level Feedback Queue Policy
 *
 * Strict priority across levels, FIFO within a level. Level 0 is the
 * highest priority and has the shortest slice; each level down doubles it.
 *
 * Feedback rules:
 * - Every tick the running process is charged one unit of time_in_queue.
 *   Reaching the level's slice demotes it one level (bottom level stays).
 * - Yielding resets time_in_queue and keeps the level, so interactive
 *   processes hold their priority.
 * - Every boost_interval ticks all processes below level 0 are moved back
 *   to level 0, so a demoted process cannot starve.
 *
 * A process's `priority` always mirrors its `queue_level` under this policy.
 */

use alloc::vec::Vec;

use super::super::{
    events::SchedEvent,
    process::ProcessState,
    queue::MultiLevelQueue,
    traits::{KernelSchedCtx, SchedPolicy},
    types::{DispatchDecision, ProcessHandle},
};

/// Multi-level feedback queue policy
pub struct MlfqPolicy {
    queues: MultiLevelQueue,

    /// Whether demotion and boost may take the CPU away
    preemptive: bool,
}

impl MlfqPolicy {
    /// Create a new MLFQ policy
    ///
    /// # Arguments
    /// * `levels` - Number of levels (clamped to 1..=MAX_PRIORITY_LEVELS)
    /// * `base_quantum` - Slice of level 0
    /// * `boost_interval` - Ticks between boosts, 0 disables boosting
    pub fn new(levels: u8, base_quantum: u32, boost_interval: u64) -> Self {
        Self {
            queues: MultiLevelQueue::new(levels, base_quantum, boost_interval),
            preemptive: true,
        }
    }

    /// Whether demotion and boost may request a reschedule
    pub fn with_preemption(mut self, preemptive: bool) -> Self {
        self.preemptive = preemptive;
        self
    }

    pub fn levels(&self) -> u8 {
        self.queues.levels()
    }

    /// Queue `handle` at the level recorded in its descriptor
    fn enqueue_at_own_level(&mut self, ctx: &dyn KernelSchedCtx, handle: ProcessHandle) {
        let Some(pcb) = ctx.process(handle) else {
            return;
        };

        if !self.queues.enqueue(handle, pcb.queue_level) {
            log::warn!("[MLFQ] could not queue {} at level {}", handle, pcb.queue_level);
        }
    }

    /// Move `handle` to `level`, keeping policy-owned fields consistent
    fn set_level(&mut self, ctx: &mut dyn KernelSchedCtx, handle: ProcessHandle, level: u8) {
        let level = self.queues.clamp_level(level);
        let slice = self.queues.time_slice(level).get();

        let Some(pcb) = ctx.process_mut(handle) else {
            return;
        };
        pcb.queue_level = level;
        pcb.priority = level;
        pcb.time_slice = slice;
        pcb.time_in_queue = 0;
    }

    /// Charge one tick to the running process and demote it if its level's
    /// slice is used up
    fn charge(&mut self, ctx: &mut dyn KernelSchedCtx, handle: ProcessHandle) {
        let Some(pcb) = ctx.process_mut(handle) else {
            return;
        };
        pcb.time_in_queue = pcb.time_in_queue.saturating_add(1);

        let level = pcb.queue_level;
        if pcb.time_in_queue < self.queues.time_slice(level).get() {
            return;
        }

        let new_level = self.queues.clamp_level(level.saturating_add(1));
        self.set_level(ctx, handle, new_level);

        if let Some(pcb) = ctx.process_mut(handle) {
            pcb.mark_cpu_bound();
            if new_level != level {
                pcb.demotions += 1;
                log::debug!("[MLFQ] PID {} demoted {} -> {}", pcb.pid, level, new_level);
            }
        }

        // Re-queue at the tail of the new level on the next dispatch
        if self.preemptive {
            ctx.request_reschedule();
        }
    }

    /// Move every process below level 0 back to level 0
    fn boost(&mut self, ctx: &mut dyn KernelSchedCtx, now: u64) {
        let mut boosted = 0usize;

        // Queued processes keep their relative order, upper levels first
        for level in 1..self.queues.levels() {
            for handle in self.queues.drain_level(level) {
                self.set_level(ctx, handle, 0);
                self.queues.enqueue(handle, 0);
                if let Some(pcb) = ctx.process_mut(handle) {
                    pcb.promotions += 1;
                }
                boosted += 1;
            }
        }

        // Running and blocked processes
        for handle in ctx.live_processes() {
            let Some(pcb) = ctx.process(handle) else {
                continue;
            };
            if pcb.queue_level == 0 || pcb.state == ProcessState::Ready {
                continue;
            }

            self.set_level(ctx, handle, 0);
            if let Some(pcb) = ctx.process_mut(handle) {
                pcb.promotions += 1;
                if self.preemptive && pcb.state == ProcessState::Running && pcb.slice_expired() {
                    ctx.request_reschedule();
                }
            }
            boosted += 1;
        }

        self.queues.mark_boosted(now);
        log::debug!("[MLFQ] priority boost at tick {}: {} processes promoted", now, boosted);
    }
}

impl SchedPolicy for MlfqPolicy {
    fn on_event(&mut self, ctx: &mut dyn KernelSchedCtx, event: SchedEvent) {
        match event {
            SchedEvent::ProcessCreated { handle, priority } => {
                self.set_level(ctx, handle, priority);
                self.enqueue_at_own_level(ctx, handle);
            }

            SchedEvent::ProcessWoke { handle, .. } | SchedEvent::ProcessPreempted { handle } => {
                // Level is kept across blocking and preemption
                self.enqueue_at_own_level(ctx, handle);
            }

            SchedEvent::ProcessYielded { handle } => {
                if let Some(pcb) = ctx.process_mut(handle) {
                    pcb.time_in_queue = 0;
                }
                self.enqueue_at_own_level(ctx, handle);
            }

            SchedEvent::ProcessBlocked { handle, .. } | SchedEvent::ProcessExited { handle } => {
                self.queues.remove(handle);
            }

            SchedEvent::Tick { now, current } => {
                if let Some(handle) = current {
                    self.charge(ctx, handle);
                }

                if self.queues.boost_due(now) {
                    self.boost(ctx, now);
                }
            }

            SchedEvent::PriorityChanged { handle, new_priority, .. } => {
                let queued = self.queues.remove(handle);
                self.set_level(ctx, handle, new_priority);

                if queued {
                    self.enqueue_at_own_level(ctx, handle);
                } else if ctx.current_process() == Some(handle) {
                    let expired = ctx.process(handle).is_some_and(|pcb| pcb.slice_expired());
                    if self.preemptive && expired {
                        ctx.request_reschedule();
                    }
                }
            }
        }
    }

    fn pick_next(&mut self, ctx: &mut dyn KernelSchedCtx) -> DispatchDecision {
        while let Some((handle, level)) = self.queues.dequeue_highest() {
            if ctx.process(handle).is_some() {
                return DispatchDecision::run_process(handle, self.queues.time_slice(level));
            }
            log::warn!("[MLFQ] dropping stale {}", handle);
        }

        DispatchDecision::idle()
    }

    fn outranks(&self, ctx: &dyn KernelSchedCtx, incoming: ProcessHandle, current: ProcessHandle) -> bool {
        match (ctx.process(incoming), ctx.process(current)) {
            (Some(incoming), Some(current)) => incoming.queue_level < current.queue_level,
            _ => false,
        }
    }

    fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    fn is_queued(&self, handle: ProcessHandle) -> bool {
        self.queues.contains(handle)
    }

    fn ready_count(&self) -> usize {
        self.queues.len()
    }

    fn ready_counts_by_level(&self) -> Vec<usize> {
        self.queues.lengths()
    }

    fn name(&self) -> &'static str {
        "MLFQ"
    }
}
