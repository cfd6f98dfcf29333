/*
 * Scheduling Policies Module
 *
 * This module contains the dispatch disciplines. Each policy implements the
 * SchedPolicy trait and is plugged into the SchedulerCore at init time.
 *
 * Available policies:
 * - FifoPolicy: First come, first served, never preempts
 * - RoundRobinPolicy: Fixed-quantum preemptive rotation
 * - MlfqPolicy: Multi-level feedback queue with demotion and boost
 */

use alloc::boxed::Box;

pub mod fifo;
pub mod mlfq;
pub mod round_robin;

pub use fifo::FifoPolicy;
pub use mlfq::MlfqPolicy;
pub use round_robin::RoundRobinPolicy;

use super::{
    config::{SchedulerConfig, SchedulerType},
    traits::SchedPolicy,
};

/// Build the policy selected by `config`
pub fn for_config(config: &SchedulerConfig) -> Box<dyn SchedPolicy> {
    match config.scheduler_type {
        SchedulerType::Fifo => Box::new(FifoPolicy::new(config.time_quantum)),
        SchedulerType::RoundRobin => Box::new(RoundRobinPolicy::new(config.time_quantum)),
        SchedulerType::Mlfq => Box::new(
            MlfqPolicy::new(config.mlfq_levels, config.time_quantum, config.boost_interval)
                .with_preemption(config.enable_preemption),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{
        context::SchedContext,
        events::SchedEvent,
        process::ProcessState,
        process_table::ProcessTable,
        traits::KernelSchedCtx,
        types::ProcessHandle,
    };

    fn spawn(table: &mut ProcessTable, policy: &mut dyn SchedPolicy, priority: u8) -> ProcessHandle {
        let handle = table.allocate("p", priority, 0).unwrap();
        table.get_mut(handle).unwrap().set_state(ProcessState::Ready);
        let mut ctx = SchedContext::new(table, 0, None);
        policy.on_event(&mut ctx, SchedEvent::ProcessCreated { handle, priority });
        handle
    }

    fn pick(table: &mut ProcessTable, policy: &mut dyn SchedPolicy) -> Option<ProcessHandle> {
        let mut ctx = SchedContext::new(table, 0, None);
        policy.pick_next(&mut ctx).next
    }

    #[test]
    fn factory_selects_policy() {
        assert_eq!(for_config(&SchedulerConfig::fifo()).name(), "FIFO");
        assert_eq!(for_config(&SchedulerConfig::round_robin(3)).name(), "RR");
        assert_eq!(for_config(&SchedulerConfig::default()).name(), "MLFQ");
        assert!(!for_config(&SchedulerConfig::fifo()).is_preemptive());
    }

    #[test]
    fn fifo_serves_in_arrival_order() {
        let mut table = ProcessTable::new();
        let mut policy = FifoPolicy::new(10);
        let a = spawn(&mut table, &mut policy, 3);
        let b = spawn(&mut table, &mut policy, 0);

        assert_eq!(pick(&mut table, &mut policy), Some(a));
        assert_eq!(pick(&mut table, &mut policy), Some(b));
        assert_eq!(pick(&mut table, &mut policy), None);
    }

    #[test]
    fn rr_requeues_preempted_process_at_tail() {
        let mut table = ProcessTable::new();
        let mut policy = RoundRobinPolicy::new(3);
        let a = spawn(&mut table, &mut policy, 0);
        let b = spawn(&mut table, &mut policy, 0);
        assert_eq!(policy.quantum().get(), 3);

        assert_eq!(pick(&mut table, &mut policy), Some(a));
        let mut ctx = SchedContext::new(&mut table, 3, Some(a));
        policy.on_event(&mut ctx, SchedEvent::ProcessPreempted { handle: a });

        assert_eq!(pick(&mut table, &mut policy), Some(b));
        assert_eq!(pick(&mut table, &mut policy), Some(a));
    }

    #[test]
    fn exited_processes_leave_the_queue() {
        let mut table = ProcessTable::new();
        let mut policy = RoundRobinPolicy::new(3);
        let a = spawn(&mut table, &mut policy, 0);

        let mut ctx = SchedContext::new(&mut table, 0, None);
        policy.on_event(&mut ctx, SchedEvent::ProcessExited { handle: a });
        assert_eq!(policy.ready_count(), 0);
    }

    #[test]
    fn mlfq_admits_at_priority_level() {
        let mut table = ProcessTable::new();
        let mut policy = MlfqPolicy::new(4, 10, 0);
        let low = spawn(&mut table, &mut policy, 2);
        let high = spawn(&mut table, &mut policy, 0);

        assert_eq!(policy.ready_counts_by_level(), [1, 0, 1, 0]);
        assert_eq!(table.get(low).unwrap().time_slice, 40);

        let mut ctx = SchedContext::new(&mut table, 0, None);
        let decision = policy.pick_next(&mut ctx);
        assert_eq!(decision.next, Some(high));
        assert_eq!(decision.timeslice.get(), 10);
        assert!(policy.outranks(&ctx, high, low));
        assert!(!policy.outranks(&ctx, low, high));
    }

    #[test]
    fn mlfq_demotes_after_full_slice_and_keeps_level_on_yield() {
        let mut table = ProcessTable::new();
        let mut policy = MlfqPolicy::new(3, 2, 0);
        let a = spawn(&mut table, &mut policy, 0);
        pick(&mut table, &mut policy);
        table.get_mut(a).unwrap().set_state(ProcessState::Running);

        let mut ctx = SchedContext::new(&mut table, 1, Some(a));
        policy.on_event(&mut ctx, SchedEvent::Tick { now: 1, current: Some(a) });
        assert!(!ctx.take_reschedule_request());

        // Yield resets the level budget
        ctx.process_mut(a).unwrap().set_state(ProcessState::Ready);
        policy.on_event(&mut ctx, SchedEvent::ProcessYielded { handle: a });
        assert_eq!(ctx.process(a).unwrap().time_in_queue, 0);
        assert_eq!(policy.pick_next(&mut ctx).next, Some(a));
        ctx.process_mut(a).unwrap().set_state(ProcessState::Running);

        policy.on_event(&mut ctx, SchedEvent::Tick { now: 2, current: Some(a) });
        policy.on_event(&mut ctx, SchedEvent::Tick { now: 3, current: Some(a) });
        assert!(ctx.take_reschedule_request());

        let pcb = ctx.process(a).unwrap();
        assert_eq!(pcb.queue_level, 1);
        assert_eq!(pcb.priority, 1);
        assert_eq!(pcb.demotions, 1);
        assert_eq!(pcb.time_slice, 4);
    }

    #[test]
    fn mlfq_boost_lifts_queued_processes() {
        let mut table = ProcessTable::new();
        let mut policy = MlfqPolicy::new(4, 10, 50);
        let a = spawn(&mut table, &mut policy, 3);
        let b = spawn(&mut table, &mut policy, 1);

        let mut ctx = SchedContext::new(&mut table, 50, None);
        policy.on_event(&mut ctx, SchedEvent::Tick { now: 50, current: None });

        assert_eq!(policy.ready_counts_by_level(), [2, 0, 0, 0]);
        assert_eq!(ctx.process(a).unwrap().queue_level, 0);
        assert_eq!(ctx.process(a).unwrap().promotions, 1);
        assert_eq!(ctx.process(b).unwrap().queue_level, 0);

        // Upper levels keep their head start
        assert_eq!(policy.pick_next(&mut ctx).next, Some(b));
    }
}
