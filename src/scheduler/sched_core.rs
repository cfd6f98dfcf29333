/*
 * Scheduler Core - Mechanism Layer
 *
 * This module implements SchedulerCore, the mechanism layer that:
 * 1. Holds the active scheduling policy (Box<dyn SchedPolicy>)
 * 2. Tracks the CPU's scheduling state (current process, reschedule flag)
 * 3. Translates lifecycle operations into SchedEvents
 * 4. Turns policy decisions into dispatches
 *
 * The SchedulerCore separates "mechanism" (how to switch processes) from
 * "policy" (which process to run next). SchedulerState drives it; the
 * policy never sees anything but a SchedContext.
 */

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{
    context::SchedContext,
    events::SchedEvent,
    traits::{KernelSchedCtx, SchedPolicy},
    types::{BlockReason, DispatchDecision, ProcessHandle},
};

/// Per-CPU scheduling state
#[derive(Debug, Default)]
pub struct PerCpuSchedState {
    /// Currently running process (None = idle)
    pub current: Option<ProcessHandle>,

    /// Whether this CPU needs to reschedule at the next opportunity
    pub need_resched: bool,

    /// Total ticks this CPU has handled
    pub total_ticks: u64,

    /// Number of context switches performed
    pub context_switches: u64,
}

impl PerCpuSchedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that this CPU should reschedule
    pub fn request_reschedule(&mut self) {
        self.need_resched = true;
    }

    /// Check if this CPU needs to reschedule
    pub fn should_reschedule(&self) -> bool {
        self.need_resched
    }

    /// Reset reschedule flag
    pub fn clear_reschedule(&mut self) {
        self.need_resched = false;
    }
}

/// Scheduler Core - The Mechanism Layer
///
/// SchedulerState calls methods like process_created(), process_woke(),
/// on_tick(), and SchedulerCore forwards them as SchedEvents to the active
/// policy. The policy returns DispatchDecisions, which reschedule() turns
/// into the new current process.
pub struct SchedulerCore {
    /// The active scheduling policy
    policy: Box<dyn SchedPolicy>,

    /// Scheduling state of the (single) CPU
    cpu: PerCpuSchedState,
}

impl SchedulerCore {
    /// Create a new SchedulerCore with the given policy
    pub fn new(policy: Box<dyn SchedPolicy>) -> Self {
        log::info!("SchedulerCore initialized with policy: {}", policy.name());

        Self {
            policy,
            cpu: PerCpuSchedState::new(),
        }
    }

    /// Get the name of the active policy
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    // ========================================================================
    // LIFECYCLE NOTIFICATIONS
    // ========================================================================

    /// Notify that a new process was admitted
    ///
    /// # Arguments
    /// - `ctx`: Context for the policy
    /// - `handle`: The new process, already READY
    /// - `priority`: Its (clamped) priority
    pub fn process_created(&mut self, ctx: &mut SchedContext<'_>, handle: ProcessHandle, priority: u8) {
        self.dispatch_event(ctx, SchedEvent::ProcessCreated { handle, priority });
        self.check_arrival(ctx, handle);
    }

    /// Notify that a blocked process became READY
    pub fn process_woke(&mut self, ctx: &mut SchedContext<'_>, handle: ProcessHandle, reason: BlockReason) {
        self.dispatch_event(
            ctx,
            SchedEvent::ProcessWoke {
                handle,
                was_blocked_on: reason,
            },
        );
        self.check_arrival(ctx, handle);
    }

    /// Notify that the running process yielded
    pub fn process_yielded(&mut self, ctx: &mut SchedContext<'_>, handle: ProcessHandle) {
        self.dispatch_event(ctx, SchedEvent::ProcessYielded { handle });

        // Always reschedule after yield
        self.cpu.request_reschedule();
    }

    /// Notify that the running process is being taken off the CPU
    pub fn process_preempted(&mut self, ctx: &mut SchedContext<'_>, handle: ProcessHandle) {
        self.dispatch_event(ctx, SchedEvent::ProcessPreempted { handle });
    }

    /// Notify that a process blocked
    pub fn process_blocked(&mut self, ctx: &mut SchedContext<'_>, handle: ProcessHandle, reason: BlockReason) {
        self.dispatch_event(ctx, SchedEvent::ProcessBlocked { handle, reason });

        // If the current process blocked, must reschedule
        if Some(handle) == self.cpu.current {
            self.cpu.request_reschedule();
        }
    }

    /// Notify that a process was terminated
    pub fn process_exited(&mut self, ctx: &mut SchedContext<'_>, handle: ProcessHandle) {
        self.dispatch_event(ctx, SchedEvent::ProcessExited { handle });

        if Some(handle) == self.cpu.current {
            self.cpu.request_reschedule();
        }
    }

    /// Notify that a process priority changed
    pub fn priority_changed(
        &mut self,
        ctx: &mut SchedContext<'_>,
        handle: ProcessHandle,
        old_priority: u8,
        new_priority: u8,
    ) {
        self.dispatch_event(
            ctx,
            SchedEvent::PriorityChanged {
                handle,
                old_priority,
                new_priority,
            },
        );

        if self.policy.is_queued(handle) {
            self.check_arrival(ctx, handle);
        }
    }

    // ========================================================================
    // TIMER TICK HANDLING
    // ========================================================================

    /// Handle a timer tick
    ///
    /// The mechanism has already charged the tick to the current process;
    /// this lets the policy react (MLFQ demotion and boost).
    ///
    /// # Returns
    /// true if a reschedule is pending
    pub fn on_tick(&mut self, ctx: &mut SchedContext<'_>) -> bool {
        self.cpu.total_ticks += 1;

        let event = SchedEvent::Tick {
            now: ctx.now_ticks(),
            current: self.cpu.current,
        };
        self.dispatch_event(ctx, event);

        self.cpu.should_reschedule()
    }

    // ========================================================================
    // CONTEXT SWITCH EXECUTION
    // ========================================================================

    /// Ask the policy for the next process and make it current
    ///
    /// The caller has already re-queued the previous process if it is still
    /// runnable, and performs the register switch afterwards.
    ///
    /// # Returns
    /// The policy's decision (next = None means idle)
    pub fn reschedule(&mut self, ctx: &mut SchedContext<'_>) -> DispatchDecision {
        self.cpu.clear_reschedule();

        let prev = self.cpu.current;
        let decision = self.policy.pick_next(ctx);
        self.absorb_reschedule_request(ctx);

        self.cpu.current = decision.next;

        if prev != decision.next {
            self.cpu.context_switches += 1;
        }

        decision
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Get the currently running process (None while idle)
    pub fn current(&self) -> Option<ProcessHandle> {
        self.cpu.current
    }

    pub fn should_reschedule(&self) -> bool {
        self.cpu.should_reschedule()
    }

    pub fn request_reschedule(&mut self) {
        self.cpu.request_reschedule();
    }

    pub fn cpu_state(&self) -> &PerCpuSchedState {
        &self.cpu
    }

    /// Does the policy take the CPU away when a slice expires?
    pub fn is_preemptive(&self) -> bool {
        self.policy.is_preemptive()
    }

    pub fn is_queued(&self, handle: ProcessHandle) -> bool {
        self.policy.is_queued(handle)
    }

    pub fn ready_count(&self) -> usize {
        self.policy.ready_count()
    }

    pub fn ready_counts_by_level(&self) -> Vec<usize> {
        self.policy.ready_counts_by_level()
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn dispatch_event(&mut self, ctx: &mut SchedContext<'_>, event: SchedEvent) {
        log::trace!("[{}] {}", self.policy.name(), event.name());
        self.policy.on_event(ctx, event);
        self.absorb_reschedule_request(ctx);
    }

    fn absorb_reschedule_request(&mut self, ctx: &mut SchedContext<'_>) {
        if ctx.take_reschedule_request() {
            self.cpu.request_reschedule();
        }
    }

    /// Request a reschedule if a newly READY process should take the CPU
    fn check_arrival(&mut self, ctx: &SchedContext<'_>, handle: ProcessHandle) {
        let preempts = match self.cpu.current {
            None => true,
            Some(current) => self.policy.outranks(ctx, handle, current),
        };

        if preempts {
            self.cpu.request_reschedule();
        }
    }
}

impl core::fmt::Debug for SchedulerCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedulerCore")
            .field("policy", &self.policy.name())
            .field("cpu", &self.cpu)
            .finish()
    }
}
