/*
 * Scheduler Implementation
 *
 * This module contains SchedulerState, the value every scheduler operation
 * runs against. It owns the process table, the wait queue, the idle
 * process, the statistics and the SchedulerCore (which in turn owns the
 * active policy).
 *
 * This file is separated from mod.rs to make the structure clear:
 * - scheduler.rs: Lifecycle operations, tick handling and dispatch (this file)
 * - mod.rs: Public API layer and the shared wrapper
 *
 * Reschedule timing:
 * Explicit operations (yield, block, sleep, terminating the running process,
 * schedule()) switch immediately. Reschedules requested while a tick is
 * being charged (slice expiry, demotion, boost) or by an arrival are
 * serviced at the start of the next tick, so every tick is charged to the
 * process that actually held the CPU.
 */

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{
    config::{MAX_PROCESSES, SchedulerConfig, SchedulerType},
    context::SchedContext,
    cpu_context::{ContextSwitcher, CpuContext, NoopSwitcher},
    error::{Inconsistency, SchedError, SchedResult},
    policies,
    process::{ProcessControlBlock, ProcessFlags, ProcessState},
    process_table::ProcessTable,
    sched_core::SchedulerCore,
    stats::{SchedulerStats, StatsCollector},
    types::{BlockReason, Pid, ProcessHandle},
    wait_queue::WaitQueue,
};

/// Complete scheduler state
pub struct SchedulerState {
    config: SchedulerConfig,
    table: ProcessTable,
    wait_queue: WaitQueue,
    core: SchedulerCore,
    idle: ProcessControlBlock,
    stats: StatsCollector,
    clock: u64,
    switcher: Box<dyn ContextSwitcher>,
}

impl SchedulerState {
    /// Bring up a scheduler
    ///
    /// The configuration is normalized first; the idle process starts out
    /// running and the clock at 0.
    pub fn new(config: SchedulerConfig) -> Self {
        let config = config.normalized();
        let core = SchedulerCore::new(policies::for_config(&config));

        log::info!(
            "scheduler initialized: {} policy, quantum {}, preemption {}",
            config.scheduler_type,
            config.time_quantum,
            if config.enable_preemption { "on" } else { "off" }
        );
        if config.scheduler_type == SchedulerType::Mlfq {
            log::info!(
                "MLFQ: {} levels, boost every {} ticks",
                config.mlfq_levels,
                config.boost_interval
            );
        }

        Self {
            config,
            table: ProcessTable::new(),
            wait_queue: WaitQueue::new(),
            core,
            idle: ProcessControlBlock::idle(),
            stats: StatsCollector::new(),
            clock: 0,
            switcher: Box::new(NoopSwitcher),
        }
    }

    /// Install the host's context switch routine
    pub fn with_switcher(mut self, switcher: Box<dyn ContextSwitcher>) -> Self {
        self.switcher = switcher;
        self
    }

    // ========================================================================
    // PROCESS LIFECYCLE
    // ========================================================================

    /// Create a process and admit it to the active policy
    ///
    /// # Arguments
    /// * `name` - Process name, truncated to 32 bytes
    /// * `priority` - Requested priority (0 = highest); clamped if out of range
    ///
    /// # Returns
    /// The PID of the new process, or `ProcessTableFull`
    pub fn create_process(&mut self, name: &str, priority: u8) -> SchedResult<Pid> {
        let priority = self.clamp_priority(priority);
        let handle = self
            .table
            .allocate(name, priority, self.clock)
            .inspect_err(|err| log::warn!("cannot create '{}': {}", name, err))?;

        let sched_flag = match self.config.scheduler_type {
            SchedulerType::Fifo => ProcessFlags::SCHED_FIFO,
            SchedulerType::RoundRobin => ProcessFlags::SCHED_RR,
            SchedulerType::Mlfq => ProcessFlags::SCHED_MLFQ,
        };

        let quantum = self.config.time_quantum;
        let parent = self.current_pid();
        let Some(pcb) = self.table.get_mut(handle) else {
            return Err(SchedError::ProcessNotFound(handle.pid()));
        };
        pcb.parent = parent;
        pcb.flags.insert(sched_flag);
        pcb.time_slice = quantum;
        pcb.set_state(ProcessState::Ready);

        let mut ctx = SchedContext::new(&mut self.table, self.clock, self.core.current());
        self.core.process_created(&mut ctx, handle, priority);
        self.stats.record_created();

        log::info!("created process '{}' (PID {}, priority {})", name, handle.pid(), priority);
        Ok(handle.pid())
    }

    /// Terminate a process with exit code 0
    ///
    /// See [`terminate_with_exit_code`](Self::terminate_with_exit_code).
    pub fn terminate_process(&mut self, pid: Pid) -> SchedResult<()> {
        self.terminate_with_exit_code(pid, 0)
    }

    /// Terminate a process
    ///
    /// Removes it from whatever queue holds it, records its statistics and
    /// frees its slot. Its children become orphans, and processes blocked
    /// on `WaitingForChild` for it are woken with its exit status.
    /// Terminating the running process dispatches the next one immediately.
    pub fn terminate_with_exit_code(&mut self, pid: Pid, exit_code: i32) -> SchedResult<()> {
        if pid.is_idle() {
            return Err(SchedError::IdleProcess);
        }

        let handle = match self.table.find(pid) {
            Some(handle) => handle,
            None if self.table.was_issued(pid) => return Err(SchedError::AlreadyTerminated(pid)),
            None => {
                log::warn!("terminate of unknown PID {}", pid);
                return Err(SchedError::ProcessNotFound(pid));
            }
        };

        let was_running = self.core.current() == Some(handle);
        self.wait_queue.remove_waiter(handle);

        let mut ctx = SchedContext::new(&mut self.table, self.clock, self.core.current());
        self.core.process_exited(&mut ctx, handle);

        let now = self.clock;
        if let Some(pcb) = self.table.get_mut(handle) {
            pcb.set_state(ProcessState::Terminated);
            pcb.time_terminated = Some(now);
            pcb.exit_code = Some(exit_code);
            pcb.wait_reason = None;
        }
        if let Some(pcb) = self.table.free(handle) {
            self.stats.record_completion(&pcb, now);
            log::info!(
                "terminated process '{}' (PID {}, exit code {}): ran {} ticks, turnaround {}",
                pcb.name,
                pid,
                exit_code,
                pcb.time_used,
                pcb.turnaround_time().unwrap_or(0)
            );
        }

        self.orphan_children(pid);
        for (waiter, reason) in self.wait_queue.take_child_waiters(pid) {
            if let Some(parent) = self.table.get_mut(waiter) {
                parent.child_status = Some((pid, exit_code));
            }
            self.make_ready(waiter, reason);
        }

        if was_running {
            self.schedule();
        }

        Ok(())
    }

    /// Give up the CPU voluntarily
    ///
    /// The process keeps its priority level. No-op while idle.
    pub fn yield_current(&mut self) {
        let Some(handle) = self.core.current() else {
            log::trace!("yield while idle");
            return;
        };

        if let Some(pcb) = self.table.get_mut(handle) {
            pcb.set_state(ProcessState::Ready);
            pcb.mark_io_bound();
        }

        let mut ctx = SchedContext::new(&mut self.table, self.clock, Some(handle));
        self.core.process_yielded(&mut ctx, handle);

        self.schedule();
    }

    /// Block the running process
    ///
    /// # Returns
    /// The PID that was blocked, or `NoCurrentProcess` while idle
    pub fn block_current(&mut self, reason: BlockReason) -> SchedResult<Pid> {
        let Some(handle) = self.core.current() else {
            return Err(SchedError::NoCurrentProcess);
        };

        if let Some(pcb) = self.table.get_mut(handle) {
            pcb.set_state(ProcessState::Blocked);
            pcb.wait_reason = Some(reason);
            pcb.mark_io_bound();
        }
        self.wait_queue.add_waiter(handle, reason);

        let mut ctx = SchedContext::new(&mut self.table, self.clock, Some(handle));
        self.core.process_blocked(&mut ctx, handle, reason);

        log::debug!("PID {} blocked: {:?}", handle.pid(), reason);
        self.schedule();

        Ok(handle.pid())
    }

    /// Put the running process to sleep for `ticks` ticks
    ///
    /// Sleeping for 0 ticks is a yield.
    pub fn sleep_current(&mut self, ticks: u64) -> SchedResult<Pid> {
        if ticks == 0 {
            let pid = self.current_pid().ok_or(SchedError::NoCurrentProcess)?;
            self.yield_current();
            return Ok(pid);
        }

        self.block_current(BlockReason::Sleeping {
            until_tick: self.clock.saturating_add(ticks),
        })
    }

    /// Make a blocked process READY again
    ///
    /// Waking a process that is not blocked does nothing.
    pub fn wake(&mut self, pid: Pid) -> SchedResult<()> {
        let Some(handle) = self.table.find(pid) else {
            log::warn!("wake of unknown PID {}", pid);
            return Err(SchedError::ProcessNotFound(pid));
        };

        let blocked = self
            .table
            .get(handle)
            .is_some_and(|pcb| pcb.state == ProcessState::Blocked);
        if !blocked {
            log::trace!("wake of PID {} ignored: not blocked", pid);
            return Ok(());
        }

        let reason = self.wait_queue.remove_waiter(handle).unwrap_or(BlockReason::Other);
        self.make_ready(handle, reason);
        Ok(())
    }

    /// Change a process priority
    ///
    /// Under MLFQ the process also moves to the matching level.
    pub fn set_priority(&mut self, pid: Pid, priority: u8) -> SchedResult<()> {
        let handle = self.table.find(pid).ok_or(SchedError::ProcessNotFound(pid))?;
        let priority = self.clamp_priority(priority);

        let Some(pcb) = self.table.get_mut(handle) else {
            return Err(SchedError::ProcessNotFound(pid));
        };
        let old_priority = pcb.priority;
        pcb.priority = priority;

        let mut ctx = SchedContext::new(&mut self.table, self.clock, self.core.current());
        self.core.priority_changed(&mut ctx, handle, old_priority, priority);

        log::debug!("PID {} priority {} -> {}", pid, old_priority, priority);
        Ok(())
    }

    // ========================================================================
    // TIMER TICK
    // ========================================================================

    /// Advance the clock by one tick
    ///
    /// 1. Service a pending reschedule
    /// 2. Charge the tick to the running process (or idle)
    /// 3. Wake sleepers whose deadline passed
    /// 4. Let the policy adjust priorities (demotion, boost)
    /// 5. Flag slice expiry for the next tick
    pub fn tick(&mut self) {
        self.clock += 1;

        if self.core.should_reschedule() {
            self.schedule();
        }

        let current = self.core.current();
        match current.and_then(|handle| self.table.get_mut(handle)) {
            Some(pcb) => {
                pcb.time_used += 1;
                pcb.time_slice_used = pcb.time_slice_used.saturating_add(1);
                pcb.vruntime += 1;
                self.stats.record_tick(false);
            }
            None => {
                self.idle.time_used += 1;
                self.stats.record_tick(true);
            }
        }
        log::trace!("tick {}: running PID {}", self.clock, self.current_pid().unwrap_or(Pid::IDLE));

        self.wake_sleepers();

        let mut ctx = SchedContext::new(&mut self.table, self.clock, current);
        self.core.on_tick(&mut ctx);

        if self.preemption_active() {
            let expired = current
                .and_then(|handle| self.table.get(handle))
                .is_some_and(ProcessControlBlock::slice_expired);
            if expired {
                self.core.request_reschedule();
            }
        }

        if self.config.enable_multicore && self.clock % self.config.load_balance_interval == 0 {
            self.load_balance();
        }
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Pick the next process and switch to it
    ///
    /// A still-running previous process is re-queued first, so it competes
    /// with everything else that is ready. Falls back to the idle process
    /// when nothing is.
    pub fn schedule(&mut self) {
        let prev = self.core.current();

        if let Some(handle) = prev {
            let still_running = match self.table.get_mut(handle) {
                Some(pcb) if pcb.state == ProcessState::Running => {
                    pcb.set_state(ProcessState::Ready);
                    true
                }
                _ => false,
            };

            if still_running {
                let mut ctx = SchedContext::new(&mut self.table, self.clock, prev);
                self.core.process_preempted(&mut ctx, handle);
            }
        }

        let mut ctx = SchedContext::new(&mut self.table, self.clock, prev);
        let decision = self.core.reschedule(&mut ctx);
        let next = decision.next;

        let now = self.clock;
        match next.and_then(|handle| self.table.get_mut(handle)) {
            Some(pcb) => {
                pcb.set_state(ProcessState::Running);
                pcb.time_slice = decision.timeslice.get();
                pcb.time_slice_used = 0;
                pcb.time_started = now;
                if !pcb.has_run() {
                    pcb.time_first_run = Some(now);
                    self.stats.record_first_dispatch(pcb);
                }
                self.idle.set_state(ProcessState::Ready);
            }
            None => {
                self.idle.set_state(ProcessState::Running);
                self.idle.time_started = now;
            }
        }

        if prev != next {
            self.stats.record_context_switch();
            self.switch_context(prev, next);
        }
    }

    fn switch_context(&mut self, prev: Option<ProcessHandle>, next: Option<ProcessHandle>) {
        let from = prev.map_or(Pid::IDLE, ProcessHandle::pid);
        let to = next.map_or(Pid::IDLE, ProcessHandle::pid);

        let restored = match next {
            Some(handle) => match self.table.get(handle) {
                Some(pcb) => pcb.context,
                None => return,
            },
            None => self.idle.context,
        };

        let saved: Option<&mut CpuContext> = match prev {
            Some(handle) => self.table.get_mut(handle).map(|pcb| &mut pcb.context),
            None => Some(&mut self.idle.context),
        };

        log::debug!("switch PID {} -> PID {}", from, to);
        self.switcher.switch(from, saved, to, &restored);
    }

    fn make_ready(&mut self, handle: ProcessHandle, reason: BlockReason) {
        if let Some(pcb) = self.table.get_mut(handle) {
            pcb.set_state(ProcessState::Ready);
            pcb.wait_reason = None;
        }

        let mut ctx = SchedContext::new(&mut self.table, self.clock, self.core.current());
        self.core.process_woke(&mut ctx, handle, reason);

        log::debug!("PID {} woke ({:?})", handle.pid(), reason);
    }

    fn orphan_children(&mut self, parent: Pid) {
        for handle in self.table.handles() {
            if let Some(child) = self.table.get_mut(handle) {
                if child.parent == Some(parent) {
                    child.parent = None;
                    log::debug!("PID {} orphaned by exit of PID {}", child.pid, parent);
                }
            }
        }
    }

    fn wake_sleepers(&mut self) {
        for (handle, reason) in self.wait_queue.take_expired_sleepers(self.clock) {
            self.make_ready(handle, reason);
        }
    }

    /// Single-CPU stand-in for load balancing; only reports imbalance
    fn load_balance(&mut self) {
        let ready = self.core.ready_count();
        if ready > MAX_PROCESSES / 2 {
            log::debug!("load balance at tick {}: {} processes ready", self.clock, ready);
        }
    }

    fn preemption_active(&self) -> bool {
        self.config.enable_preemption && self.core.is_preemptive()
    }

    fn clamp_priority(&self, requested: u8) -> u8 {
        let max = self.config.priority_levels() - 1;
        if requested > max {
            let err = SchedError::InvalidPriority {
                requested,
                clamped: max,
            };
            log::warn!("{}", err);
            return max;
        }
        requested
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// Current clock value
    pub fn now(&self) -> u64 {
        self.clock
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.core.policy_name()
    }

    /// Running process (None while idle)
    pub fn current_pid(&self) -> Option<Pid> {
        self.core.current().map(ProcessHandle::pid)
    }

    /// Look up a live process
    pub fn process(&self, pid: Pid) -> Option<&ProcessControlBlock> {
        if pid.is_idle() {
            return Some(&self.idle);
        }
        self.table.find(pid).and_then(|handle| self.table.get(handle))
    }

    /// Iterate over live processes (idle excluded)
    pub fn processes(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.table.iter().map(|(_, pcb)| pcb)
    }

    /// Live processes created while `parent` was running
    pub fn children(&self, parent: Pid) -> impl Iterator<Item = Pid> + '_ {
        self.processes()
            .filter(move |pcb| pcb.parent == Some(parent))
            .map(|pcb| pcb.pid)
    }

    pub fn idle_process(&self) -> &ProcessControlBlock {
        &self.idle
    }

    pub fn ready_count(&self) -> usize {
        self.core.ready_count()
    }

    /// Ready queue lengths, highest level first (one entry for FIFO/RR)
    pub fn ready_counts_by_level(&self) -> Vec<usize> {
        self.core.ready_counts_by_level()
    }

    pub fn waiting_count(&self) -> usize {
        self.wait_queue.len()
    }

    /// Live processes, idle excluded
    pub fn live_count(&self) -> usize {
        self.table.live_count()
    }

    /// Is a reschedule pending for the next tick?
    pub fn reschedule_pending(&self) -> bool {
        self.core.should_reschedule()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Check the accounting invariants
    ///
    /// - ready + waiting + running (idle excluded) == live
    /// - exactly one RUNNING descriptor, idle included
    /// - every process sits exactly where its state says
    /// - the running process is within its slice unless a reschedule is pending
    pub fn validate(&self) -> SchedResult<()> {
        let current = self.core.current();
        let ready = self.core.ready_count();
        let waiting = self.wait_queue.len();
        let running = usize::from(current.is_some());
        let live = self.table.live_count();

        if ready + waiting + running != live {
            return Err(Inconsistency::QueueAccounting {
                ready,
                waiting,
                running,
                live,
            }
            .into());
        }

        let idle_running = self.idle.state == ProcessState::Running;
        let count = self
            .table
            .iter()
            .filter(|(_, pcb)| pcb.state == ProcessState::Running)
            .count()
            + usize::from(idle_running);
        if count != 1 || idle_running == current.is_some() {
            return Err(Inconsistency::RunningCount { count }.into());
        }

        for (handle, pcb) in self.table.iter() {
            let queued = self.core.is_queued(handle);
            let waiting = self.wait_queue.contains(handle);

            let consistent = match pcb.state {
                ProcessState::Ready => queued && !waiting,
                ProcessState::Blocked => waiting && !queued,
                ProcessState::Running => current == Some(handle) && !queued && !waiting,
                ProcessState::New | ProcessState::Terminated => false,
            };
            if !consistent {
                return Err(Inconsistency::QueueMembership {
                    pid: pcb.pid,
                    state: pcb.state,
                }
                .into());
            }
        }

        if self.preemption_active() && !self.core.should_reschedule() {
            if let Some(pcb) = current.and_then(|handle| self.table.get(handle)) {
                if pcb.time_slice_used > pcb.time_slice {
                    return Err(Inconsistency::SliceOverrun {
                        pid: pcb.pid,
                        used: pcb.time_slice_used,
                        slice: pcb.time_slice,
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

impl core::fmt::Debug for SchedulerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedulerState")
            .field("policy", &self.core.policy_name())
            .field("clock", &self.clock)
            .field("current", &self.current_pid())
            .field("live", &self.table.live_count())
            .field("ready", &self.core.ready_count())
            .field("waiting", &self.wait_queue.len())
            .finish()
    }
}
