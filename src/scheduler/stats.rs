/*
 * Scheduler Statistics
 *
 * Aggregate counters maintained by SchedulerState. The idle process never
 * contributes to process statistics; its ticks only feed the CPU
 * utilization denominator.
 */

use core::fmt;

use super::process::ProcessControlBlock;

/// Snapshot of scheduler statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Dispatches that changed the running process (idle included)
    pub context_switches: u64,
    pub processes_created: u64,
    pub processes_completed: u64,
    /// Sum of time_used over completed processes
    pub total_runtime: u64,
    /// Sum of (lifetime - time_used) over completed processes
    pub total_wait_time: u64,
    pub avg_turnaround_time: u64,
    pub avg_response_time: u64,
    pub idle_ticks: u64,
    pub total_ticks: u64,
    /// Percent of ticks not spent idle
    pub cpu_utilization: u64,
    /// Completions per 1000 ticks
    pub throughput: u64,
}

impl fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks: {} ({} idle, {}% utilization)", self.total_ticks, self.idle_ticks, self.cpu_utilization)?;
        writeln!(f, "context switches: {}", self.context_switches)?;
        writeln!(
            f,
            "processes: {} created, {} completed ({} per 1000 ticks)",
            self.processes_created, self.processes_completed, self.throughput
        )?;
        writeln!(f, "runtime: {} total, {} waiting", self.total_runtime, self.total_wait_time)?;
        write!(
            f,
            "avg turnaround: {}, avg response: {}",
            self.avg_turnaround_time, self.avg_response_time
        )
    }
}

/// Running statistics accumulator
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: SchedulerStats,
    total_turnaround: u64,
    total_response: u64,
    responses: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&mut self) {
        self.stats.processes_created += 1;
    }

    pub fn record_context_switch(&mut self) {
        self.stats.context_switches += 1;
    }

    /// Charge one tick, to idle or to a real process
    pub fn record_tick(&mut self, idle: bool) {
        self.stats.total_ticks += 1;
        if idle {
            self.stats.idle_ticks += 1;
        }
    }

    /// Record the first dispatch of a process
    pub fn record_first_dispatch(&mut self, pcb: &ProcessControlBlock) {
        if let Some(response) = pcb.response_time() {
            self.total_response += response;
            self.responses += 1;
        }
    }

    /// Record a terminated process
    pub fn record_completion(&mut self, pcb: &ProcessControlBlock, now: u64) {
        self.stats.processes_completed += 1;
        self.stats.total_runtime += pcb.time_used;
        self.stats.total_wait_time += pcb.wait_time(now);
        self.total_turnaround += pcb.turnaround_time().unwrap_or(0);
    }

    /// Snapshot with the derived fields filled in
    pub fn snapshot(&self) -> SchedulerStats {
        let mut stats = self.stats;

        if stats.processes_completed > 0 {
            stats.avg_turnaround_time = self.total_turnaround / stats.processes_completed;
        }
        if self.responses > 0 {
            stats.avg_response_time = self.total_response / self.responses;
        }
        if stats.total_ticks > 0 {
            let busy = stats.total_ticks - stats.idle_ticks;
            stats.cpu_utilization = busy * 100 / stats.total_ticks;
            stats.throughput = stats.processes_completed * 1000 / stats.total_ticks;
        }

        stats
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
