/*
 * Scheduler Configuration
 *
 * Compile-time bounds and the runtime SchedulerConfig that selects the
 * dispatch policy and its timing parameters.
 *
 * The configuration is a plain Copy value handed to init(). Out-of-range
 * values are clamped (with a warning) by normalized() rather than rejected,
 * so a host can never bring the scheduler up in an unusable state.
 */

use core::fmt;

/// Capacity of the process table (idle process not included)
pub const MAX_PROCESSES: usize = 64;

/// Maximum number of priority levels / MLFQ queues
pub const MAX_PRIORITY_LEVELS: usize = 4;

/// Base time slice in ticks
pub const TIME_SLICE_BASE: u32 = 10;

/// Maximum stored length of a process name in bytes
pub const PROCESS_NAME_LEN: usize = 32;

/// Default interval between MLFQ priority boosts
pub const DEFAULT_BOOST_INTERVAL: u64 = 1000;

/// Default interval between load-balance passes
pub const DEFAULT_LOAD_BALANCE_INTERVAL: u64 = 500;

/// Dispatch discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerType {
    /// First come, first served; never preempts
    Fifo,
    /// Fixed quantum rotation through a single FIFO queue
    RoundRobin,
    /// Multi-level feedback queue with demotion and periodic boost
    Mlfq,
}

impl SchedulerType {
    pub fn name(self) -> &'static str {
        match self {
            SchedulerType::Fifo => "FIFO",
            SchedulerType::RoundRobin => "RR",
            SchedulerType::Mlfq => "MLFQ",
        }
    }
}

impl fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Which policy dispatches processes
    pub scheduler_type: SchedulerType,

    /// Base time slice (RR uses it directly, MLFQ doubles it per level)
    pub time_quantum: u32,

    /// Whether slice expiry forces a reschedule
    pub enable_preemption: bool,

    /// Number of MLFQ levels (1..=MAX_PRIORITY_LEVELS)
    pub mlfq_levels: u8,

    /// Ticks between MLFQ priority boosts (0 disables boosting)
    pub boost_interval: u64,

    /// Run the (stub) load balancer periodically
    pub enable_multicore: bool,

    /// Ticks between load-balance passes
    pub load_balance_interval: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_type: SchedulerType::Mlfq,
            time_quantum: TIME_SLICE_BASE,
            enable_preemption: true,
            mlfq_levels: MAX_PRIORITY_LEVELS as u8,
            boost_interval: DEFAULT_BOOST_INTERVAL,
            enable_multicore: false,
            load_balance_interval: DEFAULT_LOAD_BALANCE_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// Non-preemptive first come, first served
    pub fn fifo() -> Self {
        Self {
            scheduler_type: SchedulerType::Fifo,
            enable_preemption: false,
            ..Self::default()
        }
    }

    /// Preemptive round-robin with the given quantum
    pub fn round_robin(time_quantum: u32) -> Self {
        Self {
            scheduler_type: SchedulerType::RoundRobin,
            time_quantum,
            ..Self::default()
        }
    }

    /// Multi-level feedback queue
    pub fn mlfq(levels: u8, boost_interval: u64) -> Self {
        Self {
            scheduler_type: SchedulerType::Mlfq,
            mlfq_levels: levels,
            boost_interval,
            ..Self::default()
        }
    }

    pub fn with_time_quantum(mut self, time_quantum: u32) -> Self {
        self.time_quantum = time_quantum;
        self
    }

    pub fn with_preemption(mut self, enable: bool) -> Self {
        self.enable_preemption = enable;
        self
    }

    pub fn with_boost_interval(mut self, ticks: u64) -> Self {
        self.boost_interval = ticks;
        self
    }

    pub fn with_multicore(mut self, enable: bool, load_balance_interval: u64) -> Self {
        self.enable_multicore = enable;
        self.load_balance_interval = load_balance_interval;
        self
    }

    /// Number of valid priority levels under this configuration
    ///
    /// MLFQ maps priorities onto its queues, so the level count bounds the
    /// priority range; the single-queue policies accept the full range.
    pub fn priority_levels(&self) -> u8 {
        match self.scheduler_type {
            SchedulerType::Mlfq => self.mlfq_levels,
            _ => MAX_PRIORITY_LEVELS as u8,
        }
    }

    /// Clamp every field into its valid range
    pub fn normalized(mut self) -> Self {
        if self.time_quantum == 0 {
            log::warn!("time_quantum 0 is invalid, using 1");
            self.time_quantum = 1;
        }

        let max_levels = MAX_PRIORITY_LEVELS as u8;
        if self.mlfq_levels == 0 || self.mlfq_levels > max_levels {
            let clamped = self.mlfq_levels.clamp(1, max_levels);
            log::warn!("mlfq_levels {} out of range, using {}", self.mlfq_levels, clamped);
            self.mlfq_levels = clamped;
        }

        if self.enable_multicore && self.load_balance_interval == 0 {
            log::warn!("load_balance_interval 0 is invalid, using {}", DEFAULT_LOAD_BALANCE_INTERVAL);
            self.load_balance_interval = DEFAULT_LOAD_BALANCE_INTERVAL;
        }

        self
    }
}
