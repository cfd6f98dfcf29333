/*
 * CLUU Scheduler Core
 *
 * Process scheduler for the CLUU microkernel, built as a standalone
 * no_std + alloc library. The kernel drives it through two narrow
 * interfaces: a periodic tick, and process lifecycle calls (create,
 * terminate, yield, block, wake).
 *
 * Why this is important:
 * - Keeps scheduling policy and dispatch mechanism free of hardware code
 * - Lets the same scheduler run inside the kernel and in host-side tests
 * - Provides FIFO, Round-Robin and MLFQ dispatch behind one policy trait
 *
 * Key features:
 * - Fixed-capacity process table addressed by stable handles
 * - Deterministic virtual clock; no timers, no threads of its own
 * - Statistics and invariant validation for simulation runs
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod scheduler;

pub use scheduler::{
    BlockReason, Pid, ProcessControlBlock, ProcessFlags, ProcessState, SchedError, SchedResult,
    SchedulerConfig, SchedulerState, SchedulerStats, SchedulerType, SharedScheduler, init,
};
