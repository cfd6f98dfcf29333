/*
 * Shared helpers for the scheduler integration tests
 */

#![allow(dead_code)]

use std::sync::Once;

use cluu_sched::{Pid, ProcessControlBlock, SchedulerState};
use log::{Level, LevelFilter, Metadata, Record};

struct TestLogger;

impl log::Log for TestLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: TestLogger = TestLogger;
static INIT: Once = Once::new();

/// Route scheduler warnings to the test output
pub fn init_logger() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Warn));
    });
}

/// Advance `ticks` ticks, validating the accounting after each one
pub fn run_ticks(sched: &mut SchedulerState, ticks: u64) {
    for _ in 0..ticks {
        sched.tick();
        sched.validate().unwrap();
    }
}

pub fn pcb(sched: &SchedulerState, pid: Pid) -> &ProcessControlBlock {
    sched
        .process(pid)
        .unwrap_or_else(|| panic!("PID {pid} is not live"))
}

/// Tiny deterministic generator for operation sequences
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}
