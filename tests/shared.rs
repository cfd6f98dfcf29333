/*
 * SharedScheduler under concurrent callers
 *
 * One thread plays the timer interrupt, another creates and reaps
 * processes. Every operation is serialized by the spin lock, so the
 * accounting must hold whenever the lock is taken.
 */

mod common;

use std::sync::Arc;
use std::thread;

use cluu_sched::{SchedError, SchedulerConfig, SharedScheduler};
use common::init_logger;

const TICKS: u64 = 500;

#[test]
fn ticks_and_lifecycle_calls_interleave_safely() {
    init_logger();
    let shared = Arc::new(SharedScheduler::init(SchedulerConfig::mlfq(4, 100).with_time_quantum(3)));

    let timer = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for _ in 0..TICKS {
                shared.tick();
                shared.with(|state| state.validate()).unwrap();
            }
        })
    };

    let spawner = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            let mut live = Vec::new();
            for round in 0..200u32 {
                match shared.create_process("worker", (round % 4) as u8) {
                    Ok(pid) => live.push(pid),
                    Err(err) => assert!(matches!(err, SchedError::ProcessTableFull { .. })),
                }
                if round % 3 == 0 {
                    if let Some(pid) = live.pop() {
                        shared.terminate_process(pid).unwrap();
                    }
                }
                thread::yield_now();
            }
            live
        })
    };

    timer.join().unwrap();
    let survivors = spawner.join().unwrap();

    let state = Arc::into_inner(shared).unwrap().into_inner();
    state.validate().unwrap();
    assert_eq!(state.now(), TICKS);
    assert_eq!(state.stats().total_ticks, TICKS);
    assert_eq!(state.live_count(), survivors.len());
    for pid in survivors {
        assert!(state.process(pid).is_some());
    }
}

#[test]
fn lock_spans_several_operations() {
    init_logger();
    let shared = SharedScheduler::init(SchedulerConfig::round_robin(2));

    let pid = {
        let mut state = shared.lock();
        let pid = state.create_process("held", 0).unwrap();
        state.tick();
        assert_eq!(state.current_pid(), Some(pid));
        pid
    };

    shared.with(|state| state.sleep_current(4)).unwrap();
    assert_eq!(shared.with(|state| state.waiting_count()), 1);
    for _ in 0..4 {
        shared.tick();
    }
    shared.tick();
    assert_eq!(shared.with(|state| state.current_pid()), Some(pid));
    assert_eq!(shared.stats().context_switches, 3);
}
