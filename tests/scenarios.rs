/*
 * Scheduling scenario tests
 *
 * End-to-end behaviour of each dispatch discipline, driven only through the
 * public tick and lifecycle API.
 */

mod common;

use std::sync::{Arc, Mutex};

use cluu_sched::scheduler::{ContextSwitcher, CpuContext, MAX_PROCESSES};
use cluu_sched::{BlockReason, Pid, ProcessFlags, ProcessState, SchedError, SchedulerConfig, init};
use common::{init_logger, pcb, run_ticks};

#[test]
fn round_robin_three_processes_quantum_three() {
    init_logger();
    let mut sched = init(SchedulerConfig::round_robin(3));
    let pids: Vec<Pid> = ["P1", "P2", "P3"]
        .iter()
        .map(|name| sched.create_process(name, 0).unwrap())
        .collect();

    run_ticks(&mut sched, 1);
    let after_first_dispatch = sched.stats().context_switches;
    run_ticks(&mut sched, 8);

    assert_eq!(sched.stats().context_switches - after_first_dispatch, 2);
    for pid in &pids {
        assert_eq!(pcb(&sched, *pid).time_used, 3);
    }
}

#[test]
fn mlfq_interactive_process_keeps_top_priority() {
    init_logger();
    let mut sched = init(SchedulerConfig::mlfq(4, 1000).with_time_quantum(10));
    let interactive = sched.create_process("P_interactive", 0).unwrap();
    let batch = sched.create_process("P_batch", 0).unwrap();

    for _ in 0..100 {
        sched.tick();
        if sched.current_pid() == Some(interactive) && pcb(&sched, interactive).time_used % 3 == 0 {
            sched.yield_current();
        }
        sched.validate().unwrap();
    }

    let interactive = pcb(&sched, interactive);
    let batch = pcb(&sched, batch);
    assert_eq!(interactive.priority, 0);
    assert!(interactive.flags.contains(ProcessFlags::IO_BOUND));
    assert!(batch.priority >= 1);
    assert!(batch.flags.contains(ProcessFlags::CPU_BOUND));
}

#[test]
fn mlfq_demotes_exactly_when_level_slice_is_used() {
    init_logger();
    let mut sched = init(SchedulerConfig::mlfq(4, 0).with_time_quantum(10));
    let hog = sched.create_process("hog", 0).unwrap();

    run_ticks(&mut sched, 9);
    assert_eq!(pcb(&sched, hog).queue_level, 0);
    assert_eq!(pcb(&sched, hog).time_slice_used, 9);

    run_ticks(&mut sched, 1);
    let demoted = pcb(&sched, hog);
    assert_eq!(demoted.queue_level, 1);
    assert_eq!(demoted.demotions, 1);
    assert_eq!(demoted.time_slice, 20);

    // Next dispatch hands out the longer level-1 slice
    run_ticks(&mut sched, 1);
    assert_eq!(pcb(&sched, hog).time_slice_used, 1);
    assert_eq!(pcb(&sched, hog).time_slice, 20);
}

#[test]
fn mlfq_boost_returns_everyone_to_level_zero() {
    init_logger();
    let mut sched = init(SchedulerConfig::mlfq(4, 50).with_time_quantum(10));
    let a = sched.create_process("a", 0).unwrap();
    let b = sched.create_process("b", 0).unwrap();

    run_ticks(&mut sched, 49);
    assert_eq!(pcb(&sched, a).queue_level, 2);
    assert_eq!(pcb(&sched, b).queue_level, 1);

    run_ticks(&mut sched, 1);
    for pid in [a, b] {
        assert_eq!(pcb(&sched, pid).queue_level, 0);
        assert_eq!(pcb(&sched, pid).priority, 0);
        assert_eq!(pcb(&sched, pid).promotions, 1);
    }
    assert_eq!(sched.ready_counts_by_level(), [1, 0, 0, 0]);
}

#[test]
fn mlfq_boost_includes_blocked_processes() {
    init_logger();
    let mut sched = init(SchedulerConfig::mlfq(4, 30).with_time_quantum(5));
    let sleeper = sched.create_process("sleeper", 2).unwrap();

    run_ticks(&mut sched, 1);
    sched.block_current(BlockReason::WaitingForLock { lock_id: 7 }).unwrap();
    run_ticks(&mut sched, 29);

    let blocked = pcb(&sched, sleeper);
    assert_eq!(blocked.state, ProcessState::Blocked);
    assert_eq!(blocked.queue_level, 0);

    // Woken processes resume at their current level
    sched.wake(sleeper).unwrap();
    assert_eq!(sched.ready_counts_by_level(), [1, 0, 0, 0]);
}

#[test]
fn mlfq_higher_level_arrival_preempts() {
    init_logger();
    let mut sched = init(SchedulerConfig::mlfq(4, 0).with_time_quantum(2));
    let hog = sched.create_process("hog", 0).unwrap();
    run_ticks(&mut sched, 3);
    assert_eq!(pcb(&sched, hog).queue_level, 1);
    assert_eq!(sched.current_pid(), Some(hog));

    let fresh = sched.create_process("fresh", 0).unwrap();
    assert!(sched.reschedule_pending());
    run_ticks(&mut sched, 1);
    assert_eq!(sched.current_pid(), Some(fresh));
    assert_eq!(pcb(&sched, hog).state, ProcessState::Ready);
}

#[test]
fn round_robin_never_runs_a_process_past_its_quantum() {
    init_logger();
    let mut sched = init(SchedulerConfig::round_robin(4));
    for name in ["a", "b", "c"] {
        sched.create_process(name, 0).unwrap();
    }

    let mut last = None;
    let mut streak = 0;
    for _ in 0..120 {
        sched.tick();
        sched.validate().unwrap();

        let running = sched.current_pid();
        streak = if running == last { streak + 1 } else { 1 };
        last = running;
        assert!(streak <= 4, "{running:?} ran {streak} ticks in a row");
    }

    for process in sched.processes() {
        assert_eq!(process.time_used, 40);
    }
}

#[test]
fn fifo_runs_to_completion_in_arrival_order() {
    init_logger();
    let mut sched = init(SchedulerConfig::fifo().with_time_quantum(5));
    let first = sched.create_process("first", 3).unwrap();
    let second = sched.create_process("second", 0).unwrap();
    let third = sched.create_process("third", 1).unwrap();

    run_ticks(&mut sched, 50);
    assert_eq!(sched.current_pid(), Some(first));
    assert_eq!(pcb(&sched, first).time_used, 50);
    assert_eq!(pcb(&sched, second).time_used, 0);

    sched.terminate_process(first).unwrap();
    assert_eq!(sched.current_pid(), Some(second));
    sched.terminate_process(second).unwrap();
    assert_eq!(sched.current_pid(), Some(third));
    assert_eq!(sched.stats().processes_completed, 2);
}

#[test]
fn fifo_ignores_preemption_flag() {
    init_logger();
    let mut sched = init(SchedulerConfig::fifo().with_preemption(true).with_time_quantum(2));
    let first = sched.create_process("first", 0).unwrap();
    sched.create_process("second", 0).unwrap();

    run_ticks(&mut sched, 10);
    assert_eq!(sched.current_pid(), Some(first));
    assert_eq!(sched.stats().context_switches, 1);
}

#[test]
fn yield_hands_cpu_to_next_in_line() {
    init_logger();
    let mut sched = init(SchedulerConfig::round_robin(10));
    let a = sched.create_process("a", 0).unwrap();
    let b = sched.create_process("b", 0).unwrap();

    run_ticks(&mut sched, 1);
    assert_eq!(sched.current_pid(), Some(a));
    sched.yield_current();
    assert_eq!(sched.current_pid(), Some(b));
    assert_eq!(pcb(&sched, a).state, ProcessState::Ready);
    sched.validate().unwrap();
}

#[test]
fn create_then_terminate_leaves_queues_unchanged() {
    init_logger();
    for config in [
        SchedulerConfig::fifo(),
        SchedulerConfig::round_robin(3),
        SchedulerConfig::default(),
    ] {
        let mut sched = init(config);
        sched.create_process("resident", 1).unwrap();
        run_ticks(&mut sched, 2);

        let ready = sched.ready_counts_by_level();
        let waiting = sched.waiting_count();

        let pid = sched.create_process("transient", 2).unwrap();
        sched.terminate_process(pid).unwrap();

        assert_eq!(sched.ready_counts_by_level(), ready);
        assert_eq!(sched.waiting_count(), waiting);
        sched.validate().unwrap();
    }
}

#[test]
fn process_table_capacity() {
    init_logger();
    let mut sched = init(SchedulerConfig::round_robin(2));
    let pids: Vec<Pid> = (0..MAX_PROCESSES)
        .map(|n| sched.create_process(&format!("p{n}"), 0).unwrap())
        .collect();

    assert_eq!(
        sched.create_process("one-too-many", 0),
        Err(SchedError::ProcessTableFull {
            capacity: MAX_PROCESSES
        })
    );

    sched.terminate_process(pids[5]).unwrap();
    let late = sched.create_process("late", 0).unwrap();
    assert_eq!(late, Pid(MAX_PROCESSES as u32 + 1));
    assert_eq!(sched.live_count(), MAX_PROCESSES);
    sched.validate().unwrap();
}

#[test]
fn statistics_track_completed_work() {
    init_logger();
    let mut sched = init(SchedulerConfig::round_robin(5));
    let a = sched.create_process("a", 0).unwrap();
    let b = sched.create_process("b", 0).unwrap();

    run_ticks(&mut sched, 10);
    sched.terminate_process(a).unwrap();
    run_ticks(&mut sched, 5);
    sched.terminate_process(b).unwrap();
    run_ticks(&mut sched, 5);

    let stats = sched.stats();
    assert_eq!(stats.processes_created, 2);
    assert_eq!(stats.processes_completed, 2);
    assert_eq!(stats.total_ticks, 20);
    assert_eq!(stats.idle_ticks, 5);
    assert_eq!(stats.total_runtime, 15);
    assert_eq!(stats.cpu_utilization, 75);
    assert_eq!(stats.throughput, 100);
    assert_eq!(sched.idle_process().time_used, 5);

    let rendered = stats.to_string();
    assert!(rendered.contains("75% utilization"));

    sched.reset_stats();
    assert_eq!(sched.stats().total_ticks, 0);
}

#[derive(Clone, Default)]
struct RecordingSwitcher {
    switches: Arc<Mutex<Vec<(Pid, Pid, bool)>>>,
}

impl ContextSwitcher for RecordingSwitcher {
    fn switch(&mut self, from: Pid, saved: Option<&mut CpuContext>, to: Pid, restored: &CpuContext) {
        assert_ne!(restored.stack_pointer, 0);
        self.switches
            .lock()
            .unwrap()
            .push((from, to, saved.is_some()));
    }
}

#[test]
fn host_switcher_sees_every_real_switch() {
    init_logger();
    let switcher = RecordingSwitcher::default();
    let mut sched = init(SchedulerConfig::round_robin(2)).with_switcher(Box::new(switcher.clone()));

    let a = sched.create_process("a", 0).unwrap();
    let b = sched.create_process("b", 0).unwrap();
    run_ticks(&mut sched, 3);
    sched.terminate_process(b).unwrap();

    let switches = switcher.switches.lock().unwrap().clone();
    assert_eq!(
        switches,
        [
            (Pid::IDLE, a, true),
            (a, b, true),
            // b's descriptor is already gone when the switch happens
            (b, a, false),
        ]
    );
}
