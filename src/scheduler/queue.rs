/*
 * Ready Queues
 *
 * ReadyQueue is a bounded FIFO of process handles shared by the FIFO and
 * round-robin policies. MultiLevelQueue stacks one ReadyQueue per MLFQ
 * level and keeps the per-level time slices and boost bookkeeping.
 *
 * Queues hold handles only; the descriptors themselves stay in the process
 * table. A handle appears at most once across all queues.
 */

use alloc::vec::Vec;
use heapless::Deque;

use super::{
    config::{MAX_PRIORITY_LEVELS, MAX_PROCESSES},
    types::{ProcessHandle, TimeSliceTicks},
};

/// Bounded FIFO of ready processes
pub struct ReadyQueue {
    entries: Deque<ProcessHandle, MAX_PROCESSES>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Append at the tail
    ///
    /// # Returns
    /// `false` if the handle was already queued or the queue is full.
    pub fn enqueue(&mut self, handle: ProcessHandle) -> bool {
        if self.contains(handle) {
            log::warn!("{} is already queued", handle);
            return false;
        }

        self.entries.push_back(handle).is_ok()
    }

    /// Take the head
    pub fn dequeue(&mut self) -> Option<ProcessHandle> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<ProcessHandle> {
        self.entries.front().copied()
    }

    /// Remove `handle` wherever it sits, keeping the order of the rest
    pub fn remove(&mut self, handle: ProcessHandle) -> bool {
        let before = self.entries.len();
        let mut kept = Deque::new();

        while let Some(entry) = self.entries.pop_front() {
            if entry != handle {
                // Cannot fail: `kept` has the same capacity.
                let _ = kept.push_back(entry);
            }
        }

        self.entries = kept;
        self.entries.len() != before
    }

    pub fn contains(&self, handle: ProcessHandle) -> bool {
        self.entries.iter().any(|entry| *entry == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate from head to tail
    pub fn iter(&self) -> impl Iterator<Item = ProcessHandle> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// One ready queue per MLFQ level
///
/// Level 0 has the highest priority and the shortest slice; the slice
/// doubles with every level down.
pub struct MultiLevelQueue {
    queues: [ReadyQueue; MAX_PRIORITY_LEVELS],
    time_slices: [TimeSliceTicks; MAX_PRIORITY_LEVELS],
    levels: u8,
    boost_interval: u64,
    last_boost_time: u64,
}

impl MultiLevelQueue {
    /// Create the level set
    ///
    /// # Arguments
    /// * `levels` - Number of active levels, clamped to 1..=MAX_PRIORITY_LEVELS
    /// * `base_quantum` - Slice of level 0
    /// * `boost_interval` - Ticks between boosts, 0 disables boosting
    pub fn new(levels: u8, base_quantum: u32, boost_interval: u64) -> Self {
        let levels = levels.clamp(1, MAX_PRIORITY_LEVELS as u8);

        Self {
            queues: core::array::from_fn(|_| ReadyQueue::new()),
            time_slices: core::array::from_fn(|level| TimeSliceTicks::for_level(base_quantum, level as u8)),
            levels,
            boost_interval,
            last_boost_time: 0,
        }
    }

    pub fn levels(&self) -> u8 {
        self.levels
    }

    /// Lowest (least favoured) level
    pub fn bottom_level(&self) -> u8 {
        self.levels - 1
    }

    /// Clamp an arbitrary level into the active range
    pub fn clamp_level(&self, level: u8) -> u8 {
        level.min(self.bottom_level())
    }

    /// Slice length for `level`
    pub fn time_slice(&self, level: u8) -> TimeSliceTicks {
        self.time_slices[self.clamp_level(level) as usize]
    }

    /// Append to the tail of `level`
    pub fn enqueue(&mut self, handle: ProcessHandle, level: u8) -> bool {
        let level = self.clamp_level(level);
        self.queues[level as usize].enqueue(handle)
    }

    /// Take the head of the highest non-empty level
    pub fn dequeue_highest(&mut self) -> Option<(ProcessHandle, u8)> {
        self.active_queues_mut()
            .enumerate()
            .find_map(|(level, queue)| queue.dequeue().map(|handle| (handle, level as u8)))
    }

    /// Remove `handle` from whichever level holds it
    pub fn remove(&mut self, handle: ProcessHandle) -> bool {
        self.active_queues_mut().any(|queue| queue.remove(handle))
    }

    /// Level currently holding `handle`
    pub fn level_of(&self, handle: ProcessHandle) -> Option<u8> {
        self.active_queues()
            .position(|queue| queue.contains(handle))
            .map(|level| level as u8)
    }

    pub fn contains(&self, handle: ProcessHandle) -> bool {
        self.level_of(handle).is_some()
    }

    /// Drain `level` in FIFO order
    pub fn drain_level(&mut self, level: u8) -> Vec<ProcessHandle> {
        let level = self.clamp_level(level) as usize;
        let queue = &mut self.queues[level];
        let mut drained = Vec::with_capacity(queue.len());
        while let Some(handle) = queue.dequeue() {
            drained.push(handle);
        }
        drained
    }

    /// Total number of queued handles
    pub fn len(&self) -> usize {
        self.active_queues().map(ReadyQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue lengths, highest level first
    pub fn lengths(&self) -> Vec<usize> {
        self.active_queues().map(ReadyQueue::len).collect()
    }

    /// Is a priority boost due at `now`?
    pub fn boost_due(&self, now: u64) -> bool {
        self.boost_interval > 0 && now.saturating_sub(self.last_boost_time) >= self.boost_interval
    }

    pub fn mark_boosted(&mut self, now: u64) {
        self.last_boost_time = now;
    }

    pub fn last_boost_time(&self) -> u64 {
        self.last_boost_time
    }

    fn active_queues(&self) -> impl Iterator<Item = &ReadyQueue> {
        self.queues[..self.levels as usize].iter()
    }

    fn active_queues_mut(&mut self) -> impl Iterator<Item = &mut ReadyQueue> {
        self.queues[..self.levels as usize].iter_mut()
    }
}
