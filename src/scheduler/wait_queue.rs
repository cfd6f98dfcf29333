/*
 * Wait Queue
 *
 * Holds every BLOCKED process together with the reason it blocked.
 *
 * Blocking:
 * When the running process blocks it is registered here and removed from
 * the policy's ready structures.
 *
 * Waking:
 * wake() removes the waiter explicitly; sleepers are collected by the tick
 * handler once their deadline passes. Either way the process goes back to
 * the active policy as a fresh arrival.
 */

use alloc::vec::Vec;

use super::{
    config::MAX_PROCESSES,
    types::{BlockReason, Pid, ProcessHandle},
};

#[derive(Debug, Clone, Copy)]
struct Waiter {
    handle: ProcessHandle,
    reason: BlockReason,
}

pub struct WaitQueue {
    waiters: heapless::Vec<Waiter, MAX_PROCESSES>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            waiters: heapless::Vec::new(),
        }
    }

    /// Register a blocked process
    ///
    /// # Returns
    /// `false` if the process was already waiting or the queue is full.
    pub fn add_waiter(&mut self, handle: ProcessHandle, reason: BlockReason) -> bool {
        if self.contains(handle) {
            log::warn!("{} is already waiting", handle);
            return false;
        }

        self.waiters.push(Waiter { handle, reason }).is_ok()
    }

    /// Remove a waiter
    ///
    /// # Returns
    /// The reason it was waiting for, or `None` if it was not waiting.
    pub fn remove_waiter(&mut self, handle: ProcessHandle) -> Option<BlockReason> {
        let reason = self.reason(handle)?;
        self.waiters.retain(|waiter| waiter.handle != handle);
        Some(reason)
    }

    /// Why `handle` is waiting
    pub fn reason(&self, handle: ProcessHandle) -> Option<BlockReason> {
        self.waiters
            .iter()
            .find(|waiter| waiter.handle == handle)
            .map(|waiter| waiter.reason)
    }

    pub fn contains(&self, handle: ProcessHandle) -> bool {
        self.reason(handle).is_some()
    }

    /// Remove and return every sleeper whose deadline is at or before `now`
    pub fn take_expired_sleepers(&mut self, now: u64) -> Vec<(ProcessHandle, BlockReason)> {
        self.take_where(|reason| reason.sleep_expired(now))
    }

    /// Remove and return every process waiting for `child` to exit
    pub fn take_child_waiters(&mut self, child: Pid) -> Vec<(ProcessHandle, BlockReason)> {
        self.take_where(|reason| reason.waits_for_child(child))
    }

    fn take_where(&mut self, matches: impl Fn(&BlockReason) -> bool) -> Vec<(ProcessHandle, BlockReason)> {
        let taken: Vec<_> = self
            .waiters
            .iter()
            .filter(|waiter| matches(&waiter.reason))
            .map(|waiter| (waiter.handle, waiter.reason))
            .collect();

        if !taken.is_empty() {
            self.waiters.retain(|waiter| !matches(&waiter.reason));
        }

        taken
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Iterate over waiters in blocking order
    pub fn iter(&self) -> impl Iterator<Item = (ProcessHandle, BlockReason)> + '_ {
        self.waiters.iter().map(|waiter| (waiter.handle, waiter.reason))
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(n: u32) -> ProcessHandle {
        ProcessHandle::new(n as usize, Pid(n))
    }

    #[test]
    fn add_and_remove_waiters() {
        let mut queue = WaitQueue::new();
        assert!(queue.add_waiter(handle(1), BlockReason::WaitingForIo { channel: 3 }));
        assert!(!queue.add_waiter(handle(1), BlockReason::Other));

        assert_eq!(
            queue.remove_waiter(handle(1)),
            Some(BlockReason::WaitingForIo { channel: 3 })
        );
        assert_eq!(queue.remove_waiter(handle(1)), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn only_expired_sleepers_are_taken() {
        let mut queue = WaitQueue::new();
        queue.add_waiter(handle(1), BlockReason::Sleeping { until_tick: 10 });
        queue.add_waiter(handle(2), BlockReason::Sleeping { until_tick: 20 });
        queue.add_waiter(handle(3), BlockReason::Other);

        assert!(queue.take_expired_sleepers(9).is_empty());

        let woken = queue.take_expired_sleepers(10);
        assert_eq!(woken.len(), 1);
        assert_eq!(woken[0].0, handle(1));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn child_waiters_are_taken_by_child_pid() {
        let mut queue = WaitQueue::new();
        queue.add_waiter(handle(1), BlockReason::WaitingForChild { pid: Pid(5) });
        queue.add_waiter(handle(2), BlockReason::WaitingForChild { pid: Pid(6) });
        queue.add_waiter(handle(3), BlockReason::WaitingForChild { pid: Pid(5) });

        let waiters: Vec<_> = queue.take_child_waiters(Pid(5)).into_iter().map(|(h, _)| h).collect();
        assert_eq!(waiters, [handle(1), handle(3)]);
        assert_eq!(queue.len(), 1);
        assert!(queue.take_child_waiters(Pid(5)).is_empty());
    }
}
