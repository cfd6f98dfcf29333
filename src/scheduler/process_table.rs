/*
 * Process Table
 *
 * Fixed-capacity arena owning every live process descriptor.
 *
 * Slots are recycled, PIDs are not: each allocation takes the next value of
 * a monotonic counter, and a ProcessHandle only resolves while its slot
 * still holds the PID it was issued for.
 */

use alloc::vec::Vec;

use super::{
    config::MAX_PROCESSES,
    error::{SchedError, SchedResult},
    process::{ProcessControlBlock, ProcessState},
    types::{Pid, ProcessHandle},
};

pub struct ProcessTable {
    slots: heapless::Vec<Option<ProcessControlBlock>, MAX_PROCESSES>,
    next_pid: u32,
    live: usize,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            next_pid: 1,
            live: 0,
        }
    }

    /// Allocate a descriptor in the NEW state
    ///
    /// # Arguments
    /// * `name` - Process name (truncated if too long)
    /// * `priority` - Already clamped priority
    /// * `now` - Creation tick
    ///
    /// # Returns
    /// Handle of the new process, `ProcessTableFull`, or
    /// `PidSpaceExhausted` once the counter reaches `u32::MAX`. A failed
    /// allocation does not consume a PID.
    pub fn allocate(&mut self, name: &str, priority: u8, now: u64) -> SchedResult<ProcessHandle> {
        if self.is_full() {
            return Err(SchedError::ProcessTableFull {
                capacity: self.capacity(),
            });
        }
        let following = self.next_pid.checked_add(1).ok_or(SchedError::PidSpaceExhausted)?;

        let slot = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None if !self.slots.is_full() => {
                // Cannot fail: checked is_full() above.
                let _ = self.slots.push(None);
                self.slots.len() - 1
            }
            None => {
                return Err(SchedError::ProcessTableFull {
                    capacity: self.capacity(),
                });
            }
        };

        let pid = Pid(self.next_pid);
        self.next_pid = following;

        self.slots[slot] = Some(ProcessControlBlock::new(pid, name, priority, now));
        self.live += 1;

        Ok(ProcessHandle::new(slot, pid))
    }

    /// Release a terminated descriptor
    ///
    /// # Returns
    /// The removed descriptor, or `None` if the handle is stale or the
    /// process has not been terminated yet.
    pub fn free(&mut self, handle: ProcessHandle) -> Option<ProcessControlBlock> {
        let slot = self.slots.get_mut(handle.slot())?;
        let pcb = slot.as_ref().filter(|pcb| pcb.pid == handle.pid())?;

        if pcb.state != ProcessState::Terminated {
            log::warn!("refusing to free PID {} in state {:?}", pcb.pid, pcb.state);
            return None;
        }

        self.live -= 1;
        slot.take()
    }

    pub fn get(&self, handle: ProcessHandle) -> Option<&ProcessControlBlock> {
        self.slots
            .get(handle.slot())?
            .as_ref()
            .filter(|pcb| pcb.pid == handle.pid())
    }

    pub fn get_mut(&mut self, handle: ProcessHandle) -> Option<&mut ProcessControlBlock> {
        self.slots
            .get_mut(handle.slot())?
            .as_mut()
            .filter(|pcb| pcb.pid == handle.pid())
    }

    /// Look up a live process by PID
    pub fn find(&self, pid: Pid) -> Option<ProcessHandle> {
        self.iter()
            .find(|(_, pcb)| pcb.pid == pid)
            .map(|(handle, _)| handle)
    }

    /// Was `pid` ever handed out by this table?
    pub fn was_issued(&self, pid: Pid) -> bool {
        !pid.is_idle() && pid.as_u32() < self.next_pid
    }

    /// Number of live descriptors
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        MAX_PROCESSES
    }

    pub fn is_full(&self) -> bool {
        self.live == MAX_PROCESSES
    }

    /// Iterate over live descriptors in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ProcessHandle, &ProcessControlBlock)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            entry
                .as_ref()
                .map(|pcb| (ProcessHandle::new(slot, pcb.pid), pcb))
        })
    }

    /// Handles of every live descriptor
    pub fn handles(&self) -> Vec<ProcessHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pids_are_monotonic_and_slots_recycled() {
        let mut table = ProcessTable::new();
        let a = table.allocate("a", 0, 0).unwrap();
        let b = table.allocate("b", 0, 0).unwrap();
        assert_eq!(a.pid(), Pid(1));
        assert_eq!(b.pid(), Pid(2));

        table.get_mut(a).unwrap().state = ProcessState::Terminated;
        assert!(table.free(a).is_some());

        let c = table.allocate("c", 0, 0).unwrap();
        assert_eq!(c.pid(), Pid(3));
        assert_eq!(c.slot(), a.slot());

        // The stale handle no longer resolves even though the slot is reused.
        assert!(table.get(a).is_none());
        assert!(table.was_issued(Pid(1)));
        assert!(!table.was_issued(Pid(4)));
        assert!(!table.was_issued(Pid::IDLE));
    }

    #[test]
    fn full_table_rejects_without_consuming_a_pid() {
        let mut table = ProcessTable::new();
        for _ in 0..MAX_PROCESSES {
            table.allocate("p", 0, 0).unwrap();
        }
        assert!(table.is_full());
        assert_eq!(
            table.allocate("overflow", 0, 0),
            Err(SchedError::ProcessTableFull {
                capacity: MAX_PROCESSES
            })
        );

        let victim = table.find(Pid(10)).unwrap();
        table.get_mut(victim).unwrap().state = ProcessState::Terminated;
        table.free(victim);

        let next = table.allocate("late", 0, 0).unwrap();
        assert_eq!(next.pid(), Pid(MAX_PROCESSES as u32 + 1));
    }

    #[test]
    fn exhausted_pid_counter_is_an_error() {
        let mut table = ProcessTable::new();
        table.next_pid = u32::MAX - 1;

        let last = table.allocate("last", 0, 0).unwrap();
        assert_eq!(last.pid(), Pid(u32::MAX - 1));
        assert_eq!(table.allocate("one-more", 0, 0), Err(SchedError::PidSpaceExhausted));
        assert_eq!(table.live_count(), 1);
        assert_eq!(table.capacity(), MAX_PROCESSES);
    }

    #[test]
    fn live_descriptors_cannot_be_freed() {
        let mut table = ProcessTable::new();
        let a = table.allocate("a", 0, 0).unwrap();
        assert!(table.free(a).is_none());
        assert_eq!(table.live_count(), 1);
    }
}
