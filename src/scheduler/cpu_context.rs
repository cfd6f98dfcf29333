/*
 * CPU Context
 *
 * Saved register state for a process and the hook through which the host
 * performs the actual register switch.
 *
 * The scheduler core never touches hardware. It fills in a synthetic
 * initial frame for every new process (stack pointer inside a per-PID stack
 * region, interrupts enabled) and hands both frames to a ContextSwitcher
 * whenever the dispatched process changes. A bare-metal host plugs in its
 * assembly stub there; tests and simulations use NoopSwitcher.
 */

use super::types::Pid;

/// Per-process stack size
pub const STACK_SIZE: u64 = 64 * 1024;

/// Base of the synthetic stack region
pub const STACK_REGION_BASE: u64 = 0x0100_0000;

/// Initial RFLAGS: interrupts enabled (IF) + reserved bit 1
pub const INITIAL_FLAGS: u64 = 0x202;

/// Saved CPU register state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuContext {
    pub stack_pointer: u64,
    pub instruction_pointer: u64,
    pub flags: u64,
    /// General purpose registers (rax..r15, rsp excluded)
    pub registers: [u64; 15],
}

impl CpuContext {
    /// Fresh frame for a process that has never run
    ///
    /// The stack grows down from the top of the process' slot in the
    /// stack region.
    pub fn for_process(pid: Pid) -> Self {
        Self {
            stack_pointer: Self::stack_top(pid),
            instruction_pointer: 0,
            flags: INITIAL_FLAGS,
            registers: [0; 15],
        }
    }

    /// Top of the stack slot assigned to `pid`
    pub fn stack_top(pid: Pid) -> u64 {
        STACK_REGION_BASE + (pid.as_u32() as u64 + 1) * STACK_SIZE
    }
}

impl Default for CpuContext {
    fn default() -> Self {
        Self::for_process(Pid::IDLE)
    }
}

/// Host hook performing the register-level switch
pub trait ContextSwitcher: Send {
    /// Save the outgoing process and restore the incoming one
    ///
    /// # Arguments
    /// * `from` - Outgoing PID
    /// * `saved` - Where to store the outgoing registers, `None` if the
    ///   outgoing process has already been released
    /// * `to` - Incoming PID
    /// * `restored` - Registers to load
    fn switch(&mut self, from: Pid, saved: Option<&mut CpuContext>, to: Pid, restored: &CpuContext);
}

/// Switcher for hosted runs; touches no registers
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSwitcher;

impl ContextSwitcher for NoopSwitcher {
    fn switch(&mut self, from: Pid, _saved: Option<&mut CpuContext>, to: Pid, _restored: &CpuContext) {
        log::trace!("context switch {} -> {}", from, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_do_not_overlap() {
        let a = CpuContext::for_process(Pid(1));
        let b = CpuContext::for_process(Pid(2));
        assert_eq!(b.stack_pointer - a.stack_pointer, STACK_SIZE);
        assert_eq!(a.flags, INITIAL_FLAGS);
        assert!(a.stack_pointer > STACK_REGION_BASE);
    }
}
