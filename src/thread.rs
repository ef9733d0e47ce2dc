//! Thread Controller (spec.md §4.3): per-OS-thread state machine, trap
//! dispatch, PC fixup after trap, and the step-over-breakpoint primitive.

use libc::pid_t;

use crate::arch::{Architecture, Registers};
use crate::breakpoint::BreakpointTable;
use crate::error::Result;
use crate::target::{StopReason, TargetControl};

/// *Stopped* → (resume) *Running* → (trap) *Stopped*, per spec.md §4.3.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThreadState {
    Stopped,
    Running,
}

/// An OS-level execution context in the target (spec.md §3).
#[derive(Clone, Debug)]
pub struct Thread {
    pub tid: pid_t,
    pub state: ThreadState,
    /// Set when the last stop landed exactly on a breakpoint address.
    pub current_breakpoint: Option<u64>,
    pub registers: Registers,
}

impl Thread {
    pub fn new(tid: pid_t) -> Self {
        Thread {
            tid,
            state: ThreadState::Stopped,
            current_breakpoint: None,
            registers: Registers::new(),
        }
    }

    pub fn running(&self) -> bool {
        self.state == ThreadState::Running
    }
}

/// Drives a single thread's resume/stop transitions against a
/// [`TargetControl`] backend and a shared [`BreakpointTable`].
pub struct ThreadController {
    arch: Architecture,
}

impl ThreadController {
    pub fn new(arch: Architecture) -> Self {
        ThreadController { arch }
    }

    /// Classifies a raw stop by inspecting the thread's current PC: if
    /// `PC - trap_rewind` is a known breakpoint address, rewinds PC and
    /// returns that address.
    pub fn classify_and_fixup(
        &self,
        thread: &mut Thread,
        breakpoints: &BreakpointTable,
        target: &mut dyn TargetControl,
    ) -> Result<Option<u64>> {
        let regs = target.registers(thread.tid)?;
        let candidate = regs.pc.wrapping_sub(self.arch.trap_rewind());
        if breakpoints.at(candidate).is_some() {
            let mut fixed = regs;
            fixed.pc = candidate;
            target.set_registers(thread.tid, fixed)?;
            thread.registers = fixed;
            thread.current_breakpoint = Some(candidate);
            return Ok(Some(candidate));
        }
        thread.registers = regs;
        thread.current_breakpoint = None;
        Ok(None)
    }

    /// The step-over-breakpoint primitive (spec.md §4.3): if the thread is
    /// sitting on a breakpoint, temporarily restore the original byte,
    /// single-step past it, then re-arm the trap. Otherwise single-step
    /// directly. Leaves the thread `Stopped` with `state` unchanged by
    /// design — callers decide whether to keep going.
    pub fn step_over_breakpoint(
        &self,
        thread: &mut Thread,
        breakpoints: &mut BreakpointTable,
        target: &mut dyn TargetControl,
    ) -> Result<()> {
        if let Some(addr) = thread.current_breakpoint {
            let original = breakpoints.at(addr).map(|b| b.original_bytes.clone());
            if let Some(original) = original {
                target.write_memory(thread.tid, addr, &original)?;
                target.single_step(thread.tid)?;
                // The thread moved on; the kernel serializes this step so
                // no other resume can race between restore and re-arm.
                let trap = self.arch.trap_instruction();
                target.write_memory(thread.tid, addr, trap)?;
                thread.current_breakpoint = None;
                return Ok(());
            }
        }
        target.single_step(thread.tid)?;
        Ok(())
    }

    /// `continue(thread)` from spec.md §4.3: step over a breakpoint if
    /// needed, then let the thread run free.
    pub fn resume(
        &self,
        thread: &mut Thread,
        breakpoints: &mut BreakpointTable,
        target: &mut dyn TargetControl,
    ) -> Result<()> {
        if thread.current_breakpoint.is_some() {
            self.step_over_breakpoint(thread, breakpoints, target)?;
        }
        target.continue_thread(thread.tid, None)?;
        thread.state = ThreadState::Running;
        Ok(())
    }

    pub fn mark_stopped(&self, thread: &mut Thread) {
        thread.state = ThreadState::Stopped;
    }

    /// Translates a raw `StopReason` that is actually our own manual-stop
    /// signal into a clean stop, never propagated to the target
    /// (spec.md §4.3, §5).
    pub fn is_manual_stop(&self, reason: StopReason) -> bool {
        matches!(reason, StopReason::StoppedBySignal(sig) if sig == libc::SIGSTOP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::fake::FakeTargetControl;

    #[test]
    fn breakpoint_hit_rewinds_pc_and_records_current_breakpoint() {
        let ctl = ThreadController::new(Architecture::X86_64);
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        target.add_thread(1, Registers::new());
        table.set(&mut target, 1, 0x400).unwrap();

        // Simulate the kernel having executed the trap byte: PC is now one
        // past the breakpoint address.
        let mut regs = Registers::new();
        regs.pc = 0x401;
        target.set_registers(1, regs).unwrap();

        let mut thread = Thread::new(1);
        let hit = ctl
            .classify_and_fixup(&mut thread, &table, &mut target)
            .unwrap();
        assert_eq!(hit, Some(0x400));
        assert_eq!(thread.registers.pc, 0x400);
    }

    #[test]
    fn step_over_breakpoint_restores_and_rearms_trap_byte() {
        let ctl = ThreadController::new(Architecture::X86_64);
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        target.set_memory(0x400, &[0x90]);
        target.add_thread(1, Registers::new());
        table.set(&mut target, 1, 0x400).unwrap();
        assert_eq!(target.memory[&0x400], 0xCC);

        let mut thread = Thread::new(1);
        thread.current_breakpoint = Some(0x400);

        ctl.step_over_breakpoint(&mut thread, &mut table, &mut target)
            .unwrap();
        assert_eq!(target.memory[&0x400], 0xCC);
        assert!(thread.current_breakpoint.is_none());
    }

    #[test]
    fn manual_stop_signal_is_recognized() {
        let ctl = ThreadController::new(Architecture::X86_64);
        assert!(ctl.is_manual_stop(StopReason::StoppedBySignal(libc::SIGSTOP)));
        assert!(!ctl.is_manual_stop(StopReason::StoppedBySignal(libc::SIGUSR1)));
        assert!(!ctl.is_manual_stop(StopReason::Trap));
    }
}
