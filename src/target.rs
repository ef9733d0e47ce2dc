//! Target control (spec.md §4.1, §6): the only layer that issues kernel
//! debug syscalls. Everything above this reasons purely in terms of the
//! operations below; this module is written against the `TargetControl`
//! trait and has one real backend (`linux::LinuxPtraceControl`) plus a
//! deterministic in-memory double used by the rest of the crate's test
//! suite (`fake::FakeTargetControl`).

pub mod fake;
pub mod linux;

use libc::pid_t;

use crate::arch::Registers;
use crate::error::Result;

/// Why `wait_any` returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StopReason {
    Trap,
    StoppedBySignal(i32),
    Exited(i32),
    Cloned(pid_t),
}

/// Platform-abstracted primitives a debugger core needs from the kernel.
/// One implementation per OS; higher layers (Breakpoint Table, Thread
/// Controller, Orchestrator) only ever call through this trait.
pub trait TargetControl {
    fn launch(&mut self, argv: &[String]) -> Result<pid_t>;
    fn attach(&mut self, pid: pid_t) -> Result<()>;

    fn continue_thread(&mut self, tid: pid_t, signal: Option<i32>) -> Result<()>;
    fn single_step(&mut self, tid: pid_t) -> Result<()>;

    /// Blocks until any tracked thread produces a stop event.
    fn wait_any(&mut self) -> Result<(pid_t, StopReason)>;

    fn read_memory(&mut self, tid: pid_t, addr: u64, len: usize) -> Result<Vec<u8>>;
    fn write_memory(&mut self, tid: pid_t, addr: u64, bytes: &[u8]) -> Result<()>;

    fn registers(&mut self, tid: pid_t) -> Result<Registers>;
    fn set_registers(&mut self, tid: pid_t, regs: Registers) -> Result<()>;

    /// Sends the process a stop signal; this is the only primitive the
    /// manual-stop helper thread is allowed to call (spec.md §5).
    fn signal_stop(&mut self, pid: pid_t) -> Result<()>;

    fn kill(&mut self, pid: pid_t) -> Result<()>;
}
