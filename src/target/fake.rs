//! An in-memory double for [`TargetControl`], used by every other
//! component's test suite. It models enough of a multi-threaded process —
//! a flat memory image, per-thread registers, and a queue of scripted stop
//! events — to drive the Breakpoint Table, Thread Controller, Orchestrator,
//! Next Engine and Stack Walker deterministically without a real tracee.

use std::collections::{HashMap, VecDeque};

use libc::pid_t;

use crate::arch::Registers;
use crate::error::{Error, Result};
use crate::target::{StopReason, TargetControl};

#[derive(Clone, Debug)]
pub struct FakeThread {
    pub registers: Registers,
    pub running: bool,
}

/// A flat, sparse memory image keyed by address. Reads of unmapped bytes
/// return zero, which is enough for the test fixtures that only care about
/// specific addresses (breakpoint sites, stack slots, variables).
pub struct FakeTargetControl {
    pub memory: HashMap<u64, u8>,
    pub threads: HashMap<pid_t, FakeThread>,
    /// Scripted stop events consumed in order by `wait_any`. Tests push the
    /// sequence of events that "happen" as a result of a given scenario.
    pub pending_events: VecDeque<(pid_t, StopReason)>,
    pub killed: bool,
}

impl FakeTargetControl {
    pub fn new() -> Self {
        FakeTargetControl {
            memory: HashMap::new(),
            threads: HashMap::new(),
            pending_events: VecDeque::new(),
            killed: false,
        }
    }

    pub fn add_thread(&mut self, tid: pid_t, regs: Registers) {
        self.threads.insert(
            tid,
            FakeThread {
                registers: regs,
                running: false,
            },
        );
    }

    pub fn push_event(&mut self, tid: pid_t, reason: StopReason) {
        self.pending_events.push_back((tid, reason));
    }

    pub fn set_memory(&mut self, addr: u64, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.memory.insert(addr + i as u64, *b);
        }
    }
}

impl Default for FakeTargetControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetControl for FakeTargetControl {
    fn launch(&mut self, _argv: &[String]) -> Result<pid_t> {
        let tid = 1;
        self.add_thread(tid, Registers::new());
        Ok(tid)
    }

    fn attach(&mut self, pid: pid_t) -> Result<()> {
        self.add_thread(pid, Registers::new());
        Ok(())
    }

    fn continue_thread(&mut self, tid: pid_t, _signal: Option<i32>) -> Result<()> {
        let t = self
            .threads
            .get_mut(&tid)
            .ok_or(Error::InvalidThread(tid))?;
        t.running = true;
        Ok(())
    }

    fn single_step(&mut self, tid: pid_t) -> Result<()> {
        let t = self
            .threads
            .get_mut(&tid)
            .ok_or(Error::InvalidThread(tid))?;
        t.registers.pc += 1;
        Ok(())
    }

    fn wait_any(&mut self) -> Result<(pid_t, StopReason)> {
        match self.pending_events.pop_front() {
            Some((tid, reason)) => {
                if let Some(t) = self.threads.get_mut(&tid) {
                    t.running = false;
                    if let StopReason::Trap = reason {
                        t.registers.pc = t.registers.pc.wrapping_add(1);
                    }
                }
                Ok((tid, reason))
            }
            None => Err(Error::Other("no pending events".into())),
        }
    }

    fn read_memory(&mut self, _tid: pid_t, addr: u64, len: usize) -> Result<Vec<u8>> {
        Ok((0..len as u64)
            .map(|i| *self.memory.get(&(addr + i)).unwrap_or(&0))
            .collect())
    }

    fn write_memory(&mut self, _tid: pid_t, addr: u64, bytes: &[u8]) -> Result<()> {
        self.set_memory(addr, bytes);
        Ok(())
    }

    fn registers(&mut self, tid: pid_t) -> Result<Registers> {
        self.threads
            .get(&tid)
            .map(|t| t.registers)
            .ok_or(Error::InvalidThread(tid))
    }

    fn set_registers(&mut self, tid: pid_t, regs: Registers) -> Result<()> {
        let t = self
            .threads
            .get_mut(&tid)
            .ok_or(Error::InvalidThread(tid))?;
        t.registers = regs;
        Ok(())
    }

    fn signal_stop(&mut self, pid: pid_t) -> Result<()> {
        self.pending_events
            .push_front((pid, StopReason::StoppedBySignal(libc::SIGSTOP)));
        Ok(())
    }

    fn kill(&mut self, _pid: pid_t) -> Result<()> {
        self.killed = true;
        Ok(())
    }
}
