//! Linux implementation of [`TargetControl`], built on `ptrace(2)` via the
//! `nix` crate — the same dependency the teacher codebase uses for its own
//! (much larger) ptrace wrapper in `Task::fallible_ptrace`/`xptrace`.
//!
//! Memory reads/writes go through `/proc/<pid>/mem`, which is what `rr`
//! (and this crate's teacher, via `Task::open_mem_fd`) prefers over
//! `PTRACE_PEEKDATA`/`PTRACE_POKEDATA` because it supports arbitrarily sized
//! transfers in one syscall instead of one word at a time.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;

use libc::pid_t;
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus as NixWaitStatus};
use nix::unistd::Pid;

use crate::arch::Registers;
use crate::error::{Error, Result};
use crate::target::{StopReason, TargetControl};

/// Cached `/proc/<tid>/mem` handles, one per thread we've touched, so that
/// repeated reads don't reopen the file each time.
pub struct LinuxPtraceControl {
    mem_fds: HashMap<pid_t, std::fs::File>,
}

impl LinuxPtraceControl {
    pub fn new() -> Self {
        LinuxPtraceControl {
            mem_fds: HashMap::new(),
        }
    }

    fn mem_file(&mut self, tid: pid_t) -> Result<&std::fs::File> {
        if !self.mem_fds.contains_key(&tid) {
            let path = format!("/proc/{}/mem", tid);
            let f = OpenOptions::new().read(true).write(true).open(path)?;
            self.mem_fds.insert(tid, f);
        }
        Ok(self.mem_fds.get(&tid).unwrap())
    }

    fn to_stop_reason(status: NixWaitStatus) -> Option<(pid_t, StopReason)> {
        match status {
            NixWaitStatus::Stopped(pid, Signal::SIGTRAP) => {
                Some((pid.as_raw(), StopReason::Trap))
            }
            NixWaitStatus::Stopped(pid, sig) => {
                Some((pid.as_raw(), StopReason::StoppedBySignal(sig as i32)))
            }
            NixWaitStatus::Exited(pid, code) => Some((pid.as_raw(), StopReason::Exited(code))),
            NixWaitStatus::PtraceEvent(pid, _, _) => Some((pid.as_raw(), StopReason::Trap)),
            NixWaitStatus::Signaled(pid, sig, _) => {
                Some((pid.as_raw(), StopReason::StoppedBySignal(sig as i32)))
            }
            _ => None,
        }
    }
}

impl Default for LinuxPtraceControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetControl for LinuxPtraceControl {
    fn launch(&mut self, argv: &[String]) -> Result<pid_t> {
        use nix::sys::wait::wait;
        use nix::unistd::{fork, ForkResult};

        if argv.is_empty() {
            return Err(Error::Other("launch requires a non-empty argv".into()));
        }

        // SAFETY: the child immediately execs or _exits; no Rust state is
        // shared across the fork beyond what's required to build the execv
        // arguments, matching the narrow post-fork contract `nix::fork`
        // documents.
        match unsafe { fork() }.map_err(|e| Error::Other(e.to_string()))? {
            ForkResult::Child => {
                ptrace::traceme().ok();
                let path = CString::new(argv[0].as_bytes()).unwrap();
                let cargs: Vec<CString> = argv
                    .iter()
                    .map(|a| CString::new(a.as_bytes()).unwrap())
                    .collect();
                let _ = nix::unistd::execvp(&path, &cargs);
                std::process::exit(127);
            }
            ForkResult::Parent { child } => {
                wait().map_err(|e| Error::Other(e.to_string()))?;
                Ok(child.as_raw())
            }
        }
    }

    fn attach(&mut self, pid: pid_t) -> Result<()> {
        ptrace::attach(Pid::from_raw(pid)).map_err(|e| Error::Other(e.to_string()))?;
        waitpid(Pid::from_raw(pid), None).map_err(|e| Error::Other(e.to_string()))?;
        Ok(())
    }

    fn continue_thread(&mut self, tid: pid_t, signal: Option<i32>) -> Result<()> {
        let sig = signal.map(|s| Signal::try_from(s).unwrap_or(Signal::SIGCONT));
        ptrace::cont(Pid::from_raw(tid), sig).map_err(|e| Error::Other(e.to_string()))
    }

    fn single_step(&mut self, tid: pid_t) -> Result<()> {
        ptrace::step(Pid::from_raw(tid), None).map_err(|e| Error::Other(e.to_string()))?;
        // The step must retire before returning: `ThreadController::
        // step_over_breakpoint` re-arms the trap byte immediately after this
        // call, and a still-pending step would execute against the
        // restored-then-rewritten memory instead of the original instruction.
        waitpid(Pid::from_raw(tid), None).map_err(|e| Error::Other(e.to_string()))?;
        Ok(())
    }

    fn wait_any(&mut self) -> Result<(pid_t, StopReason)> {
        loop {
            let status = waitpid(None, Some(WaitPidFlag::empty()))
                .map_err(|e| Error::Other(e.to_string()))?;
            if let Some(reason) = Self::to_stop_reason(status) {
                return Ok(reason);
            }
        }
    }

    fn read_memory(&mut self, tid: pid_t, addr: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let file = self.mem_file(tid)?;
        file.read_exact_at(&mut buf, addr)?;
        Ok(buf)
    }

    fn write_memory(&mut self, tid: pid_t, addr: u64, bytes: &[u8]) -> Result<()> {
        let file = self.mem_file(tid)?;
        file.write_all_at(bytes, addr)?;
        Ok(())
    }

    fn registers(&mut self, tid: pid_t) -> Result<Registers> {
        let regs =
            ptrace::getregs(Pid::from_raw(tid)).map_err(|e| Error::Other(e.to_string()))?;
        let mut out = Registers::new();
        out.pc = regs.rip;
        out.sp = regs.rsp;
        out.bp = regs.rbp;
        out.gpr[0] = regs.rax;
        out.gpr[1] = regs.rbx;
        out.gpr[2] = regs.rcx;
        out.gpr[3] = regs.rdx;
        out.gpr[4] = regs.rsi;
        out.gpr[5] = regs.rdi;
        out.gpr[6] = regs.r8;
        out.gpr[7] = regs.r9;
        out.gpr[8] = regs.r10;
        out.gpr[9] = regs.r11;
        out.gpr[10] = regs.r12;
        out.gpr[11] = regs.r13;
        out.gpr[12] = regs.r14;
        out.gpr[13] = regs.r15;
        Ok(out)
    }

    fn set_registers(&mut self, tid: pid_t, regs: Registers) -> Result<()> {
        let mut native =
            ptrace::getregs(Pid::from_raw(tid)).map_err(|e| Error::Other(e.to_string()))?;
        native.rip = regs.pc;
        native.rsp = regs.sp;
        native.rbp = regs.bp;
        ptrace::setregs(Pid::from_raw(tid), native).map_err(|e| Error::Other(e.to_string()))
    }

    fn signal_stop(&mut self, pid: pid_t) -> Result<()> {
        nix::sys::signal::kill(Pid::from_raw(pid), Signal::SIGSTOP)
            .map_err(|e| Error::Other(e.to_string()))
    }

    fn kill(&mut self, pid: pid_t) -> Result<()> {
        nix::sys::signal::kill(Pid::from_raw(pid), Signal::SIGKILL)
            .map_err(|e| Error::Other(e.to_string()))?;
        self.mem_fds.remove(&pid);
        Ok(())
    }
}
