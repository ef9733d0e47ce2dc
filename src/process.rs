//! Process Orchestrator (spec.md §4.4) and the `Process` data model
//! (spec.md §3): multi-thread continue/halt, manual-stop requests, and
//! selection of the "current" thread after a stop.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libc::pid_t;

use crate::arch::Architecture;
use crate::breakpoint::BreakpointTable;
use crate::error::{Error, Result};
use crate::target::{StopReason, TargetControl};
use crate::thread::{Thread, ThreadController, ThreadState};

/// A cloneable flag the manual-stop helper thread can set from outside the
/// controller thread (spec.md §5). `RequestManualStop` only ever touches
/// this flag and the target's signal-send primitive; it never issues a
/// ptrace call itself.
#[derive(Clone, Default)]
pub struct ManualStopFlag(Arc<AtomicBool>);

impl ManualStopFlag {
    pub fn new() -> Self {
        ManualStopFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// One outcome of `Continue()`: either a genuine stop the caller should act
/// on, or the natural exit of the process (spec.md §7: not an error).
#[derive(Debug)]
pub enum ContinueOutcome {
    Stopped { tid: pid_t },
    Exited { pid: pid_t, status: i32 },
}

pub struct Process {
    pub pid: pid_t,
    pub arch: Architecture,
    pub threads: BTreeMap<pid_t, Thread>,
    pub breakpoints: BreakpointTable,
    pub current_tid: Option<pid_t>,
    pub selected_user_thread: Option<u64>,
    pub exit_status: Option<i32>,
    controller: ThreadController,
    manual_stop: ManualStopFlag,
}

impl Process {
    pub fn new(pid: pid_t, arch: Architecture) -> Self {
        Process {
            pid,
            arch,
            threads: BTreeMap::new(),
            breakpoints: BreakpointTable::new(arch),
            current_tid: None,
            selected_user_thread: None,
            exit_status: None,
            controller: ThreadController::new(arch),
            manual_stop: ManualStopFlag::new(),
        }
    }

    pub fn manual_stop_handle(&self) -> ManualStopFlag {
        self.manual_stop.clone()
    }

    pub fn add_thread(&mut self, tid: pid_t) {
        self.threads.insert(tid, Thread::new(tid));
        if self.current_tid.is_none() {
            self.current_tid = Some(tid);
        }
    }

    pub fn running(&self) -> bool {
        self.exit_status.is_none()
    }

    pub fn current_thread(&self) -> Result<&Thread> {
        let tid = self.current_tid.ok_or(Error::InvalidThread(0))?;
        self.threads.get(&tid).ok_or(Error::InvalidThread(tid))
    }

    fn require_stopped(&self) -> Result<()> {
        if self
            .threads
            .values()
            .any(|t| t.state == ThreadState::Running)
        {
            return Err(Error::TargetRunning);
        }
        Ok(())
    }

    pub fn switch_thread(&mut self, tid: pid_t) -> Result<()> {
        self.require_stopped()?;
        if !self.threads.contains_key(&tid) {
            return Err(Error::InvalidThread(tid));
        }
        self.current_tid = Some(tid);
        Ok(())
    }

    /// `RequestManualStop()` (spec.md §4.4, §5): safe to call from another
    /// thread of the embedder. Sends the stop signal immediately; the next
    /// `wait_any()` observed by `Continue` will carry it.
    pub fn request_manual_stop(&self, target: &mut dyn TargetControl) -> Result<()> {
        self.manual_stop.request();
        target.signal_stop(self.pid)
    }

    /// `Continue()` (spec.md §4.4): resumes every stopped thread, blocks on
    /// `wait_any`, then forcibly halts every other thread so the caller
    /// sees a consistent stopped snapshot. `wait_any` delivers one stop at a
    /// time, so the thread it names is always the current thread; the other
    /// threads this call also halts are collateral, not racers, and never
    /// override that selection (spec.md §5's ordering rule is about
    /// genuinely simultaneous kernel-reported stops, which this single-event
    /// `wait_any` contract doesn't produce).
    pub fn continue_all(&mut self, target: &mut dyn TargetControl) -> Result<ContinueOutcome> {
        self.require_stopped()?;
        let tids: Vec<pid_t> = self.threads.keys().copied().collect();
        for tid in tids {
            let thread = self.threads.get_mut(&tid).unwrap();
            self.controller.resume(thread, &mut self.breakpoints, target)?;
        }

        loop {
            let (tid, reason) = target.wait_any()?;
            match reason {
                StopReason::Exited(status) => {
                    self.exit_status = Some(status);
                    return Ok(ContinueOutcome::Exited {
                        pid: self.pid,
                        status,
                    });
                }
                StopReason::StoppedBySignal(_) if self.controller.is_manual_stop(reason) => {
                    self.manual_stop.take();
                    // Absorbed silently, never reported to the target or
                    // caller as a distinct event (spec.md §4.3, §5).
                    if let Some(thread) = self.threads.get_mut(&tid) {
                        self.controller.mark_stopped(thread);
                    }
                    self.stop_all_other_threads(tid, target)?;
                    self.current_tid = Some(tid);
                    return Ok(ContinueOutcome::Stopped { tid });
                }
                StopReason::Trap | StopReason::StoppedBySignal(_) => {
                    if let Some(thread) = self.threads.get_mut(&tid) {
                        self.controller.mark_stopped(thread);
                        if let StopReason::Trap = reason {
                            let addr = self.controller.classify_and_fixup(
                                thread,
                                &self.breakpoints,
                                target,
                            )?;
                            if let Some(addr) = addr {
                                self.breakpoints.record_hit(addr, tid);
                            }
                        }
                    }
                    self.stop_all_other_threads(tid, target)?;
                    // `tid` is the one genuine stop `wait_any` reported;
                    // every other thread in `Stopped` state at this point
                    // got there only as our own collateral halt just above,
                    // not by independently racing to a stop, so it must not
                    // steal current-thread selection from `tid` (spec.md §5).
                    self.current_tid = Some(tid);
                    return Ok(ContinueOutcome::Stopped { tid });
                }
                StopReason::Cloned(new_tid) => {
                    self.add_thread(new_tid);
                }
            }
        }
    }

    fn stop_all_other_threads(&mut self, except: pid_t, target: &mut dyn TargetControl) -> Result<()> {
        for (tid, thread) in self.threads.iter_mut() {
            if *tid != except && thread.state == ThreadState::Running {
                target.signal_stop(*tid)?;
                self.controller.mark_stopped(thread);
            }
        }
        Ok(())
    }

    pub fn kill(&mut self, target: &mut dyn TargetControl) -> Result<()> {
        target.kill(self.pid)
    }
}
