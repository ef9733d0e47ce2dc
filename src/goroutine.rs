//! User-Thread (Goroutine) Introspector (spec.md §4.5) and its data model
//! (spec.md §3). Recovers the currently running user-thread for a given OS
//! thread, and iterates every user-thread known to the runtime, by walking
//! fixed-offset fields inside well-known runtime structures. The offsets
//! themselves are runtime-version-dependent (spec.md §9's "runtime-version
//! dependent memory layouts" design note); this module takes them from a
//! [`RuntimeLayout`] selected at attach time rather than hardcoding them.

use libc::pid_t;

use crate::error::Result;
use crate::target::TargetControl;
use crate::version::RuntimeVersion;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UserThreadStatus {
    Running,
    Runnable,
    Waiting,
}

/// A logical thread multiplexed by the target runtime (spec.md §3).
#[derive(Copy, Clone, Debug)]
pub struct UserThread {
    pub id: u64,
    pub pc: u64,
    pub sp: u64,
    pub bp: u64,
    pub status: UserThreadStatus,
    /// The OS thread currently executing this user-thread, if any.
    pub running_on: Option<pid_t>,
}

/// The subset of a runtime's internal layout the introspector needs: where
/// to find the per-OS-thread pointer to its current user-thread, the
/// all-user-threads list, and the fields inside a user-thread record. One
/// variant exists per runtime release family; selected once at attach time
/// from the parsed [`RuntimeVersion`] (spec.md §6, §9).
pub trait RuntimeLayout {
    /// Offset from the per-OS-thread base to the pointer to its current
    /// user-thread record (null if none is running there).
    fn current_user_thread_offset(&self) -> u64;
    /// Address of the global slice header describing all live
    /// user-threads, as read from a well-known symbol via the
    /// [`SymbolOracle`](crate::symbols::SymbolOracle).
    fn all_threads_symbol(&self) -> &'static str;
    fn id_offset(&self) -> u64;
    fn pc_offset(&self) -> u64;
    fn sp_offset(&self) -> u64;
    fn bp_offset(&self) -> u64;
    fn status_offset(&self) -> u64;
    fn status_running(&self) -> u64;
    fn status_waiting(&self) -> u64;
    /// Offset to the deferred-call linked-list head inside a function's
    /// activation record, if this layout tracks one (spec.md §9's open
    /// question on deferred-dispatch detection); `None` means the Next
    /// Engine should skip the deferred-call special case for this layout.
    fn deferred_call_list_offset(&self) -> Option<u64>;
}

/// Layout observed from Go 1.4 through the 1.17 family: stable field
/// offsets inside `runtime.g`/`runtime.m`.
pub struct LegacyLayout;

impl RuntimeLayout for LegacyLayout {
    fn current_user_thread_offset(&self) -> u64 {
        0 // offset of `m.curg` — resolved from DWARF in a real embedder.
    }
    fn all_threads_symbol(&self) -> &'static str {
        "runtime.allgs"
    }
    fn id_offset(&self) -> u64 {
        8 // `g.goid`
    }
    fn pc_offset(&self) -> u64 {
        16 // `g.sched.pc`
    }
    fn sp_offset(&self) -> u64 {
        24 // `g.sched.sp`
    }
    fn bp_offset(&self) -> u64 {
        32 // `g.sched.bp`
    }
    fn status_offset(&self) -> u64 {
        40 // `g.atomicstatus`
    }
    fn status_running(&self) -> u64 {
        2
    }
    fn status_waiting(&self) -> u64 {
        4
    }
    fn deferred_call_list_offset(&self) -> Option<u64> {
        Some(48) // `g._defer`
    }
}

/// Layout for runtimes whose scheduler moved the defer chain off the `g`
/// struct and onto the stack frame directly (1.18+); the introspector still
/// knows how to read `g` itself, but the Next Engine's deferred-dispatch
/// special case is disabled for this family per the open question in
/// spec.md §9.
pub struct ModernLayout;

impl RuntimeLayout for ModernLayout {
    fn current_user_thread_offset(&self) -> u64 {
        0
    }
    fn all_threads_symbol(&self) -> &'static str {
        "runtime.allgs"
    }
    fn id_offset(&self) -> u64 {
        8
    }
    fn pc_offset(&self) -> u64 {
        16
    }
    fn sp_offset(&self) -> u64 {
        24
    }
    fn bp_offset(&self) -> u64 {
        32
    }
    fn status_offset(&self) -> u64 {
        40
    }
    fn status_running(&self) -> u64 {
        2
    }
    fn status_waiting(&self) -> u64 {
        4
    }
    fn deferred_call_list_offset(&self) -> Option<u64> {
        None
    }
}

/// Picks a [`RuntimeLayout`] for a parsed runtime version, per spec.md §6's
/// "Next Engine and User-Thread Introspector consult the parsed version to
/// switch between runtime-layout variants".
pub fn layout_for_version(version: &RuntimeVersion) -> Box<dyn RuntimeLayout> {
    if version.devel || version.minor >= 18 {
        Box::new(ModernLayout)
    } else {
        Box::new(LegacyLayout)
    }
}

/// Sentinel OS threads (e.g. the bootstrap thread) don't run runtime code
/// and have no user-thread; `current_user_thread` returns `Ok(None)` for
/// them rather than an error, per spec.md §4.5's "fails gracefully" note.
pub struct Introspector<'a> {
    layout: &'a dyn RuntimeLayout,
    /// Address of the per-OS-thread runtime structure (`runtime.m`) for
    /// each OS thread id, resolved by a real embedder via thread-local
    /// storage; tests populate this table directly.
    os_thread_bases: std::collections::BTreeMap<pid_t, u64>,
    all_threads_base: u64,
    thread_count: u64,
}

impl<'a> Introspector<'a> {
    pub fn new(layout: &'a dyn RuntimeLayout, all_threads_base: u64, thread_count: u64) -> Self {
        Introspector {
            layout,
            os_thread_bases: std::collections::BTreeMap::new(),
            all_threads_base,
            thread_count,
        }
    }

    pub fn set_os_thread_base(&mut self, tid: pid_t, m_addr: u64) {
        self.os_thread_bases.insert(tid, m_addr);
    }

    fn read_u64(target: &mut dyn TargetControl, tid: pid_t, addr: u64) -> Result<u64> {
        let bytes = target.read_memory(tid, addr, 8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(arr))
    }

    fn read_user_thread(
        &self,
        target: &mut dyn TargetControl,
        tid: pid_t,
        g_addr: u64,
    ) -> Result<UserThread> {
        let id = Self::read_u64(target, tid, g_addr + self.layout.id_offset())?;
        let pc = Self::read_u64(target, tid, g_addr + self.layout.pc_offset())?;
        let sp = Self::read_u64(target, tid, g_addr + self.layout.sp_offset())?;
        let bp = Self::read_u64(target, tid, g_addr + self.layout.bp_offset())?;
        let raw_status = Self::read_u64(target, tid, g_addr + self.layout.status_offset())?;
        let status = if raw_status == self.layout.status_running() {
            UserThreadStatus::Running
        } else if raw_status == self.layout.status_waiting() {
            UserThreadStatus::Waiting
        } else {
            UserThreadStatus::Runnable
        };
        Ok(UserThread {
            id,
            pc,
            sp,
            bp,
            status,
            running_on: None,
        })
    }

    /// The user-thread currently running on `os_tid`, or `None` if that OS
    /// thread isn't executing runtime-managed code.
    pub fn current_user_thread(
        &self,
        target: &mut dyn TargetControl,
        os_tid: pid_t,
    ) -> Result<Option<UserThread>> {
        Ok(self
            .current_user_thread_with_addr(target, os_tid)?
            .map(|(g, _)| g))
    }

    /// Same as [`current_user_thread`](Self::current_user_thread), but also
    /// returns the `g` record's address, so callers that need to read
    /// further runtime-internal fields (e.g. the Next Engine's deferred-call
    /// chain walk) don't have to re-derive it.
    pub fn current_user_thread_with_addr(
        &self,
        target: &mut dyn TargetControl,
        os_tid: pid_t,
    ) -> Result<Option<(UserThread, u64)>> {
        let m_addr = match self.os_thread_bases.get(&os_tid) {
            Some(addr) => *addr,
            None => return Ok(None),
        };
        let g_addr = Self::read_u64(target, os_tid, m_addr + self.layout.current_user_thread_offset())?;
        if g_addr == 0 {
            return Ok(None);
        }
        let mut g = self.read_user_thread(target, os_tid, g_addr)?;
        g.running_on = Some(os_tid);
        Ok(Some((g, g_addr)))
    }

    /// Every user-thread known to the runtime, each with its saved
    /// (pc, sp, bp) (spec.md §4.5).
    pub fn all_user_threads(
        &self,
        target: &mut dyn TargetControl,
        any_tid: pid_t,
    ) -> Result<Vec<UserThread>> {
        let mut out = Vec::new();
        for i in 0..self.thread_count {
            let slot_addr = self.all_threads_base + i * 8;
            let g_addr = Self::read_u64(target, any_tid, slot_addr)?;
            if g_addr == 0 {
                continue;
            }
            out.push(self.read_user_thread(target, any_tid, g_addr)?);
        }
        Ok(out)
    }
}
