//! Breakpoint Table (spec.md §4.2): address → breakpoint record, trap-byte
//! install/remove, hit counts, temporary-vs-user classification.

use std::collections::BTreeMap;

use crate::arch::{validate_address, Architecture};
use crate::error::{Error, Result};
use crate::target::TargetControl;

/// Identifier space for breakpoints. User breakpoints get a monotonically
/// increasing id; temporary breakpoints (installed by the Next Engine) get
/// their own space and are hidden from user-facing enumeration, per
/// spec.md §3's Breakpoint invariants.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BreakpointId {
    User(u64),
    Temporary(u64),
}

#[derive(Clone, Debug)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub addr: u64,
    pub original_bytes: Vec<u8>,
    pub temporary: bool,
    pub total_hit_count: u64,
    pub per_thread_hit_count: BTreeMap<libc::pid_t, u64>,
    pub condition: Option<String>,
}

impl Breakpoint {
    pub fn is_user(&self) -> bool {
        !self.temporary
    }
}

pub struct BreakpointTable {
    arch: Architecture,
    by_addr: BTreeMap<u64, Breakpoint>,
    next_user_id: u64,
    next_temp_id: u64,
}

impl BreakpointTable {
    pub fn new(arch: Architecture) -> Self {
        BreakpointTable {
            arch,
            by_addr: BTreeMap::new(),
            next_user_id: 1,
            next_temp_id: 1,
        }
    }

    /// Number of user-visible breakpoints (excludes temporaries), used by
    /// the Next Engine invariant that its count is unchanged across a call.
    pub fn user_count(&self) -> usize {
        self.by_addr.values().filter(|b| b.is_user()).count()
    }

    pub fn at(&self, addr: u64) -> Option<&Breakpoint> {
        self.by_addr.get(&addr)
    }

    pub fn at_mut(&mut self, addr: u64) -> Option<&mut Breakpoint> {
        self.by_addr.get_mut(&addr)
    }

    pub fn iter_user(&self) -> impl Iterator<Item = &Breakpoint> {
        self.by_addr.values().filter(|b| b.is_user())
    }

    fn set_internal(
        &mut self,
        target: &mut dyn TargetControl,
        tid: libc::pid_t,
        addr: u64,
        temporary: bool,
    ) -> Result<BreakpointId> {
        validate_address(addr)?;
        if self.by_addr.contains_key(&addr) {
            return Err(Error::AlreadySet(addr));
        }
        let trap = self.arch.trap_instruction();
        let original = target.read_memory(tid, addr, trap.len())?;
        target.write_memory(tid, addr, trap)?;

        let id = if temporary {
            let id = BreakpointId::Temporary(self.next_temp_id);
            self.next_temp_id += 1;
            id
        } else {
            let id = BreakpointId::User(self.next_user_id);
            self.next_user_id += 1;
            id
        };

        self.by_addr.insert(
            addr,
            Breakpoint {
                id,
                addr,
                original_bytes: original,
                temporary,
                total_hit_count: 0,
                per_thread_hit_count: BTreeMap::new(),
                condition: None,
            },
        );
        log::debug!("breakpoint set at 0x{:x} (temporary={})", addr, temporary);
        Ok(id)
    }

    pub fn set(
        &mut self,
        target: &mut dyn TargetControl,
        tid: libc::pid_t,
        addr: u64,
    ) -> Result<BreakpointId> {
        self.set_internal(target, tid, addr, false)
    }

    pub fn set_temporary(
        &mut self,
        target: &mut dyn TargetControl,
        tid: libc::pid_t,
        addr: u64,
    ) -> Result<BreakpointId> {
        self.set_internal(target, tid, addr, true)
    }

    pub fn clear(
        &mut self,
        target: &mut dyn TargetControl,
        tid: libc::pid_t,
        addr: u64,
    ) -> Result<Breakpoint> {
        let bp = self.by_addr.remove(&addr).ok_or(Error::NotFound)?;
        target.write_memory(tid, addr, &bp.original_bytes)?;
        log::debug!("breakpoint cleared at 0x{:x}", addr);
        Ok(bp)
    }

    pub fn record_hit(&mut self, addr: u64, tid: libc::pid_t) {
        if let Some(bp) = self.by_addr.get_mut(&addr) {
            bp.total_hit_count += 1;
            *bp.per_thread_hit_count.entry(tid).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::fake::FakeTargetControl;

    #[test]
    fn set_then_clear_restores_original_byte() {
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        target.set_memory(0x1000, &[0x55]);
        target.add_thread(1, Default::default());

        table.set(&mut target, 1, 0x1000).unwrap();
        assert_eq!(target.memory[&0x1000], 0xCC);
        assert_eq!(table.user_count(), 1);

        table.clear(&mut target, 1, 0x1000).unwrap();
        assert_eq!(target.memory[&0x1000], 0x55);
        assert_eq!(table.user_count(), 0);
    }

    #[test]
    fn set_twice_fails_already_set() {
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        target.add_thread(1, Default::default());

        table.set(&mut target, 1, 0x2000).unwrap();
        let err = table.set(&mut target, 1, 0x2000).unwrap_err();
        assert!(matches!(err, Error::AlreadySet(0x2000)));
    }

    #[test]
    fn zero_address_is_invalid() {
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        let err = table.set(&mut target, 1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(0)));
    }

    #[test]
    fn temporary_breakpoints_are_hidden_from_user_enumeration() {
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        target.add_thread(1, Default::default());

        table.set(&mut target, 1, 0x1000).unwrap();
        table.set_temporary(&mut target, 1, 0x2000).unwrap();

        assert_eq!(table.user_count(), 1);
        assert_eq!(table.iter_user().count(), 1);
    }

    #[test]
    fn clear_unknown_address_fails_not_found() {
        let mut table = BreakpointTable::new(Architecture::X86_64);
        let mut target = FakeTargetControl::new();
        let err = table.clear(&mut target, 1, 0x3000).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }
}
