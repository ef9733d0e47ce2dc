//! Architecture-descriptor boundary (spec.md §6): pointer size, the trap
//! instruction, and a mapping from architectural registers to a canonical
//! register bank. Only `X86_64` is wired to a real [`TargetControl`]
//! implementation; the descriptor itself is architecture-neutral so the rest
//! of the crate never special-cases a register layout directly.

use crate::error::{Error, Result};

/// The architectures this crate knows how to talk to natively.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Architecture {
    X86_64,
    Arm64,
}

impl Architecture {
    pub fn pointer_size(self) -> usize {
        match self {
            Architecture::X86_64 => 8,
            Architecture::Arm64 => 8,
        }
    }

    /// The byte sequence that traps into the debugger when executed.
    pub fn trap_instruction(self) -> &'static [u8] {
        match self {
            Architecture::X86_64 => &[0xCC],
            // BRK #0 is the usual software breakpoint on AArch64.
            Architecture::Arm64 => &[0x00, 0x00, 0x20, 0xD4],
        }
    }

    /// Number of bytes the PC must be rewound by after a trap, per §4.3's
    /// "CISC-style trap semantics" note. AArch64's BRK does not advance PC
    /// past the instruction, so there is nothing to rewind there.
    pub fn trap_rewind(self) -> u64 {
        match self {
            Architecture::X86_64 => 1,
            Architecture::Arm64 => 0,
        }
    }
}

/// A canonical, architecture-independent view over a thread's registers.
/// Concrete [`TargetControl`](crate::target::TargetControl) implementations
/// fill this in from whatever native register struct the kernel handed back.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub pc: u64,
    pub sp: u64,
    pub bp: u64,
    /// Integer general-purpose file, in architecture-defined order. Callers
    /// that need a specific register (e.g. the ABI return-value register)
    /// index into this with an architecture-specific constant.
    pub gpr: [u64; 32],
}

impl Registers {
    pub fn new() -> Self {
        Registers::default()
    }

    pub fn with_pc(mut self, pc: u64) -> Self {
        self.pc = pc;
        self
    }
}

pub fn validate_address(addr: u64) -> Result<()> {
    if addr == 0 {
        return Err(Error::InvalidAddress(addr));
    }
    Ok(())
}
