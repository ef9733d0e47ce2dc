//! Stack Walker (spec.md §4.6) and its `Stackframe` data model
//! (spec.md §3).

use crate::error::{Error, Result};
use crate::symbols::{Function, SymbolOracle};
use crate::target::TargetControl;

#[derive(Clone, Debug)]
pub struct Stackframe {
    pub pc: u64,
    pub file: String,
    pub line: u32,
    pub function: Option<Function>,
    pub frame_base: u64,
    pub return_address: u64,
    /// Set for a synthetic frame emitted when the walker hits a PC with no
    /// DWARF information (e.g. a native/foreign-function frame). Per
    /// spec.md §9's mixed-language-frames design note, the walker
    /// truncates with a marker frame instead of erroring.
    pub warning: Option<String>,
}

/// Functions that terminate a stacktrace: the runtime's bottom-of-stack
/// trampolines. A real embedder supplies the actual symbol names for the
/// attached runtime version; tests use a fixed placeholder.
pub fn is_sentinel_function(name: &str) -> bool {
    matches!(name, "runtime.goexit" | "runtime.mstart" | "runtime.rt0_go")
}

pub struct StackWalker<'a> {
    oracle: &'a dyn SymbolOracle,
}

impl<'a> StackWalker<'a> {
    pub fn new(oracle: &'a dyn SymbolOracle) -> Self {
        StackWalker { oracle }
    }

    fn read_u64(target: &mut dyn TargetControl, tid: libc::pid_t, addr: u64) -> Result<u64> {
        let bytes = target.read_memory(tid, addr, 8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(arr))
    }

    /// `return_address(thread)` (spec.md §4.6): the immediate caller's PC.
    /// Fails with `TopOfStack` at the root function.
    pub fn return_address(
        &self,
        target: &mut dyn TargetControl,
        tid: libc::pid_t,
        pc: u64,
        frame_base: u64,
    ) -> Result<u64> {
        let func = self
            .oracle
            .pc_to_line(pc)
            .map(|(_, _, f)| f)
            .ok_or(Error::NotFound)?;
        if is_sentinel_function(&func.name) {
            return Err(Error::TopOfStack);
        }
        let fde = self.oracle.frame_description(pc).ok_or(Error::NotFound)?;
        let ra_addr = (frame_base as i64 + fde.return_address_offset) as u64;
        Self::read_u64(target, tid, ra_addr)
    }

    /// `stacktrace(thread, depth)` (spec.md §4.6): walks until `depth` is
    /// reached or the sentinel function is encountered.
    pub fn stacktrace(
        &self,
        target: &mut dyn TargetControl,
        tid: libc::pid_t,
        pc: u64,
        sp: u64,
        bp: u64,
        depth: usize,
    ) -> Result<Vec<Stackframe>> {
        let mut frames = Vec::new();
        let mut cur_pc = pc;
        let mut cur_bp = bp;
        let _ = sp;

        for _ in 0..depth {
            let located = self.oracle.pc_to_line(cur_pc);
            let (file, line, func) = match located {
                Some(v) => v,
                None => {
                    frames.push(Stackframe {
                        pc: cur_pc,
                        file: String::new(),
                        line: 0,
                        function: None,
                        frame_base: cur_bp,
                        return_address: 0,
                        warning: Some("no debug information for this frame".to_string()),
                    });
                    break;
                }
            };

            if is_sentinel_function(&func.name) {
                break;
            }

            let fde = self.oracle.frame_description(cur_pc);
            let (return_address, caller_bp) = match fde {
                Some(fde) => {
                    let ra_addr = (cur_bp as i64 + fde.return_address_offset) as u64;
                    let ra = Self::read_u64(target, tid, ra_addr)?;
                    let caller_bp_addr = (cur_bp as i64 + fde.caller_bp_offset) as u64;
                    let caller_bp = Self::read_u64(target, tid, caller_bp_addr)?;
                    (ra, caller_bp)
                }
                None => {
                    frames.push(Stackframe {
                        pc: cur_pc,
                        file,
                        line,
                        function: Some(func),
                        frame_base: cur_bp,
                        return_address: 0,
                        warning: Some("missing frame description; stack truncated".to_string()),
                    });
                    break;
                }
            };

            frames.push(Stackframe {
                pc: cur_pc,
                file,
                line,
                function: Some(func),
                frame_base: cur_bp,
                return_address,
                warning: None,
            });

            if return_address == 0 {
                break;
            }
            cur_pc = return_address;
            cur_bp = caller_bp;
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{FrameDescription, LineRow, TestOracle};
    use crate::target::fake::FakeTargetControl;

    fn make_oracle() -> TestOracle {
        let mut oracle = TestOracle::new();
        oracle.add_function(Function {
            name: "main.stacktraceme".to_string(),
            entry: 0x1000,
            low_pc: 0x1000,
            high_pc: 0x1100,
            package: "main".to_string(),
            lines: vec![LineRow {
                pc: 0x1000,
                file: "main.go",
                line: 10,
                is_stmt: true,
            }],
        });
        oracle.add_function(Function {
            name: "main.main".to_string(),
            entry: 0x2000,
            low_pc: 0x2000,
            high_pc: 0x2100,
            package: "main".to_string(),
            lines: vec![LineRow {
                pc: 0x2000,
                file: "main.go",
                line: 20,
                is_stmt: true,
            }],
        });
        oracle.add_function(Function {
            name: "runtime.goexit".to_string(),
            entry: 0x3000,
            low_pc: 0x3000,
            high_pc: 0x3010,
            package: "runtime".to_string(),
            lines: vec![],
        });
        oracle.frame_descriptions.insert(
            0x1000,
            FrameDescription {
                return_address_offset: 8,
                caller_bp_offset: 0,
            },
        );
        oracle.frame_descriptions.insert(
            0x2000,
            FrameDescription {
                return_address_offset: 8,
                caller_bp_offset: 0,
            },
        );
        oracle
    }

    #[test]
    fn stacktrace_terminates_at_sentinel_function() {
        let oracle = make_oracle();
        let mut target = FakeTargetControl::new();
        target.add_thread(1, Default::default());

        // frame 1 (stacktraceme) -> returns into main.main
        target.set_memory(0x7000 + 8, &0x2050u64.to_le_bytes());
        target.set_memory(0x7000, &0x7100u64.to_le_bytes());
        // frame 2 (main) -> returns into runtime.goexit; walker stops before
        // descending into it because goexit is a sentinel.
        target.set_memory(0x7100 + 8, &0x3000u64.to_le_bytes());
        target.set_memory(0x7100, &0u64.to_le_bytes());

        let walker = StackWalker::new(&oracle);
        let frames = walker
            .stacktrace(&mut target, 1, 0x1000, 0, 0x7000, 10)
            .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].function.as_ref().unwrap().name, "main.stacktraceme");
        assert_eq!(frames[1].function.as_ref().unwrap().name, "main.main");
    }

    #[test]
    fn return_address_at_root_fails_top_of_stack() {
        let oracle = make_oracle();
        let mut target = FakeTargetControl::new();
        target.add_thread(1, Default::default());
        let walker = StackWalker::new(&oracle);
        let err = walker
            .return_address(&mut target, 1, 0x3000, 0)
            .unwrap_err();
        assert!(matches!(err, Error::TopOfStack));
    }

    #[test]
    fn unknown_pc_truncates_with_warning_marker() {
        let oracle = make_oracle();
        let mut target = FakeTargetControl::new();
        target.add_thread(1, Default::default());
        let walker = StackWalker::new(&oracle);
        let frames = walker
            .stacktrace(&mut target, 1, 0xDEAD, 0, 0, 10)
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].warning.is_some());
    }
}
