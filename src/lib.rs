//! Core of a source-level debugger for a statically-typed, goroutine-scheduled
//! native language (spec.md §0): the Process Orchestrator, Breakpoint Table,
//! Thread Controller, Next Engine, Stack Walker, Goroutine Introspector, and
//! Expression Evaluator. Everything here is the engine; host I/O (a CLI, a
//! DAP server, a test harness) is an external collaborator that drives a
//! [`process::Process`] through a [`target::TargetControl`] backend and reads
//! results back through the data model in [`eval::value`] and [`stack`].
//!
//! This crate never parses ELF/DWARF itself — see [`symbols::SymbolOracle`] —
//! and never issues kernel debug syscalls outside [`target`]. Both boundaries
//! exist so the rest of the engine can be exercised with
//! [`target::fake::FakeTargetControl`] and [`symbols::TestOracle`] instead of
//! a real inferior process.

pub mod arch;
pub mod breakpoint;
pub mod config;
pub mod error;
pub mod eval;
pub mod goroutine;
pub mod logging;
pub mod next;
pub mod process;
pub mod stack;
pub mod symbols;
pub mod target;
pub mod thread;
pub mod version;

pub use config::DebuggerConfig;
pub use error::{Error, Result};
pub use eval::{Evaluator, Variable};
pub use process::Process;
