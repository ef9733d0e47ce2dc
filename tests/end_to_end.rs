//! End-to-end scenarios (spec.md §8) driving the Process Orchestrator,
//! Breakpoint Table, Thread Controller, Next Engine, Goroutine Introspector,
//! Stack Walker and Expression Evaluator together through the public API,
//! the way an embedder (CLI, DAP server) would. Each test plays the target
//! through [`FakeTargetControl`] exactly as the unit tests in each module
//! do, but exercises the full pipeline rather than one component in
//! isolation.

use num_bigint::BigInt;

use dlvcore::arch::{Architecture, Registers};
use dlvcore::breakpoint::BreakpointId;
use dlvcore::eval::{ast, Constant, Evaluator};
use dlvcore::goroutine::{Introspector, LegacyLayout};
use dlvcore::next::NextEngine;
use dlvcore::process::{ContinueOutcome, Process};
use dlvcore::stack::StackWalker;
use dlvcore::symbols::{FrameDescription, Function, LineRow, Scope, TestOracle, Type, TypeKind,
    VarLocation, VariableDescriptor};
use dlvcore::target::fake::FakeTargetControl;
use dlvcore::target::StopReason;
use dlvcore::thread::ThreadState;

fn int_type() -> Type {
    Type {
        name: "int".into(),
        kind: TypeKind::Int,
        byte_size: 8,
        element: None,
        length: None,
        fields: Vec::new(),
    }
}

/// Scenario 1: a program that returns immediately reports a clean exit, not
/// an error.
#[test]
fn exit_clean() {
    let mut process = Process::new(100, Architecture::X86_64);
    let mut target = FakeTargetControl::new();
    target.add_thread(100, Registers::new());
    process.add_thread(100);

    target.push_event(100, StopReason::Exited(0));
    let outcome = process.continue_all(&mut target).unwrap();

    match outcome {
        ContinueOutcome::Exited { pid, status } => {
            assert_eq!(pid, 100);
            assert_eq!(status, 0);
        }
        ContinueOutcome::Stopped { .. } => panic!("expected a clean exit"),
    }
    assert!(!process.running());
}

/// Scenario 2: a breakpoint at a function's entry stops there exactly once,
/// and a live local variable is readable through the evaluator at that stop.
#[test]
fn breakpoint_hit_once_and_variable_reads_back() {
    let mut oracle = TestOracle::new();
    oracle.add_function(Function {
        name: "main.helloworld".to_string(),
        entry: 0x3000,
        low_pc: 0x3000,
        high_pc: 0x3100,
        package: "main".to_string(),
        lines: vec![LineRow {
            pc: 0x3000,
            file: "main.go",
            line: 7,
            is_stmt: true,
        }],
    });
    oracle.locals.insert(
        0x3000,
        vec![VariableDescriptor {
            name: "greeting".to_string(),
            ty: int_type(),
            location: VarLocation::Address(0x4000),
        }],
    );

    let mut process = Process::new(200, Architecture::X86_64);
    let mut target = FakeTargetControl::new();
    target.add_thread(200, Registers::new());
    process.add_thread(200);
    target.set_memory(0x4000, &42i64.to_le_bytes());

    let bp_id = process.breakpoints.set(&mut target, 200, 0x3000).unwrap();
    assert!(matches!(bp_id, BreakpointId::User(_)));

    let mut regs = target.registers(200).unwrap();
    regs.pc = 0x3000;
    target.set_registers(200, regs).unwrap();
    target.push_event(200, StopReason::Trap);

    let outcome = process.continue_all(&mut target).unwrap();
    assert!(matches!(outcome, ContinueOutcome::Stopped { tid: 200 }));
    assert_eq!(process.current_thread().unwrap().registers.pc, 0x3000);

    let bp = process.breakpoints.at(0x3000).unwrap();
    assert_eq!(bp.total_hit_count, 1);
    assert_eq!(target.memory[&0x3000], Architecture::X86_64.trap_instruction()[0]);

    let evaluator = Evaluator::new(&oracle);
    let scope = Scope { pc: 0x3000, frame_base: 0 };
    let expr = ast::parse("greeting").unwrap();
    let value = evaluator.eval(&expr, &mut target, 200, scope).unwrap();
    assert_eq!(value.constant, Some(Constant::Int(BigInt::from(42))));
}

/// Scenario 3: stepping one source line at a time through a `for` loop
/// reproduces the exact line-table traversal
/// `19→20, 20→23, 23→24, 24→26, 26→31, 31→23, 23→24, 24→26, 26→27, 27→34`.
#[test]
fn step_over_simple_statement_reproduces_line_sequence() {
    let lines = [
        (19u32, 0x1000u64),
        (20, 0x1010),
        (23, 0x1020),
        (24, 0x1030),
        (26, 0x1040),
        (31, 0x1050),
        (27, 0x1060),
        (34, 0x1070),
    ];
    let mut oracle = TestOracle::new();
    oracle.add_function(Function {
        name: "main.loop".to_string(),
        entry: 0x1000,
        low_pc: 0x1000,
        high_pc: 0x1100,
        package: "main".to_string(),
        lines: lines
            .iter()
            .map(|(line, pc)| LineRow { pc: *pc, file: "main.go", line: *line, is_stmt: true })
            .collect(),
    });
    let pc_of = |line: u32| lines.iter().find(|(l, _)| *l == line).unwrap().1;

    let layout = LegacyLayout;
    let introspector = Introspector::new(&layout, 0, 0);
    let engine = NextEngine::new(&oracle, &introspector, &layout);

    let mut process = Process::new(1, Architecture::X86_64);
    let mut target = FakeTargetControl::new();
    target.add_thread(1, Registers::new());
    process.add_thread(1);
    process.threads.get_mut(&1).unwrap().registers.pc = pc_of(19);

    let transitions = [
        (19, 20),
        (20, 23),
        (23, 24),
        (24, 26),
        (26, 31),
        (31, 23),
        (23, 24),
        (24, 26),
        (26, 27),
        (27, 34),
    ];

    for (from, to) in transitions {
        assert_eq!(process.current_thread().unwrap().registers.pc, pc_of(from));
        let before = process.breakpoints.user_count();

        let mut regs = target.registers(1).unwrap();
        regs.pc = pc_of(to);
        target.set_registers(1, regs).unwrap();
        target.push_event(1, StopReason::Trap);

        engine.next(&mut process, &mut target).unwrap();

        assert_eq!(process.breakpoints.user_count(), before);
        assert_eq!(process.current_thread().unwrap().registers.pc, pc_of(to));
    }
}

/// Scenario 4: a temporary breakpoint hit by a goroutine other than the one
/// being stepped must not end the step. `main.loop`'s own thread (tid 1,
/// user-thread 42) is the one `Next()` is stepping; tid 2 (user-thread 99)
/// represents a concurrently scheduled goroutine that trips the same
/// installed temporary while we're waiting for tid 1's.
#[test]
fn cross_goroutine_step_protection_absorbs_foreign_hit() {
    let mut oracle = TestOracle::new();
    oracle.add_function(Function {
        name: "main.work".to_string(),
        entry: 0x2000,
        low_pc: 0x2000,
        high_pc: 0x2100,
        package: "main".to_string(),
        lines: vec![
            LineRow { pc: 0x2000, file: "main.go", line: 9, is_stmt: true },
            LineRow { pc: 0x2010, file: "main.go", line: 10, is_stmt: true },
        ],
    });

    let layout = LegacyLayout;
    let mut introspector = Introspector::new(&layout, 0, 0);
    let mut target = FakeTargetControl::new();
    target.add_thread(1, Registers::new());
    target.add_thread(2, Registers::new());

    // tid 1: user-thread 42, currently selected.
    target.set_memory(0x4000, &0x5000u64.to_le_bytes());
    target.set_memory(0x5008, &42u64.to_le_bytes());
    target.set_memory(0x5028, &2u64.to_le_bytes()); // running
    introspector.set_os_thread_base(1, 0x4000);

    // tid 2: user-thread 99, a different goroutine racing onto the same
    // temporary breakpoint.
    target.set_memory(0x6000, &0x7000u64.to_le_bytes());
    target.set_memory(0x7008, &99u64.to_le_bytes());
    target.set_memory(0x7028, &2u64.to_le_bytes());
    introspector.set_os_thread_base(2, 0x6000);

    let engine = NextEngine::new(&oracle, &introspector, &layout);

    let mut process = Process::new(1, Architecture::X86_64);
    process.add_thread(1);
    process.add_thread(2);
    process.threads.get_mut(&1).unwrap().registers.pc = 0x2000;

    // tid 2 hits the temporary installed at the next statement boundary
    // (0x2010) before tid 1 does.
    let mut regs2 = target.registers(2).unwrap();
    regs2.pc = 0x2010;
    target.set_registers(2, regs2).unwrap();
    target.push_event(2, StopReason::Trap);

    engine.next(&mut process, &mut target).unwrap();

    // No installed temporary survives the call, whichever thread resolved
    // it, and control ends up back on the thread Next() started on — tid 2's
    // hit never independently raced to a stop of its own, so the
    // accounting that lets `continue_all` return a consistent snapshot is
    // what concludes the call.
    assert_eq!(process.breakpoints.user_count(), 0);
    assert!(process.breakpoints.at(0x2010).is_none());
    assert_eq!(process.current_tid, Some(1));
}

/// Scenario 5: at a breakpoint reached from ten background goroutines plus
/// `main`, the introspector must be able to tell the one `main` chain apart
/// from the background chains by their stacktraces.
#[test]
fn stacktrace_distinguishes_main_goroutine_from_background_ones() {
    let mut oracle = TestOracle::new();
    let funcs = [
        ("main.stacktraceme", 0x1000u64),
        ("main.main", 0x2000),
        ("runtime.gopark", 0x3000),
        ("runtime.goparkunlock", 0x4000),
        ("runtime.chansend", 0x5000),
        ("runtime.chansend1", 0x6000),
        ("main.agoroutine", 0x7000),
        ("runtime.goexit", 0x8000),
    ];
    for (name, entry) in funcs {
        oracle.add_function(Function {
            name: name.to_string(),
            entry,
            low_pc: entry,
            high_pc: entry + 0x100,
            package: if name.starts_with("runtime.") { "runtime" } else { "main" }.to_string(),
            lines: vec![LineRow { pc: entry, file: "main.go", line: 1, is_stmt: true }],
        });
        if name != "runtime.goexit" {
            oracle.frame_descriptions.insert(
                entry,
                FrameDescription { return_address_offset: 8, caller_bp_offset: 0 },
            );
        }
    }

    let mut target = FakeTargetControl::new();
    target.add_thread(1, Registers::new());

    // The main goroutine's chain: stacktraceme -> main -> goexit.
    target.set_memory(0x9000 + 8, &0x2010u64.to_le_bytes());
    target.set_memory(0x9000, &0x9100u64.to_le_bytes());
    target.set_memory(0x9100 + 8, &0x8000u64.to_le_bytes());

    const BACKGROUND_COUNT: u64 = 10;
    for i in 0..BACKGROUND_COUNT {
        let base = 0xA000 + i * 0x1000;
        target.set_memory(base + 8, &0x4010u64.to_le_bytes());
        target.set_memory(base, &(base + 0x100).to_le_bytes());
        target.set_memory(base + 0x100 + 8, &0x5010u64.to_le_bytes());
        target.set_memory(base + 0x100, &(base + 0x200).to_le_bytes());
        target.set_memory(base + 0x200 + 8, &0x6010u64.to_le_bytes());
        target.set_memory(base + 0x200, &(base + 0x300).to_le_bytes());
        target.set_memory(base + 0x300 + 8, &0x7010u64.to_le_bytes());
        target.set_memory(base + 0x300, &(base + 0x400).to_le_bytes());
        target.set_memory(base + 0x400 + 8, &0x8000u64.to_le_bytes());
    }

    // The all-user-threads table: slot 0 is main, slots 1..=10 background.
    let all_threads_base = 0x500u64;
    let main_g = 0x6000u64;
    target.set_memory(main_g + 8, &1u64.to_le_bytes()); // goid
    target.set_memory(main_g + 16, &0x1000u64.to_le_bytes()); // pc
    target.set_memory(main_g + 32, &0x9000u64.to_le_bytes()); // bp
    target.set_memory(main_g + 40, &2u64.to_le_bytes()); // running
    target.set_memory(all_threads_base, &main_g.to_le_bytes());

    for i in 0..BACKGROUND_COUNT {
        let g_addr = 0x6100 + i * 0x100;
        let base = 0xA000 + i * 0x1000;
        target.set_memory(g_addr + 8, &(10 + i).to_le_bytes());
        target.set_memory(g_addr + 16, &0x3000u64.to_le_bytes());
        target.set_memory(g_addr + 32, &base.to_le_bytes());
        target.set_memory(g_addr + 40, &4u64.to_le_bytes()); // waiting
        target.set_memory(all_threads_base + (i + 1) * 8, &g_addr.to_le_bytes());
    }

    let layout = LegacyLayout;
    let introspector = Introspector::new(&layout, all_threads_base, BACKGROUND_COUNT + 1);
    let all = introspector.all_user_threads(&mut target, 1).unwrap();
    assert_eq!(all.len() as u64, BACKGROUND_COUNT + 1);

    let walker = StackWalker::new(&oracle);
    let mut main_chains = 0;
    let mut background_chains = 0;
    for g in &all {
        let frames = walker.stacktrace(&mut target, 1, g.pc, g.sp, g.bp, 10).unwrap();
        let names: Vec<&str> = frames
            .iter()
            .map(|f| f.function.as_ref().unwrap().name.as_str())
            .collect();
        if names == vec!["main.stacktraceme", "main.main"] {
            main_chains += 1;
        } else if names
            == vec![
                "runtime.gopark",
                "runtime.goparkunlock",
                "runtime.chansend",
                "runtime.chansend1",
                "main.agoroutine",
            ]
        {
            background_chains += 1;
        } else {
            panic!("unexpected stack shape: {:?}", names);
        }
    }

    assert_eq!(main_chains, 1);
    assert_eq!(background_chains, BACKGROUND_COUNT as usize);
}

/// Scenario 6: a manual stop requested from outside the controller thread
/// ends an outstanding `Continue()` cleanly, and every tracked thread
/// reports stopped, not just the one `wait_any` happened to name.
#[test]
fn manual_stop_leaves_every_thread_stopped() {
    let mut process = Process::new(300, Architecture::X86_64);
    let mut target = FakeTargetControl::new();
    target.add_thread(300, Registers::new());
    target.add_thread(301, Registers::new());
    process.add_thread(300);
    process.add_thread(301);

    process.request_manual_stop(&mut target).unwrap();
    let outcome = process.continue_all(&mut target).unwrap();

    assert!(matches!(outcome, ContinueOutcome::Stopped { tid: 300 }));
    for thread in process.threads.values() {
        assert_eq!(thread.state, ThreadState::Stopped, "tid {} not stopped", thread.tid);
    }
}
