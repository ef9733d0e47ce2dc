//! The DWARF oracle boundary (spec.md §4.5/§6). This crate treats the
//! ELF/DWARF reader as an external collaborator that can answer a handful
//! of fixed questions; it never parses object files itself. Production
//! embedders back [`SymbolOracle`] with a real DWARF reader (`gimli`, as
//! `isgasho-rd` itself does); this crate only needs the shapes that reader
//! would hand back (`LineRow`, `TypeKind`), not the parser.

use std::collections::BTreeMap;

/// One row of a function's line-number program: the PC where a given
/// source line begins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineRow {
    pub pc: u64,
    pub file: &'static str,
    pub line: u32,
    /// True when this PC is the first instruction of a new *statement*
    /// (as opposed to a mid-statement line-table row emitted for column
    /// info); only statement-starting rows are line-exit candidates.
    pub is_stmt: bool,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub entry: u64,
    pub low_pc: u64,
    pub high_pc: u64,
    pub package: String,
    /// Line table rows for this function only, in ascending PC order.
    pub lines: Vec<LineRow>,
}

impl Function {
    pub fn contains(&self, pc: u64) -> bool {
        pc >= self.low_pc && pc < self.high_pc
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeKind {
    Int,
    Uint,
    Float,
    Complex,
    Bool,
    String,
    Pointer,
    Slice,
    Array,
    Map,
    Struct,
    Channel,
    Function,
    Interface,
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub offset: u64,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct Type {
    pub name: String,
    pub kind: TypeKind,
    pub byte_size: u64,
    /// For slices/arrays/pointers/channels: the pointed-to/element type.
    pub element: Option<Box<Type>>,
    /// For arrays and slices: a fixed or runtime-read length; `None` for
    /// slices whose length is only known by reading the slice header.
    pub length: Option<u64>,
    pub fields: Vec<FieldDescriptor>,
}

impl Type {
    pub fn synthetic_pointer(element: Type) -> Type {
        Type {
            name: format!("*{}", element.name),
            kind: TypeKind::Pointer,
            byte_size: 8,
            element: Some(Box::new(element)),
            length: None,
            fields: Vec::new(),
        }
    }
}

/// A Frame Description Entry: how to unwind one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameDescription {
    /// Offset from CFA (sp at call time) to find the return address.
    pub return_address_offset: i64,
    /// Offset from CFA to find the caller's frame base.
    pub caller_bp_offset: i64,
}

/// A named location where a local/global variable lives: either a fixed
/// address, or an offset from the current frame base.
#[derive(Clone, Copy, Debug)]
pub enum VarLocation {
    Address(u64),
    FrameOffset(i64),
}

#[derive(Clone, Debug)]
pub struct VariableDescriptor {
    pub name: String,
    pub ty: Type,
    pub location: VarLocation,
}

/// Scope handle passed to `iterate_variables`: a function plus the PC we're
/// stopped at (so block-scoped locals can be filtered by range in a fuller
/// implementation).
#[derive(Clone, Copy, Debug)]
pub struct Scope {
    pub pc: u64,
    pub frame_base: u64,
}

/// The boundary interface spec.md §6 asks for. Implementations answer
/// "addresses for source line L of file F", "function at address A", "type
/// description for name T", and "unwind one frame given registers and
/// memory" — this crate never reads ELF/DWARF sections itself.
pub trait SymbolOracle {
    fn lookup_function(&self, name: &str) -> Option<Function>;
    fn pc_to_line(&self, pc: u64) -> Option<(String, u32, Function)>;
    fn line_to_pc(&self, file: &str, line: u32) -> Vec<u64>;
    fn function_entry(&self, f: &Function) -> u64 {
        f.entry
    }
    fn type_by_name(&self, name: &str) -> Option<Type>;
    fn iterate_variables(&self, scope: Scope) -> Vec<VariableDescriptor>;
    fn frame_description(&self, pc: u64) -> Option<FrameDescription>;
    fn read_type_at_offset(&self, offset: u64) -> Option<Type>;
    /// Package-qualified global lookup used by identifier resolution
    /// (spec.md §4.8): `package` is the current function's package.
    fn lookup_package_global(&self, package: &str, name: &str) -> Option<VariableDescriptor>;
}

/// A simple in-memory oracle used by tests: a fixed table of functions
/// keyed by name and by PC range, with synthetic line tables. Grounded in
/// the same "fixed vocabulary of questions" shape as the trait above, just
/// backed by a `BTreeMap` instead of parsed DWARF sections.
#[derive(Default)]
pub struct TestOracle {
    pub functions: BTreeMap<String, Function>,
    pub frame_descriptions: BTreeMap<u64, FrameDescription>,
    pub types: BTreeMap<String, Type>,
    pub globals: BTreeMap<(String, String), VariableDescriptor>,
    pub locals: BTreeMap<u64, Vec<VariableDescriptor>>,
}

impl TestOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, f: Function) {
        self.functions.insert(f.name.clone(), f);
    }
}

impl SymbolOracle for TestOracle {
    fn lookup_function(&self, name: &str) -> Option<Function> {
        self.functions.get(name).cloned()
    }

    fn pc_to_line(&self, pc: u64) -> Option<(String, u32, Function)> {
        for f in self.functions.values() {
            if f.contains(pc) {
                let mut best: Option<&LineRow> = None;
                for row in &f.lines {
                    if row.pc <= pc && (best.is_none() || row.pc > best.unwrap().pc) {
                        best = Some(row);
                    }
                }
                return best.map(|r| (r.file.to_string(), r.line, f.clone()));
            }
        }
        None
    }

    fn line_to_pc(&self, file: &str, line: u32) -> Vec<u64> {
        let mut out = Vec::new();
        for f in self.functions.values() {
            for row in &f.lines {
                if row.file == file && row.line == line {
                    out.push(row.pc);
                }
            }
        }
        out
    }

    fn type_by_name(&self, name: &str) -> Option<Type> {
        self.types.get(name).cloned()
    }

    fn iterate_variables(&self, scope: Scope) -> Vec<VariableDescriptor> {
        self.locals.get(&scope.pc).cloned().unwrap_or_default()
    }

    fn frame_description(&self, pc: u64) -> Option<FrameDescription> {
        for f in self.functions.values() {
            if f.contains(pc) {
                return self.frame_descriptions.get(&f.entry).copied();
            }
        }
        None
    }

    fn read_type_at_offset(&self, _offset: u64) -> Option<Type> {
        None
    }

    fn lookup_package_global(&self, package: &str, name: &str) -> Option<VariableDescriptor> {
        self.globals
            .get(&(package.to_string(), name.to_string()))
            .cloned()
    }
}
