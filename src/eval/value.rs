//! The evaluator's `Variable` value type (spec.md §3).

use crate::error::UnreadableReason;
use crate::eval::constant::Constant;
use crate::symbols::Type;

/// Classification of a [`Variable`], independent of whether it carries a
/// live DWARF type (a pure constant still has a `Kind`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    Integer,
    Unsigned,
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
    Nil,
}

/// An evaluator value (spec.md §3). A `Variable` with neither `address` nor
/// `constant` set is the sentinel *nil*.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: Option<String>,
    pub address: Option<u64>,
    pub ty: Option<Type>,
    pub kind: Kind,
    pub constant: Option<Constant>,
    pub loaded: bool,
    pub unreadable: Option<UnreadableReason>,
    pub length: Option<u64>,
    pub capacity: Option<u64>,
    pub stride: Option<u64>,
    pub element_type: Option<Box<Type>>,
    pub children: Vec<Variable>,
    /// Number of map buckets skipped so far, for the paginated-map-display
    /// convention referenced by spec.md §4.8's slicing rules.
    pub map_skip: u64,
}

impl Variable {
    pub fn nil() -> Self {
        Variable {
            name: None,
            address: None,
            ty: None,
            kind: Kind::Nil,
            constant: None,
            loaded: true,
            unreadable: None,
            length: None,
            capacity: None,
            stride: None,
            element_type: None,
            children: Vec::new(),
            map_skip: 0,
        }
    }

    pub fn from_constant(kind: Kind, constant: Constant) -> Self {
        Variable {
            name: None,
            address: None,
            ty: None,
            kind,
            constant: Some(constant),
            loaded: true,
            unreadable: None,
            length: None,
            capacity: None,
            stride: None,
            element_type: None,
            children: Vec::new(),
            map_skip: 0,
        }
    }

    pub fn unreadable(kind: Kind, reason: UnreadableReason) -> Self {
        Variable {
            name: None,
            address: None,
            ty: None,
            kind,
            constant: None,
            loaded: false,
            unreadable: Some(reason),
            length: None,
            capacity: None,
            stride: None,
            element_type: None,
            children: Vec::new(),
            map_skip: 0,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.address.is_none() && self.constant.is_none() && self.children.is_empty()
    }
}
