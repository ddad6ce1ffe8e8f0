pub mod arena;
pub mod builder;
mod hash;

use derive_more as dm;
use num_bigint::BigUint;

pub use arena::{ArenaSnapshot, AstArena, NodeRef};
pub use builder::AstBuilder;
pub use hash::Hash512;

use crate::store::{ExprId, VarId};

/// The closed set of node kinds.
///
/// The numbering is stable and feeds the structural hash; new kinds must be
/// appended, never inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    // Bit-vector arithmetic and bitwise operations.
    BvAdd,
    BvSub,
    BvMul,
    BvUdiv,
    BvSdiv,
    BvUrem,
    BvSrem,
    BvSmod,
    BvAnd,
    BvOr,
    BvXor,
    BvNand,
    BvNor,
    BvXnor,
    BvShl,
    BvLshr,
    BvAshr,
    BvRol,
    BvRor,
    BvNeg,
    BvNot,
    // Bit-vector comparisons.
    BvUlt,
    BvUle,
    BvUgt,
    BvUge,
    BvSlt,
    BvSle,
    BvSgt,
    BvSge,
    Equal,
    Distinct,
    // Structural operations.
    Concat,
    Extract,
    Zx,
    Sx,
    Ite,
    // Boolean connectives.
    Land,
    Lor,
    Lnot,
    // Leaves.
    Bv,
    Decimal,
    String,
    Variable,
    // Binding and graph link.
    Let,
    Reference,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        use NodeKind::*;
        match self {
            BvAdd => "bvadd",
            BvSub => "bvsub",
            BvMul => "bvmul",
            BvUdiv => "bvudiv",
            BvSdiv => "bvsdiv",
            BvUrem => "bvurem",
            BvSrem => "bvsrem",
            BvSmod => "bvsmod",
            BvAnd => "bvand",
            BvOr => "bvor",
            BvXor => "bvxor",
            BvNand => "bvnand",
            BvNor => "bvnor",
            BvXnor => "bvxnor",
            BvShl => "bvshl",
            BvLshr => "bvlshr",
            BvAshr => "bvashr",
            BvRol => "bvrol",
            BvRor => "bvror",
            BvNeg => "bvneg",
            BvNot => "bvnot",
            BvUlt => "bvult",
            BvUle => "bvule",
            BvUgt => "bvugt",
            BvUge => "bvuge",
            BvSlt => "bvslt",
            BvSle => "bvsle",
            BvSgt => "bvsgt",
            BvSge => "bvsge",
            Equal => "equal",
            Distinct => "distinct",
            Concat => "concat",
            Extract => "extract",
            Zx => "zx",
            Sx => "sx",
            Ite => "ite",
            Land => "land",
            Lor => "lor",
            Lnot => "lnot",
            Bv => "bv",
            Decimal => "decimal",
            String => "string",
            Variable => "variable",
            Let => "let",
            Reference => "reference",
        }
    }

    /// Two-operand kinds dispatched through the adapter's binary table.
    pub fn is_binary_op(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            BvAdd
                | BvSub
                | BvMul
                | BvUdiv
                | BvSdiv
                | BvUrem
                | BvSrem
                | BvSmod
                | BvAnd
                | BvOr
                | BvXor
                | BvNand
                | BvNor
                | BvXnor
                | BvShl
                | BvLshr
                | BvAshr
                | BvUlt
                | BvUle
                | BvUgt
                | BvUge
                | BvSlt
                | BvSle
                | BvSgt
                | BvSge
                | Equal
        )
    }

    /// Kinds whose operand order does not affect the structural hash.
    pub fn is_commutative(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            BvAdd
                | BvMul
                | BvAnd
                | BvOr
                | BvXor
                | BvNand
                | BvNor
                | BvXnor
                | Equal
                | Distinct
                | Land
                | Lor
        )
    }
}

impl core::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// The sort a node produces.
///
/// `Int` is carried only by `DECIMAL` parameter numerals and `Symbol` only by
/// `STRING` leaves; neither ever appears as a bit-vector operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, dm::Display)]
pub enum Sort {
    #[display("Bool")]
    Bool,
    #[display("BitVec({_0})")]
    Bv(u32),
    #[display("Int")]
    Int,
    #[display("Symbol")]
    Symbol,
}

impl Sort {
    /// Width in bits; 1 for booleans, 0 for parameter-only sorts.
    pub fn bitwidth(&self) -> u32 {
        match self {
            Sort::Bool => 1,
            Sort::Bv(width) => *width,
            Sort::Int | Sort::Symbol => 0,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }

    pub fn is_bv(&self) -> bool {
        matches!(self, Sort::Bv(_))
    }
}

/// A symbolic variable as seen by the AST: identity, display name and width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub size: u32,
}

/// Kind-specific constant payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    /// `DECIMAL` parameter value, or a `BV` literal already reduced mod 2^w.
    Value(BigUint),
    /// `STRING` symbol name.
    Name(String),
    Variable(Variable),
    /// Expression id resolved through the store at traversal time.
    Reference(ExprId),
}

/// One node of the expression DAG.
///
/// Nodes are created through [`AstBuilder`] and owned by an [`AstArena`];
/// everything here is immutable after construction, including the cached
/// structural hash and the symbolic flag.
#[derive(Debug, Clone)]
pub struct AstNode {
    kind: NodeKind,
    sort: Sort,
    children: Vec<NodeRef>,
    payload: Payload,
    hash: Hash512,
    symbolic: bool,
}

impl AstNode {
    pub(crate) fn new(
        kind: NodeKind,
        sort: Sort,
        children: Vec<NodeRef>,
        payload: Payload,
        hash: Hash512,
        symbolic: bool,
    ) -> Self {
        Self {
            kind,
            sort,
            children,
            payload,
            hash,
            symbolic,
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn sort(&self) -> Sort {
        self.sort
    }

    /// Ordered child handles. `REFERENCE` nodes have none; their target is a
    /// logical edge resolved only by the translator.
    #[inline]
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    #[inline]
    pub fn bitwidth(&self) -> u32 {
        self.sort.bitwidth()
    }

    /// Structural fingerprint, cached at construction.
    #[inline]
    pub fn hash(&self) -> &Hash512 {
        &self.hash
    }

    /// Whether a `VARIABLE` occurs anywhere beneath this node, looking through
    /// the referenced root for `REFERENCE` nodes as of build time.
    #[inline]
    pub fn is_symbolic(&self) -> bool {
        self.symbolic
    }

    /// Concrete value of a constant leaf (`BV`, `DECIMAL`); `None` otherwise.
    pub fn evaluate(&self) -> Option<BigUint> {
        match (self.kind, &self.payload) {
            (NodeKind::Bv | NodeKind::Decimal, Payload::Value(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn decimal_value(&self) -> Option<&BigUint> {
        match (&self.kind, &self.payload) {
            (NodeKind::Decimal | NodeKind::Bv, Payload::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn variable(&self) -> Option<&Variable> {
        match &self.payload {
            Payload::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn reference_id(&self) -> Option<ExprId> {
        match &self.payload {
            Payload::Reference(id) => Some(*id),
            _ => None,
        }
    }
}
