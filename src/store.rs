//! External collaborators of the AST core.
//!
//! The core never owns symbolic expressions or concrete variable values; it
//! reaches them through these read-only traits. [`TableStore`] is the
//! in-memory implementation used by tests and by embedders without a store of
//! their own.

use std::collections::HashMap;

use derive_more as dm;
use num_bigint::BigUint;

use crate::ast::NodeRef;

/// Identity of a stored symbolic expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, dm::Display, dm::From)]
#[display("expr#{_0}")]
pub struct ExprId(pub u64);

/// Identity of a symbolic variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, dm::Display, dm::From)]
#[display("var#{_0}")]
pub struct VarId(pub u64);

/// Resolves `REFERENCE` nodes to the root of the expression they alias.
///
/// Returning `None` for a live id is a contract violation and surfaces from
/// the translator as `NullInput`.
pub trait ExpressionStore {
    fn get_ast(&self, id: ExprId) -> Option<NodeRef>;
}

/// Concretizes variables when the translator runs in eval mode.
pub trait VariableEvaluator {
    fn evaluate(&self, id: VarId) -> Option<BigUint>;
}

/// HashMap-backed expression store and variable evaluator.
#[derive(Debug, Default)]
pub struct TableStore {
    asts: HashMap<ExprId, NodeRef>,
    values: HashMap<VarId, BigUint>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds (or rebinds) the root of expression `id`.
    pub fn bind_ast(&mut self, id: ExprId, root: NodeRef) {
        self.asts.insert(id, root);
    }

    /// Binds (or rebinds) the concrete value of variable `id`.
    pub fn bind_value(&mut self, id: VarId, value: impl Into<BigUint>) {
        self.values.insert(id, value.into());
    }
}

impl ExpressionStore for TableStore {
    fn get_ast(&self, id: ExprId) -> Option<NodeRef> {
        self.asts.get(&id).copied()
    }
}

impl VariableEvaluator for TableStore {
    fn evaluate(&self, id: VarId) -> Option<BigUint> {
        self.values.get(&id).cloned()
    }
}
