//! Symbolic-AST core of the Kestrel binary-analysis framework.
//!
//! The crate owns the expression DAG produced during symbolic execution of
//! machine code: a tagged node model over bit-vector and boolean sorts, an
//! arena that tracks ownership of every allocated node (with bulk free,
//! targeted free and snapshot/restore), builder constructors that enforce the
//! arity and width rules of each node kind, and an iterative post-order
//! translator that lowers a DAG into an external SMT solver through a narrow
//! adapter boundary.
//!
//! Instruction-semantics builders, the taint engine and the CPU model are
//! consumers of this API and live elsewhere; the only solver-specific code
//! here is the Z3 adapter in [`solvers::z3`].

pub mod ast;
pub mod error;
pub mod logging;
pub mod solvers;
pub mod store;
pub mod translators;

pub use ast::{
    ArenaSnapshot, AstArena, AstBuilder, AstNode, Hash512, NodeKind, NodeRef, Payload, Sort,
    Variable,
};
pub use error::{AstError, Result};
pub use solvers::{z3::Z3Adapter, AdapterError, SolverAdapter};
pub use store::{ExprId, ExpressionStore, TableStore, VarId, VariableEvaluator};
pub use translators::{AstTranslator, TraceSink, TranslationMode};

// Re-export the solver context types for standalone usage.
pub use z3::{Config, Context};
