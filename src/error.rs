use thiserror::Error;

use crate::ast::{NodeKind, Sort};
use crate::solvers::AdapterError;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        $crate::error::AstError::Malformed {
            message: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::AstError::Malformed {
            message: format!($fmt, $($arg)*),
        }
    };
}

pub(crate) use malformed_error;

/// Errors surfaced by the AST core.
///
/// Builder constructors report structural problems (`Malformed`,
/// `TypeMismatch`, `Duplicate`); the translator additionally reports
/// `UnboundSymbol`, `NullInput` and adapter failures. `UnknownKind` guards
/// internal dispatch and is not expected to be observable from safe usage.
#[derive(Debug, Error)]
pub enum AstError {
    /// Arity or width violation while building or lowering a node.
    #[error("malformed node: {message}")]
    Malformed { message: String },

    /// A variable with this name is already registered in the arena.
    #[error("variable `{0}` is already registered")]
    Duplicate(String),

    /// A `STRING` leaf was used outside any `LET` binding for its name.
    #[error("symbol `{0}` is not bound by any enclosing let")]
    UnboundSymbol(String),

    /// A boolean operator was applied to a non-boolean operand.
    #[error("{operator} expects boolean operands, found {found}")]
    TypeMismatch { operator: NodeKind, found: Sort },

    /// Internal dispatch guard; reaching this is a bug in the core.
    #[error("internal translator invariant violated at a {0} node")]
    UnknownKind(NodeKind),

    /// An absent root, a stale handle, or a store lookup that broke the
    /// liveness contract.
    #[error("dangling or absent input: {0}")]
    NullInput(&'static str),

    /// Propagated unchanged from the solver adapter.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

pub type Result<T> = core::result::Result<T, AstError>;
