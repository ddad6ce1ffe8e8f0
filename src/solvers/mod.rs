//! The boundary between the AST core and concrete SMT solvers.
//!
//! The translator speaks only this trait; solver-specific types never cross
//! it. Dispatch stays keyed by [`NodeKind`] the way the original lowering
//! tables were, so an adapter is a flat catalogue of operator applications
//! plus numeral and constant creation.

pub mod z3;

use num_bigint::BigUint;
use thiserror::Error;

use crate::ast::NodeKind;

/// Failure inside a solver adapter, propagated unchanged by the translator.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter was handed an operator kind outside its tables.
    #[error("operator {0} is not supported by this solver")]
    UnsupportedKind(NodeKind),

    /// A numeral could not be materialized solver-side.
    #[error("numeral `{0}` cannot be materialized")]
    Numeral(String),

    /// A handle had the wrong solver-side sort for the operator.
    #[error("{operator} expects a {expected} handle")]
    Sort {
        operator: NodeKind,
        expected: &'static str,
    },
}

/// Narrow capability set over an external SMT library.
pub trait SolverAdapter {
    /// Opaque solver-side expression.
    type Handle: Clone;

    /// Bit-vector numeral of the given width.
    fn bv_numeral(&mut self, value: &BigUint, size: u32) -> Result<Self::Handle, AdapterError>;

    /// Integer numeral, consumable only by parameter positions.
    fn int_numeral(&mut self, value: &BigUint) -> Result<Self::Handle, AdapterError>;

    /// Fresh bit-vector constant named after a variable.
    fn bv_constant(&mut self, name: &str, size: u32) -> Result<Self::Handle, AdapterError>;

    /// Applies one of the two-operand kinds (`NodeKind::is_binary_op`).
    fn binary_op(
        &mut self,
        kind: NodeKind,
        lhs: &Self::Handle,
        rhs: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError>;

    /// Applies `BVNEG` or `BVNOT`.
    fn unary_op(&mut self, kind: NodeKind, operand: &Self::Handle)
        -> Result<Self::Handle, AdapterError>;

    /// Applies `BVROL` or `BVROR` by a constant amount.
    fn rotate(
        &mut self,
        kind: NodeKind,
        amount: u32,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError>;

    /// Applies `ZX` or `SX`, widening by `bits`.
    fn extend(
        &mut self,
        kind: NodeKind,
        bits: u32,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError>;

    fn extract(
        &mut self,
        hi: u32,
        lo: u32,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError>;

    /// One concatenation step; `hi` supplies the most-significant bits.
    fn concat(&mut self, hi: &Self::Handle, lo: &Self::Handle)
        -> Result<Self::Handle, AdapterError>;

    fn distinct(
        &mut self,
        lhs: &Self::Handle,
        rhs: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError>;

    fn ite(
        &mut self,
        cond: &Self::Handle,
        then: &Self::Handle,
        otherwise: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError>;

    fn and(&mut self, lhs: &Self::Handle, rhs: &Self::Handle)
        -> Result<Self::Handle, AdapterError>;

    fn or(&mut self, lhs: &Self::Handle, rhs: &Self::Handle)
        -> Result<Self::Handle, AdapterError>;

    fn not(&mut self, operand: &Self::Handle) -> Result<Self::Handle, AdapterError>;

    /// Whether the handle has boolean sort solver-side.
    fn is_bool(&self, handle: &Self::Handle) -> bool;
}
