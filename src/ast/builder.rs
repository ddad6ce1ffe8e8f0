//! Convenience constructors for every node kind.
//!
//! Each constructor validates its operands, computes the sort and the cached
//! structural hash, records the node with the arena and returns its handle.
//! Composition always goes through here; the arena never sees a node that was
//! not built by one of these methods.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};

use super::hash::fingerprint;
use super::{AstArena, AstNode, NodeKind, NodeRef, Payload, Sort, Variable};
use crate::error::{malformed_error, AstError, Result};
use crate::store::{ExprId, VarId};

pub struct AstBuilder<'a> {
    arena: &'a mut AstArena,
}

macro_rules! binary_bv_constructors {
    ($(($method:ident, $kind:ident)),+ $(,)?) => {
        $(
            pub fn $method(&mut self, lhs: NodeRef, rhs: NodeRef) -> Result<NodeRef> {
                self.binary_bv(NodeKind::$kind, lhs, rhs)
            }
        )+
    };
}

macro_rules! comparison_constructors {
    ($(($method:ident, $kind:ident)),+ $(,)?) => {
        $(
            pub fn $method(&mut self, lhs: NodeRef, rhs: NodeRef) -> Result<NodeRef> {
                self.comparison(NodeKind::$kind, lhs, rhs)
            }
        )+
    };
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a mut AstArena) -> Self {
        Self { arena }
    }

    pub fn arena(&self) -> &AstArena {
        self.arena
    }

    binary_bv_constructors![
        (bvadd, BvAdd),
        (bvsub, BvSub),
        (bvmul, BvMul),
        (bvudiv, BvUdiv),
        (bvsdiv, BvSdiv),
        (bvurem, BvUrem),
        (bvsrem, BvSrem),
        (bvsmod, BvSmod),
        (bvand, BvAnd),
        (bvor, BvOr),
        (bvxor, BvXor),
        (bvnand, BvNand),
        (bvnor, BvNor),
        (bvxnor, BvXnor),
        (bvshl, BvShl),
        (bvlshr, BvLshr),
        (bvashr, BvAshr),
    ];

    comparison_constructors![
        (bvult, BvUlt),
        (bvule, BvUle),
        (bvugt, BvUgt),
        (bvuge, BvUge),
        (bvslt, BvSlt),
        (bvsle, BvSle),
        (bvsgt, BvSgt),
        (bvsge, BvSge),
        (equal, Equal),
        (distinct, Distinct),
    ];

    pub fn bvneg(&mut self, operand: NodeRef) -> Result<NodeRef> {
        self.unary_bv(NodeKind::BvNeg, operand)
    }

    pub fn bvnot(&mut self, operand: NodeRef) -> Result<NodeRef> {
        self.unary_bv(NodeKind::BvNot, operand)
    }

    /// `amount` must be a `DECIMAL` node.
    pub fn bvrol(&mut self, amount: NodeRef, value: NodeRef) -> Result<NodeRef> {
        self.rotate(NodeKind::BvRol, amount, value)
    }

    /// `amount` must be a `DECIMAL` node.
    pub fn bvror(&mut self, amount: NodeRef, value: NodeRef) -> Result<NodeRef> {
        self.rotate(NodeKind::BvRor, amount, value)
    }

    /// Bit-vector literal; the value is reduced mod 2^size.
    pub fn bv(&mut self, value: impl Into<BigUint>, size: u32) -> Result<NodeRef> {
        if size == 0 {
            return Err(malformed_error!("bv literal needs a positive width"));
        }
        let mask = (BigUint::one() << size) - BigUint::one();
        let value = value.into() & mask;
        Ok(self.mk(
            NodeKind::Bv,
            Sort::Bv(size),
            Vec::new(),
            Payload::Value(value),
            false,
        ))
    }

    /// Arbitrary-precision parameter numeral; never a bit-vector operand.
    pub fn decimal(&mut self, value: impl Into<BigUint>) -> Result<NodeRef> {
        Ok(self.mk(
            NodeKind::Decimal,
            Sort::Int,
            Vec::new(),
            Payload::Value(value.into()),
            false,
        ))
    }

    /// Symbol leaf for `LET` bindings.
    pub fn string(&mut self, name: &str) -> Result<NodeRef> {
        Ok(self.mk(
            NodeKind::String,
            Sort::Symbol,
            Vec::new(),
            Payload::Name(name.to_owned()),
            false,
        ))
    }

    /// Fresh symbolic variable, indexed by name in the arena.
    ///
    /// Fails with `Duplicate` before anything is allocated, so a rejected call
    /// leaves the arena untouched.
    pub fn variable(&mut self, id: VarId, name: &str, size: u32) -> Result<NodeRef> {
        if size == 0 {
            return Err(malformed_error!("variable `{}` needs a positive width", name));
        }
        if self.arena.get_variable(name).is_some() {
            return Err(AstError::Duplicate(name.to_owned()));
        }
        let node = self.mk(
            NodeKind::Variable,
            Sort::Bv(size),
            Vec::new(),
            Payload::Variable(Variable {
                id,
                name: name.to_owned(),
                size,
            }),
            true,
        );
        self.arena.record_variable(name, node)?;
        Ok(node)
    }

    /// Alias of the root of the stored expression `id`.
    ///
    /// `root` must be the store's current root for `id`; its sort and symbolic
    /// flag are copied onto the alias. The edge itself stays logical: the
    /// children list is empty and only the translator resolves it.
    pub fn reference(&mut self, id: ExprId, root: NodeRef) -> Result<NodeRef> {
        let target = self.node(root)?;
        let sort = target.sort();
        let symbolic = target.is_symbolic();
        Ok(self.mk(
            NodeKind::Reference,
            sort,
            Vec::new(),
            Payload::Reference(id),
            symbolic,
        ))
    }

    /// `concat(parts)` with `parts[0]` as the most-significant segment.
    pub fn concat(&mut self, parts: &[NodeRef]) -> Result<NodeRef> {
        if parts.len() < 2 {
            return Err(malformed_error!(
                "concat takes at least two operands, got {}",
                parts.len()
            ));
        }
        let mut width = 0u32;
        for &part in parts {
            width += self.bv_width(NodeKind::Concat, part)?;
        }
        Ok(self.mk(
            NodeKind::Concat,
            Sort::Bv(width),
            parts.to_vec(),
            Payload::None,
            false,
        ))
    }

    /// `extract(hi, lo, value)`; `hi` and `lo` must be `DECIMAL` nodes with
    /// `lo <= hi < width(value)`.
    pub fn extract(&mut self, hi: NodeRef, lo: NodeRef, value: NodeRef) -> Result<NodeRef> {
        let high = self.decimal_u32(NodeKind::Extract, hi)?;
        let low = self.decimal_u32(NodeKind::Extract, lo)?;
        let width = self.bv_width(NodeKind::Extract, value)?;
        if low > high {
            return Err(malformed_error!(
                "extract bounds are inverted: hi={} lo={}",
                high,
                low
            ));
        }
        if high >= width {
            return Err(malformed_error!(
                "extract hi={} exceeds the operand width {}",
                high,
                width
            ));
        }
        Ok(self.mk(
            NodeKind::Extract,
            Sort::Bv(high - low + 1),
            vec![hi, lo, value],
            Payload::None,
            false,
        ))
    }

    /// Zero extension by exactly `ext` bits; `ext` must be a `DECIMAL` node.
    pub fn zx(&mut self, ext: NodeRef, value: NodeRef) -> Result<NodeRef> {
        self.extension(NodeKind::Zx, ext, value)
    }

    /// Sign extension by exactly `ext` bits; `ext` must be a `DECIMAL` node.
    pub fn sx(&mut self, ext: NodeRef, value: NodeRef) -> Result<NodeRef> {
        self.extension(NodeKind::Sx, ext, value)
    }

    pub fn ite(&mut self, cond: NodeRef, then: NodeRef, otherwise: NodeRef) -> Result<NodeRef> {
        let cond_sort = self.node(cond)?.sort();
        if !cond_sort.is_bool() {
            return Err(AstError::TypeMismatch {
                operator: NodeKind::Ite,
                found: cond_sort,
            });
        }
        let then_sort = self.node(then)?.sort();
        let else_sort = self.node(otherwise)?.sort();
        if then_sort != else_sort {
            return Err(malformed_error!(
                "ite arms disagree: {} vs {}",
                then_sort,
                else_sort
            ));
        }
        Ok(self.mk(
            NodeKind::Ite,
            then_sort,
            vec![cond, then, otherwise],
            Payload::None,
            false,
        ))
    }

    pub fn land(&mut self, operands: &[NodeRef]) -> Result<NodeRef> {
        self.connective(NodeKind::Land, operands)
    }

    pub fn lor(&mut self, operands: &[NodeRef]) -> Result<NodeRef> {
        self.connective(NodeKind::Lor, operands)
    }

    pub fn lnot(&mut self, operand: NodeRef) -> Result<NodeRef> {
        let sort = self.node(operand)?.sort();
        if !sort.is_bool() {
            return Err(AstError::TypeMismatch {
                operator: NodeKind::Lnot,
                found: sort,
            });
        }
        Ok(self.mk(
            NodeKind::Lnot,
            Sort::Bool,
            vec![operand],
            Payload::None,
            false,
        ))
    }

    /// `let name = bound in body`; `name` must be a `STRING` node.
    pub fn let_binding(&mut self, name: NodeRef, bound: NodeRef, body: NodeRef) -> Result<NodeRef> {
        if self.node(name)?.kind() != NodeKind::String {
            return Err(malformed_error!(
                "let expects a string node as its binder, got {}",
                self.node(name)?.kind()
            ));
        }
        self.node(bound)?;
        let body_sort = self.node(body)?.sort();
        Ok(self.mk(
            NodeKind::Let,
            body_sort,
            vec![name, bound, body],
            Payload::None,
            false,
        ))
    }

    fn binary_bv(&mut self, kind: NodeKind, lhs: NodeRef, rhs: NodeRef) -> Result<NodeRef> {
        let width = self.matching_widths(kind, lhs, rhs)?;
        Ok(self.mk(kind, Sort::Bv(width), vec![lhs, rhs], Payload::None, false))
    }

    fn comparison(&mut self, kind: NodeKind, lhs: NodeRef, rhs: NodeRef) -> Result<NodeRef> {
        self.matching_widths(kind, lhs, rhs)?;
        Ok(self.mk(kind, Sort::Bool, vec![lhs, rhs], Payload::None, false))
    }

    fn unary_bv(&mut self, kind: NodeKind, operand: NodeRef) -> Result<NodeRef> {
        let width = self.bv_width(kind, operand)?;
        Ok(self.mk(kind, Sort::Bv(width), vec![operand], Payload::None, false))
    }

    fn rotate(&mut self, kind: NodeKind, amount: NodeRef, value: NodeRef) -> Result<NodeRef> {
        self.decimal_u32(kind, amount)?;
        let width = self.bv_width(kind, value)?;
        Ok(self.mk(
            kind,
            Sort::Bv(width),
            vec![amount, value],
            Payload::None,
            false,
        ))
    }

    fn extension(&mut self, kind: NodeKind, ext: NodeRef, value: NodeRef) -> Result<NodeRef> {
        let bits = self.decimal_u32(kind, ext)?;
        let width = self.bv_width(kind, value)?;
        Ok(self.mk(
            kind,
            Sort::Bv(width + bits),
            vec![ext, value],
            Payload::None,
            false,
        ))
    }

    fn connective(&mut self, kind: NodeKind, operands: &[NodeRef]) -> Result<NodeRef> {
        if operands.len() < 2 {
            return Err(malformed_error!(
                "{} takes at least two operands, got {}",
                kind,
                operands.len()
            ));
        }
        for &operand in operands {
            let sort = self.node(operand)?.sort();
            if !sort.is_bool() {
                return Err(AstError::TypeMismatch {
                    operator: kind,
                    found: sort,
                });
            }
        }
        Ok(self.mk(
            kind,
            Sort::Bool,
            operands.to_vec(),
            Payload::None,
            false,
        ))
    }

    fn node(&self, node: NodeRef) -> Result<&AstNode> {
        self.arena
            .get(node)
            .ok_or(AstError::NullInput("child handle is stale or foreign"))
    }

    fn bv_width(&self, kind: NodeKind, node: NodeRef) -> Result<u32> {
        match self.node(node)?.sort() {
            Sort::Bv(width) => Ok(width),
            sort => Err(malformed_error!(
                "{} expects a bit-vector operand, found {}",
                kind,
                sort
            )),
        }
    }

    fn matching_widths(&self, kind: NodeKind, lhs: NodeRef, rhs: NodeRef) -> Result<u32> {
        let left = self.bv_width(kind, lhs)?;
        let right = self.bv_width(kind, rhs)?;
        if left != right {
            return Err(malformed_error!(
                "{} operand widths disagree: {} vs {}",
                kind,
                left,
                right
            ));
        }
        Ok(left)
    }

    fn decimal_u32(&self, kind: NodeKind, node: NodeRef) -> Result<u32> {
        let data = self.node(node)?;
        if data.kind() != NodeKind::Decimal {
            return Err(malformed_error!(
                "{} expects a decimal parameter, found {}",
                kind,
                data.kind()
            ));
        }
        data.decimal_value()
            .and_then(ToPrimitive::to_u32)
            .ok_or_else(|| malformed_error!("{} parameter does not fit in 32 bits", kind))
    }

    fn mk(
        &mut self,
        kind: NodeKind,
        sort: Sort,
        children: Vec<NodeRef>,
        payload: Payload,
        symbolic: bool,
    ) -> NodeRef {
        let symbolic = symbolic
            || children
                .iter()
                .any(|&child| self.arena.get(child).is_some_and(AstNode::is_symbolic));
        let hash = fingerprint(
            kind,
            sort,
            &payload,
            children
                .iter()
                .filter_map(|&child| self.arena.get(child))
                .map(AstNode::hash),
        );
        self.arena
            .record(AstNode::new(kind, sort, children, payload, hash, symbolic))
    }
}
