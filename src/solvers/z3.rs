//! Z3 implementation of the solver adapter.

use num_bigint::BigUint;
use z3::{
    ast::{self, Ast, Dynamic},
    Context,
};

use super::{AdapterError, SolverAdapter};
use crate::ast::NodeKind;

pub struct Z3Adapter<'ctx> {
    context: &'ctx Context,
}

impl<'ctx> Z3Adapter<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'ctx Context {
        self.context
    }

    /// Simplifies and reads back a bit-vector handle as an integer.
    ///
    /// Only meaningful when the handle denotes a constant expression; used by
    /// round-trip checks on lowered literals.
    pub fn read_bv(&self, handle: &Dynamic<'ctx>) -> Option<u128> {
        handle.simplify().as_bv()?.as_u128()
    }

    /// Simplifies and reads back a boolean handle.
    pub fn read_bool(&self, handle: &Dynamic<'ctx>) -> Option<bool> {
        handle.simplify().as_bool()?.as_bool()
    }

    /// Width of a bit-vector handle.
    pub fn width_of(&self, handle: &Dynamic<'ctx>) -> Option<u32> {
        handle.as_bv().map(|bv| bv.get_size())
    }

    fn bv(&self, kind: NodeKind, handle: &Dynamic<'ctx>) -> Result<ast::BV<'ctx>, AdapterError> {
        handle.as_bv().ok_or(AdapterError::Sort {
            operator: kind,
            expected: "bit-vector",
        })
    }

    fn boolean(
        &self,
        kind: NodeKind,
        handle: &Dynamic<'ctx>,
    ) -> Result<ast::Bool<'ctx>, AdapterError> {
        handle.as_bool().ok_or(AdapterError::Sort {
            operator: kind,
            expected: "boolean",
        })
    }
}

impl<'ctx> SolverAdapter for Z3Adapter<'ctx> {
    type Handle = Dynamic<'ctx>;

    fn bv_numeral(&mut self, value: &BigUint, size: u32) -> Result<Self::Handle, AdapterError> {
        let repr = value.to_str_radix(10);
        ast::BV::from_str(self.context, size, &repr)
            .map(|bv| Dynamic::from_ast(&bv))
            .ok_or(AdapterError::Numeral(repr))
    }

    fn int_numeral(&mut self, value: &BigUint) -> Result<Self::Handle, AdapterError> {
        let repr = value.to_str_radix(10);
        ast::Int::from_str(self.context, &repr)
            .map(|int| Dynamic::from_ast(&int))
            .ok_or(AdapterError::Numeral(repr))
    }

    fn bv_constant(&mut self, name: &str, size: u32) -> Result<Self::Handle, AdapterError> {
        Ok(Dynamic::from_ast(&ast::BV::new_const(
            self.context,
            name,
            size,
        )))
    }

    fn binary_op(
        &mut self,
        kind: NodeKind,
        lhs: &Self::Handle,
        rhs: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        use NodeKind::*;
        let left = self.bv(kind, lhs)?;
        let right = self.bv(kind, rhs)?;
        let bv_fn: Option<fn(&ast::BV<'ctx>, &ast::BV<'ctx>) -> ast::BV<'ctx>> = match kind {
            BvAdd => Some(ast::BV::bvadd),
            BvSub => Some(ast::BV::bvsub),
            BvMul => Some(ast::BV::bvmul),
            BvUdiv => Some(ast::BV::bvudiv),
            BvSdiv => Some(ast::BV::bvsdiv),
            BvUrem => Some(ast::BV::bvurem),
            BvSrem => Some(ast::BV::bvsrem),
            BvSmod => Some(ast::BV::bvsmod),
            BvAnd => Some(ast::BV::bvand),
            BvOr => Some(ast::BV::bvor),
            BvXor => Some(ast::BV::bvxor),
            BvNand => Some(ast::BV::bvnand),
            BvNor => Some(ast::BV::bvnor),
            BvXnor => Some(ast::BV::bvxnor),
            BvShl => Some(ast::BV::bvshl),
            BvLshr => Some(ast::BV::bvlshr),
            BvAshr => Some(ast::BV::bvashr),
            _ => None,
        };
        if let Some(f) = bv_fn {
            return Ok(Dynamic::from_ast(&f(&left, &right)));
        }
        let bool_fn: Option<fn(&ast::BV<'ctx>, &ast::BV<'ctx>) -> ast::Bool<'ctx>> = match kind {
            BvUlt => Some(ast::BV::bvult),
            BvUle => Some(ast::BV::bvule),
            BvUgt => Some(ast::BV::bvugt),
            BvUge => Some(ast::BV::bvuge),
            BvSlt => Some(ast::BV::bvslt),
            BvSle => Some(ast::BV::bvsle),
            BvSgt => Some(ast::BV::bvsgt),
            BvSge => Some(ast::BV::bvsge),
            Equal => Some(ast::BV::_eq),
            _ => None,
        };
        bool_fn
            .map(|f| Dynamic::from_ast(&f(&left, &right)))
            .ok_or(AdapterError::UnsupportedKind(kind))
    }

    fn unary_op(
        &mut self,
        kind: NodeKind,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let bv = self.bv(kind, operand)?;
        match kind {
            NodeKind::BvNeg => Ok(Dynamic::from_ast(&bv.bvneg())),
            NodeKind::BvNot => Ok(Dynamic::from_ast(&bv.bvnot())),
            _ => Err(AdapterError::UnsupportedKind(kind)),
        }
    }

    fn rotate(
        &mut self,
        kind: NodeKind,
        amount: u32,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let bv = self.bv(kind, operand)?;
        let amount = ast::BV::from_u64(self.context, u64::from(amount), bv.get_size());
        match kind {
            NodeKind::BvRol => Ok(Dynamic::from_ast(&bv.bvrotl(&amount))),
            NodeKind::BvRor => Ok(Dynamic::from_ast(&bv.bvrotr(&amount))),
            _ => Err(AdapterError::UnsupportedKind(kind)),
        }
    }

    fn extend(
        &mut self,
        kind: NodeKind,
        bits: u32,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let bv = self.bv(kind, operand)?;
        match kind {
            NodeKind::Zx => Ok(Dynamic::from_ast(&bv.zero_ext(bits))),
            NodeKind::Sx => Ok(Dynamic::from_ast(&bv.sign_ext(bits))),
            _ => Err(AdapterError::UnsupportedKind(kind)),
        }
    }

    fn extract(
        &mut self,
        hi: u32,
        lo: u32,
        operand: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let bv = self.bv(NodeKind::Extract, operand)?;
        Ok(Dynamic::from_ast(&bv.extract(hi, lo)))
    }

    fn concat(
        &mut self,
        hi: &Self::Handle,
        lo: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let left = self.bv(NodeKind::Concat, hi)?;
        let right = self.bv(NodeKind::Concat, lo)?;
        Ok(Dynamic::from_ast(&left.concat(&right)))
    }

    fn distinct(
        &mut self,
        lhs: &Self::Handle,
        rhs: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let left = self.bv(NodeKind::Distinct, lhs)?;
        let right = self.bv(NodeKind::Distinct, rhs)?;
        Ok(Dynamic::from_ast(&left._eq(&right).not()))
    }

    fn ite(
        &mut self,
        cond: &Self::Handle,
        then: &Self::Handle,
        otherwise: &Self::Handle,
    ) -> Result<Self::Handle, AdapterError> {
        let cond = self.boolean(NodeKind::Ite, cond)?;
        Ok(cond.ite(then, otherwise))
    }

    fn and(&mut self, lhs: &Self::Handle, rhs: &Self::Handle) -> Result<Self::Handle, AdapterError> {
        let left = self.boolean(NodeKind::Land, lhs)?;
        let right = self.boolean(NodeKind::Land, rhs)?;
        Ok(Dynamic::from_ast(&ast::Bool::and(
            self.context,
            &[&left, &right],
        )))
    }

    fn or(&mut self, lhs: &Self::Handle, rhs: &Self::Handle) -> Result<Self::Handle, AdapterError> {
        let left = self.boolean(NodeKind::Lor, lhs)?;
        let right = self.boolean(NodeKind::Lor, rhs)?;
        Ok(Dynamic::from_ast(&ast::Bool::or(
            self.context,
            &[&left, &right],
        )))
    }

    fn not(&mut self, operand: &Self::Handle) -> Result<Self::Handle, AdapterError> {
        let value = self.boolean(NodeKind::Lnot, operand)?;
        Ok(Dynamic::from_ast(&value.not()))
    }

    fn is_bool(&self, handle: &Self::Handle) -> bool {
        handle.as_bool().is_some()
    }
}

pub trait BVExt {
    fn as_u128(&self) -> Option<u128>;
}

impl<'ctx> BVExt for ast::BV<'ctx> {
    fn as_u128(&self) -> Option<u128> {
        if self.get_size() <= 128 {
            unsafe {
                use std::ffi::CStr;
                Some(z3_sys::Z3_get_numeral_string(
                    self.get_ctx().get_z3_context(),
                    self.get_z3_ast(),
                ))
                .filter(|x| !x.is_null())
                .map(|x| CStr::from_ptr(x))
                .and_then(|s| s.to_str().ok())
                .and_then(|s| u128::from_str_radix(s, 10).ok())
            }
        } else {
            None
        }
    }
}
