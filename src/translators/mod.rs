//! Lowering from the expression DAG to solver handles.
//!
//! The walk is iterative from end to end: symbolic traces routinely produce
//! trees thousands of levels deep, so nothing here recurses on AST depth. A
//! first pass computes a post-order visit sequence with an explicit
//! (node, next-child) frame stack, chasing each `REFERENCE` through the
//! expression store exactly once per visit; a second pass folds the sequence
//! into solver handles behind a memo table, so shared subgraphs are lowered
//! once no matter how many paths reach them.

const TAG: &str = "translators";

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};

use crate::ast::{AstArena, AstNode, Hash512, NodeKind, NodeRef};
use crate::error::{malformed_error, AstError, Result};
use crate::log_debug;
use crate::solvers::SolverAdapter;
use crate::store::{ExpressionStore, VariableEvaluator};

/// How `VARIABLE` leaves are materialized.
#[derive(Clone, Copy)]
pub enum TranslationMode<'a> {
    /// Fresh solver constants named after the variable.
    Symbolic,
    /// Concrete numerals obtained from the evaluator.
    Eval(&'a dyn VariableEvaluator),
}

/// Receives one record per node actually lowered (memo hits are silent).
pub trait TraceSink {
    fn lowered(&mut self, kind: NodeKind, hash: &Hash512, children: usize);
}

/// Iterative post-order lowering of one root per [`AstTranslator::convert`]
/// call.
pub struct AstTranslator<'a, A: SolverAdapter> {
    adapter: &'a mut A,
    arena: &'a AstArena,
    store: &'a dyn ExpressionStore,
    mode: TranslationMode<'a>,
    sink: Option<&'a mut dyn TraceSink>,
}

impl<'a, A: SolverAdapter> AstTranslator<'a, A> {
    pub fn new(adapter: &'a mut A, arena: &'a AstArena, store: &'a dyn ExpressionStore) -> Self {
        Self {
            adapter,
            arena,
            store,
            mode: TranslationMode::Symbolic,
            sink: None,
        }
    }

    pub fn with_mode(mut self, mode: TranslationMode<'a>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sink(mut self, sink: &'a mut dyn TraceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Lowers the DAG rooted at `root` into one solver handle.
    ///
    /// Any error aborts the conversion; the memo and symbol table are local
    /// to the call and discarded with it.
    pub fn convert(&mut self, root: NodeRef) -> Result<A::Handle> {
        let (order, symbols) = self.visit_order(root)?;
        log_debug!(target: TAG, "Lowering a visit sequence of {} entries", order.len());

        let mut memo: HashMap<NodeRef, A::Handle> = HashMap::with_capacity(order.len());
        for node in order {
            if memo.contains_key(&node) {
                continue;
            }
            let data = self.node(node)?;
            let handle = self.lower(data, &memo, &symbols)?;
            if let Some(sink) = self.sink.as_deref_mut() {
                sink.lowered(data.kind(), data.hash(), data.children().len());
            }
            memo.insert(node, handle);
        }
        memo.remove(&root)
            .ok_or(AstError::NullInput("root was never lowered"))
    }

    /// Phase 1: post-order visit sequence plus the `LET` symbol table.
    ///
    /// Frames are (node, next-child-index). A `REFERENCE` frame expands its
    /// store-resolved target exactly once, guarded by the index. A `LET`
    /// frame registers its binding on first expansion and skips the name
    /// child, so the binder is metadata rather than an operand; bindings are
    /// flat per conversion, and a use of a name whose binding is lowered
    /// later in the sequence surfaces as `UnboundSymbol` in phase 2.
    fn visit_order(&self, root: NodeRef) -> Result<(Vec<NodeRef>, HashMap<String, NodeRef>)> {
        let mut order = Vec::new();
        let mut symbols = HashMap::new();
        let mut stack: Vec<(NodeRef, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, index) = *frame;
            let data = self.node(node)?;
            let children = data.children();

            if data.kind() == NodeKind::Let && index == 0 {
                let name = self
                    .node(children[0])?
                    .symbol_name()
                    .ok_or_else(|| malformed_error!("let binder is not a string node"))?;
                symbols.insert(name.to_owned(), children[1]);
                frame.1 = 1;
                continue;
            }

            if index < children.len() {
                frame.1 = index + 1;
                stack.push((children[index], 0));
            } else if data.kind() == NodeKind::Reference && index == 0 {
                frame.1 = index + 1;
                let target = self.resolve_reference(data)?;
                stack.push((target, 0));
            } else {
                order.push(node);
                stack.pop();
            }
        }
        Ok((order, symbols))
    }

    /// Phase 2 dispatch for a single node, all children already in `memo`.
    fn lower(
        &mut self,
        data: &AstNode,
        memo: &HashMap<NodeRef, A::Handle>,
        symbols: &HashMap<String, NodeRef>,
    ) -> Result<A::Handle> {
        use NodeKind::*;
        let kind = data.kind();
        let children = data.children();

        match kind {
            _ if kind.is_binary_op() => {
                let lhs = self.lowered(memo, kind, children[0])?;
                let rhs = self.lowered(memo, kind, children[1])?;
                Ok(self.adapter.binary_op(kind, lhs, rhs)?)
            }
            BvNeg | BvNot => {
                let operand = self.lowered(memo, kind, children[0])?;
                Ok(self.adapter.unary_op(kind, operand)?)
            }
            BvRol | BvRor => {
                let amount = self.decimal_u32(children[0])?;
                let operand = self.lowered(memo, kind, children[1])?;
                Ok(self.adapter.rotate(kind, amount, operand)?)
            }
            Bv => {
                let value = data
                    .decimal_value()
                    .ok_or(AstError::UnknownKind(kind))?;
                Ok(self.adapter.bv_numeral(value, data.bitwidth())?)
            }
            Decimal => {
                let value = data
                    .decimal_value()
                    .ok_or(AstError::UnknownKind(kind))?;
                Ok(self.adapter.int_numeral(value)?)
            }
            Concat => {
                let mut current = self.lowered(memo, kind, children[0])?.clone();
                for &child in &children[1..] {
                    let next = self.lowered(memo, kind, child)?;
                    current = self.adapter.concat(&current, next)?;
                }
                Ok(current)
            }
            Distinct => {
                let lhs = self.lowered(memo, kind, children[0])?;
                let rhs = self.lowered(memo, kind, children[1])?;
                Ok(self.adapter.distinct(lhs, rhs)?)
            }
            Extract => {
                let hi = self.decimal_u32(children[0])?;
                let lo = self.decimal_u32(children[1])?;
                let operand = self.lowered(memo, kind, children[2])?;
                Ok(self.adapter.extract(hi, lo, operand)?)
            }
            Ite => {
                let cond = self.lowered(memo, kind, children[0])?;
                let then = self.lowered(memo, kind, children[1])?;
                let otherwise = self.lowered(memo, kind, children[2])?;
                Ok(self.adapter.ite(cond, then, otherwise)?)
            }
            Land | Lor => {
                let mut current = self.boolean_operand(memo, kind, children[0])?.clone();
                for &child in &children[1..] {
                    let next = self.boolean_operand(memo, kind, child)?;
                    current = match kind {
                        Land => self.adapter.and(&current, next)?,
                        _ => self.adapter.or(&current, next)?,
                    };
                }
                Ok(current)
            }
            Lnot => {
                let operand = self.boolean_operand(memo, kind, children[0])?;
                Ok(self.adapter.not(operand)?)
            }
            Zx | Sx => {
                let bits = self.decimal_u32(children[0])?;
                let operand = self.lowered(memo, kind, children[1])?;
                Ok(self.adapter.extend(kind, bits, operand)?)
            }
            Let => Ok(self.lowered(memo, kind, children[2])?.clone()),
            String => {
                let name = data.symbol_name().ok_or(AstError::UnknownKind(kind))?;
                let bound = symbols
                    .get(name)
                    .copied()
                    .ok_or_else(|| AstError::UnboundSymbol(name.to_owned()))?;
                memo.get(&bound)
                    .cloned()
                    .ok_or_else(|| AstError::UnboundSymbol(name.to_owned()))
            }
            Reference => {
                let target = self.resolve_reference(data)?;
                memo.get(&target)
                    .cloned()
                    .ok_or(AstError::UnknownKind(kind))
            }
            Variable => {
                let var = data.variable().ok_or(AstError::UnknownKind(kind))?;
                match self.mode {
                    TranslationMode::Eval(evaluator) => {
                        let value = evaluator
                            .evaluate(var.id)
                            .ok_or(AstError::NullInput("variable has no concrete value"))?;
                        let mask = (BigUint::one() << var.size) - BigUint::one();
                        Ok(self.adapter.bv_numeral(&(value & mask), var.size)?)
                    }
                    TranslationMode::Symbolic => {
                        Ok(self.adapter.bv_constant(&var.name, var.size)?)
                    }
                }
            }
            _ => Err(AstError::UnknownKind(kind)),
        }
    }

    fn node(&self, node: NodeRef) -> Result<&'a AstNode> {
        self.arena
            .get(node)
            .ok_or(AstError::NullInput("node handle is stale or foreign"))
    }

    fn resolve_reference(&self, data: &AstNode) -> Result<NodeRef> {
        let id = data
            .reference_id()
            .ok_or(AstError::UnknownKind(NodeKind::Reference))?;
        self.store
            .get_ast(id)
            .ok_or(AstError::NullInput("reference target is absent from the store"))
    }

    fn lowered<'m>(
        &self,
        memo: &'m HashMap<NodeRef, A::Handle>,
        kind: NodeKind,
        child: NodeRef,
    ) -> Result<&'m A::Handle> {
        memo.get(&child).ok_or(AstError::UnknownKind(kind))
    }

    fn boolean_operand<'m>(
        &self,
        memo: &'m HashMap<NodeRef, A::Handle>,
        kind: NodeKind,
        child: NodeRef,
    ) -> Result<&'m A::Handle> {
        let handle = self.lowered(memo, kind, child)?;
        if !self.adapter.is_bool(handle) {
            return Err(AstError::TypeMismatch {
                operator: kind,
                found: self.node(child)?.sort(),
            });
        }
        Ok(handle)
    }

    fn decimal_u32(&self, node: NodeRef) -> Result<u32> {
        let data = self.node(node)?;
        if data.kind() != NodeKind::Decimal {
            return Err(malformed_error!(
                "expected a decimal parameter, found {}",
                data.kind()
            ));
        }
        data.decimal_value()
            .and_then(ToPrimitive::to_u32)
            .ok_or_else(|| malformed_error!("decimal parameter does not fit in 32 bits"))
    }
}
