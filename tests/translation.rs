use kestrel_ast::{
    AstArena, AstBuilder, AstError, AstTranslator, Config, Context, ExprId, Hash512, NodeKind,
    NodeRef, TableStore, TraceSink, TranslationMode, VarId, Z3Adapter,
};

fn read_bv(arena: &AstArena, store: &TableStore, root: NodeRef) -> Option<u128> {
    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let handle = AstTranslator::new(&mut adapter, arena, store)
        .convert(root)
        .expect("conversion should succeed");
    adapter.read_bv(&handle)
}

fn read_bool(arena: &AstArena, store: &TableStore, root: NodeRef) -> Option<bool> {
    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let handle = AstTranslator::new(&mut adapter, arena, store)
        .convert(root)
        .expect("conversion should succeed");
    adapter.read_bool(&handle)
}

#[test]
fn lowers_addition_of_literals() {
    // S1
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let three = builder.bv(3u8, 8).unwrap();
    let five = builder.bv(5u8, 8).unwrap();
    let sum = builder.bvadd(three, five).unwrap();

    assert_eq!(read_bv(&arena, &TableStore::new(), sum), Some(8));
}

#[test]
fn eval_mode_concretizes_variables() {
    // S2
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let x = builder.variable(VarId(1), "x", 8).unwrap();

    let mut store = TableStore::new();
    store.bind_value(VarId(1), 0x2Au32);

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let handle = AstTranslator::new(&mut adapter, &arena, &store)
        .with_mode(TranslationMode::Eval(&store))
        .convert(x)
        .unwrap();
    assert_eq!(adapter.read_bv(&handle), Some(42));
}

#[test]
fn eval_mode_reaches_through_expressions() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let x = builder.variable(VarId(1), "x", 8).unwrap();
    let five = builder.bv(5u8, 8).unwrap();
    let sum = builder.bvadd(x, five).unwrap();

    let mut store = TableStore::new();
    store.bind_value(VarId(1), 37u32);

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let handle = AstTranslator::new(&mut adapter, &arena, &store)
        .with_mode(TranslationMode::Eval(&store))
        .convert(sum)
        .unwrap();
    assert_eq!(adapter.read_bv(&handle), Some(42));
}

#[test]
fn symbolic_mode_materializes_named_constants() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let x = builder.variable(VarId(1), "x", 8).unwrap();
    let trivial = builder.equal(x, x).unwrap();

    assert_eq!(read_bool(&arena, &TableStore::new(), trivial), Some(true));
}

#[test]
fn concat_puts_the_first_child_in_the_high_bits() {
    // S3
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let hi = builder.bv(0xAAu32, 8).unwrap();
    let lo = builder.bv(0xBBu32, 8).unwrap();
    let both = builder.concat(&[hi, lo]).unwrap();

    assert_eq!(arena.get(both).unwrap().bitwidth(), 16);

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let store = TableStore::new();
    let handle = AstTranslator::new(&mut adapter, &arena, &store)
        .convert(both)
        .unwrap();
    assert_eq!(adapter.width_of(&handle), Some(16));
    assert_eq!(adapter.read_bv(&handle), Some(0xAABB));
}

#[test]
fn extract_reads_its_bounds_from_decimal_children() {
    // S4
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let seven = builder.decimal(7u8).unwrap();
    let zero = builder.decimal(0u8).unwrap();
    let word = builder.bv(0xCAFEu32, 16).unwrap();
    let low_byte = builder.extract(seven, zero, word).unwrap();

    assert_eq!(arena.get(low_byte).unwrap().bitwidth(), 8);
    assert_eq!(read_bv(&arena, &TableStore::new(), low_byte), Some(0xFE));
}

#[test]
fn land_of_a_true_and_a_false_equality_is_false() {
    // S5
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let one = builder.bv(1u8, 8).unwrap();
    let two = builder.bv(2u8, 8).unwrap();
    let three = builder.bv(3u8, 8).unwrap();
    let yes = builder.equal(one, one).unwrap();
    let no = builder.equal(two, three).unwrap();
    let conj = builder.land(&[yes, no]).unwrap();
    let disj = builder.lor(&[yes, no]).unwrap();
    let negated = builder.lnot(yes).unwrap();

    let store = TableStore::new();
    assert_eq!(read_bool(&arena, &store, conj), Some(false));
    assert_eq!(read_bool(&arena, &store, disj), Some(true));
    assert_eq!(read_bool(&arena, &store, negated), Some(false));
}

#[test]
fn comparisons_follow_signedness() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let one = builder.bv(1u8, 8).unwrap();
    let two = builder.bv(2u8, 8).unwrap();
    let minus_one = builder.bv(0xFFu32, 8).unwrap();

    let ult = builder.bvult(one, two).unwrap();
    let slt = builder.bvslt(minus_one, one).unwrap();
    let ugt = builder.bvugt(minus_one, one).unwrap();
    let not_eq = builder.distinct(one, two).unwrap();
    let self_eq = builder.distinct(two, two).unwrap();

    let store = TableStore::new();
    assert_eq!(read_bool(&arena, &store, ult), Some(true));
    assert_eq!(read_bool(&arena, &store, slt), Some(true));
    assert_eq!(read_bool(&arena, &store, ugt), Some(true));
    assert_eq!(read_bool(&arena, &store, not_eq), Some(true));
    assert_eq!(read_bool(&arena, &store, self_eq), Some(false));
}

#[test]
fn arithmetic_and_shift_kinds_lower_correctly() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let six = builder.bv(6u8, 8).unwrap();
    let seven = builder.bv(7u8, 8).unwrap();
    let four = builder.bv(4u8, 8).unwrap();
    let one = builder.bv(1u8, 8).unwrap();
    let zero = builder.bv(0u8, 8).unwrap();

    let product = builder.bvmul(six, seven).unwrap();
    let shifted = builder.bvshl(one, four).unwrap();
    let negated = builder.bvneg(one).unwrap();
    let inverted = builder.bvnot(zero).unwrap();

    let store = TableStore::new();
    assert_eq!(read_bv(&arena, &store, product), Some(42));
    assert_eq!(read_bv(&arena, &store, shifted), Some(0x10));
    assert_eq!(read_bv(&arena, &store, negated), Some(0xFF));
    assert_eq!(read_bv(&arena, &store, inverted), Some(0xFF));
}

#[test]
fn rotations_read_their_amount_from_the_decimal_child() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let amount = builder.decimal(1u8).unwrap();
    let pattern = builder.bv(0x81u32, 8).unwrap();
    let rolled = builder.bvrol(amount, pattern).unwrap();
    let rored = builder.bvror(amount, pattern).unwrap();

    let store = TableStore::new();
    assert_eq!(read_bv(&arena, &store, rolled), Some(0x03));
    assert_eq!(read_bv(&arena, &store, rored), Some(0xC0));
}

#[test]
fn extensions_widen_by_the_requested_bits() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let eight = builder.decimal(8u8).unwrap();
    let byte = builder.bv(0x80u32, 8).unwrap();
    let zero_extended = builder.zx(eight, byte).unwrap();
    let sign_extended = builder.sx(eight, byte).unwrap();

    assert_eq!(arena.get(zero_extended).unwrap().bitwidth(), 16);
    assert_eq!(arena.get(sign_extended).unwrap().bitwidth(), 16);

    let store = TableStore::new();
    assert_eq!(read_bv(&arena, &store, zero_extended), Some(0x0080));
    assert_eq!(read_bv(&arena, &store, sign_extended), Some(0xFF80));
}

#[test]
fn ite_selects_by_its_condition() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let one = builder.bv(1u8, 8).unwrap();
    let two = builder.bv(2u8, 8).unwrap();
    let seven = builder.bv(7u8, 8).unwrap();
    let nine = builder.bv(9u8, 8).unwrap();
    let yes = builder.equal(one, one).unwrap();
    let no = builder.equal(one, two).unwrap();
    let take_then = builder.ite(yes, seven, nine).unwrap();
    let take_else = builder.ite(no, seven, nine).unwrap();

    let store = TableStore::new();
    assert_eq!(read_bv(&arena, &store, take_then), Some(7));
    assert_eq!(read_bv(&arena, &store, take_else), Some(9));
}

#[test]
fn let_wrapping_is_idempotent() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let three = builder.bv(3u8, 8).unwrap();
    let five = builder.bv(5u8, 8).unwrap();
    let body = builder.bvadd(three, five).unwrap();
    let symbol = builder.string("acc").unwrap();
    let wrapped = builder.let_binding(symbol, body, symbol).unwrap();

    let store = TableStore::new();
    assert_eq!(read_bv(&arena, &store, wrapped), read_bv(&arena, &store, body));
    assert_eq!(read_bv(&arena, &store, wrapped), Some(8));
}

#[test]
fn unbound_symbols_are_reported() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let symbol = builder.string("nowhere").unwrap();

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let store = TableStore::new();
    let err = AstTranslator::new(&mut adapter, &arena, &store)
        .convert(symbol)
        .unwrap_err();
    assert!(matches!(err, AstError::UnboundSymbol(name) if name == "nowhere"));
}

#[test]
fn references_resolve_through_the_store() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let three = builder.bv(3u8, 8).unwrap();
    let four = builder.bv(4u8, 8).unwrap();
    let stored = builder.bvadd(three, four).unwrap();
    let alias = builder.reference(ExprId(7), stored).unwrap();
    let one = builder.bv(1u8, 8).unwrap();
    let bumped = builder.bvadd(alias, one).unwrap();

    let mut store = TableStore::new();
    store.bind_ast(ExprId(7), stored);

    assert_eq!(read_bv(&arena, &store, bumped), Some(8));
    // Reference transparency: the alias lowers to the stored root's handle.
    assert_eq!(
        read_bv(&arena, &store, alias),
        read_bv(&arena, &store, stored)
    );
}

#[test]
fn missing_reference_targets_surface_as_null_input() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let stored = builder.bv(3u8, 8).unwrap();
    let alias = builder.reference(ExprId(7), stored).unwrap();

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let store = TableStore::new();
    let err = AstTranslator::new(&mut adapter, &arena, &store)
        .convert(alias)
        .unwrap_err();
    assert!(matches!(err, AstError::NullInput(_)));
}

#[test]
fn stale_roots_surface_as_null_input() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let lit = builder.bv(3u8, 8).unwrap();
    arena.free_all();

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let store = TableStore::new();
    let err = AstTranslator::new(&mut adapter, &arena, &store)
        .convert(lit)
        .unwrap_err();
    assert!(matches!(err, AstError::NullInput(_)));
}

#[derive(Default)]
struct CountingSink {
    lowered: Vec<NodeKind>,
}

impl TraceSink for CountingSink {
    fn lowered(&mut self, kind: NodeKind, _hash: &Hash512, _children: usize) {
        self.lowered.push(kind);
    }
}

#[test]
fn shared_nodes_are_lowered_exactly_once() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let two = builder.bv(2u8, 8).unwrap();
    let doubled = builder.bvadd(two, two).unwrap();
    let quadrupled = builder.bvadd(doubled, doubled).unwrap();

    let context = Context::new(&Config::new());
    let mut adapter = Z3Adapter::new(&context);
    let store = TableStore::new();
    let mut sink = CountingSink::default();
    let handle = AstTranslator::new(&mut adapter, &arena, &store)
        .with_sink(&mut sink)
        .convert(quadrupled)
        .unwrap();

    // The visit sequence contains the shared nodes several times; the memo
    // must collapse them to one lowering each.
    assert_eq!(sink.lowered.len(), 3);
    assert_eq!(adapter.read_bv(&handle), Some(8));
}

#[test]
fn conversion_survives_a_hundred_thousand_levels() {
    let mut arena = AstArena::new();
    let mut builder = AstBuilder::new(&mut arena);
    let one = builder.bv(1u8, 8).unwrap();
    let mut chain = one;
    for _ in 0..100_000 {
        chain = builder.bvadd(chain, one).unwrap();
    }

    // 100_001 mod 256
    assert_eq!(read_bv(&arena, &TableStore::new(), chain), Some(161));
}
