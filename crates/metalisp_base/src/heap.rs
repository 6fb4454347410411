//! The cell arena: bounded, monotonically growing storage for all runtime
//! values, plus symbol interning and the well-known bootstrap atoms.
//!
//! The heap is the single authority for cell identity. Allocation starts at
//! cell 0 — the atom printed `()`, which is the empty list — and grows
//! monotonically; cells are never freed. Exhausting the arena is fatal (a
//! documented panic), not a reportable error.
//!
//! Two structures thread through the arena:
//!
//! - the **object list**, a cell list of every atom ever interned, most
//!   recent first. Environment save/restore walks it, so an atom interned
//!   mid-run (for instance by `read-exp`) participates from then on.
//! - the **name index**, a hash map from name to atom, which makes
//!   [`Heap::lookup_word`] O(1) without changing what the object list means.
//!
//! ## The `cons` degeneracy
//!
//! `cons(x, y)` with `y` neither nil nor a pair returns `x` unchanged and
//! allocates nothing. This is observable (`(cons a b)` is `a` when `b` is an
//! atom) and internal callers lean on it; it must not be normalised away.

use rustc_hash::FxHashMap;

use crate::bignum::Big;
use crate::cell::{AtomCell, Cell, CellId, Prim};

/// Default arena capacity, in cells.
pub const DEFAULT_CELLS: usize = 1_000_000;

/// Identities of the atoms installed at bootstrap.
///
/// All fields are plain cell identities; the struct is `Copy` so callers can
/// lift it out of the heap before taking mutable borrows.
#[derive(Clone, Copy, Default, Debug)]
pub struct Symbols {
    /// The symbol `nil`, whose binding is forced to the empty list.
    pub nil: CellId,
    pub truth: CellId,
    pub falsity: CellId,
    pub no_time_limit: CellId,
    pub out_of_time: CellId,
    pub out_of_data: CellId,
    pub success: CellId,
    pub failure: CellId,
    pub define: CellId,
    pub let_: CellId,
    pub lambda: CellId,
    pub cadr: CellId,
    pub caddr: CellId,
    pub run_utm_on: CellId,
    /// The quote atom, printed `'`.
    pub quote: CellId,
    pub if_: CellId,
    pub car: CellId,
    pub cdr: CellId,
    pub read_exp: CellId,
    pub eval: CellId,
    pub try_: CellId,
    pub lbracket: CellId,
    pub rbracket: CellId,
    pub lparen: CellId,
    pub rparen: CellId,
    pub dquote: CellId,
    /// Shared numeral 0, the bit written by `base10-to-2` and friends.
    pub zero: CellId,
    /// Shared numeral 1.
    pub one: CellId,
}

/// The cell arena.
pub struct Heap {
    cells: Vec<Cell>,
    limit: usize,
    object_list: CellId,
    names: FxHashMap<String, CellId>,
    syms: Symbols,
}

impl Heap {
    /// Creates a heap with the default capacity and installs the bootstrap
    /// atoms.
    pub fn new() -> Heap {
        Heap::with_capacity(DEFAULT_CELLS)
    }

    /// Creates a heap bounded at `limit` cells.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is too small to hold the bootstrap atoms.
    pub fn with_capacity(limit: usize) -> Heap {
        let mut heap = Heap {
            cells: Vec::new(),
            limit,
            object_list: CellId::NIL,
            names: FxHashMap::default(),
            syms: Symbols::default(),
        };
        heap.install_symbols();
        heap
    }

    fn install_symbols(&mut self) {
        // The empty-list atom must land at cell 0; everything reads nil as
        // "cell 0" from here on.
        let empty = self.mk_atom(None, "()", 0);
        assert!(empty.is_nil(), "bootstrap did not place () at cell 0");

        let mut syms = Symbols {
            nil: self.mk_atom(None, "nil", 0),
            ..Symbols::default()
        };
        // Evaluating the symbol nil must yield the empty list, not the
        // symbol itself.
        let stack = self.value(syms.nil);
        self.set_car(stack, CellId::NIL);

        syms.truth = self.mk_atom(None, "true", 0);
        syms.falsity = self.mk_atom(None, "false", 0);
        syms.no_time_limit = self.mk_atom(None, "no-time-limit", 0);
        syms.out_of_time = self.mk_atom(None, "out-of-time", 0);
        syms.out_of_data = self.mk_atom(None, "out-of-data", 0);
        syms.success = self.mk_atom(None, "success", 0);
        syms.failure = self.mk_atom(None, "failure", 0);

        syms.define = self.mk_atom(None, "define", 3);
        syms.let_ = self.mk_atom(None, "let", 4);
        syms.lambda = self.mk_atom(None, "lambda", 3);
        syms.cadr = self.mk_atom(None, "cadr", 2);
        syms.caddr = self.mk_atom(None, "caddr", 2);
        syms.run_utm_on = self.mk_atom(None, "run-utm-on", 2);
        syms.quote = self.mk_atom(None, "'", 2);
        syms.if_ = self.mk_atom(None, "if", 4);

        syms.car = self.mk_atom(Some(Prim::Car), "car", 2);
        syms.cdr = self.mk_atom(Some(Prim::Cdr), "cdr", 2);
        self.mk_atom(Some(Prim::Cons), "cons", 3);
        self.mk_atom(Some(Prim::Atom), "atom", 2);
        self.mk_atom(Some(Prim::Eq), "=", 3);
        self.mk_atom(Some(Prim::Display), "display", 2);
        self.mk_atom(Some(Prim::Debug), "debug", 2);
        self.mk_atom(Some(Prim::Append), "append", 3);
        self.mk_atom(Some(Prim::Length), "length", 2);
        self.mk_atom(Some(Prim::Lt), "<", 3);
        self.mk_atom(Some(Prim::Gt), ">", 3);
        self.mk_atom(Some(Prim::Leq), "<=", 3);
        self.mk_atom(Some(Prim::Geq), ">=", 3);
        self.mk_atom(Some(Prim::Plus), "+", 3);
        self.mk_atom(Some(Prim::Times), "*", 3);
        self.mk_atom(Some(Prim::Pow), "^", 3);
        self.mk_atom(Some(Prim::Minus), "-", 3);
        self.mk_atom(Some(Prim::Base2To10), "base2-to-10", 2);
        self.mk_atom(Some(Prim::Base10To2), "base10-to-2", 2);
        self.mk_atom(Some(Prim::Size), "size", 2);
        self.mk_atom(Some(Prim::ReadBit), "read-bit", 1);
        self.mk_atom(Some(Prim::Bits), "bits", 2);
        syms.read_exp = self.mk_atom(Some(Prim::ReadExp), "read-exp", 1);

        syms.eval = self.mk_atom(None, "eval", 2);
        syms.try_ = self.mk_atom(None, "try", 4);

        syms.lbracket = self.mk_atom(None, "[", 0);
        syms.rbracket = self.mk_atom(None, "]", 0);
        syms.lparen = self.mk_atom(None, "(", 0);
        syms.rparen = self.mk_atom(None, ")", 0);
        syms.dquote = self.mk_atom(None, "\"", 0);

        syms.zero = self.mk_num(Big::zero());
        syms.one = self.mk_num(Big::one());

        self.syms = syms;
    }

    /// The well-known bootstrap atoms.
    pub fn symbols(&self) -> &Symbols {
        &self.syms
    }

    /// Number of cells allocated so far.
    pub fn allocated(&self) -> usize {
        self.cells.len()
    }

    /// Head of the object list: every interned atom, most recent first.
    pub fn object_list(&self) -> CellId {
        self.object_list
    }

    fn alloc(&mut self, cell: Cell) -> CellId {
        if self.cells.len() >= self.limit {
            panic!("storage overflow: cell arena exhausted at {} cells", self.limit);
        }
        let id = CellId::from_index(self.cells.len());
        self.cells.push(cell);
        id
    }

    /// Pair constructor.
    ///
    /// When `y` is neither nil nor a pair, returns `x` unchanged without
    /// allocating (see the module notes).
    pub fn cons(&mut self, x: CellId, y: CellId) -> CellId {
        if !y.is_nil() && !self.is_pair(y) {
            return x;
        }
        self.alloc(Cell::Pair { car: x, cdr: y })
    }

    /// Interns a new atom. The fresh atom's binding stack holds one frame:
    /// the atom itself, so unbound symbols self-evaluate.
    pub fn mk_atom(&mut self, prim: Option<Prim>, name: &str, arity: u8) -> CellId {
        debug_assert!(
            !self.names.contains_key(name),
            "atom {:?} interned twice",
            name
        );
        let a = self.alloc(Cell::Atom(AtomCell {
            name: name.to_string(),
            prim,
            arity,
            value: CellId::NIL,
        }));
        let stack = self.cons(a, CellId::NIL);
        self.set_value(a, stack);
        self.names.insert(name.to_string(), a);
        self.object_list = self.cons(a, self.object_list);
        a
    }

    /// Allocates a numeral. Numerals are not interned; equal values may
    /// live in distinct cells.
    pub fn mk_num(&mut self, value: Big) -> CellId {
        self.alloc(Cell::Numeral(value))
    }

    /// Finds the atom named `name`, interning it with arity 0 and no
    /// primitive on a miss.
    pub fn lookup_word(&mut self, name: &str) -> CellId {
        if let Some(&a) = self.names.get(name) {
            return a;
        }
        self.mk_atom(None, name, 0)
    }

    // ---- classification ----------------------------------------------

    pub fn is_pair(&self, x: CellId) -> bool {
        matches!(self.cells[x.index()], Cell::Pair { .. })
    }

    /// True for symbols and numerals alike; this is the dialect's `atom`.
    pub fn is_atom(&self, x: CellId) -> bool {
        !self.is_pair(x)
    }

    pub fn is_numeral(&self, x: CellId) -> bool {
        matches!(self.cells[x.index()], Cell::Numeral(_))
    }

    pub fn is_symbol(&self, x: CellId) -> bool {
        matches!(self.cells[x.index()], Cell::Atom(_))
    }

    // ---- access ------------------------------------------------------

    /// Head of `x`. A non-pair reads as itself, which makes
    /// `car(nil) = nil` fall out of nil being cell 0.
    pub fn car(&self, x: CellId) -> CellId {
        match self.cells[x.index()] {
            Cell::Pair { car, .. } => car,
            _ => x,
        }
    }

    /// Tail of `x`; non-pairs read as themselves.
    pub fn cdr(&self, x: CellId) -> CellId {
        match self.cells[x.index()] {
            Cell::Pair { cdr, .. } => cdr,
            _ => x,
        }
    }

    pub fn atom(&self, x: CellId) -> Option<&AtomCell> {
        match &self.cells[x.index()] {
            Cell::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn numeral(&self, x: CellId) -> Option<&Big> {
        match &self.cells[x.index()] {
            Cell::Numeral(n) => Some(n),
            _ => None,
        }
    }

    /// The symbol's printed name, if `x` is a symbol.
    pub fn name(&self, x: CellId) -> Option<&str> {
        self.atom(x).map(|a| a.name.as_str())
    }

    /// The primitive carried by `x`, if `x` is a primitive atom.
    pub fn prim(&self, x: CellId) -> Option<Prim> {
        self.atom(x).and_then(|a| a.prim)
    }

    /// Reader arity of `x`; non-atoms and literals report 0.
    pub fn arity(&self, x: CellId) -> u8 {
        self.atom(x).map(|a| a.arity).unwrap_or(0)
    }

    /// True if `x` is a numeral with value zero (empty payload).
    pub fn is_zero_numeral(&self, x: CellId) -> bool {
        self.numeral(x).is_some_and(Big::is_zero)
    }

    // ---- mutation ----------------------------------------------------

    /// Reassigns the head of a pair.
    ///
    /// # Panics
    ///
    /// Panics if `x` is not a pair; only pairs are mutable.
    pub fn set_car(&mut self, x: CellId, v: CellId) {
        match &mut self.cells[x.index()] {
            Cell::Pair { car, .. } => *car = v,
            _ => panic!("set_car on non-pair cell"),
        }
    }

    /// Reassigns the tail of a pair.
    ///
    /// # Panics
    ///
    /// Panics if `x` is not a pair.
    pub fn set_cdr(&mut self, x: CellId, v: CellId) {
        match &mut self.cells[x.index()] {
            Cell::Pair { cdr, .. } => *cdr = v,
            _ => panic!("set_cdr on non-pair cell"),
        }
    }

    // ---- binding stacks ----------------------------------------------

    /// Top pair of the atom's binding stack. Nil for non-symbols.
    pub fn value(&self, a: CellId) -> CellId {
        self.atom(a).map(|at| at.value).unwrap_or(CellId::NIL)
    }

    fn set_value(&mut self, a: CellId, v: CellId) {
        match &mut self.cells[a.index()] {
            Cell::Atom(at) => at.value = v,
            _ => panic!("binding stack on non-symbol cell"),
        }
    }

    /// The currently visible binding of `a`.
    pub fn binding(&self, a: CellId) -> CellId {
        let stack = self.value(a);
        self.car(stack)
    }

    /// Pushes `v` as the new visible binding of `a`.
    pub fn push_binding(&mut self, a: CellId, v: CellId) {
        let old = self.value(a);
        let frame = self.cons(v, old);
        self.set_value(a, frame);
    }

    /// Pops the visible binding of `a`, exposing the previous frame.
    /// Callers keep push/pop balanced; the bottom frame is never popped by
    /// balanced code.
    pub fn pop_binding(&mut self, a: CellId) {
        let stack = self.value(a);
        let prev = self.cdr(stack);
        self.set_value(a, prev);
    }

    /// Forces the visible binding of `a` to `v` in place (used by `define`
    /// and by the environment reset around `eval`).
    pub fn set_binding(&mut self, a: CellId, v: CellId) {
        let stack = self.value(a);
        self.set_car(stack, v);
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}

/// Grow-at-the-end list builder over a dummy head cell.
///
/// The reader, the `bits` primitive and the captured-display channel all
/// build lists front to back; a dummy head plus an end pointer makes each
/// append O(1) while the finished list stays ordinary data.
pub struct ListBuilder {
    head: CellId,
    tail: CellId,
}

impl ListBuilder {
    pub fn new(heap: &mut Heap) -> ListBuilder {
        let head = heap.cons(CellId::NIL, CellId::NIL);
        ListBuilder { head, tail: head }
    }

    pub fn push(&mut self, heap: &mut Heap, x: CellId) {
        let link = heap.cons(x, CellId::NIL);
        heap.set_cdr(self.tail, link);
        self.tail = link;
    }

    /// The list built so far (the dummy head is not part of it).
    pub fn finish(&self, heap: &Heap) -> CellId {
        heap.cdr(self.head)
    }
}
