//! The evaluator and its sandbox state.
//!
//! [`Machine`] owns the heap, the console sink, and the three sandbox
//! stacks (tapes, display flags, capture frames). Evaluation is the
//! classic meta-circular walk with dynamically scoped bindings:
//!
//! 1. numerals self-evaluate; a symbol evaluates to the top of its binding
//!    stack; a `(lambda …)` form self-evaluates (closures carry no
//!    environment),
//! 2. otherwise the head is evaluated, `'` and `if` short-circuit,
//! 3. otherwise the arguments are evaluated left to right,
//! 4. a primitive head dispatches immediately — primitives never charge the
//!    budget,
//! 5. everything else charges one step, then dispatches `eval`, `try`, or a
//!    lambda application; an inapplicable head is returned as the value.
//!
//! `eval` and `try` bracket their nested evaluation with an environment
//! sweep over the object list: every atom gets a self-binding pushed
//! (`clean_env`) and popped again afterwards (`restore_env`), which is what
//! makes the sandboxed expression run in a fresh world.

use std::io::Write;

use log::debug;

use metalisp_base::{Big, CellId, Heap, ListBuilder, Prim};
use metalisp_language::{parse_record, Printer};

use crate::limit::{EvalResult, Exhaustion, Limit};

/// One captured-display frame: a dummy list head plus its end pointer, so
/// each append is O(1) and the finished list is ordinary data.
#[derive(Clone, Copy)]
struct Capture {
    head: CellId,
    tail: CellId,
}

impl Capture {
    fn new(heap: &mut Heap) -> Capture {
        let head = heap.cons(CellId::NIL, CellId::NIL);
        Capture { head, tail: head }
    }
}

/// The interpreter state: heap, sandbox stacks, counters and console sink.
pub struct Machine<W> {
    heap: Heap,
    printer: Printer,
    out: W,
    /// Current tape per `try` nesting level; the head of the top tape is
    /// the next bit.
    tapes: Vec<CellId>,
    /// Whether `display` prints (true) or captures (false), per level.
    displays: Vec<bool>,
    /// Captured-display frame per level.
    captures: Vec<Capture>,
    evals: u64,
}

impl<W: Write> Machine<W> {
    /// A machine with the default arena capacity, printing to `out`.
    pub fn new(out: W) -> Machine<W> {
        Machine::with_capacity(metalisp_base::heap::DEFAULT_CELLS, out)
    }

    /// A machine whose arena is bounded at `cells`.
    pub fn with_capacity(cells: usize, out: W) -> Machine<W> {
        let mut heap = Heap::with_capacity(cells);
        let inactive = Capture::new(&mut heap);
        Machine {
            heap,
            printer: Printer::new(),
            out,
            tapes: vec![CellId::NIL],
            displays: vec![true],
            captures: vec![inactive],
            evals: 0,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Number of evaluator entries so far.
    pub fn evals(&self) -> u64 {
        self.evals
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// Prints a labelled emission to the console sink. Console write
    /// failures are outside the dialect's error surface.
    pub fn print(&mut self, label: &str, x: CellId) {
        let _ = self.printer.print(&self.heap, &mut self.out, label, x);
    }

    /// Evaluates a top-level expression under no limit, resetting the
    /// sandbox stacks to their inactive frame first. A pending exhaustion
    /// surfaces as the corresponding atom.
    pub fn eval_top(&mut self, e: CellId) -> CellId {
        self.tapes.clear();
        self.tapes.push(CellId::NIL);
        self.displays.clear();
        self.displays.push(true);
        self.captures.clear();
        let inactive = Capture::new(&mut self.heap);
        self.captures.push(inactive);

        match self.eval(e, &Limit::Unlimited) {
            Ok(v) => v,
            Err(kind) => {
                debug!("top-level evaluation exhausted: {}", kind);
                self.exhaustion_atom(kind)
            }
        }
    }

    fn exhaustion_atom(&self, kind: Exhaustion) -> CellId {
        let syms = self.heap.symbols();
        match kind {
            Exhaustion::OutOfTime => syms.out_of_time,
            Exhaustion::OutOfData => syms.out_of_data,
        }
    }

    fn bool_atom(&self, b: bool) -> CellId {
        let syms = self.heap.symbols();
        if b {
            syms.truth
        } else {
            syms.falsity
        }
    }

    /// Evaluates `e` under the given budget.
    pub fn eval(&mut self, e: CellId, limit: &Limit) -> EvalResult {
        self.evals += 1;
        let syms = *self.heap.symbols();

        if self.heap.is_numeral(e) {
            return Ok(e);
        }
        if self.heap.is_symbol(e) {
            return Ok(self.heap.binding(e));
        }
        if self.heap.car(e) == syms.lambda {
            return Ok(e);
        }

        let f = self.eval(self.heap.car(e), limit)?;
        let e = self.heap.cdr(e);

        if f == syms.quote {
            return Ok(self.heap.car(e));
        }
        if f == syms.if_ {
            let test = self.eval(self.heap.car(e), limit)?;
            let mut branch = self.heap.cdr(e);
            if test == syms.falsity {
                branch = self.heap.cdr(branch);
            }
            return self.eval(self.heap.car(branch), limit);
        }

        let args = self.eval_args(e, limit)?;
        let x = self.heap.car(args);
        let rest = self.heap.cdr(args);
        let y = self.heap.car(rest);
        let z = {
            let tail = self.heap.cdr(rest);
            self.heap.car(tail)
        };

        if let Some(prim) = self.heap.prim(f) {
            return self.apply_prim(prim, x, y);
        }

        // Only non-primitive applications consume the budget.
        let limit = limit.charge()?;

        if f == syms.eval {
            self.clean_env();
            let v = self.eval(x, &limit);
            self.restore_env();
            return v;
        }
        if f == syms.try_ {
            return self.eval_try(x, y, z, &limit);
        }
        if self.heap.car(f) == syms.lambda {
            let rest = self.heap.cdr(f);
            let vars = self.heap.car(rest);
            let body = {
                let tail = self.heap.cdr(rest);
                self.heap.car(tail)
            };
            self.bind(vars, args);
            let v = self.eval(body, &limit);
            let mut cur = vars;
            while self.heap.is_pair(cur) {
                let formal = self.heap.car(cur);
                if self.heap.is_symbol(formal) {
                    self.heap.pop_binding(formal);
                }
                cur = self.heap.cdr(cur);
            }
            return v;
        }

        // Inapplicable head: the head's value is the value of the form.
        Ok(f)
    }

    fn eval_args(&mut self, e: CellId, limit: &Limit) -> EvalResult {
        if e.is_nil() {
            return Ok(CellId::NIL);
        }
        let head = self.eval(self.heap.car(e), limit)?;
        let rest = {
            let tail = self.heap.cdr(e);
            self.eval_args(tail, limit)?
        };
        Ok(self.heap.cons(head, rest))
    }

    /// Pushes one binding per atom-shaped formal, innermost last so the
    /// leftmost formal ends on top. List-shaped formals are skipped, but
    /// the walk continues in step with the argument list.
    fn bind(&mut self, vars: CellId, args: CellId) {
        if !self.heap.is_pair(vars) {
            return;
        }
        let vars_rest = self.heap.cdr(vars);
        let args_rest = self.heap.cdr(args);
        self.bind(vars_rest, args_rest);
        let formal = self.heap.car(vars);
        if self.heap.is_symbol(formal) {
            let arg = self.heap.car(args);
            self.heap.push_binding(formal, arg);
        }
    }

    fn clean_env(&mut self) {
        let mut o = self.heap.object_list();
        while self.heap.is_pair(o) {
            let atom = self.heap.car(o);
            self.heap.push_binding(atom, atom);
            o = self.heap.cdr(o);
        }
        // nil keeps evaluating to the empty list even in a fresh world.
        let nil_sym = self.heap.symbols().nil;
        self.heap.set_binding(nil_sym, CellId::NIL);
    }

    fn restore_env(&mut self) {
        let mut o = self.heap.object_list();
        while self.heap.is_pair(o) {
            let atom = self.heap.car(o);
            let stack = self.heap.value(atom);
            // Atoms interned inside the nested evaluation have only their
            // bottom frame; leave it.
            if !self.heap.cdr(stack).is_nil() {
                self.heap.pop_binding(atom);
            }
            o = self.heap.cdr(o);
        }
    }

    fn eval_try(&mut self, x: CellId, y: CellId, z: CellId, limit: &Limit) -> EvalResult {
        let syms = *self.heap.symbols();
        let requested = if x == syms.no_time_limit {
            Limit::Unlimited
        } else {
            Limit::Steps(self.to_num(x))
        };
        let (effective, current_binds) = Limit::clamp(requested, limit);

        self.tapes.push(z);
        self.displays.push(false);
        let capture = Capture::new(&mut self.heap);
        self.captures.push(capture);
        self.clean_env();
        let outcome = self.eval(y, &effective);
        self.restore_env();
        self.tapes.pop();
        self.displays.pop();
        let capture = self.captures.pop().expect("capture stack underflow");
        let captured = self.heap.cdr(capture.head);

        match outcome {
            // The outer budget ran out, not just the requested one: keep
            // the exhaustion in flight for the enclosing scope.
            Err(Exhaustion::OutOfTime) if current_binds => Err(Exhaustion::OutOfTime),
            Err(kind) => {
                debug!("try caught {}", kind);
                let atom = self.exhaustion_atom(kind);
                Ok(self.list3(syms.failure, atom, captured))
            }
            Ok(v) => Ok(self.list3(syms.success, v, captured)),
        }
    }

    fn apply_prim(&mut self, prim: Prim, x: CellId, y: CellId) -> EvalResult {
        use std::cmp::Ordering;

        let syms = *self.heap.symbols();
        match prim {
            Prim::Car => Ok(self.heap.car(x)),
            Prim::Cdr => Ok(self.heap.cdr(x)),
            Prim::Cons => Ok(self.heap.cons(x, y)),
            Prim::Atom => Ok(self.bool_atom(self.heap.is_atom(x))),
            Prim::Eq => Ok(self.bool_atom(self.equal(x, y))),
            Prim::Display => self.display(x),
            Prim::Debug => {
                self.print("debug", x);
                Ok(x)
            }
            Prim::Append => {
                let px = if self.heap.is_atom(x) { CellId::NIL } else { x };
                let py = if self.heap.is_atom(y) { CellId::NIL } else { y };
                Ok(self.append_list(px, py))
            }
            Prim::Length => {
                let mut n = 0u64;
                let mut cur = x;
                while self.heap.is_pair(cur) {
                    n += 1;
                    cur = self.heap.cdr(cur);
                }
                Ok(self.heap.mk_num(Big::from(n)))
            }
            Prim::Lt => Ok(self.bool_atom(self.num_cmp(x, y) == Ordering::Less)),
            Prim::Gt => Ok(self.bool_atom(self.num_cmp(x, y) == Ordering::Greater)),
            Prim::Leq => Ok(self.bool_atom(self.num_cmp(x, y) != Ordering::Greater)),
            Prim::Geq => Ok(self.bool_atom(self.num_cmp(x, y) != Ordering::Less)),
            Prim::Plus => {
                let n = self.to_num(x).add(&self.to_num(y));
                Ok(self.heap.mk_num(n))
            }
            Prim::Times => {
                let n = self.to_num(x).mul(&self.to_num(y));
                Ok(self.heap.mk_num(n))
            }
            Prim::Pow => {
                let n = self.to_num(x).pow(&self.to_num(y));
                Ok(self.heap.mk_num(n))
            }
            Prim::Minus => {
                let n = self.to_num(x).saturating_sub(&self.to_num(y));
                Ok(self.heap.mk_num(n))
            }
            Prim::Base2To10 => {
                let mut acc = Big::zero();
                let mut cur = x;
                while self.heap.is_pair(cur) {
                    // Anything but a zero numeral reads as a one bit.
                    let bit_cell = self.heap.car(cur);
                    let bit = !self.heap.is_zero_numeral(bit_cell);
                    acc = acc.double_plus(bit);
                    cur = self.heap.cdr(cur);
                }
                Ok(self.heap.mk_num(acc))
            }
            Prim::Base10To2 => {
                let mut n = self.to_num(x);
                let mut bits = CellId::NIL;
                while !n.is_zero() {
                    let bit = if n.is_odd() { syms.one } else { syms.zero };
                    bits = self.heap.cons(bit, bits);
                    n = n.halve();
                }
                Ok(bits)
            }
            Prim::Size => {
                let n = self.size_of(x);
                Ok(self.heap.mk_num(n))
            }
            Prim::ReadBit => self.read_bit(),
            Prim::Bits => Ok(self.bits_of(x)),
            Prim::ReadExp => {
                let line = self.read_record()?;
                Ok(parse_record(&mut self.heap, &line))
            }
        }
    }

    fn display(&mut self, x: CellId) -> EvalResult {
        if *self.displays.last().expect("display stack underflow") {
            self.print("display", x);
            return Ok(x);
        }
        let tail = self.captures.last().expect("capture stack underflow").tail;
        let link = self.heap.cons(x, CellId::NIL);
        self.heap.set_cdr(tail, link);
        self.captures.last_mut().expect("capture stack underflow").tail = link;
        Ok(x)
    }

    fn to_num(&self, x: CellId) -> Big {
        self.heap.numeral(x).cloned().unwrap_or_else(Big::zero)
    }

    fn num_cmp(&self, x: CellId, y: CellId) -> std::cmp::Ordering {
        self.to_num(x).compare(&self.to_num(y))
    }

    /// Structural equality: identity, numeral value equality, or recursive
    /// pair equality. Distinct symbols are never equal.
    fn equal(&self, x: CellId, y: CellId) -> bool {
        if x == y {
            return true;
        }
        match (self.heap.numeral(x), self.heap.numeral(y)) {
            (Some(a), Some(b)) => return a == b,
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if self.heap.is_atom(x) || self.heap.is_atom(y) {
            return false;
        }
        self.equal(self.heap.car(x), self.heap.car(y))
            && self.equal(self.heap.cdr(x), self.heap.cdr(y))
    }

    fn append_list(&mut self, x: CellId, y: CellId) -> CellId {
        if x.is_nil() {
            return y;
        }
        let head = self.heap.car(x);
        let rest = {
            let tail = self.heap.cdr(x);
            self.append_list(tail, y)
        };
        self.heap.cons(head, rest)
    }

    /// `size` in characters of the serialised form: digit count for
    /// numerals, name length for symbols, and for lists the child sizes
    /// plus one per separator plus two for the parentheses.
    fn size_of(&self, x: CellId) -> Big {
        if let Some(n) = self.heap.numeral(x) {
            return Big::from(n.digit_count() as u64);
        }
        if let Some(name) = self.heap.name(x) {
            return Big::from(name.len() as u64);
        }
        let mut sum = Big::zero();
        let mut cur = x;
        while self.heap.is_pair(cur) {
            sum = sum.add(&self.size_of(self.heap.car(cur)));
            cur = self.heap.cdr(cur);
            if self.heap.is_pair(cur) {
                sum = sum.succ();
            }
        }
        sum.succ().succ()
    }

    /// Pops one bit off the current tape; an exhausted tape is the
    /// out-of-data transition.
    fn read_bit(&mut self) -> EvalResult {
        let tape = *self.tapes.last().expect("tape stack underflow");
        if !self.heap.is_pair(tape) {
            return Err(Exhaustion::OutOfData);
        }
        let bit = self.heap.car(tape);
        let rest = self.heap.cdr(tape);
        *self.tapes.last_mut().expect("tape stack underflow") = rest;
        let syms = self.heap.symbols();
        Ok(if self.heap.is_zero_numeral(bit) {
            syms.zero
        } else {
            syms.one
        })
    }

    /// Eight bits, most significant first, as one byte.
    fn read_char(&mut self) -> Result<u8, Exhaustion> {
        let zero = self.heap.symbols().zero;
        let mut c = 0u8;
        for _ in 0..8 {
            let bit = self.read_bit()?;
            c = (c << 1) | u8::from(bit != zero);
        }
        Ok(c)
    }

    /// Bytes off the tape up to and including a newline.
    fn read_record(&mut self) -> Result<Vec<u8>, Exhaustion> {
        let mut line = Vec::new();
        loop {
            let c = self.read_char()?;
            line.push(c);
            if c == b'\n' {
                return Ok(line);
            }
        }
    }

    /// The serialised form of `x`, newline-terminated, as a flat list of
    /// bit numerals, eight per byte, most significant first.
    fn bits_of(&mut self, x: CellId) -> CellId {
        let mut text = metalisp_language::sexp_string(&self.heap, x);
        text.push('\n');
        let syms = *self.heap.symbols();
        let mut bits = ListBuilder::new(&mut self.heap);
        for byte in text.bytes() {
            for shift in (0..8).rev() {
                let bit = if (byte >> shift) & 1 == 1 {
                    syms.one
                } else {
                    syms.zero
                };
                bits.push(&mut self.heap, bit);
            }
        }
        bits.finish(&self.heap)
    }

    fn list3(&mut self, a: CellId, b: CellId, c: CellId) -> CellId {
        let tail = self.heap.cons(c, CellId::NIL);
        let tail = self.heap.cons(b, tail);
        self.heap.cons(a, tail)
    }
}
