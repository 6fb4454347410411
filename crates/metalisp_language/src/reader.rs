//! The prefix-arity M-expression reader and the S-expression record parser.
//!
//! `read` consumes words from the console [`TokenStream`] and produces one
//! expression. In M-mode the reader fires sugar expansions before falling
//! back to generic arity consumption:
//!
//! - `"` switches to S-mode for exactly one sub-expression
//! - `cadr x` → `(car (cdr x))`, `caddr x` → `(car (cdr (cdr x)))`
//! - `run-utm-on x` → `(car (cdr (try no-time-limit (' (eval (read-exp))) x)))`
//! - `let n d b` → `((' (lambda (n) b)) d)`, with a list-shaped `n`
//!   first wrapping `d` as a quoted lambda
//! - a head of arity *a* consumes *a*−1 further M-expressions
//!
//! Quoting needs no special case: `'` is an ordinary arity-2 atom, so
//! `'x` reads as `(' x)` through the generic path.
//!
//! [`parse_record`] is the reader's S-mode twin over a finite, tape-decoded
//! byte line: running out of words behaves as a closing parenthesis, so
//! unterminated lists close and an empty record reads as nil.

use std::collections::VecDeque;

use metalisp_base::{CellId, Heap, ListBuilder};

use crate::lexer::{intern_word, split_line, LineSource, ReadError, TokenStream};

/// Reads one M-expression from the console stream.
pub fn read_mexp<S: LineSource>(
    stream: &mut TokenStream<S>,
    heap: &mut Heap,
) -> Result<CellId, ReadError> {
    read(stream, heap, true, false)
}

fn read<S: LineSource>(
    stream: &mut TokenStream<S>,
    heap: &mut Heap,
    mexp: bool,
    rparen_ok: bool,
) -> Result<CellId, ReadError> {
    let w = stream.next_word(heap, mexp)?;
    let syms = *heap.symbols();

    if w == syms.rparen {
        // Only a list loop may see the sentinel; anywhere else a stray
        // closing parenthesis reads as nil.
        return Ok(if rparen_ok { w } else { CellId::NIL });
    }
    if w == syms.lparen {
        let mut items = ListBuilder::new(heap);
        loop {
            let next = read(stream, heap, mexp, true)?;
            if next == syms.rparen {
                break;
            }
            items.push(heap, next);
        }
        return Ok(items.finish(heap));
    }
    if !mexp {
        return Ok(w);
    }
    if w == syms.dquote {
        return read(stream, heap, false, false);
    }
    if w == syms.cadr {
        let x = read(stream, heap, true, false)?;
        return Ok(car_of_cdrs(heap, x, 1));
    }
    if w == syms.caddr {
        let x = read(stream, heap, true, false)?;
        return Ok(car_of_cdrs(heap, x, 2));
    }
    if w == syms.run_utm_on {
        let tape = read(stream, heap, true, false)?;
        return Ok(expand_run_utm_on(heap, tape));
    }
    if w == syms.let_ {
        let name = read(stream, heap, true, false)?;
        let def = read(stream, heap, true, false)?;
        let body = read(stream, heap, true, false)?;
        return Ok(expand_let(heap, name, def, body));
    }

    let arity = heap.arity(w);
    if arity == 0 {
        return Ok(w);
    }
    let mut form = ListBuilder::new(heap);
    form.push(heap, w);
    for _ in 1..arity {
        let arg = read(stream, heap, true, false)?;
        form.push(heap, arg);
    }
    Ok(form.finish(heap))
}

fn list1(heap: &mut Heap, a: CellId) -> CellId {
    heap.cons(a, CellId::NIL)
}

fn list2(heap: &mut Heap, a: CellId, b: CellId) -> CellId {
    let tail = heap.cons(b, CellId::NIL);
    heap.cons(a, tail)
}

/// `(car (cdr … (cdr x)))` with `cdrs` inner `cdr` wrappings.
fn car_of_cdrs(heap: &mut Heap, x: CellId, cdrs: usize) -> CellId {
    let syms = *heap.symbols();
    let mut sexp = x;
    for _ in 0..cdrs {
        sexp = list2(heap, syms.cdr, sexp);
    }
    list2(heap, syms.car, sexp)
}

/// `(car (cdr (try no-time-limit (' (eval (read-exp))) tape)))`.
///
/// The outer `car (cdr …)` extracts the result slot of the `try` envelope.
fn expand_run_utm_on(heap: &mut Heap, tape: CellId) -> CellId {
    let syms = *heap.symbols();
    let read_exp_call = list1(heap, syms.read_exp);
    let eval_call = list2(heap, syms.eval, read_exp_call);
    let quoted = list2(heap, syms.quote, eval_call);
    let tail = list1(heap, tape);
    let tail = heap.cons(quoted, tail);
    let tail = heap.cons(syms.no_time_limit, tail);
    let try_form = heap.cons(syms.try_, tail);
    car_of_cdrs(heap, try_form, 1)
}

/// `(' (lambda vars body))`
fn quoted_lambda(heap: &mut Heap, vars: CellId, body: CellId) -> CellId {
    let syms = *heap.symbols();
    let tail = heap.cons(body, CellId::NIL);
    let tail = heap.cons(vars, tail);
    let lambda = heap.cons(syms.lambda, tail);
    list2(heap, syms.quote, lambda)
}

/// `((' (lambda (name) body)) def)`; a list-shaped name `(f p₁ …)` first
/// turns `def` into `(' (lambda (p₁ …) def))`.
fn expand_let(heap: &mut Heap, name: CellId, def: CellId, body: CellId) -> CellId {
    let (name, def) = if heap.is_pair(name) {
        let vars = heap.cdr(name);
        let fname = heap.car(name);
        (fname, quoted_lambda(heap, vars, def))
    } else {
        (name, def)
    };
    let formals = list1(heap, name);
    let binder = quoted_lambda(heap, formals, body);
    list2(heap, binder, def)
}

/// Parses one S-expression from a tape-decoded byte record.
pub fn parse_record(heap: &mut Heap, line: &[u8]) -> CellId {
    let mut words: VecDeque<Vec<u8>> = split_line(line, false).into();
    record_expr(heap, &mut words, false)
}

fn record_word(heap: &mut Heap, words: &mut VecDeque<Vec<u8>>) -> CellId {
    match words.pop_front() {
        Some(word) => intern_word(heap, &word),
        // An exhausted record reads as a closing parenthesis.
        None => heap.symbols().rparen,
    }
}

fn record_expr(heap: &mut Heap, words: &mut VecDeque<Vec<u8>>, rparen_ok: bool) -> CellId {
    let w = record_word(heap, words);
    let syms = *heap.symbols();
    if w == syms.rparen {
        return if rparen_ok { w } else { CellId::NIL };
    }
    if w == syms.lparen {
        let mut items = ListBuilder::new(heap);
        loop {
            let next = record_expr(heap, words, true);
            if next == syms.rparen {
                break;
            }
            items.push(heap, next);
        }
        return items.finish(heap);
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::EchoLines;
    use crate::printer::sexp_string;
    use std::io;

    fn read_str(heap: &mut Heap, src: &str) -> CellId {
        let source: EchoLines<&[u8], io::Sink> = EchoLines::silent(src.as_bytes());
        let mut stream = TokenStream::new(source);
        read_mexp(&mut stream, heap).expect("read failed")
    }

    fn reads_to(src: &str, expected: &str) {
        let mut heap = Heap::new();
        let e = read_str(&mut heap, src);
        assert_eq!(sexp_string(&heap, e), expected);
    }

    #[test]
    fn atoms_and_numerals_read_as_themselves() {
        reads_to("foo\n", "foo");
        reads_to("42\n", "42");
        reads_to("007\n", "7");
    }

    #[test]
    fn lists_read_elementwise() {
        reads_to("(a b c)\n", "(a b c)");
        reads_to("()\n", "()");
        reads_to("(a (b) c)\n", "(a (b) c)");
    }

    #[test]
    fn stray_rparen_reads_as_nil() {
        reads_to(")\n", "()");
    }

    #[test]
    fn arity_heads_consume_their_arguments() {
        reads_to("+ 1 2\n", "(+ 1 2)");
        reads_to("cons a b\n", "(cons a b)");
        reads_to("read-bit\n", "(read-bit)");
        reads_to("if a b c\n", "(if a b c)");
    }

    #[test]
    fn quote_is_generic_arity_expansion() {
        reads_to("'x\n", "(' x)");
        reads_to("'(a b)\n", "(' (a b))");
    }

    #[test]
    fn cadr_and_caddr_expand() {
        reads_to("cadr x\n", "(car (cdr x))");
        reads_to("caddr x\n", "(car (cdr (cdr x)))");
    }

    #[test]
    fn run_utm_on_expands_to_the_try_envelope() {
        reads_to(
            "run-utm-on t\n",
            "(car (cdr (try no-time-limit (' (eval (read-exp))) t)))",
        );
    }

    #[test]
    fn let_expands_to_an_applied_lambda() {
        reads_to("let x 1 x\n", "((' (lambda (x) x)) 1)");
    }

    #[test]
    fn function_let_wraps_the_definition_as_a_lambda() {
        reads_to(
            "let (f n) n (f 5)\n",
            "((' (lambda (f) (f 5))) (' (lambda (n) n)))",
        );
    }

    #[test]
    fn double_quote_reads_one_sexp_without_sugar() {
        reads_to("\"(cadr x)\n", "(cadr x)");
        reads_to("\"(let a b)\n", "(let a b)");
    }

    #[test]
    fn double_quote_returns_to_mexp_mode_afterwards() {
        let mut heap = Heap::new();
        let source: EchoLines<&[u8], io::Sink> = EchoLines::silent("(\"(cadr x) cadr y)\n".as_bytes());
        let mut stream = TokenStream::new(source);
        let e = read_mexp(&mut stream, &mut heap).expect("read failed");
        assert_eq!(sexp_string(&heap, e), "((cadr x) (car (cdr y)))");
    }

    #[test]
    fn comments_vanish_inside_forms() {
        reads_to("(+ [ the first ] 1 [ the second ] 2)\n", "((+ 1 2))");
    }

    #[test]
    fn expressions_may_span_lines() {
        reads_to("(a\nb)\n", "(a b)");
    }

    #[test]
    fn parenthesised_forms_wrap_in_a_singleton_list() {
        // The element reader expands arities inside the parentheses, so the
        // whole form arrives wrapped one level deep.
        reads_to("(+ 2 3)\n", "((+ 2 3))");
        reads_to("(define x 5)\n", "((define x 5))");
    }

    #[test]
    fn record_parses_one_sexp() {
        let mut heap = Heap::new();
        let e = parse_record(&mut heap, b"(a (b 12) c)\n");
        assert_eq!(sexp_string(&heap, e), "(a (b 12) c)");
    }

    #[test]
    fn record_without_terminators_closes_open_lists() {
        let mut heap = Heap::new();
        let e = parse_record(&mut heap, b"(a (b c\n");
        assert_eq!(sexp_string(&heap, e), "(a (b c))");
    }

    #[test]
    fn empty_record_reads_as_nil() {
        let mut heap = Heap::new();
        let e = parse_record(&mut heap, b"\n");
        assert!(e.is_nil());
    }

    #[test]
    fn record_mode_has_no_sugar() {
        let mut heap = Heap::new();
        let e = parse_record(&mut heap, b"(cadr 'x [y])\n");
        assert_eq!(sexp_string(&heap, e), "(cadr 'x [y])");
    }
}
