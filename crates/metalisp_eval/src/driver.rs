//! The outer read–define–print loop.
//!
//! Per expression the driver emits a blank line, reads one M-expression
//! (the token stream echoes consumed source lines to its own sink), emits a
//! newline, then either processes a `define` or prints
//! `expression`/`value` labels around an evaluation. End of input produces
//! the end-of-run report with the evaluator and allocation counters.
//!
//! `define` binds in place: the body (lambda-wrapped when the name is
//! list-shaped) replaces the atom's currently visible binding. The
//! M-reader delivers a parenthesised `(define …)` wrapped in a one-element
//! list, so the driver unwraps that shape before checking the head; the
//! bare `define name value` form arrives unwrapped.

use std::io::{self, Write};

use metalisp_base::{heap::DEFAULT_CELLS, CellId};
use metalisp_language::{read_mexp, LineSource, ReadError, TokenStream};

use crate::machine::Machine;

/// Runs the loop over `source`, printing to `out`, with the default arena.
pub fn run<S: LineSource, W: Write>(source: S, out: W) -> io::Result<()> {
    run_with_capacity(source, out, DEFAULT_CELLS)
}

/// Runs the loop with an arena bounded at `cells`.
pub fn run_with_capacity<S: LineSource, W: Write>(
    source: S,
    out: W,
    cells: usize,
) -> io::Result<()> {
    let mut machine = Machine::with_capacity(cells, out);
    let mut stream = TokenStream::new(source);

    writeln!(machine.writer(), "LISP Interpreter Run")?;
    loop {
        writeln!(machine.writer())?;
        let e = match read_mexp(&mut stream, machine.heap_mut()) {
            Ok(e) => e,
            Err(ReadError::EndOfInput) => break,
            Err(ReadError::Io(err)) => return Err(err),
        };
        writeln!(machine.writer())?;

        if handle_define(&mut machine, e) {
            continue;
        }
        machine.print("expression", e);
        let v = machine.eval_top(e);
        machine.print("value", v);
    }

    let evals = machine.evals();
    let conses = machine.heap().allocated();
    writeln!(machine.writer(), "End of LISP Run")?;
    writeln!(machine.writer())?;
    writeln!(machine.writer(), "Calls to eval = {}", evals)?;
    writeln!(machine.writer(), "Calls to cons = {}", conses)?;
    Ok(())
}

/// Processes `e` as a definition if it is one; returns whether it was.
fn handle_define<W: Write>(machine: &mut Machine<W>, e: CellId) -> bool {
    let heap = machine.heap_mut();
    let syms = *heap.symbols();

    let mut form = e;
    if heap.is_pair(form) && heap.cdr(form).is_nil() {
        let head = heap.car(form);
        if heap.is_pair(head) && heap.car(head) == syms.define {
            form = head;
        }
    }
    if !heap.is_pair(form) || heap.car(form) != syms.define {
        return false;
    }

    let rest = heap.cdr(form);
    let mut name = heap.car(rest);
    let mut def = {
        let tail = heap.cdr(rest);
        heap.car(tail)
    };
    if heap.is_pair(name) {
        // define (f p₁ …) body  ⇒  f gets (lambda (p₁ …) body)
        let vars = heap.cdr(name);
        name = heap.car(name);
        let tail = heap.cons(def, CellId::NIL);
        let tail = heap.cons(vars, tail);
        def = heap.cons(syms.lambda, tail);
    }

    machine.print("define", name);
    machine.print("value", def);
    let heap = machine.heap_mut();
    if heap.is_symbol(name) {
        heap.set_binding(name, def);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalisp_language::EchoLines;

    fn transcript(program: &str) -> String {
        let mut out = Vec::new();
        let source = EchoLines::silent(program.as_bytes());
        run(source, &mut out).expect("driver failed");
        String::from_utf8(out).expect("transcript is ASCII")
    }

    #[test]
    fn banner_and_end_of_run_report() {
        let text = transcript("");
        assert!(text.starts_with("LISP Interpreter Run\n"));
        assert!(text.contains("End of LISP Run\n"));
        assert!(text.contains("Calls to eval = "));
        assert!(text.contains("Calls to cons = "));
    }

    #[test]
    fn expressions_print_with_labels() {
        let text = transcript("(+ 2 3)\n");
        assert!(text.contains("expression  ((+ 2 3))\n"));
        assert!(text.contains("value       5\n"));
    }

    #[test]
    fn bare_define_binds_the_name() {
        let text = transcript("define x 5\nx\n");
        assert!(text.contains("define      x\n"));
        assert!(text.contains("value       5\n"));
    }

    #[test]
    fn parenthesised_define_unwraps() {
        let text = transcript("(define (double n) (+ n n))\n(double 21)\n");
        assert!(text.contains("define      double\n"));
        assert!(text.contains("value       42\n"));
    }

    #[test]
    fn definitions_survive_across_expressions() {
        let text = transcript("define (inc n) + n 1\n(inc (inc 0))\n");
        assert!(text.contains("value       (lambda (n) (+ n 1))\n"));
        assert!(text.contains("value       2\n"));
    }

    #[test]
    fn consumed_source_lines_reach_the_echo_sink() {
        let mut echoed = Vec::new();
        let program = "(+ 2 3)\n";
        let source = EchoLines::new(program.as_bytes(), &mut echoed);
        let mut out = Vec::new();
        run(source, &mut out).expect("driver failed");
        assert_eq!(echoed, program.as_bytes());
    }
}
