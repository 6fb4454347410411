//! E2E: evaluation semantics through the console surface.

mod common;

use common::assert_value;

#[test]
fn quote_protects_its_argument() {
    assert_value("'x\n", "x");
    assert_value("'(+ 1 2)\n", "((+ 1 2))");
    // " switches the reader to S-mode; the quote keeps the result as data
    // through evaluation.
    assert_value("'\"(cadr x)\n", "(cadr x)");
}

#[test]
fn if_branches_on_false_only() {
    assert_value("(if true 1 2)\n", "1");
    assert_value("(if false 1 2)\n", "2");
    assert_value("(if '(x) 1 2)\n", "1");
}

#[test]
fn bignum_arithmetic_exceeds_machine_words() {
    assert_value(
        "(* 99999999999999999999 99999999999999999999)\n",
        "9999999999999999999800000000000000000001",
    );
    assert_value("(^ 2 100)\n", "1267650600228229401496703205376");
    assert_value("(- 3 5)\n", "0");
    assert_value("(+ 999 1)\n", "1000");
}

#[test]
fn list_primitives() {
    assert_value("(car '(a b))\n", "a");
    assert_value("(cdr '(a b))\n", "(b)");
    assert_value("(cons 'a '(b c))\n", "(a b c)");
    assert_value("(append '(a b) '(c d))\n", "(a b c d)");
    assert_value("(length '(a b c))\n", "3");
}

#[test]
fn cons_onto_an_atom_degenerates_to_the_head() {
    assert_value("(cons 'a 'b)\n", "a");
    assert_value("(cons '(x) 5)\n", "(x)");
}

#[test]
fn atom_and_equality_predicates() {
    assert_value("(atom 'x)\n", "true");
    assert_value("(atom 5)\n", "true");
    assert_value("(atom '(a))\n", "false");
    assert_value("(= '(a (b 2)) '(a (b 2)))\n", "true");
    assert_value("(= '(a) '(b))\n", "false");
    assert_value("(= 10 010)\n", "true");
}

#[test]
fn base_conversions() {
    assert_value("(base10-to-2 5)\n", "(1 0 1)");
    assert_value("(base10-to-2 0)\n", "()");
    assert_value("(base2-to-10 '(1 0 1))\n", "5");
    assert_value("(base2-to-10 ())\n", "0");
    assert_value("base2-to-10 base10-to-2 98765\n", "98765");
}

#[test]
fn size_measures_serialised_characters() {
    assert_value("(size 'abc)\n", "3");
    assert_value("(size 12345)\n", "5");
    assert_value("(size '(a b))\n", "5");
    assert_value("(size nil)\n", "2");
}

#[test]
fn let_binds_dynamically() {
    assert_value("let x 2 (+ x 1)\n", "3");
    assert_value("let x 1 let x 2 x\n", "2");
}

#[test]
fn let_bindings_unwind_after_the_body() {
    // After the let returns, x is unbound again and self-evaluates.
    assert_eq!(common::values("let x 5 x\nx\n"), vec!["5", "x"]);
}

#[test]
fn function_let_defines_a_local_recursive_function() {
    assert_value(
        "let (f n) (if (= n 0) 1 (* n (f (- n 1)))) (f 6)\n",
        "720",
    );
}

#[test]
fn callee_sees_the_callers_bindings() {
    // Dynamic scope: g has no x of its own and picks up the caller's.
    assert_value("define (g) x\nlet x 7 (g)\n", "7");
}

#[test]
fn eval_runs_under_a_fresh_environment() {
    assert_value("(eval '(+ 1 2))\n", "3");
    assert_value("let x 5 (eval 'x)\n", "x");
}

#[test]
fn lambda_forms_self_evaluate() {
    assert_value("lambda (x) x\n", "(lambda (x) x)");
}
