//! Labelled, column-wrapped console output and flat serialisation.
//!
//! Console emissions carry a 12-column left-justified label (`expression`,
//! `value`, `define`, `display`, `debug`) and hard-wrap at column 50;
//! continuation lines are indented under the label. The wrap may fall in
//! the middle of a token — the column counter is the only authority.
//!
//! [`sexp_string`] is the unwrapped twin used by `bits`, which serialises a
//! cell to the exact character sequence whose bytes go onto the bit list.

use std::io::{self, Write};

use metalisp_base::{CellId, Heap};

/// Width of the hard wrap applied to console output.
const WRAP_COLUMN: usize = 50;

/// Width of the label field; continuation lines indent by the same amount.
const LABEL_WIDTH: usize = 12;

/// Console printer; tracks the output column across one emission.
pub struct Printer {
    col: usize,
}

impl Printer {
    pub fn new() -> Printer {
        Printer { col: 0 }
    }

    /// Prints `label`, the serialised form of `x`, and a newline.
    pub fn print<W: Write>(
        &mut self,
        heap: &Heap,
        out: &mut W,
        label: &str,
        x: CellId,
    ) -> io::Result<()> {
        write!(out, "{:<width$}", label, width = LABEL_WIDTH)?;
        self.col = 0;
        self.print_cell(heap, out, x)?;
        writeln!(out)
    }

    fn print_cell<W: Write>(&mut self, heap: &Heap, out: &mut W, x: CellId) -> io::Result<()> {
        if let Some(n) = heap.numeral(x) {
            let text = n.to_string();
            for b in text.bytes() {
                self.put(out, b)?;
            }
            return Ok(());
        }
        if let Some(name) = heap.name(x) {
            for b in name.bytes() {
                self.put(out, b)?;
            }
            return Ok(());
        }
        self.put(out, b'(')?;
        let mut cur = x;
        while heap.is_pair(cur) {
            self.print_cell(heap, out, heap.car(cur))?;
            cur = heap.cdr(cur);
            if heap.is_pair(cur) {
                self.put(out, b' ')?;
            }
        }
        self.put(out, b')')
    }

    fn put<W: Write>(&mut self, out: &mut W, b: u8) -> io::Result<()> {
        if self.col == WRAP_COLUMN {
            write!(out, "\n{:<width$}", "", width = LABEL_WIDTH)?;
            self.col = 1;
        } else {
            self.col += 1;
        }
        out.write_all(std::slice::from_ref(&b))
    }
}

impl Default for Printer {
    fn default() -> Printer {
        Printer::new()
    }
}

/// Serialises `x` without labels or wrapping.
pub fn sexp_string(heap: &Heap, x: CellId) -> String {
    let mut text = String::new();
    push_sexp(heap, x, &mut text);
    text
}

fn push_sexp(heap: &Heap, x: CellId, text: &mut String) {
    if let Some(n) = heap.numeral(x) {
        text.push_str(&n.to_string());
        return;
    }
    if let Some(name) = heap.name(x) {
        text.push_str(name);
        return;
    }
    text.push('(');
    let mut cur = x;
    while heap.is_pair(cur) {
        push_sexp(heap, heap.car(cur), text);
        cur = heap.cdr(cur);
        if heap.is_pair(cur) {
            text.push(' ');
        }
    }
    text.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalisp_base::{Big, ListBuilder};

    fn printed(heap: &Heap, label: &str, x: CellId) -> String {
        let mut out = Vec::new();
        Printer::new().print(heap, &mut out, label, x).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn labels_left_justify_in_twelve_columns() {
        let mut heap = Heap::new();
        let n = heap.mk_num(Big::from(5u64));
        assert_eq!(printed(&heap, "value", n), "value       5\n");
        assert_eq!(printed(&heap, "expression", n), "expression  5\n");
    }

    #[test]
    fn the_zero_numeral_prints_as_a_digit() {
        let mut heap = Heap::new();
        let z = heap.mk_num(Big::zero());
        assert_eq!(printed(&heap, "value", z), "value       0\n");
    }

    #[test]
    fn nil_prints_as_the_empty_list() {
        let heap = Heap::new();
        assert_eq!(printed(&heap, "value", CellId::NIL), "value       ()\n");
    }

    #[test]
    fn lists_print_space_separated() {
        let mut heap = Heap::new();
        let a = heap.lookup_word("a");
        let n = heap.mk_num(Big::from(10u64));
        let mut items = ListBuilder::new(&mut heap);
        items.push(&mut heap, a);
        items.push(&mut heap, n);
        items.push(&mut heap, CellId::NIL);
        let list = items.finish(&heap);
        assert_eq!(sexp_string(&heap, list), "(a 10 ())");
        assert_eq!(printed(&heap, "value", list), "value       (a 10 ())\n");
    }

    #[test]
    fn long_output_wraps_at_column_fifty() {
        let mut heap = Heap::new();
        let word = heap.lookup_word("abcdefghij");
        let mut items = ListBuilder::new(&mut heap);
        for _ in 0..6 {
            items.push(&mut heap, word);
        }
        let list = items.finish(&heap);
        let text = printed(&heap, "value", list);
        let lines: Vec<&str> = text.lines().collect();
        // (abcdefghij x6) is 67 characters: one wrap.
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), LABEL_WIDTH + WRAP_COLUMN);
        assert!(lines[1].starts_with("            "));
        let merged = format!("{}{}", &lines[0][LABEL_WIDTH..], &lines[1][LABEL_WIDTH..]);
        assert_eq!(merged, sexp_string(&heap, list));
    }

    #[test]
    fn wrap_may_split_a_token() {
        let mut heap = Heap::new();
        let long = heap.lookup_word(&"x".repeat(60));
        let text = printed(&heap, "value", long);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].len(), LABEL_WIDTH + WRAP_COLUMN);
        assert_eq!(lines[1], format!("{:<12}{}", "", "x".repeat(10)));
    }
}
