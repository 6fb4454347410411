//! # metalisp-base
//!
//! Pure structural atoms for the metalisp interpreter.
//!
//! This crate provides the foundational types the higher tiers build on:
//!
//! - [`Heap`] — the bounded, monotonically growing cell arena
//! - [`CellId`]/[`Cell`] — stable integer identities and the tagged object model
//! - [`Symbols`] — the well-known atoms installed at bootstrap
//! - [`Big`] — arbitrary-precision non-negative integers over decimal digits
//!
//! # Design Principles
//!
//! This crate has **no knowledge of syntax or I/O**. Everything the reader
//! and the evaluator share — cells, atoms, interning, numerals — lives here,
//! so that either side can be replaced without touching the other.
//!
//! # Example
//!
//! ```
//! use metalisp_base::{Big, CellId, Heap};
//!
//! let mut heap = Heap::new();
//! let a = heap.lookup_word("a");
//! let n = heap.mk_num(Big::from(42u64));
//! let rest = heap.cons(n, CellId::NIL);
//! let pair = heap.cons(a, rest);
//!
//! assert_eq!(heap.car(pair), a);
//! assert_eq!(heap.lookup_word("a"), a);
//! ```

pub mod bignum;
pub mod cell;
pub mod heap;

pub use bignum::Big;
pub use cell::{AtomCell, Cell, CellId, Prim};
pub use heap::{Heap, ListBuilder, Symbols};
