//! # metalisp-language
//!
//! The textual surface of the metalisp dialect: tokenisation, the
//! M-expression reader with its sugar expansions, and the labelled printer.
//!
//! The surface has two grammars sharing one reader:
//!
//! - **M-expressions**, the console syntax, where known heads carry a prefix
//!   arity (`cadr x`, `let n d b`, …) and `[ … ]` brackets are comments;
//! - **S-expressions**, the inner syntax with no sugar at all, entered for
//!   one expression by `"` and used for tape-encoded records read by
//!   `read-exp`.
//!
//! Reading allocates directly into the shared [`Heap`](metalisp_base::Heap):
//! tokens *are* cells, and comparing a token against a punctuator means
//! comparing atom identities.

pub mod lexer;
pub mod printer;
pub mod reader;

pub use lexer::{EchoLines, LineSource, ReadError, TokenStream};
pub use printer::{sexp_string, Printer};
pub use reader::{parse_record, read_mexp};
