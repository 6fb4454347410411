//! Line-oriented tokenisation for the console surface.
//!
//! Tokenisation happens in two stages, line first, words second:
//!
//! 1. A [`LineSource`] yields raw input lines. The standard adapter,
//!    [`EchoLines`], also copies each consumed line to an echo sink, the way
//!    an interactive run mirrors what it has read.
//! 2. [`TokenStream`] splits a pulled line into words under the separator
//!    discipline of the *current* reader mode, then serves words one at a
//!    time, interning each into the heap as it goes.
//!
//! A line is split completely before any of its words are served; the reader
//! never re-tokenises past a buffered word. Mode therefore only matters at
//! the moment a fresh line is pulled: a `"`-quoted S-expression continuing
//! onto the next line gets that line split with S-mode separators.
//!
//! Words that are all digits become numerals (leading zeros stripped);
//! everything else is interned as an atom. Bytes outside the printable
//! range are dropped.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};

use metalisp_base::{Big, CellId, Heap};

/// Errors surfaced by the console token stream.
#[derive(Debug)]
pub enum ReadError {
    /// The input ran out while more tokens were required.
    EndOfInput,
    /// The underlying reader failed.
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::EndOfInput => f.write_str("end of input"),
            ReadError::Io(err) => write!(f, "input error: {}", err),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::EndOfInput => None,
            ReadError::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> ReadError {
        ReadError::Io(err)
    }
}

/// A source of raw input lines, newline included.
pub trait LineSource {
    /// The next line, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// A [`LineSource`] over a buffered reader that mirrors every consumed line
/// to an echo sink.
///
/// An unterminated final line is served with a newline appended.
pub struct EchoLines<R, W> {
    input: R,
    echo: Option<W>,
}

impl<R: BufRead, W: Write> EchoLines<R, W> {
    /// Echoes each consumed line to `echo`.
    pub fn new(input: R, echo: W) -> EchoLines<R, W> {
        EchoLines {
            input,
            echo: Some(echo),
        }
    }
}

impl<R: BufRead> EchoLines<R, io::Sink> {
    /// No echo; used by tests and `--no-echo` runs.
    pub fn silent(input: R) -> EchoLines<R, io::Sink> {
        EchoLines { input, echo: None }
    }
}

impl<R: BufRead, W: Write> LineSource for EchoLines<R, W> {
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') {
            line.push(b'\n');
        }
        if let Some(echo) = &mut self.echo {
            echo.write_all(&line)?;
        }
        Ok(Some(line))
    }
}

fn is_separator(b: u8, mexp: bool) -> bool {
    match b {
        b' ' | b'\n' | b'(' | b')' => true,
        b'[' | b']' | b'\'' | b'"' => mexp,
        _ => false,
    }
}

/// Splits one line into words under the given mode's separators.
///
/// Punctuators become single-byte words; space and newline only delimit.
/// Non-printable bytes inside words are dropped.
pub(crate) fn split_line(line: &[u8], mexp: bool) -> Vec<Vec<u8>> {
    let mut words = Vec::new();
    let mut word: Vec<u8> = Vec::new();
    for &b in line {
        if is_separator(b, mexp) {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            if b != b' ' && b != b'\n' {
                words.push(vec![b]);
            }
        } else if (33..=126).contains(&b) {
            word.push(b);
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// Turns a word into its cell: a fresh numeral for digit runs, the interned
/// atom otherwise.
pub(crate) fn intern_word(heap: &mut Heap, word: &[u8]) -> CellId {
    match Big::from_ascii_digits(word) {
        Some(n) => heap.mk_num(n),
        // Words are printable ASCII by construction.
        None => {
            let name = std::str::from_utf8(word).expect("word is ASCII");
            heap.lookup_word(name)
        }
    }
}

/// The console token stream: pulls lines on demand, serves interned words.
pub struct TokenStream<S> {
    source: S,
    words: VecDeque<Vec<u8>>,
}

impl<S: LineSource> TokenStream<S> {
    pub fn new(source: S) -> TokenStream<S> {
        TokenStream {
            source,
            words: VecDeque::new(),
        }
    }

    fn next_raw(&mut self, heap: &mut Heap, mexp: bool) -> Result<CellId, ReadError> {
        while self.words.is_empty() {
            match self.source.next_line()? {
                Some(line) => self.words.extend(split_line(&line, mexp)),
                None => return Err(ReadError::EndOfInput),
            }
        }
        let word = self.words.pop_front().expect("word buffer non-empty");
        Ok(intern_word(heap, &word))
    }

    /// The next word as a cell. In M-mode, balanced `[ … ]` comment
    /// brackets (nesting included) are consumed and skipped.
    pub fn next_word(&mut self, heap: &mut Heap, mexp: bool) -> Result<CellId, ReadError> {
        loop {
            let w = self.next_raw(heap, mexp)?;
            if !mexp || w != heap.symbols().lbracket {
                return Ok(w);
            }
            self.skip_comment(heap)?;
        }
    }

    fn skip_comment(&mut self, heap: &mut Heap) -> Result<(), ReadError> {
        loop {
            if self.next_word(heap, true)? == heap.symbols().rbracket {
                return Ok(());
            }
        }
    }
}
