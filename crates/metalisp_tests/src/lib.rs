//! End-to-end tests for the metalisp workspace.
//!
//! Everything lives under `tests/`; this crate exists to anchor them. The
//! `common` module there feeds programs through the real driver loop and
//! dissects the labelled transcript.
