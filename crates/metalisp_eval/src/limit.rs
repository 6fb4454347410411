//! Step budgets and exhaustion outcomes.
//!
//! A budget bounds the depth of nested non-primitive applications: every
//! frame that applies a lambda (or enters `eval`/`try`) charges one step and
//! hands the smaller budget to its subframes. Primitives are free.
//!
//! Exhaustion is not an error in the host sense — it is a first-class
//! evaluator outcome that flows up the ordinary return path until a `try`
//! converts it into data. [`EvalResult`] is the tagged-sum rendering of
//! that channel.

use std::fmt;

use metalisp_base::{Big, CellId};

/// A non-value evaluator outcome.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Exhaustion {
    /// The step budget reached zero before the expression completed.
    OutOfTime,
    /// A `read-bit` or `read-exp` ran off the end of the current tape.
    OutOfData,
}

impl fmt::Display for Exhaustion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exhaustion::OutOfTime => f.write_str("out-of-time"),
            Exhaustion::OutOfData => f.write_str("out-of-data"),
        }
    }
}

impl std::error::Error for Exhaustion {}

/// A cell on success, a pending exhaustion otherwise.
pub type EvalResult = std::result::Result<CellId, Exhaustion>;

/// The remaining step budget of an evaluation path.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Limit {
    /// The `no-time-limit` sentinel: above every numeral.
    Unlimited,
    /// A numeral budget; zero steps means the next charge exhausts.
    Steps(Big),
}

impl Limit {
    /// Charges one step, yielding the budget for subframes.
    ///
    /// Charging an already empty budget is the out-of-time transition.
    pub fn charge(&self) -> Result<Limit, Exhaustion> {
        match self {
            Limit::Unlimited => Ok(Limit::Unlimited),
            Limit::Steps(n) if n.is_zero() => Err(Exhaustion::OutOfTime),
            Limit::Steps(n) => Ok(Limit::Steps(n.pred())),
        }
    }

    /// Resolves the budget a nested `try` runs under.
    ///
    /// The effective budget is the smaller of the requested and current
    /// budgets, with `Unlimited` above everything. The flag is `true` when
    /// the current budget is the binding one — an `out-of-time` arising
    /// under it must be re-raised to the enclosing scope rather than caught.
    pub fn clamp(requested: Limit, current: &Limit) -> (Limit, bool) {
        let current_binds = match (&requested, current) {
            (Limit::Unlimited, _) => true,
            (_, Limit::Unlimited) => false,
            (Limit::Steps(r), Limit::Steps(c)) => r >= c,
        };
        if current_binds {
            (current.clone(), true)
        } else {
            (requested, false)
        }
    }
}
