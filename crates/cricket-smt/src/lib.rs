//! SMT oracle for cricket, backed by Z3.
//!
//! Four concerns live here: encoding IR expressions into solver terms,
//! satisfiability-based checks (tautology, implication, equivalence),
//! converting solver terms back into IR expressions, and Craig
//! interpolation of SSA constraint sequences via quantifier elimination.

pub mod encode;
pub mod interpolate;
pub mod oracle;
pub mod term;

use cricket_ir::UnsupportedOperation;
use thiserror::Error;

/// SMT-layer error.
#[derive(Debug, Error)]
pub enum SmtError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    #[error("unresolved variable '{0}' in solver encoding")]
    Unresolved(String),

    #[error("malformed solver term: {0}")]
    Term(String),

    /// The oracle could not produce an interpolant; CEGAR aborts.
    #[error("interpolation failed: {0}")]
    Interpolation(String),
}

pub type SmtResult<T> = Result<T, SmtError>;

pub use interpolate::interpolate_sequence;
pub use oracle::Oracle;
