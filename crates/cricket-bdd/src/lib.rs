//! Hash-consed reduced ordered binary decision diagrams.
//!
//! [`Bdd`] is the manager; [`Ref`] is a cheap copyable handle into it.
//! Variables are indexed by position, and the position order is the
//! diagram order. The operation set is what a symbolic pushdown analysis
//! needs: `ite` and the boolean connectives, equality of two functions,
//! existential abstraction over a variable set, simultaneous substitution
//! of variables by functions (`vector_compose`, which also covers
//! primed/unprimed renaming), and extraction of a single satisfying
//! minterm.
//!
//! The manager uses interior mutability, so callers share `&Bdd` and plain
//! `Ref`s; handles stay valid for the lifetime of the manager.

mod manager;

pub use manager::{Bdd, Ref};
