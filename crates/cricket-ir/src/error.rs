//! IR error types.

use thiserror::Error;

/// A structural or typing constraint of the IR was violated.
///
/// Raised by the post-parse validation pass; fatal to the invocation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("duplicate global variable declaration '{name}'")]
    DuplicateGlobal { name: String },

    #[error("duplicate function declaration '{name}()'")]
    DuplicateFunction { name: String },

    #[error("duplicate local variable declaration '{name}' in function '{fun}()'")]
    DuplicateLocal { fun: String, name: String },

    #[error("no 'main()' function found")]
    MissingMain,

    #[error("variable names must not start with '$': '{name}'")]
    ReservedName { name: String },

    #[error("undeclared variable '{name}' in function '{fun}()'")]
    UndeclaredVariable { fun: String, name: String },

    #[error("call to unknown function '{name}()' in '{fun}()'")]
    UnknownFunction { fun: String, name: String },

    #[error("type error in function '{fun}()': {message}")]
    TypeMismatch { fun: String, message: String },

    #[error("malformed statement in function '{fun}()': {message}")]
    Malformed { fun: String, message: String },

    #[error("predicate refers to undeclared function '{scope}()'")]
    UnknownPredicateScope { scope: String },

    #[error("predicate must be of type 'bool': {pred}")]
    NonBooleanPredicate { pred: String },

    #[error("malformed interpolant variable '{name}'")]
    MalformedInterpolantName { name: String },
}

/// An operation was applied to a node that cannot support it, e.g. encoding
/// `unknown` for the SMT solver, translating arithmetic into a BDD, or
/// abstracting a source-level `assume`. Fatal.
#[derive(Debug, Error)]
#[error("unsupported operation: {0}")]
pub struct UnsupportedOperation(pub String);

pub type IrResult<T> = Result<T, ValidationError>;
