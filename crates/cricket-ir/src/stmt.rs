//! Statements: structured control flow plus the traceable statement forms.

use crate::expr::{Expr, VarName};
use crate::program::FunId;
use crate::trace::TraceStmt;

/// Statement node.
///
/// Traceable statements (assignment, assume, assert, call, skip) carry an
/// optional `origin`: the concrete-program payload that abstraction attaches
/// so that an abstract error trace can be lifted back to concrete
/// statements. Concrete programs leave it `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Ite {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    Call {
        name: String,
        decl: Option<FunId>,
    },
    Assign {
        var: VarName,
        expr: Expr,
        origin: Option<Box<TraceStmt>>,
    },
    ParallelAssign {
        vars: Vec<VarName>,
        exprs: Vec<Expr>,
        origin: Option<Box<TraceStmt>>,
    },
    Assume {
        cond: Expr,
        origin: Option<Box<TraceStmt>>,
    },
    Assert {
        cond: Expr,
        origin: Option<Box<TraceStmt>>,
    },
    Skip {
        origin: Option<Box<TraceStmt>>,
    },
    /// Comment breadcrumb inserted by abstraction; a semantic no-op.
    Doc(String),
}

impl Stmt {
    pub fn assign(var: VarName, expr: Expr) -> Stmt {
        Stmt::Assign {
            var,
            expr,
            origin: None,
        }
    }

    pub fn parallel_assign(vars: Vec<VarName>, exprs: Vec<Expr>) -> Stmt {
        Stmt::ParallelAssign {
            vars,
            exprs,
            origin: None,
        }
    }

    pub fn assume(cond: Expr) -> Stmt {
        Stmt::Assume { cond, origin: None }
    }

    pub fn assert(cond: Expr) -> Stmt {
        Stmt::Assert { cond, origin: None }
    }

    pub fn skip() -> Stmt {
        Stmt::Skip { origin: None }
    }

    pub fn call(name: impl Into<String>) -> Stmt {
        Stmt::Call {
            name: name.into(),
            decl: None,
        }
    }

    /// Whether the statement can appear in an error trace.
    pub fn is_traceable(&self) -> bool {
        matches!(
            self,
            Stmt::Call { .. }
                | Stmt::Assign { .. }
                | Stmt::ParallelAssign { .. }
                | Stmt::Assume { .. }
                | Stmt::Assert { .. }
                | Stmt::Skip { .. }
        )
    }
}
