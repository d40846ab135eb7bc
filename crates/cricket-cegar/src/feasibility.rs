//! Spuriousness test: fold weakest preconditions backwards over the trace.

use cricket_ir::{Expr, Program, TraceStmt};
use cricket_smt::{Oracle, SmtResult};

/// A trace is spurious iff folding `wp` right-to-left from `false` yields a
/// tautology: no concrete execution can follow the abstract path.
pub fn is_spurious(prog: &Program, trace: &[TraceStmt], oracle: &mut Oracle) -> SmtResult<bool> {
    let mut phi = Expr::Bool(false);
    for stmt in trace.iter().rev() {
        phi = stmt.wp(&phi, prog);
    }
    oracle.is_taut_expr(&phi, prog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_ir::{BinOp, Program, Ty, VarName};

    fn prog() -> Program {
        let mut p = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![("main".into(), vec![], vec![])],
        );
        cricket_ir::validate::validate_program(&mut p).unwrap();
        p
    }

    fn assign(p: &Program, value: i64) -> TraceStmt {
        let decl = p.global_by_name("x").unwrap();
        TraceStmt::Assign {
            vars: vec![VarName::of(p, decl)],
            exprs: vec![Expr::Int(value)],
        }
    }

    fn assume_x_eq(p: &Program, value: i64, negated: bool) -> TraceStmt {
        let decl = p.global_by_name("x").unwrap();
        let cmp = Expr::binary(BinOp::Eq, Expr::var_of(p, decl), Expr::Int(value));
        TraceStmt::Assume(if negated { Expr::not(cmp) } else { cmp })
    }

    #[test]
    fn contradicting_trace_is_spurious() {
        let p = prog();
        // x := 1; assume(!(x == 1)); assert
        let trace = vec![assign(&p, 1), assume_x_eq(&p, 1, true), TraceStmt::Assert];
        let mut oracle = Oracle::new();
        assert!(is_spurious(&p, &trace, &mut oracle).unwrap());
    }

    #[test]
    fn witnessed_trace_is_not_spurious() {
        let p = prog();
        // x := 0; assume(x == 0); assert
        let trace = vec![assign(&p, 0), assume_x_eq(&p, 0, false), TraceStmt::Assert];
        let mut oracle = Oracle::new();
        assert!(!is_spurious(&p, &trace, &mut oracle).unwrap());
    }
}
