//! Satisfiability-based checks over IR expressions.

use crate::encode::encode_bool;
use crate::SmtResult;
use cricket_ir::{EquivOracle, Expr, Program, UnsupportedOperation};
use tracing::warn;
use z3::ast::Bool;
use z3::{SatResult, Solver};

/// A solver wrapper offering the handful of checks the engine needs:
/// tautology, implication, logical equivalence.
///
/// Each check runs under a push/pop frame, so one oracle can serve a whole
/// CEGAR run. An `unknown` solver verdict is treated as "not proven" and
/// logged.
pub struct Oracle {
    solver: Solver,
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl Oracle {
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
        }
    }

    /// Is the formula valid?
    pub fn is_taut(&mut self, f: &Bool) -> bool {
        self.unsat(&f.not())
    }

    /// Does `lhs` entail `rhs`?
    pub fn implies(&mut self, lhs: &Bool, rhs: &Bool) -> bool {
        self.is_taut(&Bool::or(&[lhs.not(), rhs.clone()]))
    }

    /// Are the two formulas logically equivalent?
    pub fn equals(&mut self, lhs: &Bool, rhs: &Bool) -> bool {
        self.is_taut(&lhs.eq(rhs))
    }

    /// Is the conjunction of the given formulas unsatisfiable?
    pub fn unsat_all(&mut self, fs: &[Bool]) -> bool {
        self.solver.push();
        for f in fs {
            self.solver.assert(f);
        }
        let res = self.solver.check();
        self.solver.pop(1);
        match res {
            SatResult::Unsat => true,
            SatResult::Sat => false,
            SatResult::Unknown => {
                warn!("solver returned unknown; treating as satisfiable");
                false
            }
        }
    }

    fn unsat(&mut self, f: &Bool) -> bool {
        self.unsat_all(std::slice::from_ref(f))
    }

    /// Tautology check on an IR expression.
    pub fn is_taut_expr(&mut self, e: &Expr, prog: &Program) -> SmtResult<bool> {
        let f = encode_bool(e, prog)?;
        Ok(self.is_taut(&f))
    }
}

impl EquivOracle for Oracle {
    fn is_tautology(&mut self, e: &Expr, prog: &Program) -> Result<bool, UnsupportedOperation> {
        let f = encode_bool(e, prog).map_err(|err| UnsupportedOperation(err.to_string()))?;
        Ok(self.is_taut(&f))
    }

    fn equivalent(
        &mut self,
        a: &Expr,
        b: &Expr,
        prog: &Program,
    ) -> Result<bool, UnsupportedOperation> {
        let fa = encode_bool(a, prog).map_err(|err| UnsupportedOperation(err.to_string()))?;
        let fb = encode_bool(b, prog).map_err(|err| UnsupportedOperation(err.to_string()))?;
        Ok(self.equals(&fa, &fb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_ir::{BinOp, Ty};

    fn prog() -> Program {
        let mut p = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![("main".into(), vec![], vec![])],
        );
        cricket_ir::validate::validate_program(&mut p).unwrap();
        p
    }

    #[test]
    fn tautologies_and_contradictions() {
        let p = prog();
        let x = Expr::var_of(&p, p.global_by_name("x").unwrap());
        let mut oracle = Oracle::new();

        // x == x
        let taut = Expr::binary(BinOp::Eq, x.clone(), x.clone());
        assert!(oracle.is_taut_expr(&taut, &p).unwrap());

        // x < x
        let contradiction = Expr::binary(BinOp::Lt, x.clone(), x.clone());
        assert!(!oracle.is_taut_expr(&contradiction, &p).unwrap());
        assert!(oracle
            .is_taut_expr(&Expr::not(contradiction), &p)
            .unwrap());

        // x == 1 is contingent
        let contingent = Expr::binary(BinOp::Eq, x, Expr::Int(1));
        assert!(!oracle.is_taut_expr(&contingent.clone(), &p).unwrap());
        assert!(!oracle.is_taut_expr(&Expr::not(contingent), &p).unwrap());
    }

    #[test]
    fn equivalence_modulo_logic() {
        let p = prog();
        let x = Expr::var_of(&p, p.global_by_name("x").unwrap());
        let mut oracle = Oracle::new();

        // x < 3 is equivalent to x <= 2 over the integers
        let lt = Expr::binary(BinOp::Lt, x.clone(), Expr::Int(3));
        let le = Expr::binary(BinOp::Le, x.clone(), Expr::Int(2));
        assert!(oracle.equivalent(&lt, &le, &p).unwrap());
        let ge = Expr::binary(BinOp::Ge, x, Expr::Int(3));
        assert!(!oracle.equivalent(&lt, &ge, &p).unwrap());
    }

    #[test]
    fn encoding_unknown_is_rejected() {
        let p = prog();
        let mut oracle = Oracle::new();
        assert!(oracle.is_taut_expr(&Expr::Unknown, &p).is_err());
    }
}
