//! Trace-level statements: the concrete payloads an abstract error trace is
//! lifted to, with weakest preconditions and SSA constraints.

use crate::expr::{Expr, VarName};
use crate::program::{FunId, Program, VarId};
use crate::types::BinOp;
use std::collections::HashMap;

/// A statement as it appears in a flat error trace.
///
/// `Return` is synthetic: it closes the bracket a `Call` opens and never
/// occurs in program code.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceStmt {
    /// Concrete (simple or parallel) assignment. Left-hand names are
    /// distinct, enforced when the source program is validated.
    Assign { vars: Vec<VarName>, exprs: Vec<Expr> },
    /// Concrete condition (already negated for else-branches).
    Assume(Expr),
    /// Assertion failure marker; only `assert(false)` survives abstraction.
    Assert,
    Call(FunId),
    Return,
    Skip,
}

impl TraceStmt {
    /// Weakest liberal precondition of `phi` over this statement.
    ///
    /// `Call` and `Return` do not touch the formula logically; they shift
    /// the mask depth so locals of inactive frames are immune to the
    /// substitutions performed for enclosing assignments.
    pub fn wp(&self, phi: &Expr, prog: &Program) -> Expr {
        match self {
            TraceStmt::Assign { vars, exprs } => {
                let mut map = HashMap::new();
                for (v, e) in vars.iter().zip(exprs.iter()) {
                    map.insert(v.name.clone(), e.clone());
                }
                phi.replace(&map)
            }
            TraceStmt::Assume(cond) => Expr::or(phi.clone(), Expr::not(cond.clone())),
            TraceStmt::Assert => Expr::Bool(false),
            TraceStmt::Call(_) => phi.pop_mask(prog),
            TraceStmt::Return => phi.push_mask(prog),
            TraceStmt::Skip => phi.clone(),
        }
    }

    /// SSA constraint of this statement under the version map `sigma`,
    /// mutating `sigma` to the post-state versions.
    ///
    /// Calls, returns and asserts contribute `true`: the call stack is
    /// handled by the version-map stack in the constraint walk, and the
    /// failing assert has already been encoded by the surrounding assumes.
    pub fn con(&self, sigma: &mut HashMap<VarId, usize>, prog: &Program) -> Expr {
        match self {
            TraceStmt::Assign { vars, exprs } => {
                let rhss: Vec<Expr> = exprs.iter().map(|e| versioned(e, sigma, prog)).collect();
                for v in vars {
                    if let Some(decl) = v.decl {
                        *sigma.entry(decl).or_insert(0) += 1;
                    }
                }
                let lhss: Vec<Expr> = vars
                    .iter()
                    .map(|v| versioned(&Expr::Var(v.clone()), sigma, prog))
                    .collect();
                let mut conj: Option<Expr> = None;
                for (l, r) in lhss.into_iter().zip(rhss.into_iter()) {
                    let eq = Expr::binary(BinOp::Eq, l, r);
                    conj = Some(match conj {
                        None => eq,
                        Some(c) => Expr::and(c, eq),
                    });
                }
                conj.unwrap_or(Expr::Bool(true))
            }
            TraceStmt::Assume(cond) => versioned(cond, sigma, prog),
            TraceStmt::Assert | TraceStmt::Call(_) | TraceStmt::Return | TraceStmt::Skip => {
                Expr::Bool(true)
            }
        }
    }
}

/// Substitute every variable tracked in `sigma` by its current SSA constant.
fn versioned(e: &Expr, sigma: &HashMap<VarId, usize>, prog: &Program) -> Expr {
    let mut map = HashMap::new();
    for (&decl, &version) in sigma {
        map.insert(
            prog.var(decl).name.clone(),
            Expr::SymConst { decl, version },
        );
    }
    e.replace(&map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{FunDef, Scope, VarDef};
    use crate::types::Ty;

    fn prog() -> Program {
        Program {
            vars: vec![
                VarDef {
                    name: "x".into(),
                    ty: Ty::Int,
                    scope: Scope::Global,
                },
                VarDef {
                    name: "l".into(),
                    ty: Ty::Int,
                    scope: Scope::Local(FunId(0)),
                },
            ],
            funs: vec![FunDef {
                name: "main".into(),
                locals: vec![VarId(1)],
                body: vec![],
            }],
        }
    }

    #[test]
    fn wp_of_assignment_substitutes() {
        let p = prog();
        // wp(x = x + 1, x == 2)  ==  x + 1 == 2
        let stmt = TraceStmt::Assign {
            vars: vec![VarName::of(&p, VarId(0))],
            exprs: vec![Expr::binary(
                BinOp::Add,
                Expr::var_of(&p, VarId(0)),
                Expr::Int(1),
            )],
        };
        let phi = Expr::eq(Expr::var_of(&p, VarId(0)), Expr::Int(2));
        let got = stmt.wp(&phi, &p);
        assert_eq!(
            got,
            Expr::eq(
                Expr::binary(BinOp::Add, Expr::var_of(&p, VarId(0)), Expr::Int(1)),
                Expr::Int(2)
            )
        );
    }

    #[test]
    fn wp_of_assume_is_disjunction() {
        let p = prog();
        let stmt = TraceStmt::Assume(Expr::Bool(true));
        let phi = Expr::Bool(false);
        assert_eq!(
            stmt.wp(&phi, &p),
            Expr::or(Expr::Bool(false), Expr::not(Expr::Bool(true)))
        );
    }

    #[test]
    fn wp_of_return_masks_locals_against_caller_substitution() {
        let p = prog();
        // After Return, the callee's `l` must not be captured by an
        // assignment to the caller's `l`.
        let phi = Expr::eq(Expr::var_of(&p, VarId(1)), Expr::Int(7));
        let masked = TraceStmt::Return.wp(&phi, &p);
        let assign = TraceStmt::Assign {
            vars: vec![VarName::of(&p, VarId(1))],
            exprs: vec![Expr::Int(0)],
        };
        let after = assign.wp(&masked, &p);
        // still mentions the masked `l`, not the constant 0
        assert!(after.contains("l"));
        // Call unmasks again
        let unmasked = TraceStmt::Call(FunId(0)).wp(&after, &p);
        assert!(!unmasked.contains_masked_var());
    }

    #[test]
    fn con_of_assignment_bumps_version() {
        let p = prog();
        let stmt = TraceStmt::Assign {
            vars: vec![VarName::of(&p, VarId(0))],
            exprs: vec![Expr::Int(1)],
        };
        let mut sigma = HashMap::new();
        let c = stmt.con(&mut sigma, &p);
        assert_eq!(sigma.get(&VarId(0)), Some(&1));
        assert_eq!(
            c,
            Expr::binary(
                BinOp::Eq,
                Expr::SymConst {
                    decl: VarId(0),
                    version: 1
                },
                Expr::Int(1)
            )
        );
    }

    #[test]
    fn con_of_assignment_reads_pre_versions() {
        let p = prog();
        // x = x + 1 with sigma[x] = 3  gives  x@4 == x@3 + 1
        let stmt = TraceStmt::Assign {
            vars: vec![VarName::of(&p, VarId(0))],
            exprs: vec![Expr::binary(
                BinOp::Add,
                Expr::var_of(&p, VarId(0)),
                Expr::Int(1),
            )],
        };
        let mut sigma = HashMap::new();
        sigma.insert(VarId(0), 3);
        let c = stmt.con(&mut sigma, &p);
        assert_eq!(
            c,
            Expr::binary(
                BinOp::Eq,
                Expr::SymConst {
                    decl: VarId(0),
                    version: 4
                },
                Expr::binary(
                    BinOp::Add,
                    Expr::SymConst {
                        decl: VarId(0),
                        version: 3
                    },
                    Expr::Int(1)
                )
            )
        );
    }

    #[test]
    fn con_of_call_and_return_is_true() {
        let p = prog();
        let mut sigma = HashMap::new();
        assert_eq!(TraceStmt::Call(FunId(0)).con(&mut sigma, &p), Expr::Bool(true));
        assert_eq!(TraceStmt::Return.con(&mut sigma, &p), Expr::Bool(true));
        assert_eq!(TraceStmt::Assert.con(&mut sigma, &p), Expr::Bool(true));
    }
}
