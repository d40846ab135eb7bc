//! Craig interpolation of SSA constraint sequences.
//!
//! For each cut `i` of the constraint sequence, the prefix
//! `A = c_0 ∧ … ∧ c_i` and suffix `B = c_{i+1} ∧ … ∧ c_{n-1}` are
//! separated by the strongest interpolant `∃ locals(A). A`, where
//! `locals(A)` are the symbols occurring in the prefix but not in the
//! suffix. The quantifier is eliminated with the solver's `qe` tactic — a
//! minimal safe wrapper over the raw API — so the result is a
//! quantifier-free formula over the shared vocabulary with `A ⊨ I` and
//! `I ∧ B` unsatisfiable. Both properties are verified before the
//! interpolant is accepted; any failure aborts the analysis.

use crate::encode::{collect_symbols, encode_bool};
use crate::oracle::Oracle;
use crate::term::term_to_expr;
use crate::{SmtError, SmtResult};
use cricket_ir::{Expr, Program, Ty};
use tracing::{debug, trace};
use z3::ast::{Ast, Bool, Dynamic, Int};
use z3::Context;
use z3_sys::{Z3_ast, Z3_context};

/// Compute the interpolant sequence for `constraints`; returns one
/// interpolant per cut (`len - 1` in total).
///
/// The returned expressions mention scope-prefixed variable names as
/// produced by the SSA encoding; resolve them against the program before
/// use.
pub fn interpolate_sequence(prog: &Program, constraints: &[Expr]) -> SmtResult<Vec<Expr>> {
    if constraints.len() < 2 {
        return Ok(Vec::new());
    }

    let encoded: Vec<Bool> = constraints
        .iter()
        .map(|c| encode_bool(c, prog))
        .collect::<SmtResult<_>>()?;
    let symbols: Vec<Vec<(String, Ty)>> = constraints
        .iter()
        .map(|c| {
            let mut syms = Vec::new();
            collect_symbols(c, prog, &mut syms);
            syms
        })
        .collect();

    let mut oracle = Oracle::new();
    let mut interpolants = Vec::with_capacity(constraints.len() - 1);
    for i in 0..constraints.len() - 1 {
        let a: Vec<Bool> = encoded[..=i].to_vec();
        let b: Vec<Bool> = encoded[i + 1..].to_vec();

        // symbols private to the prefix get existentially quantified
        let suffix_syms: Vec<&(String, Ty)> = symbols[i + 1..].iter().flatten().collect();
        let mut prefix_only: Vec<(String, Ty)> = Vec::new();
        for sym in symbols[..=i].iter().flatten() {
            if !suffix_syms.iter().any(|(n, _)| n == &sym.0)
                && !prefix_only.iter().any(|(n, _)| n == &sym.0)
            {
                prefix_only.push(sym.clone());
            }
        }

        let interpolant = project(&a, &prefix_only)?;
        trace!(cut = i, interpolant = %interpolant, "interpolant candidate");

        // A ⊨ I and I ∧ B unsat, in the shared vocabulary by construction
        let i_encoded = encode_bool(&interpolant, prog)?;
        let a_conj = Bool::and(&a);
        if !oracle.implies(&a_conj, &i_encoded) {
            return Err(SmtError::Interpolation(format!(
                "candidate at cut {} is not implied by the prefix",
                i
            )));
        }
        let mut with_b = b.clone();
        with_b.push(i_encoded);
        if !oracle.unsat_all(&with_b) {
            return Err(SmtError::Interpolation(format!(
                "candidate at cut {} does not contradict the suffix",
                i
            )));
        }

        interpolants.push(interpolant);
    }

    debug!(count = interpolants.len(), "interpolant sequence complete");
    Ok(interpolants)
}

/// Strongest interpolant: eliminate `bound` from the conjunction of `a`.
fn project(a: &[Bool], bound: &[(String, Ty)]) -> SmtResult<Expr> {
    let ctx = Context::thread_local().get_z3_context();

    let conj = Bool::and(a);
    let body = conj.get_z3_ast();

    // bound constants as raw apps; the high-level values stay alive in
    // `bound_alive` so the raw handles remain valid for the whole call
    let bound_alive: Vec<Dynamic> = bound
        .iter()
        .map(|(name, ty)| match ty {
            Ty::Bool => Dynamic::from_ast(&Bool::new_const(name.clone())),
            Ty::Int => Dynamic::from_ast(&Int::new_const(name.clone())),
        })
        .collect();
    let bound_consts: Vec<z3_sys::Z3_app> = bound_alive
        .iter()
        .map(|d| {
            unsafe { z3_sys::Z3_to_app(ctx, d.get_z3_ast()) }
                .ok_or_else(|| SmtError::Term("bound constant is not an app".into()))
        })
        .collect::<SmtResult<_>>()?;

    let quantified = if bound_consts.is_empty() {
        body
    } else {
        let q = unsafe {
            z3_sys::Z3_mk_exists_const(
                ctx,
                0,
                bound_consts.len() as u32,
                bound_consts.as_ptr(),
                0,
                std::ptr::null(),
                body,
            )
        }
        .ok_or_else(|| SmtError::Interpolation("failed to build quantifier".into()))?;
        unsafe { z3_sys::Z3_inc_ref(ctx, q) };
        q
    };

    let eliminated = eliminate(ctx, quantified)?;
    term_to_expr(ctx, eliminated)
}

/// Run the `qe` tactic on a single formula and return the (conjunction per
/// subgoal, disjunction across subgoals of the) result.
fn eliminate(ctx: Z3_context, formula: Z3_ast) -> SmtResult<Z3_ast> {
    let fail = |msg: &str| SmtError::Interpolation(msg.to_string());

    let tactic = unsafe { z3_sys::Z3_mk_tactic(ctx, c"qe".as_ptr()) }
        .ok_or_else(|| fail("quantifier-elimination tactic unavailable"))?;
    unsafe { z3_sys::Z3_tactic_inc_ref(ctx, tactic) };

    let goal = unsafe { z3_sys::Z3_mk_goal(ctx, false, false, false) }
        .ok_or_else(|| fail("failed to create goal"))?;
    unsafe { z3_sys::Z3_goal_inc_ref(ctx, goal) };
    unsafe { z3_sys::Z3_goal_assert(ctx, goal, formula) };

    let result = unsafe { z3_sys::Z3_tactic_apply(ctx, tactic, goal) }
        .ok_or_else(|| fail("quantifier elimination did not apply"))?;
    unsafe { z3_sys::Z3_apply_result_inc_ref(ctx, result) };

    let num_subgoals = unsafe { z3_sys::Z3_apply_result_get_num_subgoals(ctx, result) };
    let mut disjuncts: Vec<Z3_ast> = Vec::new();
    for i in 0..num_subgoals {
        let subgoal = unsafe { z3_sys::Z3_apply_result_get_subgoal(ctx, result, i) }
            .ok_or_else(|| fail("missing subgoal"))?;
        let size = unsafe { z3_sys::Z3_goal_size(ctx, subgoal) };
        let mut conjuncts: Vec<Z3_ast> = Vec::new();
        for j in 0..size {
            let f = unsafe { z3_sys::Z3_goal_formula(ctx, subgoal, j) }
                .ok_or_else(|| fail("missing goal formula"))?;
            conjuncts.push(f);
        }
        disjuncts.push(mk_connective(ctx, &conjuncts, true)?);
    }
    let combined = mk_connective(ctx, &disjuncts, false)?;
    unsafe { z3_sys::Z3_inc_ref(ctx, combined) };

    unsafe { z3_sys::Z3_apply_result_dec_ref(ctx, result) };
    unsafe { z3_sys::Z3_goal_dec_ref(ctx, goal) };
    unsafe { z3_sys::Z3_tactic_dec_ref(ctx, tactic) };

    Ok(combined)
}

fn mk_connective(ctx: Z3_context, parts: &[Z3_ast], conjunction: bool) -> SmtResult<Z3_ast> {
    match parts.len() {
        0 => {
            let t = if conjunction {
                unsafe { z3_sys::Z3_mk_true(ctx) }
            } else {
                unsafe { z3_sys::Z3_mk_false(ctx) }
            };
            t.ok_or_else(|| SmtError::Term("failed to build constant".into()))
        }
        1 => Ok(parts[0]),
        _ => {
            let made = if conjunction {
                unsafe { z3_sys::Z3_mk_and(ctx, parts.len() as u32, parts.as_ptr()) }
            } else {
                unsafe { z3_sys::Z3_mk_or(ctx, parts.len() as u32, parts.as_ptr()) }
            };
            made.ok_or_else(|| SmtError::Term("failed to build connective".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_ir::{BinOp, Ty, VarId};

    fn prog() -> Program {
        let mut p = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![("main".into(), vec![], vec![])],
        );
        cricket_ir::validate::validate_program(&mut p).unwrap();
        p
    }

    fn at(decl: VarId, version: usize) -> Expr {
        Expr::SymConst { decl, version }
    }

    #[test]
    fn sequence_yields_one_interpolant_per_cut() {
        let p = prog();
        let x = p.global_by_name("x").unwrap();
        // x@1 == 0; x@2 == x@1 + 1; !(x@2 == 1)   (unsatisfiable)
        let constraints = vec![
            Expr::binary(BinOp::Eq, at(x, 1), Expr::Int(0)),
            Expr::binary(
                BinOp::Eq,
                at(x, 2),
                Expr::binary(BinOp::Add, at(x, 1), Expr::Int(1)),
            ),
            Expr::not(Expr::binary(BinOp::Eq, at(x, 2), Expr::Int(1))),
        ];
        let interpolants = interpolate_sequence(&p, &constraints).unwrap();
        assert_eq!(interpolants.len(), 2);

        // the second interpolant separates x@2 == 1 from its negation and
        // mentions only the shared symbol, so it resolves to the program
        // variable
        let resolved = interpolants[1].resolve_interpolant_names(&p).unwrap();
        let mut candidates = Vec::new();
        resolved.collect_candidate_predicates(&p, &mut candidates);
        assert!(!candidates.is_empty());
    }

    #[test]
    fn short_sequences_have_no_cuts() {
        let p = prog();
        let x = p.global_by_name("x").unwrap();
        let constraints = vec![Expr::binary(BinOp::Eq, at(x, 1), Expr::Int(0))];
        assert!(interpolate_sequence(&p, &constraints).unwrap().is_empty());
    }
}
