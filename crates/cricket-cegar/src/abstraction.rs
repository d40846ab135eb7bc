//! Predicate abstraction: concrete program → boolean program.
//!
//! Every predicate becomes a boolean variable (globals for global-scope
//! predicates, locals of their function otherwise). Branch guards become
//! `unknown` with `assume`s of the strongest predicate formula on each
//! side; assertions become a non-deterministic branch into `assert(false)`;
//! assignments update exactly the predicates that mention an assigned
//! variable through weakest-precondition cubes. Each transformed traceable
//! statement carries its concrete origin so error traces can be lifted
//! back.

use crate::cubes::{strongest, weakest, PredInfo};
use crate::CegarError;
use cricket_ir::pred::GLOBAL_SCOPE;
use cricket_ir::{
    validate::validate_program, Expr, PredicateList, Program, Stmt, TraceStmt, Ty,
    UnsupportedOperation, VarName,
};
use cricket_smt::encode::encode_bool;
use cricket_smt::Oracle;
use std::collections::HashMap;

/// Build the boolean abstraction of `prog` under the given predicates.
/// The predicate list must have been validated (names assigned).
pub fn abstract_program(
    prog: &Program,
    preds: &PredicateList,
    oracle: &mut Oracle,
) -> Result<Program, CegarError> {
    let globals: Vec<(String, Ty)> = preds
        .preds_for(GLOBAL_SCOPE)
        .iter()
        .map(|p| (p.var_name().to_string(), Ty::Bool))
        .collect();

    let mut funs = Vec::new();
    for fun in &prog.funs {
        let locals: Vec<(String, Ty)> = preds
            .preds_for(&fun.name)
            .iter()
            .map(|p| (p.var_name().to_string(), Ty::Bool))
            .collect();

        // visible predicates: globals first, then this function's own
        let mut ctx = Vec::new();
        for p in preds
            .preds_for(GLOBAL_SCOPE)
            .iter()
            .chain(preds.preds_for(&fun.name).iter())
        {
            ctx.push(PredInfo {
                var_name: p.var_name().to_string(),
                expr: p.expr.clone(),
                repr: encode_bool(&p.expr, prog)?,
            });
        }

        let mut body = Vec::new();
        for stmt in &fun.body {
            body.extend(abstract_stmt(stmt, &ctx, prog, oracle)?);
        }
        funs.push((fun.name.clone(), locals, body));
    }

    let mut out = Program::new(globals, funs);
    validate_program(&mut out)?;
    Ok(out)
}

fn abstract_stmt(
    stmt: &Stmt,
    ctx: &[PredInfo],
    prog: &Program,
    oracle: &mut Oracle,
) -> Result<Vec<Stmt>, CegarError> {
    match stmt {
        Stmt::While { cond, body } => {
            let encoded = encode_bool(cond, prog)?;
            let pos = strongest(oracle, ctx, &encoded);
            let neg = strongest(oracle, ctx, &encoded.not());

            let mut inner = vec![Stmt::Assume {
                cond: pos,
                origin: Some(Box::new(TraceStmt::Assume(cond.clone()))),
            }];
            for s in body {
                inner.extend(abstract_stmt(s, ctx, prog, oracle)?);
            }

            Ok(vec![
                Stmt::Doc(format!("while ({})", cond)),
                Stmt::While {
                    cond: Expr::Unknown,
                    body: inner,
                },
                Stmt::Assume {
                    cond: neg,
                    origin: Some(Box::new(TraceStmt::Assume(Expr::not(cond.clone())))),
                },
            ])
        }
        Stmt::Ite {
            cond,
            then_body,
            else_body,
        } => {
            let encoded = encode_bool(cond, prog)?;
            let pos = strongest(oracle, ctx, &encoded);
            let neg = strongest(oracle, ctx, &encoded.not());

            let mut then_stmts = vec![Stmt::Assume {
                cond: pos,
                origin: Some(Box::new(TraceStmt::Assume(cond.clone()))),
            }];
            for s in then_body {
                then_stmts.extend(abstract_stmt(s, ctx, prog, oracle)?);
            }

            // the else branch is always materialised
            let mut else_stmts = vec![Stmt::Assume {
                cond: neg,
                origin: Some(Box::new(TraceStmt::Assume(Expr::not(cond.clone())))),
            }];
            if let Some(els) = else_body {
                for s in els {
                    else_stmts.extend(abstract_stmt(s, ctx, prog, oracle)?);
                }
            }

            Ok(vec![
                Stmt::Doc(format!("if ({})", cond)),
                Stmt::Ite {
                    cond: Expr::Unknown,
                    then_body: then_stmts,
                    else_body: Some(else_stmts),
                },
            ])
        }
        Stmt::Assert { cond, .. } => {
            // assert(c) behaves like: if (c) {} else { assert(false); }
            let encoded = encode_bool(cond, prog)?;
            let pos = strongest(oracle, ctx, &encoded);
            let neg = strongest(oracle, ctx, &encoded.not());

            Ok(vec![
                Stmt::Doc(format!("assert({})", cond)),
                Stmt::Ite {
                    cond: Expr::Unknown,
                    then_body: vec![Stmt::Assume {
                        cond: pos,
                        origin: Some(Box::new(TraceStmt::Assume(cond.clone()))),
                    }],
                    else_body: Some(vec![
                        Stmt::Assume {
                            cond: neg,
                            origin: Some(Box::new(TraceStmt::Assume(Expr::not(cond.clone())))),
                        },
                        Stmt::Assert {
                            cond: Expr::Bool(false),
                            origin: Some(Box::new(TraceStmt::Assert)),
                        },
                    ]),
                },
            ])
        }
        Stmt::Call { name, .. } => Ok(vec![Stmt::call(name.clone())]),
        Stmt::Assign { var, expr, .. } => abstract_assignment(
            std::slice::from_ref(var),
            std::slice::from_ref(expr),
            ctx,
            prog,
            oracle,
        ),
        Stmt::ParallelAssign { vars, exprs, .. } => {
            abstract_assignment(vars, exprs, ctx, prog, oracle)
        }
        Stmt::Assume { .. } => Err(CegarError::Unsupported(UnsupportedOperation(
            "abstraction of assume statements is not supported".into(),
        ))),
        Stmt::Skip { .. } | Stmt::Doc(_) => Ok(Vec::new()),
    }
}

/// Abstract a (simple or parallel) assignment into an update of the
/// predicates mentioning an assigned variable. Each updated predicate gets
/// the right-hand side `(pos ∨ neg) ? ¬neg : unknown` with
/// `pos = weakest(wp)` and `neg = weakest(¬wp)`.
fn abstract_assignment(
    vars: &[VarName],
    exprs: &[Expr],
    ctx: &[PredInfo],
    prog: &Program,
    oracle: &mut Oracle,
) -> Result<Vec<Stmt>, CegarError> {
    let mut map = HashMap::new();
    for (v, e) in vars.iter().zip(exprs.iter()) {
        map.insert(v.name.clone(), e.clone());
    }

    let mut new_vars = Vec::new();
    let mut new_exprs = Vec::new();
    for p in ctx {
        if !vars.iter().any(|v| p.expr.contains(&v.name)) {
            continue;
        }

        let wp = p.expr.replace(&map);
        let pos_wp = encode_bool(&wp, prog)?;
        let neg_wp = pos_wp.not();

        let pos = weakest(oracle, ctx, &pos_wp);
        let neg = weakest(oracle, ctx, &neg_wp);

        let guard = Expr::or(pos, neg.clone());
        let value = Expr::not(neg);
        new_vars.push(VarName::new(p.var_name.clone()));
        new_exprs.push(Expr::cond(guard, value, Expr::Unknown));
    }

    let origin = TraceStmt::Assign {
        vars: vars.to_vec(),
        exprs: exprs.to_vec(),
    };
    let doc = Stmt::Doc(origin.to_string());
    let origin = Some(Box::new(origin));

    let stmt = match new_vars.len() {
        0 => Stmt::Skip { origin },
        1 => Stmt::Assign {
            var: new_vars.remove(0),
            expr: new_exprs.remove(0),
            origin,
        },
        _ => Stmt::ParallelAssign {
            vars: new_vars,
            exprs: new_exprs,
            origin,
        },
    };
    Ok(vec![doc, stmt])
}
