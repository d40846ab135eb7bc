//! Post-parse validation: name resolution and structural/type checks.
//!
//! Mandatory before any analysis. Resolves every variable occurrence to its
//! declaration (function locals shadow globals) and every call to its
//! callee, and enforces the structural invariants of the IR.

use crate::error::ValidationError;
use crate::expr::Expr;
use crate::program::{FunId, Program, VarId};
use crate::stmt::Stmt;
use crate::types::Ty;
use std::collections::HashSet;

/// Validate the whole program in place.
pub fn validate_program(prog: &mut Program) -> Result<(), ValidationError> {
    // Unique global names
    let mut seen = HashSet::new();
    for id in prog.globals().collect::<Vec<_>>() {
        let name = prog.var(id).name.clone();
        check_name(&name)?;
        if !seen.insert(name.clone()) {
            return Err(ValidationError::DuplicateGlobal { name });
        }
    }

    // Unique function names, main present
    let mut seen = HashSet::new();
    for fun in &prog.funs {
        if !seen.insert(fun.name.clone()) {
            return Err(ValidationError::DuplicateFunction {
                name: fun.name.clone(),
            });
        }
    }
    prog.main()?;

    // Per-function checks. Bodies are detached for the walk so the program
    // can be borrowed for lookups while statements are mutated.
    for fid in (0..prog.funs.len()).map(FunId) {
        let fun_name = prog.fun(fid).name.clone();
        let mut seen = HashSet::new();
        for &l in &prog.fun(fid).locals {
            let name = prog.var(l).name.clone();
            check_name(&name)?;
            if !seen.insert(name.clone()) {
                return Err(ValidationError::DuplicateLocal {
                    fun: fun_name.clone(),
                    name,
                });
            }
        }

        let mut body = std::mem::take(&mut prog.funs[fid.0].body);
        let result = validate_stmts(&mut body, prog, fid);
        prog.funs[fid.0].body = body;
        result?;
    }

    Ok(())
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.starts_with('$') {
        return Err(ValidationError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn validate_stmts(stmts: &mut [Stmt], prog: &Program, fun: FunId) -> Result<(), ValidationError> {
    for s in stmts {
        validate_stmt(s, prog, fun)?;
    }
    Ok(())
}

fn validate_stmt(stmt: &mut Stmt, prog: &Program, fun: FunId) -> Result<(), ValidationError> {
    let fun_name = || prog.fun(fun).name.clone();
    match stmt {
        Stmt::While { cond, body } => {
            let ty = validate_expr(cond, prog, Some(fun))?;
            if ty != Ty::Bool {
                return Err(ValidationError::TypeMismatch {
                    fun: fun_name(),
                    message: "condition of 'while' must be of type 'bool'".into(),
                });
            }
            validate_stmts(body, prog, fun)
        }
        Stmt::Ite {
            cond,
            then_body,
            else_body,
        } => {
            let ty = validate_expr(cond, prog, Some(fun))?;
            if ty != Ty::Bool {
                return Err(ValidationError::TypeMismatch {
                    fun: fun_name(),
                    message: "condition of 'if' must be of type 'bool'".into(),
                });
            }
            validate_stmts(then_body, prog, fun)?;
            if let Some(els) = else_body {
                validate_stmts(els, prog, fun)?;
            }
            Ok(())
        }
        Stmt::Call { name, decl } => match prog.fun_by_name(name) {
            Some(callee) => {
                *decl = Some(callee);
                Ok(())
            }
            None => Err(ValidationError::UnknownFunction {
                fun: fun_name(),
                name: name.clone(),
            }),
        },
        Stmt::Assign { var, expr, .. } => {
            let var_ty = resolve_var(var, prog, Some(fun))?;
            let expr_ty = validate_expr(expr, prog, Some(fun))?;
            if var_ty != expr_ty {
                return Err(ValidationError::TypeMismatch {
                    fun: fun_name(),
                    message: format!("assignment to '{}' is not type correct", var.name),
                });
            }
            Ok(())
        }
        Stmt::ParallelAssign { vars, exprs, .. } => {
            if vars.len() != exprs.len() {
                return Err(ValidationError::Malformed {
                    fun: fun_name(),
                    message: "parallel assignment is unbalanced".into(),
                });
            }
            if vars.len() < 2 {
                return Err(ValidationError::Malformed {
                    fun: fun_name(),
                    message: "parallel assignment needs at least two targets".into(),
                });
            }
            for i in 0..vars.len() {
                for j in i + 1..vars.len() {
                    if vars[i].name == vars[j].name {
                        return Err(ValidationError::Malformed {
                            fun: fun_name(),
                            message: format!(
                                "parallel assignment has multiple assignments to '{}'",
                                vars[i].name
                            ),
                        });
                    }
                }
            }
            for (v, e) in vars.iter_mut().zip(exprs.iter_mut()) {
                let var_ty = resolve_var(v, prog, Some(fun))?;
                let expr_ty = validate_expr(e, prog, Some(fun))?;
                if var_ty != expr_ty {
                    return Err(ValidationError::TypeMismatch {
                        fun: fun_name(),
                        message: format!("assignment to '{}' is not type correct", v.name),
                    });
                }
            }
            Ok(())
        }
        Stmt::Assume { cond, .. } | Stmt::Assert { cond, .. } => {
            let ty = validate_expr(cond, prog, Some(fun))?;
            if ty != Ty::Bool {
                return Err(ValidationError::TypeMismatch {
                    fun: fun_name(),
                    message: "'assume'/'assert' expression must be of type 'bool'".into(),
                });
            }
            Ok(())
        }
        Stmt::Skip { .. } | Stmt::Doc(_) => Ok(()),
    }
}

fn resolve_var(
    var: &mut crate::expr::VarName,
    prog: &Program,
    fun: Option<FunId>,
) -> Result<Ty, ValidationError> {
    match prog.resolve(fun, &var.name) {
        Some(id) => {
            var.decl = Some(id);
            Ok(prog.var(id).ty)
        }
        None => Err(ValidationError::UndeclaredVariable {
            fun: fun.map(|f| prog.fun(f).name.clone()).unwrap_or_default(),
            name: var.name.clone(),
        }),
    }
}

/// Validate an expression in the scope of `fun` (or global scope only),
/// resolving variable occurrences and returning the expression type.
pub fn validate_expr(
    expr: &mut Expr,
    prog: &Program,
    fun: Option<FunId>,
) -> Result<Ty, ValidationError> {
    let fun_name = || fun.map(|f| prog.fun(f).name.clone()).unwrap_or_default();
    match expr {
        Expr::Bool(_) => Ok(Ty::Bool),
        Expr::Int(_) => Ok(Ty::Int),
        Expr::Unknown => Ok(Ty::Bool),
        Expr::SymConst { decl, .. } => Ok(prog.var(*decl).ty),
        Expr::Var(v) => resolve_var(v, prog, fun),
        Expr::Unary { op, child } => {
            let ty = validate_expr(child, prog, fun)?;
            if ty != op.ty() {
                return Err(ValidationError::TypeMismatch {
                    fun: fun_name(),
                    message: format!("operand of '{}' wrongly typed", op.symbol()),
                });
            }
            Ok(op.ty())
        }
        Expr::Binary { op, lhs, rhs } => {
            let lt = validate_expr(lhs, prog, fun)?;
            let rt = validate_expr(rhs, prog, fun)?;
            if lt != op.operand_ty() || rt != op.operand_ty() {
                return Err(ValidationError::TypeMismatch {
                    fun: fun_name(),
                    message: format!("operands of '{}' wrongly typed", op.symbol()),
                });
            }
            Ok(op.result_ty())
        }
        Expr::Cond { cond, then, els } => {
            for (part, what) in [
                (cond, "condition"),
                (then, "if-branch"),
                (els, "else-branch"),
            ] {
                // `unknown` is allowed here: abstraction builds
                // `guard ? value : unknown` right-hand sides.
                let ty = validate_expr(part, prog, fun)?;
                if ty != Ty::Bool {
                    return Err(ValidationError::TypeMismatch {
                        fun: fun_name(),
                        message: format!("{} of conditional must be of type 'bool'", what),
                    });
                }
            }
            Ok(Ty::Bool)
        }
    }
}

/// Ids of variables a validated expression refers to.
pub fn free_vars(expr: &Expr, out: &mut Vec<VarId>) {
    match expr {
        Expr::Bool(_) | Expr::Int(_) | Expr::Unknown => {}
        Expr::SymConst { decl, .. } => out.push(*decl),
        Expr::Var(v) => {
            if let Some(d) = v.decl {
                out.push(d);
            }
        }
        Expr::Unary { child, .. } => free_vars(child, out),
        Expr::Binary { lhs, rhs, .. } => {
            free_vars(lhs, out);
            free_vars(rhs, out);
        }
        Expr::Cond { cond, then, els } => {
            free_vars(cond, out);
            free_vars(then, out);
            free_vars(els, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::VarName;
    use crate::types::BinOp;

    fn sample() -> Program {
        Program::new(
            vec![("x".into(), Ty::Int)],
            vec![(
                "main".into(),
                vec![("b".into(), Ty::Bool)],
                vec![Stmt::assign(
                    VarName::new("x"),
                    Expr::binary(BinOp::Add, Expr::var("x"), Expr::Int(1)),
                )],
            )],
        )
    }

    #[test]
    fn resolves_names() {
        let mut prog = sample();
        validate_program(&mut prog).unwrap();
        match &prog.funs[0].body[0] {
            Stmt::Assign { var, .. } => assert_eq!(var.decl, Some(VarId(0))),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn local_shadows_global() {
        let mut prog = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![(
                "main".into(),
                vec![("x".into(), Ty::Int)],
                vec![Stmt::assign(VarName::new("x"), Expr::Int(1))],
            )],
        );
        validate_program(&mut prog).unwrap();
        match &prog.funs[0].body[0] {
            Stmt::Assign { var, .. } => {
                assert_eq!(var.decl, Some(VarId(1)));
                assert!(prog.var(VarId(1)).is_local());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_main_is_an_error() {
        let mut prog = Program::new(vec![], vec![("f".into(), vec![], vec![])]);
        assert!(matches!(
            validate_program(&mut prog),
            Err(ValidationError::MissingMain)
        ));
    }

    #[test]
    fn undeclared_variable_is_an_error() {
        let mut prog = Program::new(
            vec![],
            vec![(
                "main".into(),
                vec![],
                vec![Stmt::assign(VarName::new("y"), Expr::Int(0))],
            )],
        );
        assert!(matches!(
            validate_program(&mut prog),
            Err(ValidationError::UndeclaredVariable { .. })
        ));
    }

    #[test]
    fn reserved_names_rejected() {
        let mut prog = Program::new(
            vec![("$x".into(), Ty::Int)],
            vec![("main".into(), vec![], vec![])],
        );
        assert!(matches!(
            validate_program(&mut prog),
            Err(ValidationError::ReservedName { .. })
        ));
    }

    #[test]
    fn type_mismatch_rejected() {
        let mut prog = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![(
                "main".into(),
                vec![],
                vec![Stmt::assign(VarName::new("x"), Expr::Bool(true))],
            )],
        );
        assert!(matches!(
            validate_program(&mut prog),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn parallel_assignment_must_have_distinct_targets() {
        let mut prog = Program::new(
            vec![("x".into(), Ty::Int), ("y".into(), Ty::Int)],
            vec![(
                "main".into(),
                vec![],
                vec![Stmt::parallel_assign(
                    vec![VarName::new("x"), VarName::new("x")],
                    vec![Expr::Int(1), Expr::Int(2)],
                )],
            )],
        );
        assert!(matches!(
            validate_program(&mut prog),
            Err(ValidationError::Malformed { .. })
        ));
    }
}
