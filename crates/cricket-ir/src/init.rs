//! Default-value initializers.
//!
//! Run once after parsing and before validation: every function starts by
//! assigning default values (`false`, `0`) to its locals, and `main`
//! additionally to all globals. This pins the initial valuation the
//! reachability analysis would otherwise leave unconstrained.

use crate::expr::{Expr, VarName};
use crate::program::{FunId, Program};
use crate::stmt::Stmt;
use crate::types::Ty;

/// Prepend initializing assignments to every function body.
pub fn add_initializers(prog: &mut Program) {
    let main = prog.fun_by_name("main");

    for fid in (0..prog.funs.len()).map(FunId) {
        let mut vars = Vec::new();
        let mut exprs = Vec::new();

        if Some(fid) == main {
            for g in prog.globals().collect::<Vec<_>>() {
                vars.push(VarName::of(prog, g));
                exprs.push(default_value(prog.var(g).ty));
            }
        }
        for &l in prog.fun(fid).locals.clone().iter() {
            vars.push(VarName::of(prog, l));
            exprs.push(default_value(prog.var(l).ty));
        }

        let initializer = match vars.len() {
            0 => continue,
            1 => Stmt::assign(vars.pop().unwrap(), exprs.pop().unwrap()),
            _ => Stmt::parallel_assign(vars, exprs),
        };
        prog.funs[fid.0].body.insert(0, initializer);
    }
}

fn default_value(ty: Ty) -> Expr {
    match ty {
        Ty::Bool => Expr::Bool(false),
        Ty::Int => Expr::Int(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_program;

    #[test]
    fn main_initializes_globals_and_locals() {
        let mut prog = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![
                ("main".into(), vec![("b".into(), Ty::Bool)], vec![]),
                ("f".into(), vec![("i".into(), Ty::Int)], vec![]),
            ],
        );
        add_initializers(&mut prog);
        validate_program(&mut prog).unwrap();

        match &prog.funs[0].body[0] {
            Stmt::ParallelAssign { vars, exprs, .. } => {
                assert_eq!(vars.len(), 2);
                assert_eq!(exprs, &vec![Expr::Int(0), Expr::Bool(false)]);
            }
            other => panic!("unexpected: {:?}", other),
        }
        match &prog.funs[1].body[0] {
            Stmt::Assign { var, expr, .. } => {
                assert_eq!(var.name, "i");
                assert_eq!(expr, &Expr::Int(0));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn no_variables_no_initializer() {
        let mut prog = Program::new(vec![], vec![("main".into(), vec![], vec![])]);
        add_initializers(&mut prog);
        assert!(prog.funs[0].body.is_empty());
    }
}
