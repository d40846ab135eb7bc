//! IR expression → Z3 term translation.
//!
//! Program variables are encoded under their plain source name; SSA
//! constants carry the scope-prefixed, version-suffixed name
//! `<scope>%<var>$<version>` so the interpolation output can be mapped back
//! to declarations.

use crate::{SmtError, SmtResult};
use cricket_ir::{BinOp, Expr, Program, Ty, UnOp, UnsupportedOperation, VarId};
use z3::ast::{Bool, Dynamic, Int};

/// The solver name of an SSA constant.
pub fn sym_const_name(prog: &Program, decl: VarId, version: usize) -> String {
    let var = prog.var(decl);
    let scope = match var.function() {
        None => "global",
        Some(f) => prog.fun(f).name.as_str(),
    };
    format!("{}%{}${}", scope, var.name, version)
}

/// Encode an expression expected to be boolean.
pub fn encode_bool(e: &Expr, prog: &Program) -> SmtResult<Bool> {
    let d = encode(e, prog)?;
    d.as_bool()
        .ok_or_else(|| SmtError::Term(format!("expected boolean term for '{}'", e)))
}

/// Encode an expression expected to be integer.
pub fn encode_int(e: &Expr, prog: &Program) -> SmtResult<Int> {
    let d = encode(e, prog)?;
    d.as_int()
        .ok_or_else(|| SmtError::Term(format!("expected integer term for '{}'", e)))
}

/// Encode an expression as a dynamically sorted term.
pub fn encode(e: &Expr, prog: &Program) -> SmtResult<Dynamic> {
    match e {
        Expr::Bool(b) => Ok(Dynamic::from_ast(&Bool::from_bool(*b))),
        Expr::Int(n) => Ok(Dynamic::from_ast(&Int::from_i64(*n))),
        Expr::Var(v) => {
            let decl = v
                .decl
                .ok_or_else(|| SmtError::Unresolved(v.name.clone()))?;
            Ok(new_const(&v.name, prog.var(decl).ty))
        }
        Expr::Unknown => Err(SmtError::Unsupported(UnsupportedOperation(
            "the 'unknown' expression cannot be encoded for the solver".into(),
        ))),
        Expr::SymConst { decl, version } => {
            let name = sym_const_name(prog, *decl, *version);
            Ok(new_const(&name, prog.var(*decl).ty))
        }
        Expr::Unary { op, child } => match op {
            UnOp::Not => {
                let c = encode_bool(child, prog)?;
                Ok(Dynamic::from_ast(&c.not()))
            }
            UnOp::Neg => {
                let c = encode_int(child, prog)?;
                Ok(Dynamic::from_ast(&c.unary_minus()))
            }
        },
        Expr::Binary { op, lhs, rhs } => encode_binary(*op, lhs, rhs, prog),
        Expr::Cond { cond, then, els } => {
            let c = encode_bool(cond, prog)?;
            let t = encode_bool(then, prog)?;
            let e = encode_bool(els, prog)?;
            Ok(Dynamic::from_ast(&c.ite(&t, &e)))
        }
    }
}

fn new_const(name: &str, ty: Ty) -> Dynamic {
    match ty {
        Ty::Bool => Dynamic::from_ast(&Bool::new_const(name.to_string())),
        Ty::Int => Dynamic::from_ast(&Int::new_const(name.to_string())),
    }
}

fn encode_binary(op: BinOp, lhs: &Expr, rhs: &Expr, prog: &Program) -> SmtResult<Dynamic> {
    match op {
        BinOp::And => {
            let l = encode_bool(lhs, prog)?;
            let r = encode_bool(rhs, prog)?;
            Ok(Dynamic::from_ast(&Bool::and(&[l, r])))
        }
        BinOp::Or => {
            let l = encode_bool(lhs, prog)?;
            let r = encode_bool(rhs, prog)?;
            Ok(Dynamic::from_ast(&Bool::or(&[l, r])))
        }
        // equality also occurs between boolean terms (SSA constraints over
        // boolean variables), so it is encoded sort-generically
        BinOp::Eq => encode_eq(lhs, rhs, prog, false),
        BinOp::Ne => encode_eq(lhs, rhs, prog, true),
        BinOp::Lt => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&l.lt(&r)))
        }
        BinOp::Le => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&l.le(&r)))
        }
        BinOp::Gt => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&l.gt(&r)))
        }
        BinOp::Ge => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&l.ge(&r)))
        }
        BinOp::Add => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&Int::add(&[l, r])))
        }
        BinOp::Sub => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&Int::sub(&[l, r])))
        }
        BinOp::Mul => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&Int::mul(&[l, r])))
        }
        BinOp::Div => {
            let (l, r) = (encode_int(lhs, prog)?, encode_int(rhs, prog)?);
            Ok(Dynamic::from_ast(&l.div(&r)))
        }
    }
}

fn encode_eq(lhs: &Expr, rhs: &Expr, prog: &Program, negate: bool) -> SmtResult<Dynamic> {
    let l = encode(lhs, prog)?;
    let r = encode(rhs, prog)?;
    let eq = if let (Some(li), Some(ri)) = (l.as_int(), r.as_int()) {
        li.eq(&ri)
    } else if let (Some(lb), Some(rb)) = (l.as_bool(), r.as_bool()) {
        lb.eq(&rb)
    } else {
        return Err(SmtError::Term(format!(
            "equality between incompatible sorts: '{}' and '{}'",
            lhs, rhs
        )));
    };
    if negate {
        Ok(Dynamic::from_ast(&eq.not()))
    } else {
        Ok(Dynamic::from_ast(&eq))
    }
}

/// Collect the solver symbols (name and type) an expression mentions.
pub fn collect_symbols(e: &Expr, prog: &Program, out: &mut Vec<(String, Ty)>) {
    match e {
        Expr::Bool(_) | Expr::Int(_) | Expr::Unknown => {}
        Expr::Var(v) => {
            if let Some(decl) = v.decl {
                push_symbol(out, v.name.clone(), prog.var(decl).ty);
            }
        }
        Expr::SymConst { decl, version } => {
            push_symbol(
                out,
                sym_const_name(prog, *decl, *version),
                prog.var(*decl).ty,
            );
        }
        Expr::Unary { child, .. } => collect_symbols(child, prog, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_symbols(lhs, prog, out);
            collect_symbols(rhs, prog, out);
        }
        Expr::Cond { cond, then, els } => {
            collect_symbols(cond, prog, out);
            collect_symbols(then, prog, out);
            collect_symbols(els, prog, out);
        }
    }
}

fn push_symbol(out: &mut Vec<(String, Ty)>, name: String, ty: Ty) {
    if !out.iter().any(|(n, _)| *n == name) {
        out.push((name, ty));
    }
}
