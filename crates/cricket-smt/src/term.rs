//! Solver term → IR expression conversion.
//!
//! Works on raw `z3-sys` handles because the terms come out of the raw
//! quantifier-elimination pipeline. K-ary `and`/`or`/`+`/`*` applications
//! are folded to the left; boolean literals and negation are special-cased.
//! A remaining quantifier means elimination failed and is reported as an
//! error to the caller.

use crate::{SmtError, SmtResult};
use cricket_ir::{BinOp, Expr, UnOp};
use z3_sys::{AstKind, DeclKind, SortKind, Z3_ast, Z3_context};

/// Convert a raw solver term into an IR expression.
///
/// Uninterpreted constants become unresolved variable names; the caller
/// resolves the scope-prefixed names afterwards.
pub fn term_to_expr(ctx: Z3_context, ast: Z3_ast) -> SmtResult<Expr> {
    match unsafe { z3_sys::Z3_get_ast_kind(ctx, ast) } {
        AstKind::Numeral => numeral_to_expr(ctx, ast),
        AstKind::App => app_to_expr(ctx, ast),
        AstKind::Quantifier => Err(SmtError::Interpolation(
            "quantifier elimination left a quantified term".into(),
        )),
        other => Err(SmtError::Term(format!(
            "unexpected solver term of kind {:?}",
            other
        ))),
    }
}

fn numeral_to_expr(ctx: Z3_context, ast: Z3_ast) -> SmtResult<Expr> {
    let sort = unsafe { z3_sys::Z3_get_sort(ctx, ast) }
        .ok_or_else(|| SmtError::Term("numeral without sort".into()))?;
    match unsafe { z3_sys::Z3_get_sort_kind(ctx, sort) } {
        SortKind::Int => {
            let mut value: i64 = 0;
            let ok = unsafe { z3_sys::Z3_get_numeral_int64(ctx, ast, &mut value) };
            if ok {
                Ok(Expr::Int(value))
            } else {
                Err(SmtError::Term("numeral does not fit into 64 bits".into()))
            }
        }
        other => Err(SmtError::Term(format!("numeral of sort {:?}", other))),
    }
}

fn app_to_expr(ctx: Z3_context, ast: Z3_ast) -> SmtResult<Expr> {
    let app = unsafe { z3_sys::Z3_to_app(ctx, ast) }
        .ok_or_else(|| SmtError::Term("application expected".into()))?;
    let decl = unsafe { z3_sys::Z3_get_app_decl(ctx, app) }
        .ok_or_else(|| SmtError::Term("application without declaration".into()))?;
    let kind = unsafe { z3_sys::Z3_get_decl_kind(ctx, decl) };
    let num_args = unsafe { z3_sys::Z3_get_app_num_args(ctx, app) };

    let arg = |i: u32| -> SmtResult<Expr> {
        let a = unsafe { z3_sys::Z3_get_app_arg(ctx, app, i) }
            .ok_or_else(|| SmtError::Term("missing application argument".into()))?;
        term_to_expr(ctx, a)
    };

    match kind {
        DeclKind::TRUE => Ok(Expr::Bool(true)),
        DeclKind::FALSE => Ok(Expr::Bool(false)),
        DeclKind::UNINTERPRETED if num_args == 0 => Ok(Expr::var(decl_name(ctx, decl)?)),
        DeclKind::NOT => Ok(Expr::not(arg(0)?)),
        DeclKind::AND => fold(ctx, app, num_args, BinOp::And),
        DeclKind::OR => fold(ctx, app, num_args, BinOp::Or),
        DeclKind::IMPLIES => Ok(Expr::or(Expr::not(arg(0)?), arg(1)?)),
        DeclKind::EQ | DeclKind::IFF => Ok(Expr::binary(BinOp::Eq, arg(0)?, arg(1)?)),
        DeclKind::DISTINCT if num_args == 2 => Ok(Expr::binary(BinOp::Ne, arg(0)?, arg(1)?)),
        DeclKind::LT => Ok(Expr::binary(BinOp::Lt, arg(0)?, arg(1)?)),
        DeclKind::LE => Ok(Expr::binary(BinOp::Le, arg(0)?, arg(1)?)),
        DeclKind::GT => Ok(Expr::binary(BinOp::Gt, arg(0)?, arg(1)?)),
        DeclKind::GE => Ok(Expr::binary(BinOp::Ge, arg(0)?, arg(1)?)),
        DeclKind::UMINUS => Ok(Expr::neg(arg(0)?)),
        DeclKind::ADD => fold(ctx, app, num_args, BinOp::Add),
        DeclKind::SUB => fold(ctx, app, num_args, BinOp::Sub),
        DeclKind::MUL => fold(ctx, app, num_args, BinOp::Mul),
        DeclKind::DIV | DeclKind::IDIV => Ok(Expr::binary(BinOp::Div, arg(0)?, arg(1)?)),
        DeclKind::ITE => Ok(Expr::cond(arg(0)?, arg(1)?, arg(2)?)),
        other => Err(SmtError::Term(format!(
            "solver operator {:?} has no IR counterpart",
            other
        ))),
    }
}

fn fold(ctx: Z3_context, app: z3_sys::Z3_app, num_args: u32, op: BinOp) -> SmtResult<Expr> {
    if num_args == 0 {
        return Err(SmtError::Term(format!(
            "nullary application of '{}'",
            op.symbol()
        )));
    }
    let first = unsafe { z3_sys::Z3_get_app_arg(ctx, app, 0) }
        .ok_or_else(|| SmtError::Term("missing application argument".into()))?;
    let mut result = term_to_expr(ctx, first)?;
    for i in 1..num_args {
        let a = unsafe { z3_sys::Z3_get_app_arg(ctx, app, i) }
            .ok_or_else(|| SmtError::Term("missing application argument".into()))?;
        result = Expr::binary(op, result, term_to_expr(ctx, a)?);
    }
    Ok(result)
}

fn decl_name(ctx: Z3_context, decl: z3_sys::Z3_func_decl) -> SmtResult<String> {
    let sym = unsafe { z3_sys::Z3_get_decl_name(ctx, decl) }
        .ok_or_else(|| SmtError::Term("declaration without name".into()))?;
    let cstr = unsafe { z3_sys::Z3_get_symbol_string(ctx, sym) };
    if cstr.is_null() {
        return Err(SmtError::Term("declaration with unreadable name".into()));
    }
    Ok(unsafe { std::ffi::CStr::from_ptr(cstr) }
        .to_string_lossy()
        .into_owned())
}
