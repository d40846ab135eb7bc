//! Source-like pretty printing for programs, statements and expressions.

use crate::expr::Expr;
use crate::program::{FunDef, Program};
use crate::stmt::Stmt;
use crate::trace::TraceStmt;
use std::fmt;

const INDENT: &str = "    ";

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Var(v) => write!(f, "{}", v.name),
            Expr::Unknown => write!(f, "unknown"),
            Expr::SymConst { decl, version } => write!(f, "${}@{}", decl.0, version),
            Expr::Unary { op, child } => {
                write!(f, "{}", op.symbol())?;
                write_child(f, child, self.precedence())
            }
            Expr::Binary { op, lhs, rhs } => {
                write_child(f, lhs, self.precedence())?;
                write!(f, " {} ", op.symbol())?;
                write_child(f, rhs, self.precedence())
            }
            Expr::Cond { cond, then, els } => {
                write!(f, "{} ? {} : {}", cond, then, els)
            }
        }
    }
}

fn write_child(f: &mut fmt::Formatter<'_>, child: &Expr, parent_prec: u8) -> fmt::Result {
    if child.precedence() < parent_prec {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

/// Render a statement at the given indent level.
pub fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, indent: usize) -> fmt::Result {
    let pad = INDENT.repeat(indent);
    match stmt {
        Stmt::While { cond, body } => {
            writeln!(f, "{}while ({}) {{", pad, cond)?;
            for s in body {
                write_stmt(f, s, indent + 1)?;
            }
            writeln!(f, "{}}}", pad)
        }
        Stmt::Ite {
            cond,
            then_body,
            else_body,
        } => {
            writeln!(f, "{}if ({}) {{", pad, cond)?;
            for s in then_body {
                write_stmt(f, s, indent + 1)?;
            }
            match else_body {
                None => writeln!(f, "{}}}", pad),
                Some(els) => {
                    writeln!(f, "{}}} else {{", pad)?;
                    for s in els {
                        write_stmt(f, s, indent + 1)?;
                    }
                    writeln!(f, "{}}}", pad)
                }
            }
        }
        Stmt::Call { name, .. } => writeln!(f, "{}{}();", pad, name),
        Stmt::Assign { var, expr, .. } => writeln!(f, "{}{} = {};", pad, var.name, expr),
        Stmt::ParallelAssign { vars, exprs, .. } => {
            let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
            let rhs: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
            writeln!(f, "{}{} = {};", pad, names.join(", "), rhs.join(", "))
        }
        Stmt::Assume { cond, .. } => writeln!(f, "{}assume({});", pad, cond),
        Stmt::Assert { cond, .. } => writeln!(f, "{}assert({});", pad, cond),
        Stmt::Skip { .. } => writeln!(f, "{}skip;", pad),
        Stmt::Doc(text) => writeln!(f, "{}// {}", pad, text.trim_end()),
    }
}

struct FunDisplay<'a> {
    prog: &'a Program,
    fun: &'a FunDef,
}

impl fmt::Display for FunDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "void {}() {{", self.fun.name)?;
        for &l in &self.fun.locals {
            let v = self.prog.var(l);
            writeln!(f, "{}{} {};", INDENT, v.ty, v.name)?;
        }
        for s in &self.fun.body {
            write_stmt(f, s, 1)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.globals() {
            let v = self.var(id);
            writeln!(f, "{} {};", v.ty, v.name)?;
        }
        for fun in &self.funs {
            writeln!(f)?;
            write!(f, "{}", FunDisplay { prog: self, fun })?;
        }
        Ok(())
    }
}

impl fmt::Display for TraceStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceStmt::Assign { vars, exprs } => {
                let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
                let rhs: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "{} = {};", names.join(", "), rhs.join(", "))
            }
            TraceStmt::Assume(cond) => write!(f, "assume({});", cond),
            TraceStmt::Assert => write!(f, "assert(false);"),
            TraceStmt::Call(fun) => write!(f, "call #{};", fun.0),
            TraceStmt::Return => write!(f, "return;"),
            TraceStmt::Skip => write!(f, "skip;"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BinOp;

    #[test]
    fn precedence_parenthesisation() {
        // (x + 1) * 2 keeps its parentheses; x + 1 * 2 does not gain any
        let sum = Expr::binary(BinOp::Add, Expr::var("x"), Expr::Int(1));
        let e = Expr::binary(BinOp::Mul, sum.clone(), Expr::Int(2));
        assert_eq!(e.to_string(), "(x + 1) * 2");
        let e = Expr::binary(BinOp::Add, Expr::var("x"), {
            Expr::binary(BinOp::Mul, Expr::Int(1), Expr::Int(2))
        });
        assert_eq!(e.to_string(), "x + 1 * 2");
    }

    #[test]
    fn negation_parenthesises_comparisons() {
        let e = Expr::not(Expr::binary(BinOp::Eq, Expr::var("x"), Expr::Int(0)));
        assert_eq!(e.to_string(), "!(x == 0)");
    }
}
