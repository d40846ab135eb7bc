//! Expressions: a closed tagged union with pattern-matched operations.

use crate::error::ValidationError;
use crate::program::{FunId, Program, VarId};
use crate::types::{BinOp, UnOp};
use std::collections::HashMap;

/// An occurrence of a variable name.
///
/// `decl` is filled by validation (or directly for synthesised names).
/// `masked` is the inactive-frame depth used during multi-frame weakest
/// preconditions: substitution leaves a name alone while `masked > 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarName {
    pub name: String,
    pub decl: Option<VarId>,
    pub masked: usize,
}

impl VarName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decl: None,
            masked: 0,
        }
    }

    pub fn resolved(name: impl Into<String>, decl: VarId) -> Self {
        Self {
            name: name.into(),
            decl: Some(decl),
            masked: 0,
        }
    }

    /// Build a resolved reference to the given declaration.
    pub fn of(prog: &Program, decl: VarId) -> Self {
        Self::resolved(prog.var(decl).name.clone(), decl)
    }
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    Var(VarName),
    /// Non-deterministic boolean; produced by abstraction, never encodable
    /// for the SMT solver or (directly) as a BDD.
    Unknown,
    /// SSA-named occurrence of a declared variable at a specific version.
    SymConst { decl: VarId, version: usize },
    Unary {
        op: UnOp,
        child: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : els`, all branches boolean; produced by abstraction of
    /// assignments.
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
}

impl Expr {
    // --- constructors ---

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(VarName::new(name))
    }

    pub fn var_of(prog: &Program, decl: VarId) -> Expr {
        Expr::Var(VarName::of(prog, decl))
    }

    pub fn not(e: Expr) -> Expr {
        Expr::Unary {
            op: UnOp::Not,
            child: Box::new(e),
        }
    }

    pub fn neg(e: Expr) -> Expr {
        Expr::Unary {
            op: UnOp::Neg,
            child: Box::new(e),
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::And, lhs, rhs)
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Or, lhs, rhs)
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn cond(cond: Expr, then: Expr, els: Expr) -> Expr {
        Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            els: Box::new(els),
        }
    }

    // --- queries ---

    /// Does any occurrence of `name` appear (masked or not)?
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => false,
            Expr::Var(v) => v.name == name,
            Expr::Unary { child, .. } => child.contains(name),
            Expr::Binary { lhs, rhs, .. } => lhs.contains(name) || rhs.contains(name),
            Expr::Cond { cond, then, els } => {
                cond.contains(name) || then.contains(name) || els.contains(name)
            }
        }
    }

    /// Does the expression mention any program variable at all?
    pub fn contains_any_var(&self) -> bool {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => false,
            Expr::Var(_) => true,
            Expr::Unary { child, .. } => child.contains_any_var(),
            Expr::Binary { lhs, rhs, .. } => lhs.contains_any_var() || rhs.contains_any_var(),
            Expr::Cond { cond, then, els } => {
                cond.contains_any_var() || then.contains_any_var() || els.contains_any_var()
            }
        }
    }

    /// Does the expression mention a variable whose mask depth is nonzero?
    pub fn contains_masked_var(&self) -> bool {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => false,
            Expr::Var(v) => v.masked != 0,
            Expr::Unary { child, .. } => child.contains_masked_var(),
            Expr::Binary { lhs, rhs, .. } => lhs.contains_masked_var() || rhs.contains_masked_var(),
            Expr::Cond { cond, then, els } => {
                cond.contains_masked_var() || then.contains_masked_var() || els.contains_masked_var()
            }
        }
    }

    /// The owning function shared by the free variables, or `None` when only
    /// globals and literals occur. Picks the first local scope found.
    pub fn scope(&self, prog: &Program) -> Option<FunId> {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown => None,
            Expr::SymConst { decl, .. } => prog.var(*decl).function(),
            Expr::Var(v) => v.decl.and_then(|d| prog.var(d).function()),
            Expr::Unary { child, .. } => child.scope(prog),
            Expr::Binary { lhs, rhs, .. } => lhs.scope(prog).or_else(|| rhs.scope(prog)),
            Expr::Cond { cond, then, els } => cond
                .scope(prog)
                .or_else(|| then.scope(prog))
                .or_else(|| els.scope(prog)),
        }
    }

    /// All free variables come from at most one function plus globals.
    pub fn is_well_scoped(&self, prog: &Program) -> bool {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } | Expr::Var(_) => {
                true
            }
            Expr::Unary { child, .. } => child.is_well_scoped(prog),
            Expr::Binary { lhs, rhs, .. } => {
                if !lhs.is_well_scoped(prog) || !rhs.is_well_scoped(prog) {
                    return false;
                }
                let (ls, rs) = (lhs.scope(prog), rhs.scope(prog));
                ls.is_none() || rs.is_none() || ls == rs
            }
            Expr::Cond { cond, then, els } => {
                if !cond.is_well_scoped(prog)
                    || !then.is_well_scoped(prog)
                    || !els.is_well_scoped(prog)
                {
                    return false;
                }
                let (cs, ts, es) = (cond.scope(prog), then.scope(prog), els.scope(prog));
                match cs {
                    None => ts.is_none() || es.is_none() || ts == es,
                    Some(_) => (cs == ts || ts.is_none()) && (cs == es || es.is_none()),
                }
            }
        }
    }

    // --- transformations ---

    /// Substitute variable names by expressions. An occurrence with a
    /// nonzero mask depth is left untouched. The guard of a conditional is
    /// never substituted into (it only guards abstract values).
    pub fn replace(&self, map: &HashMap<String, Expr>) -> Expr {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => self.clone(),
            Expr::Var(v) => {
                if v.masked == 0 {
                    if let Some(e) = map.get(&v.name) {
                        return e.clone();
                    }
                }
                self.clone()
            }
            Expr::Unary { op, child } => Expr::Unary {
                op: *op,
                child: Box::new(child.replace(map)),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.replace(map)),
                rhs: Box::new(rhs.replace(map)),
            },
            Expr::Cond { cond, then, els } => Expr::Cond {
                cond: cond.clone(),
                then: Box::new(then.replace(map)),
                els: Box::new(els.replace(map)),
            },
        }
    }

    /// Increment the mask depth of every local variable occurrence.
    /// Used by `Return.wp` to hide callee locals from the caller's frame.
    pub fn push_mask(&self, prog: &Program) -> Expr {
        self.map_mask(prog, true)
    }

    /// Decrement the mask depth of every local variable occurrence.
    /// Used by `Call.wp` to unmask caller locals again.
    pub fn pop_mask(&self, prog: &Program) -> Expr {
        self.map_mask(prog, false)
    }

    fn map_mask(&self, prog: &Program, push: bool) -> Expr {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => self.clone(),
            Expr::Var(v) => {
                let is_local = v.decl.map(|d| prog.var(d).is_local()).unwrap_or(false);
                let mut v = v.clone();
                if is_local {
                    if push {
                        v.masked += 1;
                    } else {
                        debug_assert!(v.masked > 0);
                        v.masked = v.masked.saturating_sub(1);
                    }
                }
                Expr::Var(v)
            }
            Expr::Unary { op, child } => Expr::Unary {
                op: *op,
                child: Box::new(child.map_mask(prog, push)),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.map_mask(prog, push)),
                rhs: Box::new(rhs.map_mask(prog, push)),
            },
            Expr::Cond { cond, then, els } => Expr::Cond {
                cond: Box::new(cond.map_mask(prog, push)),
                then: Box::new(then.map_mask(prog, push)),
                els: Box::new(els.map_mask(prog, push)),
            },
        }
    }

    // --- refinement support ---

    /// Collect candidate predicates: every comparison subterm mentioning at
    /// least one program variable, and every boolean variable occurrence.
    pub fn collect_candidate_predicates(&self, prog: &Program, out: &mut Vec<Expr>) {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => {}
            Expr::Var(v) => {
                if let Some(d) = v.decl {
                    if prog.var(d).ty == crate::types::Ty::Bool {
                        out.push(self.clone());
                    }
                }
            }
            Expr::Unary { child, .. } => child.collect_candidate_predicates(prog, out),
            Expr::Binary { op, lhs, rhs } => {
                if op.is_logic() {
                    lhs.collect_candidate_predicates(prog, out);
                    rhs.collect_candidate_predicates(prog, out);
                }
                if op.is_comparison() && self.contains_any_var() {
                    out.push(self.clone());
                }
            }
            Expr::Cond { cond, then, els } => {
                cond.collect_candidate_predicates(prog, out);
                then.collect_candidate_predicates(prog, out);
                els.collect_candidate_predicates(prog, out);
            }
        }
    }

    /// Rewrite the scope-prefixed names the interpolation oracle returns
    /// (`"<scope>%<var>"` or `"<scope>%<var>$<version>"`) into resolved
    /// variable references.
    pub fn resolve_interpolant_names(&self, prog: &Program) -> Result<Expr, ValidationError> {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Unknown | Expr::SymConst { .. } => {
                Ok(self.clone())
            }
            Expr::Var(v) => {
                let malformed = || ValidationError::MalformedInterpolantName {
                    name: v.name.clone(),
                };
                let (scope, rest) = v.name.split_once('%').ok_or_else(malformed)?;
                let name = rest.split('$').next().ok_or_else(malformed)?;
                let decl = if scope == "global" {
                    prog.global_by_name(name)
                } else {
                    prog.fun_by_name(scope)
                        .and_then(|f| prog.local_by_name(f, name))
                };
                let decl = decl.ok_or_else(malformed)?;
                Ok(Expr::Var(VarName::resolved(name.to_string(), decl)))
            }
            Expr::Unary { op, child } => Ok(Expr::Unary {
                op: *op,
                child: Box::new(child.resolve_interpolant_names(prog)?),
            }),
            Expr::Binary { op, lhs, rhs } => Ok(Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.resolve_interpolant_names(prog)?),
                rhs: Box::new(rhs.resolve_interpolant_names(prog)?),
            }),
            Expr::Cond { cond, then, els } => Ok(Expr::Cond {
                cond: Box::new(cond.resolve_interpolant_names(prog)?),
                then: Box::new(then.resolve_interpolant_names(prog)?),
                els: Box::new(els.resolve_interpolant_names(prog)?),
            }),
        }
    }

    /// Precedence for display parenthesisation.
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Bool(_) | Expr::Int(_) | Expr::Var(_) | Expr::Unknown | Expr::SymConst { .. } => {
                7
            }
            Expr::Unary { op, .. } => op.precedence(),
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Cond { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Scope, VarDef};
    use crate::types::Ty;

    fn prog_with(vars: Vec<VarDef>) -> Program {
        Program {
            vars,
            funs: vec![crate::program::FunDef {
                name: "main".into(),
                locals: vec![],
                body: vec![],
            }],
        }
    }

    #[test]
    fn replace_substitutes_unmasked_names() {
        let e = Expr::binary(BinOp::Add, Expr::var("x"), Expr::Int(1));
        let mut map = HashMap::new();
        map.insert("x".to_string(), Expr::Int(5));
        assert_eq!(
            e.replace(&map),
            Expr::binary(BinOp::Add, Expr::Int(5), Expr::Int(1))
        );
    }

    #[test]
    fn replace_skips_masked_names() {
        let mut v = VarName::new("x");
        v.masked = 1;
        let e = Expr::Var(v.clone());
        let mut map = HashMap::new();
        map.insert("x".to_string(), Expr::Int(5));
        assert_eq!(e.replace(&map), Expr::Var(v));
    }

    #[test]
    fn replace_leaves_conditional_guard_alone() {
        let e = Expr::cond(Expr::var("g"), Expr::var("g"), Expr::Bool(false));
        let mut map = HashMap::new();
        map.insert("g".to_string(), Expr::Bool(true));
        match e.replace(&map) {
            Expr::Cond { cond, then, .. } => {
                assert_eq!(*cond, Expr::var("g"));
                assert_eq!(*then, Expr::Bool(true));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn mask_roundtrip_on_locals() {
        let prog = prog_with(vec![VarDef {
            name: "l".into(),
            ty: Ty::Int,
            scope: Scope::Local(FunId(0)),
        }]);
        let e = Expr::var_of(&prog, VarId(0));
        let masked = e.push_mask(&prog);
        assert!(masked.contains_masked_var());
        let unmasked = masked.pop_mask(&prog);
        assert_eq!(unmasked, e);
    }

    #[test]
    fn mask_ignores_globals() {
        let prog = prog_with(vec![VarDef {
            name: "g".into(),
            ty: Ty::Int,
            scope: Scope::Global,
        }]);
        let e = Expr::var_of(&prog, VarId(0));
        assert_eq!(e.push_mask(&prog), e);
    }

    #[test]
    fn interpolant_name_resolution() {
        let prog = prog_with(vec![VarDef {
            name: "x".into(),
            ty: Ty::Int,
            scope: Scope::Global,
        }]);
        let e = Expr::var("global%x$2");
        let resolved = e.resolve_interpolant_names(&prog).unwrap();
        assert_eq!(resolved, Expr::Var(VarName::resolved("x", VarId(0))));
    }

    #[test]
    fn candidate_predicates_from_comparisons() {
        let prog = prog_with(vec![VarDef {
            name: "x".into(),
            ty: Ty::Int,
            scope: Scope::Global,
        }]);
        // (x < 3) && (1 == 2): only the var-mentioning comparison qualifies
        let cmp = Expr::binary(BinOp::Lt, Expr::var_of(&prog, VarId(0)), Expr::Int(3));
        let e = Expr::and(cmp.clone(), Expr::eq(Expr::Int(1), Expr::Int(2)));
        let mut out = Vec::new();
        e.collect_candidate_predicates(&prog, &mut out);
        assert_eq!(out, vec![cmp]);
    }
}
