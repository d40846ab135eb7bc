//! Predicates and scoped predicate lists.

use crate::error::{UnsupportedOperation, ValidationError};
use crate::expr::Expr;
use crate::program::Program;
use crate::types::Ty;
use crate::validate::validate_expr;
use std::collections::BTreeMap;

/// Scope key for predicates over global variables only.
pub const GLOBAL_SCOPE: &str = "global";

/// A named boolean expression over program variables.
///
/// The name (`g<k>` for globals, `l<k>` for locals) is assigned by
/// [`PredicateList::validate`] and becomes the boolean variable of the
/// abstract program.
#[derive(Clone, Debug)]
pub struct Predicate {
    name: String,
    pub expr: Expr,
}

impl Predicate {
    pub fn new(expr: Expr) -> Self {
        Self {
            name: String::new(),
            expr,
        }
    }

    /// The boolean-program variable name. Only valid after the owning list
    /// was validated.
    pub fn var_name(&self) -> &str {
        debug_assert!(!self.name.is_empty());
        &self.name
    }
}

/// Logical-equivalence oracle used to deduplicate predicates.
///
/// Implemented by the SMT backend; the trait keeps the IR free of solver
/// dependencies.
pub trait EquivOracle {
    fn is_tautology(&mut self, e: &Expr, prog: &Program) -> Result<bool, UnsupportedOperation>;
    fn equivalent(
        &mut self,
        a: &Expr,
        b: &Expr,
        prog: &Program,
    ) -> Result<bool, UnsupportedOperation>;
}

/// Scope name → ordered predicates. The scope is `"global"` or a function
/// name; the list grows monotonically across CEGAR iterations.
#[derive(Clone, Debug, Default)]
pub struct PredicateList {
    scopes: BTreeMap<String, Vec<Predicate>>,
}

impl PredicateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(scope, predicate)` pairs, e.g. parsed seed predicates.
    pub fn from_pairs(pairs: Vec<(String, Predicate)>) -> Self {
        let mut list = Self::new();
        for (scope, pred) in pairs {
            list.push(&scope, pred);
        }
        list
    }

    fn push(&mut self, scope: &str, pred: Predicate) {
        self.scopes.entry(scope.to_string()).or_default().push(pred);
    }

    /// Predicates registered for `scope` (empty when none).
    pub fn preds_for(&self, scope: &str) -> &[Predicate] {
        self.scopes.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of predicates over all scopes.
    pub fn len(&self) -> usize {
        self.scopes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scopes(&self) -> impl Iterator<Item = (&str, &[Predicate])> {
        self.scopes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Is `pred` a tautology, a contradiction, or equivalent to a predicate
    /// already registered for `scope` or for the global scope?
    fn contains(
        &self,
        pred: &Predicate,
        scope: &str,
        prog: &Program,
        oracle: &mut dyn EquivOracle,
    ) -> Result<bool, UnsupportedOperation> {
        if oracle.is_tautology(&pred.expr, prog)? {
            return Ok(true);
        }
        if oracle.is_tautology(&Expr::not(pred.expr.clone()), prog)? {
            return Ok(true);
        }
        for existing in self.preds_for(GLOBAL_SCOPE) {
            if oracle.equivalent(&existing.expr, &pred.expr, prog)? {
                return Ok(true);
            }
        }
        if scope != GLOBAL_SCOPE {
            for existing in self.preds_for(scope) {
                if oracle.equivalent(&existing.expr, &pred.expr, prog)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Add `pred` under `scope`. With `check_dup`, trivial or equivalent
    /// predicates are rejected; returns whether the predicate was added.
    pub fn extend(
        &mut self,
        pred: Predicate,
        scope: &str,
        check_dup: bool,
        prog: &Program,
        oracle: &mut dyn EquivOracle,
    ) -> Result<bool, UnsupportedOperation> {
        if check_dup && self.contains(&pred, scope, prog, oracle)? {
            return Ok(false);
        }
        self.push(scope, pred);
        Ok(true)
    }

    /// Check scopes against the program, type-check every predicate, and
    /// assign the stable `g<k>`/`l<k>` variable names.
    pub fn validate(&mut self, prog: &Program) -> Result<(), ValidationError> {
        let mut gc = 0usize;
        let mut lc = 0usize;
        for (scope, preds) in self.scopes.iter_mut() {
            let fun = if scope == GLOBAL_SCOPE {
                None
            } else {
                Some(prog.fun_by_name(scope).ok_or_else(|| {
                    ValidationError::UnknownPredicateScope {
                        scope: scope.clone(),
                    }
                })?)
            };
            for pred in preds.iter_mut() {
                let ty = validate_expr(&mut pred.expr, prog, fun)?;
                if ty != Ty::Bool {
                    return Err(ValidationError::NonBooleanPredicate {
                        pred: pred.expr.to_string(),
                    });
                }
                pred.name = if fun.is_none() {
                    let name = format!("g{}", gc);
                    gc += 1;
                    name
                } else {
                    let name = format!("l{}", lc);
                    lc += 1;
                    name
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BinOp;

    /// Syntactic stand-in oracle for tests: equivalence is equality, the
    /// only recognised tautology/contradiction are the literals.
    struct Syntactic;

    impl EquivOracle for Syntactic {
        fn is_tautology(&mut self, e: &Expr, _prog: &Program) -> Result<bool, UnsupportedOperation> {
            Ok(matches!(e, Expr::Bool(true))
                || matches!(e, Expr::Unary { op: crate::types::UnOp::Not, child }
                    if matches!(**child, Expr::Bool(false))))
        }

        fn equivalent(
            &mut self,
            a: &Expr,
            b: &Expr,
            _prog: &Program,
        ) -> Result<bool, UnsupportedOperation> {
            Ok(a == b)
        }
    }

    fn pred(e: Expr) -> Predicate {
        Predicate::new(e)
    }

    fn empty_prog() -> Program {
        Program::new(vec![], vec![("main".into(), vec![], vec![])])
    }

    #[test]
    fn extend_rejects_duplicates() {
        let prog = empty_prog();
        let mut list = PredicateList::new();
        let e = Expr::binary(BinOp::Lt, Expr::var("x"), Expr::Int(3));
        assert!(list
            .extend(pred(e.clone()), GLOBAL_SCOPE, true, &prog, &mut Syntactic)
            .unwrap());
        assert!(!list
            .extend(pred(e), GLOBAL_SCOPE, true, &prog, &mut Syntactic)
            .unwrap());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn extend_rejects_tautologies() {
        let prog = empty_prog();
        let mut list = PredicateList::new();
        assert!(!list
            .extend(pred(Expr::Bool(true)), GLOBAL_SCOPE, true, &prog, &mut Syntactic)
            .unwrap());
        assert!(list.is_empty());
    }

    #[test]
    fn global_predicates_dedup_into_local_scope() {
        let prog = empty_prog();
        let mut list = PredicateList::new();
        let e = Expr::binary(BinOp::Lt, Expr::var("x"), Expr::Int(3));
        assert!(list
            .extend(pred(e.clone()), GLOBAL_SCOPE, true, &prog, &mut Syntactic)
            .unwrap());
        // same formula offered for a function scope: rejected against global
        assert!(!list
            .extend(pred(e), "main", true, &prog, &mut Syntactic)
            .unwrap());
    }

    #[test]
    fn validate_assigns_stable_names() {
        let mut prog = Program::new(
            vec![("x".into(), Ty::Int)],
            vec![("main".into(), vec![("b".into(), Ty::Bool)], vec![])],
        );
        crate::validate::validate_program(&mut prog).unwrap();

        let mut list = PredicateList::new();
        let mut oracle = Syntactic;
        list.extend(
            pred(Expr::binary(BinOp::Lt, Expr::var("x"), Expr::Int(3))),
            GLOBAL_SCOPE,
            false,
            &prog,
            &mut oracle,
        )
        .unwrap();
        list.extend(pred(Expr::var("b")), "main", false, &prog, &mut oracle)
            .unwrap();
        list.validate(&prog).unwrap();

        assert_eq!(list.preds_for(GLOBAL_SCOPE)[0].var_name(), "g0");
        assert_eq!(list.preds_for("main")[0].var_name(), "l0");
    }

    #[test]
    fn unknown_scope_rejected() {
        let mut prog = Program::new(vec![], vec![("main".into(), vec![], vec![])]);
        crate::validate::validate_program(&mut prog).unwrap();
        let mut list = PredicateList::from_pairs(vec![(
            "nosuch".into(),
            pred(Expr::Bool(false)),
        )]);
        assert!(matches!(
            list.validate(&prog),
            Err(ValidationError::UnknownPredicateScope { .. })
        ));
    }
}
