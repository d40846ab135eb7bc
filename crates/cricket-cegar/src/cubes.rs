//! Prime-implicant cube enumeration: the `weakest`/`strongest` formulas
//! over a predicate set.
//!
//! A cube is a conjunction of predicate literals with strictly increasing
//! indices. `weakest(φ)` explores cubes in increasing-index DFS order,
//! pruning a cube when it entails `¬φ` (cannot help) and recording it as a
//! prime implicant when it entails `φ` (extending it further would only
//! weaken coverage). Recorded implicants subsume their super-cubes. The
//! result is the disjunction of the recorded cubes, rebuilt as an IR
//! expression over the predicates' boolean-program names.

use cricket_smt::Oracle;
use cricket_ir::Expr;
use std::collections::{BTreeSet, VecDeque};
use z3::ast::Bool;

/// A predicate as the abstraction sees it: its boolean-program variable
/// name, its concrete expression, and the solver encoding of the latter.
pub struct PredInfo {
    pub var_name: String,
    pub expr: Expr,
    pub repr: Bool,
}

struct Cube {
    literals: BTreeSet<(usize, bool)>,
    max: usize,
    repr: Bool,
}

impl Cube {
    fn unit(index: usize, negated: bool, lit: &Bool) -> Self {
        let repr = if negated { lit.not() } else { lit.clone() };
        Cube {
            literals: BTreeSet::from([(index, negated)]),
            max: index,
            repr,
        }
    }

    fn extended(&self, index: usize, negated: bool, lit: &Bool) -> Self {
        debug_assert!(index > self.max);
        let mut literals = self.literals.clone();
        literals.insert((index, negated));
        let lit = if negated { lit.not() } else { lit.clone() };
        Cube {
            literals,
            max: index,
            repr: Bool::and(&[self.repr.clone(), lit]),
        }
    }
}

fn subsumed(primes: &[Cube], cube: &Cube) -> bool {
    primes.iter().any(|p| p.literals.is_subset(&cube.literals))
}

fn literal_to_expr(preds: &[PredInfo], lit: &(usize, bool)) -> Expr {
    let var = Expr::var(preds[lit.0].var_name.clone());
    if lit.1 {
        Expr::not(var)
    } else {
        var
    }
}

fn cube_to_expr(preds: &[PredInfo], cube: &Cube) -> Expr {
    let mut it = cube.literals.iter();
    let first = it.next().map(|l| literal_to_expr(preds, l));
    let mut result = first.unwrap_or(Expr::Bool(true));
    for lit in it {
        result = Expr::and(result, literal_to_expr(preds, lit));
    }
    result
}

fn cubes_to_expr(preds: &[PredInfo], cubes: &[Cube]) -> Expr {
    let mut it = cubes.iter();
    let first = it.next().map(|c| cube_to_expr(preds, c));
    let mut result = match first {
        None => return Expr::Bool(false),
        Some(e) => e,
    };
    for cube in it {
        result = Expr::or(result, cube_to_expr(preds, cube));
    }
    result
}

/// The weakest disjunction of predicate cubes that still implies `phi`.
pub fn weakest(oracle: &mut Oracle, preds: &[PredInfo], phi: &Bool) -> Expr {
    if oracle.is_taut(phi) {
        return Expr::Bool(true);
    }
    if oracle.is_taut(&phi.not()) {
        return Expr::Bool(false);
    }

    let mut work_list: VecDeque<Cube> = VecDeque::new();
    let mut primes: Vec<Cube> = Vec::new();
    for (i, p) in preds.iter().enumerate() {
        work_list.push_back(Cube::unit(i, false, &p.repr));
        work_list.push_back(Cube::unit(i, true, &p.repr));
    }

    let not_phi = phi.not();
    while let Some(cube) = work_list.pop_front() {
        if subsumed(&primes, &cube) {
            continue;
        } else if oracle.implies(&cube.repr, &not_phi) {
            continue;
        } else if oracle.implies(&cube.repr, phi) {
            primes.push(cube);
        } else {
            for (i, p) in preds.iter().enumerate().skip(cube.max + 1) {
                work_list.push_back(cube.extended(i, false, &p.repr));
                work_list.push_back(cube.extended(i, true, &p.repr));
            }
        }
    }

    cubes_to_expr(preds, &primes)
}

/// The strongest formula over the predicates implied by `phi`.
pub fn strongest(oracle: &mut Oracle, preds: &[PredInfo], phi: &Bool) -> Expr {
    let weakest_neg = weakest(oracle, preds, &phi.not());
    Expr::not(weakest_neg)
}
