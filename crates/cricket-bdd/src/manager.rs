//! The BDD manager.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Handle to a node owned by a [`Bdd`] manager.
///
/// Handles from the same manager compare equal iff they represent the same
/// boolean function (hash consing keeps the diagram reduced).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref(u32);

impl Ref {
    const ZERO: Ref = Ref(0);
    const ONE: Ref = Ref(1);
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Terminals carry this pseudo variable index, larger than any real one.
const TERMINAL_VAR: u32 = u32::MAX;

#[derive(Clone, Copy)]
struct Node {
    var: u32,
    low: Ref,
    high: Ref,
}

#[derive(Default)]
struct Storage {
    nodes: Vec<Node>,
    unique: HashMap<(u32, Ref, Ref), Ref>,
    ite_cache: HashMap<(Ref, Ref, Ref), Ref>,
}

/// The BDD manager.
pub struct Bdd {
    storage: RefCell<Storage>,
    num_vars: RefCell<u32>,
}

impl Default for Bdd {
    fn default() -> Self {
        Self::new()
    }
}

impl Bdd {
    pub fn new() -> Self {
        let mut storage = Storage::default();
        // nodes[0] = false terminal, nodes[1] = true terminal
        storage.nodes.push(Node {
            var: TERMINAL_VAR,
            low: Ref::ZERO,
            high: Ref::ZERO,
        });
        storage.nodes.push(Node {
            var: TERMINAL_VAR,
            low: Ref::ONE,
            high: Ref::ONE,
        });
        Bdd {
            storage: RefCell::new(storage),
            num_vars: RefCell::new(0),
        }
    }

    /// Constant false.
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }

    /// Constant true.
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, f: Ref) -> bool {
        f == Ref::ZERO
    }

    pub fn is_one(&self, f: Ref) -> bool {
        f == Ref::ONE
    }

    /// The projection function of variable `var`.
    pub fn mk_var(&self, var: u32) -> Ref {
        let mut n = self.num_vars.borrow_mut();
        if var >= *n {
            *n = var + 1;
        }
        self.storage
            .borrow_mut()
            .mk_node(var, Ref::ZERO, Ref::ONE)
    }

    /// Number of distinct variables ever requested.
    pub fn num_vars(&self) -> u32 {
        *self.num_vars.borrow()
    }

    /// If-then-else: `f ? g : h`.
    pub fn ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        self.storage.borrow_mut().ite(f, g, h)
    }

    pub fn not(&self, f: Ref) -> Ref {
        self.storage.borrow_mut().ite(f, Ref::ZERO, Ref::ONE)
    }

    pub fn and(&self, f: Ref, g: Ref) -> Ref {
        self.storage.borrow_mut().ite(f, g, Ref::ZERO)
    }

    pub fn or(&self, f: Ref, g: Ref) -> Ref {
        self.storage.borrow_mut().ite(f, Ref::ONE, g)
    }

    pub fn xor(&self, f: Ref, g: Ref) -> Ref {
        let mut s = self.storage.borrow_mut();
        let ng = s.ite(g, Ref::ZERO, Ref::ONE);
        s.ite(f, ng, g)
    }

    /// Boolean equality `f <-> g`.
    pub fn iff(&self, f: Ref, g: Ref) -> Ref {
        let mut s = self.storage.borrow_mut();
        let ng = s.ite(g, Ref::ZERO, Ref::ONE);
        s.ite(f, g, ng)
    }

    /// Conjunction of many functions.
    pub fn and_all(&self, fs: impl IntoIterator<Item = Ref>) -> Ref {
        let mut acc = Ref::ONE;
        for f in fs {
            acc = self.and(acc, f);
        }
        acc
    }

    /// Existentially abstract the given variables: `∃ vars. f`.
    pub fn exists(&self, f: Ref, vars: &[u32]) -> Ref {
        let mut sorted: Vec<u32> = vars.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut memo = HashMap::new();
        self.storage.borrow_mut().exists(f, &sorted, &mut memo)
    }

    /// Simultaneous substitution: replace every variable `v` by the function
    /// `map[v]`. `map` must have an entry for every variable of the manager;
    /// renamings pass the target variable's projection function.
    pub fn vector_compose(&self, f: Ref, map: &[Ref]) -> Ref {
        debug_assert!(map.len() as u32 >= self.num_vars());
        let mut memo = HashMap::new();
        self.storage.borrow_mut().vector_compose(f, map, &mut memo)
    }

    /// A single satisfying assignment of `f` as a conjunction of literals
    /// over exactly `vars` (which must cover the support of `f`).
    /// Variables `f` does not constrain are set to false. Returns the zero
    /// function when `f` is unsatisfiable.
    pub fn pick_one_minterm(&self, f: Ref, vars: &[u32]) -> Ref {
        if f == Ref::ZERO {
            return Ref::ZERO;
        }
        let mut sorted: Vec<u32> = vars.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut s = self.storage.borrow_mut();
        let mut literals: Vec<(u32, bool)> = Vec::with_capacity(sorted.len());
        let mut node = f;
        for &v in &sorted {
            // skip support variables not listed (callers pass a superset)
            while s.var_of(node) < v {
                let n = s.node(node);
                node = if n.high != Ref::ZERO { n.high } else { n.low };
            }
            if s.var_of(node) == v {
                let n = s.node(node);
                if n.high != Ref::ZERO {
                    literals.push((v, true));
                    node = n.high;
                } else {
                    literals.push((v, false));
                    node = n.low;
                }
            } else {
                literals.push((v, false));
            }
        }

        let mut cube = Ref::ONE;
        for &(v, positive) in literals.iter().rev() {
            cube = if positive {
                s.mk_node(v, Ref::ZERO, cube)
            } else {
                s.mk_node(v, cube, Ref::ZERO)
            };
        }
        cube
    }

    /// Number of allocated nodes (terminals included); a size diagnostic.
    pub fn node_count(&self) -> usize {
        self.storage.borrow().nodes.len()
    }
}

impl Storage {
    fn node(&self, r: Ref) -> Node {
        self.nodes[r.0 as usize]
    }

    fn var_of(&self, r: Ref) -> u32 {
        self.nodes[r.0 as usize].var
    }

    fn mk_node(&mut self, var: u32, low: Ref, high: Ref) -> Ref {
        if low == high {
            return low;
        }
        if let Some(&r) = self.unique.get(&(var, low, high)) {
            return r;
        }
        let r = Ref(self.nodes.len() as u32);
        self.nodes.push(Node { var, low, high });
        self.unique.insert((var, low, high), r);
        r
    }

    fn cofactors(&self, f: Ref, var: u32) -> (Ref, Ref) {
        let n = self.node(f);
        if n.var == var {
            (n.low, n.high)
        } else {
            (f, f)
        }
    }

    fn ite(&mut self, f: Ref, g: Ref, h: Ref) -> Ref {
        if f == Ref::ONE {
            return g;
        }
        if f == Ref::ZERO {
            return h;
        }
        if g == h {
            return g;
        }
        if g == Ref::ONE && h == Ref::ZERO {
            return f;
        }
        if let Some(&r) = self.ite_cache.get(&(f, g, h)) {
            return r;
        }

        let var = self
            .var_of(f)
            .min(self.var_of(g))
            .min(self.var_of(h));
        let (f0, f1) = self.cofactors(f, var);
        let (g0, g1) = self.cofactors(g, var);
        let (h0, h1) = self.cofactors(h, var);
        let low = self.ite(f0, g0, h0);
        let high = self.ite(f1, g1, h1);
        let r = self.mk_node(var, low, high);
        self.ite_cache.insert((f, g, h), r);
        r
    }

    fn exists(&mut self, f: Ref, vars: &[u32], memo: &mut HashMap<Ref, Ref>) -> Ref {
        let var = self.var_of(f);
        if var == TERMINAL_VAR {
            return f;
        }
        // all quantified variables are above this node
        let remaining: Vec<u32> = vars.iter().copied().filter(|&v| v >= var).collect();
        if remaining.is_empty() {
            return f;
        }
        if let Some(&r) = memo.get(&f) {
            return r;
        }

        let n = self.node(f);
        let low = self.exists(n.low, vars, memo);
        let high = self.exists(n.high, vars, memo);
        let r = if remaining.first() == Some(&var) {
            self.ite(low, Ref::ONE, high)
        } else {
            self.mk_node(var, low, high)
        };
        memo.insert(f, r);
        r
    }

    fn vector_compose(&mut self, f: Ref, map: &[Ref], memo: &mut HashMap<Ref, Ref>) -> Ref {
        let var = self.var_of(f);
        if var == TERMINAL_VAR {
            return f;
        }
        if let Some(&r) = memo.get(&f) {
            return r;
        }
        let n = self.node(f);
        let low = self.vector_compose(n.low, map, memo);
        let high = self.vector_compose(n.high, map, memo);
        let g = map
            .get(var as usize)
            .copied()
            .unwrap_or_else(|| self.mk_node(var, Ref::ZERO, Ref::ONE));
        let r = self.ite(g, high, low);
        memo.insert(f, r);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_and_vars() {
        let bdd = Bdd::new();
        assert!(bdd.is_zero(bdd.zero()));
        assert!(bdd.is_one(bdd.one()));
        let x = bdd.mk_var(0);
        assert_eq!(bdd.mk_var(0), x);
        assert_ne!(bdd.mk_var(1), x);
    }

    #[test]
    fn connectives() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        assert_eq!(bdd.and(x, bdd.one()), x);
        assert_eq!(bdd.and(x, bdd.zero()), bdd.zero());
        assert_eq!(bdd.or(x, bdd.one()), bdd.one());
        assert_eq!(bdd.not(bdd.not(x)), x);
        // x & y == y & x (canonicity)
        assert_eq!(bdd.and(x, y), bdd.and(y, x));
        // x xor x == 0
        assert_eq!(bdd.xor(x, x), bdd.zero());
        // x <-> x == 1
        assert_eq!(bdd.iff(x, x), bdd.one());
    }

    #[test]
    fn exists_quantifies_away() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let f = bdd.and(x, y);
        // ∃x. x & y == y
        assert_eq!(bdd.exists(f, &[0]), y);
        // ∃x,y. x & y == 1
        assert_eq!(bdd.exists(f, &[0, 1]), bdd.one());
        // ∃y over x: untouched
        assert_eq!(bdd.exists(x, &[1]), x);
    }

    #[test]
    fn vector_compose_renames() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let z = bdd.mk_var(2);
        let f = bdd.and(x, bdd.not(y));
        // rename x->y, y->z
        let map = vec![y, z, z];
        let g = bdd.vector_compose(f, &map);
        assert_eq!(g, bdd.and(y, bdd.not(z)));
    }

    #[test]
    fn vector_compose_substitutes_functions() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let z = bdd.mk_var(2);
        // f = x <-> y; substitute x := y & z simultaneously with y := y
        let f = bdd.iff(x, y);
        let map = vec![bdd.and(y, z), y, z];
        let g = bdd.vector_compose(f, &map);
        // (y&z) <-> y == !y | z
        assert_eq!(g, bdd.or(bdd.not(y), z));
    }

    #[test]
    fn simultaneous_swap() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let f = bdd.and(x, bdd.not(y));
        // swap x <-> y must be simultaneous, not sequential
        let map = vec![y, x];
        let g = bdd.vector_compose(f, &map);
        assert_eq!(g, bdd.and(y, bdd.not(x)));
    }

    #[test]
    fn pick_one_minterm_is_contained() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let y = bdd.mk_var(1);
        let f = bdd.or(x, y);
        let m = bdd.pick_one_minterm(f, &[0, 1]);
        assert_ne!(m, bdd.zero());
        // m implies f
        assert_eq!(bdd.and(m, f), m);
        // m is a full assignment: conjunction with each var or its negation
        // stays either m or zero
        for v in [x, y] {
            let with = bdd.and(m, v);
            assert!(with == m || with == bdd.zero());
        }
    }

    #[test]
    fn pick_one_minterm_of_zero() {
        let bdd = Bdd::new();
        assert_eq!(bdd.pick_one_minterm(bdd.zero(), &[0, 1]), bdd.zero());
    }

    #[test]
    fn pick_covers_unconstrained_vars() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(0);
        let m = bdd.pick_one_minterm(x, &[0, 1, 2]);
        // y and z are pinned (to false), so conjoining their positives kills m
        let y = bdd.mk_var(1);
        assert_eq!(bdd.and(m, y), bdd.zero());
        assert_eq!(bdd.and(m, bdd.not(y)), m);
    }
}

#[cfg(test)]
mod laws {
    use super::*;
    use proptest::prelude::*;

    const VARS: u32 = 5;

    /// A random function over VARS variables, built from a truth table seed.
    fn from_table(bdd: &Bdd, table: u32) -> Ref {
        let mut f = bdd.zero();
        for assignment in 0..(1u32 << VARS) {
            if table & (1 << (assignment % 32)) != 0 {
                let mut cube = bdd.one();
                for v in 0..VARS {
                    let lit = bdd.mk_var(v);
                    let lit = if assignment & (1 << v) != 0 {
                        lit
                    } else {
                        bdd.not(lit)
                    };
                    cube = bdd.and(cube, lit);
                }
                f = bdd.or(f, cube);
            }
        }
        f
    }

    proptest! {
        #[test]
        fn de_morgan(a: u32, b: u32) {
            let bdd = Bdd::new();
            let f = from_table(&bdd, a);
            let g = from_table(&bdd, b);
            let lhs = bdd.not(bdd.and(f, g));
            let rhs = bdd.or(bdd.not(f), bdd.not(g));
            prop_assert_eq!(lhs, rhs);
        }

        #[test]
        fn exists_is_disjunction_of_cofactors(a: u32, v in 0u32..VARS) {
            let bdd = Bdd::new();
            let f = from_table(&bdd, a);
            // ∃v.f == f[v:=0] | f[v:=1]
            let mut map: Vec<Ref> = (0..VARS).map(|i| bdd.mk_var(i)).collect();
            map[v as usize] = bdd.zero();
            let f0 = bdd.vector_compose(f, &map);
            map[v as usize] = bdd.one();
            let f1 = bdd.vector_compose(f, &map);
            prop_assert_eq!(bdd.exists(f, &[v]), bdd.or(f0, f1));
            // and the result no longer depends on v
            let e = bdd.exists(f, &[v]);
            prop_assert_eq!(bdd.exists(e, &[v]), e);
        }

        #[test]
        fn pick_one_minterm_entails(a: u32) {
            let bdd = Bdd::new();
            let f = from_table(&bdd, a);
            let vars: Vec<u32> = (0..VARS).collect();
            let m = bdd.pick_one_minterm(f, &vars);
            if bdd.is_zero(f) {
                prop_assert_eq!(m, bdd.zero());
            } else {
                prop_assert_ne!(m, bdd.zero());
                prop_assert_eq!(bdd.and(m, f), m);
            }
        }
    }
}
