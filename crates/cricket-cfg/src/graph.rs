//! Symbolic encoding of the pushdown control-flow graph.
//!
//! Variable layout of the underlying decision diagram manager:
//!   1. state variables (`ceil(log2(#nodes))` of them),
//!   2. program variables (globals then locals),
//!   3. primed copies of 1 and 2 (post-state),
//!   4. a third copy of the globals (`rel`), the call-site memory used
//!      while procedure summaries are computed.

use crate::node::{legal_transition, CallSite, Node, NodeKind, Procedure};
use cricket_bdd::{Bdd, Ref};

/// The control-flow graph: node layout plus the transition, call, exit and
/// return relations, all encoded in one BDD manager.
pub struct ControlFlowGraph {
    pub(crate) mgr: Bdd,

    num_state_vars: usize,
    num_mains: usize,
    num_blocks: usize,
    num_procs: usize,
    num_calls: usize,
    num_globals: usize,
    num_locals: usize,

    pub(crate) trans: Ref,
    pub(crate) calls: Ref,
    pub(crate) exits: Ref,
    pub(crate) returns: Ref,

    state_vars: Vec<Ref>,
    state_vars_primed: Vec<Ref>,
    program_vars: Vec<Ref>,
    program_vars_primed: Vec<Ref>,
    global_vars: Vec<Ref>,
    global_vars_primed: Vec<Ref>,
    global_vars_rel: Vec<Ref>,
    local_vars: Vec<Ref>,
    local_vars_primed: Vec<Ref>,

    state_idx: Vec<u32>,
    state_idx_primed: Vec<u32>,
    program_idx: Vec<u32>,
    program_idx_primed: Vec<u32>,
    global_idx: Vec<u32>,
    local_idx: Vec<u32>,
    rel_idx: Vec<u32>,
}

fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

impl ControlFlowGraph {
    pub fn new(
        num_mains: usize,
        num_blocks: usize,
        num_procs: usize,
        num_calls: usize,
        num_globals: usize,
        num_locals: usize,
    ) -> Self {
        let num_nodes = num_mains + num_blocks + 2 * num_procs + 2 * num_calls;
        let s = ceil_log2(num_nodes);
        let p = num_globals + num_locals;
        let offset_prime = s + p;
        let offset_rel = 2 * offset_prime;
        let total = offset_rel + num_globals;

        let mgr = Bdd::new();
        let vars: Vec<Ref> = (0..total as u32).map(|i| mgr.mk_var(i)).collect();

        let slice = |from: usize, len: usize| vars[from..from + len].to_vec();
        let idx = |from: usize, len: usize| (from as u32..(from + len) as u32).collect::<Vec<u32>>();

        let state_vars = slice(0, s);
        let program_vars = slice(s, p);
        let state_vars_primed = slice(offset_prime, s);
        let program_vars_primed = slice(offset_prime + s, p);
        let global_vars = slice(s, num_globals);
        let global_vars_primed = slice(offset_prime + s, num_globals);
        let global_vars_rel = slice(offset_rel, num_globals);
        let local_vars = slice(s + num_globals, num_locals);
        let local_vars_primed = slice(offset_prime + s + num_globals, num_locals);

        let mut cfg = ControlFlowGraph {
            trans: mgr.zero(),
            calls: mgr.zero(),
            exits: mgr.zero(),
            returns: mgr.zero(),
            num_state_vars: s,
            num_mains,
            num_blocks,
            num_procs,
            num_calls,
            num_globals,
            num_locals,
            state_vars,
            state_vars_primed,
            program_vars,
            program_vars_primed,
            global_vars,
            global_vars_primed,
            global_vars_rel,
            local_vars,
            local_vars_primed,
            state_idx: idx(0, s),
            state_idx_primed: idx(offset_prime, s),
            program_idx: idx(s, p),
            program_idx_primed: idx(offset_prime + s, p),
            global_idx: idx(s, num_globals),
            local_idx: idx(s + num_globals, num_locals),
            rel_idx: idx(offset_rel, num_globals),
            mgr,
        };

        // return relation: every call node steps to its paired return node
        let mut returns = cfg.mgr.zero();
        for i in 0..num_calls {
            let site = CallSite(i);
            let edge = cfg
                .mgr
                .and(cfg.encode(site.call()), cfg.encode_primed(site.retrn()));
            returns = cfg.mgr.or(returns, edge);
        }
        cfg.returns = returns;

        cfg
    }

    pub fn manager(&self) -> &Bdd {
        &self.mgr
    }

    pub fn one(&self) -> Ref {
        self.mgr.one()
    }

    pub fn zero(&self) -> Ref {
        self.mgr.zero()
    }

    pub fn transition_relation(&self) -> Ref {
        self.trans
    }

    pub fn call_relation(&self) -> Ref {
        self.calls
    }

    // === Variable views ===

    pub fn state_vars(&self) -> &[Ref] {
        &self.state_vars
    }

    pub fn state_vars_primed(&self) -> &[Ref] {
        &self.state_vars_primed
    }

    pub fn program_vars(&self) -> &[Ref] {
        &self.program_vars
    }

    pub fn program_vars_primed(&self) -> &[Ref] {
        &self.program_vars_primed
    }

    pub fn global_vars(&self) -> &[Ref] {
        &self.global_vars
    }

    pub fn global_vars_primed(&self) -> &[Ref] {
        &self.global_vars_primed
    }

    pub fn global_vars_rel(&self) -> &[Ref] {
        &self.global_vars_rel
    }

    pub fn local_vars(&self) -> &[Ref] {
        &self.local_vars
    }

    pub fn local_vars_primed(&self) -> &[Ref] {
        &self.local_vars_primed
    }

    /// Program variable of a given slot, unprimed or primed.
    pub fn program_var(&self, slot: usize, primed: bool) -> Ref {
        if primed {
            self.program_vars_primed[slot]
        } else {
            self.program_vars[slot]
        }
    }

    // === Variable index views (for quantification) ===

    pub fn state_idx(&self) -> &[u32] {
        &self.state_idx
    }

    pub fn state_idx_primed(&self) -> &[u32] {
        &self.state_idx_primed
    }

    pub fn program_idx(&self) -> &[u32] {
        &self.program_idx
    }

    pub fn program_idx_primed(&self) -> &[u32] {
        &self.program_idx_primed
    }

    pub fn global_idx(&self) -> &[u32] {
        &self.global_idx
    }

    pub fn local_idx(&self) -> &[u32] {
        &self.local_idx
    }

    pub fn rel_idx(&self) -> &[u32] {
        &self.rel_idx
    }

    /// Total number of diagram variables, for building composition maps.
    pub fn total_vars(&self) -> usize {
        2 * (self.num_state_vars + self.program_vars.len()) + self.num_globals
    }

    pub fn num_mains(&self) -> usize {
        self.num_mains
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn num_procedures(&self) -> usize {
        self.num_procs
    }

    pub fn num_calls(&self) -> usize {
        self.num_calls
    }

    pub fn num_globals(&self) -> usize {
        self.num_globals
    }

    pub fn num_locals(&self) -> usize {
        self.num_locals
    }

    // === Node encoding ===

    fn offset_of(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Main => 0,
            NodeKind::Block => self.num_mains,
            NodeKind::Call => self.offset_of(NodeKind::Block) + self.num_blocks,
            NodeKind::Return => self.offset_of(NodeKind::Call) + self.num_calls,
            NodeKind::Entry => self.offset_of(NodeKind::Return) + self.num_calls,
            NodeKind::Exit => self.offset_of(NodeKind::Entry) + self.num_procs,
        }
    }

    fn index_of(&self, node: Node) -> usize {
        debug_assert!(match node.kind {
            NodeKind::Main => node.id < self.num_mains,
            NodeKind::Block => node.id < self.num_blocks,
            NodeKind::Call | NodeKind::Return => node.id < self.num_calls,
            NodeKind::Entry | NodeKind::Exit => node.id < self.num_procs,
        });
        self.offset_of(node.kind) + node.id
    }

    fn encode_with(&self, node: Node, vars: &[Ref]) -> Ref {
        let mut index = self.index_of(node);
        let mut enc = self.mgr.one();
        for v in vars {
            let lit = if index & 1 == 1 {
                *v
            } else {
                self.mgr.not(*v)
            };
            enc = self.mgr.and(enc, lit);
            index >>= 1;
        }
        enc
    }

    /// Characteristic function of a node over the unprimed state variables.
    pub fn encode(&self, node: Node) -> Ref {
        self.encode_with(node, &self.state_vars)
    }

    /// Characteristic function of a node over the primed state variables.
    pub fn encode_primed(&self, node: Node) -> Ref {
        self.encode_with(node, &self.state_vars_primed)
    }

    /// Reverse the encoding: read the node off a configuration minterm.
    pub fn decode(&self, conf: Ref) -> Node {
        let mut index = 0usize;
        for v in self.state_vars.iter().rev() {
            index <<= 1;
            if !self.mgr.is_zero(self.mgr.and(*v, conf)) {
                index |= 1;
            }
        }

        for kind in [
            NodeKind::Main,
            NodeKind::Block,
            NodeKind::Call,
            NodeKind::Return,
            NodeKind::Entry,
            NodeKind::Exit,
        ] {
            let lo = self.offset_of(kind);
            let hi = lo + self.kind_count(kind);
            if index >= lo && index < hi {
                return Node::new(kind, index - lo);
            }
        }
        // state bits past the node count cannot come from an encode()
        Node::new(NodeKind::Main, 0)
    }

    fn kind_count(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Main => self.num_mains,
            NodeKind::Block => self.num_blocks,
            NodeKind::Call | NodeKind::Return => self.num_calls,
            NodeKind::Entry | NodeKind::Exit => self.num_procs,
        }
    }

    // === Relation construction ===

    /// Accumulate `encode(src) ∧ encode'(dst) ∧ guarded_action` into the
    /// transition relation. The action must mention only unprimed and primed
    /// program variables.
    pub fn add_transition(&mut self, src: Node, dst: Node, guarded_action: Ref) {
        debug_assert!(legal_transition(src.kind, dst.kind), "{src} -> {dst}");
        let edge = self.mgr.and(self.encode(src), self.encode_primed(dst));
        let edge = self.mgr.and(edge, guarded_action);
        self.trans = self.mgr.or(self.trans, edge);
    }

    /// Register a call site invoking `proc`: call → entry in the call
    /// relation, exit → call in the exit relation.
    pub fn add_call(&mut self, site: CallSite, proc: Procedure) {
        debug_assert!(self
            .mgr
            .is_zero(self.mgr.and(self.calls, self.encode(site.call()))));
        let call_edge = self
            .mgr
            .and(self.encode(site.call()), self.encode_primed(proc.entry()));
        self.calls = self.mgr.or(self.calls, call_edge);
        let exit_edge = self
            .mgr
            .and(self.encode(proc.exit()), self.encode_primed(site.call()));
        self.exits = self.mgr.or(self.exits, exit_edge);
    }

    // === Common helpers ===

    /// Identity `v ↔ v'` on every program variable except the given slots.
    pub fn keep_all_vars_but(&self, slots: &[usize]) -> Ref {
        let mut keep = self.mgr.one();
        for i in 0..self.program_vars.len() {
            if slots.contains(&i) {
                continue;
            }
            let eq = self
                .mgr
                .iff(self.program_vars[i], self.program_vars_primed[i]);
            keep = self.mgr.and(keep, eq);
        }
        keep
    }

    /// Identity on every program variable.
    pub fn keep_all_vars(&self) -> Ref {
        self.keep_all_vars_but(&[])
    }

    /// Identity on the globals only (locals unconstrained).
    pub fn keep_global_vars(&self) -> Ref {
        let local_slots: Vec<usize> =
            (self.num_globals..self.program_vars.len()).collect();
        self.keep_all_vars_but(&local_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ControlFlowGraph {
        // 2 mains, 3 blocks, 1 proc, 2 calls, 2 globals, 1 local
        ControlFlowGraph::new(2, 3, 1, 2, 2, 1)
    }

    #[test]
    fn encode_decode_roundtrip() {
        let cfg = small();
        let nodes = [
            Node::main(0),
            Node::main(1),
            Node::block(0),
            Node::block(2),
            CallSite(0).call(),
            CallSite(1).retrn(),
            Procedure(0).entry(),
            Procedure(0).exit(),
        ];
        for n in nodes {
            let enc = cfg.encode(n);
            assert_eq!(cfg.decode(enc), n, "roundtrip of {n}");
        }
    }

    #[test]
    fn distinct_nodes_encode_disjointly() {
        let cfg = small();
        let a = cfg.encode(Node::block(1));
        let b = cfg.encode(CallSite(0).call());
        assert!(cfg.mgr.is_zero(cfg.mgr.and(a, b)));
    }

    #[test]
    fn returns_relation_pairs_calls() {
        let cfg = small();
        let edge = cfg
            .mgr
            .and(cfg.encode(CallSite(1).call()), cfg.encode_primed(CallSite(1).retrn()));
        // the constructor seeded returns with this edge
        assert_eq!(cfg.mgr.and(cfg.returns, edge), edge);
        // but not the mismatched pairing
        let wrong = cfg
            .mgr
            .and(cfg.encode(CallSite(1).call()), cfg.encode_primed(CallSite(0).retrn()));
        assert!(cfg.mgr.is_zero(cfg.mgr.and(cfg.returns, wrong)));
    }

    #[test]
    fn keep_all_vars_but_frees_slots() {
        let cfg = small();
        let keep = cfg.keep_all_vars_but(&[0]);
        // slot 1 identity enforced: v1=1, v1'=0 contradicts keep
        let v1 = cfg.program_vars()[1];
        let v1p = cfg.program_vars_primed()[1];
        let bad = cfg.mgr.and(v1, cfg.mgr.not(v1p));
        assert!(cfg.mgr.is_zero(cfg.mgr.and(keep, bad)));
        // slot 0 free: v0=1, v0'=0 is allowed
        let v0 = cfg.program_vars()[0];
        let v0p = cfg.program_vars_primed()[0];
        let free = cfg.mgr.and(v0, cfg.mgr.not(v0p));
        assert!(!cfg.mgr.is_zero(cfg.mgr.and(keep, free)));
    }
}
