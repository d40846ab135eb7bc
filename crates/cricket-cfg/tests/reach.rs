//! Reachability engine tests on hand-built graphs.
//!
//! The graphs model one boolean global `g` and a `main` procedure invoked
//! from the entry chain, with an assertion-style branch into the failure
//! sink `Block(0)`.

use cricket_cfg::{find_path, reachable, CallSite, ControlFlowGraph, Node, Procedure};

/// entry --[g' := value]--> Block(1) --[!g]--> Block(0) (fail)
///                                   \-[g]--> exit
fn build(assigned: bool) -> ControlFlowGraph {
    // 2 mains, 2 blocks (fail + 1), 1 procedure, 1 call, 1 global, 0 locals
    let mut cfg = ControlFlowGraph::new(2, 2, 1, 1, 1, 0);
    let main_proc = Procedure(0);
    let call = CallSite(0);

    let keep_globals = cfg.keep_global_vars();
    cfg.add_transition(Node::main(0), call.call(), keep_globals);
    cfg.add_call(call, main_proc);
    cfg.add_transition(call.retrn(), Node::main(1), keep_globals);

    let g = cfg.program_vars()[0];
    let gp = cfg.program_vars_primed()[0];

    // g' := assigned
    let mgr = cfg.manager();
    let action = if assigned { gp } else { mgr.not(gp) };
    cfg.add_transition(main_proc.entry(), Node::block(1), action);

    // branch on g
    let keep = cfg.keep_all_vars();
    let mgr = cfg.manager();
    let pass = mgr.and(g, keep);
    let fail = mgr.and(mgr.not(g), keep);
    cfg.add_transition(Node::block(1), main_proc.exit(), pass);
    cfg.add_transition(Node::block(1), Node::block(0), fail);

    cfg
}

#[test]
fn assertion_holds_when_global_is_set() {
    let mut cfg = build(true);
    let init = cfg.encode(Node::main(0));
    let bad = cfg.encode(Node::block(0));
    let reach = reachable(&mut cfg, init, bad, false);
    let mgr = cfg.manager();
    assert!(mgr.is_zero(mgr.and(reach, bad)));

    // the terminal main node is reached through the summary edge
    let terminal = cfg.encode(Node::main(1));
    assert!(!mgr.is_zero(mgr.and(reach, terminal)));
}

#[test]
fn assertion_fails_when_global_is_cleared() {
    let mut cfg = build(false);
    let init = cfg.encode(Node::main(0));
    let bad = cfg.encode(Node::block(0));
    let reach = reachable(&mut cfg, init, bad, false);
    let mgr = cfg.manager();
    assert!(!mgr.is_zero(mgr.and(reach, bad)));
}

#[test]
fn find_path_produces_single_configurations() {
    let mut cfg = build(false);
    let init = cfg.encode(Node::main(0));
    let bad = cfg.encode(Node::block(0));
    let reach = reachable(&mut cfg, init, bad, false);

    let src = {
        let mgr = cfg.manager();
        mgr.and(init, reach)
    };
    let dst = {
        let mgr = cfg.manager();
        mgr.and(bad, reach)
    };
    let path = find_path(&cfg, src, dst, reach, cfg.manager().zero());
    assert!(!path.is_empty());

    // each step is a minterm inside reach, and adjacent nodes decode sanely
    let mgr = cfg.manager();
    for conf in &path {
        assert!(!mgr.is_zero(*conf));
        assert_eq!(mgr.and(*conf, reach), *conf);
    }
    assert_eq!(cfg.decode(path[0]), Node::main(0));
    assert_eq!(cfg.decode(*path.last().unwrap()), Node::block(0));
}

#[test]
fn find_path_respects_ignored_edges() {
    let mut cfg = build(false);
    let init = cfg.encode(Node::main(0));
    let bad = cfg.encode(Node::block(0));
    let reach = reachable(&mut cfg, init, bad, false);

    // ignore every edge: no path may be found
    let all = {
        let mgr = cfg.manager();
        mgr.one()
    };
    let path = find_path(&cfg, init, bad, reach, all);
    assert!(path.is_empty());
}
