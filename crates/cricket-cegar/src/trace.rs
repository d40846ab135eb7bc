//! Abstract counterexample → flat statement trace.
//!
//! A shortest path through the reach set is decoded into nodes; adjacent
//! pairs are looked up in the edge map the CFG builder recorded. A hit on a
//! summary edge means a call was taken: the callee body is reconstructed
//! recursively between `Call`/`Return` brackets, with the taken summary
//! edge excluded from the nested search so recursion through the same
//! summary cannot loop.

use cricket_bdd::Ref;
use cricket_cfg::{find_path, BuiltCfg, Node};
use cricket_ir::{FunId, TraceStmt};
use tracing::trace;

/// Extract the flat statement trace of a path from `src` to `dst` inside
/// `bounds`, skipping `ignored_edges`. Empty when no path exists.
pub fn flat_trace(
    built: &BuiltCfg,
    src: Ref,
    dst: Ref,
    bounds: Ref,
    ignored_edges: Ref,
) -> Vec<TraceStmt> {
    let path = find_path(&built.cfg, src, dst, bounds, ignored_edges);
    if path.is_empty() {
        return Vec::new();
    }

    let nodes: Vec<Node> = path.iter().map(|c| built.cfg.decode(*c)).collect();
    trace!(?nodes, "abstract path");

    let mut result = Vec::new();
    for i in 0..nodes.len() - 1 {
        // structural edges (joins, loop backs) carry no statement
        let Some(stmt) = built.edges.get(&(nodes[i], nodes[i + 1])) else {
            continue;
        };
        match stmt {
            TraceStmt::Call(callee) => {
                result.push(TraceStmt::Call(*callee));
                result.extend(expand_call(
                    built,
                    *callee,
                    path[i],
                    path[i + 1],
                    bounds,
                    ignored_edges,
                ));
                result.push(TraceStmt::Return);
            }
            other => result.push(other.clone()),
        }
    }
    result
}

/// Reconstruct the callee body a summary edge stands for.
fn expand_call(
    built: &BuiltCfg,
    callee: FunId,
    call_conf: Ref,
    return_conf: Ref,
    bounds: Ref,
    ignored_edges: Ref,
) -> Vec<TraceStmt> {
    let cfg = &built.cfg;
    let mgr = cfg.manager();

    // the summary edge actually taken: call configuration paired with the
    // return configuration shifted into the primed slots
    let to_primed: Vec<Ref> = [
        cfg.state_vars_primed(),
        cfg.program_vars_primed(),
        cfg.state_vars_primed(),
        cfg.program_vars_primed(),
        cfg.global_vars_rel(),
    ]
    .concat();
    let return_primed = mgr.vector_compose(return_conf, &to_primed);
    let edge_taken = mgr.and(call_conf, return_primed);
    let ignored = mgr.or(ignored_edges, edge_taken);

    // global values on both sides select the summarised entry/exit pair
    let non_global: Vec<u32> = [cfg.state_idx(), cfg.local_idx()].concat();
    let val_in = mgr.exists(call_conf, &non_global);
    let val_out = mgr.exists(return_conf, &non_global);

    let proc = built.procedures[callee.0];
    let sub_src = mgr.and(cfg.encode(proc.entry()), val_in);
    let sub_dst = mgr.and(cfg.encode(proc.exit()), val_out);

    flat_trace(built, sub_src, sub_dst, bounds, ignored)
}
