//! Symbolic reachability with procedure summaries, and shortest-path
//! witness extraction.
//!
//! Two interleaved fixed points: an ordinary forward reachability over the
//! transition relation, and a summary analysis that explores procedure
//! bodies while remembering the call-site globals in the `rel` variable
//! copy. Whenever a summarised procedure exit becomes reachable, a summary
//! edge `call → return` relating call-site globals to exit globals (locals
//! kept by identity) is added to the transition relation, and the outer
//! fixed point restarts. Both layers short-circuit as soon as the bad
//! configurations are hit.

use crate::graph::ControlFlowGraph;
use cricket_bdd::Ref;
use tracing::{debug, trace};

/// Compute the configurations reachable from `init`, stopping early when
/// `bad` is hit. With `init_call_frame`, locals are zeroed when a call
/// frame is entered during summary computation.
///
/// Summary edges are persisted into the graph's transition relation, so a
/// later path search sees them. The returned set has the `rel` memory
/// projected away.
pub fn reachable(cfg: &mut ControlFlowGraph, init: Ref, bad: Ref, init_call_frame: bool) -> Ref {
    let mgr = &cfg.mgr;

    // rel0: identity between current globals and the rel copy, the seed
    // relation of a freshly entered frame.
    let mut rel0 = mgr.one();
    for (g, r) in cfg.global_vars().iter().zip(cfg.global_vars_rel().iter()) {
        rel0 = mgr.and(rel0, mgr.iff(*g, *r));
    }
    if init_call_frame {
        for l in cfg.local_vars() {
            rel0 = mgr.and(rel0, mgr.not(*l));
        }
    }

    // locals unchanged across a summary edge
    let mut loc_id = mgr.one();
    for (l, lp) in cfg.local_vars().iter().zip(cfg.local_vars_primed().iter()) {
        loc_id = mgr.and(loc_id, mgr.iff(*l, *lp));
    }

    // quantifier variable sets
    let state_and_pvar: Vec<u32> = [cfg.state_idx(), cfg.program_idx()].concat();
    let state_and_loc: Vec<u32> = [cfg.state_idx(), cfg.local_idx()].concat();
    let state_and_loc_and_rel: Vec<u32> =
        [cfg.state_idx(), cfg.local_idx(), cfg.rel_idx()].concat();

    // composition maps
    // successor step: primed state/program -> unprimed, rest identity
    let unprime_state_and_pvar: Vec<Ref> = [
        cfg.state_vars(),
        cfg.program_vars(),
        cfg.state_vars(),
        cfg.program_vars(),
        cfg.global_vars_rel(),
    ]
    .concat();
    // call step: globals -> rel (memorise caller values), primed state ->
    // unprimed (procedure entry), rest identity
    let unprime_state_and_memorize_glob: Vec<Ref> = [
        cfg.state_vars(),
        cfg.global_vars_rel(),
        cfg.local_vars(),
        cfg.state_vars(),
        cfg.program_vars_primed(),
        cfg.global_vars_rel(),
    ]
    .concat();
    // summary edge: exit globals -> primed, rel -> unprimed globals,
    // primed state -> unprimed
    let unprime_state_and_rel_to_guardedaction: Vec<Ref> = [
        cfg.state_vars(),
        cfg.program_vars_primed(),
        cfg.state_vars(),
        cfg.program_vars_primed(),
        cfg.global_vars(),
    ]
    .concat();

    debug_assert_eq!(unprime_state_and_pvar.len(), cfg.total_vars());
    debug_assert_eq!(unprime_state_and_memorize_glob.len(), cfg.total_vars());
    debug_assert_eq!(
        unprime_state_and_rel_to_guardedaction.len(),
        cfg.total_vars()
    );

    let mut reach = init;
    let mut sum = mgr.zero();
    let mut trans = cfg.trans;

    macro_rules! finish {
        () => {{
            cfg.trans = trans;
            let all = mgr.or(reach, sum);
            return mgr.exists(all, cfg.rel_idx());
        }};
    }

    loop {
        // ordinary reachability over the (growing) transition relation
        loop {
            let prev = reach;
            let step = mgr.and(reach, trans);
            let step = mgr.exists(step, &state_and_pvar);
            let step = mgr.vector_compose(step, &unprime_state_and_pvar);
            reach = mgr.or(reach, step);
            if !mgr.is_zero(mgr.and(reach, bad)) {
                finish!();
            }
            if reach == prev {
                break;
            }
        }
        trace!(nodes = mgr.node_count(), "reach fixed point stable");

        // seed the summary layer with every reachable call
        let seed = mgr.and(reach, cfg.calls);
        let seed = mgr.exists(seed, &state_and_loc);
        let seed = mgr.vector_compose(seed, &unprime_state_and_memorize_glob);
        sum = mgr.or(sum, mgr.and(seed, rel0));
        if !mgr.is_zero(mgr.and(sum, bad)) {
            finish!();
        }

        // summary analysis: explore procedure bodies, inline nested calls,
        // then add summary edges for every summarised exit
        let mut summary_edge_added = false;
        loop {
            loop {
                let prev = sum;
                let step = mgr.and(sum, trans);
                let step = mgr.exists(step, &state_and_pvar);
                let step = mgr.vector_compose(step, &unprime_state_and_pvar);
                sum = mgr.or(sum, step);
                if !mgr.is_zero(mgr.and(sum, bad)) {
                    finish!();
                }
                if sum != prev {
                    continue;
                }
                let nested = mgr.and(sum, cfg.calls);
                let nested = mgr.exists(nested, &state_and_loc_and_rel);
                let nested = mgr.vector_compose(nested, &unprime_state_and_memorize_glob);
                sum = mgr.or(sum, mgr.and(nested, rel0));
                if !mgr.is_zero(mgr.and(sum, bad)) {
                    finish!();
                }
                if sum == prev {
                    break;
                }
            }

            let prev_trans = trans;
            let edge = mgr.and(sum, cfg.exits);
            let edge = mgr.exists(edge, &state_and_loc);
            let edge = mgr.vector_compose(edge, &unprime_state_and_rel_to_guardedaction);
            let edge = mgr.and(edge, cfg.returns);
            let edge = mgr.and(edge, loc_id);
            trans = mgr.or(trans, edge);
            summary_edge_added = summary_edge_added || trans != prev_trans;
            if trans == prev_trans {
                break;
            }
        }

        if !summary_edge_added {
            break;
        }
        debug!("summary edges added, restarting reach fixed point");
    }

    finish!();
}

/// Compute a shortest witness path from `src` to `dst` inside `reach`,
/// skipping `ignored_edges`. Each returned element is a single
/// configuration (no don't-cares over state and program variables);
/// the result is empty when no path exists.
pub fn find_path(
    cfg: &ControlFlowGraph,
    src: Ref,
    dst: Ref,
    reach: Ref,
    ignored_edges: Ref,
) -> Vec<Ref> {
    let mgr = &cfg.mgr;
    let trans = mgr.and(
        mgr.or(cfg.trans, cfg.calls),
        mgr.not(ignored_edges),
    );

    let pre_quantifier: Vec<u32> = [cfg.state_idx_primed(), cfg.program_idx_primed()].concat();
    let post_quantifier: Vec<u32> = [cfg.state_idx(), cfg.program_idx()].concat();
    // express a set over post-state variables
    let pre_replace: Vec<Ref> = [
        cfg.state_vars_primed(),
        cfg.program_vars_primed(),
        cfg.state_vars_primed(),
        cfg.program_vars_primed(),
        cfg.global_vars_rel(),
    ]
    .concat();
    // pull a post-state set back to pre-state variables
    let post_replace: Vec<Ref> = [
        cfg.state_vars(),
        cfg.program_vars(),
        cfg.state_vars(),
        cfg.program_vars(),
        cfg.global_vars_rel(),
    ]
    .concat();
    let minterm_vars: Vec<u32> = [cfg.state_idx(), cfg.program_idx()].concat();

    let preimage = |b: Ref| -> Ref {
        let primed = mgr.vector_compose(b, &pre_replace);
        mgr.exists(mgr.and(primed, trans), &pre_quantifier)
    };
    let postimage = |b: Ref| -> Ref {
        let step = mgr.exists(mgr.and(b, trans), &post_quantifier);
        mgr.vector_compose(step, &post_replace)
    };

    // backward layers from dst, bounded by reach; the first layer touching
    // src fixes the shortest path length
    let mut layers = vec![dst];
    let mut frontier = dst;
    let mut explored = mgr.zero();
    while mgr.is_zero(mgr.and(frontier, src)) {
        let pre = mgr.and(preimage(frontier), reach);
        layers.push(pre);
        frontier = pre;

        let prev_explored = explored;
        explored = mgr.or(explored, pre);
        if explored == prev_explored {
            return Vec::new();
        }
    }
    let k = layers.len() - 1;

    // forward reconstruction of one concrete path of length k
    let mut path = Vec::with_capacity(k + 1);
    path.push(mgr.pick_one_minterm(mgr.and(src, layers[k]), &minterm_vars));
    for i in 1..=k {
        let post = mgr.and(postimage(path[i - 1]), layers[k - i]);
        path.push(mgr.pick_one_minterm(post, &minterm_vars));
    }

    path
}
