//! Predicate refinement from interpolants of a spurious trace.

use crate::constraints::compute_constraints;
use crate::CegarError;
use cricket_ir::pred::GLOBAL_SCOPE;
use cricket_ir::{Predicate, PredicateList, Program, TraceStmt};
use cricket_smt::{interpolate_sequence, Oracle};
use tracing::{debug, info};

/// Refine the predicate set from a spurious trace: encode the trace as SSA
/// constraints, interpolate every cut, resolve the interpolants' scoped
/// names, and offer every candidate comparison/boolean-variable subterm to
/// the predicate list with deduplication. Returns the number of predicates
/// actually added.
pub fn refine_predicates(
    preds: &mut PredicateList,
    prog: &Program,
    trace: &[TraceStmt],
    oracle: &mut Oracle,
) -> Result<usize, CegarError> {
    let constraints = compute_constraints(prog, trace);
    debug_assert_eq!(constraints.len(), trace.len());

    let interpolants = interpolate_sequence(prog, &constraints)?;

    let mut added = 0;
    for interpolant in interpolants {
        let resolved = interpolant.resolve_interpolant_names(prog)?;
        let mut candidates = Vec::new();
        resolved.collect_candidate_predicates(prog, &mut candidates);

        for expr in candidates {
            debug_assert!(expr.is_well_scoped(prog));
            let scope = match expr.scope(prog) {
                None => GLOBAL_SCOPE.to_string(),
                Some(f) => prog.fun(f).name.clone(),
            };
            let rendered = expr.to_string();
            if preds.extend(Predicate::new(expr), &scope, true, prog, oracle)? {
                info!(scope = %scope, predicate = %rendered, "new predicate");
                added += 1;
            } else {
                debug!(scope = %scope, predicate = %rendered, "candidate already covered");
            }
        }
    }

    preds.validate(prog)?;
    Ok(added)
}
