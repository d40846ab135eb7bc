//! The counterexample-guided abstraction refinement loop.
//!
//! Per iteration: abstract the program under the current predicates, build
//! the symbolic control-flow graph, run reachability. If the failure block
//! is unreachable the program is correct. Otherwise a shortest abstract
//! counterexample is lifted to concrete statements and checked by a
//! weakest-precondition fold: a feasible trace witnesses a real bug, a
//! spurious one is interpolated into new predicates. Refinement that adds
//! no predicate — or an exhausted iteration budget — ends the analysis as
//! failed.

pub mod abstraction;
pub mod constraints;
pub mod cubes;
pub mod feasibility;
pub mod refine;
pub mod trace;

use cricket_cfg::{build_cfg, reachable, CfgError, Node, FAIL_BLOCK};
use cricket_ir::{
    PredicateList, Program, TraceStmt, UnsupportedOperation, ValidationError,
};
use cricket_smt::{Oracle, SmtError};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use abstraction::abstract_program;
pub use feasibility::is_spurious;
pub use refine::refine_predicates;
pub use trace::flat_trace;

/// Fatal analysis error.
#[derive(Debug, Error)]
pub enum CegarError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    #[error(transparent)]
    Cfg(#[from] CfgError),

    #[error(transparent)]
    Smt(#[from] SmtError),

    #[error("abstract counterexample could not be reconstructed")]
    EmptyTrace,
}

/// Result of the analysis.
#[derive(Debug)]
pub enum Outcome {
    /// No assertion can fail.
    Correct,
    /// An assertion fails; the trace is the witnessing statement sequence.
    Buggy { trace: Vec<TraceStmt> },
    /// Refinement got stuck or the iteration budget was exhausted.
    Failed,
}

/// Loop configuration.
#[derive(Debug, Clone)]
pub struct CegarConfig {
    /// Maximum number of abstraction-refinement iterations.
    pub max_iterations: usize,
}

impl Default for CegarConfig {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

/// Run the refinement loop on a validated program.
///
/// `predicates` seeds the abstraction; it is normally empty and grows
/// monotonically as spurious counterexamples are interpolated.
pub fn prove(
    prog: &Program,
    mut predicates: PredicateList,
    config: &CegarConfig,
) -> Result<Outcome, CegarError> {
    let mut oracle = Oracle::new();
    predicates.validate(prog)?;

    for iteration in 1..=config.max_iterations {
        info!(iteration, predicates = predicates.len(), "abstracting");

        let abstracted = abstract_program(prog, &predicates, &mut oracle)?;
        debug!(program = %abstracted, "abstract program");

        let mut built = build_cfg(&abstracted)?;
        let init = built.cfg.encode(Node::main(0));
        let bad = built.cfg.encode(FAIL_BLOCK);
        let reach = reachable(&mut built.cfg, init, bad, false);

        let bad_reachable = {
            let mgr = built.cfg.manager();
            !mgr.is_zero(mgr.and(reach, bad))
        };
        if !bad_reachable {
            info!(iteration, "failure block unreachable");
            return Ok(Outcome::Correct);
        }

        let zero = built.cfg.manager().zero();
        let mut trace = flat_trace(&built, init, bad, reach, zero);
        if trace.is_empty() {
            return Err(CegarError::EmptyTrace);
        }
        debug!(length = trace.len(), "abstract counterexample");

        if !is_spurious(prog, &trace, &mut oracle)? {
            info!(iteration, "counterexample is feasible");
            return Ok(Outcome::Buggy { trace });
        }

        // the final assert marker carries no constraint
        trace.pop();

        let added = refine_predicates(&mut predicates, prog, &trace, &mut oracle)?;
        if added == 0 {
            warn!(iteration, "refinement produced no new predicate");
            return Ok(Outcome::Failed);
        }
        info!(iteration, added, total = predicates.len(), "refined");
    }

    warn!(
        max_iterations = config.max_iterations,
        "iteration budget exhausted"
    );
    Ok(Outcome::Failed)
}
