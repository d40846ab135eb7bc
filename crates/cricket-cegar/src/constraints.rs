//! SSA constraint sequence of a flat trace.
//!
//! A stack of `declaration → version` maps mirrors the call stack: `Call`
//! pushes a copy of the current frame, `Return` pops it and re-merges the
//! global versions into the enclosing frame (locals of the finished frame
//! are dropped).

use cricket_ir::{Program, TraceStmt, VarId};
use cricket_ir::Expr;
use std::collections::HashMap;

/// One constraint per trace statement, in order.
pub fn compute_constraints(prog: &Program, trace: &[TraceStmt]) -> Vec<Expr> {
    let mut result = Vec::with_capacity(trace.len());
    let mut stack: Vec<HashMap<VarId, usize>> = vec![HashMap::new()];

    for stmt in trace {
        match stmt {
            TraceStmt::Call(_) => {
                let top = stack.last().cloned().unwrap_or_default();
                stack.push(top);
            }
            TraceStmt::Return => {
                if let Some(finished) = stack.pop() {
                    if let Some(enclosing) = stack.last_mut() {
                        for (decl, version) in finished {
                            if prog.var(decl).is_global() {
                                enclosing.insert(decl, version);
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        let sigma = match stack.last_mut() {
            Some(s) => s,
            None => {
                stack.push(HashMap::new());
                stack.last_mut().expect("just pushed")
            }
        };
        result.push(stmt.con(sigma, prog));
    }

    result
}
