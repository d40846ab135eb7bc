//! Two-pass translation of an abstracted program into a control-flow graph.
//!
//! Pass one numbers nodes, call sites and procedures into a shape tree that
//! parallels the statement tree; numbering must complete before any edge is
//! emitted because the encoding depends on the final node count. Pass two
//! walks statements and shapes together, emitting guarded-action edges and
//! recording the `(pre, post) → trace payload` map used to lift error
//! traces.

use crate::graph::ControlFlowGraph;
use crate::node::{CallSite, Node, Procedure};
use cricket_bdd::Ref;
use cricket_ir::{Expr, Program, Stmt, TraceStmt, UnsupportedOperation, VarName};
use std::collections::HashMap;
use thiserror::Error;

/// The assertion-failure sink.
pub const FAIL_BLOCK: Node = Node {
    kind: crate::node::NodeKind::Block,
    id: 0,
};

#[derive(Debug, Error)]
pub enum CfgError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    #[error("not an abstracted program: {0}")]
    NotAbstract(String),

    #[error("unresolved reference in '{0}'")]
    Unresolved(String),

    #[error("abstract statement carries no trace payload")]
    MissingTracePayload,
}

/// A built graph plus the side tables the trace extractor needs.
pub struct BuiltCfg {
    pub cfg: ControlFlowGraph,
    /// Traceable edge → concrete trace payload. Calls register their
    /// summary edge `call → return`; asserts register `pre → Block(0)`.
    pub edges: HashMap<(Node, Node), TraceStmt>,
    /// Procedure of every function, indexed by `FunId`.
    pub procedures: Vec<Procedure>,
}

/// Translate the (abstracted, validated) program.
pub fn build_cfg(prog: &Program) -> Result<BuiltCfg, CfgError> {
    // Pass 1: number nodes.
    // Block 0 is the failure sink; call 0 invokes main from the entry chain.
    let mut counters = Counters {
        blocks: 1,
        calls: 1,
        procs: 0,
    };
    let mut procedures = Vec::new();
    let mut fun_shapes = Vec::new();
    for fun in &prog.funs {
        let proc = Procedure(counters.procs);
        counters.procs += 1;
        procedures.push(proc);
        let (shapes, last) = pass_one(&fun.body, proc.entry(), &mut counters)?;
        fun_shapes.push((shapes, last));
    }

    let mut cfg = ControlFlowGraph::new(
        2,
        counters.blocks,
        counters.procs,
        counters.calls,
        prog.num_globals(),
        prog.num_locals(),
    );

    // Wire Main(0) -> call of main -> Main(1); main is an ordinary procedure.
    let main = prog
        .main()
        .map_err(|e| CfgError::Unresolved(e.to_string()))?;
    let keep_globals = cfg.keep_global_vars();
    cfg.add_transition(Node::main(0), CallSite(0).call(), keep_globals);
    cfg.add_call(CallSite(0), procedures[main.0]);
    cfg.add_transition(CallSite(0).retrn(), Node::main(1), keep_globals);

    // Pass 2: emit edges.
    let mut edges = HashMap::new();
    for (fid, (fun, (shapes, last))) in prog.funs.iter().zip(fun_shapes.iter()).enumerate() {
        pass_two(&fun.body, shapes, &mut cfg, &procedures, &mut edges)?;
        let keep_all = cfg.keep_all_vars();
        cfg.add_transition(*last, procedures[fid].exit(), keep_all);
    }

    Ok(BuiltCfg {
        cfg,
        edges,
        procedures,
    })
}

struct Counters {
    blocks: usize,
    calls: usize,
    procs: usize,
}

/// Node assignment parallel to the statement tree.
enum Shape {
    While {
        pre: Node,
        body: Vec<Shape>,
        body_post: Node,
        post: Node,
    },
    Ite {
        then: Vec<Shape>,
        then_post: Node,
        els: Vec<Shape>,
        else_post: Node,
        post: Node,
    },
    Call {
        pre: Node,
        site: CallSite,
    },
    Linear {
        pre: Node,
        post: Node,
    },
    Doc,
}

fn require_unknown(cond: &Expr) -> Result<(), CfgError> {
    if matches!(cond, Expr::Unknown) {
        Ok(())
    } else {
        Err(CfgError::NotAbstract(format!(
            "branch guard '{}' was not abstracted",
            cond
        )))
    }
}

fn pass_one(
    stmts: &[Stmt],
    pre: Node,
    c: &mut Counters,
) -> Result<(Vec<Shape>, Node), CfgError> {
    let mut shapes = Vec::new();
    let mut cur = pre;
    for stmt in stmts {
        match stmt {
            Stmt::While { cond, body } => {
                require_unknown(cond)?;
                let w_pre = cur;
                let (body_shapes, body_post) = pass_one(body, w_pre, c)?;
                let post = Node::block(c.blocks);
                c.blocks += 1;
                shapes.push(Shape::While {
                    pre: w_pre,
                    body: body_shapes,
                    body_post,
                    post,
                });
                cur = post;
            }
            Stmt::Ite {
                cond,
                then_body,
                else_body,
            } => {
                require_unknown(cond)?;
                let i_pre = cur;
                let (then_shapes, then_post) = pass_one(then_body, i_pre, c)?;
                let (else_shapes, else_post) = match else_body {
                    Some(els) => pass_one(els, i_pre, c)?,
                    None => (Vec::new(), i_pre),
                };
                let post = Node::block(c.blocks);
                c.blocks += 1;
                shapes.push(Shape::Ite {
                    then: then_shapes,
                    then_post,
                    els: else_shapes,
                    else_post,
                    post,
                });
                cur = post;
            }
            Stmt::Call { .. } => {
                let site = CallSite(c.calls);
                c.calls += 1;
                shapes.push(Shape::Call { pre: cur, site });
                cur = site.retrn();
            }
            Stmt::Assign { .. }
            | Stmt::ParallelAssign { .. }
            | Stmt::Assume { .. }
            | Stmt::Assert { .. }
            | Stmt::Skip { .. } => {
                let post = Node::block(c.blocks);
                c.blocks += 1;
                shapes.push(Shape::Linear { pre: cur, post });
                cur = post;
            }
            Stmt::Doc(_) => shapes.push(Shape::Doc),
        }
    }
    Ok((shapes, cur))
}

fn payload(origin: &Option<Box<TraceStmt>>) -> Result<TraceStmt, CfgError> {
    origin
        .as_deref()
        .cloned()
        .ok_or(CfgError::MissingTracePayload)
}

fn record(
    edges: &mut HashMap<(Node, Node), TraceStmt>,
    src: Node,
    dst: Node,
    stmt: TraceStmt,
) {
    let prev = edges.insert((src, dst), stmt);
    debug_assert!(prev.is_none(), "duplicate trace edge {src} -> {dst}");
}

fn pass_two(
    stmts: &[Stmt],
    shapes: &[Shape],
    cfg: &mut ControlFlowGraph,
    procedures: &[Procedure],
    edges: &mut HashMap<(Node, Node), TraceStmt>,
) -> Result<(), CfgError> {
    debug_assert_eq!(stmts.len(), shapes.len());
    for (stmt, shape) in stmts.iter().zip(shapes.iter()) {
        match (stmt, shape) {
            (
                Stmt::While { body, .. },
                Shape::While {
                    pre,
                    body: body_shapes,
                    body_post,
                    post,
                },
            ) => {
                let keep = cfg.keep_all_vars();
                cfg.add_transition(*pre, *post, keep);
                cfg.add_transition(*body_post, *pre, keep);
                cfg.add_transition(*body_post, *post, keep);
                pass_two(body, body_shapes, cfg, procedures, edges)?;
            }
            (
                Stmt::Ite {
                    then_body,
                    else_body,
                    ..
                },
                Shape::Ite {
                    then,
                    then_post,
                    els,
                    else_post,
                    post,
                    ..
                },
            ) => {
                let keep = cfg.keep_all_vars();
                cfg.add_transition(*then_post, *post, keep);
                cfg.add_transition(*else_post, *post, keep);
                pass_two(then_body, then, cfg, procedures, edges)?;
                if let Some(else_body) = else_body {
                    pass_two(else_body, els, cfg, procedures, edges)?;
                }
            }
            (Stmt::Call { name, decl }, Shape::Call { pre, site }) => {
                let callee = decl
                    .ok_or_else(|| CfgError::Unresolved(format!("call to '{}'", name)))?;
                let keep = cfg.keep_all_vars();
                cfg.add_transition(*pre, site.call(), keep);
                cfg.add_call(*site, procedures[callee.0]);
                // a call appears in traces through its summary edge
                record(edges, site.call(), site.retrn(), TraceStmt::Call(callee));
            }
            (Stmt::Assign { var, expr, origin }, Shape::Linear { pre, post }) => {
                let action = assignment_action(
                    cfg,
                    std::slice::from_ref(var),
                    std::slice::from_ref(expr),
                )?;
                cfg.add_transition(*pre, *post, action);
                record(edges, *pre, *post, payload(origin)?);
            }
            (Stmt::ParallelAssign { vars, exprs, origin }, Shape::Linear { pre, post }) => {
                let action = assignment_action(cfg, vars, exprs)?;
                cfg.add_transition(*pre, *post, action);
                record(edges, *pre, *post, payload(origin)?);
            }
            (Stmt::Assume { cond, origin }, Shape::Linear { pre, post }) => {
                let guard = expr_to_bdd(cfg, cond)?;
                let keep = cfg.keep_all_vars();
                let action = cfg.manager().and(guard, keep);
                cfg.add_transition(*pre, *post, action);
                record(edges, *pre, *post, payload(origin)?);
            }
            (Stmt::Assert { cond, origin }, Shape::Linear { pre, post }) => {
                let guard = expr_to_bdd(cfg, cond)?;
                let keep = cfg.keep_all_vars();
                let pass = cfg.manager().and(guard, keep);
                cfg.add_transition(*pre, *post, pass);
                let fail = cfg.manager().and(cfg.manager().not(guard), keep);
                cfg.add_transition(*pre, FAIL_BLOCK, fail);
                record(edges, *pre, FAIL_BLOCK, payload(origin)?);
            }
            (Stmt::Skip { origin }, Shape::Linear { pre, post }) => {
                let keep = cfg.keep_all_vars();
                cfg.add_transition(*pre, *post, keep);
                record(edges, *pre, *post, payload(origin)?);
            }
            (Stmt::Doc(_), Shape::Doc) => {}
            _ => unreachable!("statement/shape trees diverged"),
        }
    }
    Ok(())
}

/// Encode a boolean expression over the unprimed program variables.
///
/// Only boolean structure is encodable; `unknown`, arithmetic and
/// comparisons have no decision-diagram form.
pub fn expr_to_bdd(cfg: &ControlFlowGraph, e: &Expr) -> Result<Ref, UnsupportedOperation> {
    let mgr = cfg.manager();
    match e {
        Expr::Bool(b) => Ok(if *b { mgr.one() } else { mgr.zero() }),
        Expr::Int(_) => Err(UnsupportedOperation(
            "only boolean literals can be encoded as decision diagrams".into(),
        )),
        Expr::Var(v) => {
            let decl = v.decl.ok_or_else(|| {
                UnsupportedOperation(format!("unresolved variable '{}'", v.name))
            })?;
            Ok(cfg.program_var(decl.0, false))
        }
        Expr::Unknown => Err(UnsupportedOperation(
            "the 'unknown' expression cannot be translated into a decision diagram".into(),
        )),
        Expr::SymConst { .. } => Err(UnsupportedOperation(
            "symbolic constants cannot be translated into a decision diagram".into(),
        )),
        Expr::Unary { op, child } => match op {
            cricket_ir::UnOp::Not => Ok(mgr.not(expr_to_bdd(cfg, child)?)),
            cricket_ir::UnOp::Neg => Err(UnsupportedOperation(
                "arithmetic cannot be translated into a decision diagram".into(),
            )),
        },
        Expr::Binary { op, lhs, rhs } => match op {
            cricket_ir::BinOp::And => {
                let l = expr_to_bdd(cfg, lhs)?;
                let r = expr_to_bdd(cfg, rhs)?;
                Ok(mgr.and(l, r))
            }
            cricket_ir::BinOp::Or => {
                let l = expr_to_bdd(cfg, lhs)?;
                let r = expr_to_bdd(cfg, rhs)?;
                Ok(mgr.or(l, r))
            }
            _ => Err(UnsupportedOperation(format!(
                "operator '{}' cannot be translated into a decision diagram",
                op.symbol()
            ))),
        },
        Expr::Cond { cond, then, els } => {
            let c = expr_to_bdd(cfg, cond)?;
            let t = expr_to_bdd(cfg, then)?;
            let e = expr_to_bdd(cfg, els)?;
            Ok(mgr.ite(c, t, e))
        }
    }
}

/// Action of an abstracted assignment. Every right-hand side has the form
/// `guard ? value : unknown`: under the guard the primed variable equals the
/// value, otherwise it is unconstrained. Unassigned variables keep their
/// values.
fn assignment_action(
    cfg: &ControlFlowGraph,
    vars: &[VarName],
    exprs: &[Expr],
) -> Result<Ref, CfgError> {
    let mgr = cfg.manager();
    let mut slots = Vec::new();
    let mut action = mgr.one();
    for (v, e) in vars.iter().zip(exprs.iter()) {
        let decl = v
            .decl
            .ok_or_else(|| CfgError::Unresolved(format!("assignment target '{}'", v.name)))?;
        slots.push(decl.0);

        let (guard, value) = match e {
            Expr::Cond { cond, then, els } if matches!(**els, Expr::Unknown) => (cond, then),
            _ => {
                return Err(CfgError::NotAbstract(format!(
                    "assignment right-hand side '{}' is not of the form 'guard ? value : unknown'",
                    e
                )))
            }
        };
        let guard = expr_to_bdd(cfg, guard)?;
        let value = expr_to_bdd(cfg, value)?;
        let primed = cfg.program_var(decl.0, true);
        let assigned = mgr.iff(primed, value);
        // guard ? assigned : unconstrained
        let one = mgr.or(assigned, mgr.not(guard));
        action = mgr.and(action, one);
    }
    let keep = cfg.keep_all_vars_but(&slots);
    Ok(mgr.and(action, keep))
}
