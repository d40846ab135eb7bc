//! End-to-end refinement-loop tests on small programs.

use cricket_cegar::{prove, CegarConfig, Outcome};
use cricket_ir::{init::add_initializers, validate::validate_program, PredicateList, Program, TraceStmt};

fn load(source: &str) -> Program {
    let mut prog = cricket_syntax::parse_program(source).expect("parse");
    add_initializers(&mut prog);
    validate_program(&mut prog).expect("validate");
    prog
}

fn check(source: &str) -> Outcome {
    let prog = load(source);
    prove(&prog, PredicateList::new(), &CegarConfig::default()).expect("analysis")
}

#[test]
fn straight_line_assertion_holds() {
    let outcome = check("int x; void main() { x = 1; assert(x == 1); }");
    assert!(matches!(outcome, Outcome::Correct), "got {:?}", outcome);
}

#[test]
fn straight_line_assertion_fails() {
    let outcome = check("int x; void main() { x = 0; if (x == 0) { assert(x != 0); } }");
    let Outcome::Buggy { trace } = outcome else {
        panic!("expected a bug, got {:?}", outcome);
    };
    // the lifted trace ends in the failing assert and contains the
    // assignment and the branch assumption
    assert!(matches!(trace.last(), Some(TraceStmt::Assert)));
    assert!(trace.iter().any(|s| matches!(s, TraceStmt::Assign { .. })));
    assert!(trace.iter().any(|s| matches!(s, TraceStmt::Assume(_))));
}

#[test]
fn recursive_flip_preserves_flag() {
    let outcome = check(
        "bool p;
         void main() { p = true; flip(); assert(p); }
         void flip() { if (p) { p = false; flip(); } else { p = true; } }",
    );
    assert!(matches!(outcome, Outcome::Correct), "got {:?}", outcome);
}

#[test]
fn counting_loop_reaches_bound() {
    let outcome = check(
        "void main() { int i; i = 0; while (i < 3) { i = i + 1; } assert(i == 3); }",
    );
    assert!(matches!(outcome, Outcome::Correct), "got {:?}", outcome);
}

#[test]
fn counting_loop_misses_wrong_bound() {
    let outcome = check(
        "void main() { int i; i = 0; while (i < 3) { i = i + 1; } assert(i == 4); }",
    );
    assert!(matches!(outcome, Outcome::Buggy { .. }), "got {:?}", outcome);
}

#[test]
fn exhausted_iteration_budget_is_failed() {
    let prog = load(
        "void main() { int i; i = 0; while (i < 3) { i = i + 1; } assert(i == 3); }",
    );
    let config = CegarConfig { max_iterations: 1 };
    let outcome = prove(&prog, PredicateList::new(), &config).expect("analysis");
    assert!(matches!(outcome, Outcome::Failed), "got {:?}", outcome);
}

#[test]
fn seeded_predicates_speed_up_the_proof() {
    let prog = load("int x; void main() { x = 1; assert(x == 1); }");
    let pairs = cricket_syntax::parse_predicates("global: x == 1;").expect("predicates");
    let preds = PredicateList::from_pairs(pairs);
    // with the predicate given up front, a single iteration suffices
    let config = CegarConfig { max_iterations: 1 };
    let outcome = prove(&prog, preds, &config).expect("analysis");
    assert!(matches!(outcome, Outcome::Correct), "got {:?}", outcome);
}

#[test]
fn call_passes_result_through_global() {
    let outcome = check(
        "int r;
         void main() { set(); assert(r == 2); }
         void set() { r = 2; }",
    );
    assert!(matches!(outcome, Outcome::Correct), "got {:?}", outcome);
}

#[test]
fn call_trace_brackets_callee_statements() {
    let outcome = check(
        "int r;
         void main() { set(); assert(r == 1); }
         void set() { r = 2; }",
    );
    let Outcome::Buggy { trace } = outcome else {
        panic!("expected a bug, got {:?}", outcome);
    };
    let call_at = trace
        .iter()
        .position(|s| matches!(s, TraceStmt::Call(_)))
        .expect("call in trace");
    let return_at = trace
        .iter()
        .position(|s| matches!(s, TraceStmt::Return))
        .expect("return in trace");
    assert!(call_at < return_at);
    // the callee's assignment sits between the brackets
    assert!(trace[call_at + 1..return_at]
        .iter()
        .any(|s| matches!(s, TraceStmt::Assign { .. })));
}
