//! Symbolic pushdown control-flow graphs for cricket.
//!
//! An abstracted (boolean) program is translated into a graph whose nodes,
//! transition relation, and call/exit/return relations are all encoded in
//! one decision-diagram manager. Reachability runs as interleaved fixed
//! points that compute procedure summary edges on the way; a shortest
//! witness path can then be extracted from the reach set.

pub mod build;
pub mod graph;
pub mod node;
pub mod reach;

pub use build::{build_cfg, BuiltCfg, CfgError, FAIL_BLOCK};
pub use graph::ControlFlowGraph;
pub use node::{CallSite, Node, NodeKind, Procedure};
pub use reach::{find_path, reachable};
