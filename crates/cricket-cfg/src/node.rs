//! Nodes of the pushdown control-flow graph.

use std::fmt;

/// The six node kinds. The declaration order fixes the encoding layout:
/// main blocks first, then plain blocks, call sites, return sites,
/// procedure entries, procedure exits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Main,
    Block,
    Call,
    Return,
    Entry,
    Exit,
}

/// A control-flow node: a kind plus an index within that kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    pub kind: NodeKind,
    pub id: usize,
}

impl Node {
    pub fn new(kind: NodeKind, id: usize) -> Self {
        Self { kind, id }
    }

    /// `Main(0)` is the unique initial node, `Main(1)` the terminal one.
    pub fn main(id: usize) -> Self {
        Self::new(NodeKind::Main, id)
    }

    /// `Block(0)` is reserved as the assertion-failure sink.
    pub fn block(id: usize) -> Self {
        Self::new(NodeKind::Block, id)
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A call site: a paired call node and return node with the same index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallSite(pub usize);

impl CallSite {
    pub fn call(&self) -> Node {
        Node::new(NodeKind::Call, self.0)
    }

    pub fn retrn(&self) -> Node {
        Node::new(NodeKind::Return, self.0)
    }
}

/// A procedure: a paired entry and exit node with the same index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Procedure(pub usize);

impl Procedure {
    pub fn entry(&self) -> Node {
        Node::new(NodeKind::Entry, self.0)
    }

    pub fn exit(&self) -> Node {
        Node::new(NodeKind::Exit, self.0)
    }
}

/// Legal source/destination kind pairs for ordinary transitions. Call and
/// exit nodes only connect through the call/exit/summary relations.
pub fn legal_transition(src: NodeKind, dst: NodeKind) -> bool {
    use NodeKind::*;
    match src {
        Main => matches!(dst, Main | Call),
        Block => matches!(dst, Block | Call | Return | Exit),
        Call => false,
        Return => matches!(dst, Main | Block | Call | Return | Exit),
        Entry => matches!(dst, Block | Call | Return | Exit),
        Exit => false,
    }
}
