//! AST node store
//!
//! Nodes live in a growable arena and refer to their children by `NodeId`.
//! A node is owned by the assembly-stack frame that holds its id until a
//! reduction attaches it to a parent; after that only the parent refers to it.

use crate::semantic::symbols::SymbolId;
use crate::types::{DataType, Operand};

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A function parameter, recorded on the function node
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: DataType,
}

/// Metadata carried by a function node
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub name: String,
    pub ret: DataType,
    pub params: Vec<Param>,
}

/// Slot layout of a node. Which slots exist is fixed by the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf,
    Unary {
        operand: NodeId,
    },
    Binary {
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    Loop {
        init: NodeId,
        cond: NodeId,
        incr: NodeId,
        body: NodeId,
    },
    Function {
        body: NodeId,
        sig: FunctionSig,
    },
}

/// A tree node
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    /// Operator, keyword, literal spelling or identifier spelling
    pub token: String,
    pub kind: NodeKind,
    /// Type and folded value of the subtree
    pub attr: Operand,
    /// Resolved binding for identifier leaves
    pub symbol: Option<SymbolId>,
    pub line: u32,
}

impl AstNode {
    pub fn new(token: impl Into<String>, kind: NodeKind, line: u32) -> Self {
        Self {
            token: token.into(),
            kind,
            attr: Operand::unknown(),
            symbol: None,
            line,
        }
    }

    pub fn leaf(token: impl Into<String>, line: u32) -> Self {
        Self::new(token, NodeKind::Leaf, line)
    }

    pub fn with_attr(mut self, attr: Operand) -> Self {
        self.attr = attr;
        self
    }

    pub fn with_symbol(mut self, symbol: SymbolId) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Populated child slots, in slot order
    pub fn children(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Leaf => Vec::new(),
            NodeKind::Unary { operand } => vec![*operand],
            NodeKind::Binary { left, right } => vec![*left, *right],
            NodeKind::Conditional { cond, then_branch, else_branch } => {
                let mut slots = vec![*cond, *then_branch];
                slots.extend(*else_branch);
                slots
            }
            NodeKind::Loop { init, cond, incr, body } => vec![*init, *cond, *incr, *body],
            NodeKind::Function { body, .. } => vec![*body],
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }
}

/// Arena of AST nodes
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<AstNode>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a node into the arena
    pub fn alloc(&mut self, node: AstNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes reachable from `root`
    pub fn subtree_size(&self, root: NodeId) -> usize {
        let mut count = 0;
        let mut work = vec![root];
        while let Some(id) = work.pop() {
            count += 1;
            work.extend(self.get(id).children());
        }
        count
    }
}
