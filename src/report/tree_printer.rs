//! Tree printer - leveled diagram and bracketed preorder
//!
//! Both walks are iterative so that long statement chains (which nest
//! left-deep) cannot exhaust the call stack. Neither walk mutates the tree.

use std::fmt::{self, Write};

use crate::semantic::ast::{Ast, NodeId};
use crate::types::DataType;

/// Every node under `root` with its level (root = 1), in preorder
pub fn assign_levels(ast: &Ast, root: NodeId) -> Vec<(NodeId, u32)> {
    let mut out = Vec::new();
    let mut work = vec![(root, 1)];

    while let Some((id, level)) = work.pop() {
        out.push((id, level));
        for child in ast.get(id).children().into_iter().rev() {
            work.push((child, level + 1));
        }
    }
    out
}

/// Deepest level under `root`
pub fn max_level(ast: &Ast, root: NodeId) -> u32 {
    assign_levels(ast, root).into_iter().map(|(_, level)| level).max().unwrap_or(0)
}

/// `( token child ... )` for internal nodes, the bare token for leaves
pub fn preorder(ast: &Ast, root: NodeId) -> String {
    enum Visit {
        Node(NodeId),
        Close,
    }

    let mut parts: Vec<&str> = Vec::new();
    let mut work = vec![Visit::Node(root)];

    while let Some(visit) = work.pop() {
        let id = match visit {
            Visit::Close => {
                parts.push(")");
                continue;
            }
            Visit::Node(id) => id,
        };

        let node = ast.get(id);
        if node.is_leaf() {
            parts.push(&node.token);
            continue;
        }

        parts.push("(");
        parts.push(&node.token);
        work.push(Visit::Close);
        for child in node.children().into_iter().rev() {
            work.push(Visit::Node(child));
        }
    }

    parts.join(" ")
}

/// Indented outline of the tree, one node per line, prefixed by its level
pub struct LeveledTree<'a> {
    ast: &'a Ast,
    root: NodeId,
}

impl<'a> LeveledTree<'a> {
    pub fn new(ast: &'a Ast, root: NodeId) -> Self {
        Self { ast, root }
    }
}

impl fmt::Display for LeveledTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, level) in assign_levels(self.ast, self.root) {
            let node = self.ast.get(id);
            write!(f, "{:>3} ", level)?;
            for _ in 1..level {
                f.write_str("  ")?;
            }
            f.write_str(&node.token)?;
            if node.attr.ty.is_typed() && node.attr.ty != DataType::Void {
                write!(f, " : {} = {}", node.attr.ty, node.attr.value)?;
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}

/// Print the leveled diagram to a string
pub fn print_tree(ast: &Ast, root: NodeId) -> String {
    LeveledTree::new(ast, root).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::ast::{AstNode, NodeKind};
    use crate::types::Operand;
    use pretty_assertions::assert_eq;

    /// `( if ( < a b ) x )`
    fn sample() -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let a = ast.alloc(AstNode::leaf("a", 1));
        let b = ast.alloc(AstNode::leaf("b", 1));
        let lt = ast.alloc(
            AstNode::new("<", NodeKind::Binary { left: a, right: b }, 1).with_attr(Operand::int(1)),
        );
        let x = ast.alloc(AstNode::leaf("x", 1));
        let kind = NodeKind::Conditional { cond: lt, then_branch: x, else_branch: None };
        let root = ast.alloc(AstNode::new("if", kind, 1));
        (ast, root)
    }

    #[test]
    fn test_levels_are_depth_first() {
        let (ast, root) = sample();
        let levels: Vec<(&str, u32)> = assign_levels(&ast, root)
            .into_iter()
            .map(|(id, level)| (ast.get(id).token.as_str(), level))
            .collect();
        assert_eq!(levels, vec![("if", 1), ("<", 2), ("a", 3), ("b", 3), ("x", 2)]);
        assert_eq!(max_level(&ast, root), 3);
    }

    #[test]
    fn test_preorder_skips_empty_slots() {
        let (ast, root) = sample();
        assert_eq!(preorder(&ast, root), "( if ( < a b ) x )");
    }

    #[test]
    fn test_leaf_root_is_bare() {
        let mut ast = Ast::new();
        let root = ast.alloc(AstNode::leaf("{}", 1));
        assert_eq!(preorder(&ast, root), "{}");
    }

    #[test]
    fn test_leveled_diagram() {
        let (ast, root) = sample();
        let expected = "  1 if\n  2   < : int = 1\n  3     a\n  3     b\n  2   x\n";
        assert_eq!(print_tree(&ast, root), expected);
    }

    #[test]
    fn test_long_chains_do_not_recurse() {
        let mut ast = Ast::new();
        let mut root = ast.alloc(AstNode::leaf(";", 1));
        for _ in 0..100_000 {
            let right = ast.alloc(AstNode::leaf(";", 1));
            root = ast.alloc(AstNode::new("stmt", NodeKind::Binary { left: root, right }, 1));
        }
        assert_eq!(max_level(&ast, root), 100_001);
        assert!(preorder(&ast, root).starts_with("( stmt ( stmt"));
    }
}
