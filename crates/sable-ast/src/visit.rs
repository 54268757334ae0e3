//! Whole-tree traversal.
//!
//! Passes run as full post-order traversals over a snapshot of the tree.
//! The snapshot is taken up front, so a pass may restructure subtrees it
//! has already visited without invalidating the walk.

use crate::node::{Ast, NodeId};

/// All nodes under `root` (inclusive) in post-order: children before
/// their parent, siblings left to right.
pub fn post_order(ast: &Ast, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect(ast, root, &mut out);
    out
}

fn collect(ast: &Ast, n: NodeId, out: &mut Vec<NodeId>) {
    for &child in ast.children(n) {
        collect(ast, child, out);
    }
    out.push(n);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_order_visits_children_first() {
        let mut ast = Ast::new();
        let a = ast.name("a");
        let b = ast.name("b");
        let stmt = ast.assign(a, b);
        let stmt = ast.expr_stmt(stmt);
        let root = ast.script(&[stmt]);

        let order = post_order(&ast, root);
        assert_eq!(order.first(), Some(&a));
        assert_eq!(order.last(), Some(&root));
        let pos = |n| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(stmt));
    }
}
