//! Block-scoped function declaration rewriting.
//!
//! A function declared directly inside a block is scoped to that block.
//! Once block scoping is lowered away the declaration form would hoist
//! to the whole function, so it is rewritten as a `var` initialized with
//! an anonymous function expression at the same spot. The binding itself
//! was already flattened (and renamed if needed) by the scope
//! flattener; this pass only changes the declaration syntax.
//!
//! Runs last, gated on the unit's feature set: units that never declare
//! functions inside blocks are left alone.

use crate::ChangeSink;
use sable_ast::{post_order, Ast, Kind, NodeId};

pub fn hoist_block_scoped_functions(ast: &mut Ast, root: NodeId, sink: &mut dyn ChangeSink) {
    for n in post_order(ast, root) {
        if ast.kind(n) != Kind::Function {
            continue;
        }
        let parent = match ast.parent(n) {
            Some(p) if ast.kind(p) == Kind::Block => p,
            _ => continue,
        };
        // The body block of a function hosts ordinary declarations.
        if ast
            .parent(parent)
            .is_some_and(|gp| ast.kind(gp) == Kind::Function)
        {
            continue;
        }
        let name_node = ast.child(n, 0);
        let name = ast.string(name_node).to_string();
        if name.is_empty() {
            continue;
        }
        ast.set_string(name_node, "");
        let placeholder = ast.empty();
        ast.replace_with(n, placeholder);
        let decl = ast.var_decl(&name, Some(n));
        ast.copy_span_from(decl, n);
        ast.replace_with(placeholder, decl);
        sink.report_change(decl);
    }
}
