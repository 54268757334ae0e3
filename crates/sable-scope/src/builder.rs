//! Scope tree construction.
//!
//! One full walk of a compilation unit produces its `ScopeTree`. The
//! walk is rerun from scratch after every structural rewrite pass, so
//! scopes always describe the current tree rather than a stale one.

use crate::scope::{ScopeId, ScopeKind, ScopeTree, VarKind};
use sable_ast::{Ast, Kind, NodeId};

/// Build the scope tree for the unit rooted at `root` (a `Script`).
pub fn build(ast: &Ast, root: NodeId) -> ScopeTree {
    debug_assert_eq!(ast.kind(root), Kind::Script);
    let mut b = Builder {
        ast,
        tree: ScopeTree::new(),
        input: root,
    };
    let global = b.tree.new_scope(None, root, ScopeKind::Global);
    for &child in ast.children(root) {
        b.walk(child, global);
    }
    b.tree
}

struct Builder<'a> {
    ast: &'a Ast,
    tree: ScopeTree,
    input: NodeId,
}

impl Builder<'_> {
    fn walk(&mut self, n: NodeId, scope: ScopeId) {
        match self.ast.kind(n) {
            Kind::Function => self.walk_function(n, scope),
            Kind::Class => {
                let name = self.ast.child(n, 0);
                // A class declaration binds its name in the enclosing
                // scope; class expressions are not declarations.
                if self
                    .ast
                    .parent(n)
                    .is_some_and(|p| self.ast.kind(p).is_statement_parent())
                {
                    self.declare(scope, name, VarKind::Class);
                }
                self.walk(self.ast.child(n, 1), scope);
            }
            Kind::Block => {
                let s = self.tree.new_scope(Some(scope), n, ScopeKind::Block);
                for &child in self.ast.children(n) {
                    self.walk(child, s);
                }
            }
            Kind::For | Kind::ForIn | Kind::ForOf => {
                // The loop header gets its own scope; the body block
                // nests inside it.
                let s = self.tree.new_scope(Some(scope), n, ScopeKind::Block);
                for &child in self.ast.children(n) {
                    self.walk(child, s);
                }
            }
            Kind::Catch => {
                let s = self.tree.new_scope(Some(scope), n, ScopeKind::Block);
                self.declare(s, self.ast.child(n, 0), VarKind::Catch);
                self.walk(self.ast.child(n, 1), s);
            }
            Kind::Var => {
                let hoist = self.tree.closest_hoist_scope(scope);
                self.walk_declarators(n, scope, hoist, VarKind::Var);
            }
            Kind::Let => self.walk_declarators(n, scope, scope, VarKind::Let),
            Kind::Const => self.walk_declarators(n, scope, scope, VarKind::Const),
            _ => {
                for &child in self.ast.children(n) {
                    self.walk(child, scope);
                }
            }
        }
    }

    fn walk_function(&mut self, n: NodeId, scope: ScopeId) {
        let name = self.ast.child(n, 0);
        let params = self.ast.child(n, 1);
        let body = self.ast.child(n, 2);

        let is_declaration = self
            .ast
            .parent(n)
            .is_some_and(|p| self.ast.kind(p).is_statement_parent());
        if is_declaration && !self.ast.string(name).is_empty() {
            // Function declarations bind their name where they appear,
            // which in a block makes the binding block-scoped.
            self.declare(scope, name, VarKind::Function);
        }

        let fscope = self.tree.new_scope(Some(scope), n, ScopeKind::Function);
        if !is_declaration && !self.ast.string(name).is_empty() {
            // A named function expression sees its own name.
            self.declare(fscope, name, VarKind::Function);
        }
        for &p in self.ast.children(params) {
            self.declare(fscope, p, VarKind::Param);
        }

        let bscope = self.tree.new_scope(Some(fscope), body, ScopeKind::FunctionBody);
        for &child in self.ast.children(body) {
            self.walk(child, bscope);
        }
    }

    fn walk_declarators(&mut self, n: NodeId, scope: ScopeId, declare_in: ScopeId, kind: VarKind) {
        for &declarator in self.ast.children(n) {
            self.declare(declare_in, declarator, kind);
            // Initializers are evaluated in the surrounding scope.
            for &init in self.ast.children(declarator) {
                self.walk(init, scope);
            }
        }
    }

    fn declare(&mut self, scope: ScopeId, name_node: NodeId, kind: VarKind) {
        let name = self.ast.string(name_node).to_string();
        self.tree.declare(scope, &name, kind, name_node, self.input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{ScopeKind, VarKind};
    use sable_ast::Kind;

    /// `function f(a) { var x; { let y; } }`
    fn sample() -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let y = ast.declarator("y", None);
        let let_y = ast.decl(Kind::Let, &[y]);
        let inner = ast.block(&[let_y]);
        let x = ast.declarator("x", None);
        let var_x = ast.decl(Kind::Var, &[x]);
        let body = ast.block(&[var_x, inner]);
        let f = ast.function("f", &["a"], body);
        let root = ast.script(&[f]);
        (ast, root)
    }

    #[test]
    fn test_declarations_land_in_the_right_scopes() {
        let (ast, root) = sample();
        let tree = build(&ast, root);

        let global = tree.scope_rooted_at(root).unwrap();
        assert!(tree.is_global(global));
        assert!(tree.is_declared(global, "f", false));
        assert!(!tree.is_declared(global, "x", true));

        let f = ast.child(root, 0);
        let fscope = tree.scope_rooted_at(f).unwrap();
        assert_eq!(tree.kind(fscope), ScopeKind::Function);
        assert!(tree.is_declared(fscope, "a", false));

        let body = ast.child(f, 2);
        let bscope = tree.scope_rooted_at(body).unwrap();
        assert!(tree.is_function_block_scope(bscope));
        assert!(tree.is_declared(bscope, "x", false));
        assert!(!tree.is_declared(bscope, "y", false));

        let inner = ast.child(body, 1);
        let iscope = tree.scope_rooted_at(inner).unwrap();
        let y = tree.get_var(iscope, "y").unwrap();
        assert_eq!(tree.var(y).kind, VarKind::Let);
        assert!(tree.var(y).kind.is_let_or_const());
    }

    #[test]
    fn test_hoist_scope_walks_past_blocks() {
        let (ast, root) = sample();
        let tree = build(&ast, root);
        let f = ast.child(root, 0);
        let body = ast.child(f, 2);
        let inner = ast.child(body, 1);

        let iscope = tree.scope_rooted_at(inner).unwrap();
        let bscope = tree.scope_rooted_at(body).unwrap();
        assert_eq!(tree.closest_hoist_scope(iscope), bscope);
    }

    #[test]
    fn test_reparent_moves_without_duplicating() {
        let (ast, root) = sample();
        let mut tree = build(&ast, root);
        let f = ast.child(root, 0);
        let body = ast.child(f, 2);
        let inner = ast.child(body, 1);

        let iscope = tree.scope_rooted_at(inner).unwrap();
        let bscope = tree.scope_rooted_at(body).unwrap();
        let y = tree.get_var(iscope, "y").unwrap();

        tree.reparent(y, bscope, "y$0").unwrap();
        assert!(!tree.is_declared(iscope, "y", false));
        assert!(tree.is_declared(bscope, "y$0", false));
        assert_eq!(tree.var(y).scope, bscope);
        assert_eq!(tree.var(y).name, "y$0");
    }

    #[test]
    fn test_vars_in_preserves_declaration_order() {
        let mut ast = Ast::new();
        let a = ast.declarator("a", None);
        let let_a = ast.decl(Kind::Let, &[a]);
        let b = ast.declarator("b", None);
        let let_b = ast.decl(Kind::Let, &[b]);
        let block = ast.block(&[let_a, let_b]);
        let root = ast.script(&[block]);

        let tree = build(&ast, root);
        let s = tree.scope_rooted_at(block).unwrap();
        let names: Vec<&str> = tree
            .vars_in(s)
            .map(|v| tree.var(v).name.as_str())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_loop_header_scope() {
        let mut ast = Ast::new();
        let zero = ast.number("0");
        let i = ast.declarator("i", Some(zero));
        let init = ast.decl(Kind::Let, &[i]);
        let cond = ast.empty();
        let incr = ast.empty();
        let body = ast.block(&[]);
        let loop_node = ast.for_loop(init, cond, incr, body);
        let root = ast.script(&[loop_node]);

        let tree = build(&ast, root);
        let hscope = tree.scope_rooted_at(loop_node).unwrap();
        assert!(tree.is_declared(hscope, "i", false));
        let bscope = tree.scope_rooted_at(body).unwrap();
        assert_eq!(tree.parent(bscope), Some(hscope));
    }
}
