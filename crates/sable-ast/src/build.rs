//! Convenience constructors for synthesized subtrees.
//!
//! The lowering passes (and tests) build replacement code with these
//! helpers instead of wiring kinds and children by hand. Every helper
//! returns a detached node; callers attach it where it belongs.

use crate::node::{Ast, Kind, NodeId, Prop, PropValue};

impl Ast {
    pub fn name(&mut self, s: &str) -> NodeId {
        let n = self.node(Kind::Name);
        self.set_string(n, s);
        n
    }

    pub fn string_lit(&mut self, s: &str) -> NodeId {
        let n = self.node(Kind::Str);
        self.set_string(n, s);
        n
    }

    pub fn number(&mut self, text: &str) -> NodeId {
        let n = self.node(Kind::Num);
        self.set_string(n, text);
        n
    }

    pub fn empty(&mut self) -> NodeId {
        self.node(Kind::Empty)
    }

    fn with_children(&mut self, kind: Kind, children: &[NodeId]) -> NodeId {
        let n = self.node(kind);
        for &c in children {
            self.add_child(n, c);
        }
        n
    }

    pub fn script(&mut self, stmts: &[NodeId]) -> NodeId {
        self.with_children(Kind::Script, stmts)
    }

    pub fn block(&mut self, stmts: &[NodeId]) -> NodeId {
        self.with_children(Kind::Block, stmts)
    }

    /// A declarator for use inside `var`/`let`/`const` statements.
    pub fn declarator(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        let n = self.name(name);
        if let Some(init) = init {
            self.add_child(n, init);
        }
        n
    }

    /// A declaration statement of the given binding kind over `Name`
    /// declarators.
    pub fn decl(&mut self, kind: Kind, declarators: &[NodeId]) -> NodeId {
        debug_assert!(kind.is_name_declaration());
        self.with_children(kind, declarators)
    }

    /// Shorthand for a single-declarator `var`.
    pub fn var_decl(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        let d = self.declarator(name, init);
        self.decl(Kind::Var, &[d])
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.with_children(Kind::ExprResult, &[expr])
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.with_children(Kind::Assign, &[target, value])
    }

    pub fn comma(&mut self, first: NodeId, second: NodeId) -> NodeId {
        self.with_children(Kind::Comma, &[first, second])
    }

    pub fn call(&mut self, callee: NodeId, args: &[NodeId]) -> NodeId {
        let n = self.with_children(Kind::Call, &[callee]);
        for &a in args {
            self.add_child(n, a);
        }
        n
    }

    pub fn getprop(&mut self, object: NodeId, property: &str) -> NodeId {
        let key = self.string_lit(property);
        self.with_children(Kind::GetProp, &[object, key])
    }

    pub fn object_lit(&mut self, entries: &[NodeId]) -> NodeId {
        self.with_children(Kind::ObjectLit, entries)
    }

    pub fn string_key(&mut self, key: &str, value: NodeId) -> NodeId {
        let n = self.node(Kind::StringKey);
        self.set_string(n, key);
        self.add_child(n, value);
        n
    }

    /// A function with the given name (may be `""` for an anonymous
    /// function expression), parameter names and body block.
    pub fn function(&mut self, name: &str, params: &[&str], body: NodeId) -> NodeId {
        debug_assert_eq!(self.kind(body), Kind::Block);
        let fn_name = self.name(name);
        let param_list = self.node(Kind::ParamList);
        for p in params {
            let p = self.name(p);
            self.add_child(param_list, p);
        }
        self.with_children(Kind::Function, &[fn_name, param_list, body])
    }

    pub fn return_stmt(&mut self, expr: Option<NodeId>) -> NodeId {
        let n = self.node(Kind::Return);
        if let Some(expr) = expr {
            self.add_child(n, expr);
        }
        n
    }

    pub fn if_stmt(&mut self, cond: NodeId, then: NodeId, els: Option<NodeId>) -> NodeId {
        let n = self.with_children(Kind::If, &[cond, then]);
        if let Some(els) = els {
            self.add_child(n, els);
        }
        n
    }

    pub fn for_loop(&mut self, init: NodeId, cond: NodeId, incr: NodeId, body: NodeId) -> NodeId {
        self.with_children(Kind::For, &[init, cond, incr, body])
    }

    pub fn for_in(&mut self, target: NodeId, object: NodeId, body: NodeId) -> NodeId {
        self.with_children(Kind::ForIn, &[target, object, body])
    }

    pub fn for_of(&mut self, target: NodeId, iterable: NodeId, body: NodeId) -> NodeId {
        self.with_children(Kind::ForOf, &[target, iterable, body])
    }

    pub fn while_loop(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.with_children(Kind::While, &[cond, body])
    }

    pub fn do_loop(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.with_children(Kind::Do, &[body, cond])
    }

    pub fn label(&mut self, name: &str, stmt: NodeId) -> NodeId {
        let n = self.with_children(Kind::Label, &[stmt]);
        self.set_string(n, name);
        n
    }

    pub fn try_stmt(&mut self, block: NodeId, catch: Option<NodeId>) -> NodeId {
        let n = self.with_children(Kind::Try, &[block]);
        if let Some(catch) = catch {
            self.add_child(n, catch);
        }
        n
    }

    pub fn catch(&mut self, param: &str, body: NodeId) -> NodeId {
        let p = self.name(param);
        self.with_children(Kind::Catch, &[p, body])
    }

    pub fn class_decl(&mut self, name: &str, body: NodeId) -> NodeId {
        let class_name = self.name(name);
        self.with_children(Kind::Class, &[class_name, body])
    }

    pub fn binary(&mut self, op: &str, left: NodeId, right: NodeId) -> NodeId {
        let n = self.with_children(Kind::Bin, &[left, right]);
        self.set_string(n, op);
        n
    }

    pub fn increment(&mut self, operand: NodeId) -> NodeId {
        self.with_children(Kind::Inc, &[operand])
    }

    pub fn cast(&mut self, expr: NodeId, annotation: &str) -> NodeId {
        let n = self.with_children(Kind::Cast, &[expr]);
        self.set_prop(n, Prop::TypeAnnotation, PropValue::Str(annotation.to_string()));
        n
    }
}
