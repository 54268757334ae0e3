//! Loop closure materialization.
//!
//! A `let`/`const` declared in a loop binds freshly on every iteration,
//! so a function created inside the loop must observe that iteration's
//! value. After flattening there is only one `var` per binding, which
//! every closure would share. The fix is a per-iteration capture record:
//! each affected loop gets a synthetic object holding the captured
//! bindings as properties, the object is replaced with a copy of itself
//! at the end of every iteration, captured references go through the
//! object, and each capturing function is wrapped in an immediately
//! invoked function that takes the object as a parameter, pinning the
//! iteration's record.
//!
//! Detection and materialization are separate phases over the same
//! recorded state. Detection only reads the tree; materialization only
//! consumes what detection recorded, so tree mutation never races a
//! traversal.

use crate::block_scoping::{add_node_before_loop, handle_declaration_list};
use crate::{ChangeSink, UniqueIds};
use anyhow::{bail, Context, Result};
use sable_ast::{post_order, Ast, Kind, NodeId, Prop, PropValue};
use sable_scope::{ScopeTree, VarId};
use std::collections::{HashMap, HashSet};

/// How a loop advances, which decides where the capture-record update
/// can be spliced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopShape {
    /// `for (init; cond; incr)`: the update joins the increment slot and
    /// the initializer moves out in front of the loop.
    Counting,
    /// `while`: the update goes at the end of the body.
    PreTest,
    /// `do-while`: the update goes at the end of the body, which is the
    /// first child.
    PostTest,
    /// `for-in`/`for-of`: like `while`, plus a copy of the header
    /// binding into the record at the top of the body.
    Iterator,
}

fn loop_shape(kind: Kind) -> Result<LoopShape> {
    match kind {
        Kind::For => Ok(LoopShape::Counting),
        Kind::While => Ok(LoopShape::PreTest),
        Kind::Do => Ok(LoopShape::PostTest),
        Kind::ForIn | Kind::ForOf => Ok(LoopShape::Iterator),
        other => bail!("not a loop: {other:?}"),
    }
}

/// One capture record: the synthetic object for a loop and the variables
/// stored in it, in discovery order.
#[derive(Debug, Clone)]
struct LoopObject {
    name: String,
    vars: Vec<VarId>,
}

/// Records which loops need capture objects and which functions capture
/// them, then rewrites the tree accordingly.
#[derive(Default)]
pub struct LoopClosureTransformer {
    /// Loop node -> its capture record, in discovery order.
    loop_objects: Vec<(NodeId, LoopObject)>,
    /// Capturing function -> indices into `loop_objects`, innermost
    /// last, matching wrapper parameter order.
    function_objects: Vec<(NodeId, Vec<usize>)>,
    /// (function, variable name) pairs already assigned to a record, so
    /// one function capturing a name twice contributes it once.
    handled: HashSet<(NodeId, String)>,
    /// Every reference to each loop-declared `let`/`const`, including
    /// the declaring name itself.
    references: HashMap<VarId, Vec<NodeId>>,
    scopes: Option<ScopeTree>,
}

impl LoopClosureTransformer {
    /// Scan the tree for functions that capture loop-iteration bindings.
    ///
    /// Loop-declared `let`/`const` statements get appended to
    /// `let_consts` so the final sweep still sees declarations this
    /// phase leaves in place.
    pub fn detect_captures(
        &mut self,
        ast: &Ast,
        root: NodeId,
        uids: &mut UniqueIds,
        let_consts: &mut Vec<NodeId>,
    ) -> Result<()> {
        let scopes = sable_scope::build(ast, root);
        for n in post_order(ast, root) {
            if ast.kind(n) != Kind::Name || ast.string(n).is_empty() {
                continue;
            }
            let ref_scope = scopes.scope_for(ast, n)?;
            let var = match scopes.get_var(ref_scope, ast.string(n)) {
                Some(v) => v,
                None => continue,
            };
            if !scopes.var(var).kind.is_let_or_const() {
                continue;
            }

            let decl_parent = ast
                .parent(scopes.var(var).decl)
                .context("declaration is detached")?;
            if ast.kind(decl_parent).is_name_declaration() && !let_consts.contains(&decl_parent) {
                let_consts.push(decl_parent);
            }

            // Innermost loop the declaration belongs to. A scope chain
            // that reaches a function body or the global scope first is
            // not loop-local.
            let declared_in = scopes.var(var).scope;
            let mut loop_node = None;
            let mut s = Some(declared_in);
            while let Some(cur) = s {
                let scope_root = scopes.root(cur);
                if ast.kind(scope_root).is_loop_structure() {
                    loop_node = Some(scope_root);
                    break;
                }
                if let Some(p) = ast.parent(scope_root) {
                    if ast.kind(p).is_loop_structure() {
                        loop_node = Some(p);
                        break;
                    }
                }
                if scopes.is_function_block_scope(cur) || scopes.is_global(cur) {
                    break;
                }
                s = scopes.parent(cur);
            }
            let loop_node = match loop_node {
                Some(l) => l,
                None => continue,
            };

            self.references.entry(var).or_default().push(n);

            // The reference escapes the iteration if a function sits
            // between it and the declaration. The outermost such
            // function is the one to wrap.
            let mut outermost_function = None;
            let mut cur = ref_scope;
            while cur != declared_in && scopes.root(cur) != loop_node {
                if scopes.is_function_scope(cur) {
                    outermost_function = Some(scopes.root(cur));
                }
                cur = match scopes.parent(cur) {
                    Some(p) => p,
                    None => break,
                };
            }
            let function = match outermost_function {
                Some(f) => f,
                None => continue,
            };

            let name = scopes.var(var).name.clone();
            if !self.handled.insert((function, name)) {
                continue;
            }
            let object_index = match self.loop_objects.iter().position(|(l, _)| *l == loop_node) {
                Some(i) => i,
                None => {
                    let object = LoopObject {
                        name: format!("$loop${}", uids.next_id()),
                        vars: Vec::new(),
                    };
                    self.loop_objects.push((loop_node, object));
                    self.loop_objects.len() - 1
                }
            };
            let object = &mut self.loop_objects[object_index].1;
            if !object.vars.contains(&var) {
                object.vars.push(var);
            }
            match self.function_objects.iter_mut().find(|(f, _)| *f == function) {
                Some((_, indices)) => {
                    if !indices.contains(&object_index) {
                        indices.push(object_index);
                    }
                }
                None => self.function_objects.push((function, vec![object_index])),
            }
        }
        log::debug!(
            "loop closures: {} loop(s), {} capturing function(s)",
            self.loop_objects.len(),
            self.function_objects.len()
        );
        self.scopes = Some(scopes);
        Ok(())
    }

    /// Rewrite every recorded loop and capturing function. Declarations
    /// absorbed into capture records are removed from `let_consts`.
    pub fn materialize(
        &mut self,
        ast: &mut Ast,
        sink: &mut dyn ChangeSink,
        let_consts: &mut Vec<NodeId>,
    ) -> Result<()> {
        if self.loop_objects.is_empty() {
            return Ok(());
        }
        let scopes = self
            .scopes
            .take()
            .context("detect_captures must run before materialize")?;

        for (loop_node, object) in self.loop_objects.clone() {
            let props: Vec<String> = object
                .vars
                .iter()
                .map(|&v| scopes.var(v).name.clone())
                .collect();

            let empty_lit = ast.object_lit(&[]);
            let obj_decl = ast.var_decl(&object.name, Some(empty_lit));
            ast.copy_span_from(obj_decl, loop_node);
            add_node_before_loop(ast, obj_decl, loop_node, sink);

            // $loop$N = {a: $loop$N.a, ...}, evaluated once per
            // iteration so the next iteration writes a fresh record.
            let mut entries = Vec::with_capacity(props.len());
            for p in &props {
                let obj_ref = ast.name(&object.name);
                let value = ast.getprop(obj_ref, p);
                entries.push(ast.string_key(p, value));
            }
            let next_record = ast.object_lit(&entries);
            let target = ast.name(&object.name);
            let update = ast.assign(target, next_record);
            ast.copy_span_from(update, loop_node);

            match loop_shape(ast.kind(loop_node))? {
                LoopShape::Counting => {
                    let init = ast.child(loop_node, 0);
                    if ast.kind(init) != Kind::Empty {
                        let placeholder = ast.empty();
                        ast.replace_with(init, placeholder);
                        let moved = if ast.kind(init).is_name_declaration() {
                            init
                        } else {
                            ast.expr_stmt(init)
                        };
                        ast.copy_span_from(moved, loop_node);
                        add_node_before_loop(ast, moved, loop_node, sink);
                    }
                    let incr = ast.child(loop_node, 2);
                    if ast.kind(incr) == Kind::Empty {
                        ast.replace_with(incr, update);
                    } else {
                        let placeholder = ast.empty();
                        ast.replace_with(incr, placeholder);
                        let joined = ast.comma(update, incr);
                        ast.replace_with(placeholder, joined);
                    }
                }
                LoopShape::PostTest => {
                    let body = ast.child(loop_node, 0);
                    let stmt = ast.expr_stmt(update);
                    ast.add_child(body, stmt);
                }
                LoopShape::PreTest | LoopShape::Iterator => {
                    let body = ast.last_child(loop_node).context("loop has no body")?;
                    let stmt = ast.expr_stmt(update);
                    ast.add_child(body, stmt);
                }
            }
            sink.report_change(loop_node);

            for (&var, prop) in object.vars.iter().zip(&props) {
                let refs = self.references.get(&var).cloned().unwrap_or_default();
                for mut reference in refs {
                    let parent = ast.parent(reference).context("reference is detached")?;

                    // `for (let v of e)`: the header binding keeps
                    // driving the loop; copy it into the record at the
                    // top of each iteration instead.
                    if ast.kind(loop_node).is_enhanced_for()
                        && ast.first_child(loop_node) == Some(parent)
                    {
                        let obj_ref = ast.name(&object.name);
                        let slot = ast.getprop(obj_ref, prop);
                        let value = ast.clone_node(reference);
                        let copy = ast.assign(slot, value);
                        let stmt = ast.expr_stmt(copy);
                        ast.copy_span_from(stmt, reference);
                        let body = ast.last_child(loop_node).context("loop has no body")?;
                        ast.add_child_to_front(body, stmt);
                        sink.report_change(loop_node);
                        continue;
                    }

                    if ast.kind(parent).is_name_declaration() {
                        handle_declaration_list(ast, parent, sink);
                        // Splitting may have moved the declarator.
                        let declaration =
                            ast.parent(reference).context("declarator is detached")?;
                        if ast.has_children(reference) {
                            let new_reference = ast.clone_node(reference);
                            let init = ast.remove_first_child(reference);
                            let assign = ast.assign(new_reference, init);
                            carry_declaration_props(ast, declaration, reference, assign);
                            let stmt = ast.expr_stmt(assign);
                            ast.copy_span_from(stmt, declaration);
                            ast.replace_with(declaration, stmt);
                            reference = new_reference;
                        } else {
                            ast.detach(declaration);
                        }
                        let_consts.retain(|&d| d != declaration);
                    }

                    let parent = ast.parent(reference).context("reference is detached")?;
                    if ast.kind(parent) == Kind::Call && ast.first_child(parent) == Some(reference)
                    {
                        // The callee is a property access now, so the
                        // call is no longer free.
                        ast.set_prop(parent, Prop::FreeCall, PropValue::Bool(false));
                    }
                    let obj_ref = ast.name(&object.name);
                    let access = ast.getprop(obj_ref, prop);
                    ast.copy_span_from(access, reference);
                    ast.replace_with(reference, access);
                    sink.report_change(access);
                }
            }
        }

        // Wrap each capturing function so it closes over this
        // iteration's records rather than the loop-carried variables.
        for (function, object_indices) in self.function_objects.clone() {
            let names: Vec<String> = object_indices
                .iter()
                .map(|&i| self.loop_objects[i].1.name.clone())
                .collect();
            let ret = ast.return_stmt(None);
            let body = ast.block(&[ret]);
            let params: Vec<&str> = names.iter().map(String::as_str).collect();
            let wrapper = ast.function("", &params, body);
            let mut args = Vec::with_capacity(names.len());
            for name in &names {
                args.push(ast.name(name));
            }
            let call = ast.call(wrapper, &args);
            ast.set_prop(call, Prop::FreeCall, PropValue::Bool(true));
            ast.copy_span_from(call, function);

            let is_declaration = ast
                .parent(function)
                .is_some_and(|p| ast.kind(p).is_statement_parent())
                && !ast.string(ast.child(function, 0)).is_empty();
            if is_declaration {
                // `function f() {}` becomes `var f = (wrapper)(...);`
                // so existing references to `f` keep working.
                let fn_name = ast.string(ast.child(function, 0)).to_string();
                let rebind = ast.var_decl(&fn_name, Some(call));
                ast.copy_span_from(rebind, function);
                ast.replace_with(function, rebind);
            } else {
                ast.replace_with(function, call);
            }
            ast.add_child(ret, function);
            sink.report_change(call);
        }
        Ok(())
    }
}

/// Carry constancy and inline type information from a declaration onto
/// the assignment that replaces it.
fn carry_declaration_props(ast: &mut Ast, declaration: NodeId, name: NodeId, dest: NodeId) {
    if let Some(ty) = ast.type_annotation(declaration).map(str::to_string) {
        ast.set_prop(dest, Prop::TypeAnnotation, PropValue::Str(ty));
    } else if let Some(PropValue::Str(ty)) = ast.clear_prop(name, Prop::TypeAnnotation) {
        ast.set_prop(dest, Prop::TypeAnnotation, PropValue::Str(ty));
    }
    if ast.bool_prop(declaration, Prop::Const) {
        ast.set_prop(dest, Prop::Const, PropValue::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_scoping::{rewrite_block_scoped_declarations, RewriteOptions};
    use crate::NullSink;
    use sable_ast::to_source;

    fn lower(ast: &mut Ast, root: NodeId) -> String {
        let mut uids = UniqueIds::new();
        rewrite_block_scoped_declarations(
            ast,
            root,
            &mut uids,
            &mut NullSink,
            &RewriteOptions::default(),
        )
        .unwrap();
        to_source(ast, root)
    }

    /// fns.push(function() { return <name>; });
    fn push_closure_returning(ast: &mut Ast, receiver: &str, name: &str) -> NodeId {
        let n = ast.name(name);
        let ret = ast.return_stmt(Some(n));
        let body = ast.block(&[ret]);
        let f = ast.function("", &[], body);
        let recv = ast.name(receiver);
        let push = ast.getprop(recv, "push");
        let call = ast.call(push, &[f]);
        ast.expr_stmt(call)
    }

    fn counting_loop_capturing_i(ast: &mut Ast) -> NodeId {
        let zero = ast.number("0");
        let i = ast.declarator("i", Some(zero));
        let init = ast.decl(Kind::Let, &[i]);
        let i_ref = ast.name("i");
        let three = ast.number("3");
        let cond = ast.binary("<", i_ref, three);
        let i_ref2 = ast.name("i");
        let incr = ast.increment(i_ref2);
        let push = push_closure_returning(ast, "fns", "i");
        let body = ast.block(&[push]);
        ast.for_loop(init, cond, incr, body)
    }

    #[test]
    fn test_counting_loop_capture() {
        let mut ast = Ast::new();
        let loop_node = counting_loop_capturing_i(&mut ast);
        let root = ast.script(&[loop_node]);

        assert_eq!(
            lower(&mut ast, root),
            "var $loop$0 = {}; $loop$0.i = 0; \
             for (; $loop$0.i < 3; $loop$0 = {i: $loop$0.i}, $loop$0.i++) \
             { fns.push((function($loop$0) { return function() { return $loop$0.i; }; })($loop$0)); }"
        );
    }

    #[test]
    fn test_labeled_loop_hoists_past_label() {
        let mut ast = Ast::new();
        let loop_node = counting_loop_capturing_i(&mut ast);
        let labeled = ast.label("outer", loop_node);
        let root = ast.script(&[labeled]);

        let out = lower(&mut ast, root);
        assert!(
            out.starts_with("var $loop$0 = {}; $loop$0.i = 0; outer: for (;"),
            "got: {out}"
        );
    }

    #[test]
    fn test_do_loop_capture() {
        // do { let y = compute(); closures.push(function() { return y; }); }
        // while (cond());
        let mut ast = Ast::new();
        let compute = ast.name("compute");
        let compute_call = ast.call(compute, &[]);
        let y = ast.declarator("y", Some(compute_call));
        let let_y = ast.decl(Kind::Let, &[y]);
        let push = push_closure_returning(&mut ast, "closures", "y");
        let body = ast.block(&[let_y, push]);
        let cond = ast.name("cond");
        let cond_call = ast.call(cond, &[]);
        let loop_node = ast.do_loop(body, cond_call);
        let root = ast.script(&[loop_node]);

        assert_eq!(
            lower(&mut ast, root),
            "var $loop$0 = {}; do { $loop$0.y = compute(); \
             closures.push((function($loop$0) { return function() { return $loop$0.y; }; })($loop$0)); \
             $loop$0 = {y: $loop$0.y}; } while (cond());"
        );
    }

    #[test]
    fn test_for_of_header_binding_copied_into_record() {
        // for (const v of list) { arr.push(function() { return v; }); }
        let mut ast = Ast::new();
        let v = ast.declarator("v", None);
        let decl = ast.decl(Kind::Const, &[v]);
        let list = ast.name("list");
        let push = push_closure_returning(&mut ast, "arr", "v");
        let body = ast.block(&[push]);
        let loop_node = ast.for_of(decl, list, body);
        let root = ast.script(&[loop_node]);

        assert_eq!(
            lower(&mut ast, root),
            "var $loop$0 = {}; for (/** @const */ var v of list) \
             { $loop$0.v = v; \
             arr.push((function($loop$0) { return function() { return $loop$0.v; }; })($loop$0)); \
             $loop$0 = {v: $loop$0.v}; }"
        );
    }

    #[test]
    fn test_for_in_header_binding_copied_into_record() {
        // for (const k in obj) { fns.push(function() { return k; }); }
        let mut ast = Ast::new();
        let k = ast.declarator("k", None);
        let decl = ast.decl(Kind::Const, &[k]);
        let obj = ast.name("obj");
        let push = push_closure_returning(&mut ast, "fns", "k");
        let body = ast.block(&[push]);
        let loop_node = ast.for_in(decl, obj, body);
        let root = ast.script(&[loop_node]);

        let out = lower(&mut ast, root);
        assert_eq!(
            out,
            "var $loop$0 = {}; for (var k in obj) \
             { $loop$0.k = k; \
             fns.push((function($loop$0) { return function() { return $loop$0.k; }; })($loop$0)); \
             $loop$0 = {k: $loop$0.k}; }"
        );
        // The for-in header's left side stays writable; the loop assigns
        // it, so `const` must not leave a constancy annotation there.
        assert!(!out.contains("@const"), "got: {out}");
    }

    #[test]
    fn test_nested_loops_one_record_each() {
        // for (let i = 0; i < 3; i++)
        //   for (let j = 0; j < 3; j++)
        //     fns.push(function() { return i + j; });
        let mut ast = Ast::new();
        let i_ref = ast.name("i");
        let j_ref = ast.name("j");
        let sum = ast.binary("+", i_ref, j_ref);
        let ret = ast.return_stmt(Some(sum));
        let fn_body = ast.block(&[ret]);
        let f = ast.function("", &[], fn_body);
        let fns = ast.name("fns");
        let push = ast.getprop(fns, "push");
        let push_call = ast.call(push, &[f]);
        let push_stmt = ast.expr_stmt(push_call);

        let zero_j = ast.number("0");
        let j = ast.declarator("j", Some(zero_j));
        let init_j = ast.decl(Kind::Let, &[j]);
        let j2 = ast.name("j");
        let three_j = ast.number("3");
        let cond_j = ast.binary("<", j2, three_j);
        let j3 = ast.name("j");
        let incr_j = ast.increment(j3);
        let inner_body = ast.block(&[push_stmt]);
        let inner = ast.for_loop(init_j, cond_j, incr_j, inner_body);

        let zero_i = ast.number("0");
        let i = ast.declarator("i", Some(zero_i));
        let init_i = ast.decl(Kind::Let, &[i]);
        let i2 = ast.name("i");
        let three_i = ast.number("3");
        let cond_i = ast.binary("<", i2, three_i);
        let i3 = ast.name("i");
        let incr_i = ast.increment(i3);
        let outer_body = ast.block(&[inner]);
        let outer = ast.for_loop(init_i, cond_i, incr_i, outer_body);
        let root = ast.script(&[outer]);

        assert_eq!(
            lower(&mut ast, root),
            "var $loop$0 = {}; $loop$0.i = 0; \
             for (; $loop$0.i < 3; $loop$0 = {i: $loop$0.i}, $loop$0.i++) \
             { var $loop$1 = {}; $loop$1.j = 0; \
             for (; $loop$1.j < 3; $loop$1 = {j: $loop$1.j}, $loop$1.j++) \
             { fns.push((function($loop$0, $loop$1) \
             { return function() { return $loop$0.i + $loop$1.j; }; })($loop$0, $loop$1)); } }"
        );
    }

    #[test]
    fn test_two_closures_share_one_record() {
        // for (let i = 0; i < 3; i++) { a.push(fn); b.push(fn); }
        let mut ast = Ast::new();
        let zero = ast.number("0");
        let i = ast.declarator("i", Some(zero));
        let init = ast.decl(Kind::Let, &[i]);
        let i2 = ast.name("i");
        let three = ast.number("3");
        let cond = ast.binary("<", i2, three);
        let i3 = ast.name("i");
        let incr = ast.increment(i3);
        let push_a = push_closure_returning(&mut ast, "a", "i");
        let push_b = push_closure_returning(&mut ast, "b", "i");
        let body = ast.block(&[push_a, push_b]);
        let loop_node = ast.for_loop(init, cond, incr, body);
        let root = ast.script(&[loop_node]);

        let out = lower(&mut ast, root);
        assert!(!out.contains("$loop$1"), "got: {out}");
        assert_eq!(out.matches("(function($loop$0)").count(), 2, "got: {out}");
    }

    #[test]
    fn test_captured_function_declaration_rebinds_by_name() {
        // for (let i = 0; i < 3; i++) { function f() { return i; } arr.push(f); }
        let mut ast = Ast::new();
        let zero = ast.number("0");
        let i = ast.declarator("i", Some(zero));
        let init = ast.decl(Kind::Let, &[i]);
        let i2 = ast.name("i");
        let three = ast.number("3");
        let cond = ast.binary("<", i2, three);
        let i3 = ast.name("i");
        let incr = ast.increment(i3);
        let i4 = ast.name("i");
        let ret = ast.return_stmt(Some(i4));
        let f_body = ast.block(&[ret]);
        let f = ast.function("f", &[], f_body);
        let arr = ast.name("arr");
        let push = ast.getprop(arr, "push");
        let f_ref = ast.name("f");
        let push_call = ast.call(push, &[f_ref]);
        let push_stmt = ast.expr_stmt(push_call);
        let body = ast.block(&[f, push_stmt]);
        let loop_node = ast.for_loop(init, cond, incr, body);
        let root = ast.script(&[loop_node]);

        assert_eq!(
            lower(&mut ast, root),
            "var $loop$0 = {}; $loop$0.i = 0; \
             for (; $loop$0.i < 3; $loop$0 = {i: $loop$0.i}, $loop$0.i++) \
             { var f = (function($loop$0) { return function f() { return $loop$0.i; }; })($loop$0); \
             arr.push(f); }"
        );
    }

    #[test]
    fn test_calling_a_captured_binding_clears_free_call() {
        // for (let g = mk(); cond(); ) { use(function() { g(); }); }
        let mut ast = Ast::new();
        let mk = ast.name("mk");
        let mk_call = ast.call(mk, &[]);
        let g = ast.declarator("g", Some(mk_call));
        let init = ast.decl(Kind::Let, &[g]);
        let cond = ast.name("cond");
        let cond_call = ast.call(cond, &[]);
        let incr = ast.empty();
        let g_ref = ast.name("g");
        let inner_call = ast.call(g_ref, &[]);
        let inner_stmt = ast.expr_stmt(inner_call);
        let fn_body = ast.block(&[inner_stmt]);
        let f = ast.function("", &[], fn_body);
        let use_name = ast.name("use");
        let use_call = ast.call(use_name, &[f]);
        let use_stmt = ast.expr_stmt(use_call);
        let body = ast.block(&[use_stmt]);
        let loop_node = ast.for_loop(init, cond_call, incr, body);
        let root = ast.script(&[loop_node]);

        let out = lower(&mut ast, root);
        assert!(out.contains("$loop$0.g();"), "got: {out}");
        assert_eq!(
            ast.prop(inner_call, Prop::FreeCall),
            Some(&PropValue::Bool(false))
        );
        let wrapper_call = ast
            .parent(ast.parent(f).unwrap())
            .and_then(|ret| ast.parent(ret))
            .and_then(|b| ast.parent(b))
            .unwrap();
        assert_eq!(ast.kind(wrapper_call), Kind::Call);
        assert_eq!(
            ast.prop(wrapper_call, Prop::FreeCall),
            Some(&PropValue::Bool(true))
        );
    }

    #[test]
    fn test_const_capture_carries_constancy_onto_assignment() {
        // while (cond()) { const k = mk(); use(function() { return k; }); }
        let mut ast = Ast::new();
        let mk = ast.name("mk");
        let mk_call = ast.call(mk, &[]);
        let k = ast.declarator("k", Some(mk_call));
        let decl = ast.decl(Kind::Const, &[k]);
        let push = push_closure_returning(&mut ast, "out", "k");
        let body = ast.block(&[decl, push]);
        let cond = ast.name("cond");
        let cond_call = ast.call(cond, &[]);
        let loop_node = ast.while_loop(cond_call, body);
        let root = ast.script(&[loop_node]);

        let out = lower(&mut ast, root);
        assert!(out.contains("$loop$0.k = mk();"), "got: {out}");
        // The record write that replaced the declaration keeps the
        // constancy marker.
        let assigns: Vec<NodeId> = post_order(&ast, root)
            .into_iter()
            .filter(|&n| ast.kind(n) == Kind::Assign && ast.bool_prop(n, Prop::Const))
            .collect();
        assert_eq!(assigns.len(), 1);
    }

    #[test]
    fn test_uncaptured_loop_binding_stays_a_var() {
        // for (let i = 0; i < 3; i++) { use(i); }
        let mut ast = Ast::new();
        let zero = ast.number("0");
        let i = ast.declarator("i", Some(zero));
        let init = ast.decl(Kind::Let, &[i]);
        let i2 = ast.name("i");
        let three = ast.number("3");
        let cond = ast.binary("<", i2, three);
        let i3 = ast.name("i");
        let incr = ast.increment(i3);
        let use_name = ast.name("use");
        let i4 = ast.name("i");
        let use_call = ast.call(use_name, &[i4]);
        let use_stmt = ast.expr_stmt(use_call);
        let body = ast.block(&[use_stmt]);
        let loop_node = ast.for_loop(init, cond, incr, body);
        let root = ast.script(&[loop_node]);

        assert_eq!(
            lower(&mut ast, root),
            "for (var i = 0; i < 3; i++) { use(i); }"
        );
    }
}
