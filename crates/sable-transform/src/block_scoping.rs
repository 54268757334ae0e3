//! Rewrite block-scoped declarations as function-scoped `var`s.
//!
//! Declarations and their references are renamed when flattening them
//! into the enclosing hoist scope would collide with an existing or free
//! name. Runs after destructuring has been eliminated; declarators here
//! always bind a single identifier.
//!
//! The pass is a fixed sequence of full traversals: collect free names,
//! flatten scopes (recording renames), rewrite references through the
//! completed rename table, materialize loop closures, then convert every
//! remaining `let`/`const` to `var`. Each traversal finishes before the
//! next starts; the rename table and the capture groups must be complete
//! over the whole tree before they are consumed.

use crate::loop_closures::LoopClosureTransformer;
use crate::{ChangeSink, UniqueIds};
use anyhow::{Context, Result};
use sable_ast::{post_order, Ast, Kind, NodeId, Prop, PropValue};
use sable_scope::ScopeTree;
use std::collections::{HashMap, HashSet};

/// Pass configuration, derived from the host's output-target settings.
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    /// Also hoist function declarations out of blocks, for targets
    /// without block-scoped function declarations. Gated per unit on its
    /// feature set.
    pub lower_block_scoped_functions: bool,
}

/// Lower every block-scoped declaration under `root` (a `Script`).
///
/// On success the tree contains no `let`/`const` tokens; every
/// previously block-scoped binding is a `var` or a loop-object property,
/// and all references are updated consistently.
pub fn rewrite_block_scoped_declarations(
    ast: &mut Ast,
    root: NodeId,
    uids: &mut UniqueIds,
    sink: &mut dyn ChangeSink,
    options: &RewriteOptions,
) -> Result<()> {
    let mut pass = BlockScoping::default();
    pass.collect_undeclared_names(ast, root)?;
    pass.flatten_scopes(ast, root, uids, sink)?;
    pass.rename_references(ast, root, sink)?;

    let mut transformer = LoopClosureTransformer::default();
    transformer.detect_captures(ast, root, uids, &mut pass.let_consts)?;
    transformer.materialize(ast, sink, &mut pass.let_consts)?;

    pass.rewrite_decls_to_vars(ast, sink);

    if options.lower_block_scoped_functions && ast.features(root).block_scoped_functions {
        crate::function_hoist::hoist_block_scoped_functions(ast, root, sink);
    }
    Ok(())
}

#[derive(Default)]
struct BlockScoping {
    /// (declaring scope root, original name) -> new name.
    rename_table: HashMap<(NodeId, String), String>,
    /// Every `let`/`const` statement seen, pending conversion to `var`.
    let_consts: Vec<NodeId>,
    /// Names referenced without any enclosing declaration. A rename must
    /// avoid these as well: shadowing an intended free reference would
    /// change meaning.
    undeclared: HashSet<String>,
}

impl BlockScoping {
    /// Record every identifier reference with no declaration anywhere up
    /// its scope chain. No side effects on the tree.
    fn collect_undeclared_names(&mut self, ast: &Ast, root: NodeId) -> Result<()> {
        let scopes = sable_scope::build(ast, root);
        for n in post_order(ast, root) {
            if ast.kind(n) != Kind::Name || ast.string(n).is_empty() {
                continue;
            }
            let scope = scopes.scope_for(ast, n)?;
            if !scopes.is_declared(scope, ast.string(n), true) {
                self.undeclared.insert(ast.string(n).to_string());
            }
        }
        log::debug!("collected {} undeclared name(s)", self.undeclared.len());
        Ok(())
    }

    /// Move every block-scoped declaration into its hoist scope,
    /// renaming on collision and reinitializing loop-local bindings.
    fn flatten_scopes(
        &mut self,
        ast: &mut Ast,
        root: NodeId,
        uids: &mut UniqueIds,
        sink: &mut dyn ChangeSink,
    ) -> Result<()> {
        let mut scopes = sable_scope::build(ast, root);
        for n in post_order(ast, root) {
            if is_block_scoped_declaration(ast, n) {
                self.flatten_one(ast, &mut scopes, n, uids, sink)?;
            }
        }
        Ok(())
    }

    fn flatten_one(
        &mut self,
        ast: &mut Ast,
        scopes: &mut ScopeTree,
        n: NodeId,
        uids: &mut UniqueIds,
        sink: &mut dyn ChangeSink,
    ) -> Result<()> {
        let kind = ast.kind(n);
        let declarators: Vec<NodeId> = match kind {
            Kind::Let | Kind::Const => ast.children(n).to_vec(),
            // Catch parameters, class names and block-scoped function
            // names flatten too, but are never reinitialized.
            Kind::Catch | Kind::Function | Kind::Class => vec![ast.child(n, 0)],
            other => unreachable!("not a block-scoped declaration: {other:?}"),
        };

        if matches!(kind, Kind::Let | Kind::Const) && !self.let_consts.contains(&n) {
            self.let_consts.push(n);
        }

        for name_node in declarators {
            // A fresh per-iteration binding starts out undefined each
            // time around; a hoisted var would retain the previous
            // iteration's value, so reset it explicitly.
            if matches!(kind, Kind::Let | Kind::Const)
                && !ast.has_children(name_node)
                && !ast
                    .parent(n)
                    .is_some_and(|p| ast.kind(p).is_enhanced_for())
                && in_loop(ast, n)
            {
                let undefined = ast.name("undefined");
                let init = match declared_type(ast, n, name_node) {
                    Some(ty) => ast.cast(undefined, &ty),
                    None => undefined,
                };
                ast.copy_span_from(init, name_node);
                ast.add_child(name_node, init);
                sink.report_change(init);
            }

            let var = scopes
                .var_of_decl(name_node)
                .with_context(|| format!("declaration `{}`", ast.string(name_node)))?;
            let scope = scopes.var(var).scope;
            let hoist = scopes.closest_hoist_scope(scope);
            if scope == hoist {
                continue;
            }

            let old_name = ast.string(name_node).to_string();
            let mut new_name = old_name.clone();
            if scopes.is_declared(hoist, &old_name, true) || self.undeclared.contains(&old_name) {
                loop {
                    new_name = format!("{}${}", old_name, uids.next_id());
                    // Validate generated names against the free-name set
                    // too, not only declared names.
                    if !scopes.is_declared(hoist, &new_name, true)
                        && !self.undeclared.contains(&new_name)
                    {
                        break;
                    }
                }
                ast.set_string(name_node, new_name.clone());
                sink.report_change(name_node);
                let scope_root = scopes.root(scope);
                log::trace!("renamed `{old_name}` to `{new_name}`");
                self.rename_table
                    .insert((scope_root, old_name), new_name.clone());
            }
            scopes.reparent(var, hoist, &new_name)?;
        }
        Ok(())
    }

    /// Substitute renamed declarations at every reference. Requires the
    /// rename table to be complete for the whole tree: a reference may
    /// textually precede the declaration it resolves to.
    fn rename_references(
        &self,
        ast: &mut Ast,
        root: NodeId,
        sink: &mut dyn ChangeSink,
    ) -> Result<()> {
        if self.rename_table.is_empty() {
            return Ok(());
        }
        let scopes = sable_scope::build(ast, root);
        for n in post_order(ast, root) {
            if ast.kind(n) != Kind::Name || ast.string(n).is_empty() {
                continue;
            }
            let mut scope = Some(scopes.scope_for(ast, n)?);
            while let Some(s) = scope {
                let key = (scopes.root(s), ast.string(n).to_string());
                if let Some(new_name) = self.rename_table.get(&key) {
                    ast.set_string(n, new_name.clone());
                    sink.report_change(n);
                    break;
                }
                // A scope that still declares the name shadows any
                // renamed binding further out.
                if scopes.is_declared(s, ast.string(n), false) {
                    break;
                }
                scope = scopes.parent(s);
            }
        }
        Ok(())
    }

    /// Final sweep: every recorded declaration still in declaration form
    /// becomes one `var` statement per declarator.
    fn rewrite_decls_to_vars(&mut self, ast: &mut Ast, sink: &mut dyn ChangeSink) {
        let pending = std::mem::take(&mut self.let_consts);
        log::debug!("converting {} declaration(s) to var", pending.len());
        for n in pending {
            let parent = match ast.parent(n) {
                Some(p) => p,
                None => continue,
            };
            if ast.kind(parent).is_statement_parent() {
                handle_declaration_list(ast, n, sink);
            } else {
                // Loop headers hold exactly one statement slot, so the
                // declaration cannot be split there.
                let first = ast.child(n, 0);
                maybe_add_const_annotation(ast, n, parent, first, n);
                ast.set_kind(n, Kind::Var);
            }
            sink.report_change(n);
        }
    }
}

/// Whether `n` declares a block-scoped binding: `let`/`const`, a catch
/// clause, or a class/function declaration (block-scoped when it appears
/// inside a block).
fn is_block_scoped_declaration(ast: &Ast, n: NodeId) -> bool {
    match ast.kind(n) {
        Kind::Let | Kind::Const => ast.has_children(n),
        Kind::Catch => true,
        Kind::Function | Kind::Class => {
            ast.parent(n)
                .is_some_and(|p| ast.kind(p).is_statement_parent())
                && !ast.string(ast.child(n, 0)).is_empty()
        }
        _ => false,
    }
}

/// Whether `n` is inside a loop body. A node inside a function that is
/// inside a loop is not considered inside the loop.
fn in_loop(ast: &Ast, n: NodeId) -> bool {
    ast.enclosing(n, |a, p| {
        a.kind(p).is_loop_structure() || a.kind(p) == Kind::Function
    })
    .is_some_and(|e| ast.kind(e) != Kind::Function)
}

/// The declared type of a declarator, from its own inline annotation or
/// the declaration statement's.
fn declared_type(ast: &Ast, decl: NodeId, name: NodeId) -> Option<String> {
    ast.type_annotation(name)
        .or_else(|| ast.type_annotation(decl))
        .map(str::to_string)
}

/// Record constancy on `dest` when `src_decl` is a `const`, carrying any
/// inline type annotation along. The left side of a `for-in` header
/// stays writable; the loop assigns it.
pub(crate) fn maybe_add_const_annotation(
    ast: &mut Ast,
    src_decl: NodeId,
    src_parent: NodeId,
    src_name: NodeId,
    dest_decl: NodeId,
) {
    if ast.kind(src_decl) != Kind::Const {
        return;
    }
    if ast.kind(src_parent) == Kind::ForIn && ast.first_child(src_parent) == Some(src_decl) {
        return;
    }
    if let Some(ty) = ast.type_annotation(src_decl).map(str::to_string) {
        ast.set_prop(dest_decl, Prop::TypeAnnotation, PropValue::Str(ty));
    } else if let Some(PropValue::Str(ty)) = ast.clear_prop(src_name, Prop::TypeAnnotation) {
        ast.set_prop(dest_decl, Prop::TypeAnnotation, PropValue::Str(ty));
    }
    ast.set_prop(dest_decl, Prop::Const, PropValue::Bool(true));
}

/// Normalize a declaration list to `var` form, splitting
/// `const i = 0, j = 0;` into one annotated `var` per declarator.
pub(crate) fn handle_declaration_list(ast: &mut Ast, decl: NodeId, sink: &mut dyn ChangeSink) {
    let parent = ast.parent(decl).expect("declaration list is detached");
    while ast.child_count(decl) > 1 {
        let name = ast.last_child(decl).expect("declaration has no declarators");
        ast.detach(name);
        let new_decl = ast.node(Kind::Var);
        ast.add_child(new_decl, name);
        ast.copy_span_from(new_decl, decl);
        maybe_add_const_annotation(ast, decl, parent, name, new_decl);
        ast.add_child_after(new_decl, decl);
        sink.report_change(parent);
    }
    let first = ast.child(decl, 0);
    maybe_add_const_annotation(ast, decl, parent, first, decl);
    ast.set_kind(decl, Kind::Var);
}

/// Insert `new_node` immediately before `loop_node`, hoisting past any
/// enclosing label wrappers.
pub(crate) fn add_node_before_loop(
    ast: &mut Ast,
    new_node: NodeId,
    loop_node: NodeId,
    sink: &mut dyn ChangeSink,
) {
    let mut insert_spot = loop_node;
    while ast
        .parent(insert_spot)
        .is_some_and(|p| ast.kind(p) == Kind::Label)
    {
        insert_spot = ast.parent(insert_spot).expect("label has no parent");
    }
    ast.add_child_before(new_node, insert_spot);
    sink.report_change(new_node);
}
