//! Scope and variable records.
//!
//! A `ScopeTree` mirrors the lexical nesting of one compilation unit.
//! Each scope owns an insertion-ordered mapping from name to variable;
//! every variable's declaring-scope pointer stays consistent with exactly
//! one scope's mapping entry. Reparenting a variable is a remove-then-
//! insert, never a copy.

use sable_ast::{Ast, NodeId};
use std::collections::HashMap;
use thiserror::Error;

/// Index of a scope in the tree.
pub type ScopeId = usize;

/// Index of a variable in the tree.
pub type VarId = usize;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("variable `{name}` is missing from its declaring scope's mapping")]
    MissingDeclaration { name: String },
    #[error("no scope encloses node {node}")]
    NoEnclosingScope { node: NodeId },
    #[error("node {node} does not declare a variable")]
    NotADeclaration { node: NodeId },
}

/// Classification of a scope, used to find hoist targets and function
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The scope of the whole compilation unit.
    Global,
    /// A function's own scope: parameters and the function expression's
    /// name.
    Function,
    /// The scope of a function's body block. `var` declarations land here.
    FunctionBody,
    /// Any other block-like scope: blocks, loop headers, catch clauses.
    Block,
}

/// How a name was bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Catch,
    Param,
}

impl VarKind {
    pub fn is_let_or_const(self) -> bool {
        matches!(self, VarKind::Let | VarKind::Const)
    }
}

/// A declared name.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    /// The `Name` node that declares this variable.
    pub decl: NodeId,
    /// The scope whose mapping currently owns this variable.
    pub scope: ScopeId,
    /// The compilation unit the declaration came from.
    pub input: NodeId,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// The AST node this scope is rooted at (script, function, block,
    /// loop, or catch).
    pub root: NodeId,
    pub kind: ScopeKind,
    /// name -> variable, in declaration order.
    names: Vec<(String, VarId)>,
}

/// The scope tree of one compilation unit.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    vars: Vec<Variable>,
    by_root: HashMap<NodeId, ScopeId>,
    by_decl: HashMap<NodeId, VarId>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>, root: NodeId, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            parent,
            root,
            kind,
            names: Vec::new(),
        });
        self.by_root.insert(root, id);
        id
    }

    pub fn scope(&self, s: ScopeId) -> &Scope {
        &self.scopes[s]
    }

    pub fn root(&self, s: ScopeId) -> NodeId {
        self.scopes[s].root
    }

    pub fn kind(&self, s: ScopeId) -> ScopeKind {
        self.scopes[s].kind
    }

    pub fn parent(&self, s: ScopeId) -> Option<ScopeId> {
        self.scopes[s].parent
    }

    pub fn var(&self, v: VarId) -> &Variable {
        &self.vars[v]
    }

    /// Variables currently declared in `s`, in declaration order.
    pub fn vars_in(&self, s: ScopeId) -> impl Iterator<Item = VarId> + '_ {
        self.scopes[s].names.iter().map(|(_, v)| *v)
    }

    /// Declare a fresh variable in `scope`. Redeclaration replaces the
    /// mapping entry; the input tree is assumed normalized.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: VarKind,
        decl: NodeId,
        input: NodeId,
    ) -> VarId {
        let id = self.vars.len();
        self.vars.push(Variable {
            name: name.to_string(),
            kind,
            decl,
            scope,
            input,
        });
        if let Some(slot) = self.scopes[scope].names.iter_mut().find(|(n, _)| n == name) {
            slot.1 = id;
        } else {
            self.scopes[scope].names.push((name.to_string(), id));
        }
        self.by_decl.insert(decl, id);
        id
    }

    /// Remove `var` from its declaring scope's mapping. The variable
    /// record itself survives so it can be re-inserted elsewhere.
    pub fn undeclare(&mut self, var: VarId) -> Result<(), ScopeError> {
        let scope = self.vars[var].scope;
        let i = self.scopes[scope]
            .names
            .iter()
            .position(|(_, v)| *v == var)
            .ok_or_else(|| ScopeError::MissingDeclaration {
                name: self.vars[var].name.clone(),
            })?;
        self.scopes[scope].names.remove(i);
        Ok(())
    }

    /// Move `var` into `new_scope` under `new_name`: remove from the old
    /// scope, update the record, insert into the new mapping.
    pub fn reparent(
        &mut self,
        var: VarId,
        new_scope: ScopeId,
        new_name: &str,
    ) -> Result<(), ScopeError> {
        self.undeclare(var)?;
        self.vars[var].scope = new_scope;
        self.vars[var].name = new_name.to_string();
        if let Some(slot) = self.scopes[new_scope]
            .names
            .iter_mut()
            .find(|(n, _)| n == new_name)
        {
            slot.1 = var;
        } else {
            self.scopes[new_scope].names.push((new_name.to_string(), var));
        }
        Ok(())
    }

    /// Look up `name` in `scope` only.
    pub fn get_var_direct(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        self.scopes[scope]
            .names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Look up `name` from `scope` up the parent chain.
    pub fn get_var(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(v) = self.get_var_direct(s, name) {
                return Some(v);
            }
            cur = self.scopes[s].parent;
        }
        None
    }

    /// Whether `name` is declared in `scope`, optionally considering
    /// ancestor scopes.
    pub fn is_declared(&self, scope: ScopeId, name: &str, include_ancestors: bool) -> bool {
        if include_ancestors {
            self.get_var(scope, name).is_some()
        } else {
            self.get_var_direct(scope, name).is_some()
        }
    }

    /// The variable declared by the given `Name` node.
    pub fn var_of_decl(&self, decl: NodeId) -> Result<VarId, ScopeError> {
        self.by_decl
            .get(&decl)
            .copied()
            .ok_or(ScopeError::NotADeclaration { node: decl })
    }

    /// The nearest enclosing scope where `var` declarations land: a
    /// function body or the global scope.
    pub fn closest_hoist_scope(&self, scope: ScopeId) -> ScopeId {
        let mut cur = scope;
        loop {
            match self.scopes[cur].kind {
                ScopeKind::FunctionBody | ScopeKind::Global => return cur,
                _ => {
                    cur = self.scopes[cur]
                        .parent
                        .expect("non-global scope must have a parent");
                }
            }
        }
    }

    pub fn is_function_scope(&self, s: ScopeId) -> bool {
        self.scopes[s].kind == ScopeKind::Function
    }

    pub fn is_function_block_scope(&self, s: ScopeId) -> bool {
        self.scopes[s].kind == ScopeKind::FunctionBody
    }

    pub fn is_global(&self, s: ScopeId) -> bool {
        self.scopes[s].kind == ScopeKind::Global
    }

    /// The scope a node belongs to: the innermost scope rooted at the
    /// node itself or one of its ancestors.
    pub fn scope_for(&self, ast: &Ast, n: NodeId) -> Result<ScopeId, ScopeError> {
        let mut cur = Some(n);
        while let Some(node) = cur {
            if let Some(&s) = self.by_root.get(&node) {
                return Ok(s);
            }
            cur = ast.parent(node);
        }
        Err(ScopeError::NoEnclosingScope { node: n })
    }

    /// Scope rooted at exactly `root`, if any.
    pub fn scope_rooted_at(&self, root: NodeId) -> Option<ScopeId> {
        self.by_root.get(&root).copied()
    }
}
