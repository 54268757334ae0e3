//! The AST arena: one node per source construct, addressed by index.
//!
//! The tree is mutable and single-owner. Every structural edit (attach,
//! detach, replace) updates both the child's parent pointer and the
//! parent's child list, so parent links are always consistent with child
//! lists. Nodes are never freed; a detached node simply has no parent.

use crate::features::FeatureSet;
use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Index of a node in the arena.
pub type NodeId = usize;

/// The kind of a node. One variant per source construct the lowering
/// passes care about; expression kinds not listed here never reach this
/// stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// One compilation unit. Children are statements.
    Script,
    Block,
    /// Labeled statement. The label name is the node's string payload;
    /// the single child is the labeled statement.
    Label,
    Empty,

    // Declarations. Children are `Name` nodes (declarators); a declarator's
    // optional single child is its initializer.
    Var,
    Let,
    Const,
    /// Children: name, param list, body block.
    Function,
    ParamList,
    /// Children: name, body block.
    Class,
    /// Children: param name, body block.
    Catch,
    /// Children: block, optional catch, optional finally block.
    Try,

    // Statements
    /// Children: condition, then block, optional else block.
    If,
    /// Children: init, condition, increment, body block. The first three
    /// may be `Empty`.
    For,
    /// Children: target, object expression, body block.
    ForIn,
    /// Children: target, iterable expression, body block.
    ForOf,
    /// Children: condition, body block.
    While,
    /// Children: body block, condition.
    Do,
    /// Optional single child: the returned expression.
    Return,
    /// Single child: an expression used as a statement.
    ExprResult,

    // Expressions
    /// Identifier reference or binding. The identifier is the string payload.
    Name,
    /// String literal; the value is the string payload.
    Str,
    /// Numeric literal; the source text is the string payload.
    Num,
    /// Children: target, value.
    Assign,
    /// Left-to-right sequence. Children: two expressions.
    Comma,
    /// Children: callee, then arguments.
    Call,
    /// Property access. Children: object, `Str` property name.
    GetProp,
    /// Children: `StringKey` entries.
    ObjectLit,
    /// Object literal entry. Key is the string payload; single child is
    /// the value.
    StringKey,
    /// Binary operator; the operator text is the string payload.
    /// Children: left, right.
    Bin,
    /// Postfix increment. Single child: the operand.
    Inc,
    /// Type-annotated cast wrapper around its single child expression.
    /// The annotation lives in the node's property bag.
    Cast,
}

impl Kind {
    /// Whether this kind declares names (`var`/`let`/`const`).
    pub fn is_name_declaration(self) -> bool {
        matches!(self, Kind::Var | Kind::Let | Kind::Const)
    }

    /// Whether this kind is a loop statement.
    pub fn is_loop_structure(self) -> bool {
        matches!(
            self,
            Kind::For | Kind::ForIn | Kind::ForOf | Kind::While | Kind::Do
        )
    }

    /// Whether this kind is a `for-in`/`for-of` loop, whose header binding
    /// is driven by the iteration mechanism rather than by an initializer.
    pub fn is_enhanced_for(self) -> bool {
        matches!(self, Kind::ForIn | Kind::ForOf)
    }

    /// Whether statements can appear directly under this kind.
    pub fn is_statement_parent(self) -> bool {
        matches!(self, Kind::Script | Kind::Block | Kind::Label)
    }
}

/// Keys of the per-node property bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prop {
    /// Declared type, carried as documentation once block scoping is gone.
    TypeAnnotation,
    /// Constancy annotation for lowered `const` declarations.
    Const,
    /// On `Call` nodes: the callee is evaluated without a receiver.
    FreeCall,
    /// On `Script` nodes: which source features the unit uses.
    Features,
}

/// Values stored in the property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    Bool(bool),
    Str(String),
    Features(FeatureSet),
}

/// A single node. Structure is managed through [`Ast`] methods so that
/// parent and child links stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    kind: Kind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    string: Option<String>,
    span: Span,
    props: Vec<(Prop, PropValue)>,
}

/// The arena owning every node of one compilation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new detached node of the given kind.
    pub fn node(&mut self, kind: Kind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            string: None,
            span: Span::DUMMY,
            props: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn kind(&self, n: NodeId) -> Kind {
        self.nodes[n].kind
    }

    /// Change the node's token, e.g. `let` to `var`.
    pub fn set_kind(&mut self, n: NodeId, kind: Kind) {
        self.nodes[n].kind = kind;
    }

    /// The string payload, or `""` when the node has none.
    pub fn string(&self, n: NodeId) -> &str {
        self.nodes[n].string.as_deref().unwrap_or("")
    }

    pub fn set_string(&mut self, n: NodeId, s: impl Into<String>) {
        self.nodes[n].string = Some(s.into());
    }

    pub fn span(&self, n: NodeId) -> Span {
        self.nodes[n].span
    }

    pub fn set_span(&mut self, n: NodeId, span: Span) {
        self.nodes[n].span = span;
    }

    /// Copy `src`'s span onto `dst` and its whole subtree. Used when a
    /// synthesized node replaces source code.
    pub fn copy_span_from(&mut self, dst: NodeId, src: NodeId) {
        let span = self.span(src);
        let mut stack = vec![dst];
        while let Some(n) = stack.pop() {
            if self.nodes[n].span.is_dummy() {
                self.nodes[n].span = span;
            }
            stack.extend(self.nodes[n].children.iter().copied());
        }
    }

    pub fn parent(&self, n: NodeId) -> Option<NodeId> {
        self.nodes[n].parent
    }

    pub fn children(&self, n: NodeId) -> &[NodeId] {
        &self.nodes[n].children
    }

    pub fn child_count(&self, n: NodeId) -> usize {
        self.nodes[n].children.len()
    }

    pub fn has_children(&self, n: NodeId) -> bool {
        !self.nodes[n].children.is_empty()
    }

    /// The `i`th child. Panics if out of range; a malformed tree is an
    /// internal-consistency failure.
    pub fn child(&self, n: NodeId, i: usize) -> NodeId {
        self.nodes[n].children[i]
    }

    pub fn first_child(&self, n: NodeId) -> Option<NodeId> {
        self.nodes[n].children.first().copied()
    }

    pub fn last_child(&self, n: NodeId) -> Option<NodeId> {
        self.nodes[n].children.last().copied()
    }

    /// Position of `n` in its parent's child list. Panics when detached.
    pub fn index_in_parent(&self, n: NodeId) -> usize {
        let parent = self.nodes[n].parent.expect("node is detached");
        self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == n)
            .expect("parent link inconsistent with child list")
    }

    /// Append `child` to `parent`'s child list. `child` must be detached.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(self.nodes[child].parent.is_none(), "child already attached");
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Prepend `child` to `parent`'s child list. `child` must be detached.
    pub fn add_child_to_front(&mut self, parent: NodeId, child: NodeId) {
        assert!(self.nodes[child].parent.is_none(), "child already attached");
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(0, child);
    }

    /// Insert `new` immediately before `sibling` under the same parent.
    pub fn add_child_before(&mut self, new: NodeId, sibling: NodeId) {
        assert!(self.nodes[new].parent.is_none(), "child already attached");
        let parent = self.nodes[sibling].parent.expect("sibling is detached");
        let i = self.index_in_parent(sibling);
        self.nodes[new].parent = Some(parent);
        self.nodes[parent].children.insert(i, new);
    }

    /// Insert `new` immediately after `sibling` under the same parent.
    pub fn add_child_after(&mut self, new: NodeId, sibling: NodeId) {
        assert!(self.nodes[new].parent.is_none(), "child already attached");
        let parent = self.nodes[sibling].parent.expect("sibling is detached");
        let i = self.index_in_parent(sibling);
        self.nodes[new].parent = Some(parent);
        self.nodes[parent].children.insert(i + 1, new);
    }

    /// Remove `n` from its parent. No-op when already detached.
    pub fn detach(&mut self, n: NodeId) {
        if let Some(parent) = self.nodes[n].parent {
            let i = self.index_in_parent(n);
            self.nodes[parent].children.remove(i);
            self.nodes[n].parent = None;
        }
    }

    /// Replace `old` with `new` in `old`'s parent, detaching `old`.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        assert!(self.nodes[new].parent.is_none(), "child already attached");
        let parent = self.nodes[old].parent.expect("cannot replace a detached node");
        let i = self.index_in_parent(old);
        self.nodes[old].parent = None;
        self.nodes[new].parent = Some(parent);
        self.nodes[parent].children[i] = new;
    }

    /// Detach and return the first child of `n`.
    pub fn remove_first_child(&mut self, n: NodeId) -> NodeId {
        let child = self.first_child(n).expect("node has no children");
        self.detach(child);
        child
    }

    /// Shallow copy: kind, string payload, span and properties, but no
    /// children and no parent.
    pub fn clone_node(&mut self, n: NodeId) -> NodeId {
        let copy = Node {
            kind: self.nodes[n].kind,
            parent: None,
            children: Vec::new(),
            string: self.nodes[n].string.clone(),
            span: self.nodes[n].span,
            props: self.nodes[n].props.clone(),
        };
        self.nodes.push(copy);
        self.nodes.len() - 1
    }

    pub fn prop(&self, n: NodeId, key: Prop) -> Option<&PropValue> {
        self.nodes[n]
            .props
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn set_prop(&mut self, n: NodeId, key: Prop, value: PropValue) {
        if let Some(slot) = self.nodes[n].props.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.nodes[n].props.push((key, value));
        }
    }

    pub fn clear_prop(&mut self, n: NodeId, key: Prop) -> Option<PropValue> {
        let i = self.nodes[n].props.iter().position(|(k, _)| *k == key)?;
        Some(self.nodes[n].props.remove(i).1)
    }

    /// Read a boolean property, defaulting to `false`.
    pub fn bool_prop(&self, n: NodeId, key: Prop) -> bool {
        matches!(self.prop(n, key), Some(PropValue::Bool(true)))
    }

    /// Read the string payload of a `TypeAnnotation` property, if any.
    pub fn type_annotation(&self, n: NodeId) -> Option<&str> {
        match self.prop(n, Prop::TypeAnnotation) {
            Some(PropValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The feature set of a compilation unit, defaulting to none.
    pub fn features(&self, script: NodeId) -> FeatureSet {
        match self.prop(script, Prop::Features) {
            Some(PropValue::Features(f)) => *f,
            _ => FeatureSet::default(),
        }
    }

    /// Walk parent links from `n` until `predicate` matches, returning
    /// the matching node.
    pub fn enclosing(&self, n: NodeId, predicate: impl Fn(&Ast, NodeId) -> bool) -> Option<NodeId> {
        let mut cur = self.parent(n);
        while let Some(p) = cur {
            if predicate(self, p) {
                return Some(p);
            }
            cur = self.parent(p);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_detach_keeps_links_consistent() {
        let mut ast = Ast::new();
        let block = ast.node(Kind::Block);
        let a = ast.node(Kind::Empty);
        let b = ast.node(Kind::Empty);
        ast.add_child(block, a);
        ast.add_child(block, b);
        assert_eq!(ast.children(block), &[a, b]);
        assert_eq!(ast.parent(a), Some(block));

        ast.detach(a);
        assert_eq!(ast.children(block), &[b]);
        assert_eq!(ast.parent(a), None);
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut ast = Ast::new();
        let block = ast.node(Kind::Block);
        let a = ast.node(Kind::Empty);
        let b = ast.node(Kind::Empty);
        let c = ast.node(Kind::Empty);
        ast.add_child(block, b);
        ast.add_child_before(a, b);
        ast.add_child_after(c, b);
        assert_eq!(ast.children(block), &[a, b, c]);
    }

    #[test]
    fn test_replace_with_swaps_in_place() {
        let mut ast = Ast::new();
        let block = ast.node(Kind::Block);
        let a = ast.node(Kind::Empty);
        let b = ast.node(Kind::Empty);
        let c = ast.node(Kind::Empty);
        ast.add_child(block, a);
        ast.add_child(block, b);
        ast.replace_with(a, c);
        assert_eq!(ast.children(block), &[c, b]);
        assert_eq!(ast.parent(a), None);
    }

    #[test]
    fn test_clone_node_is_shallow() {
        let mut ast = Ast::new();
        let name = ast.node(Kind::Name);
        ast.set_string(name, "x");
        let init = ast.node(Kind::Num);
        ast.add_child(name, init);
        ast.set_prop(name, Prop::Const, PropValue::Bool(true));

        let copy = ast.clone_node(name);
        assert_eq!(ast.string(copy), "x");
        assert!(ast.bool_prop(copy, Prop::Const));
        assert!(!ast.has_children(copy));
    }

    #[test]
    fn test_prop_bag_overwrites() {
        let mut ast = Ast::new();
        let call = ast.node(Kind::Call);
        ast.set_prop(call, Prop::FreeCall, PropValue::Bool(true));
        assert!(ast.bool_prop(call, Prop::FreeCall));
        ast.set_prop(call, Prop::FreeCall, PropValue::Bool(false));
        assert!(!ast.bool_prop(call, Prop::FreeCall));
    }
}
