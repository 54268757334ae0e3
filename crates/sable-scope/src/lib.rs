//! Scope tree and symbol tables for the Sable lowering passes.
//!
//! Given a tree, [`builder::build`] produces a `ScopeTree` mirroring its
//! lexical nesting. The tree supports name lookup up the chain, hoist
//! scope computation, and variable reparenting during scope flattening.

pub mod builder;
pub mod scope;

pub use builder::build;
pub use scope::{Scope, ScopeError, ScopeId, ScopeKind, ScopeTree, VarId, VarKind, Variable};
