//! Mutable AST arena for the Sable lowering passes.
//!
//! The tree is an index-addressed arena with explicit parent pointers,
//! a string payload per identifier, source spans, and an extensible
//! per-node property bag. Passes traverse it with [`visit::post_order`]
//! and build replacement subtrees with the constructors in [`build`].

pub mod build;
pub mod features;
pub mod node;
pub mod print;
pub mod span;
pub mod visit;

pub use features::FeatureSet;
pub use node::{Ast, Kind, NodeId, Prop, PropValue};
pub use print::to_source;
pub use span::{FileId, Span};
pub use visit::post_order;
