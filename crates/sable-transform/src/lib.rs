//! Tree transformations for Sable.
//!
//! This crate contains the lowering passes that rewrite block-scoped
//! declarations (`let`/`const`, block-scoped classes, functions and catch
//! parameters) into function-scoped `var` form for targets without block
//! scoping:
//! - Scope flattening with collision-free renaming
//! - Loop closure materialization (per-iteration capture records)
//! - Block-scoped function declaration hoisting

pub mod block_scoping;
pub mod function_hoist;
pub mod loop_closures;

pub use block_scoping::{rewrite_block_scoped_declarations, RewriteOptions};

use sable_ast::NodeId;

/// Capability the host hands to the passes: called whenever a subtree is
/// structurally altered, so incremental analyses elsewhere stay valid.
pub trait ChangeSink {
    fn report_change(&mut self, node: NodeId);
}

/// No-op sink for hosts without incremental re-analysis.
#[derive(Debug, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn report_change(&mut self, _node: NodeId) {}
}

/// Monotonic counter used to mint collision-free synthetic names.
///
/// Owned by the caller rather than ambient global state, so one counter
/// spans a whole compilation and tests stay deterministic.
#[derive(Debug, Default)]
pub struct UniqueIds {
    next: u32,
}

impl UniqueIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}
