//! Per-compilation-unit feature record.
//!
//! The host front end marks each script with the source features it uses;
//! lowering passes consult the record to decide whether a sub-pass needs
//! to run at all.

use serde::{Deserialize, Serialize};

/// Which lowerable source features a compilation unit contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// `let`/`const` declarations (or block-scoped class/catch bindings).
    pub block_scoped_declarations: bool,
    /// Function declarations nested directly inside a block.
    pub block_scoped_functions: bool,
}

impl FeatureSet {
    /// A unit using no lowerable features.
    pub const NONE: FeatureSet = FeatureSet {
        block_scoped_declarations: false,
        block_scoped_functions: false,
    };

    /// A unit using every feature this stage lowers.
    pub const ALL: FeatureSet = FeatureSet {
        block_scoped_declarations: true,
        block_scoped_functions: true,
    };
}
