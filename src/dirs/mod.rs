//! A directory/path tree layered on the settings engine.
//!
//! Each declared node is a nested configurable holding its relative
//! segment and (once resolved) its absolute location. A root gets an
//! absolute path from outside; `resolve_paths` walks the tree once,
//! top-down, concatenating segments. Unresolvable nodes surface through
//! the ordinary required-field validation.

mod plan;
mod resolve;
mod structure;

pub use plan::{DirectoryBuilder, DirectoryPlan, TreeBuilder};
pub use structure::{DirectoryStructure, Node};

pub(crate) const RELATIVE_PATH: &str = "relative_path";
pub(crate) const ABSOLUTE_PATH: &str = "absolute_path";
