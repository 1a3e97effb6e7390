//! Top-down absolute-path resolution.
//!
//! An explicit pass, run once after a root's absolute path is known:
//! each child with an unassigned `absolute_path` gets parent absolute +
//! its own segment. Explicit assignments are never clobbered, so a
//! subtree rooted somewhere else entirely keeps its own base, and
//! re-running only fills in nodes whose segments were assigned since
//! the last pass.

use std::path::Path;

use tracing::debug;

use crate::settings::Configurable;

use super::{ABSOLUTE_PATH, RELATIVE_PATH};

pub(crate) fn resolve_paths(root: &Configurable) {
    debug!(root = root.schema().name(), "resolving directory paths");
    walk(root);
}

fn walk(node: &Configurable) {
    let base = node
        .get(ABSOLUTE_PATH)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string));

    let schema = node.schema();
    for meta in schema.fields() {
        if meta.nested_schema().is_none() {
            continue;
        }
        let Ok(child) = node.nested(meta.name()) else {
            continue;
        };
        let child_schema = child.schema();
        if child_schema.meta(ABSOLUTE_PATH).is_none() || child_schema.meta(RELATIVE_PATH).is_none()
        {
            // not a directory node
            continue;
        }
        if !child.is_explicitly_set(ABSOLUTE_PATH) {
            if let (Some(base), Some(segment)) = (&base, segment_of(&child)) {
                let joined = Path::new(base).join(segment);
                let _ = child.set(ABSOLUTE_PATH, joined.to_string_lossy().into_owned());
            }
        }
        walk(&child);
    }
}

// An unset or nil segment leaves the node unresolved.
fn segment_of(child: &Configurable) -> Option<String> {
    child
        .get(RELATIVE_PATH)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
}
