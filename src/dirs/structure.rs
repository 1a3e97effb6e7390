//! Instantiated directory trees and node accessors.

use std::fmt;

use crate::settings::{Configurable, SettingsError, Value};

use super::plan::DirectoryPlan;
use super::{resolve, ABSOLUTE_PATH, RELATIVE_PATH};

/// One instantiated tree of directory and file nodes.
///
/// The tree is a plain [`Configurable`] underneath: every node is a
/// nested instance with `relative_path` and `absolute_path` settings,
/// so validation, serialization, copying, and proxying all work on it
/// unchanged. The structure adds the flat node index and the
/// [`resolve_paths`](Self::resolve_paths) pass.
pub struct DirectoryStructure {
    plan: DirectoryPlan,
    root: Configurable,
}

impl DirectoryStructure {
    pub(crate) fn new(plan: DirectoryPlan, root: Configurable) -> Self {
        DirectoryStructure { plan, root }
    }

    /// The root node. Its absolute path defaults to the process working
    /// directory until assigned.
    pub fn root(&self) -> Node {
        Node {
            settings: self.root.clone(),
        }
    }

    /// The settings instance backing the whole tree.
    pub fn settings(&self) -> &Configurable {
        &self.root
    }

    /// Looks up any node in the tree by its declared name.
    pub fn node(&self, name: &str) -> Result<Node, SettingsError> {
        let path = self
            .plan
            .lookup(name)
            .ok_or_else(|| SettingsError::UnknownField {
                schema: self.root.schema().name().to_string(),
                field: name.to_string(),
            })?;
        let mut settings = self.root.clone();
        for field in path {
            settings = settings.nested(field)?;
        }
        Ok(Node { settings })
    }

    /// Fills in unassigned absolute paths, top-down, from each node's
    /// nearest resolvable ancestor.
    pub fn resolve_paths(&self) -> &Self {
        resolve::resolve_paths(&self.root);
        self
    }

    /// Fails when any node lacks a resolvable absolute path (or any
    /// other required setting is unset), naming every violation.
    pub fn check_required(&self) -> Result<(), SettingsError> {
        self.root.check_required()
    }
}

impl fmt::Debug for DirectoryStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.root, f)
    }
}

/// Accessor for one directory or file node.
#[derive(Clone)]
pub struct Node {
    settings: Configurable,
}

impl Node {
    pub fn settings(&self) -> &Configurable {
        &self.settings
    }

    /// Navigates to a declared child node.
    pub fn child(&self, name: &str) -> Result<Node, SettingsError> {
        Ok(Node {
            settings: self.settings.nested(name)?,
        })
    }

    pub fn relative_path(&self) -> Result<String, SettingsError> {
        self.string_setting(RELATIVE_PATH)
    }

    pub fn absolute_path(&self) -> Result<String, SettingsError> {
        self.string_setting(ABSOLUTE_PATH)
    }

    pub fn set_relative_path(&self, segment: impl Into<String>) -> &Self {
        self.settings
            .set(RELATIVE_PATH, segment.into())
            .expect("directory nodes declare relative_path");
        self
    }

    pub fn set_absolute_path(&self, path: impl Into<String>) -> &Self {
        self.settings
            .set(ABSOLUTE_PATH, path.into())
            .expect("directory nodes declare absolute_path");
        self
    }

    // A nil segment reads as unset: the node exists but has no place
    // in the tree yet.
    fn string_setting(&self, name: &str) -> Result<String, SettingsError> {
        match self.settings.get(name)? {
            Value::Str(value) => Ok(value),
            _ => Err(SettingsError::FieldUnset {
                field: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.settings, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_plan() -> DirectoryPlan {
        DirectoryPlan::builder("DirectoryThing")
            .dir_deferred("ephemeral_mountpoint", |d| {
                d.dir_at("bundle_workdir", "bundle_workdir", |d| {
                    d.path_deferred("bundle_manifest")
                        .path_at("credentials_archive", "aws-creds.tar.gz")
                        .dir_at("credentials_dir", "aws-creds", |d| {
                            d.path_at("private_key_file", "pk.pem")
                                .path_at("certificate_file", "cert.pem")
                        })
                })
            })
            .dir_at("next_to_me", "rainbow", |d| {
                d.dir_at("in_there", "a_place", |d| d.path_at("nearby", "a.file"))
            })
            .path_at("loose_path", "here")
            .build()
    }

    fn configured() -> DirectoryStructure {
        let thing = directory_plan().instantiate();
        thing
            .node("ephemeral_mountpoint")
            .unwrap()
            .set_absolute_path("/tmp");
        thing
            .node("bundle_manifest")
            .unwrap()
            .set_relative_path("image.manifest.xml");
        thing.resolve_paths();
        thing
    }

    #[test]
    fn test_fresh_instances_have_equal_but_distinct_nodes() {
        let one = directory_plan().instantiate();
        let other = directory_plan().instantiate();

        let a = one.node("bundle_workdir").unwrap();
        let b = other.node("bundle_workdir").unwrap();
        assert_eq!(a.relative_path().unwrap(), b.relative_path().unwrap());
        assert!(!a.settings().ptr_eq(b.settings()));
    }

    #[test]
    fn test_unresolved_tree_fails_validation() {
        let err = directory_plan().instantiate().check_required().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Required field"), "message: {message}");
        assert!(message.contains("absolute_path"), "message: {message}");
    }

    #[test]
    fn test_missing_relative_path_keeps_a_node_unresolved() {
        let thing = directory_plan().instantiate();
        thing
            .node("ephemeral_mountpoint")
            .unwrap()
            .set_absolute_path("/tmp");
        thing.resolve_paths();

        // bundle_manifest's segment was never assigned
        match thing.check_required().unwrap_err() {
            SettingsError::RequiredFieldsUnset { fields } => {
                assert_eq!(
                    fields,
                    ["ephemeral_mountpoint.bundle_workdir.bundle_manifest.absolute_path"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_configured_tree_passes_validation() {
        configured().check_required().unwrap();
    }

    #[test]
    fn test_resolution_concatenates_segments_top_down() {
        let thing = configured();
        assert_eq!(
            thing.node("certificate_file").unwrap().absolute_path().unwrap(),
            "/tmp/bundle_workdir/aws-creds/cert.pem"
        );
        assert_eq!(
            thing.node("bundle_manifest").unwrap().absolute_path().unwrap(),
            "/tmp/bundle_workdir/image.manifest.xml"
        );
        assert_eq!(
            thing.node("credentials_dir").unwrap().absolute_path().unwrap(),
            "/tmp/bundle_workdir/aws-creds"
        );
    }

    #[test]
    fn test_unrooted_subtrees_resolve_under_the_structure_root() {
        let thing = configured();
        let root_path = thing.root().absolute_path().unwrap();
        let nearby = thing.node("nearby").unwrap().absolute_path().unwrap();
        assert!(nearby.starts_with(&root_path), "nearby: {nearby}");
        assert!(nearby.ends_with("rainbow/a_place/a.file"), "nearby: {nearby}");
        let loose = thing.node("loose_path").unwrap().absolute_path().unwrap();
        assert!(loose.ends_with("/here"), "loose: {loose}");
    }

    #[test]
    fn test_explicit_absolute_paths_are_never_clobbered() {
        let thing = configured();
        thing.node("credentials_dir").unwrap().set_absolute_path("/elsewhere");
        thing.resolve_paths();
        assert_eq!(
            thing.node("credentials_dir").unwrap().absolute_path().unwrap(),
            "/elsewhere"
        );
        // already-resolved children keep their paths too
        assert_eq!(
            thing.node("certificate_file").unwrap().absolute_path().unwrap(),
            "/tmp/bundle_workdir/aws-creds/cert.pem"
        );
    }

    #[test]
    fn test_navigation_matches_the_flat_index() {
        let thing = configured();
        let navigated = thing
            .root()
            .child("ephemeral_mountpoint")
            .unwrap()
            .child("bundle_workdir")
            .unwrap()
            .child("credentials_dir")
            .unwrap();
        assert!(navigated
            .settings()
            .ptr_eq(thing.node("credentials_dir").unwrap().settings()));
    }

    #[test]
    fn test_unknown_node_names_error() {
        let err = directory_plan().instantiate().node("nonexistent").unwrap_err();
        assert!(matches!(err, SettingsError::UnknownField { .. }));
    }

    #[test]
    fn test_inspects_cleanly() {
        let rendered = format!("{:?}", directory_plan().instantiate());
        assert!(rendered.contains("bundle_workdir"));
        assert!(rendered.contains("<unset>"));
    }

    #[test]
    #[should_panic(expected = "duplicate directory node name")]
    fn test_duplicate_node_names_panic() {
        let _ = DirectoryPlan::builder("Dup")
            .path_at("same", "a")
            .dir("nested", |d| d.path_at("same", "b"))
            .build();
    }
}
