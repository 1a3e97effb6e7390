//! Declaration of directory trees.
//!
//! `dir`/`path` declarations build a static tree shape; `build` turns it
//! into one node schema per tree level, each with a `relative_path`
//! segment, a required `absolute_path`, and a nested field per child.
//! Node names must be unique across the whole tree so every node is
//! addressable through the flat index.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::settings::{Schema, Value};

use super::structure::DirectoryStructure;
use super::{ABSOLUTE_PATH, RELATIVE_PATH};

#[derive(Debug, Clone)]
enum SegmentDecl {
    /// Segment is the node's own name.
    Named,
    Fixed(String),
    /// Unset until assigned at runtime; the node stays unresolved
    /// (and fails validation) until then.
    Deferred,
}

#[derive(Debug, Clone)]
struct NodeDecl {
    name: String,
    segment: SegmentDecl,
    children: Vec<NodeDecl>,
}

/// Accumulates sibling node declarations inside a `dir` block.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeDecl>,
}

impl TreeBuilder {
    /// Declares a directory named after its own path segment.
    pub fn dir(
        self,
        name: impl Into<String>,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.node(name, SegmentDecl::Named, children)
    }

    /// Declares a directory with an explicit path segment.
    pub fn dir_at(
        self,
        name: impl Into<String>,
        segment: impl Into<String>,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.node(name, SegmentDecl::Fixed(segment.into()), children)
    }

    /// Declares a directory whose segment must be assigned at runtime.
    pub fn dir_deferred(
        self,
        name: impl Into<String>,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.node(name, SegmentDecl::Deferred, children)
    }

    /// Declares a file named after its own path segment.
    pub fn path(self, name: impl Into<String>) -> Self {
        self.leaf(name, SegmentDecl::Named)
    }

    /// Declares a file with an explicit path segment.
    pub fn path_at(self, name: impl Into<String>, segment: impl Into<String>) -> Self {
        self.leaf(name, SegmentDecl::Fixed(segment.into()))
    }

    /// Declares a file whose segment must be assigned at runtime.
    pub fn path_deferred(self, name: impl Into<String>) -> Self {
        self.leaf(name, SegmentDecl::Deferred)
    }

    fn node(
        mut self,
        name: impl Into<String>,
        segment: SegmentDecl,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.nodes.push(NodeDecl {
            name: name.into(),
            segment,
            children: children(TreeBuilder::default()).nodes,
        });
        self
    }

    fn leaf(mut self, name: impl Into<String>, segment: SegmentDecl) -> Self {
        self.nodes.push(NodeDecl {
            name: name.into(),
            segment,
            children: Vec::new(),
        });
        self
    }
}

/// Builder for a [`DirectoryPlan`].
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct DirectoryBuilder {
    name: String,
    tree: TreeBuilder,
}

impl DirectoryBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        DirectoryBuilder {
            name: name.into(),
            tree: TreeBuilder::default(),
        }
    }

    pub fn dir(
        mut self,
        name: impl Into<String>,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.tree = self.tree.dir(name, children);
        self
    }

    pub fn dir_at(
        mut self,
        name: impl Into<String>,
        segment: impl Into<String>,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.tree = self.tree.dir_at(name, segment, children);
        self
    }

    pub fn dir_deferred(
        mut self,
        name: impl Into<String>,
        children: impl FnOnce(TreeBuilder) -> TreeBuilder,
    ) -> Self {
        self.tree = self.tree.dir_deferred(name, children);
        self
    }

    pub fn path(mut self, name: impl Into<String>) -> Self {
        self.tree = self.tree.path(name);
        self
    }

    pub fn path_at(mut self, name: impl Into<String>, segment: impl Into<String>) -> Self {
        self.tree = self.tree.path_at(name, segment);
        self
    }

    pub fn path_deferred(mut self, name: impl Into<String>) -> Self {
        self.tree = self.tree.path_deferred(name);
        self
    }

    /// Builds the plan: one schema per node, plus the flat name index.
    ///
    /// Panics on duplicate node names; those are declaration bugs.
    pub fn build(self) -> DirectoryPlan {
        let mut index = BTreeMap::new();
        let mut builder = Schema::builder(self.name.clone())
            .nil_field(RELATIVE_PATH)
            .setting_with(ABSOLUTE_PATH, working_dir);
        for decl in &self.tree.nodes {
            builder = register(builder, &self.name, decl, &[], &mut index);
        }
        DirectoryPlan {
            schema: builder.build(),
            index: Rc::new(index),
        }
    }
}

/// The built shape of a directory tree: schemas and the flat node
/// index. Cheap to clone; instantiate once per tree of actual paths.
#[derive(Debug, Clone)]
pub struct DirectoryPlan {
    schema: Rc<Schema>,
    index: Rc<BTreeMap<String, Vec<String>>>,
}

impl DirectoryPlan {
    /// Starts declaring a directory tree.
    pub fn builder(name: impl Into<String>) -> DirectoryBuilder {
        DirectoryBuilder::new(name)
    }

    /// The root node's schema.
    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    /// Constructs a fresh tree instance with every node materialized.
    pub fn instantiate(&self) -> DirectoryStructure {
        DirectoryStructure::new(self.clone(), self.schema.instantiate())
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&[String]> {
        self.index.get(name).map(Vec::as_slice)
    }
}

// Registers `decl` as a nested field on `parent`, recursing into its
// children, and records its navigation path in the flat index.
fn register(
    parent: crate::settings::SchemaBuilder,
    scope: &str,
    decl: &NodeDecl,
    path: &[String],
    index: &mut BTreeMap<String, Vec<String>>,
) -> crate::settings::SchemaBuilder {
    let mut node_path = path.to_vec();
    node_path.push(decl.name.clone());
    if index.insert(decl.name.clone(), node_path.clone()).is_some() {
        panic!("duplicate directory node name `{}`", decl.name);
    }

    let scoped = format!("{scope}.{}", decl.name);
    let mut builder = match &decl.segment {
        SegmentDecl::Named => Schema::builder(&scoped).setting(RELATIVE_PATH, decl.name.as_str()),
        SegmentDecl::Fixed(segment) => {
            Schema::builder(&scoped).setting(RELATIVE_PATH, segment.as_str())
        }
        SegmentDecl::Deferred => Schema::builder(&scoped).nil_field(RELATIVE_PATH),
    };
    builder = builder.required_field(ABSOLUTE_PATH);
    for child in &decl.children {
        builder = register(builder, &scoped, child, &node_path, index);
    }

    parent.nested_schema(decl.name.clone(), builder.build())
}

fn working_dir() -> Value {
    std::env::current_dir()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| ".".to_string())
        .into()
}
