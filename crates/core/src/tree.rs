//! Document Tree: an exclusively owned node tree whose mutations are checked
//! against the registry before they are committed.
//!
//! Every operation applies the change in place, validates the affected node
//! and its parent, and restores the previous state if validation fails.
//! Table rows need the second check: row width and header placement are
//! rules of the enclosing `table`. A rejected mutation therefore leaves the tree exactly
//! as it was and hands back a copy of the unchanged node.

use crate::error::Violation;
use crate::node::{Attrs, Node, NodeKind, NodePath};
use crate::registry::{content_model, is_orphaned, validate, validate_tree};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a mutation was not applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    /// The path does not address a node.
    #[error("no node at {0}")]
    NoSuchNode(NodePath),
    /// A child index past the end of the parent's children.
    #[error("index {index} is out of range for {len} children")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current child count.
        len: usize,
    },
    /// The attribute patch does not fit the node's attribute record.
    #[error("invalid attribute patch: {0}")]
    InvalidPatch(String),
    /// The registry rejected the result.
    #[error("mutation rejected: {violation}")]
    Rejected {
        /// Failed content-model rule.
        violation: Violation,
        /// The affected node, unchanged.
        previous: Box<Node>,
    },
}

fn rejected(violation: Violation, node: &Node) -> TreeError {
    log::trace!("rejected mutation: {violation}");
    TreeError::Rejected {
        violation,
        previous: Box::new(node.clone()),
    }
}

/// One document's tree, owned by a single editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            root: Node::doc(Vec::new()),
        }
    }
}

impl From<Node> for Document {
    fn from(root: Node) -> Self {
        Self { root }
    }
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `doc` root.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Consumes the document, returning its root.
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Node at `path`.
    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        self.root.get(path)
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut Node, TreeError> {
        self.root
            .get_mut(path)
            .ok_or_else(|| TreeError::NoSuchNode(path.clone()))
    }

    fn check(&self, path: &NodePath) -> Result<(), Violation> {
        match self.root.get(path) {
            Some(node) => validate(node.kind(), &node.children, &node.attrs),
            None => Ok(()),
        }
    }

    /// Validates the node at `path`, then its parent.
    fn check_with_parent(&self, path: &NodePath) -> Result<(), Violation> {
        self.check(path)?;
        match path.split_last() {
            Some((parent, _)) => self.check(&parent),
            None => Ok(()),
        }
    }

    /// Inserts `node` as the `index`-th child of `parent`.
    pub fn insert_child(
        &mut self,
        parent: &NodePath,
        index: usize,
        node: Node,
    ) -> Result<(), TreeError> {
        let target = self.node_mut(parent)?;
        let len = target.children.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        if let Err(violation) = validate_tree(&node) {
            return Err(rejected(violation, target));
        }

        let kind = node.kind();
        target.children.insert(index, node);
        if let Err(violation) = self.check_with_parent(parent) {
            let target = self.node_mut(parent)?;
            target.children.remove(index);
            return Err(rejected(violation, target));
        }
        log::trace!("inserted {kind} at {parent}[{index}]");
        Ok(())
    }

    /// Removes and returns the `index`-th child of `parent`.
    ///
    /// Removing the last child of a container that requires block content
    /// leaves an empty paragraph in its place.
    pub fn remove_child(&mut self, parent: &NodePath, index: usize) -> Result<Node, TreeError> {
        let target = self.node_mut(parent)?;
        let len = target.children.len();
        if index >= len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }

        let removed = target.children.remove(index);
        let filled =
            target.children.is_empty() && content_model(target.kind()).fills_with_paragraph();
        if filled {
            target.children.push(Node::paragraph(Vec::new()));
        }
        if let Err(violation) = self.check_with_parent(parent) {
            let target = self.node_mut(parent)?;
            if filled {
                target.children.clear();
            }
            target.children.insert(index, removed);
            return Err(rejected(violation, target));
        }
        log::trace!("removed {} from {parent}[{index}]", removed.kind());
        Ok(removed)
    }

    /// Merges a JSON attribute patch into the node at `path`.
    ///
    /// Keys use the serialized attribute names (`value`, `defaultValue`,
    /// `type`, ...). The node and its parent are re-validated, so changing a
    /// trigger value is checked for uniqueness among its siblings.
    pub fn update_attrs(
        &mut self,
        path: &NodePath,
        patch: &Map<String, Value>,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(path)?;
        let attrs = patched_attrs(&node.attrs, patch)?;
        let old = std::mem::replace(&mut node.attrs, attrs);

        if let Err(violation) = self.check_with_parent(path) {
            let node = self.node_mut(path)?;
            node.attrs = old;
            return Err(rejected(violation, node));
        }
        log::trace!("updated attributes at {path}");
        Ok(())
    }

    /// Moves the child at `from` so that it ends up at index `to`.
    pub fn move_child(&mut self, parent: &NodePath, from: usize, to: usize) -> Result<(), TreeError> {
        let target = self.node_mut(parent)?;
        let len = target.children.len();
        for index in [from, to] {
            if index >= len {
                return Err(TreeError::IndexOutOfRange { index, len });
            }
        }

        let child = target.children.remove(from);
        target.children.insert(to, child);
        if let Err(violation) = self.check_with_parent(parent) {
            let target = self.node_mut(parent)?;
            let child = target.children.remove(to);
            target.children.insert(from, child);
            return Err(rejected(violation, target));
        }
        log::trace!("moved {parent}[{from}] to {to}");
        Ok(())
    }

    /// Paths of every `tabs-content` whose value matches no trigger.
    pub fn orphaned_tab_contents(&self) -> Vec<NodePath> {
        let mut orphans = Vec::new();
        self.root.walk(&mut |node, path| {
            if node.kind() != NodeKind::TabsContainer {
                return;
            }
            for (index, child) in node.children.iter().enumerate() {
                if is_orphaned(node, child) {
                    orphans.push(path.child(index));
                }
            }
        });
        orphans
    }
}

fn patched_attrs(attrs: &Attrs, patch: &Map<String, Value>) -> Result<Attrs, TreeError> {
    let invalid = |err: serde_json::Error| TreeError::InvalidPatch(err.to_string());
    let mut value = serde_json::to_value(attrs).map_err(invalid)?;
    let Value::Object(fields) = &mut value else {
        return Err(TreeError::InvalidPatch(
            "attributes did not serialize to an object".to_string(),
        ));
    };

    for (key, new) in patch {
        if key == "kind" {
            return Err(TreeError::InvalidPatch(
                "the kind of a node cannot be changed".to_string(),
            ));
        }
        match fields.get_mut(key) {
            Some(slot) => *slot = new.clone(),
            None => {
                return Err(TreeError::InvalidPatch(format!(
                    "{} has no attribute \"{key}\"",
                    attrs.kind()
                )));
            }
        }
    }
    serde_json::from_value(value).map_err(invalid)
}
