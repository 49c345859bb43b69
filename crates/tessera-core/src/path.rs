//! Structured expansion paths.
//!
//! Inside the engine a namespace is a list of segments; it is flattened to
//! the opaque `ExpandedId` key only when a node is emitted. Raw document IDs
//! may themselves contain `::` (template IDs always do), so the flat form is
//! a display/lookup key and is never parsed back.

use crate::id::{NAMESPACE_SEP, NodeId};
use crate::scene::ExpandedId;
use smallvec::SmallVec;
use std::fmt;

/// One step of an expansion path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A document node: an instance (opening its namespace) or an emitted node.
    Node(NodeId),
    /// Entry into a named slot of the enclosing instance.
    Slot(String),
}

/// An expansion namespace. Empty at frame level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExpandPath(SmallVec<[PathSegment; 4]>);

impl ExpandPath {
    /// The frame-level (empty) namespace.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// This path extended by a document node.
    #[must_use]
    pub fn child(&self, id: NodeId) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Node(id));
        next
    }

    /// This path extended by a slot entry.
    #[must_use]
    pub fn slot(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Slot(name.to_string()));
        next
    }

    /// The expanded ID of document node `id` emitted in this namespace.
    pub fn id_for(&self, id: NodeId) -> ExpandedId {
        if self.is_root() {
            return ExpandedId::from_node(id);
        }
        self.child(id).to_expanded_id()
    }

    /// Flatten to the expanded-ID key.
    pub fn to_expanded_id(&self) -> ExpandedId {
        ExpandedId::intern(&self.to_string())
    }
}

impl fmt::Display for ExpandPath {
    /// Segments joined with `::`. A slot renders as `slot(<name>)`; a node
    /// directly under a slot has any `::` in its raw ID replaced by `__` so
    /// the slot boundary stays unambiguous.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut after_slot = false;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(NAMESPACE_SEP)?;
            }
            match segment {
                PathSegment::Node(id) if after_slot => {
                    f.write_str(&id.as_str().replace(NAMESPACE_SEP, "__"))?;
                    after_slot = false;
                }
                PathSegment::Node(id) => f.write_str(id.as_str())?,
                PathSegment::Slot(name) => {
                    write!(f, "slot({})", name.replace(NAMESPACE_SEP, "__"))?;
                    after_slot = true;
                }
            }
        }
        Ok(())
    }
}
