use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Separator between a component ID and a template-local ID, and between
/// segments of an expanded ID.
pub const NAMESPACE_SEP: &str = "::";

/// Global string interner for document and expanded IDs.
///
/// Strings are never released. Expanded IDs are deterministic, so
/// re-expanding a frame reuses its keys, but every new instance adds one
/// entry per template node it expands to for the life of the process.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for nodes, components and frames.
/// Internally a `Spur` index: 4 bytes, Copy, Eq, Hash in O(1).
///
/// IDs are never generated here; new IDs come from the document store's
/// generator and are interned on arrival.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Build a source-namespaced template ID: `<component>::<local>`.
    pub fn namespaced(component: NodeId, local: &str) -> Self {
        Self::intern(&format!("{}{NAMESPACE_SEP}{local}", component.as_str()))
    }

    /// True if this ID carries the `<component>::` prefix.
    pub fn is_namespaced_under(&self, component: NodeId) -> bool {
        self.local_part(component).is_some()
    }

    /// The template-local part of a namespaced ID, if it sits under `component`.
    pub fn local_part(&self, component: NodeId) -> Option<&str> {
        self.as_str()
            .strip_prefix(component.as_str())
            .and_then(|rest| rest.strip_prefix(NAMESPACE_SEP))
            .filter(|local| !local.is_empty())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by string content, not interning order, so sorted output is
/// stable across processes.
impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}
