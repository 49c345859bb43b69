//! The expanded scene: the engine's output.
//!
//! A flat, fully-resolved view of one frame with every instance and slot
//! replaced by the nodes it stands for. It is always derived from a
//! `(document, frame)` pair and never persisted.
//!
//! Consumers read it three ways:
//! - renderers walk `child_ids` from `root` and paint `errorPlaceholder`
//!   nodes in an error style;
//! - the layer tree and property panel read `origin.kind` and
//!   `patch_target_id` to decide what is editable, and
//!   `slot_children_by_instance` to show slot content as virtual children;
//! - drag-and-drop reads `patch_target` to route a drop to the document node
//!   it mutates.

use crate::error::ExpansionError;
use crate::id::NodeId;
use crate::model::{Layout, NodeProps, NodeType, Style};
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

// ─── Expanded IDs ────────────────────────────────────────────────────────

/// Key of a node in the expanded scene: the flattened expansion path.
///
/// Distinct from `NodeId` so document IDs and expanded IDs cannot be mixed
/// up; at frame level the two coincide textually.
///
/// Shares the global `NodeId` interner, so the path strings outlive the
/// scene. Long-running hosts that create many short-lived instances grow
/// the interner accordingly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandedId(NodeId);

impl ExpandedId {
    pub fn intern(s: &str) -> Self {
        ExpandedId(NodeId::intern(s))
    }

    /// A frame-level node's expanded ID: its document ID.
    pub fn from_node(id: NodeId) -> Self {
        ExpandedId(id)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ExpandedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{}", self.as_str())
    }
}

impl fmt::Display for ExpandedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExpandedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ─── Origin metadata ─────────────────────────────────────────────────────

/// Why an expanded node exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginKind {
    /// An ordinary node of the frame, outside any instance. Editable.
    FrameNode,
    /// The node standing for an instance. Selectable and movable.
    InstanceRoot,
    /// A read-only projection of a component template node.
    ComponentChild,
    /// Content injected into a slot by an instance. Editable.
    SlotContent,
    /// Stand-in for an instance that could not be expanded.
    ErrorPlaceholder,
}

/// Which slot of which instance a slot-content node came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOrigin {
    pub slot_name: String,
    pub instance_id: ExpandedId,
}

/// Descriptive metadata about an expanded node. Not part of its identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedNodeOrigin {
    pub kind: OriginKind,
    pub component_id: Option<NodeId>,
    pub component_template_uid: Option<NodeId>,
    /// Expanded IDs of the enclosing instances, outermost first.
    pub instance_path: SmallVec<[ExpandedId; 4]>,
    /// True only when an explicit param override or legacy override was
    /// applied to this exact node. Defaults never set it.
    pub is_overridden: bool,
    pub slot_origin: Option<SlotOrigin>,
}

impl ExpandedNodeOrigin {
    pub fn new(kind: OriginKind) -> Self {
        Self {
            kind,
            component_id: None,
            component_template_uid: None,
            instance_path: SmallVec::new(),
            is_overridden: false,
            slot_origin: None,
        }
    }
}

/// Marks synthetic nodes that have no document counterpart of their own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "placeholder", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Placeholder {
    /// A slot with neither assigned nor default content.
    EmptySlot { slot_name: String },
    /// An instance that failed to expand.
    Error { error: ExpansionError },
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A node of the expanded scene.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedNode {
    pub id: ExpandedId,
    /// The document node an edit to this node mutates; `None` when it is a
    /// read-only projection.
    pub patch_target_id: Option<NodeId>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub child_ids: SmallVec<[ExpandedId; 4]>,
    pub layout: Layout,
    pub style: Style,
    pub props: NodeProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Placeholder>,
    pub origin: ExpandedNodeOrigin,
}

/// Equality ignores `origin`: it describes a node, it does not identify it.
impl PartialEq for ExpandedNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.patch_target_id == other.patch_target_id
            && self.node_type == other.node_type
            && self.child_ids == other.child_ids
            && self.layout == other.layout
            && self.style == other.style
            && self.props == other.props
            && self.placeholder == other.placeholder
    }
}

impl ExpandedNode {
    pub fn is_editable(&self) -> bool {
        self.patch_target_id.is_some()
    }

    pub fn error(&self) -> Option<&ExpansionError> {
        match &self.placeholder {
            Some(Placeholder::Error { error }) => Some(error),
            _ => None,
        }
    }
}

// ─── Scene ───────────────────────────────────────────────────────────────

/// The fully-resolved view of one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedScene {
    pub frame_id: NodeId,
    /// Expanded ID of the frame's root node.
    pub root: ExpandedId,
    pub nodes: HashMap<ExpandedId, ExpandedNode>,
    /// Expanded ID → document node to patch, `None` when read-only.
    pub patch_target: HashMap<ExpandedId, Option<NodeId>>,
    /// Instance expanded ID → expanded IDs of its slot-content roots, in
    /// expansion order.
    pub slot_children_by_instance: HashMap<ExpandedId, SmallVec<[ExpandedId; 2]>>,
}

impl ExpandedScene {
    pub(crate) fn new(frame_id: NodeId, root: ExpandedId) -> Self {
        Self {
            frame_id,
            root,
            nodes: HashMap::new(),
            patch_target: HashMap::new(),
            slot_children_by_instance: HashMap::new(),
        }
    }

    /// Add a node, keeping the patch-target index in step.
    pub(crate) fn insert(&mut self, node: ExpandedNode) {
        self.patch_target.insert(node.id, node.patch_target_id);
        self.nodes.insert(node.id, node);
    }

    pub(crate) fn register_slot_child(&mut self, instance: ExpandedId, root: ExpandedId) {
        self.slot_children_by_instance
            .entry(instance)
            .or_default()
            .push(root);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ExpandedId) -> Option<&ExpandedNode> {
        self.nodes.get(&id)
    }

    /// Look up by the flattened key string.
    pub fn get_str(&self, id: &str) -> Option<&ExpandedNode> {
        self.get(ExpandedId::intern(id))
    }

    pub fn root_node(&self) -> Option<&ExpandedNode> {
        self.get(self.root)
    }

    /// The document node an edit to `id` should mutate.
    pub fn patch_target_of(&self, id: ExpandedId) -> Option<NodeId> {
        self.patch_target.get(&id).copied().flatten()
    }

    pub fn is_editable(&self, id: ExpandedId) -> bool {
        self.patch_target_of(id).is_some()
    }

    /// Slot-content roots injected into an instance.
    pub fn slot_children(&self, instance: ExpandedId) -> &[ExpandedId] {
        self.slot_children_by_instance
            .get(&instance)
            .map_or(&[][..], |v| v.as_slice())
    }

    /// Resolved children of a node in render order.
    pub fn children(&self, id: ExpandedId) -> impl Iterator<Item = &ExpandedNode> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|n| n.child_ids.iter())
            .filter_map(|c| self.get(*c))
    }

    /// All reachable node IDs, pre-order from the root.
    pub fn preorder(&self) -> Vec<ExpandedId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push(id);
            stack.extend(node.child_ids.iter().rev().copied());
        }
        out
    }

    /// Child → parent index, for consumers that walk upward.
    pub fn parents(&self) -> HashMap<ExpandedId, ExpandedId> {
        self.nodes
            .values()
            .flat_map(|n| n.child_ids.iter().map(move |c| (*c, n.id)))
            .collect()
    }

    /// Error placeholders, sorted by expanded ID.
    pub fn errors(&self) -> Vec<(&ExpandedNode, &ExpansionError)> {
        let mut out: Vec<_> = self
            .nodes
            .values()
            .filter_map(|n| n.error().map(|e| (n, e)))
            .collect();
        out.sort_by_key(|(n, _)| n.id);
        out
    }
}
