//! Core document data model for Tessera.
//!
//! A document is a set of flat tables: nodes, components and frames, each
//! keyed by ID. There is no nested structural state; parent/child relations
//! exist only through a node's ordered `child_ids`. Component templates live
//! in the same node table under source-namespaced IDs (`Button::label`).
//!
//! Documents are immutable once shared. Table rows sit behind `Arc`, so the
//! document store can produce a new version by cloning the tables (pointer
//! copies) and replacing only the rows an edit touches.

use crate::id::NodeId;
use crate::params::ComponentParamDef;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0], serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() > 8 {
            return None;
        }
        let digits: SmallVec<[u8; 8]> = hex.bytes().map(hex_val).collect::<Option<_>>()?;
        let ch = |hi: u8, lo: u8| f32::from((hi << 4) | lo) / 255.0;

        match digits.as_slice() {
            &[r, g, b] => Some(Self::rgba(ch(r, r), ch(g, g), ch(b, b), 1.0)),
            &[r, g, b, a] => Some(Self::rgba(ch(r, r), ch(g, g), ch(b, b), ch(a, a))),
            &[r1, r2, g1, g2, b1, b2] => Some(Self::rgba(ch(r1, r2), ch(g1, g2), ch(b1, b2), 1.0)),
            &[r1, r2, g1, g2, b1, b2, a1, a2] => Some(Self::rgba(
                ch(r1, r2),
                ch(g1, g2),
                ch(b1, b2),
                ch(a1, a2),
            )),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] =
            [self.r, self.g, self.b, self.a].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        if a == u8::MAX {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Style & Layout ──────────────────────────────────────────────────────

/// Visual style fields. Every field is optional; unset means "inherit the
/// renderer's default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
}

/// Child arrangement direction for containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Row,
    Column,
}

/// Layout inputs. Tessera carries these through expansion untouched (apart
/// from parameter bindings); sizing and positioning happen downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// `None` means visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

// ─── Node props ──────────────────────────────────────────────────────────

/// The node type tag, derived from `NodeProps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Container,
    Text,
    Image,
    Icon,
    Spacer,
    Instance,
    Slot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerProps {
    /// Clip children to the container bounds.
    pub clip: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextProps {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageProps {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IconProps {
    pub icon: String,
}

/// Content injected into a named slot of an instance.
///
/// Exactly one root per slot; multi-element content is wrapped in a
/// container by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlotAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_node_id: Option<NodeId>,
}

/// Props of an instance node: which component it renders and with what
/// customizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProps {
    pub component_id: NodeId,
    /// Param key → raw value. Not type-checked when written; expansion
    /// coerces against the param type and falls back to the default.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub param_overrides: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<String, SlotAssignment>,
    /// Deprecated per-node overrides keyed by local or namespaced node ID.
    /// Only `props.text`, `props.src`, `props.icon` and `style.opacity`
    /// are honoured.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, serde_json::Value>,
}

impl InstanceProps {
    pub fn new(component_id: NodeId) -> Self {
        Self {
            component_id,
            param_overrides: BTreeMap::new(),
            slots: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// The assigned content root for a slot, if any.
    pub fn slot_root(&self, slot_name: &str) -> Option<NodeId> {
        self.slots.get(slot_name).and_then(|s| s.root_node_id)
    }
}

/// Props of a slot node inside a component template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotProps {
    pub slot_name: String,
    /// Component-owned fallback content, shown read-only when the instance
    /// assigns nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_content_id: Option<NodeId>,
}

/// Per-type node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeProps {
    Container(ContainerProps),
    Text(TextProps),
    Image(ImageProps),
    Icon(IconProps),
    Spacer,
    Instance(InstanceProps),
    Slot(SlotProps),
}

impl NodeProps {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeProps::Container(_) => NodeType::Container,
            NodeProps::Text(_) => NodeType::Text,
            NodeProps::Image(_) => NodeType::Image,
            NodeProps::Icon(_) => NodeType::Icon,
            NodeProps::Spacer => NodeType::Spacer,
            NodeProps::Instance(_) => NodeType::Instance,
            NodeProps::Slot(_) => NodeType::Slot,
        }
    }

    pub fn container() -> Self {
        NodeProps::Container(ContainerProps::default())
    }

    pub fn text(text: impl Into<String>) -> Self {
        NodeProps::Text(TextProps { text: text.into() })
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A single visual element in the node table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Globally unique key. Template nodes use `<componentId>::<localId>`.
    pub id: NodeId,

    /// User-facing label. Never used for lookup.
    #[serde(default)]
    pub name: String,

    /// Stable identity inside the owning component; the lookup key for
    /// parameter bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_uid: Option<NodeId>,

    /// The component template that owns this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_component_id: Option<NodeId>,

    /// The instance that owns this slot-injected node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_instance_id: Option<NodeId>,

    pub props: NodeProps,

    #[serde(default)]
    pub layout: Layout,

    #[serde(default)]
    pub style: Style,

    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub child_ids: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub fn new(id: NodeId, props: NodeProps) -> Self {
        Self {
            id,
            name: String::new(),
            template_uid: None,
            source_component_id: None,
            owner_instance_id: None,
            props,
            layout: Layout::default(),
            style: Style::default(),
            child_ids: SmallVec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.props.node_type()
    }

    /// The ID without its `<componentId>::` prefix; the full ID for nodes
    /// that are not template-owned.
    pub fn local_id(&self) -> &str {
        self.source_component_id
            .and_then(|c| self.id.local_part(c))
            .unwrap_or(self.id.as_str())
    }

    pub fn as_instance(&self) -> Option<&InstanceProps> {
        match &self.props {
            NodeProps::Instance(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_slot(&self) -> Option<&SlotProps> {
        match &self.props {
            NodeProps::Slot(props) => Some(props),
            _ => None,
        }
    }
}

// ─── Components & Frames ─────────────────────────────────────────────────

/// A reusable template. Its node tree lives in the document's node table
/// under `<id>::` namespaced IDs, anchored at `root_node_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDef {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub root_node_id: NodeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ComponentParamDef>,
}

impl ComponentDef {
    pub fn param(&self, key: &str) -> Option<&ComponentParamDef> {
        self.params.iter().find(|p| p.key == key)
    }
}

/// A top-level artboard. Expansion always starts from a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub root_node_id: NodeId,
}

// ─── Document ────────────────────────────────────────────────────────────

/// The complete Tessera document: flat node, component and frame tables.
///
/// Serialized as three lists; each row carries its own ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, with = "table")]
    pub nodes: HashMap<NodeId, Arc<Node>>,

    #[serde(default, with = "table")]
    pub components: HashMap<NodeId, Arc<ComponentDef>>,

    #[serde(default, with = "table")]
    pub frames: HashMap<NodeId, Arc<Frame>>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node row.
    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, Arc::new(node));
    }

    pub fn insert_component(&mut self, component: ComponentDef) {
        self.components.insert(component.id, Arc::new(component));
    }

    pub fn insert_frame(&mut self, frame: Frame) {
        self.frames.insert(frame.id, Arc::new(frame));
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(Arc::as_ref)
    }

    /// Copy-on-write access to a node row. Clones the row only if another
    /// document version still shares it.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id).map(Arc::make_mut)
    }

    pub fn component(&self, id: NodeId) -> Option<&ComponentDef> {
        self.components.get(&id).map(Arc::as_ref)
    }

    pub fn frame(&self, id: NodeId) -> Option<&Frame> {
        self.frames.get(&id).map(Arc::as_ref)
    }

    /// Resolved children of a node in order. Dangling child IDs are skipped.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.child_ids.iter())
            .filter_map(|c| self.node(*c))
    }

    /// The node and all its `child_ids` descendants, pre-order.
    ///
    /// Visits each node at most once, so malformed documents with child
    /// cycles still terminate.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(node.child_ids.iter().rev().copied());
        }
        out
    }

    /// Every node belonging to a component's template: the tree under its
    /// root plus slot default content and slot content assigned by
    /// instances inside the template.
    pub fn component_template_nodes(&self, component_id: NodeId) -> Vec<NodeId> {
        let Some(component) = self.component(component_id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![component.root_node_id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            match &node.props {
                NodeProps::Slot(slot) => stack.extend(slot.default_content_id),
                NodeProps::Instance(inst) => {
                    stack.extend(inst.slots.values().rev().filter_map(|s| s.root_node_id))
                }
                _ => {}
            }
            stack.extend(node.child_ids.iter().rev().copied());
        }
        out
    }

    /// The node listing `id` among its children. With malformed input that
    /// lists a node under several parents, the smallest parent ID wins.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.child_ids.contains(&id))
            .map(|n| n.id)
            .min()
    }

    /// All nodes tagged with `owner_instance_id == instance`, sorted by ID.
    pub fn nodes_owned_by(&self, instance: NodeId) -> Vec<NodeId> {
        let mut owned: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.owner_instance_id == Some(instance))
            .map(|n| n.id)
            .collect();
        owned.sort();
        owned
    }

    pub fn is_frame_root(&self, id: NodeId) -> bool {
        self.frames.values().any(|f| f.root_node_id == id)
    }
}

/// A row that knows its own table key.
pub trait TableRow {
    fn key(&self) -> NodeId;
}

impl TableRow for Node {
    fn key(&self) -> NodeId {
        self.id
    }
}

impl TableRow for ComponentDef {
    fn key(&self) -> NodeId {
        self.id
    }
}

impl TableRow for Frame {
    fn key(&self) -> NodeId {
        self.id
    }
}

/// Serializes a keyed table as a list sorted by key, and rebuilds the map
/// from the rows' own IDs.
mod table {
    use super::TableRow;
    use crate::id::NodeId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::sync::Arc;

    pub fn serialize<S, T>(map: &HashMap<NodeId, Arc<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: TableRow + Serialize,
    {
        let mut rows: Vec<&T> = map.values().map(Arc::as_ref).collect();
        rows.sort_by_key(|r| r.key());
        serializer.collect_seq(rows)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<NodeId, Arc<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: TableRow + Deserialize<'de>,
    {
        let rows = Vec::<T>::deserialize(deserializer)?;
        Ok(rows.into_iter().map(|r| (r.key(), Arc::new(r))).collect())
    }
}
