//! Instance expansion engine.
//!
//! Turns a flat document plus a frame ID into an `ExpandedScene`: every
//! instance node is replaced by a namespaced copy-by-reference view of its
//! component's template, with parameter bindings and legacy overrides
//! resolved and slots filled.
//!
//! Expansion is a total function. Missing components, missing roots,
//! component cycles, dangling references and mistyped override values never
//! abort the walk; they degrade to "use the default" or to a single
//! placeholder node. The only rejection is a frame (or frame root) that does
//! not exist.
//!
//! The walk is one recursive function family threaded with an immutable
//! `ExpandContext`: the current namespace, the set of components being
//! expanded on the current path (cycle detection is path-scoped, so sibling
//! reuse is never flagged) and the enclosing instance path.
//!
//! Editable slot content is not part of the component's template, so it
//! starts with an empty component set: a Card may sit in another Card's
//! slot. Re-entering an editable instance node on the same path is still a
//! cycle.

use crate::error::ExpansionError;
use crate::id::NodeId;
use crate::model::{
    ComponentDef, Document, InstanceProps, Layout, Node, NodeProps, NodeType, SlotProps, Style,
};
use crate::params::{ComponentParamDef, apply_binding, apply_legacy_override};
use crate::path::ExpandPath;
use crate::scene::{
    ExpandedId, ExpandedNode, ExpandedNodeOrigin, ExpandedScene, OriginKind, Placeholder,
    SlotOrigin,
};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

// ─── Config ───────────────────────────────────────────────────────────────

/// Default bound on nested instance depth.
pub const DEFAULT_MAX_INSTANCE_DEPTH: usize = 64;

/// Configuration for `expand_with`.
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    /// Apply the deprecated per-node `overrides` map after parameters.
    /// Default: **true**, so documents imported from older versions keep
    /// their customizations.
    pub legacy_overrides: bool,

    /// Instances nested deeper than this become `DepthLimit` error
    /// placeholders. Cycles are caught independently of this bound.
    pub max_instance_depth: usize,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            legacy_overrides: true,
            max_instance_depth: DEFAULT_MAX_INSTANCE_DEPTH,
        }
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Expand a frame with the default configuration.
///
/// Returns `None` if the frame or its root node does not exist.
#[must_use]
pub fn expand(frame_id: NodeId, doc: &Document) -> Option<ExpandedScene> {
    expand_with(frame_id, doc, &ExpandConfig::default())
}

/// Expand a frame.
///
/// Same inputs always produce a structurally identical scene, so callers
/// may cache the result keyed on `(frame_id, document version)`.
#[must_use]
pub fn expand_with(
    frame_id: NodeId,
    doc: &Document,
    config: &ExpandConfig,
) -> Option<ExpandedScene> {
    let frame = doc.frame(frame_id)?;
    if doc.node(frame.root_node_id).is_none() {
        log::debug!(
            "frame `{frame_id}` root `{}` does not exist",
            frame.root_node_id
        );
        return None;
    }

    let root = ExpandPath::root().id_for(frame.root_node_id);
    let mut expander = Expander {
        doc,
        config,
        scene: ExpandedScene::new(frame_id, root),
        seen: HashSet::new(),
    };
    expander.expand_node(frame.root_node_id, &ExpandContext::frame());
    Some(expander.scene)
}

// ─── Context ──────────────────────────────────────────────────────────────

/// One instance being expanded: its component, its customizations and the
/// param index used while walking its template.
struct InstanceScope<'a> {
    instance_id: ExpandedId,
    component: &'a ComponentDef,
    props: &'a InstanceProps,
    /// `template_uid` → params bound to it.
    bindings: HashMap<NodeId, SmallVec<[&'a ComponentParamDef; 2]>>,
    /// The template scope the instance node itself sits in. `None` when the
    /// instance is directly editable (frame level or slot content).
    host: Option<Rc<InstanceScope<'a>>>,
}

impl<'a> InstanceScope<'a> {
    fn new(
        instance_id: ExpandedId,
        component: &'a ComponentDef,
        props: &'a InstanceProps,
        host: Option<Rc<InstanceScope<'a>>>,
    ) -> Self {
        let mut bindings: HashMap<NodeId, SmallVec<[&'a ComponentParamDef; 2]>> = HashMap::new();
        for param in &component.params {
            bindings
                .entry(param.binding.target_template_uid)
                .or_default()
                .push(param);
        }
        Self {
            instance_id,
            component,
            props,
            bindings,
            host,
        }
    }

    /// Resolve params, then legacy overrides, onto a template node's fields.
    /// Returns whether an explicit override landed on this node.
    fn resolve(&self, node: &Node, out: &mut Resolved, legacy: bool) -> bool {
        let mut overridden = false;

        let bound = node.template_uid.and_then(|uid| self.bindings.get(&uid));
        for param in bound.into_iter().flatten() {
            let explicit = self.props.param_overrides.get(&param.key).and_then(|raw| {
                let value = param.param_type.coerce(raw);
                if value.is_none() {
                    log::trace!(
                        "override `{}` on `{}` does not fit {:?}; using default",
                        param.key,
                        self.instance_id,
                        param.param_type
                    );
                }
                value
            });
            let is_explicit = explicit.is_some();
            let Some(value) = explicit.or_else(|| param.resolved_default()) else {
                continue;
            };
            let applied = apply_binding(
                param.binding.target,
                &value,
                &mut out.props,
                &mut out.style,
                &mut out.layout,
            );
            overridden |= applied && is_explicit;
        }

        if legacy && self.apply_legacy(node, out) {
            overridden = true;
        }
        overridden
    }

    /// Legacy entries may be keyed by the namespaced ID or the local ID.
    fn apply_legacy(&self, node: &Node, out: &mut Resolved) -> bool {
        let overrides = &self.props.overrides;
        if overrides.is_empty() {
            return false;
        }
        let entry = overrides.get(node.id.as_str()).or_else(|| {
            node.id
                .local_part(self.component.id)
                .and_then(|local| overrides.get(local))
        });
        entry.is_some_and(|e| apply_legacy_override(e, &mut out.props, &mut out.style))
    }
}

/// Who owns the nodes being walked, which decides editability.
#[derive(Clone)]
enum Scope<'a> {
    /// Ordinary frame content.
    Frame,
    /// Template content of an instance. Read-only.
    Template(Rc<InstanceScope<'a>>),
    /// Content injected into an instance's slot. Editable.
    Slot {
        slot_name: String,
        instance_id: ExpandedId,
    },
}

#[derive(Clone)]
struct ExpandContext<'a> {
    namespace: ExpandPath,
    /// Components being expanded on the current path, since the last
    /// editable slot boundary.
    ancestors: SmallVec<[NodeId; 8]>,
    /// Document IDs of the editable instance nodes on the current path.
    editable_instances: SmallVec<[NodeId; 4]>,
    /// Expanded IDs of the enclosing instances, outermost first.
    instance_path: SmallVec<[ExpandedId; 4]>,
    scope: Scope<'a>,
}

impl<'a> ExpandContext<'a> {
    fn frame() -> Self {
        Self {
            namespace: ExpandPath::root(),
            ancestors: SmallVec::new(),
            editable_instances: SmallVec::new(),
            instance_path: SmallVec::new(),
            scope: Scope::Frame,
        }
    }

    /// The same path position, owned by a different scope.
    fn with_scope(&self, namespace: ExpandPath, scope: Scope<'a>) -> Self {
        Self {
            namespace,
            ancestors: self.ancestors.clone(),
            editable_instances: self.editable_instances.clone(),
            instance_path: self.instance_path.clone(),
            scope,
        }
    }

    fn is_editable(&self) -> bool {
        !matches!(self.scope, Scope::Template(_))
    }

    /// Origin kind and patch target of an ordinary node in this scope.
    fn placement(&self, node_id: NodeId) -> (OriginKind, Option<NodeId>) {
        match self.scope {
            Scope::Frame => (OriginKind::FrameNode, Some(node_id)),
            Scope::Template(_) => (OriginKind::ComponentChild, None),
            Scope::Slot { .. } => (OriginKind::SlotContent, Some(node_id)),
        }
    }

    fn origin(&self, kind: OriginKind, node: &Node) -> ExpandedNodeOrigin {
        let mut origin = ExpandedNodeOrigin::new(kind);
        origin.instance_path = self.instance_path.clone();
        match &self.scope {
            Scope::Frame => {}
            Scope::Template(scope) => {
                origin.component_id = Some(scope.component.id);
                origin.component_template_uid = node.template_uid;
            }
            Scope::Slot {
                slot_name,
                instance_id,
            } => {
                origin.slot_origin = Some(SlotOrigin {
                    slot_name: slot_name.clone(),
                    instance_id: *instance_id,
                });
            }
        }
        origin
    }
}

/// A node's fields after parameter and override resolution.
struct Resolved {
    props: NodeProps,
    style: Style,
    layout: Layout,
}

impl Resolved {
    fn of(node: &Node) -> Self {
        Self {
            props: node.props.clone(),
            style: node.style.clone(),
            layout: node.layout.clone(),
        }
    }
}

// ─── Walk ─────────────────────────────────────────────────────────────────

struct Expander<'a> {
    doc: &'a Document,
    config: &'a ExpandConfig,
    scene: ExpandedScene,
    /// Expanded IDs already claimed. A node reached twice in the same
    /// namespace (child-list cycle, or one node listed under two parents)
    /// is expanded once.
    seen: HashSet<ExpandedId>,
}

impl<'a> Expander<'a> {
    /// Expand one document node; returns the expanded ID it contributes to
    /// its parent's `child_ids`, or `None` if it contributes nothing.
    fn expand_node(&mut self, id: NodeId, ctx: &ExpandContext<'a>) -> Option<ExpandedId> {
        let doc = self.doc;
        let Some(node) = doc.node(id) else {
            log::debug!("skipping dangling node reference `{id}`");
            return None;
        };
        let key = ctx.namespace.id_for(id);
        if !self.seen.insert(key) {
            log::debug!("node `{id}` reached twice under `{}`; expanding once", ctx.namespace);
            return None;
        }

        let expanded = match &node.props {
            NodeProps::Instance(props) => self.expand_instance(node, props, key, ctx),
            NodeProps::Slot(slot) => self.expand_slot(node, slot, key, ctx),
            _ => self.expand_ordinary(node, key, ctx),
        };
        Some(expanded)
    }

    fn resolve_in_scope(&self, node: &Node, out: &mut Resolved, ctx: &ExpandContext<'a>) -> bool {
        match &ctx.scope {
            Scope::Template(scope) => scope.resolve(node, out, self.config.legacy_overrides),
            _ => false,
        }
    }

    fn expand_ordinary(
        &mut self,
        node: &'a Node,
        id: ExpandedId,
        ctx: &ExpandContext<'a>,
    ) -> ExpandedId {
        let mut resolved = Resolved::of(node);
        let is_overridden = self.resolve_in_scope(node, &mut resolved, ctx);

        let child_ids = node
            .child_ids
            .iter()
            .filter_map(|c| self.expand_node(*c, ctx))
            .collect();

        let (kind, patch_target_id) = ctx.placement(node.id);
        let mut origin = ctx.origin(kind, node);
        origin.is_overridden = is_overridden;

        self.scene.insert(ExpandedNode {
            id,
            patch_target_id,
            node_type: node.node_type(),
            child_ids,
            layout: resolved.layout,
            style: resolved.style,
            props: resolved.props,
            placeholder: None,
            origin,
        });
        id
    }

    fn expand_instance(
        &mut self,
        node: &'a Node,
        props: &'a InstanceProps,
        instance_id: ExpandedId,
        ctx: &ExpandContext<'a>,
    ) -> ExpandedId {
        let component_id = props.component_id;
        let component = match self.check_instance(node.id, component_id, ctx) {
            Ok(component) => component,
            Err(error) => {
                self.emit_error_placeholder(node, instance_id, error, ctx);
                return instance_id;
            }
        };
        log::trace!("expanding instance `{instance_id}` of `{component_id}`");

        let host = match &ctx.scope {
            Scope::Template(scope) => Some(Rc::clone(scope)),
            _ => None,
        };
        let scope = InstanceScope::new(instance_id, component, props, host);
        let namespace = ctx.namespace.child(node.id);
        let mut inner = ctx.with_scope(namespace, Scope::Template(Rc::new(scope)));
        inner.ancestors.push(component_id);
        if ctx.is_editable() {
            inner.editable_instances.push(node.id);
        }
        inner.instance_path.push(instance_id);

        let root = self.expand_node(component.root_node_id, &inner);

        // The instance node may itself be a template node of an outer
        // component, so outer bindings can target its style and layout.
        let mut resolved = Resolved::of(node);
        let is_overridden = self.resolve_in_scope(node, &mut resolved, ctx);
        let mut origin = ctx.origin(OriginKind::InstanceRoot, node);
        origin.component_id = Some(component_id);
        origin.is_overridden = is_overridden;

        self.scene.insert(ExpandedNode {
            id: instance_id,
            patch_target_id: Some(node.id),
            node_type: NodeType::Instance,
            child_ids: root.into_iter().collect(),
            layout: resolved.layout,
            style: resolved.style,
            props: resolved.props,
            placeholder: None,
            origin,
        });
        instance_id
    }

    fn check_instance(
        &self,
        instance: NodeId,
        component_id: NodeId,
        ctx: &ExpandContext<'a>,
    ) -> Result<&'a ComponentDef, ExpansionError> {
        let reentered = ctx.is_editable() && ctx.editable_instances.contains(&instance);
        if reentered || ctx.ancestors.contains(&component_id) {
            return Err(ExpansionError::Cycle { component_id });
        }
        if ctx.instance_path.len() >= self.config.max_instance_depth {
            return Err(ExpansionError::DepthLimit {
                component_id,
                limit: self.config.max_instance_depth,
            });
        }
        let doc = self.doc;
        let component = doc
            .component(component_id)
            .ok_or(ExpansionError::MissingComponent { component_id })?;
        if doc.node(component.root_node_id).is_none() {
            return Err(ExpansionError::MissingComponentRoot {
                component_id,
                root_node_id: component.root_node_id,
            });
        }
        Ok(component)
    }

    /// Stand-in for an instance that cannot be expanded. Keeps the
    /// instance's own layout and style so surrounding layout holds its shape.
    fn emit_error_placeholder(
        &mut self,
        node: &Node,
        instance_id: ExpandedId,
        error: ExpansionError,
        ctx: &ExpandContext<'a>,
    ) {
        log::debug!("instance `{instance_id}` replaced by error placeholder: {error}");
        let mut origin = ctx.origin(OriginKind::ErrorPlaceholder, node);
        origin.component_id = Some(error.component_id());

        self.scene.insert(ExpandedNode {
            id: instance_id,
            patch_target_id: Some(node.id),
            node_type: NodeType::Container,
            child_ids: SmallVec::new(),
            layout: node.layout.clone(),
            style: node.style.clone(),
            props: NodeProps::container(),
            placeholder: Some(Placeholder::Error { error }),
            origin,
        });
    }

    /// A slot always contributes exactly one child: the assigned content
    /// root, the default content root, or an empty-slot placeholder.
    fn expand_slot(
        &mut self,
        node: &'a Node,
        slot: &'a SlotProps,
        key: ExpandedId,
        ctx: &ExpandContext<'a>,
    ) -> ExpandedId {
        if let Scope::Template(scope) = &ctx.scope
            && let Some(content) = scope.props.slot_root(&slot.slot_name)
        {
            if self.doc.node(content).is_some() {
                // Content belongs to whoever owns the instance node: the
                // user when the instance is editable, otherwise the outer
                // component's template.
                let content_scope = match &scope.host {
                    Some(host) => Scope::Template(Rc::clone(host)),
                    None => Scope::Slot {
                        slot_name: slot.slot_name.clone(),
                        instance_id: scope.instance_id,
                    },
                };
                let namespace = ctx.namespace.slot(&slot.slot_name);
                let mut content_ctx = ctx.with_scope(namespace, content_scope);
                if content_ctx.is_editable() {
                    content_ctx.ancestors.clear();
                }
                if let Some(root) = self.expand_node(content, &content_ctx) {
                    self.scene.register_slot_child(scope.instance_id, root);
                    return root;
                }
            } else {
                log::debug!(
                    "slot `{}` of `{}` names missing content `{content}`; treating as empty",
                    slot.slot_name,
                    scope.instance_id
                );
            }
        }

        if let Some(default) = slot.default_content_id
            && let Some(root) = self.expand_node(default, ctx)
        {
            return root;
        }

        let origin = ctx.origin(OriginKind::ComponentChild, node);
        self.scene.insert(ExpandedNode {
            id: key,
            patch_target_id: None,
            node_type: NodeType::Container,
            child_ids: SmallVec::new(),
            layout: node.layout.clone(),
            style: node.style.clone(),
            props: NodeProps::container(),
            placeholder: Some(Placeholder::EmptySlot {
                slot_name: slot.slot_name.clone(),
            }),
            origin,
        });
        key
    }
}
