//! Document commands.
//!
//! Every structural edit the editor makes goes through a `DocumentCommand`.
//! Applying one never mutates the input: it produces a new `Document` that
//! shares every untouched row with the old one (`Arc` copy-on-write), so
//! the old version stays valid for readers and undo.
//!
//! Commands validate first and fail without side effects. The slot
//! commands own the slot-content lifecycle: assigning tags the content
//! subtree with its owning instance, and clearing or replacing content
//! garbage-collects the subtree it owned.

use crate::ids::IdGenerator;
use petgraph::algo::has_path_connecting;
use tessera_core::lint::component_dependency_graph;
use tessera_core::{Document, InstanceProps, Node, NodeId, NodeProps, SlotAssignment};

/// Upper bound on generator calls while looking for a free ID.
const MAX_ID_ATTEMPTS: usize = 1024;

/// An edit to the document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCommand {
    /// Create an instance of `component` under `parent`, at `index` or at
    /// the end.
    InsertInstance {
        parent: NodeId,
        index: Option<usize>,
        component: NodeId,
    },
    /// Store a raw override value. Type checking happens at expansion,
    /// where a mistyped value falls back to the default.
    SetParamOverride {
        instance: NodeId,
        key: String,
        value: serde_json::Value,
    },
    ClearParamOverride {
        instance: NodeId,
        key: String,
    },
    /// Move `content` into a slot of `instance`, replacing what was there.
    AssignSlot {
        instance: NodeId,
        slot: String,
        content: NodeId,
    },
    ClearSlot {
        instance: NodeId,
        slot: String,
    },
    /// Remove an instance together with all slot content it owns.
    DeleteInstance {
        instance: NodeId,
    },
    /// Names are display labels only; IDs never change.
    RenameNode {
        id: NodeId,
        name: String,
    },
}

impl DocumentCommand {
    /// Short label for undo menus and logs.
    pub fn description(&self) -> &'static str {
        match self {
            DocumentCommand::InsertInstance { .. } => "insert instance",
            DocumentCommand::SetParamOverride { .. } => "set parameter",
            DocumentCommand::ClearParamOverride { .. } => "reset parameter",
            DocumentCommand::AssignSlot { .. } => "fill slot",
            DocumentCommand::ClearSlot { .. } => "clear slot",
            DocumentCommand::DeleteInstance { .. } => "delete instance",
            DocumentCommand::RenameNode { .. } => "rename",
        }
    }
}

/// Why a command was rejected. The document is unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("node `{0}` does not exist")]
    UnknownNode(NodeId),

    #[error("node `{0}` is not an instance")]
    NotAnInstance(NodeId),

    #[error("component `{0}` does not exist")]
    UnknownComponent(NodeId),

    #[error("component `{component}` has no slot named `{slot}`")]
    UnknownSlot { component: NodeId, slot: String },

    #[error("component `{component}` has no parameter `{key}`")]
    UnknownParam { component: NodeId, key: String },

    #[error("node `{0}` cannot hold children")]
    NotAContainer(NodeId),

    #[error("`{content}` is already slot content of `{owner}`")]
    AlreadyOwned { content: NodeId, owner: NodeId },

    #[error("`{content}` does not belong to the same template as instance `{instance}`")]
    ContentScope { content: NodeId, instance: NodeId },

    #[error("`{content}` contains instance `{instance}`")]
    ContainsInstance { content: NodeId, instance: NodeId },

    #[error("`{0}` is the root of a frame")]
    FrameRoot(NodeId),

    #[error("placing `{component}` inside the template of `{host}` would make `{host}` contain itself")]
    WouldCreateCycle { component: NodeId, host: NodeId },

    #[error("no free node ID for prefix `{0}`")]
    IdExhausted(String),
}

/// What a successful command did, besides producing a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The node the command created, if any.
    pub created: Option<NodeId>,
    /// Nodes removed from the document, sorted.
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Applied {
    pub document: Document,
    pub outcome: Outcome,
}

/// Apply a command to `doc`, producing the next document version.
pub fn apply_command(
    doc: &Document,
    command: &DocumentCommand,
    ids: &mut dyn IdGenerator,
) -> Result<Applied, CommandError> {
    let mut edit = Edit {
        doc: doc.clone(),
        created: None,
        removed: Vec::new(),
    };
    match command {
        DocumentCommand::InsertInstance {
            parent,
            index,
            component,
        } => edit.insert_instance(*parent, *index, *component, ids)?,
        DocumentCommand::SetParamOverride {
            instance,
            key,
            value,
        } => edit.set_param_override(*instance, key, value.clone())?,
        DocumentCommand::ClearParamOverride { instance, key } => {
            instance_props(&edit.doc, *instance)?;
            edit.with_instance(*instance, |props| {
                props.param_overrides.remove(key);
            });
        }
        DocumentCommand::AssignSlot {
            instance,
            slot,
            content,
        } => edit.assign_slot(*instance, slot, *content)?,
        DocumentCommand::ClearSlot { instance, slot } => edit.clear_slot(*instance, slot)?,
        DocumentCommand::DeleteInstance { instance } => edit.delete_instance(*instance)?,
        DocumentCommand::RenameNode { id, name } => {
            edit.doc
                .node_mut(*id)
                .ok_or(CommandError::UnknownNode(*id))?
                .name = name.clone();
        }
    }

    edit.removed.sort();
    Ok(Applied {
        document: edit.doc,
        outcome: Outcome {
            created: edit.created,
            removed: edit.removed,
        },
    })
}

fn instance_props(doc: &Document, id: NodeId) -> Result<(&Node, &InstanceProps), CommandError> {
    let node = doc.node(id).ok_or(CommandError::UnknownNode(id))?;
    let props = node.as_instance().ok_or(CommandError::NotAnInstance(id))?;
    Ok((node, props))
}

/// Whether `component`'s own template declares a slot called `slot`.
fn component_has_slot(doc: &Document, component: NodeId, slot: &str) -> bool {
    doc.component_template_nodes(component)
        .into_iter()
        .filter_map(|id| doc.node(id))
        .filter(|n| n.source_component_id == Some(component))
        .any(|n| n.as_slot().is_some_and(|s| s.slot_name == slot))
}

fn require_slot(doc: &Document, component: NodeId, slot: &str) -> Result<(), CommandError> {
    if doc.component(component).is_none() {
        return Err(CommandError::UnknownComponent(component));
    }
    if !component_has_slot(doc, component, slot) {
        return Err(CommandError::UnknownSlot {
            component,
            slot: slot.to_string(),
        });
    }
    Ok(())
}

/// A document being edited by one command.
struct Edit {
    doc: Document,
    created: Option<NodeId>,
    removed: Vec<NodeId>,
}

impl Edit {
    fn with_instance(&mut self, id: NodeId, f: impl FnOnce(&mut InstanceProps)) {
        if let Some(NodeProps::Instance(props)) = self.doc.node_mut(id).map(|n| &mut n.props) {
            f(props);
        }
    }

    fn insert_instance(
        &mut self,
        parent: NodeId,
        index: Option<usize>,
        component: NodeId,
        ids: &mut dyn IdGenerator,
    ) -> Result<(), CommandError> {
        let parent_node = self.doc.node(parent).ok_or(CommandError::UnknownNode(parent))?;
        if !matches!(parent_node.props, NodeProps::Container(_)) {
            return Err(CommandError::NotAContainer(parent));
        }
        let def = self
            .doc
            .component(component)
            .ok_or(CommandError::UnknownComponent(component))?;

        // Inserting into a template edits that component.
        let host = parent_node.source_component_id;
        if let Some(host) = host {
            let graph = component_dependency_graph(&self.doc);
            if host == component || has_path_connecting(&graph, component, host, None) {
                return Err(CommandError::WouldCreateCycle { component, host });
            }
        }

        let base = component.as_str().to_lowercase();
        let prefix = match host {
            Some(host) => NodeId::namespaced(host, &base).as_str().to_string(),
            None => base,
        };
        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| ids.next_id(&prefix))
            .find(|id| self.doc.node(*id).is_none())
            .ok_or_else(|| CommandError::IdExhausted(prefix.clone()))?;

        let mut node = Node::new(id, NodeProps::Instance(InstanceProps::new(component)));
        node.name = def.name.clone();
        node.source_component_id = host;
        node.template_uid = host.and_then(|h| id.local_part(h)).map(NodeId::intern);
        node.owner_instance_id = parent_node.owner_instance_id;
        self.doc.insert_node(node);

        if let Some(parent_node) = self.doc.node_mut(parent) {
            let len = parent_node.child_ids.len();
            let at = index.map_or(len, |i| i.min(len));
            parent_node.child_ids.insert(at, id);
        }
        self.created = Some(id);
        Ok(())
    }

    fn set_param_override(
        &mut self,
        instance: NodeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), CommandError> {
        let (_, props) = instance_props(&self.doc, instance)?;
        let component = props.component_id;
        let def = self
            .doc
            .component(component)
            .ok_or(CommandError::UnknownComponent(component))?;
        if def.param(key).is_none() {
            return Err(CommandError::UnknownParam {
                component,
                key: key.to_string(),
            });
        }
        self.with_instance(instance, |props| {
            props.param_overrides.insert(key.to_string(), value);
        });
        Ok(())
    }

    fn assign_slot(
        &mut self,
        instance: NodeId,
        slot: &str,
        content: NodeId,
    ) -> Result<(), CommandError> {
        let (inst_node, props) = instance_props(&self.doc, instance)?;
        require_slot(&self.doc, props.component_id, slot)?;

        let content_node = self.doc.node(content).ok_or(CommandError::UnknownNode(content))?;
        if content_node.source_component_id != inst_node.source_component_id {
            return Err(CommandError::ContentScope { content, instance });
        }
        if self.doc.is_frame_root(content) {
            return Err(CommandError::FrameRoot(content));
        }
        let subtree = self.doc.subtree(content);
        if subtree.contains(&instance) {
            return Err(CommandError::ContainsInstance { content, instance });
        }
        let foreign = subtree.iter().find_map(|id| {
            let owner = self.doc.node(*id)?.owner_instance_id?;
            (owner != instance).then_some((*id, owner))
        });
        if let Some((content, owner)) = foreign {
            return Err(CommandError::AlreadyOwned { content, owner });
        }
        let previous = props.slot_root(slot);

        // Detach before collecting: the new content may sit inside the old.
        self.detach(content);
        if let Some(previous) = previous.filter(|p| *p != content) {
            self.remove_owned_subtree(previous, instance);
        }
        for id in subtree {
            if let Some(node) = self.doc.node_mut(id) {
                node.owner_instance_id = Some(instance);
            }
        }
        self.with_instance(instance, |props| {
            props.slots.insert(
                slot.to_string(),
                SlotAssignment {
                    root_node_id: Some(content),
                },
            );
        });
        Ok(())
    }

    fn clear_slot(&mut self, instance: NodeId, slot: &str) -> Result<(), CommandError> {
        let (_, props) = instance_props(&self.doc, instance)?;
        let component = props.component_id;
        let previous = props.slot_root(slot);
        if self.doc.component(component).is_some()
            && !component_has_slot(&self.doc, component, slot)
        {
            return Err(CommandError::UnknownSlot {
                component,
                slot: slot.to_string(),
            });
        }

        self.with_instance(instance, |props| {
            props.slots.remove(slot);
        });
        if let Some(previous) = previous {
            self.remove_owned_subtree(previous, instance);
        }
        Ok(())
    }

    fn delete_instance(&mut self, instance: NodeId) -> Result<(), CommandError> {
        instance_props(&self.doc, instance)?;
        if self.doc.is_frame_root(instance) {
            return Err(CommandError::FrameRoot(instance));
        }
        self.detach(instance);
        for owned in self.doc.nodes_owned_by(instance) {
            self.remove_owned_subtree(owned, instance);
        }
        self.remove(instance);
        Ok(())
    }

    /// Unlink `id` from every child list and slot assignment that names it.
    fn detach(&mut self, id: NodeId) {
        let referrers: Vec<NodeId> = self
            .doc
            .nodes
            .values()
            .filter(|n| {
                n.child_ids.contains(&id)
                    || n.as_instance()
                        .is_some_and(|p| p.slots.values().any(|s| s.root_node_id == Some(id)))
            })
            .map(|n| n.id)
            .collect();

        for referrer in referrers {
            let Some(node) = self.doc.node_mut(referrer) else {
                continue;
            };
            node.child_ids.retain(|c| *c != id);
            if let NodeProps::Instance(props) = &mut node.props {
                props.slots.retain(|_, s| s.root_node_id != Some(id));
            }
        }
    }

    /// Garbage-collect slot content: every node under `root` owned by
    /// `owner`, and transitively whatever nested instances among them own.
    fn remove_owned_subtree(&mut self, root: NodeId, owner: NodeId) {
        let mut stack = vec![(root, owner)];
        while let Some((root, owner)) = stack.pop() {
            for id in self.doc.subtree(root) {
                let Some(node) = self.doc.node(id) else { continue };
                if node.owner_instance_id != Some(owner) {
                    continue;
                }
                if node.as_instance().is_some() {
                    stack.extend(self.doc.nodes_owned_by(id).into_iter().map(|o| (o, id)));
                }
                self.remove(id);
            }
        }
    }

    fn remove(&mut self, id: NodeId) {
        if self.doc.nodes.remove(&id).is_some() {
            log::trace!("removed node `{id}`");
            self.removed.push(id);
        }
    }
}
