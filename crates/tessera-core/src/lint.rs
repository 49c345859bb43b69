//! Lint diagnostics for Tessera documents.
//!
//! Reports structural issues without modifying the document. The expansion
//! engine tolerates every one of these (it degrades to defaults or error
//! placeholders); lint is how the editor surfaces them before they show up
//! as an error box on the canvas.

use crate::id::NodeId;
use crate::model::{Document, Node, NodeProps};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LintSeverity {
    /// Should be fixed; likely a mistake or a broken reference.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintDiagnostic {
    /// The node or component this diagnostic refers to.
    pub node_id: NodeId,
    /// Human-readable message.
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "dangling-child", "component-cycle").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the document and return diagnostics, grouped by
/// rule and sorted by ID within each rule.
#[must_use]
pub fn lint_document(doc: &Document) -> Vec<LintDiagnostic> {
    let nodes = sorted_nodes(doc);
    let mut diags = Vec::new();
    lint_namespace_prefix(&nodes, &mut diags);
    lint_mixed_ownership(doc, &nodes, &mut diags);
    lint_orphan_slot_content(doc, &nodes, &mut diags);
    lint_dangling_children(doc, &nodes, &mut diags);
    lint_missing_components(doc, &nodes, &mut diags);
    lint_params(doc, &mut diags);
    lint_component_cycles(doc, &mut diags);
    diags
}

fn sorted_nodes(doc: &Document) -> Vec<&Node> {
    let mut nodes: Vec<&Node> = doc.nodes.values().map(|n| n.as_ref()).collect();
    nodes.sort_by_key(|n| n.id);
    nodes
}

fn sorted_component_ids(doc: &Document) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = doc.components.keys().copied().collect();
    ids.sort();
    ids
}

// ─── Node rules ───────────────────────────────────────────────────────────

/// Template nodes must carry their component's `<componentId>::` prefix.
fn lint_namespace_prefix(nodes: &[&Node], diags: &mut Vec<LintDiagnostic>) {
    for node in nodes {
        let Some(component) = node.source_component_id else {
            continue;
        };
        if !node.id.is_namespaced_under(component) {
            diags.push(LintDiagnostic {
                node_id: node.id,
                message: format!(
                    "Template node `{}` of `{component}` should be named `{component}::{}`.",
                    node.id,
                    node.local_id()
                ),
                severity: LintSeverity::Warning,
                rule: "namespace-prefix",
            });
        }
    }
}

/// A slot-content subtree is owned as a whole. Reported once per offending
/// descendant, against the nearest owner-tagged root that reaches it.
fn lint_mixed_ownership(doc: &Document, nodes: &[&Node], diags: &mut Vec<LintDiagnostic>) {
    let mut reported = HashSet::new();
    for node in nodes {
        let Some(owner) = node.owner_instance_id else {
            continue;
        };
        for id in doc.subtree(node.id).into_iter().skip(1) {
            let Some(desc) = doc.node(id) else { continue };
            if desc.owner_instance_id != Some(owner) && reported.insert(id) {
                diags.push(LintDiagnostic {
                    node_id: id,
                    message: format!(
                        "`{id}` sits inside slot content owned by `{owner}` but is not owned by it."
                    ),
                    severity: LintSeverity::Warning,
                    rule: "mixed-ownership",
                });
            }
        }
    }
}

/// `owner_instance_id` must name an existing instance node.
fn lint_orphan_slot_content(doc: &Document, nodes: &[&Node], diags: &mut Vec<LintDiagnostic>) {
    for node in nodes {
        let Some(owner) = node.owner_instance_id else {
            continue;
        };
        let is_instance = doc.node(owner).is_some_and(|o| o.as_instance().is_some());
        if !is_instance {
            diags.push(LintDiagnostic {
                node_id: node.id,
                message: format!("`{}` is owned by `{owner}`, which is not an instance.", node.id),
                severity: LintSeverity::Warning,
                rule: "orphan-slot-content",
            });
        }
    }
}

fn lint_dangling_children(doc: &Document, nodes: &[&Node], diags: &mut Vec<LintDiagnostic>) {
    for node in nodes {
        for child in &node.child_ids {
            if doc.node(*child).is_none() {
                diags.push(LintDiagnostic {
                    node_id: node.id,
                    message: format!("`{}` lists missing child `{child}`.", node.id),
                    severity: LintSeverity::Warning,
                    rule: "dangling-child",
                });
            }
        }
    }
}

fn lint_missing_components(doc: &Document, nodes: &[&Node], diags: &mut Vec<LintDiagnostic>) {
    for node in nodes {
        let Some(inst) = node.as_instance() else {
            continue;
        };
        if doc.component(inst.component_id).is_none() {
            diags.push(LintDiagnostic {
                node_id: node.id,
                message: format!(
                    "Instance `{}` refers to unknown component `{}`.",
                    node.id, inst.component_id
                ),
                severity: LintSeverity::Warning,
                rule: "missing-component",
            });
        }
    }
}

// ─── Component rules ──────────────────────────────────────────────────────

/// Param definitions: unique keys, a reachable binding target and a default
/// that fits the declared type.
fn lint_params(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for component_id in sorted_component_ids(doc) {
        let Some(component) = doc.component(component_id) else {
            continue;
        };
        let uids: HashSet<NodeId> = doc
            .component_template_nodes(component_id)
            .into_iter()
            .filter_map(|id| doc.node(id))
            .filter(|n| n.source_component_id == Some(component_id))
            .filter_map(|n| n.template_uid)
            .collect();

        let mut keys = HashSet::new();
        for param in &component.params {
            if !keys.insert(param.key.as_str()) {
                diags.push(LintDiagnostic {
                    node_id: component_id,
                    message: format!("`{component_id}` declares param `{}` twice.", param.key),
                    severity: LintSeverity::Warning,
                    rule: "duplicate-param-key",
                });
            }
            if !uids.contains(&param.binding.target_template_uid) {
                diags.push(LintDiagnostic {
                    node_id: component_id,
                    message: format!(
                        "Param `{}` of `{component_id}` targets `{}`, which is not in the template.",
                        param.key, param.binding.target_template_uid
                    ),
                    severity: LintSeverity::Info,
                    rule: "unbound-param",
                });
            }
            if param.resolved_default().is_none() {
                diags.push(LintDiagnostic {
                    node_id: component_id,
                    message: format!(
                        "Default `{}` of param `{}` does not fit {:?}.",
                        param.default_value, param.key, param.param_type
                    ),
                    severity: LintSeverity::Warning,
                    rule: "invalid-param-default",
                });
            }
        }
    }
}

/// Component → components its template instantiates directly.
pub fn component_dependency_graph(doc: &Document) -> DiGraphMap<NodeId, ()> {
    let mut graph = DiGraphMap::new();
    for component_id in sorted_component_ids(doc) {
        graph.add_node(component_id);
        for id in doc.component_template_nodes(component_id) {
            if let Some(NodeProps::Instance(inst)) = doc.node(id).map(|n| &n.props) {
                graph.add_edge(component_id, inst.component_id, ());
            }
        }
    }
    graph
}

/// Every component in a strongly connected cycle, reported once.
fn lint_component_cycles(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    let graph = component_dependency_graph(doc);
    let mut cyclic: Vec<NodeId> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();
    cyclic.sort();

    for component_id in cyclic {
        diags.push(LintDiagnostic {
            node_id: component_id,
            message: format!(
                "Component `{component_id}` instantiates itself through its template; its instances will render as errors."
            ),
            severity: LintSeverity::Warning,
            rule: "component-cycle",
        });
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentDef, InstanceProps, SlotAssignment};
    use crate::params::{BindingTarget, ComponentParamDef, ParamType, PropField};
    use serde_json::json;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    /// Component with a single container root, optionally holding an
    /// instance of `uses`.
    fn component(doc: &mut Document, name: &str, uses: Option<&str>) {
        let root_id = NodeId::namespaced(id(name), "root");
        let mut root = Node::new(root_id, NodeProps::container());
        root.source_component_id = Some(id(name));
        root.template_uid = Some(id("root"));
        if let Some(other) = uses {
            let inst_id = NodeId::namespaced(id(name), "inner");
            let mut inst = Node::new(inst_id, NodeProps::Instance(InstanceProps::new(id(other))));
            inst.source_component_id = Some(id(name));
            root.child_ids.push(inst_id);
            doc.insert_node(inst);
        }
        doc.insert_node(root);
        doc.insert_component(ComponentDef {
            id: id(name),
            name: name.into(),
            root_node_id: root_id,
            params: Vec::new(),
        });
    }

    #[test]
    fn clean_document_has_no_diagnostics() {
        let mut doc = Document::new();
        component(&mut doc, "LintLeaf", None);
        component(&mut doc, "LintBranch", Some("LintLeaf"));
        assert!(lint_document(&doc).is_empty());
    }

    #[test]
    fn lint_component_cycle_reports_each_member_once() {
        let mut doc = Document::new();
        component(&mut doc, "LintA", Some("LintB"));
        component(&mut doc, "LintB", Some("LintA"));
        component(&mut doc, "LintSelf", Some("LintSelf"));
        component(&mut doc, "LintFine", Some("LintA"));

        let diags = lint_document(&doc);
        let cyclic: Vec<NodeId> = diags
            .iter()
            .filter(|d| d.rule == "component-cycle")
            .map(|d| d.node_id)
            .collect();
        assert_eq!(cyclic, vec![id("LintA"), id("LintB"), id("LintSelf")]);
    }

    #[test]
    fn lint_namespace_prefix() {
        let mut doc = Document::new();
        let mut node = Node::new(id("stray_label"), NodeProps::text("x"));
        node.source_component_id = Some(id("Button"));
        doc.insert_node(node);
        assert_eq!(rules(&lint_document(&doc)), vec!["namespace-prefix"]);
    }

    #[test]
    fn lint_ownership_rules() {
        let mut doc = Document::new();
        component(&mut doc, "LintCard", None);

        let mut props = InstanceProps::new(id("LintCard"));
        props.slots.insert(
            "content".into(),
            SlotAssignment {
                root_node_id: Some(id("own_root")),
            },
        );
        doc.insert_node(Node::new(id("own_card"), NodeProps::Instance(props)));

        let mut root = Node::new(id("own_root"), NodeProps::container());
        root.owner_instance_id = Some(id("own_card"));
        root.child_ids.push(id("own_leaf"));
        doc.insert_node(root);
        // Untagged descendant, and content owned by something that is not an instance.
        doc.insert_node(Node::new(id("own_leaf"), NodeProps::text("a")));
        let mut orphan = Node::new(id("own_orphan"), NodeProps::text("b"));
        orphan.owner_instance_id = Some(id("own_root"));
        doc.insert_node(orphan);

        let diags = lint_document(&doc);
        assert_eq!(rules(&diags), vec!["mixed-ownership", "orphan-slot-content"]);
        assert_eq!(diags[0].node_id, id("own_leaf"));
        assert_eq!(diags[1].node_id, id("own_orphan"));
    }

    #[test]
    fn lint_references() {
        let mut doc = Document::new();
        let mut root = Node::new(id("ref_root"), NodeProps::container());
        root.child_ids.push(id("ref_ghost"));
        root.child_ids.push(id("ref_inst"));
        doc.insert_node(root);
        doc.insert_node(Node::new(
            id("ref_inst"),
            NodeProps::Instance(InstanceProps::new(id("NoSuchComponent"))),
        ));

        let diags = lint_document(&doc);
        assert_eq!(rules(&diags), vec!["dangling-child", "missing-component"]);
    }

    #[test]
    fn lint_param_definitions() {
        let mut doc = Document::new();
        component(&mut doc, "LintParams", None);
        let mut def = doc.component(id("LintParams")).unwrap().clone();
        let label = |default| {
            ComponentParamDef::new(
                "label",
                ParamType::String,
                default,
                id("root"),
                BindingTarget::Props(PropField::Text),
            )
        };
        def.params.push(label(json!("ok")));
        def.params.push(label(json!(7)));
        def.params.push(ComponentParamDef::new(
            "ghost",
            ParamType::Boolean,
            json!(true),
            id("missing_uid"),
            BindingTarget::Props(PropField::Clip),
        ));
        doc.insert_component(def);

        let diags = lint_document(&doc);
        assert_eq!(
            rules(&diags),
            vec!["duplicate-param-key", "invalid-param-default", "unbound-param"]
        );
        let unbound = diags.iter().find(|d| d.rule == "unbound-param").unwrap();
        assert_eq!(unbound.severity, LintSeverity::Info);
    }
}
