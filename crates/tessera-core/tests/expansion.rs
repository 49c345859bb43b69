//! Integration tests: JSON document → expansion → verify the scene.
//!
//! Exercises the full `tessera-core` pipeline on the `button_card` fixture
//! and on small documents built in code for the failure modes.

use pretty_assertions::assert_eq;
use tessera_core::{
    Document, ExpandConfig, ExpandedId, ExpansionError, InstanceProps, Node, NodeId, NodeProps,
    NodeType, OriginKind, Placeholder, SlotAssignment, expand, expand_with, lint_document,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

fn eid(s: &str) -> ExpandedId {
    ExpandedId::intern(s)
}

fn fixture() -> Document {
    Document::from_json(include_str!("fixtures/button_card.json")).unwrap()
}

fn text_of(props: &NodeProps) -> &str {
    match props {
        NodeProps::Text(t) => &t.text,
        other => panic!("expected text props, got {other:?}"),
    }
}

/// Adds component `name` whose root container holds one instance per entry
/// of `uses`, local IDs `inner0`, `inner1`, …
fn component(doc: &mut Document, name: &str, uses: &[&str]) {
    let root_id = NodeId::namespaced(id(name), "root");
    let mut root = Node::new(root_id, NodeProps::container());
    root.source_component_id = Some(id(name));
    root.template_uid = Some(id("root"));
    for (i, other) in uses.iter().enumerate() {
        let local = format!("inner{i}");
        let inst_id = NodeId::namespaced(id(name), &local);
        let mut inst = Node::new(inst_id, NodeProps::Instance(InstanceProps::new(id(other))));
        inst.source_component_id = Some(id(name));
        inst.template_uid = Some(id(&local));
        root.child_ids.push(inst_id);
        doc.insert_node(inst);
    }
    doc.insert_node(root);
    doc.insert_component(tessera_core::ComponentDef {
        id: id(name),
        name: name.into(),
        root_node_id: root_id,
        params: Vec::new(),
    });
}

/// Frame `frame` whose root container holds one instance per `(id, component)`.
fn frame_with(doc: &mut Document, frame: &str, instances: &[(&str, &str)]) {
    let root_id = NodeId::intern(&format!("{frame}_root"));
    let mut root = Node::new(root_id, NodeProps::container());
    for (inst, comp) in instances {
        doc.insert_node(Node::new(
            id(inst),
            NodeProps::Instance(InstanceProps::new(id(comp))),
        ));
        root.child_ids.push(id(inst));
    }
    doc.insert_node(root);
    doc.insert_frame(tessera_core::Frame {
        id: id(frame),
        name: frame.into(),
        root_node_id: root_id,
    });
}

/// Points `card1`'s `content` slot at `content`.
fn assign_card1_content(doc: &mut Document, content: &str) {
    let mut card = doc.node(id("card1")).unwrap().clone();
    if let NodeProps::Instance(props) = &mut card.props {
        props.slots.insert(
            "content".into(),
            SlotAssignment {
                root_node_id: Some(id(content)),
            },
        );
    }
    doc.insert_node(card);
}

// ─── Params ──────────────────────────────────────────────────────────────

#[test]
fn default_param_value_reaches_bound_node() {
    init_logger();
    let scene = expand(id("f1"), &fixture()).unwrap();

    let label = scene.get_str("btn1::Button::label").unwrap();
    assert_eq!(text_of(&label.props), "Click");
    assert_eq!(label.origin.kind, OriginKind::ComponentChild);
    assert_eq!(label.origin.component_id, Some(id("Button")));
    assert_eq!(label.origin.component_template_uid, Some(id("label")));
    assert_eq!(label.patch_target_id, None);
    assert!(!label.origin.is_overridden);

    // Template style survives where no param targets it.
    assert_eq!(label.style.text_color.map(|c| c.to_hex()), Some("#FFFFFF".into()));
}

#[test]
fn override_marks_only_the_bound_node() {
    init_logger();
    let scene = expand(id("f1"), &fixture()).unwrap();

    let label = scene.get_str("btn2::Button::label").unwrap();
    assert_eq!(text_of(&label.props), "Submit");
    assert!(label.origin.is_overridden);

    // `tone` resolves from its default on the root; defaults never mark.
    let root = scene.get_str("btn2::Button::root").unwrap();
    assert_eq!(root.style.fill_color.map(|c| c.to_hex()), Some("#3B82F6".into()));
    assert!(!root.origin.is_overridden);
    assert!(!scene.get_str("btn2").unwrap().origin.is_overridden);
}

#[test]
fn instances_of_one_component_are_independent() {
    let scene = expand(id("f1"), &fixture()).unwrap();
    assert_eq!(text_of(&scene.get_str("btn1::Button::label").unwrap().props), "Click");
    assert_eq!(text_of(&scene.get_str("btn2::Button::label").unwrap().props), "Submit");
}

// ─── Structure ───────────────────────────────────────────────────────────

#[test]
fn frame_and_instance_roots() {
    let scene = expand(id("f1"), &fixture()).unwrap();

    assert_eq!(scene.root, eid("page"));
    let page = scene.root_node().unwrap();
    assert_eq!(page.origin.kind, OriginKind::FrameNode);
    assert_eq!(page.patch_target_id, Some(id("page")));
    assert_eq!(
        page.child_ids.as_slice(),
        &[eid("btn1"), eid("btn2"), eid("card1"), eid("bar1")]
    );

    let btn1 = scene.get_str("btn1").unwrap();
    assert_eq!(btn1.node_type, NodeType::Instance);
    assert_eq!(btn1.origin.kind, OriginKind::InstanceRoot);
    assert_eq!(btn1.patch_target_id, Some(id("btn1")));
    assert_eq!(btn1.child_ids.as_slice(), &[eid("btn1::Button::root")]);
    assert_eq!(
        scene.get_str("btn1::Button::root").unwrap().child_ids.as_slice(),
        &[eid("btn1::Button::label")]
    );
}

#[test]
fn preorder_visits_the_whole_scene() {
    let scene = expand(id("f1"), &fixture()).unwrap();
    let preorder = scene.preorder();
    let order: Vec<&str> = preorder.iter().map(|e| e.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "page",
            "btn1",
            "btn1::Button::root",
            "btn1::Button::label",
            "btn2",
            "btn2::Button::root",
            "btn2::Button::label",
            "card1",
            "card1::Card::root",
            "card1::Card::title",
            "card1::slot(content)::txt_hello",
            "bar1",
            "bar1::Toolbar::root",
            "bar1::Toolbar::card",
            "bar1::Toolbar::card::Card::root",
            "bar1::Toolbar::card::Card::title",
            "bar1::Toolbar::card::slot(content)::Toolbar__caption",
        ]
    );
    assert_eq!(scene.len(), order.len());
}

#[test]
fn expansion_is_deterministic() {
    let doc = fixture();
    let a = expand(id("f1"), &doc).unwrap();
    let b = expand(id("f1"), &doc).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.preorder(), b.preorder());
    for (key, node) in &a.nodes {
        assert_eq!(node.origin, b.nodes[key].origin);
    }
}

// ─── Slots ───────────────────────────────────────────────────────────────

#[test]
fn slot_content_is_injected_and_editable() {
    let scene = expand(id("f1"), &fixture()).unwrap();

    let card_root = scene.get_str("card1::Card::root").unwrap();
    assert_eq!(
        card_root.child_ids.as_slice(),
        &[eid("card1::Card::title"), eid("card1::slot(content)::txt_hello")]
    );

    let hello = scene.get_str("card1::slot(content)::txt_hello").unwrap();
    assert_eq!(text_of(&hello.props), "Hello");
    assert_eq!(hello.origin.kind, OriginKind::SlotContent);
    assert_eq!(hello.patch_target_id, Some(id("txt_hello")));
    assert_eq!(hello.origin.instance_path.as_slice(), &[eid("card1")]);
    let slot = hello.origin.slot_origin.as_ref().unwrap();
    assert_eq!(slot.slot_name, "content");
    assert_eq!(slot.instance_id, eid("card1"));

    assert_eq!(
        scene.slot_children(eid("card1")),
        &[eid("card1::slot(content)::txt_hello")]
    );
    // The content is not emitted a second time at its document ID.
    assert!(scene.get_str("txt_hello").is_none());
}

#[test]
fn slot_content_from_an_outer_template_stays_read_only() {
    let scene = expand(id("f1"), &fixture()).unwrap();

    let nested = scene.get_str("bar1::Toolbar::card").unwrap();
    assert_eq!(nested.origin.kind, OriginKind::InstanceRoot);
    // Instance roots are always selectable, even inside a template.
    assert_eq!(nested.patch_target_id, Some(id("Toolbar::card")));
    assert_eq!(nested.origin.instance_path.as_slice(), &[eid("bar1")]);

    let caption = scene
        .get_str("bar1::Toolbar::card::slot(content)::Toolbar__caption")
        .unwrap();
    assert_eq!(caption.origin.kind, OriginKind::ComponentChild);
    assert_eq!(caption.patch_target_id, None);
    assert_eq!(caption.origin.component_id, Some(id("Toolbar")));
    // Outer params still reach it.
    assert_eq!(text_of(&caption.props), "Edit");
    assert!(caption.origin.is_overridden);
    assert_eq!(
        caption.origin.instance_path.as_slice(),
        &[eid("bar1"), eid("bar1::Toolbar::card")]
    );
    assert_eq!(
        scene.slot_children(eid("bar1::Toolbar::card")),
        &[eid("bar1::Toolbar::card::slot(content)::Toolbar__caption")]
    );
}

#[test]
fn empty_slot_becomes_placeholder() {
    let mut doc = fixture();
    let mut card = doc.node(id("card1")).unwrap().clone();
    if let NodeProps::Instance(props) = &mut card.props {
        props.slots.clear();
    }
    doc.insert_node(card);

    let scene = expand(id("f1"), &doc).unwrap();
    let slot = scene.get_str("card1::Card::body").unwrap();
    assert_eq!(
        slot.placeholder,
        Some(Placeholder::EmptySlot {
            slot_name: "content".into()
        })
    );
    assert_eq!(slot.node_type, NodeType::Container);
    assert_eq!(slot.patch_target_id, None);
    assert!(scene.slot_children(eid("card1")).is_empty());
}

#[test]
fn default_slot_content_expands_in_component_namespace() {
    let mut doc = fixture();
    let mut fallback = Node::new(id("Card::fallback"), NodeProps::text("Nothing here"));
    fallback.source_component_id = Some(id("Card"));
    fallback.template_uid = Some(id("fallback"));
    doc.insert_node(fallback);
    let mut body = doc.node(id("Card::body")).unwrap().clone();
    if let NodeProps::Slot(slot) = &mut body.props {
        slot.default_content_id = Some(id("Card::fallback"));
    }
    doc.insert_node(body);
    let mut card = doc.node(id("card1")).unwrap().clone();
    if let NodeProps::Instance(props) = &mut card.props {
        props.slots.clear();
    }
    doc.insert_node(card);

    let scene = expand(id("f1"), &doc).unwrap();
    let node = scene.get_str("card1::Card::fallback").unwrap();
    assert_eq!(text_of(&node.props), "Nothing here");
    assert_eq!(node.origin.kind, OriginKind::ComponentChild);
    assert_eq!(node.patch_target_id, None);
}

#[test]
fn missing_slot_content_becomes_placeholder() {
    let mut doc = fixture();
    assign_card1_content(&mut doc, "no_such_content");

    let scene = expand(id("f1"), &doc).unwrap();
    let slot = scene.get_str("card1::Card::body").unwrap();
    assert_eq!(
        slot.placeholder,
        Some(Placeholder::EmptySlot {
            slot_name: "content".into()
        })
    );
    assert!(scene.slot_children(eid("card1")).is_empty());
    assert_eq!(
        scene.get_str("card1::Card::root").unwrap().child_ids.as_slice(),
        &[eid("card1::Card::title"), eid("card1::Card::body")]
    );
}

#[test]
fn component_in_its_own_slot_is_not_a_cycle() {
    let mut doc = fixture();
    let mut inner = Node::new(
        id("inner_card"),
        NodeProps::Instance(InstanceProps::new(id("Card"))),
    );
    inner.owner_instance_id = Some(id("card1"));
    doc.insert_node(inner);
    assign_card1_content(&mut doc, "inner_card");
    assert!(lint_document(&doc).is_empty());

    let scene = expand(id("f1"), &doc).unwrap();
    assert!(scene.errors().is_empty());

    let nested = scene.get_str("card1::slot(content)::inner_card").unwrap();
    assert_eq!(nested.origin.kind, OriginKind::InstanceRoot);
    assert_eq!(nested.patch_target_id, Some(id("inner_card")));
    // Injected instance roots still say where they came from.
    let slot = nested.origin.slot_origin.as_ref().unwrap();
    assert_eq!(slot.slot_name, "content");
    assert_eq!(slot.instance_id, eid("card1"));
    assert_eq!(
        scene.slot_children(eid("card1")),
        &[eid("card1::slot(content)::inner_card")]
    );

    let title = scene
        .get_str("card1::slot(content)::inner_card::Card::title")
        .unwrap();
    assert_eq!(text_of(&title.props), "Card");
    assert_eq!(
        title.origin.instance_path.as_slice(),
        &[eid("card1"), eid("card1::slot(content)::inner_card")]
    );
}

#[test]
fn slot_content_containing_its_instance_becomes_cycle_placeholder() {
    init_logger();
    let mut doc = fixture();
    let mut wrap = Node::new(id("wrap"), NodeProps::container());
    wrap.owner_instance_id = Some(id("card1"));
    wrap.child_ids.push(id("card1"));
    doc.insert_node(wrap);
    assign_card1_content(&mut doc, "wrap");

    let scene = expand(id("f1"), &doc).unwrap();
    let wrap = scene.get_str("card1::slot(content)::wrap").unwrap();
    assert_eq!(wrap.child_ids.as_slice(), &[eid("card1::slot(content)::card1")]);

    let errors = scene.errors();
    assert_eq!(errors.len(), 1);
    let (node, error) = errors[0];
    assert_eq!(node.id, eid("card1::slot(content)::card1"));
    assert_eq!(
        error,
        &ExpansionError::Cycle {
            component_id: id("Card")
        }
    );
    assert_eq!(node.patch_target_id, Some(id("card1")));
}

// ─── Editability ─────────────────────────────────────────────────────────

#[test]
fn patch_target_matches_origin_kind() {
    let scene = expand(id("f1"), &fixture()).unwrap();
    for node in scene.nodes.values() {
        match node.origin.kind {
            OriginKind::ComponentChild => assert_eq!(node.patch_target_id, None, "{}", node.id),
            OriginKind::FrameNode | OriginKind::InstanceRoot | OriginKind::SlotContent => {
                assert!(node.patch_target_id.is_some(), "{}", node.id)
            }
            _ => {}
        }
        assert_eq!(scene.patch_target[&node.id], node.patch_target_id);
    }
}

// ─── Failure modes ───────────────────────────────────────────────────────

#[test]
fn self_reference_becomes_cycle_placeholder() {
    init_logger();
    let mut doc = Document::new();
    component(&mut doc, "Loop", &["Loop"]);
    frame_with(&mut doc, "cyc_frame", &[("loop1", "Loop")]);

    let scene = expand(id("cyc_frame"), &doc).unwrap();
    assert_eq!(scene.get_str("loop1").unwrap().origin.kind, OriginKind::InstanceRoot);

    let inner = scene.get_str("loop1::Loop::inner0").unwrap();
    assert_eq!(inner.origin.kind, OriginKind::ErrorPlaceholder);
    assert_eq!(
        inner.error(),
        Some(&ExpansionError::Cycle {
            component_id: id("Loop")
        })
    );
    assert!(inner.child_ids.is_empty());
    assert_eq!(scene.errors().len(), 1);
}

#[test]
fn mutual_reference_becomes_cycle_placeholder() {
    let mut doc = Document::new();
    component(&mut doc, "Ping", &["Pong"]);
    component(&mut doc, "Pong", &["Ping"]);
    frame_with(&mut doc, "pp_frame", &[("ping1", "Ping")]);

    let scene = expand(id("pp_frame"), &doc).unwrap();
    let errors = scene.errors();
    assert_eq!(errors.len(), 1);
    let (node, error) = errors[0];
    assert_eq!(node.id, eid("ping1::Ping::inner0::Pong::inner0"));
    assert_eq!(error.component_id(), id("Ping"));
    assert_eq!(
        node.origin.instance_path.as_slice(),
        &[eid("ping1"), eid("ping1::Ping::inner0")]
    );

    let lint_rules: Vec<_> = lint_document(&doc)
        .into_iter()
        .filter(|d| d.rule == "component-cycle")
        .map(|d| d.node_id)
        .collect();
    assert_eq!(lint_rules, vec![id("Ping"), id("Pong")]);
}

#[test]
fn sibling_reuse_is_not_a_cycle() {
    let mut doc = Document::new();
    component(&mut doc, "Dot", &[]);
    component(&mut doc, "Pair", &["Dot", "Dot"]);
    frame_with(&mut doc, "pair_frame", &[("pair1", "Pair"), ("pair2", "Pair")]);

    let scene = expand(id("pair_frame"), &doc).unwrap();
    assert!(scene.errors().is_empty());
    for key in [
        "pair1::Pair::inner0::Dot::root",
        "pair1::Pair::inner1::Dot::root",
        "pair2::Pair::inner0::Dot::root",
    ] {
        assert!(scene.get_str(key).is_some(), "missing {key}");
    }
}

#[test]
fn missing_component_keeps_editable_placeholder() {
    let mut doc = Document::new();
    frame_with(&mut doc, "miss_frame", &[("ghost1", "Ghost")]);
    let mut ghost = doc.node(id("ghost1")).unwrap().clone();
    ghost.layout.width = Some(120.0);
    doc.insert_node(ghost);

    let scene = expand(id("miss_frame"), &doc).unwrap();
    let node = scene.get_str("ghost1").unwrap();
    assert_eq!(node.origin.kind, OriginKind::ErrorPlaceholder);
    assert_eq!(node.node_type, NodeType::Container);
    assert_eq!(node.patch_target_id, Some(id("ghost1")));
    assert_eq!(node.layout.width, Some(120.0));
    assert_eq!(
        node.error(),
        Some(&ExpansionError::MissingComponent {
            component_id: id("Ghost")
        })
    );
}

#[test]
fn missing_component_root_becomes_placeholder() {
    let mut doc = Document::new();
    component(&mut doc, "Hollow", &[]);
    doc.nodes.remove(&id("Hollow::root"));
    frame_with(&mut doc, "hollow_frame", &[("hollow1", "Hollow")]);

    let scene = expand(id("hollow_frame"), &doc).unwrap();
    assert!(matches!(
        scene.get_str("hollow1").unwrap().error(),
        Some(ExpansionError::MissingComponentRoot { .. })
    ));
}

#[test]
fn depth_limit_is_configurable() {
    let mut doc = Document::new();
    component(&mut doc, "L3", &[]);
    component(&mut doc, "L2", &["L3"]);
    component(&mut doc, "L1", &["L2"]);
    frame_with(&mut doc, "depth_frame", &[("deep1", "L1")]);

    assert!(expand(id("depth_frame"), &doc).unwrap().errors().is_empty());

    let config = ExpandConfig {
        max_instance_depth: 2,
        ..ExpandConfig::default()
    };
    let scene = expand_with(id("depth_frame"), &doc, &config).unwrap();
    let errors = scene.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0.id, eid("deep1::L1::inner0::L2::inner0"));
    assert!(matches!(errors[0].1, ExpansionError::DepthLimit { limit: 2, .. }));
}

// ─── Legacy overrides ────────────────────────────────────────────────────

#[test]
fn legacy_override_applies_after_params() {
    let mut doc = fixture();
    let mut btn = doc.node(id("btn2")).unwrap().clone();
    if let NodeProps::Instance(props) = &mut btn.props {
        props.overrides.insert(
            "Button::label".into(),
            serde_json::json!({"props": {"text": "Legacy"}, "style": {"opacity": 0.5}}),
        );
    }
    doc.insert_node(btn);

    let scene = expand(id("f1"), &doc).unwrap();
    let label = scene.get_str("btn2::Button::label").unwrap();
    assert_eq!(text_of(&label.props), "Legacy");
    assert_eq!(label.style.opacity, Some(0.5));

    let config = ExpandConfig {
        legacy_overrides: false,
        ..ExpandConfig::default()
    };
    let scene = expand_with(id("f1"), &doc, &config).unwrap();
    assert_eq!(text_of(&scene.get_str("btn2::Button::label").unwrap().props), "Submit");
}

// ─── Lint & serialization ────────────────────────────────────────────────

#[test]
fn fixture_is_lint_clean() {
    assert_eq!(lint_document(&fixture()), vec![]);
}

#[test]
fn scene_serializes_for_the_renderer() {
    let scene = expand(id("f1"), &fixture()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&scene.to_json().unwrap()).unwrap();
    let hello = &json["nodes"]["card1::slot(content)::txt_hello"];
    assert_eq!(hello["type"], "text");
    assert_eq!(hello["patchTargetId"], "txt_hello");
    assert_eq!(hello["origin"]["kind"], "slotContent");
    assert_eq!(hello["origin"]["slotOrigin"]["instanceId"], "card1");
    assert_eq!(json["patchTarget"]["btn1::Button::label"], serde_json::Value::Null);
}
