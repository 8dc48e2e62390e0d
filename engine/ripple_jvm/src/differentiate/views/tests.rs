use pretty_assertions::assert_eq;

use super::*;
use crate::index::new_graph;
use crate::model::{JvmFlags, KmClass, KmClassKind};

fn put(graph: &mut DependencyGraph<JvmClass>, source: &str, nodes: Vec<JvmClass>) {
    let mut delta = Delta::new([NodeSource::new(source)], []);
    delta.associate(NodeSource::new(source), nodes);
    graph.integrate(&delta);
}

fn id(name: &str) -> ReferenceId {
    ReferenceId::new(name)
}

fn sorted(set: impl IntoIterator<Item = ReferenceId>) -> Vec<String> {
    let mut v: Vec<_> = set.into_iter().map(|r| r.as_str().to_string()).collect();
    v.sort_unstable();
    v
}

fn hierarchy_graph() -> DependencyGraph<JvmClass> {
    let mut graph = new_graph();
    put(&mut graph, "base.kt", vec![JvmClass::new("a/Base")]);
    put(
        &mut graph,
        "mid.kt",
        vec![JvmClass::new("a/Mid").with_superclass("a/Base")],
    );
    put(
        &mut graph,
        "leaf.kt",
        vec![JvmClass::new("a/Leaf").with_superclass("a/Mid")],
    );
    graph
}

#[test]
fn test_present_nodes_and_sources() {
    let graph = hierarchy_graph();
    let view = Utils::present(&graph);
    assert_eq!(view.nodes(&id("a/Mid")).len(), 1);
    assert_eq!(view.node_sources(&id("a/Mid")), [NodeSource::new("mid.kt")]);
    assert!(view.node(&id("a/Missing")).is_none());
}

#[test]
fn test_future_masks_recompiled_sources() {
    let graph = hierarchy_graph();
    // Mid recompiled: now extends Object directly.
    let mut delta = Delta::new([NodeSource::new("mid.kt")], []);
    delta.associate(NodeSource::new("mid.kt"), vec![JvmClass::new("a/Mid")]);

    let present = Utils::present(&graph);
    let future = Utils::future(&graph, &delta);

    assert!(present.is_inheritor_of(&id("a/Mid"), &id("a/Base")));
    assert!(!future.is_inheritor_of(&id("a/Mid"), &id("a/Base")));

    assert_eq!(sorted(present.direct_subclasses(&id("a/Base"))), ["a/Mid"]);
    assert!(future.direct_subclasses(&id("a/Base")).is_empty());
}

#[test]
fn test_future_sees_new_nodes() {
    let graph = hierarchy_graph();
    let mut delta = Delta::new([NodeSource::new("extra.kt")], []);
    delta.associate(
        NodeSource::new("extra.kt"),
        vec![JvmClass::new("a/Extra").with_superclass("a/Base")],
    );
    let future = Utils::future(&graph, &delta);

    assert_eq!(
        sorted(future.direct_subclasses(&id("a/Base"))),
        ["a/Extra", "a/Mid"],
    );
    assert_eq!(future.nodes(&id("a/Extra")).len(), 1);
}

#[test]
fn test_future_hides_deleted_sources() {
    let graph = hierarchy_graph();
    let delta = Delta::new([], [NodeSource::new("leaf.kt")]);
    let future = Utils::future(&graph, &delta);
    assert!(future.nodes(&id("a/Leaf")).is_empty());
    assert!(future.direct_subclasses(&id("a/Mid")).is_empty());
}

#[test]
fn test_subclass_closure_and_cache() {
    let graph = hierarchy_graph();
    let view = Utils::present(&graph);
    let mut cache = SubclassCache::default();

    assert_eq!(
        sorted(view.all_subclasses(&id("a/Base"), &mut cache)),
        ["a/Leaf", "a/Mid"],
    );
    // Cached result is reused verbatim.
    assert_eq!(
        sorted(view.all_subclasses(&id("a/Base"), &mut cache)),
        ["a/Leaf", "a/Mid"],
    );
    assert_eq!(
        sorted(view.with_all_subclasses(&id("a/Mid"), &mut cache)),
        ["a/Leaf", "a/Mid"],
    );
}

#[test]
fn test_supertype_closure_skips_dangling() {
    let mut graph = new_graph();
    put(
        &mut graph,
        "c.kt",
        vec![JvmClass::new("a/C")
            .with_superclass("a/B")
            .with_interfaces(["lib/External"])],
    );
    let view = Utils::present(&graph);
    // a/B and lib/External have no stored nodes; traversal just stops there.
    assert_eq!(
        sorted(view.all_supertypes(&id("a/C"))),
        ["a/B", "java/lang/Object", "lib/External"],
    );
}

#[test]
fn test_collect_subclasses_without_method_stops_at_override() {
    let mut graph = new_graph();
    let probe = JvmMethod::new("f", ["I"], "V", JvmFlags::PUBLIC);
    put(
        &mut graph,
        "base.kt",
        vec![JvmClass::new("a/Base").with_methods([probe.clone()])],
    );
    put(
        &mut graph,
        "mid.kt",
        vec![JvmClass::new("a/Mid")
            .with_superclass("a/Base")
            .with_methods([probe.clone()])],
    );
    put(
        &mut graph,
        "leaf.kt",
        vec![JvmClass::new("a/Leaf").with_superclass("a/Mid")],
    );
    put(
        &mut graph,
        "other.kt",
        vec![JvmClass::new("a/Other").with_superclass("a/Base")],
    );

    let view = Utils::present(&graph);
    // Mid overrides: neither Mid nor anything below it is collected.
    assert_eq!(
        sorted(view.collect_subclasses_without_method(&id("a/Base"), &probe)),
        ["a/Other"],
    );
}

#[test]
fn test_collect_subclasses_without_field() {
    let mut graph = new_graph();
    put(
        &mut graph,
        "base.kt",
        vec![JvmClass::new("a/Base")
            .with_fields([crate::model::JvmField::new("X", "I", JvmFlags::PUBLIC)])],
    );
    put(
        &mut graph,
        "hide.kt",
        vec![JvmClass::new("a/Hide")
            .with_superclass("a/Base")
            .with_fields([crate::model::JvmField::new("X", "I", JvmFlags::PUBLIC)])],
    );
    put(
        &mut graph,
        "open.kt",
        vec![JvmClass::new("a/Open").with_superclass("a/Base")],
    );

    let view = Utils::present(&graph);
    assert_eq!(
        sorted(view.collect_subclasses_without_field(&id("a/Base"), "X")),
        ["a/Open"],
    );
}

#[test]
fn test_lambda_target_detection() {
    let mut graph = new_graph();
    let run = JvmMethod::new(
        "run",
        Vec::<String>::new(),
        "V",
        JvmFlags::PUBLIC | JvmFlags::ABSTRACT,
    );
    put(
        &mut graph,
        "sam.kt",
        vec![JvmClass::new("a/Sam")
            .with_flags(JvmFlags::PUBLIC | JvmFlags::INTERFACE)
            .with_methods([run.clone()])],
    );
    let two = JvmMethod::new(
        "other",
        Vec::<String>::new(),
        "V",
        JvmFlags::PUBLIC | JvmFlags::ABSTRACT,
    );
    put(
        &mut graph,
        "multi.kt",
        vec![JvmClass::new("a/Multi")
            .with_flags(JvmFlags::PUBLIC | JvmFlags::INTERFACE)
            .with_methods([run, two])],
    );
    put(&mut graph, "plain.kt", vec![JvmClass::new("a/Plain")]);

    let view = Utils::present(&graph);
    assert!(view.is_lambda_target(&id("a/Sam")));
    assert!(!view.is_lambda_target(&id("a/Multi")));
    assert!(!view.is_lambda_target(&id("a/Plain")));
    assert!(!view.is_lambda_target(&id("a/Missing")));
}

#[test]
fn test_is_kotlin() {
    let mut graph = new_graph();
    put(
        &mut graph,
        "k.kt",
        vec![JvmClass::new("a/K")
            .with_metadata(crate::model::KotlinMeta::Class(KmClass::new(KmClassKind::Class)))],
    );
    put(&mut graph, "j.java", vec![JvmClass::new("a/J")]);

    let view = Utils::present(&graph);
    assert!(view.is_kotlin(&id("a/K")));
    assert!(!view.is_kotlin(&id("a/J")));
}
