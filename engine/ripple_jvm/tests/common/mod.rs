//! Shared fixtures: a tiny project model for driving whole rounds.
#![allow(dead_code)]

use ripple_graph::{Delta, DependencyGraph, NodeSource, ReferenceId};
use ripple_jvm::differentiate::{differentiate, Affected, DifferentiateContext};
use ripple_jvm::index::new_graph;
use ripple_jvm::model::{JvmClass, KmClass, KmClassKind, KotlinMeta};
use ripple_jvm::strategy::default_strategies;

/// Log the engine's decision trail while debugging a failing test:
/// `RIPPLE_LOG=debug cargo test`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("RIPPLE_LOG"))
        .with_test_writer()
        .try_init();
}

/// Store `nodes` under `source`, committing immediately.
pub fn put(graph: &mut DependencyGraph<JvmClass>, source: &str, nodes: Vec<JvmClass>) {
    let mut delta = Delta::new([NodeSource::new(source)], []);
    delta.associate(NodeSource::new(source), nodes);
    graph.integrate(&delta);
}

/// Build a graph from (source, nodes) pairs.
pub fn graph_of(entries: Vec<(&str, Vec<JvmClass>)>) -> DependencyGraph<JvmClass> {
    let mut graph = new_graph();
    for (source, nodes) in entries {
        put(&mut graph, source, nodes);
    }
    graph
}

/// One recompilation round: `source` was recompiled and its nodes went from
/// `before` to `after`. Returns the engine's affected set.
pub fn run_round(
    graph: &DependencyGraph<JvmClass>,
    source: &str,
    before: Vec<JvmClass>,
    after: Vec<JvmClass>,
) -> Affected {
    let mut delta = Delta::new([NodeSource::new(source)], []);
    delta.associate(NodeSource::new(source), after.clone());
    let mut cx = DifferentiateContext::new(graph, &delta);
    differentiate(&mut cx, &before, &after, &[], &default_strategies())
        .unwrap_or_else(|err| panic!("differentiate failed: {err}"));
    cx.into_affected()
}

/// A deletion round: `source` disappeared along with its `before` nodes.
pub fn run_deletion(
    graph: &DependencyGraph<JvmClass>,
    source: &str,
    before: Vec<JvmClass>,
) -> Affected {
    let delta = Delta::new([], [NodeSource::new(source)]);
    let mut cx = DifferentiateContext::new(graph, &delta);
    differentiate(&mut cx, &before, &[], &[], &default_strategies())
        .unwrap_or_else(|err| panic!("differentiate failed: {err}"));
    cx.into_affected()
}

/// Affected source paths, sorted.
pub fn paths(affected: &Affected) -> Vec<String> {
    let mut v: Vec<_> = affected
        .sources
        .iter()
        .map(|s| s.path().to_string())
        .collect();
    v.sort_unstable();
    v
}

/// A Kotlin class node extending `superclass`.
pub fn kotlin_class(name: &str, superclass: &str) -> JvmClass {
    JvmClass::new(name)
        .with_superclass(superclass)
        .with_metadata(KotlinMeta::Class(KmClass::new(KmClassKind::Class)))
}

/// A sealed Kotlin class node listing `subclasses` in its metadata.
pub fn sealed_class(name: &str, subclasses: &[&str]) -> JvmClass {
    let mut km = KmClass::new(KmClassKind::Class);
    km.is_sealed = true;
    km.sealed_subclasses = subclasses.iter().map(|s| ReferenceId::new(*s)).collect();
    JvmClass::new(name).with_metadata(KotlinMeta::Class(km))
}
