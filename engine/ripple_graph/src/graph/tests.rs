use pretty_assertions::assert_eq;

use super::*;

/// Minimal node: an id, outgoing class references, and one derived key per
/// referenced "symbol" for the test index.
#[derive(Clone, Debug, PartialEq)]
struct TestNode {
    id: ReferenceId,
    refs: Vec<TestUsage>,
    symbols: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TestUsage(ReferenceId);

impl Usage for TestUsage {
    fn element_owner(&self) -> &ReferenceId {
        &self.0
    }
}

impl Node for TestNode {
    type Usage = TestUsage;

    fn reference_id(&self) -> &ReferenceId {
        &self.id
    }

    fn usages(&self) -> &[TestUsage] {
        &self.refs
    }
}

struct SymbolsIndex;

impl BackDependencyIndex<TestNode> for SymbolsIndex {
    fn name(&self) -> &'static str {
        "symbols"
    }

    fn keys(&self, node: &TestNode) -> SmallVec<[ReferenceId; 4]> {
        node.symbols.iter().map(|s| ReferenceId::new(*s)).collect()
    }
}

fn node(id: &str, refs: &[&str], symbols: &[&'static str]) -> TestNode {
    TestNode {
        id: ReferenceId::new(id),
        refs: refs.iter().map(|r| TestUsage(ReferenceId::new(*r))).collect(),
        symbols: symbols.to_vec(),
    }
}

fn graph() -> DependencyGraph<TestNode> {
    DependencyGraph::new(vec![Box::new(SymbolsIndex)])
}

fn delta_with(source: &str, nodes: Vec<TestNode>) -> Delta<TestNode> {
    let mut delta = Delta::new([NodeSource::new(source)], []);
    delta.associate(NodeSource::new(source), nodes);
    delta
}

fn ids<'a, T: std::fmt::Display + 'a>(iter: impl Iterator<Item = &'a T>) -> Vec<String> {
    let mut v: Vec<String> = iter.map(ToString::to_string).collect();
    v.sort_unstable();
    v
}

#[test]
fn test_integrate_stores_nodes_and_sources() {
    let mut g = graph();
    g.integrate(&delta_with("a.kt", vec![node("A", &["B"], &[])]));

    assert_eq!(g.nodes(&ReferenceId::new("A")).count(), 1);
    assert_eq!(
        ids(g.sources(&ReferenceId::new("A"))),
        ["a.kt"],
    );
    assert_eq!(g.nodes_of(&NodeSource::new("a.kt")).len(), 1);
    assert_eq!(ids(g.registered_nodes()), ["A"]);
}

#[test]
fn test_depending_nodes_reverse_edges() {
    let mut g = graph();
    g.integrate(&delta_with("a.kt", vec![node("A", &["C"], &[])]));
    g.integrate(&delta_with("b.kt", vec![node("B", &["C", "A"], &[])]));

    assert_eq!(ids(g.depending_nodes(&ReferenceId::new("C"))), ["A", "B"]);
    assert_eq!(ids(g.depending_nodes(&ReferenceId::new("A"))), ["B"]);
}

#[test]
fn test_recompile_replaces_nodes_and_edges() {
    let mut g = graph();
    g.integrate(&delta_with("a.kt", vec![node("A", &["C"], &[])]));
    // A recompiled: now references D instead of C.
    g.integrate(&delta_with("a.kt", vec![node("A", &["D"], &[])]));

    assert_eq!(g.depending_nodes(&ReferenceId::new("C")).count(), 0);
    assert_eq!(ids(g.depending_nodes(&ReferenceId::new("D"))), ["A"]);
    assert_eq!(g.nodes(&ReferenceId::new("A")).count(), 1);
}

#[test]
fn test_deleted_source_retracts_everything() {
    let mut g = graph();
    g.integrate(&delta_with("a.kt", vec![node("A", &["C"], &["sym"])]));

    let delta: Delta<TestNode> = Delta::new([], [NodeSource::new("a.kt")]);
    g.integrate(&delta);

    assert_eq!(g.nodes(&ReferenceId::new("A")).count(), 0);
    assert_eq!(g.registered_nodes().count(), 0);
    assert_eq!(g.depending_nodes(&ReferenceId::new("C")).count(), 0);
    let index = match g.index("symbols") {
        Some(view) => view,
        None => panic!("index must be registered"),
    };
    assert_eq!(index.dependents(&ReferenceId::new("sym")).count(), 0);
}

#[test]
fn test_named_index_tracks_derived_keys() {
    let mut g = graph();
    g.integrate(&delta_with("a.kt", vec![node("A", &[], &["x", "y"])]));
    g.integrate(&delta_with("b.kt", vec![node("B", &[], &["y"])]));

    let index = match g.index("symbols") {
        Some(view) => view,
        None => panic!("index must be registered"),
    };
    assert_eq!(ids(index.dependents(&ReferenceId::new("x"))), ["A"]);
    assert_eq!(ids(index.dependents(&ReferenceId::new("y"))), ["A", "B"]);
    assert!(g.index("missing").is_none());
}

#[test]
fn test_duplicate_definitions_refcount() {
    // The same id defined from two sources, both referencing C. Removing one
    // definition must keep the reverse edge alive.
    let mut g = graph();
    g.integrate(&delta_with("a.kt", vec![node("A", &["C"], &["s"])]));
    g.integrate(&delta_with("a2.kt", vec![node("A", &["C"], &["s"])]));

    assert_eq!(g.nodes(&ReferenceId::new("A")).count(), 2);
    assert_eq!(ids(g.sources(&ReferenceId::new("A"))), ["a.kt", "a2.kt"]);

    let delta: Delta<TestNode> = Delta::new([], [NodeSource::new("a2.kt")]);
    g.integrate(&delta);

    assert_eq!(ids(g.depending_nodes(&ReferenceId::new("C"))), ["A"]);
    let index = match g.index("symbols") {
        Some(view) => view,
        None => panic!("index must be registered"),
    };
    assert_eq!(ids(index.dependents(&ReferenceId::new("s"))), ["A"]);
}

#[test]
fn test_incremental_equals_rebuild() {
    // Index idempotence: a graph built through a sequence of integrations
    // matches a graph built from the final state in one step.
    let mut incremental = graph();
    incremental.integrate(&delta_with("a.kt", vec![node("A", &["B"], &["x"])]));
    incremental.integrate(&delta_with("b.kt", vec![node("B", &[], &["x", "y"])]));
    incremental.integrate(&delta_with("a.kt", vec![node("A", &["B", "C"], &["z"])]));
    let deleted: Delta<TestNode> = Delta::new([], [NodeSource::new("missing.kt")]);
    incremental.integrate(&deleted);

    let mut rebuilt = graph();
    rebuilt.integrate(&delta_with("a.kt", vec![node("A", &["B", "C"], &["z"])]));
    rebuilt.integrate(&delta_with("b.kt", vec![node("B", &[], &["x", "y"])]));

    for key in ["x", "y", "z"] {
        let key = ReferenceId::new(key);
        let left = match incremental.index("symbols") {
            Some(view) => ids(view.dependents(&key)),
            None => panic!("index must be registered"),
        };
        let right = match rebuilt.index("symbols") {
            Some(view) => ids(view.dependents(&key)),
            None => panic!("index must be registered"),
        };
        assert_eq!(left, right, "key {key}");
    }
    for id in ["A", "B", "C"] {
        let id = ReferenceId::new(id);
        assert_eq!(
            ids(incremental.depending_nodes(&id)),
            ids(rebuilt.depending_nodes(&id)),
        );
    }
}

#[test]
fn test_delta_queries() {
    let mut delta = Delta::new([NodeSource::new("a.kt")], [NodeSource::new("gone.kt")]);
    delta.associate(NodeSource::new("a.kt"), vec![node("A", &["B"], &[])]);
    delta.associate(NodeSource::new("c.kt"), vec![node("C", &[], &[])]);

    assert_eq!(delta.nodes(&ReferenceId::new("A")).count(), 1);
    assert_eq!(ids(delta.sources(&ReferenceId::new("C"))), ["c.kt"]);
    assert!(delta.base_sources().contains(&NodeSource::new("c.kt")));
    assert!(delta.deleted_sources().contains(&NodeSource::new("gone.kt")));
    assert_eq!(delta.all_nodes().count(), 2);
    assert!(!delta.is_source_only());
    assert!(Delta::<TestNode>::source_only([]).is_source_only());
}
