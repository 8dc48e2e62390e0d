use pretty_assertions::assert_eq;

use super::*;
use crate::model::{KmClass, KmClassKind, KmTypeAlias};

fn key_strings(keys: IndexKeys) -> Vec<String> {
    let mut v: Vec<_> = keys.iter().map(|k| k.as_str().to_string()).collect();
    v.sort_unstable();
    v
}

#[test]
fn test_lookups_index_keys_from_lookup_usages() {
    let cls = JvmClass::new("a/Caller").with_usages([
        JvmUsage::lookup("com/example", "topFn"),
        JvmUsage::lookup("com/example/Util", "helper"),
        JvmUsage::Class(ReferenceId::new("com/example/Foo")),
    ]);
    assert_eq!(
        key_strings(LookupsIndex.keys(&cls)),
        ["com/example.topFn", "com/example/Util.helper"],
    );
}

#[test]
fn test_typealiases_index_fq_keys() {
    let mut km = KmClass::new(KmClassKind::Class);
    km.type_aliases.push(KmTypeAlias::new("Handler", "kotlin/Function1"));
    let cls = JvmClass::new("com/example/Aliases").with_metadata(KotlinMeta::Class(km));
    assert_eq!(
        key_strings(TypealiasesIndex.keys(&cls)),
        ["com/example/Handler"],
    );

    let plain = JvmClass::new("com/example/Plain");
    assert!(TypealiasesIndex.keys(&plain).is_empty());
}

#[test]
fn test_kotlin_subclasses_index_filters() {
    let kotlin = JvmClass::new("s/Circle")
        .with_superclass("s/Shape")
        .with_interfaces(["s/Marker"])
        .with_metadata(KotlinMeta::Class(KmClass::new(KmClassKind::Class)));
    assert_eq!(
        key_strings(KotlinSubclassesIndex.keys(&kotlin)),
        ["s/Marker", "s/Shape"],
    );

    // The implicit roots never become keys.
    let direct_child_of_any = JvmClass::new("s/Top")
        .with_superclass("java/lang/Object")
        .with_metadata(KotlinMeta::Class(KmClass::new(KmClassKind::Class)));
    assert!(KotlinSubclassesIndex.keys(&direct_child_of_any).is_empty());

    // Non-Kotlin and local nodes contribute nothing.
    let java = JvmClass::new("s/JavaChild").with_superclass("s/Shape");
    assert!(KotlinSubclassesIndex.keys(&java).is_empty());

    let mut local_km = KmClass::new(KmClassKind::Class);
    local_km.is_local = true;
    let local = JvmClass::new("s/Fn$1")
        .with_superclass("s/Shape")
        .with_metadata(KotlinMeta::Class(local_km));
    assert!(KotlinSubclassesIndex.keys(&local).is_empty());
}

#[test]
fn test_subclasses_index_all_class_nodes() {
    let cls = JvmClass::new("a/B")
        .with_superclass("a/Base")
        .with_interfaces(["a/I"]);
    assert_eq!(key_strings(SubclassesIndex.keys(&cls)), ["a/Base", "a/I"]);

    let root_child = JvmClass::new("a/C");
    assert!(SubclassesIndex.keys(&root_child).is_empty());
}

#[test]
fn test_index_registration() {
    let graph = new_graph();
    for name in [
        LookupsIndex::NAME,
        TypealiasesIndex::NAME,
        KotlinSubclassesIndex::NAME,
        SubclassesIndex::NAME,
    ] {
        assert!(graph.index(name).is_some(), "missing index {name}");
    }
}
