use pretty_assertions::assert_eq;

use super::*;
use crate::model::flags::JvmFlags;
use crate::model::kotlin::{KmClassKind, KmValueParameter, KmVisibility};
use crate::model::member::ConstValue;

#[test]
fn test_method_diff_keyed_by_name_and_args() {
    let past = [
        JvmMethod::new("f", ["I"], "V", JvmFlags::PUBLIC),
        JvmMethod::new("g", Vec::<String>::new(), "V", JvmFlags::PUBLIC),
    ];
    let now = [
        JvmMethod::new("f", ["I"], "I", JvmFlags::PUBLIC),
        JvmMethod::new("f", ["J"], "V", JvmFlags::PUBLIC),
    ];
    let spec = deep_diff(&past, &now);

    assert_eq!(spec.added().len(), 1);
    assert_eq!(spec.added()[0].arg_types, ["J"]);
    assert_eq!(spec.removed().len(), 1);
    assert_eq!(spec.removed()[0].name, "g");
    assert_eq!(spec.changed().len(), 1);
    assert!(spec.changed()[0].diff.return_type_changed());
}

#[test]
fn test_method_access_restriction() {
    let past = JvmMethod::new("f", ["I"], "V", JvmFlags::PUBLIC);
    let now = JvmMethod::new("f", ["I"], "V", JvmFlags::empty());
    let diff = past.diff(&now);
    assert!(diff.access_restricted());
    assert!(diff.became_package_local());
    assert!(!diff.access_expanded());
}

#[test]
fn test_field_constant_value_change() {
    let flags = JvmFlags::PUBLIC | JvmFlags::STATIC | JvmFlags::FINAL;
    let past = JvmField::new("X", "I", flags).with_value(ConstValue::Int(1));
    let now = JvmField::new("X", "I", flags).with_value(ConstValue::Int(2));
    let diff = past.diff(&now);
    assert!(diff.value_changed());
    assert!(!diff.type_changed());
    assert!(!diff.unchanged());
}

#[test]
fn test_function_default_parameter_changes() {
    let mut past = KmFunction::new("f");
    past.value_parameters.push(KmValueParameter::new("x"));
    let mut now = past.clone();
    assert!(past.diff(&now).unchanged());

    now.value_parameters[0].has_default = true;
    let diff = past.diff(&now);
    assert!(diff.has_default_declaration_changes());
}

#[test]
fn test_function_nullability_predicates() {
    let mut past = KmFunction::new("f");
    past.value_parameters.push(KmValueParameter {
        name: "x".into(),
        has_default: false,
        is_nullable: true,
    });
    let mut now = past.clone();
    now.value_parameters[0].is_nullable = false;
    now.returns_nullable = true;

    let diff = past.diff(&now);
    assert!(diff.args_became_not_null());
    assert!(diff.became_nullable());
}

#[test]
fn test_inline_body_change() {
    let mut past = KmFunction::new("f");
    past.is_inline = true;
    past.body_fingerprint = Some(1);
    let mut now = past.clone();
    now.body_fingerprint = Some(2);

    let diff = past.diff(&now);
    assert!(diff.body_changed());
    assert!(!diff.inline_changed());
}

#[test]
fn test_property_accessor_removal() {
    let mut past = KmProperty::new("value");
    past.setter_name = Some("setValue".into());
    let mut now = past.clone();
    now.getter_name = None;

    let diff = past.diff(&now);
    assert_eq!(diff.getter_removed(), Some("getValue"));
    assert_eq!(diff.setter_removed(), None);
}

#[test]
fn test_property_visibility_widening() {
    let mut past = KmProperty::new("p");
    past.visibility = KmVisibility::Internal;
    let mut now = past.clone();
    now.visibility = KmVisibility::Public;
    assert!(past.diff(&now).access_expanded());
}

#[test]
fn test_metadata_container_flip() {
    let class = KotlinMeta::Class(KmClass::new(KmClassKind::Class));
    let facade = KotlinMeta::FileFacade(KmFileFacade::default());
    assert!(matches!(
        KotlinMetaDiff::of(&class, &facade),
        KotlinMetaDiff::ContainerChanged
    ));
    assert!(KotlinMetaDiff::of(&KotlinMeta::None, &KotlinMeta::None).unchanged());
}

#[test]
fn test_sealed_subclass_list_diff() {
    let mut past_km = KmClass::new(KmClassKind::Class);
    past_km.is_sealed = true;
    past_km.sealed_subclasses = vec![ReferenceId::new("s/Circle"), ReferenceId::new("s/Square")];
    let mut now_km = past_km.clone();
    now_km.sealed_subclasses.push(ReferenceId::new("s/Triangle"));

    let diff = KotlinMetaDiff::of(
        &KotlinMeta::Class(past_km),
        &KotlinMeta::Class(now_km),
    );
    match diff {
        KotlinMetaDiff::Class(km) => {
            assert_eq!(km.sealed_subclasses.added(), &[ReferenceId::new("s/Triangle")]);
            assert!(!km.sealed_changed);
        }
        other => panic!("expected class diff, got {other:?}"),
    }
}

#[test]
fn test_class_diff_hierarchy() {
    let past = JvmClass::new("a/B")
        .with_superclass("a/Base")
        .with_interfaces(["a/I"]);
    let now = past.clone().with_superclass("a/Other");
    let diff = past.diff(&now);
    assert!(diff.superclass_changed);
    assert!(diff.hierarchy_narrowed());
    assert!(!diff.unchanged());

    let dropped = past.clone().with_interfaces(Vec::<&str>::new());
    let diff = past.diff(&dropped);
    assert!(!diff.superclass_changed);
    assert!(diff.hierarchy_narrowed());
}

#[test]
fn test_class_diff_identical_is_unchanged() {
    let cls = JvmClass::new("a/B")
        .with_methods([JvmMethod::new("f", ["I"], "V", JvmFlags::PUBLIC)]);
    assert!(cls.diff(&cls.clone()).unchanged());
}
