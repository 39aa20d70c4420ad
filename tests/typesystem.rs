//! Integration tests for descriptor navigation and the type registry.
//!
//! Covers the hierarchy walk, interface DAG traversal, generic slot resolution and chaining,
//! array component handling, and constructor-bypassing allocation.

use std::collections::HashMap;

use typescope::prelude::*;

/// Abstract capability anchor. Interfaces register through a marker type and cannot be
/// instantiated.
struct Shape;

impl Reflected for Shape {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Shape>(|| TypeBuilder::<Shape>::interface("Shape").build())
    }
}

#[derive(Default, Clone)]
struct Entity {
    id: u64,
}

impl Reflected for Entity {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Entity>(|| {
            TypeBuilder::<Entity>::new("Entity")
                .allocatable()
                .field("id", |e: &Entity| &e.id, |e: &mut Entity| &mut e.id)
                .build()
        })
    }
}

#[derive(Default, Clone)]
struct Circle {
    radius: f64,
}

impl Reflected for Circle {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Circle>(|| {
            TypeBuilder::<Circle>::new("Circle")
                .extends::<Entity>()
                .implements::<Shape>()
                .allocatable()
                .field("radius", |c: &Circle| &c.radius, |c: &mut Circle| {
                    &mut c.radius
                })
                .constructor(|radius: f64| Circle { radius })
                .build()
        })
    }
}

#[derive(Default, Clone, PartialEq, Debug)]
struct Point {
    x: i32,
    y: i32,
}

impl Reflected for Point {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Point>(|| {
            TypeBuilder::<Point>::new("Point")
                .allocatable()
                .field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x)
                .field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)
                .constructor(|x: i32, y: i32| Point { x, y })
                .build()
        })
    }
}

#[test]
fn super_type_of_registered_type_defaults_to_root() {
    let entity = Entity::type_info();
    let root = TypeRegistry::global().root();

    assert_eq!(entity.super_type(), Some(root.clone()));
    assert!(root.super_type().is_none());
}

#[test]
fn super_type_walk_is_finite_and_ends_at_root() {
    let circle = Circle::type_info();
    let chain: Vec<TypeInfo> = circle.super_types().collect();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], Entity::type_info());
    assert_eq!(chain[1], TypeRegistry::global().root());
}

#[test]
fn super_type_at_zero_equals_super_type() {
    let circle = Circle::type_info();
    assert_eq!(circle.super_type_at(0), circle.super_type());
    assert_eq!(circle.super_type_at(1), Some(TypeRegistry::global().root()));
    assert!(circle.super_type_at(2).is_none());
}

#[test]
fn super_types_is_restartable() {
    let circle = Circle::type_info();
    let first: Vec<TypeInfo> = circle.super_types().collect();
    let second: Vec<TypeInfo> = circle.super_types().collect();
    assert_eq!(first, second);
}

#[test]
fn sub_types_is_breadth_first_over_the_dag() {
    let circle = Circle::type_info();
    let all: Vec<TypeInfo> = circle.sub_types().collect();

    assert_eq!(
        all,
        vec![
            Circle::type_info(),
            Entity::type_info(),
            Shape::type_info(),
            TypeRegistry::global().root(),
        ]
    );
}

#[test]
fn sub_types_of_interface_terminates() {
    let shape = Shape::type_info();
    let all: Vec<TypeInfo> = shape.sub_types().collect();
    assert_eq!(all, vec![Shape::type_info(), TypeRegistry::global().root()]);
}

#[test]
fn matches_is_covariant() {
    let shape = Shape::type_info();
    let entity = Entity::type_info();
    let circle = Circle::type_info();

    assert!(shape.matches(&circle));
    assert!(entity.matches(&circle));
    assert!(circle.matches(&circle));
    assert!(!circle.matches(&entity));
    assert!(!shape.matches(&entity));

    let value = Circle { radius: 1.0 };
    assert!(shape.matches_value(&value));
}

#[test]
fn generic_slots_resolve_and_chain() {
    let map = TypeInfo::of::<HashMap<String, Vec<i32>>>();

    let keys = map.generic_type(0).expect("key slot resolves");
    assert_eq!(keys, TypeInfo::of::<String>());

    let values = map.generic_type(1).expect("value slot resolves");
    assert_eq!(values, TypeInfo::of::<Vec<i32>>());
    assert_eq!(values.generic_type(0), Some(TypeInfo::of::<i32>()));
}

#[test]
fn generic_slot_out_of_range_is_absent() {
    let map = TypeInfo::of::<HashMap<String, i32>>();
    assert!(map.generic_type(2).is_none());
}

#[test]
fn erased_or_missing_generics_are_an_empty_sequence() {
    assert_eq!(TypeInfo::of::<Entity>().generic_types().count(), 0);
    assert_eq!(TypeInfo::of::<i32>().generic_types().count(), 0);
}

#[test]
fn component_type_present_exactly_for_arrays() {
    let vec = TypeInfo::of::<Vec<f32>>();
    assert!(vec.is_array());
    assert_eq!(vec.component_type(), Some(TypeInfo::of::<f32>()));

    let fixed = TypeInfo::of::<[u8; 16]>();
    assert!(fixed.is_array());
    assert_eq!(fixed.component_type(), Some(TypeInfo::of::<u8>()));

    let plain = TypeInfo::of::<Circle>();
    assert!(!plain.is_array());
    assert!(plain.component_type().is_none());
}

#[test]
fn display_renders_arrays_with_brackets() {
    assert_eq!(TypeInfo::of::<Vec<i32>>().to_string(), "i32[]");
    assert_eq!(TypeInfo::of::<Vec<Vec<i32>>>().to_string(), "i32[][]");
    assert_eq!(TypeInfo::of::<Circle>().to_string(), "Circle");
}

#[test]
fn allocate_bypasses_constructors() {
    let point = Point::type_info().allocate().expect("Point allocates");
    let point = point.downcast::<Point>().expect("allocation has the right type");

    // No constructor ran: both fields hold their zero values.
    assert_eq!(point, Point { x: 0, y: 0 });
}

#[test]
fn allocate_fails_for_interfaces() {
    let err = Shape::type_info().allocate().unwrap_err();
    match err {
        Error::Allocation { type_name, .. } => assert_eq!(type_name, "Shape"),
        other => panic!("expected allocation error, got {other}"),
    }
}

#[test]
fn descriptors_are_structurally_equal_across_call_sites() {
    let here = TypeInfo::of::<HashMap<String, Vec<i32>>>();
    let there = TypeInfo::of_value(&HashMap::<String, Vec<i32>>::new());
    assert_eq!(here, there);
    assert_eq!(here.token(), there.token());
}

#[test]
fn from_any_sees_registered_types_only() {
    let circle = Circle { radius: 2.0 };
    let erased: &dyn std::any::Any = &circle;
    assert_eq!(TypeInfo::from_any(erased), Some(Circle::type_info()));

    struct Hidden;
    let hidden = Hidden;
    assert!(TypeInfo::from_any(&hidden).is_none());
}

#[test]
fn registry_indices_agree() {
    let circle = Circle::type_info();
    let registry = TypeRegistry::global();

    assert_eq!(registry.get(circle.token()), Some(circle.clone()));
    assert_eq!(registry.get_by_id(circle.raw_id()), Some(circle.clone()));
    assert!(registry.get_by_name("Circle").contains(&circle));
    assert!(registry.len() >= 4);
}

#[test]
fn member_descriptors_are_shared_through_the_type() {
    let circle = Circle::type_info();
    assert_eq!(circle.fields().len(), 1);
    assert_eq!(circle.constructors().len(), 1);

    let field = &circle.fields()[0];
    assert_eq!(field.name(), "radius");
    assert_eq!(field.field_type(), TypeInfo::of::<f64>());
    assert_eq!(field.declaring_type(), Some(circle.clone()));
}
