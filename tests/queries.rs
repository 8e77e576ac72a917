mod common;

use common::*;
use fastreflect_rs::{
    native::{MethodBuilder, TypeBuilder, TypeHandle, TypeTable, Value},
    AccessError, Predicate, TypeCache,
};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

#[test]
fn test_shadowed_field_flattened_lookup() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();
    let base = cache.resolve_type::<MyBaseType>().unwrap();

    let flattened = derived.flattened_fields_by_name("base_field");
    assert_eq!(flattened.len(), 2);
    assert_eq!(flattened[0].declaring_type(), TypeHandle::of::<MyDerivedType>());
    assert_eq!(flattened[1].declaring_type(), TypeHandle::of::<MyBaseType>());
    assert_ne!(flattened[0], flattened[1]);

    let own = derived.declared_field_by_name("base_field").unwrap();
    let inherited = base.declared_field_by_name("base_field").unwrap();
    assert!(Arc::ptr_eq(own, &flattened[0]));
    assert!(Arc::ptr_eq(inherited, &flattened[1]));

    let instance = MyDerivedType {
        base: MyBaseType {
            base_field: 1,
            ..Default::default()
        },
        base_field: 2,
        ..Default::default()
    };
    assert_eq!(own.read_as::<i32>(&instance).unwrap(), 2);
    assert_eq!(inherited.read_as::<i32>(&instance).unwrap(), 1);
}

#[test]
fn test_missing_names_are_empty() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();
    assert!(derived.declared_field_by_name("nope").is_none());
    assert!(derived.declared_methods_by_name("nope").is_empty());
    assert!(derived.flattened_fields_by_name("nope").is_empty());
    assert!(derived.flattened_methods_by_name("nope").is_empty());
    assert!(derived.declared_field_by_name("Label").is_none());
    assert_eq!(derived.flattened_fields_by_name("Label").len(), 1);
}

#[test]
fn test_overloads_are_distinct() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();
    let overloads = derived.declared_methods_by_name("ChildMethod");
    assert_eq!(overloads.len(), 2);
    assert_ne!(overloads[0], overloads[1]);

    let signatures: HashSet<Vec<TypeHandle>> = overloads
        .iter()
        .map(|m| m.parameter_types().to_vec())
        .collect();
    assert!(signatures.contains(&vec![]));
    assert!(signatures.contains(&vec![TypeHandle::of::<String>()]));

    let mut instance = MyDerivedType::default();
    let with_arg = overloads
        .iter()
        .find(|m| m.parameter_types().len() == 1)
        .unwrap();
    let result = with_arg
        .invoke(&mut instance, &[Box::new(String::from("four"))])
        .unwrap();
    assert_eq!(unbox::<i32>(result), 4);
    assert!(matches!(
        with_arg.invoke(&mut instance, &[]),
        Err(AccessError::ArgumentCount { expected: 1, actual: 0 })
    ));
}

#[test]
fn test_explicit_interface_methods() {
    let cache = fixture_cache();
    let base = cache.resolve_type::<MyBaseType>().unwrap();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();

    let qualified = "IExplicitInterface.MyExplicitMethod";
    let base_impl = &base.declared_methods_by_name(qualified)[0];
    let derived_impl = &derived.declared_methods_by_name(qualified)[0];
    assert_eq!(
        base_impl.qualified_parts(),
        Some(("IExplicitInterface", "MyExplicitMethod"))
    );
    assert_eq!(
        base_impl.explicit_interface(),
        Some(TypeHandle::of::<dyn IExplicitInterface>())
    );
    assert!(base.declared_methods_by_name("MyExplicitMethod").is_empty());

    let interface = derived.interface_of::<dyn IExplicitInterface>().unwrap();
    let through_interface = &interface.declared_methods_by_name("MyExplicitMethod")[0];
    assert!(through_interface.qualified_parts().is_none());

    let mut base_instance = MyBaseType::default();
    let mut derived_instance = MyDerivedType::default();

    through_interface.invoke(&mut base_instance, &[]).unwrap();
    assert_eq!(base_instance.explicit_calls, 1);

    through_interface.invoke(&mut derived_instance, &[]).unwrap();
    assert_eq!(derived_instance.explicit_calls, 1);
    assert_eq!(derived_instance.base.explicit_calls, 0);

    derived_impl.invoke(&mut derived_instance, &[]).unwrap();
    assert_eq!(derived_instance.explicit_calls, 2);
    assert_eq!(derived_instance.base.explicit_calls, 0);

    base_impl.invoke(&mut derived_instance, &[]).unwrap();
    assert_eq!(derived_instance.explicit_calls, 2);
    assert_eq!(derived_instance.base.explicit_calls, 1);
}

#[test]
fn test_virtual_dispatch() {
    let cache = fixture_cache();
    let base = cache.resolve_type::<MyBaseType>().unwrap();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();

    let flattened = derived.flattened_methods_by_name("BaseVirtualMethod");
    assert_eq!(flattened.len(), 1);
    assert_eq!(flattened[0].declaring_type(), TypeHandle::of::<MyBaseType>());
    assert!(flattened[0].is_virtual());

    let method = &base.declared_methods_by_name("BaseVirtualMethod")[0];
    let mut base_instance = MyBaseType::default();
    let mut derived_instance = MyDerivedType::default();
    assert_eq!(
        unbox::<String>(method.invoke(&mut base_instance, &[]).unwrap()),
        "base"
    );
    assert_eq!(
        unbox::<String>(method.invoke(&mut derived_instance, &[]).unwrap()),
        "derived"
    );

    let interface = derived.interface_of::<dyn IBaseInterface>().unwrap();
    let implicit = &interface.declared_methods_by_name("BaseInterfaceMethod")[0];
    derived_instance.base.base_field = 7;
    assert_eq!(
        unbox::<String>(implicit.invoke(&mut derived_instance, &[]).unwrap()),
        "base 7"
    );
}

#[test]
fn test_property_overrides_dispatch() {
    let cache = fixture_cache();
    let base = cache.resolve_type::<MyBaseType>().unwrap();
    let label = base.declared_field_by_name("Label").unwrap();

    let mut base_instance = MyBaseType::default();
    label.write_value(&mut base_instance, String::from("a")).unwrap();
    assert_eq!(label.read_as::<String>(&base_instance).unwrap(), "a");

    let mut derived_instance = MyDerivedType::default();
    label.write_value(&mut derived_instance, String::from("b")).unwrap();
    assert_eq!(derived_instance.base.label, "b");
    assert_eq!(
        label.read_as::<String>(&derived_instance).unwrap(),
        "derived b"
    );
}

#[test]
fn test_auto_property_and_constant_access() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();
    let score = derived.declared_field_by_name("Score").unwrap();
    let mut instance = MyDerivedType::default();
    score.write_value(&mut instance, 12i64).unwrap();
    assert_eq!(instance.score, 12);
    assert_eq!(score.read_as::<i64>(&instance).unwrap(), 12);
    assert!(matches!(
        score.write_value(&mut instance, 1i32),
        Err(AccessError::ValueType { .. })
    ));

    let accel = cache.resolve_type::<AccelerationType>().unwrap();
    let constant = accel.declared_field_by_name("Constant").unwrap();
    let mut value = AccelerationType::default();
    assert_eq!(constant.read_as::<i32>(&value).unwrap(), 42);
    assert!(matches!(
        constant.write_value(&mut value, 1i32),
        Err(AccessError::ReadOnly { .. })
    ));
}

#[test]
fn test_reading_wrong_instance_fails() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();
    let child = derived.declared_field_by_name("child_field").unwrap();
    assert!(matches!(
        child.read(&MyBaseType::default()),
        Err(AccessError::TargetMismatch { .. })
    ));
}

#[test]
fn test_predicate_cache_keyed_by_identity() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();
    let evaluations = Arc::new(AtomicUsize::new(0));

    let make = |counter: Arc<AtomicUsize>| {
        Predicate::fields(move |f| {
            counter.fetch_add(1, Ordering::SeqCst);
            f.is_field()
        })
    };
    let predicate = make(evaluations.clone());

    let first = derived.declared_fields_by_predicate(&predicate);
    let names: Vec<_> = first.iter().map(|f| f.name()).collect();
    assert_eq!(names, ["base_field", "child_field"]);
    let after_first = evaluations.load(Ordering::SeqCst);
    assert_eq!(after_first, 3);

    let second = derived.declared_fields_by_predicate(&predicate);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(evaluations.load(Ordering::SeqCst), after_first);

    let twin = make(evaluations.clone());
    let third = derived.declared_fields_by_predicate(&twin);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.len(), first.len());
    assert_eq!(evaluations.load(Ordering::SeqCst), after_first * 2);

    let stats = cache.stats().unwrap();
    assert_eq!(stats.predicate.hits, 1);
    assert_eq!(stats.predicate.misses, 2);
}

#[test]
fn test_flattened_predicates_walk_ancestors() {
    let cache = fixture_cache();
    let derived = cache.resolve_type::<MyDerivedType>().unwrap();

    let fields = Predicate::fields(|f| f.field_type() == TypeHandle::of::<i32>());
    let found = derived.flattened_fields_by_predicate(&fields);
    let owners: Vec<_> = found.iter().map(|f| f.declaring_type()).collect();
    assert_eq!(
        owners,
        [
            TypeHandle::of::<MyDerivedType>(),
            TypeHandle::of::<MyBaseType>()
        ]
    );
    assert!(Arc::ptr_eq(
        &found,
        &derived.flattened_fields_by_predicate(&fields)
    ));
    assert_eq!(derived.declared_fields_by_predicate(&fields).len(), 1);

    let returns_string = Predicate::methods(|m| m.return_type() == Some(TypeHandle::of::<String>()));
    let methods = derived.flattened_methods_by_predicate(&returns_string);
    let names: Vec<_> = methods.iter().map(|m| m.name()).collect();
    assert_eq!(names, ["BaseInterfaceMethod", "BaseVirtualMethod"]);
    assert!(derived.declared_methods_by_predicate(&returns_string).is_empty());

    // field predicates never match methods
    assert!(derived.flattened_methods_by_predicate(&fields).is_empty());
}

trait IGreet {}

#[derive(Clone, Default)]
struct Greeter {
    explicit_calls: u32,
}

/// Extends `Greeter` without implementing `IGreet` again.
#[derive(Clone, Default)]
struct LoudGreeter {
    base: Greeter,
    greet_calls: u32,
}

/// Extends `Greeter` and re-implements `IGreet` through its public `Greet`.
#[derive(Clone, Default)]
struct PoliteGreeter {
    base: Greeter,
    greet_calls: u32,
}

fn greeter_cache() -> TypeCache {
    let table = TypeTable::builder()
        .register(
            TypeBuilder::<dyn IGreet>::interface("IGreet").abstract_method("Greet", vec![], None),
        )
        .register(
            TypeBuilder::<Greeter>::class("Greeter")
                .implements::<dyn IGreet>()
                .method(MethodBuilder::explicit::<dyn IGreet>("Greet").body(
                    |g: &mut Greeter, _| {
                        g.explicit_calls += 1;
                        Ok(None)
                    },
                )),
        )
        .register(
            TypeBuilder::<LoudGreeter>::class("LoudGreeter")
                .extends(|l| &l.base, |l| &mut l.base)
                .method(MethodBuilder::new("Greet").body(|l: &mut LoudGreeter, _| {
                    l.greet_calls += 1;
                    Ok(None)
                })),
        )
        .register(
            TypeBuilder::<PoliteGreeter>::class("PoliteGreeter")
                .extends(|p| &p.base, |p| &mut p.base)
                .implements::<dyn IGreet>()
                .method(MethodBuilder::new("Greet").body(|p: &mut PoliteGreeter, _| {
                    p.greet_calls += 1;
                    Ok(None)
                })),
        )
        .build()
        .unwrap();
    TypeCache::new(Arc::new(table))
}

#[test]
fn test_interface_dispatch_ignores_unrelated_same_name_method() {
    let cache = greeter_cache();
    let interface = cache.resolve_type::<dyn IGreet>().unwrap();
    let greet = &interface.declared_methods_by_name("Greet")[0];

    let mut loud = LoudGreeter::default();
    greet.invoke(&mut loud, &[]).unwrap();
    assert_eq!(loud.base.explicit_calls, 1);
    assert_eq!(loud.greet_calls, 0);

    let mut polite = PoliteGreeter::default();
    greet.invoke(&mut polite, &[]).unwrap();
    assert_eq!(polite.greet_calls, 1);
    assert_eq!(polite.base.explicit_calls, 0);
}

#[derive(Clone, Default)]
struct SlotA {
    log: Vec<&'static str>,
}

#[derive(Clone, Default)]
struct SlotB {
    a: SlotA,
}

#[derive(Clone, Default)]
struct SlotC {
    b: SlotB,
}

#[test]
fn test_new_virtual_starts_a_new_slot() {
    let table = TypeTable::builder()
        .register(
            TypeBuilder::<SlotA>::class("SlotA").method(
                MethodBuilder::new("M")
                    .overridable()
                    .body(|a: &mut SlotA, _| {
                        a.log.push("A");
                        Ok(None)
                    }),
            ),
        )
        .register(
            TypeBuilder::<SlotB>::class("SlotB")
                .extends(|b| &b.a, |b| &mut b.a)
                .method(
                    MethodBuilder::new("M")
                        .overridable()
                        .body(|b: &mut SlotB, _| {
                            b.a.log.push("B");
                            Ok(None)
                        }),
                ),
        )
        .register(
            TypeBuilder::<SlotC>::class("SlotC")
                .extends(|c| &c.b, |c| &mut c.b)
                .method(MethodBuilder::new("M").overrides().body(|c: &mut SlotC, _| {
                    c.b.a.log.push("C");
                    Ok(None)
                })),
        )
        .build()
        .unwrap();
    let cache = TypeCache::new(Arc::new(table));
    let a_m = cache.resolve_type::<SlotA>().unwrap().declared_methods_by_name("M")[0].clone();
    let b_m = cache.resolve_type::<SlotB>().unwrap().declared_methods_by_name("M")[0].clone();
    assert!(cache
        .resolve_type::<SlotC>()
        .unwrap()
        .declared_methods_by_name("M")
        .is_empty());

    let no_args: [Value; 0] = [];
    let mut c = SlotC::default();
    a_m.invoke(&mut c, &no_args).unwrap();
    assert_eq!(c.b.a.log, ["A"]);
    b_m.invoke(&mut c, &no_args).unwrap();
    assert_eq!(c.b.a.log, ["A", "C"]);

    let mut b = SlotB::default();
    a_m.invoke(&mut b, &no_args).unwrap();
    b_m.invoke(&mut b, &no_args).unwrap();
    assert_eq!(b.a.log, ["A", "B"]);
}
