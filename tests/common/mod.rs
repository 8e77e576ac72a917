#![allow(dead_code)]

use fastreflect_rs::{
    native::{argument, MethodBuilder, PropertyBuilder, TypeBuilder, TypeHandle, TypeTable, Value},
    AcceleratorRegistry, CacheConfig, ProviderBundle, TypeCache,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub trait IBaseInterface {}
pub trait IDerivedInterface: IBaseInterface {}
pub trait IExplicitInterface {}
pub trait ICycleA {}
pub trait ICycleB {}

#[derive(Clone, Debug, Default)]
pub struct MyBaseType {
    pub base_field: i32,
    pub label: String,
    pub explicit_calls: u32,
}

#[derive(Clone, Debug, Default)]
pub struct MyDerivedType {
    pub base: MyBaseType,
    /// Shadows `MyBaseType::base_field`.
    pub base_field: i32,
    pub child_field: String,
    pub score: i64,
    pub explicit_calls: u32,
}

#[derive(Clone, Debug, Default)]
pub struct AccelerationType {
    pub field: i32,
}

fn ret<T: 'static>(value: T) -> Result<Option<Value>, fastreflect_rs::AccessError> {
    Ok(Some(Box::new(value)))
}

pub fn fixture_table() -> Arc<TypeTable> {
    let table = TypeTable::builder()
        .register(
            TypeBuilder::<dyn IBaseInterface>::interface("IBaseInterface").abstract_method(
                "BaseInterfaceMethod",
                vec![],
                Some(TypeHandle::of::<String>()),
            ),
        )
        .register(
            TypeBuilder::<dyn IDerivedInterface>::interface("IDerivedInterface")
                .implements::<dyn IBaseInterface>(),
        )
        .register(
            TypeBuilder::<dyn IExplicitInterface>::interface("IExplicitInterface")
                .abstract_method("MyExplicitMethod", vec![], None),
        )
        .register(TypeBuilder::<dyn ICycleA>::interface("ICycleA").implements::<dyn ICycleB>())
        .register(TypeBuilder::<dyn ICycleB>::interface("ICycleB").implements::<dyn ICycleA>())
        .register(
            TypeBuilder::<MyBaseType>::class("MyBaseType")
                .implements::<dyn IBaseInterface>()
                .implements::<dyn IExplicitInterface>()
                .field("base_field", |b| &b.base_field, |b| &mut b.base_field)
                .attribute("Serialized")
                .property(
                    PropertyBuilder::new("Label")
                        .getter(|b: &MyBaseType| b.label.clone())
                        .setter(|b: &mut MyBaseType, v: String| b.label = v),
                )
                .method(
                    MethodBuilder::new("BaseInterfaceMethod")
                        .returns::<String>()
                        .overridable()
                        .body(|b: &mut MyBaseType, _| ret(format!("base {}", b.base_field))),
                )
                .method(
                    MethodBuilder::new("BaseVirtualMethod")
                        .returns::<String>()
                        .overridable()
                        .body(|_: &mut MyBaseType, _| ret(String::from("base"))),
                )
                .method(
                    MethodBuilder::explicit::<dyn IExplicitInterface>("MyExplicitMethod").body(
                        |b: &mut MyBaseType, _| {
                            b.explicit_calls += 1;
                            Ok(None)
                        },
                    ),
                ),
        )
        .register(
            TypeBuilder::<MyDerivedType>::class("MyDerivedType")
                .extends(|d| &d.base, |d| &mut d.base)
                .implements::<dyn IDerivedInterface>()
                .implements::<dyn IExplicitInterface>()
                .field("base_field", |d| &d.base_field, |d| &mut d.base_field)
                .field("child_field", |d| &d.child_field, |d| &mut d.child_field)
                .auto_property("Score", |d| &d.score, |d| &mut d.score)
                .property(
                    PropertyBuilder::new("Label")
                        .getter(|d: &MyDerivedType| format!("derived {}", d.base.label))
                        .overriding(),
                )
                .method(
                    MethodBuilder::new("ChildMethod")
                        .returns::<i32>()
                        .body(|_: &mut MyDerivedType, _| ret(0i32)),
                )
                .method(
                    MethodBuilder::new("ChildMethod")
                        .param::<String>()
                        .returns::<i32>()
                        .body(|_: &mut MyDerivedType, args| {
                            ret(argument::<String>(args, 0)?.len() as i32)
                        }),
                )
                .method(
                    MethodBuilder::new("BaseVirtualMethod")
                        .returns::<String>()
                        .overrides()
                        .body(|_: &mut MyDerivedType, _| ret(String::from("derived"))),
                )
                .method(
                    MethodBuilder::explicit::<dyn IExplicitInterface>("MyExplicitMethod").body(
                        |d: &mut MyDerivedType, _| {
                            d.explicit_calls += 1;
                            Ok(None)
                        },
                    ),
                ),
        )
        .register(
            TypeBuilder::<AccelerationType>::value_type("AccelerationType")
                .field("field", |a| &a.field, |a| &mut a.field)
                .constant("Constant", 42i32)
                .method(
                    MethodBuilder::new("Method")
                        .param::<i32>()
                        .returns::<i32>()
                        .body(|a: &mut AccelerationType, args| {
                            ret(a.field + *argument::<i32>(args, 0)?)
                        }),
                )
                .method(
                    MethodBuilder::new("Overloaded")
                        .returns::<i32>()
                        .body(|_: &mut AccelerationType, _| ret(1i32)),
                )
                .method(
                    MethodBuilder::new("Overloaded")
                        .param::<i32>()
                        .returns::<i32>()
                        .body(|_: &mut AccelerationType, _| ret(2i32)),
                )
                .method(
                    MethodBuilder::new("Overloaded")
                        .param::<String>()
                        .returns::<i32>()
                        .body(|_: &mut AccelerationType, _| ret(3i32)),
                ),
        )
        .build()
        .unwrap();
    Arc::new(table)
}

pub fn fixture_cache() -> TypeCache {
    TypeCache::with_config(
        fixture_table(),
        Arc::new(AcceleratorRegistry::new()),
        CacheConfig::new().with_metrics(true),
    )
}

/// Accelerators for [`AccelerationType`]; every accelerated call bumps `calls`.
///
/// `Overloaded` is accelerated for `()` (returns 10) and `(String)` (returns
/// 30) but not for `(i32)`.
pub fn acceleration_bundle(calls: Arc<AtomicUsize>) -> ProviderBundle {
    let (read_calls, write_calls, method_calls) = (calls.clone(), calls.clone(), calls.clone());
    let (first_calls, second_calls) = (calls.clone(), calls);
    ProviderBundle::for_type::<AccelerationType>("AccelerationTypeProvider")
        .field(
            "field",
            move |a: &AccelerationType| {
                read_calls.fetch_add(1, Ordering::SeqCst);
                a.field
            },
            move |a: &mut AccelerationType, v: i32| {
                write_calls.fetch_add(1, Ordering::SeqCst);
                a.field = v;
            },
        )
        .method(
            "Method",
            vec![TypeHandle::of::<i32>()],
            move |a: &mut AccelerationType, args: &[Value]| {
                method_calls.fetch_add(1, Ordering::SeqCst);
                ret(a.field + *argument::<i32>(args, 0)?)
            },
        )
        .method("Overloaded", vec![], move |_: &mut AccelerationType, _: &[Value]| {
            first_calls.fetch_add(1, Ordering::SeqCst);
            ret(10i32)
        })
        .method(
            "Overloaded",
            vec![TypeHandle::of::<String>()],
            move |_: &mut AccelerationType, _: &[Value]| {
                second_calls.fetch_add(1, Ordering::SeqCst);
                ret(30i32)
            },
        )
}

pub fn accelerated_cache(calls: Arc<AtomicUsize>) -> TypeCache {
    let registry = AcceleratorRegistry::new();
    registry.register([acceleration_bundle(calls)]).unwrap();
    TypeCache::with_config(
        fixture_table(),
        Arc::new(registry),
        CacheConfig::new().with_metrics(true),
    )
}

pub fn unbox<T: 'static>(value: Option<Value>) -> T {
    *value.unwrap().downcast::<T>().unwrap()
}
