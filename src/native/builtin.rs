use super::{argument, MethodBuilder, PropertyBuilder, TypeBuilder, TypeTableBuilder, Value};

/// The root of every class and value type hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Object;

pub(crate) fn register(builder: TypeTableBuilder) -> TypeTableBuilder {
    builder
        .register(TypeBuilder::<Object>::root("Object"))
        .register(TypeBuilder::<bool>::value_type("bool"))
        .register(TypeBuilder::<i32>::value_type("i32"))
        .register(TypeBuilder::<i64>::value_type("i64"))
        .register(TypeBuilder::<u32>::value_type("u32"))
        .register(TypeBuilder::<u64>::value_type("u64"))
        .register(TypeBuilder::<usize>::value_type("usize"))
        .register(TypeBuilder::<f32>::value_type("f32"))
        .register(TypeBuilder::<f64>::value_type("f64"))
        .register(
            TypeBuilder::<String>::class("String")
                .property(PropertyBuilder::new("Length").getter(|s: &String| s.len()))
                .method(
                    MethodBuilder::new("ToUpper")
                        .returns::<String>()
                        .body(|s: &mut String, _| Ok(Some(Box::new(s.to_uppercase()) as Value))),
                )
                .method(
                    MethodBuilder::new("Contains")
                        .param::<String>()
                        .returns::<bool>()
                        .body(|s: &mut String, args| {
                            let needle = argument::<String>(args, 0)?;
                            Ok(Some(Box::new(s.contains(needle.as_str())) as Value))
                        }),
                ),
        )
}
