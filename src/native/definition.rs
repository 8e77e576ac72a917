use super::{downcast_mut, downcast_ref, unbox, InvokeFn, ReadFn, TypeHandle, Value, WriteFn};
use crate::{error::AccessError, native::builtin::Object};
use std::{any::Any, fmt::Debug, marker::PhantomData, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
}

/// A marker attached to a field, property or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub struct FieldDefinition {
    pub name: String,
    pub field_type: TypeHandle,
    pub is_constant: bool,
    pub attributes: Vec<Attribute>,
    pub(crate) getter: ReadFn,
    pub(crate) setter: Option<WriteFn>,
}

pub struct PropertyDefinition {
    pub name: String,
    pub property_type: TypeHandle,
    pub is_auto: bool,
    /// The getter overrides a base definition.
    pub getter_overrides: bool,
    /// The setter overrides a base definition.
    pub setter_overrides: bool,
    pub attributes: Vec<Attribute>,
    pub(crate) getter: Option<ReadFn>,
    pub(crate) setter: Option<WriteFn>,
}

impl PropertyDefinition {
    pub fn can_read(&self) -> bool {
        self.getter.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.setter.is_some()
    }

    pub fn overrides_base(&self) -> bool {
        (self.getter.is_some() && self.getter_overrides)
            || (self.setter.is_some() && self.setter_overrides)
    }
}

pub struct MethodDefinition {
    /// Explicit interface implementations carry `"<Interface>.<Method>"` once
    /// the owning table is built.
    pub name: String,
    pub parameters: Vec<TypeHandle>,
    pub return_type: Option<TypeHandle>,
    pub is_virtual: bool,
    /// The base definition of this method lives on an ancestor.
    pub overrides: bool,
    pub compiler_generated: bool,
    pub explicit_interface: Option<TypeHandle>,
    pub attributes: Vec<Attribute>,
    pub(crate) body: Option<InvokeFn>,
}

impl MethodDefinition {
    /// The name without any interface qualification.
    pub fn plain_name(&self) -> &str {
        match self.explicit_interface {
            Some(_) => self
                .name
                .rsplit_once('.')
                .map_or(self.name.as_str(), |(_, m)| m),
            None => &self.name,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }
}

/// Re-views an instance of a derived type as its immediate base.
pub(crate) trait Upcast: Send + Sync {
    fn view<'a>(&self, instance: &'a dyn Any) -> Option<&'a dyn Any>;
    fn view_mut<'a>(&self, instance: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

struct EmbeddedBase<D, B> {
    get: fn(&D) -> &B,
    get_mut: fn(&mut D) -> &mut B,
}

impl<D: Any, B: Any> Upcast for EmbeddedBase<D, B> {
    fn view<'a>(&self, instance: &'a dyn Any) -> Option<&'a dyn Any> {
        instance
            .downcast_ref::<D>()
            .map(|d| (self.get)(d) as &dyn Any)
    }

    fn view_mut<'a>(&self, instance: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        instance
            .downcast_mut::<D>()
            .map(|d| (self.get_mut)(d) as &mut dyn Any)
    }
}

pub struct TypeDefinition {
    pub handle: TypeHandle,
    pub name: String,
    pub kind: TypeKind,
    pub base: Option<TypeHandle>,
    /// Interfaces declared directly on this type.
    pub interfaces: Vec<TypeHandle>,
    pub fields: Vec<FieldDefinition>,
    pub properties: Vec<PropertyDefinition>,
    pub methods: Vec<MethodDefinition>,
    pub(crate) upcast: Option<Arc<dyn Upcast>>,
}

impl TypeDefinition {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_value_type(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str, parameters: &[TypeHandle]) -> Option<&MethodDefinition> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameters == parameters)
    }
}

impl Debug for TypeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("fields", &self.fields.len())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

enum LastMember {
    None,
    Field,
    Property,
    Method,
}

/// Builds the [`TypeDefinition`] of `T`.
///
/// Member closures are typed against `T`; the resulting definition erases them
/// behind `&dyn Any` accessors. [`attribute`](Self::attribute) decorates the
/// member added last.
pub struct TypeBuilder<T: ?Sized + 'static> {
    definition: TypeDefinition,
    last: LastMember,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> TypeBuilder<T> {
    fn with_kind(name: impl Into<String>, kind: TypeKind, base: Option<TypeHandle>) -> Self {
        Self {
            definition: TypeDefinition {
                handle: TypeHandle::of::<T>(),
                name: name.into(),
                kind,
                base,
                interfaces: Vec::new(),
                fields: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
                upcast: None,
            },
            last: LastMember::None,
            _marker: PhantomData,
        }
    }

    /// An interface, identified by its trait object type (`dyn Trait`).
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Interface, None)
    }

    pub fn implements<I: ?Sized + 'static>(mut self) -> Self {
        self.definition.interfaces.push(TypeHandle::of::<I>());
        self
    }

    /// A method with no body, as declared on an interface.
    pub fn abstract_method(
        mut self,
        name: impl Into<String>,
        parameters: Vec<TypeHandle>,
        return_type: Option<TypeHandle>,
    ) -> Self {
        self.definition.methods.push(MethodDefinition {
            name: name.into(),
            parameters,
            return_type,
            is_virtual: true,
            overrides: false,
            compiler_generated: false,
            explicit_interface: None,
            attributes: Vec::new(),
            body: None,
        });
        self.last = LastMember::Method;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        let attribute = Attribute::new(name);
        let target = match self.last {
            LastMember::Field => self.definition.fields.last_mut().map(|f| &mut f.attributes),
            LastMember::Property => self
                .definition
                .properties
                .last_mut()
                .map(|p| &mut p.attributes),
            LastMember::Method => self.definition.methods.last_mut().map(|m| &mut m.attributes),
            LastMember::None => None,
        };
        if let Some(attributes) = target {
            attributes.push(attribute);
        }
        self
    }

    pub fn build(self) -> TypeDefinition {
        self.definition
    }
}

impl<T: Any> TypeBuilder<T> {
    /// A reference type. Its base defaults to [`Object`].
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class, Some(TypeHandle::of::<Object>()))
    }

    /// A value type. Its base defaults to [`Object`].
    pub fn value_type(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Struct, Some(TypeHandle::of::<Object>()))
    }

    /// A type with no base at all.
    pub fn root(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class, None)
    }

    /// Declares `B` as the base type; `T` embeds its base state and exposes it
    /// through `view`/`view_mut`.
    pub fn extends<B: Any>(mut self, view: fn(&T) -> &B, view_mut: fn(&mut T) -> &mut B) -> Self {
        self.definition.base = Some(TypeHandle::of::<B>());
        self.definition.upcast = Some(Arc::new(EmbeddedBase {
            get: view,
            get_mut: view_mut,
        }));
        self
    }

    pub fn field<F: Any + Clone>(
        mut self,
        name: impl Into<String>,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        let getter: ReadFn =
            Arc::new(move |o: &dyn Any| Ok(Box::new(get(downcast_ref::<T>(o)?).clone()) as Value));
        let setter: WriteFn = Arc::new(move |o: &mut dyn Any, v: Value| {
            let value = unbox::<F>(v)?;
            *get_mut(downcast_mut::<T>(o)?) = value;
            Ok(())
        });
        self.definition.fields.push(FieldDefinition {
            name: name.into(),
            field_type: TypeHandle::of::<F>(),
            is_constant: false,
            attributes: Vec::new(),
            getter,
            setter: Some(setter),
        });
        self.last = LastMember::Field;
        self
    }

    /// A literal field: readable, never writable.
    pub fn constant<F: Any + Clone + Send + Sync>(mut self, name: impl Into<String>, value: F) -> Self {
        let getter: ReadFn = Arc::new(move |o: &dyn Any| {
            downcast_ref::<T>(o)?;
            Ok(Box::new(value.clone()) as Value)
        });
        self.definition.fields.push(FieldDefinition {
            name: name.into(),
            field_type: TypeHandle::of::<F>(),
            is_constant: true,
            attributes: Vec::new(),
            getter,
            setter: None,
        });
        self.last = LastMember::Field;
        self
    }

    pub fn property(mut self, property: PropertyBuilder<T>) -> Self {
        self.definition.properties.push(property.build());
        self.last = LastMember::Property;
        self
    }

    /// A property backed by storage in `T`, together with the compiler
    /// generated `get_<name>`/`set_<name>` accessor methods.
    pub fn auto_property<F: Any + Clone>(
        mut self,
        name: impl Into<String>,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        let name = name.into();
        let mut property = PropertyBuilder::<T>::new(name.clone())
            .getter(move |t: &T| get(t).clone())
            .setter(move |t: &mut T, v: F| *get_mut(t) = v)
            .build();
        property.is_auto = true;
        self.definition.properties.push(property);

        let getter = MethodBuilder::<T>::new(format!("get_{name}"))
            .returns::<F>()
            .compiler_generated()
            .body(move |t: &mut T, _| Ok(Some(Box::new(get(t).clone()) as Value)));
        let setter = MethodBuilder::<T>::new(format!("set_{name}"))
            .param::<F>()
            .compiler_generated()
            .body(move |t: &mut T, args: &[Value]| {
                *get_mut(t) = super::argument::<F>(args, 0)?.clone();
                Ok(None)
            });
        self.definition.methods.push(getter.build());
        self.definition.methods.push(setter.build());
        self.last = LastMember::Property;
        self
    }

    pub fn method(mut self, method: MethodBuilder<T>) -> Self {
        self.definition.methods.push(method.build());
        self.last = LastMember::Method;
        self
    }
}

pub struct PropertyBuilder<T: 'static> {
    name: String,
    property_type: TypeHandle,
    getter: Option<ReadFn>,
    setter: Option<WriteFn>,
    overrides: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> PropertyBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: TypeHandle::of::<()>(),
            getter: None,
            setter: None,
            overrides: false,
            _marker: PhantomData,
        }
    }

    pub fn getter<F: Any>(mut self, get: impl Fn(&T) -> F + Send + Sync + 'static) -> Self {
        self.property_type = TypeHandle::of::<F>();
        self.getter = Some(Arc::new(move |o: &dyn Any| {
            Ok(Box::new(get(downcast_ref::<T>(o)?)) as Value)
        }));
        self
    }

    pub fn setter<F: Any>(mut self, set: impl Fn(&mut T, F) + Send + Sync + 'static) -> Self {
        self.property_type = TypeHandle::of::<F>();
        self.setter = Some(Arc::new(move |o: &mut dyn Any, v: Value| {
            let value = unbox::<F>(v)?;
            set(downcast_mut::<T>(o)?, value);
            Ok(())
        }));
        self
    }

    /// Both accessors override a base definition.
    pub fn overriding(mut self) -> Self {
        self.overrides = true;
        self
    }

    fn build(self) -> PropertyDefinition {
        PropertyDefinition {
            name: self.name,
            property_type: self.property_type,
            is_auto: false,
            getter_overrides: self.overrides,
            setter_overrides: self.overrides,
            attributes: Vec::new(),
            getter: self.getter,
            setter: self.setter,
        }
    }
}

pub struct MethodBuilder<T: 'static> {
    definition: MethodDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> MethodBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: MethodDefinition {
                name: name.into(),
                parameters: Vec::new(),
                return_type: None,
                is_virtual: false,
                overrides: false,
                compiler_generated: false,
                explicit_interface: None,
                attributes: Vec::new(),
                body: None,
            },
            _marker: PhantomData,
        }
    }

    /// An explicit implementation of `name` declared on interface `I`.
    pub fn explicit<I: ?Sized + 'static>(name: impl Into<String>) -> Self {
        let mut builder = Self::new(name);
        builder.definition.explicit_interface = Some(TypeHandle::of::<I>());
        builder.definition.is_virtual = true;
        builder
    }

    pub fn param<P: ?Sized + 'static>(mut self) -> Self {
        self.definition.parameters.push(TypeHandle::of::<P>());
        self
    }

    pub fn returns<R: ?Sized + 'static>(mut self) -> Self {
        self.definition.return_type = Some(TypeHandle::of::<R>());
        self
    }

    pub fn overridable(mut self) -> Self {
        self.definition.is_virtual = true;
        self
    }

    pub fn overrides(mut self) -> Self {
        self.definition.is_virtual = true;
        self.definition.overrides = true;
        self
    }

    pub fn compiler_generated(mut self) -> Self {
        self.definition.compiler_generated = true;
        self
    }

    pub fn body(
        mut self,
        body: impl Fn(&mut T, &[Value]) -> Result<Option<Value>, AccessError> + Send + Sync + 'static,
    ) -> Self {
        self.definition.body = Some(Arc::new(move |o: &mut dyn Any, args: &[Value]| {
            body(downcast_mut::<T>(o)?, args)
        }));
        self
    }

    fn build(self) -> MethodDefinition {
        self.definition
    }
}
