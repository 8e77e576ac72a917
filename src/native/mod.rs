//! The native type system the metadata layer describes.
//!
//! Rust has no runtime reflection, so the facilities a reflective runtime would
//! provide (base-type lookup, declared-member enumeration, transitive interface
//! sets, override tests and slow by-name member access) are expressed through
//! the [`NativeTypeSystem`] trait. [`TypeTable`] is the bundled implementation,
//! populated with [`TypeBuilder`]s.
//!
//! Instances travel as `&dyn Any` / `&mut dyn Any` and values as [`Value`]
//! boxes. An instance of a derived type reaches the members of its ancestors
//! through the upcast views registered with [`TypeBuilder::extends`].
use crate::error::AccessError;
use std::{
    any::{Any, TypeId},
    borrow::Borrow,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

mod builtin;
mod definition;
mod reflect;
mod table;

pub use builtin::Object;
pub use definition::{
    Attribute, FieldDefinition, MethodBuilder, MethodDefinition, PropertyBuilder,
    PropertyDefinition, TypeBuilder, TypeDefinition, TypeKind,
};
pub use table::{TypeTable, TypeTableBuilder};

/// A boxed value crossing the reflection boundary.
pub type Value = Box<dyn Any>;

pub type ReadFn = Arc<dyn Fn(&dyn Any) -> Result<Value, AccessError> + Send + Sync>;
pub type WriteFn = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), AccessError> + Send + Sync>;
pub type InvokeFn =
    Arc<dyn Fn(&mut dyn Any, &[Value]) -> Result<Option<Value>, AccessError> + Send + Sync>;

/// Identity of a native type.
///
/// Interfaces are identified by their trait object type, e.g.
/// `TypeHandle::of::<dyn Display>()`.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    rust_name: &'static str,
}

impl TypeHandle {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeHandle {}

// Must hash exactly like the inner TypeId so maps keyed by handle can be
// queried with a bare TypeId (see the Borrow impl below).
impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Borrow<TypeId> for TypeHandle {
    fn borrow(&self) -> &TypeId {
        &self.id
    }
}

impl Debug for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeHandle({})", self.rust_name)
    }
}

impl Display for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.rust_name)
    }
}

/// Facilities consumed from the native type system.
///
/// Implementors only supply [`definition`](Self::definition) and
/// [`runtime_type`](Self::runtime_type); hierarchy walks and the generic,
/// reflection-style member access are provided on top of them.
pub trait NativeTypeSystem: Send + Sync {
    fn definition(&self, handle: TypeHandle) -> Option<&TypeDefinition>;

    /// The concrete type of `instance`, if it is known to this type system.
    fn runtime_type(&self, instance: &dyn Any) -> Option<TypeHandle>;

    /// `handle` followed by each of its base types, root last.
    fn ancestors(&self, handle: TypeHandle) -> Vec<TypeHandle> {
        let mut chain = Vec::new();
        let mut current = Some(handle);
        while let Some(h) = current {
            if chain.contains(&h) {
                break;
            }
            chain.push(h);
            current = self.definition(h).and_then(|d| d.base);
        }
        chain
    }

    /// Every interface implemented by `handle` or any of its ancestors,
    /// including super-interfaces and explicitly implemented ones.
    fn interfaces(&self, handle: TypeHandle) -> Vec<TypeHandle> {
        reflect::transitive_interfaces(self, handle)
    }

    /// Views `instance` as its ancestor `target`.
    fn upcast<'a>(&self, instance: &'a dyn Any, target: TypeHandle) -> Result<&'a dyn Any, AccessError> {
        reflect::view(self, instance, target)
    }

    fn upcast_mut<'a>(
        &self,
        instance: &'a mut dyn Any,
        target: TypeHandle,
    ) -> Result<&'a mut dyn Any, AccessError> {
        reflect::view_mut(self, instance, target)
    }

    fn read_member(
        &self,
        declaring: TypeHandle,
        name: &str,
        instance: &dyn Any,
    ) -> Result<Value, AccessError> {
        reflect::read_member(self, declaring, name, instance)
    }

    fn write_member(
        &self,
        declaring: TypeHandle,
        name: &str,
        instance: &mut dyn Any,
        value: Value,
    ) -> Result<(), AccessError> {
        reflect::write_member(self, declaring, name, instance, value)
    }

    fn invoke_method(
        &self,
        declaring: TypeHandle,
        name: &str,
        parameters: &[TypeHandle],
        instance: &mut dyn Any,
        args: &[Value],
    ) -> Result<Option<Value>, AccessError> {
        reflect::invoke_method(self, declaring, name, parameters, instance, args)
    }
}

pub fn downcast_ref<T: Any>(instance: &dyn Any) -> Result<&T, AccessError> {
    instance
        .downcast_ref::<T>()
        .ok_or_else(|| AccessError::TargetMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: format!("{:?}", (*instance).type_id()),
        })
}

pub fn downcast_mut<T: Any>(instance: &mut dyn Any) -> Result<&mut T, AccessError> {
    let actual = (*instance).type_id();
    instance
        .downcast_mut::<T>()
        .ok_or_else(|| AccessError::TargetMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: format!("{:?}", actual),
        })
}

/// Unboxes a [`Value`] into a concrete type.
pub fn unbox<T: Any>(value: Value) -> Result<T, AccessError> {
    value
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| AccessError::ValueType {
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// Borrows positional argument `index` as a `T`.
pub fn argument<T: Any>(args: &[Value], index: usize) -> Result<&T, AccessError> {
    let arg = args.get(index).ok_or(AccessError::ArgumentCount {
        expected: index + 1,
        actual: args.len(),
    })?;
    arg.downcast_ref::<T>()
        .ok_or_else(|| AccessError::ArgumentType {
            index,
            expected: std::any::type_name::<T>().to_string(),
        })
}
