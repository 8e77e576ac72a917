use crate::{
    error::AccessError,
    native::{unbox, Attribute, InvokeFn, ReadFn, TypeHandle, Value, WriteFn},
};
use std::{
    any::Any,
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Field,
    Property,
    AutoProperty,
}

/// One field or property declared on a type.
///
/// Equality is identity: two descriptors are equal only if they are the same
/// allocation, which is what a shadowing field and the field it shadows need.
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) declaring_type: TypeHandle,
    pub(crate) field_type: TypeHandle,
    pub(crate) kind: FieldKind,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) can_read: bool,
    pub(crate) reader: ReadFn,
    /// `None` exactly when the member cannot be written.
    pub(crate) writer: Option<WriteFn>,
    pub(crate) accelerated_read: bool,
    pub(crate) accelerated_write: bool,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type the member is textually declared on.
    pub fn declaring_type(&self) -> TypeHandle {
        self.declaring_type
    }

    pub fn field_type(&self) -> TypeHandle {
        self.field_type
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_field(&self) -> bool {
        self.kind == FieldKind::Field
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, FieldKind::Property | FieldKind::AutoProperty)
    }

    pub fn is_auto_property(&self) -> bool {
        self.kind == FieldKind::AutoProperty
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn can_read(&self) -> bool {
        self.can_read
    }

    pub fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    pub fn is_accelerated_read(&self) -> bool {
        self.accelerated_read
    }

    pub fn is_accelerated_write(&self) -> bool {
        self.accelerated_write
    }

    pub fn read(&self, instance: &dyn Any) -> Result<Value, AccessError> {
        if !self.can_read {
            return Err(AccessError::NotReadable {
                member: self.name.clone(),
            });
        }
        (self.reader)(instance)
    }

    pub fn read_as<T: Any>(&self, instance: &dyn Any) -> Result<T, AccessError> {
        unbox(self.read(instance)?)
    }

    /// Fails with [`AccessError::ReadOnly`] when [`can_write`](Self::can_write)
    /// is false; the accessor is never reached in that case.
    pub fn write(&self, instance: &mut dyn Any, value: Value) -> Result<(), AccessError> {
        match &self.writer {
            Some(writer) => writer(instance, value),
            None => Err(AccessError::ReadOnly {
                member: self.name.clone(),
            }),
        }
    }

    pub fn write_value<T: Any>(&self, instance: &mut dyn Any, value: T) -> Result<(), AccessError> {
        self.write(instance, Box::new(value))
    }
}

impl Debug for FieldDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} {} {}::{}",
            self.kind, self.field_type, self.declaring_type, self.name
        )
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for FieldDescriptor {}

impl Hash for FieldDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const FieldDescriptor).hash(state);
    }
}

/// One method declared on a type.
pub struct MethodDescriptor {
    pub(crate) name: String,
    pub(crate) declaring_type: TypeHandle,
    pub(crate) parameter_types: Vec<TypeHandle>,
    pub(crate) return_type: Option<TypeHandle>,
    pub(crate) is_virtual: bool,
    pub(crate) explicit_interface: Option<TypeHandle>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) invoker: InvokeFn,
    pub(crate) accelerated: bool,
}

impl MethodDescriptor {
    /// The lookup key. Explicit interface implementations use the qualified
    /// `"<Interface>.<Method>"` form.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> TypeHandle {
        self.declaring_type
    }

    pub fn parameter_types(&self) -> &[TypeHandle] {
        &self.parameter_types
    }

    /// `None` for methods that return nothing.
    pub fn return_type(&self) -> Option<TypeHandle> {
        self.return_type
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn explicit_interface(&self) -> Option<TypeHandle> {
        self.explicit_interface
    }

    /// Splits an explicit interface implementation's name on its last `.` into
    /// the interface name and the method name.
    pub fn qualified_parts(&self) -> Option<(&str, &str)> {
        self.explicit_interface?;
        self.name.rsplit_once('.')
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn is_accelerated(&self) -> bool {
        self.accelerated
    }

    pub fn invoke(&self, instance: &mut dyn Any, args: &[Value]) -> Result<Option<Value>, AccessError> {
        (self.invoker)(instance, args)
    }
}

impl Debug for MethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}(", self.declaring_type, self.name)?;
        for (i, p) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")?;
        if let Some(r) = self.return_type {
            write!(f, " -> {}", r)?;
        }
        Ok(())
    }
}

impl PartialEq for MethodDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for MethodDescriptor {}

impl Hash for MethodDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const MethodDescriptor).hash(state);
    }
}
