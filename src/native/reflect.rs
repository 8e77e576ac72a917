//! Generic member access over [`NativeTypeSystem`] definitions.
//!
//! This is the slow path every descriptor falls back to when no accelerator is
//! registered: each call looks up the instance's runtime type, walks the base
//! chain to the declaring type and searches the member by name.
use super::{
    MethodDefinition, NativeTypeSystem, PropertyDefinition, TypeDefinition, TypeHandle, Value,
};
use crate::error::AccessError;
use std::{any::Any, collections::HashSet};

fn unknown(handle: TypeHandle) -> AccessError {
    AccessError::UnknownType(handle.to_string())
}

fn runtime_type<N: NativeTypeSystem + ?Sized>(
    native: &N,
    instance: &dyn Any,
    expected: TypeHandle,
) -> Result<TypeHandle, AccessError> {
    native
        .runtime_type(instance)
        .ok_or_else(|| AccessError::TargetMismatch {
            expected: expected.to_string(),
            actual: format!("{:?}", (*instance).type_id()),
        })
}

fn mismatch(expected: TypeHandle, actual: TypeHandle) -> AccessError {
    AccessError::TargetMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

pub(super) fn transitive_interfaces<N: NativeTypeSystem + ?Sized>(
    native: &N,
    handle: TypeHandle,
) -> Vec<TypeHandle> {
    fn collect<N: NativeTypeSystem + ?Sized>(
        native: &N,
        interface: TypeHandle,
        seen: &mut HashSet<TypeHandle>,
        out: &mut Vec<TypeHandle>,
    ) {
        if !seen.insert(interface) {
            return;
        }
        out.push(interface);
        if let Some(def) = native.definition(interface) {
            for &parent in &def.interfaces {
                collect(native, parent, seen, out);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for ancestor in native.ancestors(handle) {
        if let Some(def) = native.definition(ancestor) {
            for &interface in &def.interfaces {
                collect(native, interface, &mut seen, &mut out);
            }
        }
    }
    out
}

/// Views `instance` as `target` by walking the upcast chain of its runtime type.
pub(super) fn view<'a, N: NativeTypeSystem + ?Sized>(
    native: &N,
    instance: &'a dyn Any,
    target: TypeHandle,
) -> Result<&'a dyn Any, AccessError> {
    let actual = runtime_type(native, instance, target)?;
    let mut current = actual;
    let mut object = instance;
    while current != target {
        let def = native.definition(current).ok_or_else(|| unknown(current))?;
        let (Some(base), Some(upcast)) = (def.base, def.upcast.as_ref()) else {
            return Err(mismatch(target, actual));
        };
        object = upcast.view(object).ok_or_else(|| mismatch(target, actual))?;
        current = base;
    }
    Ok(object)
}

pub(super) fn view_mut<'a, N: NativeTypeSystem + ?Sized>(
    native: &N,
    instance: &'a mut dyn Any,
    target: TypeHandle,
) -> Result<&'a mut dyn Any, AccessError> {
    let actual = runtime_type(native, instance, target)?;
    let mut current = actual;
    let mut object = instance;
    while current != target {
        let def = native.definition(current).ok_or_else(|| unknown(current))?;
        let (Some(base), Some(upcast)) = (def.base, def.upcast.as_ref()) else {
            return Err(mismatch(target, actual));
        };
        object = upcast
            .view_mut(object)
            .ok_or_else(|| mismatch(target, actual))?;
        current = base;
    }
    Ok(object)
}

fn missing(def: &TypeDefinition, member: &str) -> AccessError {
    AccessError::MissingMember {
        owner: def.name.clone(),
        member: member.to_string(),
    }
}

/// The most-derived property accessor overriding `name`, searching from
/// `runtime` up to (but not including) `declaring`.
fn property_override<'n, N: NativeTypeSystem + ?Sized, A>(
    native: &'n N,
    declaring: TypeHandle,
    name: &str,
    runtime: TypeHandle,
    pick: impl Fn(&'n PropertyDefinition) -> Option<&'n A>,
) -> Option<(TypeHandle, &'n A)> {
    for ancestor in native.ancestors(runtime) {
        if ancestor == declaring {
            break;
        }
        let found = native
            .definition(ancestor)
            .and_then(|def| def.property(name))
            .and_then(&pick);
        if let Some(accessor) = found {
            return Some((ancestor, accessor));
        }
    }
    None
}

pub(super) fn read_member<N: NativeTypeSystem + ?Sized>(
    native: &N,
    declaring: TypeHandle,
    name: &str,
    instance: &dyn Any,
) -> Result<Value, AccessError> {
    let def = native.definition(declaring).ok_or_else(|| unknown(declaring))?;
    if let Some(field) = def.field(name) {
        return (field.getter)(view(native, instance, declaring)?);
    }
    let property = def.property(name).ok_or_else(|| missing(def, name))?;
    let runtime = runtime_type(native, instance, declaring)?;
    let overridden = property_override(native, declaring, name, runtime, |p| {
        p.getter.as_ref().filter(|_| p.getter_overrides)
    });
    let (owner, getter) = match overridden {
        Some(found) => found,
        None => {
            let getter = property
                .getter
                .as_ref()
                .ok_or_else(|| AccessError::NotReadable {
                    member: format!("{}.{}", def.name, name),
                })?;
            (declaring, getter)
        }
    };
    getter(view(native, instance, owner)?)
}

pub(super) fn write_member<N: NativeTypeSystem + ?Sized>(
    native: &N,
    declaring: TypeHandle,
    name: &str,
    instance: &mut dyn Any,
    value: Value,
) -> Result<(), AccessError> {
    let def = native.definition(declaring).ok_or_else(|| unknown(declaring))?;
    let read_only = || AccessError::ReadOnly {
        member: format!("{}.{}", def.name, name),
    };
    if let Some(field) = def.field(name) {
        let setter = field.setter.as_ref().ok_or_else(read_only)?;
        return setter(view_mut(native, instance, declaring)?, value);
    }
    let property = def.property(name).ok_or_else(|| missing(def, name))?;
    let setter = property.setter.as_ref().ok_or_else(read_only)?;
    let runtime = runtime_type(native, instance, declaring)?;
    let overridden = property_override(native, declaring, name, runtime, |p| {
        p.setter.as_ref().filter(|_| p.setter_overrides)
    });
    let (owner, setter) = overridden.unwrap_or((declaring, setter));
    setter(view_mut(native, instance, owner)?, value)
}

/// Whether `def` itself lists `interface`, directly or as a super-interface
/// of one of its declared interfaces.
fn declares_interface<N: NativeTypeSystem + ?Sized>(
    native: &N,
    def: &TypeDefinition,
    interface: TypeHandle,
) -> bool {
    let mut pending = def.interfaces.clone();
    let mut seen = HashSet::new();
    while let Some(current) = pending.pop() {
        if current == interface {
            return true;
        }
        if seen.insert(current) {
            if let Some(d) = native.definition(current) {
                pending.extend(d.interfaces.iter().copied());
            }
        }
    }
    false
}

/// The most-derived override of virtual `method` for an instance of
/// `runtime`. Following the slot stops at the first redeclaration that does
/// not override, since that starts a new slot.
fn virtual_dispatch<'n, N: NativeTypeSystem + ?Sized>(
    native: &'n N,
    declaring: TypeHandle,
    method: &'n MethodDefinition,
    runtime: TypeHandle,
) -> (TypeHandle, &'n MethodDefinition) {
    let mut current = (declaring, method);
    if !method.is_virtual {
        return current;
    }
    let chain = native.ancestors(runtime);
    let Some(position) = chain.iter().position(|&h| h == declaring) else {
        return current;
    };
    for &level in chain[..position].iter().rev() {
        let Some(def) = native.definition(level) else {
            continue;
        };
        let redeclared = def
            .methods
            .iter()
            .find(|m| m.name == method.name && m.parameters == method.parameters);
        match redeclared {
            Some(m) if m.overrides => current = (level, m),
            Some(_) => break,
            None => {}
        }
    }
    current
}

/// The implementation of interface method `method` for an instance of
/// `runtime`.
///
/// The most-derived ancestor that implements the interface maps it: its
/// explicit implementation wins, otherwise the first implicit match found
/// from that ancestor upwards, dispatched virtually.
fn interface_dispatch<'n, N: NativeTypeSystem + ?Sized>(
    native: &'n N,
    interface: &'n TypeDefinition,
    method: &'n MethodDefinition,
    runtime: TypeHandle,
) -> Option<(TypeHandle, &'n MethodDefinition)> {
    let chain = native.ancestors(runtime);
    let mapping = chain.iter().position(|&level| {
        native
            .definition(level)
            .is_some_and(|def| declares_interface(native, def, interface.handle))
    })?;

    let def = native.definition(chain[mapping])?;
    if let Some(explicit) = def.methods.iter().find(|m| {
        m.explicit_interface == Some(interface.handle)
            && m.plain_name() == method.name
            && m.parameters == method.parameters
    }) {
        return Some((chain[mapping], explicit));
    }

    for &level in &chain[mapping..] {
        let Some(def) = native.definition(level) else {
            continue;
        };
        let implicit = def.methods.iter().find(|m| {
            m.explicit_interface.is_none()
                && m.name == method.name
                && m.parameters == method.parameters
                && m.body.is_some()
        });
        if let Some(implicit) = implicit {
            return Some(virtual_dispatch(native, level, implicit, runtime));
        }
    }
    None
}

/// Finds the implementation `method` dispatches to for an instance of
/// `runtime`, returning the implementing type along with it.
fn dispatch<'n, N: NativeTypeSystem + ?Sized>(
    native: &'n N,
    declaring: &'n TypeDefinition,
    method: &'n MethodDefinition,
    runtime: TypeHandle,
) -> (TypeHandle, &'n MethodDefinition) {
    if declaring.is_interface() {
        interface_dispatch(native, declaring, method, runtime)
            .unwrap_or((declaring.handle, method))
    } else {
        virtual_dispatch(native, declaring.handle, method, runtime)
    }
}

pub(super) fn invoke_method<N: NativeTypeSystem + ?Sized>(
    native: &N,
    declaring: TypeHandle,
    name: &str,
    parameters: &[TypeHandle],
    instance: &mut dyn Any,
    args: &[Value],
) -> Result<Option<Value>, AccessError> {
    let def = native.definition(declaring).ok_or_else(|| unknown(declaring))?;
    let method = def
        .method(name, parameters)
        .ok_or_else(|| missing(def, name))?;
    if args.len() != method.parameters.len() {
        return Err(AccessError::ArgumentCount {
            expected: method.parameters.len(),
            actual: args.len(),
        });
    }
    let runtime = runtime_type(native, instance, declaring)?;
    let (owner, implementation) = dispatch(native, def, method, runtime);
    let Some(body) = implementation.body.as_ref() else {
        return Err(AccessError::Abstract {
            method: format!("{}.{}", def.name, name),
            target: runtime.to_string(),
        });
    };
    let object = view_mut(native, instance, owner)?;
    body(object, args)
}
