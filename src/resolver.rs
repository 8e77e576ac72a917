use crate::{
    accelerators::AcceleratorRegistry,
    config::CacheConfig,
    error::ResolutionError,
    metrics::{CacheMetrics, CacheStats},
    native::{
        FieldDefinition, InvokeFn, MethodDefinition, NativeTypeSystem, PropertyDefinition,
        ReadFn, TypeDefinition, TypeHandle, Value, WriteFn,
    },
    types::{FieldDescriptor, FieldKind, MethodDescriptor, TypeBody, TypeDescriptor},
};
use parking_lot::ReentrantMutex;
use std::{any::Any, cell::RefCell, collections::HashMap, fmt::Debug, sync::Arc};
use tracing::{debug, trace};

type TypeMap = HashMap<TypeHandle, Arc<TypeDescriptor>>;

/// Resolves native types into shared [`TypeDescriptor`]s.
///
/// Each cache is self-contained: it holds exactly one descriptor per type
/// handle for as long as it lives, and never shares descriptors or indices
/// with another cache.
///
/// First resolution of a type holds the cache lock until the whole type graph
/// reachable from it is built. Another thread asking for any type meanwhile
/// waits; the resolving thread itself re-enters the lock and sees the
/// placeholder of any type it is still building.
pub struct TypeCache {
    native: Arc<dyn NativeTypeSystem>,
    accelerators: Arc<AcceleratorRegistry>,
    types: ReentrantMutex<RefCell<TypeMap>>,
    metrics: Option<Arc<CacheMetrics>>,
}

impl TypeCache {
    pub fn new(native: Arc<dyn NativeTypeSystem>) -> Self {
        Self::with_accelerators(native, Arc::new(AcceleratorRegistry::new()))
    }

    pub fn with_accelerators(
        native: Arc<dyn NativeTypeSystem>,
        accelerators: Arc<AcceleratorRegistry>,
    ) -> Self {
        Self::with_config(native, accelerators, CacheConfig::default())
    }

    pub fn with_config(
        native: Arc<dyn NativeTypeSystem>,
        accelerators: Arc<AcceleratorRegistry>,
        config: CacheConfig,
    ) -> Self {
        Self {
            native,
            accelerators,
            types: ReentrantMutex::new(RefCell::new(HashMap::new())),
            metrics: config.collect_metrics.then(|| Arc::new(CacheMetrics::new())),
        }
    }

    pub fn native(&self) -> &Arc<dyn NativeTypeSystem> {
        &self.native
    }

    pub fn accelerators(&self) -> &Arc<AcceleratorRegistry> {
        &self.accelerators
    }

    pub fn resolve_type<T: ?Sized + 'static>(&self) -> Result<Arc<TypeDescriptor>, ResolutionError> {
        self.resolve(TypeHandle::of::<T>())
    }

    pub fn resolve(&self, handle: TypeHandle) -> Result<Arc<TypeDescriptor>, ResolutionError> {
        let guard = self.types.lock();
        if let Some(existing) = guard.borrow().get(&handle) {
            if let Some(m) = &self.metrics {
                m.record_resolve_hit();
            }
            trace!(ty = %existing.name(), "type cache hit");
            return Ok(existing.clone());
        }

        let definition = self
            .native
            .definition(handle)
            .ok_or_else(|| ResolutionError::UnknownType(handle.to_string()))?;
        if let Some(m) = &self.metrics {
            m.record_resolve_miss();
        }

        let descriptor = Arc::new(TypeDescriptor::placeholder(
            definition,
            self.metrics.clone(),
        ));
        guard.borrow_mut().insert(handle, descriptor.clone());

        match self.build_body(definition) {
            Ok(body) => {
                debug!(
                    ty = %definition.name,
                    fields = body.fields.len(),
                    methods = body.methods.len(),
                    interfaces = body.interfaces.len(),
                    "resolved type"
                );
                descriptor.initialize(body);
                Ok(descriptor)
            }
            Err(e) => {
                guard.borrow_mut().remove(&handle);
                Err(e)
            }
        }
    }

    /// The descriptor for `handle` if it has already been resolved.
    pub fn get(&self, handle: TypeHandle) -> Option<Arc<TypeDescriptor>> {
        self.types.lock().borrow().get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.lock().borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` unless the cache was configured to collect metrics.
    pub fn stats(&self) -> Option<CacheStats> {
        let metrics = self.metrics.as_ref()?;
        Some(metrics.snapshot(self.len()))
    }

    fn build_body(&self, definition: &TypeDefinition) -> Result<TypeBody, ResolutionError> {
        let parent = definition.base.map(|b| self.resolve(b)).transpose()?;
        let interfaces = self
            .native
            .interfaces(definition.handle)
            .into_iter()
            .map(|i| self.resolve(i).map(|d| Arc::downgrade(&d)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = Vec::with_capacity(definition.fields.len() + definition.properties.len());
        for field in &definition.fields {
            fields.push(Arc::new(self.bind_field(definition, field)));
        }
        for property in &definition.properties {
            // declared on the ancestor that introduced it
            if property.overrides_base() {
                continue;
            }
            fields.push(Arc::new(self.bind_property(definition, property)));
        }

        let methods = definition
            .methods
            .iter()
            .filter(|m| !m.overrides && !m.compiler_generated)
            .map(|m| Arc::new(self.bind_method(definition, m)))
            .collect();

        Ok(TypeBody {
            parent,
            interfaces,
            fields,
            methods,
        })
    }

    fn generic_reader(&self, owner: TypeHandle, name: &str) -> ReadFn {
        let native = self.native.clone();
        let name = name.to_string();
        Arc::new(move |instance: &dyn Any| native.read_member(owner, &name, instance))
    }

    fn generic_writer(&self, owner: TypeHandle, name: &str) -> WriteFn {
        let native = self.native.clone();
        let name = name.to_string();
        Arc::new(move |instance: &mut dyn Any, value: Value| native.write_member(owner, &name, instance, value))
    }

    fn generic_invoker(&self, owner: TypeHandle, method: &MethodDefinition) -> InvokeFn {
        let native = self.native.clone();
        let name = method.name.clone();
        let parameters = method.parameters.clone();
        Arc::new(move |instance: &mut dyn Any, args: &[Value]| {
            native.invoke_method(owner, &name, &parameters, instance, args)
        })
    }

    // Accelerators are typed against the exact owner; instances of derived
    // types are upcast first.
    fn upcasting_reader(&self, owner: TypeHandle, read: ReadFn) -> ReadFn {
        let native = self.native.clone();
        Arc::new(move |instance: &dyn Any| {
            if (*instance).type_id() == owner.type_id() {
                read(instance)
            } else {
                read(native.upcast(instance, owner)?)
            }
        })
    }

    fn upcasting_writer(&self, owner: TypeHandle, write: WriteFn) -> WriteFn {
        let native = self.native.clone();
        Arc::new(move |instance: &mut dyn Any, value: Value| {
            if (*instance).type_id() == owner.type_id() {
                write(instance, value)
            } else {
                write(native.upcast_mut(instance, owner)?, value)
            }
        })
    }

    fn upcasting_invoker(&self, owner: TypeHandle, invoke: InvokeFn) -> InvokeFn {
        let native = self.native.clone();
        Arc::new(move |instance: &mut dyn Any, args: &[Value]| {
            if (*instance).type_id() == owner.type_id() {
                invoke(instance, args)
            } else {
                invoke(native.upcast_mut(instance, owner)?, args)
            }
        })
    }

    /// Binds the read and (if `writable`) write halves of a member, preferring
    /// accelerators for each half independently.
    fn bind_accessors(
        &self,
        owner: &TypeDefinition,
        name: &str,
        writable: bool,
    ) -> (ReadFn, bool, Option<WriteFn>, bool) {
        let accelerator = self.accelerators.field(owner.handle, name);
        let (reader, accelerated_read) = match accelerator.as_ref().and_then(|a| a.read.clone()) {
            Some(read) => (self.upcasting_reader(owner.handle, read), true),
            None => (self.generic_reader(owner.handle, name), false),
        };
        let (writer, accelerated_write) = if writable {
            match accelerator.and_then(|a| a.write) {
                Some(write) => (Some(self.upcasting_writer(owner.handle, write)), true),
                None => (Some(self.generic_writer(owner.handle, name)), false),
            }
        } else {
            (None, false)
        };
        if accelerated_read || accelerated_write {
            trace!(
                ty = %owner.name,
                member = name,
                read = accelerated_read,
                write = accelerated_write,
                "bound field accelerator"
            );
        }
        if let Some(m) = &self.metrics {
            m.record_binding(accelerated_read || accelerated_write);
        }
        (reader, accelerated_read, writer, accelerated_write)
    }

    fn bind_field(&self, owner: &TypeDefinition, field: &FieldDefinition) -> FieldDescriptor {
        let (reader, accelerated_read, writer, accelerated_write) =
            self.bind_accessors(owner, &field.name, !field.is_constant && field.setter.is_some());
        FieldDescriptor {
            name: field.name.clone(),
            declaring_type: owner.handle,
            field_type: field.field_type,
            kind: FieldKind::Field,
            attributes: field.attributes.clone(),
            can_read: true,
            reader,
            writer,
            accelerated_read,
            accelerated_write,
        }
    }

    fn bind_property(&self, owner: &TypeDefinition, property: &PropertyDefinition) -> FieldDescriptor {
        let (reader, accelerated_read, writer, accelerated_write) =
            self.bind_accessors(owner, &property.name, property.can_write());
        FieldDescriptor {
            name: property.name.clone(),
            declaring_type: owner.handle,
            field_type: property.property_type,
            kind: if property.is_auto {
                FieldKind::AutoProperty
            } else {
                FieldKind::Property
            },
            attributes: property.attributes.clone(),
            can_read: property.can_read(),
            reader,
            writer,
            accelerated_read,
            accelerated_write,
        }
    }

    fn bind_method(&self, owner: &TypeDefinition, method: &MethodDefinition) -> MethodDescriptor {
        let accelerator = self
            .accelerators
            .select_method(owner.handle, &method.name, &method.parameters);
        let accelerated = accelerator.is_some();
        let invoker = match accelerator {
            Some(a) => {
                trace!(ty = %owner.name, method = %method.name, "bound method accelerator");
                self.upcasting_invoker(owner.handle, a.invoke)
            }
            None => self.generic_invoker(owner.handle, method),
        };
        if let Some(m) = &self.metrics {
            m.record_binding(accelerated);
        }
        MethodDescriptor {
            name: method.name.clone(),
            declaring_type: owner.handle,
            parameter_types: method.parameters.clone(),
            return_type: method.return_type,
            is_virtual: method.is_virtual,
            explicit_interface: method.explicit_interface,
            attributes: method.attributes.clone(),
            invoker,
            accelerated,
        }
    }
}

impl Debug for TypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeCache")
            .field("types", &self.len())
            .field("accelerators", &self.accelerators)
            .finish()
    }
}
