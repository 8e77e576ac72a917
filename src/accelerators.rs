//! Externally supplied fast-path accessors.
//!
//! A [`ProviderBundle`] carries the accelerated readers, writers and invokers
//! for the members of one owner type. [`AcceleratorRegistry`] indexes bundles
//! by owner so the resolver can bind them in place of generic member access.
//! Registration happens once at startup; lookups are cheap reads afterwards.
use crate::{
    error::{AccessError, ConfigurationError},
    native::{downcast_mut, downcast_ref, unbox, InvokeFn, ReadFn, TypeHandle, Value, WriteFn},
};
use parking_lot::RwLock;
use std::{
    any::Any,
    collections::{HashMap, HashSet},
    fmt::{Debug, Formatter},
    sync::Arc,
};
use tracing::{debug, trace, warn};

/// Accelerated access to one field or property. Either half may be absent, in
/// which case that half falls back to generic access.
#[derive(Clone)]
pub struct FieldAccelerator {
    pub name: String,
    pub read: Option<ReadFn>,
    pub write: Option<WriteFn>,
}

impl Debug for FieldAccelerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccelerator")
            .field("name", &self.name)
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct MethodAccelerator {
    pub name: String,
    pub parameters: Vec<TypeHandle>,
    pub invoke: InvokeFn,
}

impl Debug for MethodAccelerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodAccelerator")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A named set of accelerators for a single owner type.
#[derive(Clone, Debug)]
pub struct ProviderBundle {
    name: String,
    provider_for: TypeHandle,
    fields: Vec<FieldAccelerator>,
    methods: Vec<MethodAccelerator>,
}

impl ProviderBundle {
    pub fn new(name: impl Into<String>, provider_for: TypeHandle) -> Self {
        Self {
            name: name.into(),
            provider_for,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn for_type<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeHandle::of::<T>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_for(&self) -> TypeHandle {
        self.provider_for
    }

    pub fn fields(&self) -> &[FieldAccelerator] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodAccelerator] {
        &self.methods
    }

    pub fn field_raw(
        mut self,
        name: impl Into<String>,
        read: Option<ReadFn>,
        write: Option<WriteFn>,
    ) -> Self {
        self.fields.push(FieldAccelerator {
            name: name.into(),
            read,
            write,
        });
        self
    }

    /// Typed read and write accelerators for field `name` of `T`.
    pub fn field<T: Any, F: Any>(
        self,
        name: impl Into<String>,
        read: impl Fn(&T) -> F + Send + Sync + 'static,
        write: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        let read: ReadFn =
            Arc::new(move |o: &dyn Any| Ok(Box::new(read(downcast_ref::<T>(o)?)) as Value));
        let write: WriteFn = Arc::new(move |o: &mut dyn Any, v: Value| {
            let value = unbox::<F>(v)?;
            write(downcast_mut::<T>(o)?, value);
            Ok(())
        });
        self.field_raw(name, Some(read), Some(write))
    }

    /// A read-only accelerator; writes keep using generic access.
    pub fn reader<T: Any, F: Any>(
        self,
        name: impl Into<String>,
        read: impl Fn(&T) -> F + Send + Sync + 'static,
    ) -> Self {
        let read: ReadFn =
            Arc::new(move |o: &dyn Any| Ok(Box::new(read(downcast_ref::<T>(o)?)) as Value));
        self.field_raw(name, Some(read), None)
    }

    pub fn method_raw(
        mut self,
        name: impl Into<String>,
        parameters: Vec<TypeHandle>,
        invoke: InvokeFn,
    ) -> Self {
        self.methods.push(MethodAccelerator {
            name: name.into(),
            parameters,
            invoke,
        });
        self
    }

    pub fn method<T: Any>(
        self,
        name: impl Into<String>,
        parameters: Vec<TypeHandle>,
        invoke: impl Fn(&mut T, &[Value]) -> Result<Option<Value>, AccessError> + Send + Sync + 'static,
    ) -> Self {
        let invoke: InvokeFn = Arc::new(move |o: &mut dyn Any, args: &[Value]| {
            invoke(downcast_mut::<T>(o)?, args)
        });
        self.method_raw(name, parameters, invoke)
    }
}

struct OwnerAccelerators {
    provider: String,
    fields: HashMap<String, FieldAccelerator>,
    /// Overloads in registration order.
    methods: HashMap<String, Vec<MethodAccelerator>>,
}

impl OwnerAccelerators {
    fn index(bundle: ProviderBundle) -> Result<Self, ConfigurationError> {
        let malformed = |reason: String| ConfigurationError::MalformedEntry {
            bundle: bundle.name.clone(),
            reason,
        };

        let mut fields = HashMap::with_capacity(bundle.fields.len());
        for field in &bundle.fields {
            if field.name.is_empty() {
                return Err(malformed("field accelerator without a name".into()));
            }
            if field.read.is_none() && field.write.is_none() {
                return Err(malformed(format!(
                    "field accelerator {} has neither a reader nor a writer",
                    field.name
                )));
            }
            if fields.insert(field.name.clone(), field.clone()).is_some() {
                return Err(ConfigurationError::DuplicateFieldAccelerator {
                    bundle: bundle.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let mut methods: HashMap<String, Vec<MethodAccelerator>> = HashMap::new();
        for method in &bundle.methods {
            if method.name.is_empty() {
                return Err(malformed("method accelerator without a name".into()));
            }
            methods
                .entry(method.name.clone())
                .or_default()
                .push(method.clone());
        }

        Ok(Self {
            provider: bundle.name,
            fields,
            methods,
        })
    }
}

/// Accelerators indexed by owner type.
#[derive(Default)]
pub struct AcceleratorRegistry {
    owners: RwLock<HashMap<TypeHandle, OwnerAccelerators>>,
}

impl AcceleratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bundles` to the registry.
    ///
    /// Fails if two bundles (in this call, or one here and one registered
    /// earlier) accelerate the same owner type, or if any bundle is malformed.
    /// On failure nothing from this call is registered.
    pub fn register(
        &self,
        bundles: impl IntoIterator<Item = ProviderBundle>,
    ) -> Result<(), ConfigurationError> {
        let mut owners = self.owners.write();
        let mut staged: HashMap<TypeHandle, OwnerAccelerators> = HashMap::new();

        for bundle in bundles {
            let owner = bundle.provider_for;
            let first = owners
                .get(&owner)
                .or_else(|| staged.get(&owner))
                .map(|existing| existing.provider.clone());
            if let Some(first) = first {
                return Err(ConfigurationError::DuplicateProvider {
                    owner: owner.to_string(),
                    first,
                    second: bundle.name,
                });
            }
            let indexed = OwnerAccelerators::index(bundle)?;
            debug!(
                provider = %indexed.provider,
                owner = %owner,
                fields = indexed.fields.len(),
                methods = indexed.methods.values().map(Vec::len).sum::<usize>(),
                "registered accelerator provider"
            );
            staged.insert(owner, indexed);
        }

        owners.extend(staged);
        Ok(())
    }

    pub fn is_registered(&self, owner: TypeHandle) -> bool {
        self.owners.read().contains_key(&owner)
    }

    /// The name of the bundle registered for `owner`.
    pub fn provider(&self, owner: TypeHandle) -> Option<String> {
        self.owners.read().get(&owner).map(|o| o.provider.clone())
    }

    /// Number of owner types with a registered bundle.
    pub fn len(&self) -> usize {
        self.owners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.read().is_empty()
    }

    pub fn field(&self, owner: TypeHandle, name: &str) -> Option<FieldAccelerator> {
        self.owners.read().get(&owner)?.fields.get(name).cloned()
    }

    pub fn method_candidates(&self, owner: TypeHandle, name: &str) -> Vec<MethodAccelerator> {
        self.owners
            .read()
            .get(&owner)
            .and_then(|o| o.methods.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Picks the accelerator for method `name` with signature `parameters`.
    ///
    /// A lone candidate is used without checking its signature. Among several
    /// overloads the first one registered with exactly `parameters` wins.
    pub fn select_method(
        &self,
        owner: TypeHandle,
        name: &str,
        parameters: &[TypeHandle],
    ) -> Option<MethodAccelerator> {
        let mut candidates = self.method_candidates(owner, name);
        match candidates.len() {
            0 => None,
            1 => candidates.pop(),
            n => {
                let found = candidates
                    .into_iter()
                    .find(|c| c.parameters.as_slice() == parameters);
                match &found {
                    Some(_) => trace!(owner = %owner, method = name, "matched overload accelerator"),
                    None => warn!(
                        owner = %owner,
                        method = name,
                        candidates = n,
                        "no accelerator overload matches the method signature"
                    ),
                }
                found
            }
        }
    }
}

impl Debug for AcceleratorRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let owners = self.owners.read();
        let providers: HashSet<&str> = owners.values().map(|o| o.provider.as_str()).collect();
        f.debug_struct("AcceleratorRegistry")
            .field("providers", &providers)
            .finish()
    }
}
