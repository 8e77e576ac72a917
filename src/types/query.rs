//! Declared and flattened member lookups.
//!
//! Each index is built on first use and then kept for the lifetime of the
//! descriptor. Declared and flattened indices are independent; a flattened
//! lookup never forces the declared index of the same type and vice versa.
use super::{
    predicate::{MemberPredicate, MemberRef, Predicate},
    FieldDescriptor, MethodDescriptor, TypeBody, TypeDescriptor,
};
use crate::{metrics::CacheMetrics, native::TypeHandle};
use dashmap::DashMap;
use std::{collections::HashMap, sync::Arc};

pub(crate) struct DeclaredIndex {
    fields: HashMap<String, Arc<FieldDescriptor>>,
    methods: HashMap<String, Vec<Arc<MethodDescriptor>>>,
}

impl DeclaredIndex {
    fn build(body: &TypeBody) -> Self {
        let fields = body
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.clone()))
            .collect();
        let mut methods: HashMap<String, Vec<Arc<MethodDescriptor>>> = HashMap::new();
        for method in &body.methods {
            methods
                .entry(method.name.clone())
                .or_default()
                .push(method.clone());
        }
        Self { fields, methods }
    }
}

pub(crate) struct FlattenedIndex {
    fields: HashMap<String, Vec<Arc<FieldDescriptor>>>,
    methods: HashMap<String, Vec<Arc<MethodDescriptor>>>,
}

impl FlattenedIndex {
    fn build(ty: &TypeDescriptor) -> Self {
        let mut fields: HashMap<String, Vec<Arc<FieldDescriptor>>> = HashMap::new();
        let mut methods: HashMap<String, Vec<Arc<MethodDescriptor>>> = HashMap::new();
        for level in ty.ancestors() {
            for field in level.fields() {
                fields.entry(field.name.clone()).or_default().push(field.clone());
            }
            for method in level.methods() {
                methods
                    .entry(method.name.clone())
                    .or_default()
                    .push(method.clone());
            }
        }
        Self { fields, methods }
    }
}

/// Query results keyed by predicate identity.
///
/// Each entry holds on to its predicate so the allocation backing the key
/// stays alive as long as the entry does.
pub(crate) struct PredicateCache<T> {
    entries: DashMap<usize, (Arc<Predicate>, Arc<[Arc<T>]>)>,
}

impl<T> Default for PredicateCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T> PredicateCache<T> {
    fn get_or_build(
        &self,
        predicate: &Arc<Predicate>,
        metrics: Option<&CacheMetrics>,
        build: impl FnOnce() -> Vec<Arc<T>>,
    ) -> Arc<[Arc<T>]> {
        let key = Arc::as_ptr(predicate) as usize;
        if let Some(entry) = self.entries.get(&key) {
            if let Some(m) = metrics {
                m.record_predicate_hit();
            }
            return entry.1.clone();
        }
        if let Some(m) = metrics {
            m.record_predicate_miss();
        }
        // the predicate runs without holding the shard lock
        let result: Arc<[Arc<T>]> = build().into();
        self.entries
            .entry(key)
            .or_insert_with(|| (predicate.clone(), result))
            .1
            .clone()
    }
}

impl TypeDescriptor {
    fn declared_index(&self) -> Option<&DeclaredIndex> {
        let body = self.body.get()?;
        Some(self.declared.get_or_init(|| {
            if let Some(m) = &self.metrics {
                m.record_index_build();
            }
            DeclaredIndex::build(body)
        }))
    }

    fn flattened_index(&self) -> Option<&FlattenedIndex> {
        if !self.is_initialized() {
            return None;
        }
        Some(self.flattened.get_or_init(|| {
            if let Some(m) = &self.metrics {
                m.record_index_build();
            }
            FlattenedIndex::build(self)
        }))
    }

    pub fn declared_field_by_name(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.declared_index()?.fields.get(name)
    }

    /// Every overload of `name` declared on this type.
    pub fn declared_methods_by_name(&self, name: &str) -> &[Arc<MethodDescriptor>] {
        self.declared_index()
            .and_then(|i| i.methods.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fields named `name` on this type and every ancestor, derived first.
    pub fn flattened_fields_by_name(&self, name: &str) -> &[Arc<FieldDescriptor>] {
        self.flattened_index()
            .and_then(|i| i.fields.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn flattened_methods_by_name(&self, name: &str) -> &[Arc<MethodDescriptor>] {
        self.flattened_index()
            .and_then(|i| i.methods.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn declared_fields_by_predicate(&self, predicate: &Arc<Predicate>) -> Arc<[Arc<FieldDescriptor>]> {
        if !self.is_initialized() {
            return Vec::new().into();
        }
        self.declared_field_predicates
            .get_or_build(predicate, self.metrics.as_deref(), || {
                filter_fields(self.fields(), predicate)
            })
    }

    pub fn declared_methods_by_predicate(
        &self,
        predicate: &Arc<Predicate>,
    ) -> Arc<[Arc<MethodDescriptor>]> {
        if !self.is_initialized() {
            return Vec::new().into();
        }
        self.declared_method_predicates
            .get_or_build(predicate, self.metrics.as_deref(), || {
                filter_methods(self.methods(), predicate)
            })
    }

    pub fn flattened_fields_by_predicate(
        &self,
        predicate: &Arc<Predicate>,
    ) -> Arc<[Arc<FieldDescriptor>]> {
        if !self.is_initialized() {
            return Vec::new().into();
        }
        self.flattened_field_predicates
            .get_or_build(predicate, self.metrics.as_deref(), || {
                self.ancestors()
                    .flat_map(|level| filter_fields(level.fields(), predicate))
                    .collect()
            })
    }

    pub fn flattened_methods_by_predicate(
        &self,
        predicate: &Arc<Predicate>,
    ) -> Arc<[Arc<MethodDescriptor>]> {
        if !self.is_initialized() {
            return Vec::new().into();
        }
        self.flattened_method_predicates
            .get_or_build(predicate, self.metrics.as_deref(), || {
                self.ancestors()
                    .flat_map(|level| filter_methods(level.methods(), predicate))
                    .collect()
            })
    }

    /// The implemented interface with handle `handle`, if any.
    pub fn interface(&self, handle: TypeHandle) -> Option<Arc<TypeDescriptor>> {
        self.interfaces().find(|i| i.raw_type() == handle)
    }

    pub fn interface_of<I: ?Sized + 'static>(&self) -> Option<Arc<TypeDescriptor>> {
        self.interface(TypeHandle::of::<I>())
    }
}

fn filter_fields(fields: &[Arc<FieldDescriptor>], predicate: &Predicate) -> Vec<Arc<FieldDescriptor>> {
    fields
        .iter()
        .filter(|f| predicate.matches(MemberRef::Field(f)))
        .cloned()
        .collect()
}

fn filter_methods(
    methods: &[Arc<MethodDescriptor>],
    predicate: &Predicate,
) -> Vec<Arc<MethodDescriptor>> {
    methods
        .iter()
        .filter(|m| predicate.matches(MemberRef::Method(m)))
        .cloned()
        .collect()
}
