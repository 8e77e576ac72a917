use crate::{
    metrics::CacheMetrics,
    native::{TypeDefinition, TypeHandle, TypeKind},
};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock, Weak},
};

pub mod members;
pub mod predicate;
mod query;

pub use members::{FieldDescriptor, FieldKind, MethodDescriptor};
pub use predicate::{FieldPredicate, MemberPredicate, MemberRef, MethodPredicate, Predicate};

use query::{DeclaredIndex, FlattenedIndex, PredicateCache};

pub(crate) struct TypeBody {
    pub(crate) parent: Option<Arc<TypeDescriptor>>,
    // Interface graphs may be cyclic; the owning cache keeps them alive.
    pub(crate) interfaces: Vec<Weak<TypeDescriptor>>,
    pub(crate) fields: Vec<Arc<FieldDescriptor>>,
    pub(crate) methods: Vec<Arc<MethodDescriptor>>,
}

static EMPTY_BODY: TypeBody = TypeBody {
    parent: None,
    interfaces: Vec::new(),
    fields: Vec::new(),
    methods: Vec::new(),
};

/// Cached metadata for one native type.
///
/// A descriptor is inserted into its [`TypeCache`](crate::TypeCache) before
/// its body is filled in, so code running during resolution of the same type
/// can observe it uninitialized (with no parent, interfaces or members). Once
/// resolution returns the descriptor never changes again.
pub struct TypeDescriptor {
    raw_type: TypeHandle,
    name: String,
    kind: TypeKind,
    body: OnceLock<TypeBody>,
    declared: OnceLock<DeclaredIndex>,
    flattened: OnceLock<FlattenedIndex>,
    declared_field_predicates: PredicateCache<FieldDescriptor>,
    declared_method_predicates: PredicateCache<MethodDescriptor>,
    flattened_field_predicates: PredicateCache<FieldDescriptor>,
    flattened_method_predicates: PredicateCache<MethodDescriptor>,
    metrics: Option<Arc<CacheMetrics>>,
}

impl TypeDescriptor {
    pub(crate) fn placeholder(definition: &TypeDefinition, metrics: Option<Arc<CacheMetrics>>) -> Self {
        Self {
            raw_type: definition.handle,
            name: definition.name.clone(),
            kind: definition.kind,
            body: OnceLock::new(),
            declared: OnceLock::new(),
            flattened: OnceLock::new(),
            declared_field_predicates: PredicateCache::default(),
            declared_method_predicates: PredicateCache::default(),
            flattened_field_predicates: PredicateCache::default(),
            flattened_method_predicates: PredicateCache::default(),
            metrics,
        }
    }

    /// Fills in the body. Only the first call has any effect.
    pub(crate) fn initialize(&self, body: TypeBody) {
        let _ = self.body.set(body);
    }

    fn body(&self) -> &TypeBody {
        self.body.get().unwrap_or(&EMPTY_BODY)
    }

    pub fn raw_type(&self) -> TypeHandle {
        self.raw_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_value_type(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    pub fn is_initialized(&self) -> bool {
        self.body.get().is_some()
    }

    pub fn parent(&self) -> Option<&Arc<TypeDescriptor>> {
        self.body().parent.as_ref()
    }

    /// Every interface implemented by this type or one of its ancestors.
    ///
    /// Interface links do not keep their targets alive: once the owning
    /// [`TypeCache`](crate::TypeCache) is dropped this yields nothing.
    pub fn interfaces(&self) -> impl Iterator<Item = Arc<TypeDescriptor>> + '_ {
        self.body().interfaces.iter().filter_map(Weak::upgrade)
    }

    /// Fields and properties declared directly on this type.
    pub fn fields(&self) -> &[Arc<FieldDescriptor>] {
        &self.body().fields
    }

    /// Methods declared directly on this type.
    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.body().methods
    }

    /// This type followed by its parent, its parent's parent and so on.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a TypeDescriptor>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TypeDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent().map(|p| p.as_ref());
        Some(current)
    }
}

impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.name)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const TypeDescriptor).hash(state);
    }
}
