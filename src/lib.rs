//! Cached runtime type metadata with accelerated member access.
//!
//! A [`TypeCache`] turns native type handles into shared [`TypeDescriptor`]s
//! listing each type's parent, interfaces and declared members. Descriptors
//! answer declared-only and flattened (ancestor-inclusive) lookups by name or
//! by [`Predicate`], and the member descriptors they return read, write and
//! invoke either through generic reflection over the [`native`] type system or
//! through accelerators registered in an [`AcceleratorRegistry`].
//!
//! ```
//! use fastreflect_rs::{native::TypeTable, TypeCache};
//! use std::sync::Arc;
//!
//! let cache = TypeCache::new(Arc::new(TypeTable::builtin().unwrap()));
//! let string = cache.resolve_type::<String>().unwrap();
//! let length = string.declared_field_by_name("Length").unwrap();
//! let value = length.read_as::<usize>(&String::from("four")).unwrap();
//! assert_eq!(value, 4);
//! ```
pub mod accelerators;
pub mod config;
pub mod error;
pub mod metrics;
pub mod native;
pub mod resolver;
pub mod types;

pub use accelerators::{AcceleratorRegistry, FieldAccelerator, MethodAccelerator, ProviderBundle};
pub use config::CacheConfig;
pub use error::{AccessError, ConfigurationError, DefinitionError, ReflectError, ResolutionError};
pub use metrics::CacheStats;
pub use resolver::TypeCache;
pub use types::{
    FieldDescriptor, FieldKind, MemberPredicate, MemberRef, MethodDescriptor, Predicate,
    TypeDescriptor,
};
