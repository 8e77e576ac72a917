use super::members::{FieldDescriptor, MethodDescriptor};
use enum_dispatch::enum_dispatch;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

#[derive(Clone, Copy, Debug)]
pub enum MemberRef<'a> {
    Field(&'a FieldDescriptor),
    Method(&'a MethodDescriptor),
}

#[enum_dispatch]
pub trait MemberPredicate {
    fn matches(&self, member: MemberRef<'_>) -> bool;
}

pub struct FieldPredicate(Box<dyn Fn(&FieldDescriptor) -> bool + Send + Sync>);

impl MemberPredicate for FieldPredicate {
    fn matches(&self, member: MemberRef<'_>) -> bool {
        match member {
            MemberRef::Field(f) => (self.0)(f),
            MemberRef::Method(_) => false,
        }
    }
}

pub struct MethodPredicate(Box<dyn Fn(&MethodDescriptor) -> bool + Send + Sync>);

impl MemberPredicate for MethodPredicate {
    fn matches(&self, member: MemberRef<'_>) -> bool {
        match member {
            MemberRef::Method(m) => (self.0)(m),
            MemberRef::Field(_) => false,
        }
    }
}

/// A member filter for the predicate queries on
/// [`TypeDescriptor`](super::TypeDescriptor).
///
/// Query results are cached per `Arc<Predicate>` allocation: running the same
/// `Arc` twice hits the cache, a second predicate built from an identical
/// closure does not.
#[enum_dispatch(MemberPredicate)]
pub enum Predicate {
    FieldPredicate,
    MethodPredicate,
}

impl Predicate {
    pub fn fields(f: impl Fn(&FieldDescriptor) -> bool + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(FieldPredicate(Box::new(f)).into())
    }

    pub fn methods(f: impl Fn(&MethodDescriptor) -> bool + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(MethodPredicate(Box::new(f)).into())
    }
}

impl Debug for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::FieldPredicate(_) => write!(f, "FieldPredicate@{:p}", self),
            Predicate::MethodPredicate(_) => write!(f, "MethodPredicate@{:p}", self),
        }
    }
}
