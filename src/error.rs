use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReflectError {
    #[error("Accelerator configuration failed: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Type resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Member access failed: {0}")]
    Access(#[from] AccessError),

    #[error("Type definition rejected: {0}")]
    Definition(#[from] DefinitionError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Multiple accelerator providers for {owner} ({first} and {second})")]
    DuplicateProvider {
        owner: String,
        first: String,
        second: String,
    },
    #[error("Provider {bundle} declares field accelerator {field} more than once")]
    DuplicateFieldAccelerator { bundle: String, field: String },
    #[error("Provider {bundle} has a malformed entry: {reason}")]
    MalformedEntry { bundle: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("Type is not known to the native type system: {0}")]
    UnknownType(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error("{member} cannot be written")]
    ReadOnly { member: String },
    #[error("{member} cannot be read")]
    NotReadable { member: String },
    #[error("Target mismatch: expected {expected}, got {actual}")]
    TargetMismatch { expected: String, actual: String },
    #[error("Value type mismatch: expected {expected}")]
    ValueType { expected: String },
    #[error("Wrong argument count: expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("Argument {index} is not a {expected}")]
    ArgumentType { index: usize, expected: String },
    #[error("No member {member} on {owner}")]
    MissingMember { owner: String, member: String },
    #[error("{method} has no implementation for {target}")]
    Abstract { method: String, target: String },
    #[error("Type is not known to the native type system: {0}")]
    UnknownType(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Type {0} registered twice")]
    DuplicateType(String),
    #[error("{owner} is its own ancestor")]
    CyclicBase { owner: String },
    #[error("{owner} extends unregistered type {base}")]
    UnknownBase { owner: String, base: String },
    #[error("{owner} implements unregistered interface {interface}")]
    UnknownInterface { owner: String, interface: String },
    #[error("{owner} implements {interface}, which is not an interface")]
    NotAnInterface { owner: String, interface: String },
    #[error("{owner} declares {member} more than once")]
    DuplicateMember { owner: String, member: String },
}
