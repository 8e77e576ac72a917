use super::{builtin, NativeTypeSystem, TypeBuilder, TypeDefinition, TypeHandle};
use crate::error::DefinitionError;
use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
};

/// An immutable set of [`TypeDefinition`]s, indexed by handle and by name.
pub struct TypeTable {
    types: HashMap<TypeHandle, TypeDefinition>,
    by_name: HashMap<String, TypeHandle>,
}

impl TypeTable {
    /// A builder preloaded with the built-in types.
    pub fn builder() -> TypeTableBuilder {
        builtin::register(TypeTableBuilder::empty())
    }

    /// Only the built-in types.
    pub fn builtin() -> Result<Self, DefinitionError> {
        Self::builder().build()
    }

    pub fn find(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl NativeTypeSystem for TypeTable {
    fn definition(&self, handle: TypeHandle) -> Option<&TypeDefinition> {
        self.types.get(&handle)
    }

    fn runtime_type(&self, instance: &dyn Any) -> Option<TypeHandle> {
        let id: TypeId = (*instance).type_id();
        self.types.get_key_value(&id).map(|(handle, _)| *handle)
    }
}

pub struct TypeTableBuilder {
    definitions: Vec<TypeDefinition>,
}

impl TypeTableBuilder {
    /// A builder with no types at all, not even [`Object`](super::Object).
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    pub fn register<T: ?Sized + 'static>(mut self, builder: TypeBuilder<T>) -> Self {
        self.definitions.push(builder.build());
        self
    }

    pub fn register_definition(mut self, definition: TypeDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> Result<TypeTable, DefinitionError> {
        let mut types: HashMap<TypeHandle, TypeDefinition> =
            HashMap::with_capacity(self.definitions.len());
        let mut by_name: HashMap<String, TypeHandle> =
            HashMap::with_capacity(self.definitions.len());

        for definition in self.definitions {
            if by_name.contains_key(&definition.name) || types.contains_key(&definition.handle) {
                return Err(DefinitionError::DuplicateType(definition.name));
            }
            let mut names = HashSet::new();
            let member_names = definition
                .fields
                .iter()
                .map(|f| &f.name)
                .chain(definition.properties.iter().map(|p| &p.name));
            for name in member_names {
                if !names.insert(name) {
                    return Err(DefinitionError::DuplicateMember {
                        owner: definition.name.clone(),
                        member: name.clone(),
                    });
                }
            }
            by_name.insert(definition.name.clone(), definition.handle);
            types.insert(definition.handle, definition);
        }

        let mut renames = Vec::new();
        for definition in types.values() {
            if let Some(base) = definition.base {
                if !types.contains_key(&base) {
                    return Err(DefinitionError::UnknownBase {
                        owner: definition.name.clone(),
                        base: base.to_string(),
                    });
                }
            }
            for interface in &definition.interfaces {
                match types.get(interface) {
                    None => {
                        return Err(DefinitionError::UnknownInterface {
                            owner: definition.name.clone(),
                            interface: interface.to_string(),
                        })
                    }
                    Some(def) if !def.is_interface() => {
                        return Err(DefinitionError::NotAnInterface {
                            owner: definition.name.clone(),
                            interface: def.name.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
            for (index, method) in definition.methods.iter().enumerate() {
                let Some(interface) = method.explicit_interface else {
                    continue;
                };
                let Some(interface_def) = types.get(&interface) else {
                    return Err(DefinitionError::UnknownInterface {
                        owner: definition.name.clone(),
                        interface: interface.to_string(),
                    });
                };
                renames.push((
                    definition.handle,
                    index,
                    format!("{}.{}", interface_def.name, method.name),
                ));
            }
        }

        for definition in types.values() {
            let mut seen = HashSet::new();
            let mut current = definition.base;
            while let Some(base) = current {
                if base == definition.handle || !seen.insert(base) {
                    return Err(DefinitionError::CyclicBase {
                        owner: definition.name.clone(),
                    });
                }
                current = types.get(&base).and_then(|d| d.base);
            }
        }

        for (handle, index, name) in renames {
            if let Some(definition) = types.get_mut(&handle) {
                definition.methods[index].name = name;
            }
        }

        Ok(TypeTable { types, by_name })
    }
}
