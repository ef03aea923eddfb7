use crate::document::Schema;
use crate::error::ResolveError;
use std::collections::{BTreeMap, HashSet};

/// Dereferences `$ref` schemas against `components.schemas`
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    schemas: &'a BTreeMap<String, Schema>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(schemas: &'a BTreeMap<String, Schema>) -> Self {
        Self { schemas }
    }

    /// Resolve a schema to a concrete (typed or composed) node.
    ///
    /// Reference chains are followed until a non-reference schema is reached;
    /// revisiting a name fails with [`ResolveError::CyclicReference`].
    pub fn resolve<'s>(&self, schema: &'s Schema) -> Result<&'s Schema, ResolveError>
    where
        'a: 's,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = schema;

        while let Schema::Reference(name) = current {
            if !visited.insert(name.as_str()) {
                return Err(ResolveError::CyclicReference(name.clone()));
            }
            current = self
                .schemas
                .get(name)
                .ok_or_else(|| ResolveError::MissingReference(name.clone()))?;
        }

        match current {
            Schema::Untyped => Err(ResolveError::InvalidSchema),
            concrete => Ok(concrete),
        }
    }
}
