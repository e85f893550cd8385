//! Compiled model handles.

use serde::Serialize;

use crate::models::schema::SchemaDescription;

/// A named, queryable handle derived from a model definition unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledModel {
    name: String,
    collection: String,
    schema: SchemaDescription,
}

impl CompiledModel {
    /// Bind a schema description to a model name.
    pub fn compile(name: impl Into<String>, schema: SchemaDescription) -> Self {
        let name = name.into();
        let collection = schema
            .options()
            .collection
            .clone()
            .unwrap_or_else(|| name.clone());
        Self {
            name,
            collection,
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection the model's documents live in.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }
}

/// Derive the canonical model name from a file base name.
///
/// The first character is lowercased (`User` -> `user`, `BlogPost` -> `blogPost`);
/// lookups depend on exactly this rule.
pub fn model_name_from_stem(stem: &str) -> String {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
