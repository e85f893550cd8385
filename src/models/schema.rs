//! Schema description models.
//!
//! A schema description is the structural definition of a model's fields and
//! validators. Model definition units produce one through a [`SchemaBuilder`].

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// Field value types understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    #[serde(rename = "objectId", alias = "objectid")]
    ObjectId,
    Array,
    Object,
    /// Any value
    Mixed,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::ObjectId => "objectId",
            Self::Array => "array",
            Self::Object => "object",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Element type for array fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<FieldType>,
}

impl FieldDefinition {
    fn new(name: String, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            unique: false,
            index: false,
            default_value: None,
            enum_values: Vec::new(),
            min: None,
            max: None,
            items: None,
        }
    }

    pub fn required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    pub fn index(&mut self) -> &mut Self {
        self.index = true;
        self
    }

    pub fn default_value(&mut self, value: serde_json::Value) -> &mut Self {
        self.default_value = Some(value);
        self
    }

    pub fn enum_values<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn min(&mut self, min: f64) -> &mut Self {
        self.min = Some(min);
        self
    }

    pub fn max(&mut self, max: f64) -> &mut Self {
        self.max = Some(max);
        self
    }

    pub fn items(&mut self, items: FieldType) -> &mut Self {
        self.items = Some(items);
        self
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("field name cannot be empty".to_string());
        }
        if self.name.starts_with('$') || self.name.contains('.') {
            return Err(format!(
                "field name '{}' cannot start with '$' or contain '.'",
                self.name
            ));
        }
        if !self.enum_values.is_empty() && self.field_type != FieldType::String {
            return Err(format!(
                "field '{}': enum values are only allowed on string fields",
                self.name
            ));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!(
                    "field '{}': min ({}) cannot exceed max ({})",
                    self.name, min, max
                ));
            }
        }
        if self.items.is_some() && self.field_type != FieldType::Array {
            return Err(format!(
                "field '{}': item type is only allowed on array fields",
                self.name
            ));
        }
        Ok(())
    }
}

/// Schema-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Explicit collection name; defaults to the model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Maintain createdAt / updatedAt
    #[serde(default)]
    pub timestamps: bool,
}

/// A validated schema description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    fields: Vec<FieldDefinition>,
    options: SchemaOptions,
}

impl SchemaDescription {
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Names of fields marked required.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}

/// Builder handed to model definition units.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDefinition>,
    options: SchemaOptions,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field and return it for further configuration.
    pub fn field(&mut self, name: impl Into<String>, field_type: FieldType) -> &mut FieldDefinition {
        self.fields.push(FieldDefinition::new(name.into(), field_type));
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    pub fn collection(&mut self, name: impl Into<String>) -> &mut Self {
        self.options.collection = Some(name.into());
        self
    }

    pub fn timestamps(&mut self, enabled: bool) -> &mut Self {
        self.options.timestamps = enabled;
        self
    }

    /// Validate and produce the schema description.
    pub fn build(self) -> DbResult<SchemaDescription> {
        let object = self
            .options
            .collection
            .clone()
            .unwrap_or_else(|| "schema".to_string());

        if let Some(collection) = &self.options.collection {
            if collection.is_empty() || collection.contains('$') {
                return Err(DbError::schema(
                    format!("invalid collection name '{}'", collection),
                    object,
                ));
            }
        }
        for (idx, field) in self.fields.iter().enumerate() {
            field
                .validate()
                .map_err(|message| DbError::schema(message, object.clone()))?;
            if self.fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(DbError::schema(
                    format!("field '{}' is defined more than once", field.name),
                    object,
                ));
            }
        }

        Ok(SchemaDescription {
            fields: self.fields,
            options: self.options,
        })
    }
}
