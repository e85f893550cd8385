//! Model definition loading.
//!
//! Model definition units are discovered on the filesystem (one `.json` file per
//! model) or registered from code. Every unit goes through the same
//! [`SchemaProvider`] interface and is compiled into a [`CompiledModel`].
//!
//! Loading is resilient per unit: a malformed file is logged and skipped, it never
//! aborts the rest of the batch.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::db::registry::ModelRegistry;
use crate::error::{DbError, DbResult};
use crate::models::{
    CompiledModel, FieldType, SchemaBuilder, SchemaDescription, model_name_from_stem,
};

/// File extension of model definition files.
pub const MODEL_FILE_EXTENSION: &str = "json";

/// A model definition unit.
pub trait SchemaProvider {
    /// Describe the model's schema using the supplied builder.
    fn build(&self, builder: SchemaBuilder) -> DbResult<SchemaDescription>;
}

impl<F> SchemaProvider for F
where
    F: Fn(SchemaBuilder) -> DbResult<SchemaDescription>,
{
    fn build(&self, builder: SchemaBuilder) -> DbResult<SchemaDescription> {
        self(builder)
    }
}

/// Why a candidate produced no model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be read or parsed
    Unreadable,
    /// The file defines `null`; skipped on purpose
    Empty,
    /// The file does not hold a definition object
    NotADefinition,
    /// The definition does not describe a valid schema
    InvalidSchema,
    /// A model with the same name is already registered
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct SkippedModel {
    pub path: PathBuf,
    pub model_name: String,
    pub reason: SkipReason,
    pub message: String,
}

/// Outcome of loading one or more paths.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Names of registered models, in load order
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedModel>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.skipped.extend(other.skipped);
    }

    pub fn is_clean(&self) -> bool {
        self.skipped
            .iter()
            .all(|s| s.reason == SkipReason::Empty)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    timestamps: bool,
    #[serde(default)]
    fields: BTreeMap<String, FieldSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldSpec {
    Short(FieldType),
    Full(FullFieldSpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FullFieldSpec {
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    index: bool,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default, rename = "enum")]
    enum_values: Vec<String>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    items: Option<FieldType>,
}

/// A model definition unit backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSchemaProvider {
    path: PathBuf,
    definition: serde_json::Map<String, serde_json::Value>,
}

impl FileSchemaProvider {
    /// Read a model file.
    ///
    /// Returns `Ok(None)` when the file defines `null`, which marks a unit to skip.
    pub fn open(path: &Path) -> Result<Option<Self>, (SkipReason, DbError)> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            (
                SkipReason::Unreadable,
                DbError::model_load(&display, e.to_string()),
            )
        })?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            (
                SkipReason::Unreadable,
                DbError::model_load(&display, format!("malformed JSON: {}", e)),
            )
        })?;

        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(definition) => Ok(Some(Self {
                path: path.to_path_buf(),
                definition,
            })),
            other => Err((
                SkipReason::NotADefinition,
                DbError::model_load(
                    &display,
                    format!(
                        "must define a schema object, found {}",
                        json_kind(&other)
                    ),
                ),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaProvider for FileSchemaProvider {
    fn build(&self, mut builder: SchemaBuilder) -> DbResult<SchemaDescription> {
        let object = self.path.display().to_string();
        let file: ModelFile =
            serde_json::from_value(serde_json::Value::Object(self.definition.clone()))
                .map_err(|e| DbError::schema(e.to_string(), &object))?;

        if let Some(collection) = file.collection {
            builder.collection(collection);
        }
        builder.timestamps(file.timestamps);

        for (name, spec) in file.fields {
            match spec {
                FieldSpec::Short(field_type) => {
                    builder.field(name, field_type);
                }
                FieldSpec::Full(spec) => {
                    let field = builder.field(name, spec.field_type);
                    if spec.required {
                        field.required();
                    }
                    if spec.unique {
                        field.unique();
                    }
                    if spec.index {
                        field.index();
                    }
                    if let Some(default) = spec.default {
                        field.default_value(default);
                    }
                    if !spec.enum_values.is_empty() {
                        field.enum_values(spec.enum_values);
                    }
                    if let Some(min) = spec.min {
                        field.min(min);
                    }
                    if let Some(max) = spec.max {
                        field.max(max);
                    }
                    if let Some(items) = spec.items {
                        field.items(items);
                    }
                }
            }
        }

        builder.build()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Run a unit and bind its schema to `name`.
pub fn compile_model(name: &str, provider: &dyn SchemaProvider) -> DbResult<CompiledModel> {
    let schema = provider.build(SchemaBuilder::new())?;
    Ok(CompiledModel::compile(name, schema))
}

/// Resolves model paths and feeds compiled models into a registry.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    store: String,
    root: PathBuf,
}

impl ModelLoader {
    /// Create a loader; relative paths resolve against `root`.
    pub fn new(store: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every model definition found at `path` into `registry`.
    pub fn load_model(&self, path: &Path, registry: &mut ModelRegistry) -> LoadReport {
        let path = self.resolve(path);
        let mut report = LoadReport::default();

        for candidate in candidate_files(&path) {
            let model_name = candidate
                .file_stem()
                .map(|stem| model_name_from_stem(&stem.to_string_lossy()))
                .unwrap_or_default();

            let provider = match FileSchemaProvider::open(&candidate) {
                Ok(Some(provider)) => provider,
                Ok(None) => {
                    debug!(store = %self.store, path = %candidate.display(), "Skipping empty model definition");
                    report.skipped.push(SkippedModel {
                        path: candidate,
                        model_name,
                        reason: SkipReason::Empty,
                        message: "model definition is null".to_string(),
                    });
                    continue;
                }
                Err((reason, e)) => {
                    error!(store = %self.store, path = %candidate.display(), error = %e, "Could not load model");
                    report.skipped.push(SkippedModel {
                        path: candidate,
                        model_name,
                        reason,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let outcome = compile_model(&model_name, &provider)
                .map_err(|e| (SkipReason::InvalidSchema, e))
                .and_then(|model| {
                    registry
                        .add_model(model)
                        .map(|m| m.name().to_string())
                        .map_err(|e| (SkipReason::Duplicate, e))
                });

            match outcome {
                Ok(name) => {
                    debug!(store = %self.store, model = %name, path = %candidate.display(), "Model registered");
                    report.loaded.push(name);
                }
                Err((reason, e)) => {
                    if reason == SkipReason::InvalidSchema {
                        error!(
                            store = %self.store,
                            path = %candidate.display(),
                            error = %e,
                            "Model must describe a valid schema"
                        );
                    }
                    report.skipped.push(SkippedModel {
                        path: candidate,
                        model_name,
                        reason,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            store = %self.store,
            path = %path.display(),
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Loaded models"
        );
        report
    }

    /// Load a code-registered unit under `name`.
    pub fn load_provider<'r>(
        &self,
        name: &str,
        provider: &dyn SchemaProvider,
        registry: &'r mut ModelRegistry,
    ) -> DbResult<&'r CompiledModel> {
        let model = compile_model(name, provider).inspect_err(|e| {
            error!(store = %self.store, model = %name, error = %e, "Model must describe a valid schema");
        })?;
        registry.add_model(model)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// A file is its own single candidate; anything else is scanned as a directory.
fn candidate_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    if !path.is_dir() {
        warn!(path = %path.display(), "Model path does not exist");
        return Vec::new();
    }

    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "Cannot read model directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == MODEL_FILE_EXTENSION)
        })
        .map(|entry| entry.into_path())
        .collect()
}
