//! Store handle.
//!
//! A [`Store`] ties configuration, the model registry, the connection and the
//! transaction coordinator together for one named document store. Its lifecycle
//! is explicit: `Constructed → Initialized → Connected → Closed`.

use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ConfigSlots, StoreConfig, StoreConfigInput};
use crate::db::{
    ConnectionManager, LoadReport, ModelLoader, ModelRegistry, SchemaProvider, StoreClient,
    StoreDriver, TransactionCoordinator, TransactionSession,
};
use crate::error::{DbError, DbResult};
use crate::models::{
    CompiledModel, ConnectionInfo, StoreState, TransactionMetadata, TransactionOptions,
};

/// Transaction session type handed to units of work on a store backed by `D`.
pub type SessionOf<D> =
    TransactionSession<<<D as StoreDriver>::Client as StoreClient>::Session>;

/// What `add_model_path` did with the path.
#[derive(Debug, Clone)]
pub enum ModelPathOutcome {
    /// Stored for loading during `init`
    Queued,
    /// Loaded and registered immediately
    Loaded(LoadReport),
}

pub struct Store<D: StoreDriver> {
    name: String,
    state: StoreState,
    root: PathBuf,
    config: Option<StoreConfig>,
    pending_paths: Vec<PathBuf>,
    registry: ModelRegistry,
    loader: ModelLoader,
    connection: ConnectionManager<D>,
    coordinator: TransactionCoordinator,
    slots: ConfigSlots,
}

impl<D: StoreDriver> std::fmt::Debug for Store<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("root", &self.root)
            .field("models", &self.registry.len())
            .field("pending_paths", &self.pending_paths)
            .field("connection", &self.connection)
            .finish()
    }
}

impl<D: StoreDriver> Store<D> {
    /// Create a store rooted at the current directory.
    pub fn new(name: impl Into<String>, driver: D) -> Self {
        let name = name.into();
        let root = PathBuf::from(".");
        Self {
            state: StoreState::Constructed,
            config: None,
            pending_paths: Vec::new(),
            registry: ModelRegistry::new(name.clone()),
            loader: ModelLoader::new(name.clone(), root.clone()),
            connection: ConnectionManager::new(name.clone(), driver),
            coordinator: TransactionCoordinator::new(name.clone()),
            slots: ConfigSlots::new(),
            root,
            name,
        }
    }

    /// Set the project root that relative model paths resolve against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self.loader = ModelLoader::new(self.name.clone(), self.root.clone());
        self
    }

    /// Publish into a shared set of config slots instead of a private one.
    pub fn with_config_slots(mut self, slots: ConfigSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Merged configuration, available after `init`.
    pub fn config(&self) -> Option<&StoreConfig> {
        self.config.as_ref()
    }

    pub fn config_slots(&self) -> &ConfigSlots {
        &self.slots
    }

    /// Key under which the merged configuration is published.
    pub fn config_slot_key(&self) -> String {
        format!("store.{}", self.name)
    }

    /// Merge configuration, publish it, and load every configured model path.
    ///
    /// Per-model failures are reported in the returned [`LoadReport`], not as errors.
    pub fn init(&mut self, input: StoreConfigInput) -> DbResult<LoadReport> {
        if self.state != StoreState::Constructed {
            return Err(DbError::invalid_state(format!(
                "Store '{}' is already {}",
                self.name, self.state
            )));
        }

        let pending = std::mem::take(&mut self.pending_paths);
        let config = StoreConfig::merge(input, &self.root, &pending);
        self.slots.publish(self.config_slot_key(), &config.masked())?;

        let mut report = LoadReport::default();
        for path in &config.path.models {
            report.merge(self.loader.load_model(path, &mut self.registry));
        }

        info!(
            store = %self.name,
            models = self.registry.len(),
            skipped = report.skipped.len(),
            "Store initialized"
        );

        self.config = Some(config);
        self.state = StoreState::Initialized;
        Ok(report)
    }

    /// Queue `path` before initialization, or load it right away afterwards.
    pub fn add_model_path(&mut self, path: impl AsRef<Path>) -> DbResult<ModelPathOutcome> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(DbError::invalid_input("Model path cannot be empty"));
        }

        if self.state == StoreState::Constructed {
            debug!(store = %self.name, path = %path.display(), "Queued model path");
            self.pending_paths.push(path.to_path_buf());
            return Ok(ModelPathOutcome::Queued);
        }

        let report = self.loader.load_model(path, &mut self.registry);
        if let Some(config) = self.config.as_mut() {
            config.path.models.push(path.to_path_buf());
        }
        Ok(ModelPathOutcome::Loaded(report))
    }

    /// Load every model definition found at `path`.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> LoadReport {
        self.loader.load_model(path.as_ref(), &mut self.registry)
    }

    /// Register an already compiled model.
    pub fn add_model(&mut self, model: CompiledModel) -> DbResult<&CompiledModel> {
        self.registry.add_model(model)
    }

    /// Compile and register a code-defined model.
    pub fn register_provider(
        &mut self,
        name: &str,
        provider: &dyn SchemaProvider,
    ) -> DbResult<&CompiledModel> {
        self.loader.load_provider(name, provider, &mut self.registry)
    }

    pub fn model(&self, name: &str) -> Option<&CompiledModel> {
        self.registry.model(name)
    }

    pub fn models(&self) -> &BTreeMap<String, CompiledModel> {
        self.registry.models()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Connect. Succeeds immediately when already connected.
    pub async fn run(&mut self) -> DbResult<ConnectionInfo> {
        let slot_key = self.config_slot_key();
        let config = match self.state {
            StoreState::Constructed => {
                return Err(DbError::invalid_state(format!(
                    "Store '{}' must be initialized before connecting",
                    self.name
                )));
            }
            StoreState::Closed => {
                return Err(DbError::invalid_state(format!(
                    "Store '{}' is closed",
                    self.name
                )));
            }
            StoreState::Initialized | StoreState::Connected => self
                .config
                .as_mut()
                .ok_or_else(|| DbError::internal("Initialized store has no configuration"))?,
        };

        let info = self.connection.run(config).await?;
        self.slots.publish(slot_key, &config.masked())?;
        self.state = StoreState::Connected;
        Ok(info)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.connection.info()
    }

    /// The driver client, once connected.
    pub fn client(&self) -> Option<&D::Client> {
        self.connection.client()
    }

    pub fn driver(&self) -> &D {
        self.connection.driver()
    }

    /// Run `unit_of_work` inside a transaction on the established connection.
    ///
    /// See [`TransactionCoordinator::run`] for settlement rules.
    pub async fn transaction<F, R, E>(
        &self,
        options: TransactionOptions,
        unit_of_work: F,
    ) -> Result<R, E>
    where
        F: for<'s> FnOnce(&'s mut SessionOf<D>) -> BoxFuture<'s, Result<R, E>> + Send,
        R: Send,
        E: From<DbError> + Send,
    {
        let client = self
            .connection
            .client()
            .ok_or_else(|| E::from(DbError::not_connected(&self.name)))?;
        self.coordinator.run(client, options, unit_of_work).await
    }

    /// In-flight transactions, oldest first.
    pub fn active_transactions(&self) -> Vec<TransactionMetadata> {
        self.coordinator.list_active()
    }

    /// Close the connection. The store cannot be reconnected afterwards.
    pub async fn close(&mut self) {
        self.connection.close().await;
        if self.state != StoreState::Closed {
            info!(store = %self.name, "Store closed");
        }
        self.state = StoreState::Closed;
    }
}
