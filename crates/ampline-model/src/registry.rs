//! Model construction from files.
//!
//! The bridge never parses model files itself. It is handed a [`ModelFactory`]
//! at construction time; [`ModelRegistry`] is the stock implementation, which
//! reads the file, sniffs the JSON header for an `architecture` name and hands
//! the document to whichever constructor was registered for it.

use crate::error::{ModelLoadError, Result};
use crate::unit::{InferenceUnit, ModelRuntime, UnitRuntime};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds a runtime for a model file. Called on a control thread.
pub trait ModelFactory: Send + Sync {
    fn construct(&self, path: &Path) -> Result<Box<dyn ModelRuntime>>;
}

/// Fields every model file is expected to carry. Everything else belongs to
/// the architecture's own parser.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelHeader {
    pub architecture: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<f64>,
}

/// A model file that has been read and whose header parsed.
#[derive(Debug, Clone)]
pub struct ModelDocument {
    pub path: PathBuf,
    pub header: ModelHeader,
    pub raw: String,
}

impl ModelDocument {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ModelLoadError::NotFound(path.to_path_buf()),
            _ => ModelLoadError::parse_failed(path, e),
        })?;

        let header: ModelHeader =
            serde_json::from_str(&raw).map_err(|e| ModelLoadError::parse_failed(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            header,
            raw,
        })
    }
}

/// Function that builds a runtime from a parsed document.
pub type ModelConstructor =
    Arc<dyn Fn(&ModelDocument) -> Result<Box<dyn ModelRuntime>> + Send + Sync>;

/// Architecture name → constructor. Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    constructors: Arc<RwLock<HashMap<String, ModelConstructor>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for an architecture.
    ///
    /// # Example
    /// ```ignore
    /// registry.register("LSTM", |doc| LstmUnit::from_json(&doc.raw));
    /// ```
    pub fn register<U, F>(&self, architecture: impl Into<String>, constructor: F)
    where
        U: InferenceUnit,
        F: Fn(&ModelDocument) -> Result<U> + Send + Sync + 'static,
    {
        self.register_runtime(architecture, move |doc| {
            Ok(Box::new(UnitRuntime::new(constructor(doc)?)) as Box<dyn ModelRuntime>)
        });
    }

    /// Register a constructor that builds its own [`ModelRuntime`].
    pub fn register_runtime<F>(&self, architecture: impl Into<String>, constructor: F)
    where
        F: Fn(&ModelDocument) -> Result<Box<dyn ModelRuntime>> + Send + Sync + 'static,
    {
        let key = architecture.into().to_lowercase();
        tracing::debug!("Registered model architecture: {}", key);
        self.constructors.write().insert(key, Arc::new(constructor));
    }

    pub fn unregister(&self, architecture: &str) -> bool {
        self.constructors
            .write()
            .remove(&architecture.to_lowercase())
            .is_some()
    }

    pub fn has_architecture(&self, architecture: &str) -> bool {
        self.constructors
            .read()
            .contains_key(&architecture.to_lowercase())
    }

    pub fn architectures(&self) -> Vec<String> {
        let mut names: Vec<_> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ModelFactory for ModelRegistry {
    fn construct(&self, path: &Path) -> Result<Box<dyn ModelRuntime>> {
        let doc = ModelDocument::read(path)?;

        // Clone out so a slow parser doesn't hold the read lock.
        let constructor = self
            .constructors
            .read()
            .get(&doc.header.architecture.to_lowercase())
            .cloned()
            .ok_or_else(|| ModelLoadError::UnknownArchitecture(doc.header.architecture.clone()))?;

        constructor(&doc)
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("architectures", &self.architectures())
            .finish()
    }
}
