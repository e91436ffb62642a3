use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repository::{PortalRepository, RepositoryError};

/// Where the portal keeps its data: the `[database]` table of `portal.toml`.
///
/// `backend` selects a registered [`RepositoryFactory`]. What
/// `connection_string` means is up to that backend; for `sqlite` it is a
/// file path such as `portal.db`, a full `sqlite:` URL, or `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

/// An in-memory SQLite store, so a fresh checkout runs without setup.
impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`PortalRepository`] for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Name used in `DbConfig::backend`, e.g. `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    /// The returned store is migrated and ready for queries.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PortalRepository>, RepositoryError>;
}

/// The storage backends the portal binary was built with.
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A later factory with the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the store named by `config.backend`.
    ///
    /// # Errors
    /// [`RepositoryError::Configuration`] listing the known backends when
    /// the name is unknown. Otherwise whatever opening the store returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PortalRepository>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
