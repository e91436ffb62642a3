use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use portal_core::db::{DbConfig, PortalRepository, RepositoryError, RepositoryFactory};

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`PORTAL_DB_SQLITE_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if the directory exists in the current working directory.
/// 3. **Crate manifest dir**, `$CARGO_MANIFEST_DIR/seeds`, as last resort.
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PORTAL_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`RepositoryFactory`] for SQLite.
///
/// ```rust,no_run
/// use portal_core::db::RepositoryRegistry;
/// use portal_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens `config.connection_string`, then applies migrations and seeds.
    ///
    /// Accepted values: a bare file path (`"portal.db"`, created if
    /// missing), a sqlx URL (`"sqlite:portal.db"`) or `":memory:"`.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PortalRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{:#}", e)))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        let seeds = seeds_dir();
        if seeds.is_dir() {
            repo.run_seeds(&seeds)
                .await
                .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;
        }

        info!(connection = %config.connection_string, "opened sqlite repository");
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use portal_core::db::{BracketRepository, DbConfig, RepositoryFactory};

    use super::SqliteRepositoryFactory;

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRepositoryFactory.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn creates_in_memory_repository() {
        let config = DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        };

        let repo = SqliteRepositoryFactory
            .create(&config)
            .await
            .expect("failed to create in-memory repository");

        let brackets = repo
            .get_tax_brackets("112233445566778899")
            .await
            .expect("seeded brackets should be readable");
        assert!(!brackets.is_empty());
    }

    #[tokio::test]
    async fn unreachable_path_is_a_connection_error() {
        let config = DbConfig {
            backend: "sqlite".to_string(),
            connection_string: "/nonexistent-dir/portal.db".to_string(),
        };

        let result = SqliteRepositoryFactory.create(&config).await;

        assert!(matches!(result, Err(portal_core::RepositoryError::Connection(_))));
    }
}
