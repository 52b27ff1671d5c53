//! Scratch Postgres databases for the ignored integration tests.
//!
//! Each test that writes gets its own database, migrated to the current
//! schema, named `talentvote_test_<suffix>`, and dropped when the test ends.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// Where the test server lives, read from `TEST_DB_*` variables.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database [`TestDatabase::connect`] opens.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "talentvote_test"),
            password: env_or("TEST_DB_PASSWORD", "talentvote_test"),
            database: env_or("TEST_DB_NAME", "talentvote_test"),
        }
    }
}

impl TestDbConfig {
    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }

    /// URL of the configured database.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// URL of the maintenance database, used to create and drop scratch ones.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        self.url_for("postgres")
    }

    async fn on_server(&self, sql: String) -> Result<(), DbErr> {
        let admin = Database::connect(&self.postgres_url()).await?;
        admin
            .execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await?;
        admin.close().await
    }
}

/// A database owned by one test.
pub struct TestDatabase {
    conn: DatabaseConnection,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Open the configured database as is, without creating or migrating it.
    pub async fn connect(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Ok(Self { conn, config })
    }

    /// Create a uniquely named database and migrate it.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("talentvote_test_{}", &suffix[..12]);

        config
            .on_server(format!("CREATE DATABASE \"{}\"", config.database))
            .await?;

        let db = Self::connect(config).await?;
        Migrator::up(&db.conn, None).await?;
        info!(database = %db.config.database, "Created scratch database");
        Ok(db)
    }

    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Close the connection and drop the database, ending any other sessions
    /// still attached to it.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close().await?;
        self.config
            .on_server(format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                self.config.database
            ))
            .await?;
        info!(database = %self.config.database, "Dropped scratch database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_share_credentials() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5433,
            username: "tv".to_string(),
            password: "secret".to_string(),
            database: "talentvote_test_abc".to_string(),
        };

        assert_eq!(
            config.database_url(),
            "postgres://tv:secret@db:5433/talentvote_test_abc"
        );
        assert_eq!(config.postgres_url(), "postgres://tv:secret@db:5433/postgres");
    }
}
