//! Configuration for the durable task store.

/// Connection and pool settings for the relational store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `sqlx`-style connection URL. Defaults to an in-memory SQLite
    /// database so a fresh process can run without provisioning anything;
    /// point this at a `postgres://...` URL in production.
    pub url: String,
    pub max_connections: u32,
    /// Run embedded migrations at pool creation.
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

impl StoreConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}
