use serde::Deserialize;

/// Runtime configuration of the catalog service.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Path or URL of the SQLite database.
    pub database_url: String,
    /// Interface the HTTP server binds to.
    pub address: String,
    pub port: u16,
    /// Shared HS256 secret used to verify access tokens.
    pub jwt_secret: String,
}

#[cfg(feature = "server")]
impl ServerConfig {
    /// Load configuration from built-in defaults, `config/default.yaml`,
    /// `config/{APP_ENV}.yaml` and `APP_*` environment variables, later
    /// sources overriding earlier ones.
    pub fn load() -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());

        Config::builder()
            .set_default("database_url", "app.db")?
            .set_default("address", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("jwt_secret", "")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
