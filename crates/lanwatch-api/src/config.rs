//! Configuration for the HTTP server.

use serde::Deserialize;

/// Loaded from the `[server]` section of `lanwatch.toml` or
/// `LANWATCH_SERVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Browser origins allowed to call the API.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    pub fn load(file_prefix: &str) -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                // LANWATCH_SERVER__CORS_ORIGINS=http://a,http://b -> server.cors_origins
                config::Environment::with_prefix("LANWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_sources(&cfg)
    }

    /// Extract the `[server]` section; defaults only when it is absent.
    pub fn from_sources(cfg: &config::Config) -> anyhow::Result<Self> {
        match cfg.get::<ServerConfig>("server") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(ServerConfig::default()),
            Err(e) => Err(anyhow::anyhow!("Invalid [server] config: {e}")),
        }
    }
}
