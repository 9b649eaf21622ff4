use anyhow::{Context, Result};
use std::env;

/// URL scheme the collaborator HTTP pages are served behind. Selects the
/// matching WebSocket scheme in the client page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Http,
    Https,
}

impl Schema {
    pub fn websocket_scheme(self) -> &'static str {
        match self {
            Schema::Http => "ws",
            Schema::Https => "wss",
        }
    }
}

/// Server configuration sourced from the environment (`.env` supported).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub schema: Schema,
}

impl ServerConfig {
    /// Reads `HOST`, `PORT` and `SCHEMA`. All three are required; startup
    /// fails without them.
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").context("HOST is not set")?;

        let port = env::var("PORT")
            .context("PORT is not set")?
            .parse()
            .context("PORT is not a valid port number")?;

        // Anything that is not https is served plain.
        let schema = match env::var("SCHEMA").context("SCHEMA is not set")?.to_lowercase().as_str() {
            "https" => Schema::Https,
            _ => Schema::Http,
        };

        Ok(Self { host, port, schema })
    }
}
