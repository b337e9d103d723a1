//! Server configuration from environment variables.

use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";

/// Which origins the CORS layer allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    /// Parse a comma-separated origin list; empty or `*` allows any origin.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub cors_origins: CorsOrigins,
    /// `development` enables the `/api/dev` routes.
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origins: CorsOrigins::Any,
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    /// Environment variables:
    /// - `XPHUB_SERVER_ADDR`: listen address (default: "0.0.0.0:8000")
    /// - `XPHUB_CORS_ORIGINS`: comma-separated allowed origins (default: any)
    /// - `XPHUB_ENVIRONMENT`: "development" | "production" (default: "development")
    pub fn from_env() -> anyhow::Result<Self> {
        let addr = std::env::var("XPHUB_SERVER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .with_context(|| format!("invalid XPHUB_SERVER_ADDR: {addr}"))?;

        let cors_origins = std::env::var("XPHUB_CORS_ORIGINS")
            .map(|raw| CorsOrigins::parse(&raw))
            .unwrap_or(CorsOrigins::Any);

        let environment = std::env::var("XPHUB_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();

        Ok(Self {
            addr,
            cors_origins,
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
