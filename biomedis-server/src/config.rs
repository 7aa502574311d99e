//! Server configuration from the environment
//!
//! Environment variables:
//!   ENVIRONMENT     # development | production (default: development)
//!   HOST            # Bind address (default: 0.0.0.0)
//!   PORT            # Bind port (default: 10000)
//!   STATIC_DIR      # Static assets directory (default: app/static)
//!   TEMPLATES_DIR   # Templates directory (default: app/templates)

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::Serialize;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` (case-insensitive) is development.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:10000)
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 10000)),
            environment: Environment::Development,
            static_dir: PathBuf::from("app/static"),
            templates_dir: PathBuf::from("app/templates"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; invalid values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup("HOST") {
            Some(raw) => raw.trim().parse::<IpAddr>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "HOST is not an IP address; binding to all interfaces");
                defaults.bind_addr.ip()
            }),
            None => defaults.bind_addr.ip(),
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "PORT is not a valid port; using default");
                defaults.bind_addr.port()
            }),
            None => defaults.bind_addr.port(),
        };

        Self {
            bind_addr: SocketAddr::new(host, port),
            environment: lookup("ENVIRONMENT")
                .map(|raw| Environment::parse(&raw))
                .unwrap_or_default(),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            templates_dir: lookup("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.templates_dir),
        }
    }
}
