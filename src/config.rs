//! Dispatcher configuration.
//!
//! Plain data. Where it comes from (a file, the environment, code) is up to
//! the application; [`DispatcherConfig`] deserializes from JSON for the
//! common case:
//!
//! ```rust
//! use junction::DispatcherConfig;
//!
//! let config: DispatcherConfig = serde_json::from_str(r#"{
//!     "base_path": "/api",
//!     "allowed_origins": { "https://app.example": ["GET", "POST"] }
//! }"#).unwrap();
//! assert_eq!(config.base_path().as_deref(), Some("/api"));
//! ```

use serde::Deserialize;

use crate::cors::CorsPolicy;
use crate::method::Method;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Prefix stripped from request paths before routing, e.g. `/api`.
    pub base_path: Option<String>,
    /// Origin allow-list. Empty disables origin checks.
    pub allowed_origins: CorsPolicy,
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn allow_origin(mut self, origin: impl Into<String>, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allowed_origins = self.allowed_origins.allow(origin, methods);
        self
    }

    /// The base path with surrounding slashes normalized to one leading `/`.
    /// `None` when unset, empty, or just `/`.
    pub fn base_path(&self) -> Option<String> {
        let trimmed = self.base_path.as_deref()?.trim_matches('/');
        (!trimmed.is_empty()).then(|| format!("/{trimmed}"))
    }
}
