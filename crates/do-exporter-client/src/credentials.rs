use std::fmt;

use do_exporter_common::error::{ExporterError, Result};

/// Supplies the bearer token attached to every outbound API request.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<String>;
}

#[derive(Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ExporterError::Config("API token must not be empty".to_string()));
        }
        Ok(Self { token })
    }

    pub fn from_env(var: &str) -> Result<Self> {
        let value = std::env::var(var).unwrap_or_default();
        if value.trim().is_empty() {
            return Err(ExporterError::Config(format!("missing {var} env variable")));
        }
        Self::new(value)
    }
}

impl fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenSource")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TokenSource for StaticTokenSource {
    fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
