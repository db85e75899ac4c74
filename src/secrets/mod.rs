//! Credential lookup.

use std::collections::HashMap;

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret '{0}' is empty")]
    Empty(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, id: &str) -> Result<String, SecretError>;
}

/// Reads secrets from environment variables.
///
/// `github-token` is looked up as `GITHUB_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn variable_name(id: &str) -> String {
        id.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, id: &str) -> Result<String, SecretError> {
        let value = std::env::var(Self::variable_name(id))
            .map_err(|_| SecretError::NotFound(id.to_string()))?;
        if value.trim().is_empty() {
            return Err(SecretError::Empty(id.to_string()));
        }
        Ok(value)
    }
}

/// Fixed secrets, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, id: &str, value: &str) -> Self {
        self.secrets.insert(id.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, id: &str) -> Result<String, SecretError> {
        match self.secrets.get(id) {
            Some(value) if value.trim().is_empty() => Err(SecretError::Empty(id.to_string())),
            Some(value) => Ok(value.clone()),
            None => Err(SecretError::NotFound(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        assert_eq!(EnvSecretStore::variable_name("github-token"), "GITHUB_TOKEN");
        assert_eq!(EnvSecretStore::variable_name("ci/api.key"), "CI_API_KEY");
    }

    #[tokio::test]
    async fn test_static_store() {
        let store = StaticSecretStore::new()
            .with_secret("github-token", "abc")
            .with_secret("blank", "  ");
        assert_eq!(store.get_secret("github-token").await.unwrap(), "abc");
        assert!(matches!(store.get_secret("blank").await, Err(SecretError::Empty(_))));
        assert!(matches!(store.get_secret("nope").await, Err(SecretError::NotFound(_))));
    }
}
