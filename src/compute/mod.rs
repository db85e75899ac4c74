//! Resource configuration for the pipeline's serverless functions.
//!
//! # Responsibilities
//! - Report the memory allocation of a named function
//! - Apply a new allocation
//!
//! The platform ceiling is enforced by the caller, not by implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

/// Current allocation of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionConfig {
    pub memory_mb: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("function '{0}' not found")]
    NotFound(String),

    #[error("resource configuration service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ResourceConfigService: Send + Sync {
    async fn get_config(&self, function_name: &str) -> Result<FunctionConfig, ComputeError>;

    async fn set_config(&self, function_name: &str, memory_mb: u32) -> Result<(), ComputeError>;
}

/// In-process function registry. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceConfig {
    functions: Arc<DashMap<String, u32>>,
}

impl MemoryResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `name → memory_mb` pairs.
    pub fn from_map(functions: &BTreeMap<String, u32>) -> Self {
        let store = Self::new();
        for (name, memory) in functions {
            store.functions.insert(name.clone(), *memory);
        }
        store
    }

    pub fn insert(&self, function_name: &str, memory_mb: u32) {
        self.functions.insert(function_name.to_string(), memory_mb);
    }

    pub fn memory_of(&self, function_name: &str) -> Option<u32> {
        self.functions.get(function_name).map(|m| *m)
    }
}

#[async_trait]
impl ResourceConfigService for MemoryResourceConfig {
    async fn get_config(&self, function_name: &str) -> Result<FunctionConfig, ComputeError> {
        self.memory_of(function_name)
            .map(|memory_mb| FunctionConfig { memory_mb })
            .ok_or_else(|| ComputeError::NotFound(function_name.to_string()))
    }

    async fn set_config(&self, function_name: &str, memory_mb: u32) -> Result<(), ComputeError> {
        match self.functions.get_mut(function_name) {
            Some(mut entry) => {
                *entry = memory_mb;
                Ok(())
            }
            None => Err(ComputeError::NotFound(function_name.to_string())),
        }
    }
}
