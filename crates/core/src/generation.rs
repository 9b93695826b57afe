//! Cache generation identifiers.
//!
//! A generation names one deployment of the cache contents. Exactly one is
//! current for a worker lifetime; every store with a different name is stale.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque, non-empty token naming one generation's cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidState("generation id must not be empty".into()));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidState(format!("generation id must not contain whitespace: {id:?}")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GenerationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GenerationId> for String {
    fn from(id: GenerationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Holds the current generation and classifies store names against it.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    current: GenerationId,
}

impl VersionRegistry {
    pub fn new(current: GenerationId) -> Self {
        Self { current }
    }

    pub fn current(&self) -> &GenerationId {
        &self.current
    }

    /// Name of the store every cache operation must address.
    pub fn cache_name(&self) -> &str {
        self.current.as_str()
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.current.as_str()
    }

    /// Store names left behind by other generations.
    pub fn stale<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .map(String::as_str)
            .filter(|name| !self.is_current(name))
            .collect()
    }
}
