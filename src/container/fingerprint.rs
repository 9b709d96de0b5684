//! Deterministic content hash of a [`ContainerSpec`].
//!
//! The spec is converted into a JSON value, every object's keys are sorted,
//! and the compact serialization is hashed with SHA-256. The hex digest is
//! truncated to [`FINGERPRINT_LEN`] characters.

use crate::container::{ContainerError, ContainerSpec, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 32;

/// Short digest identifying one version of a spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of `spec`.
    pub fn of(spec: &ContainerSpec) -> Result<Self> {
        let canonical = canonical_json(spec)?;
        let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
        Ok(Self(digest[..FINGERPRINT_LEN].to_string()))
    }

    /// Wrap a fingerprint recorded on an existing container.
    pub fn recorded(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical serialization of a spec: compact JSON with every mapping key
/// sorted lexicographically.
pub fn canonical_json(spec: &ContainerSpec) -> Result<String> {
    let value = serde_json::to_value(spec).map_err(|e| {
        ContainerError::Configuration(format!("could not serialize configuration: {}", e))
    })?;
    serde_json::to_string(&sort_keys(value)).map_err(|e| {
        ContainerError::Configuration(format!("could not serialize configuration: {}", e))
    })
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
