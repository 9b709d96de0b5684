//! Read-only execution environment used for placeholder expansion.
//!
//! The environment is captured once (usually from the process environment),
//! seeded with the invoking working directory, and then passed explicitly to
//! every component that expands `${VAR}` placeholders.

use crate::container::{ContainerError, Result};
use crate::env::LOCAL_ENV_PREFIX;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Matches `${anything}` or `$NAME`. Shell specials like `$!` do not match.
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([^}]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("constant regex pattern is valid")
});

/// Snapshot of key/value variables with `localEnv:` aware lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build an environment from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse `KEY=VALUE` assignments. Empty entries are skipped; an entry
    /// without `=` is rejected.
    pub fn parse_assignments<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vars = BTreeMap::new();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                ContainerError::Configuration(format!(
                    "malformed environment assignment '{}', expected KEY=VALUE",
                    entry
                ))
            })?;
            vars.insert(key.to_string(), value.to_string());
        }
        Ok(Self { vars })
    }

    /// Return a copy with one more variable set.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Look up a variable. A leading `localEnv:` is stripped first.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.strip_prefix(LOCAL_ENV_PREFIX).unwrap_or(key);
        self.vars.get(key).map(String::as_str)
    }

    /// Look up a variable, defaulting to the empty string.
    pub fn lookup(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Expand `${VAR}`, `${localEnv:VAR}` and `$VAR` references.
    /// Unknown variables expand to the empty string.
    pub fn expand(&self, input: &str) -> String {
        VAR_PATTERN
            .replace_all(input, |caps: &regex::Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                self.lookup(name).to_string()
            })
            .into_owned()
    }

    /// Iterate over all variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
