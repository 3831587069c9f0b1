//! Environment variables for external tool invocations.
//!
//! The neuroimaging toolkits are configured through their environment:
//! the surface reconstruction tool looks up subjects under `SUBJECTS_DIR`,
//! the registration toolkit picks its output format from `FSLOUTPUTTYPE`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variables passed to a command on top of the inherited
/// process environment.
///
/// Variables are kept sorted so that ledger records are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add an environment variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Add an environment variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Get an environment variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Get the number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Merge another environment into this one.
    /// Variables from `other` override existing variables.
    pub fn merge(&mut self, other: &Environment) {
        for (k, v) in &other.vars {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    /// Iterate over the environment variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Environment {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
