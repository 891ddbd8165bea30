//! Environment merging.
//!
//! Several named sources of `KEY=VALUE` pairs are folded, in order, into one
//! mapping. A later source overrides an earlier one on the same key, and a
//! key present in any source always survives. The result is a `BTreeMap`, so
//! iteration order is sorted by key and stable across calls.

use crate::model::{SystemContext, TestRun};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// A configured environment value before it is rendered to text.
///
/// Numbers keep their parsed form: `u64` values above `i64::MAX` stay exact
/// and floats render with a fractional part (`2.0`, not `2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Bool(bool),
    Number(Number),
    Str(String),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Bool(v) => write!(f, "{}", v),
            EnvValue::Number(v) => write!(f, "{}", v),
            EnvValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Str(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::Str(value)
    }
}

impl From<i64> for EnvValue {
    fn from(value: i64) -> Self {
        EnvValue::Number(value.into())
    }
}

impl From<f64> for EnvValue {
    /// NaN and infinities have no JSON number form and are kept as text.
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => EnvValue::Number(n),
            None => EnvValue::Str(value.to_string()),
        }
    }
}

impl From<Number> for EnvValue {
    fn from(value: Number) -> Self {
        EnvValue::Number(value)
    }
}

impl From<bool> for EnvValue {
    fn from(value: bool) -> Self {
        EnvValue::Bool(value)
    }
}

/// One named origin of environment variables, values already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSource {
    name: String,
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    pub fn new<I, K, V>(name: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: fmt::Display,
    {
        Self {
            name: name.into(),
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// Fold `sources` left to right; the last source to define a key wins.
pub fn merge(sources: &[EnvSource]) -> BTreeMap<String, String> {
    sources.iter().fold(BTreeMap::new(), |mut merged, source| {
        for (key, value) in &source.vars {
            if let Some(previous) = merged.insert(key.clone(), value.clone()) {
                trace!(
                    key = %key,
                    source = %source.name,
                    previous = %previous,
                    value = %value,
                    "environment override"
                );
            }
        }
        merged
    })
}

/// Sources for a run, most global first: system, test definition, run.
pub fn run_env_sources(system: &SystemContext, run: &TestRun) -> Vec<EnvSource> {
    vec![
        EnvSource::new("system", system.global_env_vars.iter()),
        EnvSource::new("definition", run.test.extra_env_vars.iter()),
        EnvSource::new("run", run.extra_env_vars.iter()),
    ]
}

pub fn merged_run_env(system: &SystemContext, run: &TestRun) -> BTreeMap<String, String> {
    merge(&run_env_sources(system, run))
}
