//! Run-scoped variable store.
//!
//! Holds scenario defaults, caller overrides and step outputs, resolves
//! dot-path references such as `tx1.tx_hash` and renders `{{ name.path }}`
//! templates.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use super::value::{render_json, Value};

/// `{{ name }}` or `{{ name.path.segments }}`, whitespace inside the braces ignored.
static TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_\-]*(?:\.[A-Za-z0-9_\-]+)*)\s*\}\}")
        .expect("template pattern is valid")
});

/// A template referenced a variable that does not resolve.
#[derive(Debug, Clone, Error)]
#[error("undefined variable '{name}'")]
pub struct InterpolationError {
    /// The first reference that failed to resolve
    pub name: String,

    /// Best-effort rendering with unresolved placeholders left verbatim
    pub rendered: String,
}

/// Interpolation of one step parameter failed.
#[derive(Debug, Clone, Error)]
#[error("parameter '{key}': {source}")]
pub struct ParamInterpolationError {
    /// Parameter whose value failed to render
    pub key: String,

    #[source]
    pub source: InterpolationError,
}

/// Named values available to step templates.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Set every entry of `values`; later entries win on collision.
    pub fn merge_from<K, V, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.set(name, value);
        }
    }

    /// Whether a top-level variable exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of top-level variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Top-level variable names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a name or dot path.
    ///
    /// The first segment selects a top-level variable. Each further segment
    /// indexes into the canonical JSON form of the current value: a record by
    /// key, a list by numeric position. A missing segment yields `None`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let root = self.values.get(segments.next()?)?;

        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return Some(root.clone());
        }

        let canonical = match root.canonical() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path, error = %e, "Variable has no canonical form");
                return None;
            }
        };

        let mut current = canonical.as_ref();
        for segment in rest {
            current = match current {
                serde_json::Value::Object(map) => map.get(segment)?,
                serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(Value::Data(current.clone()))
    }

    /// Resolve a name or dot path and render it as text.
    pub fn get_string(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::Data(v) => Some(render_json(&v)),
            typed => match typed.render() {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(path, error = %e, "Variable could not be rendered");
                    None
                }
            },
        }
    }

    /// Replace every `{{ name }}` in `template` with the variable's text.
    ///
    /// Fails on the first undefined reference; the error carries the partial
    /// rendering with every unresolved placeholder left as written.
    pub fn interpolate(&self, template: &str) -> Result<String, InterpolationError> {
        let mut undefined: Option<String> = None;

        let rendered = TEMPLATE.replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.get_string(name) {
                Some(text) => text,
                None => {
                    if undefined.is_none() {
                        undefined = Some(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        match undefined {
            Some(name) => Err(InterpolationError { name, rendered: rendered.into_owned() }),
            None => Ok(rendered.into_owned()),
        }
    }

    /// Interpolate every value of a parameter map.
    pub fn interpolate_params(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, ParamInterpolationError> {
        params
            .iter()
            .map(|(key, template)| {
                self.interpolate(template)
                    .map(|value| (key.clone(), value))
                    .map_err(|source| ParamInterpolationError { key: key.clone(), source })
            })
            .collect()
    }

    /// Interpolate a parameter map for display, never failing.
    ///
    /// Unresolved placeholders are kept verbatim.
    pub fn render_params_lossy(&self, params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        params
            .iter()
            .map(|(key, template)| {
                let value = self.interpolate(template).unwrap_or_else(|e| e.rendered);
                (key.clone(), value)
            })
            .collect()
    }
}

/// Names referenced by `{{ ... }}` placeholders in `template`, in order.
pub fn template_references(template: &str) -> Vec<&str> {
    TEMPLATE.captures_iter(template).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect()
}
