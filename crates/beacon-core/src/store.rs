//! Dotted-key configuration store
//!
//! Settings live in a single YAML document. Keys such as
//! `visibility.request_path_mode` address nested mappings. The document is
//! kept as a `serde_yaml` tree, which preserves insertion order, so ordered
//! values like `codesnippet.create` survive a load/save cycle untouched.

use crate::error::{ConfigError, Result};
use serde_yaml::{Mapping, Value};

/// Anything that can resolve dotted configuration keys.
///
/// Hosts with their own configuration system implement [`SettingsSource::value`];
/// the typed accessors come for free.
pub trait SettingsSource {
    /// Raw value stored under `key`, if any.
    fn value(&self, key: &str) -> Option<&Value>;

    /// String value. `null` reads as absent.
    fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(mismatch(key, "string")),
        }
    }

    /// Boolean value. Integer flags (`0`/`1`) and their string forms are accepted.
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(|v| Some(v != 0))
                .ok_or_else(|| mismatch(key, "boolean")),
            Some(Value::String(s)) => match s.trim() {
                "1" | "true" => Ok(Some(true)),
                "0" | "false" | "" => Ok(Some(false)),
                _ => Err(mismatch(key, "boolean")),
            },
            Some(_) => Err(mismatch(key, "boolean")),
        }
    }

    /// Integer value. Numeric strings are accepted.
    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| mismatch(key, "integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| mismatch(key, "integer")),
            Some(_) => Err(mismatch(key, "integer")),
        }
    }

    /// List of strings.
    ///
    /// Accepts a newline separated string (blank lines dropped), a sequence
    /// of strings, or a mapping whose enabled entries are kept by key
    /// (`{authenticated: authenticated, editor: 0}` yields `["authenticated"]`).
    fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(split_lines(s))),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    _ => Err(mismatch(key, "list of strings")),
                })
                .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(Value::Mapping(map)) => Ok(Some(
                map.iter()
                    .filter(|(_, enabled)| is_enabled(enabled))
                    .filter_map(|(k, _)| k.as_str().map(str::to_string))
                    .collect(),
            )),
            Some(_) => Err(mismatch(key, "list of strings")),
        }
    }
}

/// In-memory configuration store backed by a YAML mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    root: Mapping,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document. An empty document yields an empty store.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        match serde_yaml::from_str::<Value>(content)? {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::new()),
            _ => Err(mismatch("<root>", "mapping")),
        }
    }

    /// Serialize the store back to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Look up a dotted key
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    /// Set a dotted key, creating intermediate mappings as needed.
    ///
    /// Overwriting an existing key keeps its position in the document.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ConfigError::InvalidKey(key.to_string()));
        }
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;

        let mut current = &mut self.root;
        for segment in parents {
            let needs_mapping = !matches!(current.get(*segment), Some(Value::Mapping(_)));
            if needs_mapping {
                current.insert(Value::from(*segment), Value::Mapping(Mapping::new()));
            }
            current = current
                .get_mut(*segment)
                .and_then(Value::as_mapping_mut)
                .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;
        }

        current.insert(Value::from(*last), value.into());
        Ok(())
    }

    /// Remove a dotted key, returning the previous value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let (parents, last) = match key.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, key),
        };

        let parent = match parents {
            Some(parents) => {
                let mut current = &mut self.root;
                for segment in parents.split('.') {
                    current = current.get_mut(segment)?.as_mapping_mut()?;
                }
                current
            }
            None => &mut self.root,
        };

        parent.remove(last)
    }

    /// Whether the store holds no keys at all
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl SettingsSource for ConfigStore {
    fn value(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

fn split_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_enabled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() != Some(0),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => true,
    }
}
