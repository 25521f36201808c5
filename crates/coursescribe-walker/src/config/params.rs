use crate::{Error, Result};
use std::collections::HashMap;

/// Runtime parameters substituted into a config as `${name}`.
///
/// Names that are not set explicitly fall back to the process environment, so
/// `api_key: "${OPENAI_API_KEY}"` works without passing the key on the command line.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Create empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get an explicitly set parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse from CLI args like "key=value".
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            params.values.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::to_string)
            .or_else(|| std::env::var(key).ok())
    }
}

/// Substitute `${var}` patterns in a string.
pub fn substitute(template: &str, params: &Params) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(var_start) = result[start..].find("${") {
        let var_start = start + var_start;
        let Some(var_end) = result[var_start..].find('}') else {
            break;
        };
        let var_end = var_start + var_end;

        let var_name = &result[var_start + 2..var_end];
        let value = params
            .lookup(var_name)
            .ok_or_else(|| Error::Config(format!("missing parameter: {}", var_name)))?;

        result.replace_range(var_start..=var_end, &value);
        start = var_start + value.len();
    }

    Ok(result)
}

/// Recursively substitute params in a serde_yaml::Value.
pub fn substitute_value(value: &mut serde_yaml::Value, params: &Params) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => {
            *s = substitute(s, params)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params)?;
            }
        }
        _ => {}
    }
    Ok(())
}
