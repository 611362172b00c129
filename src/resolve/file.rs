//! Configuration file resolvers (YAML / TOML)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::resolve::Resolver;
use crate::value::Value;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
}

impl FileFormat {
    /// Picks the format from a path's extension: `.toml` selects TOML,
    /// everything else defaults to YAML.
    pub fn for_path(path: &Path) -> FileFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => FileFormat::Yaml,
        }
    }
}

/// Resolves flag values from a decoded configuration document.
///
/// The document is decoded once, eagerly, at construction. Lookup is by the
/// flag's logical name verbatim; only top-level scalar entries are
/// resolvable, nested mappings and sequences are not traversed.
pub struct FileResolver {
    values: BTreeMap<String, Value>,
}

impl FileResolver {
    /// Decodes a document in the given format. Fails on malformed input or
    /// when the document root is not a mapping.
    pub fn parse(format: FileFormat, input: &str) -> Result<Self> {
        let values = match format {
            FileFormat::Yaml => decode_yaml(input)?,
            FileFormat::Toml => decode_toml(input)?,
        };
        Ok(Self { values })
    }

    /// Reads and decodes a configuration file, picking the format from the
    /// file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(FileFormat::for_path(path), &content).map_err(|e| Error::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl Resolver for FileResolver {
    fn resolve(&self, flag: &str) -> Option<Value> {
        self.values.get(flag).cloned()
    }
}

fn decode_yaml(input: &str) -> Result<BTreeMap<String, Value>> {
    let raw: serde_yaml::Value = serde_yaml::from_str(input)?;
    let serde_yaml::Value::Mapping(mapping) = raw else {
        return Err(Error::NotAMapping);
    };

    let mut values = BTreeMap::new();
    for (key, value) in &mapping {
        let Some(key) = key.as_str() else { continue };
        if let Some(value) = yaml_scalar(value) {
            values.insert(key.to_string(), value);
        }
    }
    Ok(values)
}

fn decode_toml(input: &str) -> Result<BTreeMap<String, Value>> {
    let table: toml::Table = input.parse()?;

    let mut values = BTreeMap::new();
    for (key, value) in &table {
        if let Some(value) = toml_scalar(value) {
            values.insert(key.clone(), value);
        }
    }
    Ok(values)
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<Value> {
    match value {
        serde_yaml::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        serde_yaml::Value::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

fn toml_scalar(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::Boolean(b) => Some(Value::Bool(*b)),
        toml::Value::Integer(i) => Some(Value::Int(*i)),
        toml::Value::Float(x) => Some(Value::Float(*x)),
        toml::Value::String(s) => Some(Value::Str(s.clone())),
        toml::Value::Datetime(d) => Some(Value::Str(d.to_string())),
        _ => None,
    }
}
