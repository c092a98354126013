use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error};

use crate::errors::{JstError, Result};
use crate::functions::{macros, Registry};
use crate::ignore::IgnoreList;
use crate::Variables;

pub const VARIABLES_FILE: &str = "variables.json";
pub const IGNORE_FILE: &str = ".jstignore";
pub const FUNCTIONS_FILE: &str = "functions.json";

/// Configuration read from the site root for one request.
#[derive(Clone, Default)]
pub struct SiteConfig {
    pub variables: Variables,
    pub ignore: IgnoreList,
    /// Functions declared in `functions.json`.
    pub functions: Registry,
}

/// Reads the site's config files from disk. Nothing is cached: every call
/// sees the files as they are now. Missing files yield empty values; invalid
/// ones are logged and yield empty values too.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
}

impl ConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self) -> SiteConfig {
        SiteConfig {
            variables: self.variables(),
            ignore: self.ignore(),
            functions: self.functions(),
        }
    }

    pub fn variables(&self) -> Variables {
        self.read_with(VARIABLES_FILE, parse_variables)
    }

    pub fn ignore(&self) -> IgnoreList {
        self.read_with(IGNORE_FILE, |text| Ok(IgnoreList::parse(text)))
    }

    pub fn functions(&self) -> Registry {
        self.read_with(FUNCTIONS_FILE, macros::parse_macros)
    }

    fn read_with<T, F>(&self, file: &str, parse: F) -> T
    where
        T: Default,
        F: FnOnce(&str) -> Result<T>,
    {
        let path = self.root.join(file);
        let parsed = match read_optional(&path) {
            Ok(Some(text)) => parse(&text),
            Ok(None) => {
                debug!(path = %path.display(), "config file absent");
                return T::default();
            }
            Err(e) => Err(e),
        };
        parsed.unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "invalid {file}");
            T::default()
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse a flat JSON object of variables, coercing values to strings.
pub fn parse_variables(json: &str) -> Result<Variables> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, value_to_string(v))).collect()),
        _ => Err(JstError::Config(format!("{VARIABLES_FILE} must hold a JSON object"))),
    }
}

/// Strings as-is, `null` as empty, everything else as compact JSON.
pub fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
