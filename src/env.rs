use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub type Variables = BTreeMap<String, Value>;
pub type Arrays = BTreeMap<String, Vec<i64>>;
pub type Dictionaries = BTreeMap<String, BTreeMap<String, i64>>;
pub type Classes = BTreeMap<String, BTreeMap<String, String>>;

/// Marker stored for every method attached to a class.
pub const METHOD_MARKER: &str = "Method defined";

/// Marker stored in the variable namespace by `def`.
pub const FUNCTION_MARKER: &str = "Function defined";

/// Program state the interpreter executes against.
///
/// The environment contains four independent namespaces:
/// - `variables`: scalar values created by `let`, `input` and `def`.
/// - `arrays`: integer sequences created by `array`.
/// - `dictionaries`: string-to-integer maps created by `dict`.
/// - `classes`: method markers grouped by class name.
///
/// The same name may exist in several namespaces at once; lookups that span
/// namespaces use a fixed priority order (see [`Environment::delete`]).
///
/// Serializes to the JSON state file format. Maps are ordered so saved files are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub variables: Variables,
    pub arrays: Arrays,
    pub dictionaries: Dictionaries,
    pub classes: Classes,
    /// Set by `exit`; a REPL loop checks it to know when to stop.
    #[serde(skip)]
    pub should_exit: bool,
}

/// Namespace a name was removed from by [`Environment::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Variable,
    Array,
    Dictionary,
}

/// Errors from reading or writing a state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `name` from the first namespace that holds it, probing
    /// variables, then arrays, then dictionaries. Classes are never touched.
    pub fn delete(&mut self, name: &str) -> Option<Namespace> {
        if self.variables.remove(name).is_some() {
            Some(Namespace::Variable)
        } else if self.arrays.remove(name).is_some() {
            Some(Namespace::Array)
        } else if self.dictionaries.remove(name).is_some() {
            Some(Namespace::Dictionary)
        } else {
            None
        }
    }

    /// Empty all four namespaces.
    pub fn clear(&mut self) {
        self.variables.clear();
        self.arrays.clear();
        self.dictionaries.clear();
        self.classes.clear();
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a state document. Absent namespaces come back empty.
    pub fn from_json(text: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Replace all namespaces with the contents of `path`.
    ///
    /// The file is fully read and parsed before anything is assigned, so on
    /// error the environment is left as it was.
    pub fn load(&mut self, path: &Path) -> Result<(), StateError> {
        let text = fs::read_to_string(path)?;
        let loaded = Self::from_json(&text)?;
        self.variables = loaded.variables;
        self.arrays = loaded.arrays;
        self.dictionaries = loaded.dictionaries;
        self.classes = loaded.classes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> Environment {
        let mut env = Environment::new();
        env.variables.insert("x".into(), Value::Int(5));
        env.variables.insert("f".into(), Value::Str(FUNCTION_MARKER.into()));
        env.arrays.insert("a".into(), vec![1, 2, 3]);
        env.dictionaries
            .insert("d".into(), BTreeMap::from([("k".to_string(), 7)]));
        env.classes.insert(
            "C".into(),
            BTreeMap::from([("run".to_string(), METHOD_MARKER.to_string())]),
        );
        env
    }

    #[test]
    fn test_delete_priority_variable_first() {
        let mut env = Environment::new();
        env.variables.insert("n".into(), Value::Int(1));
        env.arrays.insert("n".into(), vec![]);
        env.dictionaries.insert("n".into(), BTreeMap::new());

        assert_eq!(env.delete("n"), Some(Namespace::Variable));
        assert!(env.arrays.contains_key("n"));
        assert_eq!(env.delete("n"), Some(Namespace::Array));
        assert_eq!(env.delete("n"), Some(Namespace::Dictionary));
        assert_eq!(env.delete("n"), None);
    }

    #[test]
    fn test_delete_ignores_classes() {
        let mut env = populated();
        assert_eq!(env.delete("C"), None);
        assert!(env.classes.contains_key("C"));
    }

    #[test]
    fn test_json_layout() {
        let json = populated().to_json().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["variables"]["x"], 5);
        assert_eq!(doc["arrays"]["a"], serde_json::json!([1, 2, 3]));
        assert_eq!(doc["dictionaries"]["d"]["k"], 7);
        assert_eq!(doc["classes"]["C"]["run"], "Method defined");
        assert!(doc.get("should_exit").is_none());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let env = Environment::from_json(r#"{"arrays": {"a": [4]}}"#).unwrap();
        assert_eq!(env.arrays["a"], vec![4]);
        assert!(env.variables.is_empty());
        assert!(env.dictionaries.is_empty());
        assert!(env.classes.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let saved = populated();
        saved.save(&path).unwrap();

        let mut restored = Environment::new();
        restored.load(&path).unwrap();
        assert_eq!(restored, saved);
    }

    #[test]
    fn test_failed_load_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"variables": {"x": 1}, "arrays": {"a": ["nope"]}}"#).unwrap();

        let mut env = populated();
        assert!(matches!(env.load(&path), Err(StateError::Json(_))));
        assert_eq!(env, populated());

        let missing = dir.path().join("missing.json");
        assert!(matches!(env.load(&missing), Err(StateError::Io(_))));
        assert_eq!(env, populated());
    }
}
