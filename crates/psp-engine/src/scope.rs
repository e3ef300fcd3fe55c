use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::EngineError;
use crate::value::{Value, ValueEvaluation, ValueType};

/// Id under which the package root is provided.
pub const PSP_DIR: &str = "PSP_DIR";

/// Variables of one run. A name is bound at most once.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    variables: BTreeMap<String, ValueEvaluation>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: impl Into<String>,
        evaluation: ValueEvaluation,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if self.variables.contains_key(&name) {
            return Err(EngineError::VariableRedefined { name });
        }
        self.variables.insert(name, evaluation);
        Ok(())
    }

    /// Shorthand for defining a successfully evaluated value.
    pub fn define_value(&mut self, name: impl Into<String>, value: Value) -> Result<(), EngineError> {
        self.define(name, ValueEvaluation::ok(value))
    }

    pub fn get(&self, name: &str) -> Option<&ValueEvaluation> {
        self.variables.get(name)
    }

    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.variables.get(name).map(ValueEvaluation::value_type)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Values supplied by the caller before a run, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProvidedValues {
    strings: BTreeMap<String, String>,
    integers: BTreeMap<String, i64>,
    files: BTreeMap<String, PathBuf>,
}

impl ProvidedValues {
    /// Values for a package rooted at `package_dir`.
    pub fn for_package(package_dir: impl Into<PathBuf>) -> Self {
        Self::default().with_file(PSP_DIR, package_dir)
    }

    #[must_use]
    pub fn with_string(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(id.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_integer(mut self, id: impl Into<String>, value: i64) -> Self {
        self.integers.insert(id.into(), value);
        self
    }

    #[must_use]
    pub fn with_file(mut self, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(id.into(), path.into());
        self
    }

    pub fn string(&self, id: &str) -> Option<&str> {
        self.strings.get(id).map(String::as_str)
    }

    pub fn integer(&self, id: &str) -> Option<i64> {
        self.integers.get(id).copied()
    }

    pub fn file(&self, id: &str) -> Option<&PathBuf> {
        self.files.get(id)
    }

    pub fn package_dir(&self) -> Option<&PathBuf> {
        self.file(PSP_DIR)
    }
}
