//! Per-run evaluation context.
//!
//! An [`Engine`] lives for exactly one validation run. It owns the variable
//! scope and the caches of parsed XML documents and compiled XPaths, and
//! dispatches the evaluation and validation function catalogs. Function
//! failures never escape: evaluation failures become failed
//! [`ValueEvaluation`]s and validation failures become a single ERROR.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use psp_model::{CancellationToken, Level, ValidationResult};
use psp_tools::ToolManager;
use psp_xml::{XPath, XPathError, XmlDocument};

use crate::contract::{Bindings, ParamValue, PatternSource};
use crate::error::EngineError;
use crate::function::{EvaluationFunction, EvaluationKind, ValidationFunction, ValidationKind};
use crate::pattern::ResolvedPattern;
use crate::ruleset::{RuleSet, VariableDefinition};
use crate::scope::{ProvidedValues, VariableScope};
use crate::value::{Value, ValueEvaluation, ValueType};

pub struct Engine<'a> {
    rules: &'a RuleSet,
    tools: &'a ToolManager,
    provided: &'a ProvidedValues,
    cancel: CancellationToken,
    scope: VariableScope,
    documents: BTreeMap<PathBuf, Result<Arc<XmlDocument>, String>>,
    xpaths: BTreeMap<String, Result<Arc<XPath>, XPathError>>,
}

impl<'a> Engine<'a> {
    pub fn new(
        rules: &'a RuleSet,
        tools: &'a ToolManager,
        provided: &'a ProvidedValues,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            rules,
            tools,
            provided,
            cancel: cancel.clone(),
            scope: VariableScope::new(),
            documents: BTreeMap::new(),
            xpaths: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> &VariableScope {
        &self.scope
    }

    /// Evaluates one rule-set variable and stores the outcome.
    ///
    /// A failed evaluation is stored as such; rules referencing it report the
    /// failure when they resolve the variable.
    pub fn define_variable(&mut self, definition: &VariableDefinition) {
        let evaluation = self.evaluate(&definition.function);
        match evaluation.outcome() {
            Ok(value) => debug!(variable = %definition.name, %value, "variable defined"),
            Err(message) => {
                warn!(variable = %definition.name, %message, "variable evaluation failed");
            }
        }
        self.store(definition, evaluation);
    }

    /// Stores `definition` as failed with `message` without evaluating it.
    pub fn define_failed(&mut self, definition: &VariableDefinition, message: String) {
        let value_type = definition.function.kind.return_type();
        self.store(definition, ValueEvaluation::failed(value_type, message));
    }

    fn store(&mut self, definition: &VariableDefinition, evaluation: ValueEvaluation) {
        if let Err(error) = self.scope.define(definition.name.as_str(), evaluation) {
            warn!(%error, "variable not defined");
        }
    }

    pub fn evaluate(&mut self, function: &EvaluationFunction) -> ValueEvaluation {
        let return_type = function.kind.return_type();
        if let Err(violations) = function
            .kind
            .contract()
            .check_compliance(&function.bindings, &self.scope)
        {
            return ValueEvaluation::failed(return_type, violations.to_string());
        }
        match self.run_evaluation(function.kind, &function.bindings) {
            Ok(value) => ValueEvaluation::ok(value),
            Err(error) => ValueEvaluation::failed(return_type, error.to_string()),
        }
    }

    pub fn validate(&mut self, function: &ValidationFunction) -> ValidationResult {
        if let Err(violations) = function
            .kind
            .contract()
            .check_compliance(&function.bindings, &self.scope)
        {
            return ValidationResult::single_error(violations.to_string());
        }
        debug!(function = %function.kind, "running validation function");
        self.run_validation(function.kind, &function.bindings)
            .unwrap_or_else(|error| ValidationResult::single_error(error.to_string()))
    }

    /// Parses `path` once per run; later calls reuse the outcome.
    pub fn document(&mut self, path: &Path) -> Result<Arc<XmlDocument>, EngineError> {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let entry = match self.documents.entry(key) {
            Entry::Occupied(entry) => {
                trace!(path = %path.display(), "document cache hit");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                trace!(path = %path.display(), "parsing document");
                entry.insert(
                    XmlDocument::load(path)
                        .map(Arc::new)
                        .map_err(|error| error.to_string()),
                )
            }
        };
        entry.clone().map_err(|message| EngineError::Xml {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Compiles an XPath against the rule-set namespaces once per run.
    pub fn xpath(&mut self, expression: &str) -> Result<Arc<XPath>, EngineError> {
        let rules = self.rules;
        let entry = match self.xpaths.entry(expression.to_string()) {
            Entry::Occupied(entry) => {
                trace!(expression, "xpath cache hit");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                trace!(expression, "compiling xpath");
                entry.insert(XPath::compile(expression, rules.namespaces()).map(Arc::new))
            }
        };
        entry.clone().map_err(|source| EngineError::InvalidXPath {
            expression: expression.to_string(),
            source,
        })
    }

    fn run_evaluation(
        &mut self,
        kind: EvaluationKind,
        bindings: &Bindings,
    ) -> Result<Value, EngineError> {
        match kind {
            EvaluationKind::GetProvidedString => {
                let id = self.string(bindings, "string_id")?;
                self.provided
                    .string(&id)
                    .map(|value| Value::String(value.to_string()))
                    .ok_or(EngineError::NotProvided { kind: "string", id })
            }
            EvaluationKind::GetProvidedInteger => {
                let id = self.string(bindings, "int_id")?;
                self.provided
                    .integer(&id)
                    .map(Value::Integer)
                    .ok_or(EngineError::NotProvided { kind: "integer", id })
            }
            EvaluationKind::GetProvidedFile => {
                let id = self.string(bindings, "file_id")?;
                self.provided
                    .file(&id)
                    .map(|path| Value::File(path.clone()))
                    .ok_or(EngineError::NotProvided { kind: "file", id })
            }
            EvaluationKind::FindFilesInDirByPattern => {
                let dir = self.file(bindings, "dir")?;
                let pattern = self.pattern(bindings, "pattern")?;
                let files = list_dir(&dir)?
                    .into_iter()
                    .filter(|path| pattern.is_match(&file_name(path)))
                    .collect();
                Ok(Value::FileList(files))
            }
            EvaluationKind::GetFirstFileFromFileList => {
                let files = self.file_list(bindings, "files")?;
                files
                    .into_iter()
                    .next()
                    .map(Value::File)
                    .ok_or_else(|| EngineError::Evaluation {
                        message: "file list is empty".to_string(),
                    })
            }
            EvaluationKind::MergeFileLists => {
                let mut seen = BTreeSet::new();
                let merged = self
                    .file_lists(bindings, "files")?
                    .into_iter()
                    .filter(|path| seen.insert(path.clone()))
                    .collect();
                Ok(Value::FileList(merged))
            }
            EvaluationKind::GetStringByXpath => {
                let file = self.file(bindings, "xml_file")?;
                let expression = self.string(bindings, "xpath")?;
                let document = self.document(&file)?;
                let xpath = self.xpath(&expression)?;
                xpath
                    .evaluate_string_in(&document)
                    .map(Value::String)
                    .map_err(|source| EngineError::InvalidXPath { expression, source })
            }
        }
    }

    fn run_validation(
        &mut self,
        kind: ValidationKind,
        bindings: &Bindings,
    ) -> Result<ValidationResult, EngineError> {
        let mut result = ValidationResult::new();
        match kind {
            ValidationKind::CheckFileIsDir => {
                let file = self.file(bindings, "file")?;
                if !file.exists() {
                    result.add(Level::Error, format!("{} does not exist", file.display()));
                } else if !file.is_dir() {
                    result.add(Level::Error, format!("{} is not a directory", file.display()));
                }
            }
            ValidationKind::CheckFilelistExactSize => {
                let files = self.file_list(bindings, "files")?;
                let size = self.integer(bindings, "size")?;
                let level = self.level(bindings, "level")?;
                if i64::try_from(files.len()).ok() != Some(size) {
                    let mut message = format!("expected {size} files, found {}", files.len());
                    if !files.is_empty() {
                        let names: Vec<String> = files.iter().map(|path| file_name(path)).collect();
                        message.push_str(&format!(": {}", names.join(", ")));
                    }
                    result.add(level, message);
                }
            }
            ValidationKind::CheckAllFilenamesMatch => {
                let files = self.file_list(bindings, "files")?;
                let level = self.level(bindings, "level")?;
                let pattern = self.pattern(bindings, "pattern")?;
                for file in &files {
                    let name = file_name(file);
                    if !pattern.is_match(&name) {
                        result.add(
                            level,
                            format!("file name '{name}' does not match {pattern}"),
                        );
                    }
                }
            }
            ValidationKind::CheckNoOtherFilesInDir => {
                let dir = self.file(bindings, "dir")?;
                let level = self.level(bindings, "level")?;
                let expected: BTreeSet<PathBuf> = self
                    .file_lists(bindings, "files")?
                    .iter()
                    .map(|path| normalized(path))
                    .collect();
                for entry in list_dir(&dir)? {
                    if !expected.contains(&normalized(&entry)) {
                        result.add(
                            level,
                            format!(
                                "unexpected file '{}' in {}",
                                file_name(&entry),
                                dir.display()
                            ),
                        );
                    }
                }
            }
            ValidationKind::CheckAllFilesInUtf8 => {
                for file in self.file_list(bindings, "files")? {
                    match std::fs::read(&file) {
                        Ok(bytes) => {
                            if let Err(error) = std::str::from_utf8(&bytes) {
                                result.add(
                                    Level::Error,
                                    format!(
                                        "{} is not valid UTF-8: invalid byte sequence at offset {}",
                                        file.display(),
                                        error.valid_up_to()
                                    ),
                                );
                            }
                        }
                        Err(error) => result.add(
                            Level::Error,
                            format!("failed to read {}: {error}", file.display()),
                        ),
                    }
                }
            }
            ValidationKind::CheckXmlIsWellFormed => {
                for file in self.file_list(bindings, "xml_files")? {
                    if let Err(error) = self.document(&file) {
                        result.add(Level::Error, error.to_string());
                    }
                }
            }
            ValidationKind::CheckMetadataProfile => {
                let files = self.file_list(bindings, "xml_files")?;
                let name = self.string(bindings, "profile")?;
                let profile = self.rules.metadata_profile(&name).cloned().ok_or_else(|| {
                    EngineError::Evaluation {
                        message: format!("metadata profile '{name}' is not defined"),
                    }
                })?;
                for file in &files {
                    match self.document(file) {
                        Ok(document) => {
                            let checked = psp_profile::validate(&profile, &document);
                            result.merge_labeled(&file_name(file), checked);
                        }
                        Err(error) => result.add(Level::Error, error.to_string()),
                    }
                }
            }
            ValidationKind::CheckBinaryFilesByProfile => {
                let files = self.file_list(bindings, "files")?;
                let name = self.string(bindings, "profile")?;
                let profile = self.rules.binary_profile(&name).cloned().ok_or_else(|| {
                    EngineError::Evaluation {
                        message: format!("binary profile '{name}' is not defined"),
                    }
                })?;
                for file in &files {
                    let checked = profile.validate_file(self.tools, file, &self.cancel);
                    result.merge_labeled(&file_name(file), checked);
                }
            }
        }
        Ok(result)
    }

    /// Every value bound to `name`, with references resolved.
    fn resolve(&self, bindings: &Bindings, name: &str) -> Result<Vec<Value>, EngineError> {
        bindings
            .values_named(name)
            .map(|value| match value {
                ParamValue::Constant(value) => Ok(value.clone()),
                ParamValue::Reference(variable) => {
                    let evaluation =
                        self.scope
                            .get(variable)
                            .ok_or_else(|| EngineError::UndefinedVariable {
                                name: variable.clone(),
                            })?;
                    evaluation.outcome().cloned().map_err(|message| {
                        EngineError::FailedVariable {
                            name: variable.clone(),
                            message: message.to_string(),
                        }
                    })
                }
            })
            .collect()
    }

    fn single(
        &self,
        bindings: &Bindings,
        name: &str,
        expected: ValueType,
    ) -> Result<Option<Value>, EngineError> {
        let value = self.resolve(bindings, name)?.into_iter().next();
        match value {
            Some(value) if value.value_type() != expected => Err(EngineError::ParameterType {
                name: name.to_string(),
                expected,
            }),
            value => Ok(value),
        }
    }

    fn required(
        &self,
        bindings: &Bindings,
        name: &str,
        expected: ValueType,
    ) -> Result<Value, EngineError> {
        self.single(bindings, name, expected)?
            .ok_or_else(|| EngineError::ParameterType {
                name: name.to_string(),
                expected,
            })
    }

    fn string(&self, bindings: &Bindings, name: &str) -> Result<String, EngineError> {
        match self.required(bindings, name, ValueType::String)? {
            Value::String(text) => Ok(text),
            _ => Err(parameter_type(name, ValueType::String)),
        }
    }

    fn integer(&self, bindings: &Bindings, name: &str) -> Result<i64, EngineError> {
        match self.required(bindings, name, ValueType::Integer)? {
            Value::Integer(number) => Ok(number),
            _ => Err(parameter_type(name, ValueType::Integer)),
        }
    }

    fn file(&self, bindings: &Bindings, name: &str) -> Result<PathBuf, EngineError> {
        match self.required(bindings, name, ValueType::File)? {
            Value::File(path) => Ok(path),
            _ => Err(parameter_type(name, ValueType::File)),
        }
    }

    fn file_list(&self, bindings: &Bindings, name: &str) -> Result<Vec<PathBuf>, EngineError> {
        match self.required(bindings, name, ValueType::FileList)? {
            Value::FileList(paths) => Ok(paths),
            _ => Err(parameter_type(name, ValueType::FileList)),
        }
    }

    /// All lists bound to `name`, concatenated in binding order.
    fn file_lists(&self, bindings: &Bindings, name: &str) -> Result<Vec<PathBuf>, EngineError> {
        let mut files = Vec::new();
        for value in self.resolve(bindings, name)? {
            match value {
                Value::FileList(paths) => files.extend(paths),
                _ => return Err(parameter_type(name, ValueType::FileList)),
            }
        }
        Ok(files)
    }

    /// Optional level parameter; ERROR when unbound.
    fn level(&self, bindings: &Bindings, name: &str) -> Result<Level, EngineError> {
        match self.single(bindings, name, ValueType::Level)? {
            Some(Value::Level(level)) => Ok(level),
            Some(_) => Err(parameter_type(name, ValueType::Level)),
            None => Ok(Level::Error),
        }
    }

    fn pattern(&self, bindings: &Bindings, name: &str) -> Result<ResolvedPattern, EngineError> {
        let pattern = match bindings.pattern_named(name) {
            Some(PatternSource::Inline(pattern)) => pattern,
            Some(PatternSource::Named(pattern)) => {
                self.rules
                    .pattern(pattern)
                    .ok_or_else(|| EngineError::UndefinedVariable {
                        name: pattern.clone(),
                    })?
            }
            None => {
                return Err(EngineError::Evaluation {
                    message: format!("pattern parameter '{name}' not bound"),
                });
            }
        };
        Ok(pattern.resolve(&self.scope)?)
    }
}

fn parameter_type(name: &str, expected: ValueType) -> EngineError {
    EngineError::ParameterType {
        name: name.to_string(),
        expected,
    }
}

/// Entries of a directory sorted by path.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if !dir.is_dir() {
        return Err(EngineError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    let io = |error: std::io::Error| EngineError::Io {
        path: dir.to_path_buf(),
        message: error.to_string(),
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        entries.push(entry.map_err(io)?.path());
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn normalized(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
