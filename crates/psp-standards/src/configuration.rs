//! Loading one fDMF directory into a [`RuleSet`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use psp_engine::{
    Bindings, EngineError, EvaluationFunction, EvaluationKind, Expression, Pattern, RuleSet,
    PatternError, RuleSetBuilder, ValidationFunction, ValidationKind, Value, ValueType,
};
use psp_model::{Dmf, Level};
use psp_profile::MetadataProfile;
use psp_tools::BinaryFileProfile;
use psp_xml::{NamespaceContext, XPath};

use crate::error::ConfigError;
use crate::schema::{
    BindingList, BindingSpec, ExpressionSpec, FDMF_SCHEMA, FDMF_SCHEMA_VERSION, FdmfFile,
    PatternSpec, TypedValueSpec,
};

pub const FDMF_FILE: &str = "fdmf.toml";
pub const METADATA_PROFILES_DIR: &str = "metadata_profiles";
pub const BINARY_PROFILES_DIR: &str = "binary_profiles";

/// Parameters whose constant values are XPath expressions checked at load.
const XPATH_PARAMS: [&str; 1] = ["xpath"];

/// Rule set of one (document type, version) with its profiles.
#[derive(Debug, Clone)]
pub struct FdmfConfiguration {
    pub dmf: Dmf,
    pub root_dir: PathBuf,
    pub rules: RuleSet,
}

impl FdmfConfiguration {
    /// Loads `<dir>/fdmf.toml` and the profiles next to it.
    ///
    /// The header must name the same document type and version as `dmf`,
    /// which comes from the directory name.
    pub fn load(dir: &Path, dmf: &Dmf) -> Result<Self, ConfigError> {
        let path = dir.join(FDMF_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let file: FdmfFile = toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.clone(),
            source: e,
        })?;
        check_header(&file, dmf, &path)?;

        let mut loader = Loader {
            path: &path,
            builder: RuleSet::builder(),
            namespaces: NamespaceContext::new(),
            pattern_names: Vec::new(),
        };
        for (prefix, uri) in &file.namespaces {
            loader.builder.namespace(prefix, uri);
            loader.namespaces.insert(prefix.clone(), uri.clone());
        }
        for profile in sorted_toml_files(&dir.join(METADATA_PROFILES_DIR))? {
            let loaded = MetadataProfile::load(&profile).map_err(|source| ConfigError::Profile {
                path: profile.clone(),
                source,
            })?;
            loader.engine(|builder| builder.metadata_profile(loaded))?;
        }
        for profile in sorted_toml_files(&dir.join(BINARY_PROFILES_DIR))? {
            let loaded = BinaryFileProfile::load(&profile)?;
            loader.engine(|builder| builder.binary_profile(loaded))?;
        }
        loader.load_definitions(&file)?;

        let rules = loader.builder.build();
        info!(
            dmf = %dmf,
            sections = rules.sections().len(),
            rules = rules.rules().len(),
            "loaded fDMF"
        );
        Ok(Self {
            dmf: dmf.clone(),
            root_dir: dir.to_path_buf(),
            rules,
        })
    }
}

fn check_header(file: &FdmfFile, dmf: &Dmf, path: &Path) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidHeader {
        path: path.to_path_buf(),
        message,
    };
    if file.fdmf.schema != FDMF_SCHEMA {
        return Err(invalid(format!("unsupported schema: {}", file.fdmf.schema)));
    }
    if file.fdmf.schema_version != FDMF_SCHEMA_VERSION {
        return Err(invalid(format!(
            "unsupported schema_version: {}",
            file.fdmf.schema_version
        )));
    }
    if file.fdmf.document_type != dmf.document_type || file.fdmf.version != dmf.version {
        return Err(invalid(format!(
            "declares {} {} but lives in directory {}",
            file.fdmf.document_type,
            file.fdmf.version,
            dmf.dir_name()
        )));
    }
    Ok(())
}

/// `*.toml` files of `dir` sorted by name; none when the directory is absent.
fn sorted_toml_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))? {
        let path = entry.map_err(|e| ConfigError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

struct Loader<'a> {
    path: &'a Path,
    builder: RuleSetBuilder,
    namespaces: NamespaceContext,
    pattern_names: Vec<String>,
}

impl Loader<'_> {
    fn engine<T>(
        &mut self,
        register: impl FnOnce(&mut RuleSetBuilder) -> Result<T, EngineError>,
    ) -> Result<T, ConfigError> {
        register(&mut self.builder).map_err(|source| ConfigError::Engine {
            path: self.path.to_path_buf(),
            source,
        })
    }

    fn invalid(&self, context: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidDefinition {
            path: self.path.to_path_buf(),
            context: context.to_string(),
            message: message.into(),
        }
    }

    fn load_definitions(&mut self, file: &FdmfFile) -> Result<(), ConfigError> {
        for spec in &file.patterns {
            let context = format!("pattern '{}'", spec.name);
            let pattern = self.pattern(&context, &spec.expressions)?;
            self.engine(|builder| builder.pattern(&spec.name, pattern))?;
            self.pattern_names.push(spec.name.clone());
        }

        for spec in &file.variables {
            let context = format!("variable '{}'", spec.name);
            let kind: EvaluationKind = spec
                .function
                .parse()
                .map_err(|error: EngineError| self.invalid(&context, error.to_string()))?;
            let bindings = self.bindings(&context, &spec.params, &spec.patterns)?;
            self.engine(|builder| {
                builder.variable(&spec.name, EvaluationFunction::new(kind, bindings))
            })?;
        }

        for section in &file.sections {
            let id = self.engine(|builder| {
                builder.section(&section.name, section.description.clone(), section.enabled)
            })?;
            for rule in &section.rules {
                let context = format!("rule '{}/{}'", section.name, rule.name);
                let kind: ValidationKind = rule.function.parse().map_err(
                    |error: EngineError| self.invalid(&context, error.to_string()),
                )?;
                let bindings = self.bindings(&context, &rule.params, &rule.patterns)?;
                self.engine(|builder| {
                    builder.rule(
                        id,
                        &rule.name,
                        rule.description.clone(),
                        ValidationFunction::new(kind, bindings),
                    )
                })?;
            }
            debug!(section = %section.name, rules = section.rules.len(), "loaded section");
        }
        Ok(())
    }

    fn pattern(&self, context: &str, expressions: &[ExpressionSpec]) -> Result<Pattern, ConfigError> {
        let pattern_error = |source: PatternError| ConfigError::Pattern {
            path: self.path.to_path_buf(),
            context: context.to_string(),
            source,
        };
        let expressions = expressions
            .iter()
            .map(|spec| Expression::new(spec.regex.as_str(), spec.case_sensitive))
            .collect::<Result<Vec<_>, _>>()
            .map_err(pattern_error)?;
        Pattern::new(expressions).map_err(pattern_error)
    }

    fn bindings(
        &self,
        context: &str,
        params: &BTreeMap<String, BindingList>,
        patterns: &BTreeMap<String, PatternSpec>,
    ) -> Result<Bindings, ConfigError> {
        let mut bindings = Bindings::new();
        for (name, list) in params {
            for binding in list.iter() {
                bindings = match binding {
                    BindingSpec::Reference(reference) => bindings.reference(name, &reference.name),
                    BindingSpec::Typed(typed) => {
                        let value = self.typed_value(context, name, typed)?;
                        bindings.constant(name, value)
                    }
                    BindingSpec::Text(text) => {
                        self.check_xpath(context, name, text)?;
                        bindings.constant(name, Value::String(text.clone()))
                    }
                    BindingSpec::Integer(number) => bindings.constant(name, Value::Integer(*number)),
                };
            }
        }
        for (name, spec) in patterns {
            bindings = match spec {
                PatternSpec::Reference(reference) => {
                    if !self.pattern_names.contains(&reference.name) {
                        return Err(self.invalid(
                            context,
                            format!("pattern '{}' is not defined", reference.name),
                        ));
                    }
                    bindings.named_pattern(name, &reference.name)
                }
                PatternSpec::Inline(inline) => {
                    let pattern = self.pattern(context, &inline.expressions)?;
                    bindings.pattern(name, pattern)
                }
            };
        }
        Ok(bindings)
    }

    fn typed_value(
        &self,
        context: &str,
        param: &str,
        spec: &TypedValueSpec,
    ) -> Result<Value, ConfigError> {
        let value_type: ValueType = spec
            .value_type
            .parse()
            .map_err(|error: EngineError| self.invalid(context, error.to_string()))?;
        let mismatch = || {
            self.invalid(
                context,
                format!(
                    "parameter '{param}': expected a {value_type} value, found {}",
                    spec.value.type_str()
                ),
            )
        };
        let value = match (value_type, &spec.value) {
            (ValueType::String, toml::Value::String(text)) => {
                self.check_xpath(context, param, text)?;
                Value::String(text.clone())
            }
            (ValueType::Integer, toml::Value::Integer(number)) => Value::Integer(*number),
            (ValueType::Level, toml::Value::String(text)) => {
                let level: Level = text
                    .parse()
                    .map_err(|error: psp_model::ModelError| {
                        self.invalid(context, format!("parameter '{param}': {error}"))
                    })?;
                Value::Level(level)
            }
            (ValueType::File, toml::Value::String(text)) => Value::File(PathBuf::from(text)),
            (ValueType::FileList, toml::Value::Array(items)) => Value::FileList(
                strings(items)
                    .ok_or_else(mismatch)?
                    .into_iter()
                    .map(PathBuf::from)
                    .collect(),
            ),
            (ValueType::StringList, toml::Value::Array(items)) => {
                Value::StringList(strings(items).ok_or_else(mismatch)?)
            }
            _ => return Err(mismatch()),
        };
        Ok(value)
    }

    /// XPath constants must compile against the rule-set namespaces.
    fn check_xpath(&self, context: &str, param: &str, text: &str) -> Result<(), ConfigError> {
        if !XPATH_PARAMS.contains(&param) {
            return Ok(());
        }
        XPath::compile(text, &self.namespaces)
            .map(|_| ())
            .map_err(|source| ConfigError::XPath {
                path: self.path.to_path_buf(),
                context: context.to_string(),
                source,
            })
    }
}

fn strings(items: &[toml::Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
