#![deny(unsafe_code)]

use std::fmt;
use std::path::PathBuf;

use psp_xml::XPathError;

use crate::value::ValueType;

/// Failures while turning a pattern into a regex.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("pattern has no expressions")]
    Empty,

    #[error("expression '{expression}': variable '{name}' is not defined")]
    UndefinedVariable { expression: String, name: String },

    #[error("expression '{expression}': variable '{name}' has type {actual}, expected STRING or INTEGER")]
    InvalidVariableType {
        expression: String,
        name: String,
        actual: ValueType,
    },

    #[error("expression '{expression}': variable '{name}' could not be evaluated: {message}")]
    FailedVariable {
        expression: String,
        name: String,
        message: String,
    },

    #[error("expression '{expression}' is not a valid regular expression: {source}")]
    InvalidRegex {
        expression: String,
        #[source]
        source: regex::Error,
    },
}

/// One way a function's bindings break its contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    UnknownParameter {
        name: String,
    },
    Arity {
        name: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },
    TypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },
    MissingPattern {
        name: String,
    },
    UnexpectedPattern {
        name: String,
    },
    PatternBoundTwice {
        name: String,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::UnknownParameter { name } => {
                write!(f, "unknown parameter '{name}'")
            }
            ContractViolation::Arity {
                name,
                min,
                max,
                actual,
            } => {
                let max = max.map_or_else(|| "∞".to_string(), |max| max.to_string());
                write!(f, "parameter '{name}' bound {actual} times, expected [{min}, {max}]")
            }
            ContractViolation::TypeMismatch {
                name,
                expected,
                actual,
            } => write!(f, "parameter '{name}' has type {actual}, expected {expected}"),
            ContractViolation::MissingPattern { name } => {
                write!(f, "pattern parameter '{name}' not bound")
            }
            ContractViolation::UnexpectedPattern { name } => {
                write!(f, "unknown pattern parameter '{name}'")
            }
            ContractViolation::PatternBoundTwice { name } => {
                write!(f, "pattern parameter '{name}' bound more than once")
            }
        }
    }
}

/// Every violation found by one compliance check, in check order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("contract not met: {}", join(.0))]
pub struct ContractViolations(pub Vec<ContractViolation>);

fn join(violations: &[ContractViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Contract(#[from] ContractViolations),

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("unknown value type '{name}'")]
    UnknownValueType { name: String },

    #[error("variable '{name}' is not defined")]
    UndefinedVariable { name: String },

    #[error("variable '{name}' is already defined")]
    VariableRedefined { name: String },

    #[error("variable '{name}' could not be evaluated: {message}")]
    FailedVariable { name: String, message: String },

    #[error("{kind} '{id}' was not provided")]
    NotProvided { kind: &'static str, id: String },

    #[error("parameter '{name}' does not hold a {expected} value")]
    ParameterType { name: String, expected: ValueType },

    #[error("xpath '{expression}' is invalid: {source}")]
    InvalidXPath {
        expression: String,
        #[source]
        source: XPathError,
    },

    #[error("{} is not a readable XML document: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    #[error("{} does not exist or is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("{message}")]
    Evaluation { message: String },

    #[error("duplicate {kind} '{name}'")]
    DuplicateDefinition { kind: &'static str, name: String },
}
