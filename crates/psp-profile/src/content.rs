//! Constraints on element text, attribute values and tool output values.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Serialized form of a content constraint, as written in profile files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ContentDefinition {
    Constant {
        value: String,
    },
    OneOf {
        values: Vec<String>,
    },
    Regex {
        pattern: String,
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    IntRange {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    NonEmpty,
}

fn default_true() -> bool {
    true
}

impl ContentDefinition {
    pub fn compile(&self) -> Result<ContentConstraint, ProfileError> {
        let kind = match self {
            ContentDefinition::Constant { value } => ConstraintKind::Constant(value.clone()),
            ContentDefinition::OneOf { values } => ConstraintKind::OneOf(values.clone()),
            ContentDefinition::Regex {
                pattern,
                case_sensitive,
            } => {
                let regex = RegexBuilder::new(&format!("^(?:{pattern})$"))
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|source| ProfileError::InvalidRegex {
                        pattern: pattern.clone(),
                        source,
                    })?;
                ConstraintKind::Regex {
                    pattern: pattern.clone(),
                    regex,
                }
            }
            ContentDefinition::IntRange { min, max } => {
                if let (Some(min), Some(max)) = (min, max)
                    && min > max
                {
                    return Err(ProfileError::definition(
                        "int_range",
                        format!("min {min} is greater than max {max}"),
                    ));
                }
                ConstraintKind::IntRange {
                    min: *min,
                    max: *max,
                }
            }
            ContentDefinition::NonEmpty => ConstraintKind::NonEmpty,
        };
        Ok(ContentConstraint { kind })
    }
}

#[derive(Debug, Clone)]
enum ConstraintKind {
    Constant(String),
    OneOf(Vec<String>),
    Regex { pattern: String, regex: Regex },
    IntRange { min: Option<i64>, max: Option<i64> },
    NonEmpty,
}

/// A compiled predicate over a string value.
#[derive(Debug, Clone)]
pub struct ContentConstraint {
    kind: ConstraintKind,
}

impl ContentConstraint {
    /// Checks `value`, returning a human-readable description on mismatch.
    pub fn check(&self, value: &str) -> Result<(), String> {
        let matches = match &self.kind {
            ConstraintKind::Constant(expected) => value == expected,
            ConstraintKind::OneOf(values) => values.iter().any(|candidate| candidate == value),
            ConstraintKind::Regex { regex, .. } => regex.is_match(value),
            ConstraintKind::IntRange { min, max } => match value.trim().parse::<i64>() {
                Ok(number) => {
                    min.is_none_or(|min| number >= min) && max.is_none_or(|max| number <= max)
                }
                Err(_) => false,
            },
            ConstraintKind::NonEmpty => !value.trim().is_empty(),
        };
        if matches {
            Ok(())
        } else {
            Err(format!("value '{value}' {self}"))
        }
    }
}

impl fmt::Display for ContentConstraint {
    /// The requirement phrased to follow a value, e.g. `must be exactly 'x'`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConstraintKind::Constant(expected) => write!(f, "must be exactly '{expected}'"),
            ConstraintKind::OneOf(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                write!(f, "must be one of {}", quoted.join(", "))
            }
            ConstraintKind::Regex { pattern, .. } => write!(f, "must match '{pattern}'"),
            ConstraintKind::IntRange { min, max } => match (min, max) {
                (Some(min), Some(max)) => write!(f, "must be an integer in interval <{min}, {max}>"),
                (Some(min), None) => write!(f, "must be an integer at least {min}"),
                (None, Some(max)) => write!(f, "must be an integer at most {max}"),
                (None, None) => f.write_str("must be an integer"),
            },
            ConstraintKind::NonEmpty => f.write_str("must not be empty"),
        }
    }
}

/// Whether a content mismatch is an error or only a warning.
#[derive(Debug, Clone)]
pub enum ContentRequirement {
    Expected(ContentConstraint),
    Recommended(ContentConstraint),
}

impl ContentRequirement {
    /// Builds the requirement from the `expected`/`recommended` pair of a
    /// definition; setting both is rejected.
    pub fn from_pair(
        owner: &str,
        expected: Option<&ContentDefinition>,
        recommended: Option<&ContentDefinition>,
    ) -> Result<Option<Self>, ProfileError> {
        match (expected, recommended) {
            (Some(_), Some(_)) => Err(ProfileError::definition(
                owner,
                "expected and recommended content are mutually exclusive",
            )),
            (Some(definition), None) => Ok(Some(Self::Expected(definition.compile()?))),
            (None, Some(definition)) => Ok(Some(Self::Recommended(definition.compile()?))),
            (None, None) => Ok(None),
        }
    }
}
