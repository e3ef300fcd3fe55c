//! Function contracts and the parameter bindings checked against them.

use std::collections::BTreeMap;

use crate::error::{ContractViolation, ContractViolations};
use crate::pattern::Pattern;
use crate::scope::VariableScope;
use crate::value::{Value, ValueType};

/// Declared shape of one value parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueParamSpec {
    pub name: String,
    pub value_type: ValueType,
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl ValueParamSpec {
    fn allows(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

/// What a callable accepts and, for evaluation functions, what it returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    pub return_type: Option<ValueType>,
    pub value_params: Vec<ValueParamSpec>,
    pub pattern_params: Vec<String>,
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn returns(mut self, value_type: ValueType) -> Self {
        self.return_type = Some(value_type);
        self
    }

    #[must_use]
    pub fn value(
        mut self,
        name: &str,
        value_type: ValueType,
        min: usize,
        max: Option<usize>,
    ) -> Self {
        self.value_params.push(ValueParamSpec {
            name: name.to_string(),
            value_type,
            min,
            max,
        });
        self
    }

    /// A value parameter bound exactly once.
    #[must_use]
    pub fn required(self, name: &str, value_type: ValueType) -> Self {
        self.value(name, value_type, 1, Some(1))
    }

    #[must_use]
    pub fn pattern(mut self, name: &str) -> Self {
        self.pattern_params.push(name.to_string());
        self
    }

    pub fn value_param(&self, name: &str) -> Option<&ValueParamSpec> {
        self.value_params.iter().find(|spec| spec.name == name)
    }

    /// Checks bindings against the contract.
    ///
    /// Checks run in a fixed order: undeclared value parameters, binding
    /// counts, value types, then pattern parameters. References whose variable
    /// is not in `scope` have no known type and are left to resolution.
    pub fn check_compliance(
        &self,
        bindings: &Bindings,
        scope: &VariableScope,
    ) -> Result<(), ContractViolations> {
        let mut violations = Vec::new();

        for binding in &bindings.values {
            if self.value_param(&binding.name).is_none()
                && !violations.contains(&ContractViolation::UnknownParameter {
                    name: binding.name.clone(),
                })
            {
                violations.push(ContractViolation::UnknownParameter {
                    name: binding.name.clone(),
                });
            }
        }

        for spec in &self.value_params {
            let actual = bindings.count(&spec.name);
            if !spec.allows(actual) {
                violations.push(ContractViolation::Arity {
                    name: spec.name.clone(),
                    min: spec.min,
                    max: spec.max,
                    actual,
                });
            }
        }

        for binding in &bindings.values {
            let Some(spec) = self.value_param(&binding.name) else {
                continue;
            };
            let actual = match &binding.value {
                ParamValue::Constant(value) => Some(value.value_type()),
                ParamValue::Reference(variable) => scope.value_type(variable),
            };
            if let Some(actual) = actual
                && actual != spec.value_type
            {
                violations.push(ContractViolation::TypeMismatch {
                    name: binding.name.clone(),
                    expected: spec.value_type,
                    actual,
                });
            }
        }

        let mut pattern_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for binding in &bindings.patterns {
            *pattern_counts.entry(binding.name.as_str()).or_default() += 1;
        }
        for name in &self.pattern_params {
            match pattern_counts.get(name.as_str()) {
                None => violations.push(ContractViolation::MissingPattern { name: name.clone() }),
                Some(count) if *count > 1 => {
                    violations.push(ContractViolation::PatternBoundTwice { name: name.clone() });
                }
                Some(_) => {}
            }
        }
        for name in pattern_counts.keys() {
            if !self.pattern_params.iter().any(|declared| declared == name) {
                violations.push(ContractViolation::UnexpectedPattern {
                    name: (*name).to_string(),
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ContractViolations(violations))
        }
    }
}

/// A value parameter's bound value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Constant(Value),
    /// Name of a variable in the run's scope.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueParam {
    pub name: String,
    pub value: ParamValue,
}

/// A pattern parameter's bound pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    Inline(Pattern),
    /// Name of a pattern defined in the rule set.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternParam {
    pub name: String,
    pub pattern: PatternSource,
}

/// Concrete parameter bindings of one function instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub values: Vec<ValueParam>,
    pub patterns: Vec<PatternParam>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn constant(mut self, name: &str, value: Value) -> Self {
        self.values.push(ValueParam {
            name: name.to_string(),
            value: ParamValue::Constant(value),
        });
        self
    }

    #[must_use]
    pub fn reference(mut self, name: &str, variable: &str) -> Self {
        self.values.push(ValueParam {
            name: name.to_string(),
            value: ParamValue::Reference(variable.to_string()),
        });
        self
    }

    #[must_use]
    pub fn pattern(mut self, name: &str, pattern: Pattern) -> Self {
        self.patterns.push(PatternParam {
            name: name.to_string(),
            pattern: PatternSource::Inline(pattern),
        });
        self
    }

    #[must_use]
    pub fn named_pattern(mut self, name: &str, pattern: &str) -> Self {
        self.patterns.push(PatternParam {
            name: name.to_string(),
            pattern: PatternSource::Named(pattern.to_string()),
        });
        self
    }

    pub fn count(&self, name: &str) -> usize {
        self.values.iter().filter(|binding| binding.name == name).count()
    }

    pub fn values_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ParamValue> {
        self.values
            .iter()
            .filter(move |binding| binding.name == name)
            .map(|binding| &binding.value)
    }

    pub fn pattern_named(&self, name: &str) -> Option<&PatternSource> {
        self.patterns
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.pattern)
    }
}
