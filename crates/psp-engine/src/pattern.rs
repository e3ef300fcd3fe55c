//! Regex templates with `${NAME}` variable references.
//!
//! A [`Pattern`] is an OR over [`Expression`]s. Before matching, each
//! reference is replaced by the regex-escaped text of the variable, so a
//! variable value is always matched literally. Every expression matches the
//! whole candidate.

use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;
use crate::scope::VariableScope;

static VARIABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid variable reference regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    template: String,
    case_sensitive: bool,
}

impl Expression {
    /// Checks the template syntax with every reference replaced by a literal.
    pub fn new(template: impl Into<String>, case_sensitive: bool) -> Result<Self, PatternError> {
        let expression = Self {
            template: template.into(),
            case_sensitive,
        };
        let probe = VARIABLE_REFERENCE.replace_all(&expression.template, "x");
        expression.build(&probe)?;
        Ok(expression)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Names referenced by the template, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        VARIABLE_REFERENCE
            .captures_iter(&self.template)
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str())
    }

    /// Substitutes every reference and compiles the anchored regex.
    pub fn resolve(&self, scope: &VariableScope) -> Result<Regex, PatternError> {
        let mut source = String::with_capacity(self.template.len());
        let mut last = 0;
        for captures in VARIABLE_REFERENCE.captures_iter(&self.template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            source.push_str(&self.template[last..whole.start()]);
            source.push_str(&regex::escape(&self.variable_text(name.as_str(), scope)?));
            last = whole.end();
        }
        source.push_str(&self.template[last..]);
        self.build(&source)
    }

    fn variable_text(&self, name: &str, scope: &VariableScope) -> Result<String, PatternError> {
        let evaluation = scope
            .get(name)
            .ok_or_else(|| PatternError::UndefinedVariable {
                expression: self.template.clone(),
                name: name.to_string(),
            })?;
        let value = evaluation
            .data()
            .ok_or_else(|| PatternError::FailedVariable {
                expression: self.template.clone(),
                name: name.to_string(),
                message: evaluation.error_message().unwrap_or_default().to_string(),
            })?;
        value
            .as_pattern_text()
            .ok_or_else(|| PatternError::InvalidVariableType {
                expression: self.template.clone(),
                name: name.to_string(),
                actual: value.value_type(),
            })
    }

    fn build(&self, source: &str) -> Result<Regex, PatternError> {
        RegexBuilder::new(&format!("^(?:{source})$"))
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|source| PatternError::InvalidRegex {
                expression: self.template.clone(),
                source,
            })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.case_sensitive {
            write!(f, "'{}'", self.template)
        } else {
            write!(f, "'{}' (case-insensitive)", self.template)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    expressions: Vec<Expression>,
}

impl Pattern {
    pub fn new(expressions: Vec<Expression>) -> Result<Self, PatternError> {
        if expressions.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self { expressions })
    }

    /// Pattern with a single case-sensitive expression.
    pub fn single(template: &str) -> Result<Self, PatternError> {
        Self::new(vec![Expression::new(template, true)?])
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Resolves every expression against the scope.
    ///
    /// Resolution is all-or-nothing: an undefined variable in any expression
    /// fails the whole pattern.
    pub fn resolve(&self, scope: &VariableScope) -> Result<ResolvedPattern, PatternError> {
        let regexes = self
            .expressions
            .iter()
            .map(|expression| expression.resolve(scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedPattern {
            description: self.to_string(),
            regexes,
        })
    }

    pub fn matches(&self, candidate: &str, scope: &VariableScope) -> Result<bool, PatternError> {
        Ok(self.resolve(scope)?.is_match(candidate))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, expression) in self.expressions.iter().enumerate() {
            if index > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{expression}")?;
        }
        Ok(())
    }
}

/// A pattern with its variables substituted, ready to test many candidates.
#[derive(Debug, Clone)]
pub struct ResolvedPattern {
    description: String,
    regexes: Vec<Regex>,
}

impl ResolvedPattern {
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(candidate))
    }
}

impl fmt::Display for ResolvedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
