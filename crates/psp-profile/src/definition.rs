//! Compiled expected-element and expected-attribute definitions.

use serde::{Deserialize, Serialize};

use psp_xml::{Element, NamespaceContext, XPath};

use crate::content::{ContentDefinition, ContentRequirement};
use crate::error::ProfileError;

/// Serialized element definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    /// Qualified name using the profile's namespace prefixes, e.g. `mods:titleInfo`.
    pub name: String,
    /// Optional XPath predicate narrowing the match, e.g. `@type='alternative'`.
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default = "default_true")]
    pub mandatory: bool,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
    #[serde(default)]
    pub expected: Option<ContentDefinition>,
    #[serde(default)]
    pub recommended: Option<ContentDefinition>,
    #[serde(default)]
    pub extra_rules: Vec<ExtraRuleSpec>,
    #[serde(default)]
    pub ignore_unexpected_attributes: bool,
    #[serde(default)]
    pub ignore_unexpected_children: bool,
    /// Appended to the "not found" message for this element.
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub mandatory: bool,
    #[serde(default)]
    pub expected: Option<ContentDefinition>,
    #[serde(default)]
    pub recommended: Option<ContentDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ExtraRuleSpec {
    /// At least one of the XPaths, evaluated from the element, selects something.
    ExistsAtLeastOneOf { xpaths: Vec<String> },
    /// The XPath evaluated from the element is true.
    Expression {
        xpath: String,
        #[serde(default)]
        description: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ExpectedAttributeDefinition {
    pub name: String,
    pub mandatory: bool,
    pub content: Option<ContentRequirement>,
}

#[derive(Debug, Clone)]
pub enum ExtraRule {
    ExistsAtLeastOneOf { xpaths: Vec<XPath> },
    Expression {
        xpath: XPath,
        description: Option<String>,
    },
}

impl ExtraRule {
    /// Checks the rule from `element`, returning the failure description.
    pub fn check(&self, element: Element<'_>) -> Result<(), String> {
        match self {
            ExtraRule::ExistsAtLeastOneOf { xpaths } => {
                for xpath in xpaths {
                    if xpath.evaluate_boolean(element).map_err(|e| e.to_string())? {
                        return Ok(());
                    }
                }
                let listed: Vec<&str> = xpaths.iter().map(XPath::source).collect();
                Err(format!("none of {} found", listed.join(", ")))
            }
            ExtraRule::Expression { xpath, description } => {
                if xpath.evaluate_boolean(element).map_err(|e| e.to_string())? {
                    Ok(())
                } else {
                    Err(description
                        .clone()
                        .unwrap_or_else(|| format!("'{}' does not hold", xpath.source())))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpectedElementDefinition {
    pub name: String,
    relative_xpath: XPath,
    pub mandatory: bool,
    pub repeatable: bool,
    pub attributes: Vec<ExpectedAttributeDefinition>,
    pub children: Vec<ExpectedElementDefinition>,
    pub content: Option<ContentRequirement>,
    pub extra_rules: Vec<ExtraRule>,
    pub ignore_unexpected_attributes: bool,
    pub ignore_unexpected_children: bool,
    pub error_message: Option<String>,
}

impl ExpectedElementDefinition {
    /// Compiles a serialized definition tree, resolving every XPath.
    pub fn compile(spec: &ElementSpec, namespaces: &NamespaceContext) -> Result<Self, ProfileError> {
        if spec.name.trim().is_empty() {
            return Err(ProfileError::definition("<unnamed>", "element name is empty"));
        }
        let relative = match &spec.predicate {
            Some(predicate) => format!("{}[{predicate}]", spec.name),
            None => spec.name.clone(),
        };
        let relative_xpath = XPath::compile(&relative, namespaces)?;
        let attributes = spec
            .attributes
            .iter()
            .map(|attr| {
                let owner = format!("{}/@{}", spec.name, attr.name);
                Ok(ExpectedAttributeDefinition {
                    name: attr.name.clone(),
                    mandatory: attr.mandatory,
                    content: ContentRequirement::from_pair(
                        &owner,
                        attr.expected.as_ref(),
                        attr.recommended.as_ref(),
                    )?,
                })
            })
            .collect::<Result<Vec<_>, ProfileError>>()?;
        let children = spec
            .children
            .iter()
            .map(|child| Self::compile(child, namespaces))
            .collect::<Result<Vec<_>, _>>()?;
        let extra_rules = spec
            .extra_rules
            .iter()
            .map(|rule| compile_extra_rule(rule, namespaces))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: spec.name.clone(),
            relative_xpath,
            mandatory: spec.mandatory,
            repeatable: spec.repeatable,
            attributes,
            children,
            content: ContentRequirement::from_pair(
                &spec.name,
                spec.expected.as_ref(),
                spec.recommended.as_ref(),
            )?,
            extra_rules,
            ignore_unexpected_attributes: spec.ignore_unexpected_attributes,
            ignore_unexpected_children: spec.ignore_unexpected_children,
            error_message: spec.error_message.clone(),
        })
    }

    /// XPath selecting this element relative to its parent, e.g. `mods:titleInfo[@type='x']`.
    pub fn relative_xpath(&self) -> &XPath {
        &self.relative_xpath
    }
}

fn compile_extra_rule(
    spec: &ExtraRuleSpec,
    namespaces: &NamespaceContext,
) -> Result<ExtraRule, ProfileError> {
    match spec {
        ExtraRuleSpec::ExistsAtLeastOneOf { xpaths } => {
            if xpaths.is_empty() {
                return Err(ProfileError::definition(
                    "exists_at_least_one_of",
                    "at least one xpath is required",
                ));
            }
            let xpaths = xpaths
                .iter()
                .map(|xpath| XPath::compile(xpath, namespaces))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ExtraRule::ExistsAtLeastOneOf { xpaths })
        }
        ExtraRuleSpec::Expression { xpath, description } => Ok(ExtraRule::Expression {
            xpath: XPath::compile(xpath, namespaces)?,
            description: description.clone(),
        }),
    }
}
