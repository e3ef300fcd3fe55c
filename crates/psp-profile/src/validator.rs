//! Structural tree validation of an XML document against a metadata profile.
//!
//! The walk is top-down from the single root element. Each element is
//! checked in a fixed order: attributes, child elements (recursively),
//! direct text content, extra rules.
//!
//! Child matching is greedy in definition order: every definition selects its
//! candidates with its relative XPath, and only children not yet consumed by
//! an earlier definition are eligible. A child is consumed at most once.

use std::collections::BTreeSet;

use psp_model::{Level, ValidationResult};
use psp_xml::{Element, XmlDocument};

use crate::content::ContentRequirement;
use crate::definition::{ExpectedAttributeDefinition, ExpectedElementDefinition};
use crate::profile::MetadataProfile;

pub fn validate(profile: &MetadataProfile, document: &XmlDocument) -> ValidationResult {
    let mut result = ValidationResult::new();
    let root_name = profile.root.relative_xpath().source();
    let roots = match profile.root_xpath().select_elements_in(document) {
        Ok(roots) => roots,
        Err(error) => {
            result.add(Level::Error, error.to_string());
            return result;
        }
    };
    match roots.as_slice() {
        [] => result.add(Level::Error, format!("root element '{root_name}' not found")),
        [root] => check_element(
            &mut result,
            document.element(*root),
            &profile.root,
            None,
            None,
        ),
        _ => result.add(
            Level::Error,
            format!("multiple root elements '{root_name}' found"),
        ),
    }
    result
}

fn element_path(
    parent: Option<&str>,
    definition: &ExpectedElementDefinition,
    position: Option<usize>,
) -> String {
    let mut path = String::new();
    if let Some(parent) = parent {
        path.push_str(parent);
    }
    path.push('/');
    path.push_str(definition.relative_xpath().source());
    if let Some(position) = position {
        path.push_str(&format!("[{position}]"));
    }
    path
}

fn check_element(
    result: &mut ValidationResult,
    element: Element<'_>,
    definition: &ExpectedElementDefinition,
    parent_path: Option<&str>,
    position: Option<usize>,
) {
    let path = element_path(parent_path, definition, position);
    check_attributes(result, element, definition, &path);
    check_children(result, element, definition, &path);
    if let Some(requirement) = &definition.content {
        let text = element.direct_text();
        check_value(result, requirement, text.trim(), &path);
    }
    for rule in &definition.extra_rules {
        if let Err(message) = rule.check(element) {
            result.add(Level::Error, format!("{path}: extra rule not met: {message}"));
        }
    }
}

fn check_value(
    result: &mut ValidationResult,
    requirement: &ContentRequirement,
    value: &str,
    path: &str,
) {
    let (level, outcome) = match requirement {
        ContentRequirement::Expected(constraint) => (Level::Error, constraint.check(value)),
        ContentRequirement::Recommended(constraint) => (Level::Warning, constraint.check(value)),
    };
    if let Err(message) = outcome {
        result.add(level, format!("{path}: {message}"));
    }
}

fn check_attributes(
    result: &mut ValidationResult,
    element: Element<'_>,
    definition: &ExpectedElementDefinition,
    path: &str,
) {
    let attributes = element.attributes();
    let mut used = vec![false; attributes.len()];
    for attr_def in &definition.attributes {
        let found = attributes
            .iter()
            .position(|attr| attr.qualified_name() == attr_def.name);
        match found {
            Some(index) => {
                used[index] = true;
                check_attribute_value(result, attr_def, &attributes[index].value, path);
            }
            None if attr_def.mandatory => result.add(
                Level::Error,
                format!("{path}: mandatory attribute '{}' not found", attr_def.name),
            ),
            None => result.add(
                Level::Info,
                format!("{path}: recommended attribute '{}' not found", attr_def.name),
            ),
        }
    }
    if definition.ignore_unexpected_attributes {
        return;
    }
    // Namespace declarations are not attributes in the parsed model.
    for (attr, used) in attributes.iter().zip(used) {
        if !used {
            result.add(
                Level::Warning,
                format!("{path}: unexpected attribute '{}'", attr.qualified_name()),
            );
        }
    }
}

fn check_attribute_value(
    result: &mut ValidationResult,
    definition: &ExpectedAttributeDefinition,
    value: &str,
    path: &str,
) {
    if let Some(requirement) = &definition.content {
        check_value(result, requirement, value, &format!("{path}/@{}", definition.name));
    }
}

fn check_children(
    result: &mut ValidationResult,
    element: Element<'_>,
    definition: &ExpectedElementDefinition,
    path: &str,
) {
    let document = element.document();
    let mut remaining: BTreeSet<_> = element.child_ids().iter().copied().collect();
    for child_def in &definition.children {
        let relative = child_def.relative_xpath().source();
        let hits = match child_def.relative_xpath().select_elements(element) {
            Ok(hits) => hits,
            Err(error) => {
                result.add(Level::Error, format!("{path}: {error}"));
                continue;
            }
        };
        let mut accepted = false;
        for (index, hit) in hits.iter().enumerate() {
            if !remaining.remove(hit) {
                continue;
            }
            if accepted && !child_def.repeatable {
                result.add(
                    Level::Error,
                    format!("{path}: multiple occurrences of non-repeatable element '{relative}'"),
                );
                continue;
            }
            accepted = true;
            let position = (hits.len() > 1).then_some(index + 1);
            check_element(result, document.element(*hit), child_def, Some(path), position);
        }
        if !accepted {
            let (level, kind) = if child_def.mandatory {
                (Level::Error, "mandatory")
            } else {
                (Level::Info, "recommended")
            };
            let mut message = format!("{path}: expected {kind} element '{relative}' not found");
            if let Some(custom) = child_def
                .error_message
                .as_deref()
                .filter(|custom| !custom.trim().is_empty())
            {
                message.push_str(": ");
                message.push_str(custom);
            }
            result.add(level, message);
        }
    }
    if definition.ignore_unexpected_children {
        return;
    }
    for id in remaining {
        let child = document.element(id);
        let attributes: Vec<String> = child
            .attributes()
            .iter()
            .map(|attr| format!("{}=\"{}\"", attr.qualified_name(), attr.value))
            .collect();
        let mut message = format!("{path}: unexpected element '{}'", child.qualified_name());
        if !attributes.is_empty() {
            message.push_str(&format!(" ({})", attributes.join(", ")));
        }
        result.add(Level::Warning, message);
    }
}
