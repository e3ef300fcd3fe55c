//! Immutable rule-set definitions: sections, rules, variables, patterns and profiles.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use psp_profile::MetadataProfile;
use psp_tools::BinaryFileProfile;
use psp_xml::NamespaceContext;

use crate::error::EngineError;
use crate::function::{EvaluationFunction, ValidationFunction};
use crate::pattern::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SectionId(usize);

impl SectionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named group of rules. Cloning yields an independent copy.
#[derive(Debug, Clone)]
pub struct RulesSection {
    pub id: SectionId,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub rules: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub section: SectionId,
    pub name: String,
    pub description: Option<String>,
    pub function: ValidationFunction,
}

/// A rule-set variable computed once at run start.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub function: EvaluationFunction,
}

/// Everything one fDMF version declares. Never mutated once built.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    sections: Vec<RulesSection>,
    rules: Vec<Rule>,
    variables: Vec<VariableDefinition>,
    patterns: BTreeMap<String, Pattern>,
    namespaces: NamespaceContext,
    metadata_profiles: BTreeMap<String, Arc<MetadataProfile>>,
    binary_profiles: BTreeMap<String, Arc<BinaryFileProfile>>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    pub fn sections(&self) -> &[RulesSection] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> &RulesSection {
        &self.sections[id.0]
    }

    pub fn section_named(&self, name: &str) -> Option<&RulesSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    /// Rules of a section in declaration order.
    pub fn rules_of<'a>(&'a self, section: &'a RulesSection) -> impl Iterator<Item = &'a Rule> {
        section.rules.iter().map(|id| &self.rules[id.0])
    }

    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// Prefixes available to XPath expressions in rule parameters.
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    pub fn metadata_profile(&self, name: &str) -> Option<&Arc<MetadataProfile>> {
        self.metadata_profiles.get(name)
    }

    pub fn metadata_profiles(&self) -> impl Iterator<Item = &str> {
        self.metadata_profiles.keys().map(String::as_str)
    }

    pub fn binary_profile(&self, name: &str) -> Option<&Arc<BinaryFileProfile>> {
        self.binary_profiles.get(name)
    }

    pub fn binary_profiles(&self) -> impl Iterator<Item = &str> {
        self.binary_profiles.keys().map(String::as_str)
    }
}

/// Collects definitions and rejects duplicate names.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    set: RuleSet,
}

impl RuleSetBuilder {
    pub fn namespace(&mut self, prefix: &str, uri: &str) -> &mut Self {
        self.set.namespaces.insert(prefix, uri);
        self
    }

    pub fn section(
        &mut self,
        name: &str,
        description: Option<String>,
        enabled: bool,
    ) -> Result<SectionId, EngineError> {
        if self.set.section_named(name).is_some() {
            return Err(EngineError::DuplicateDefinition {
                kind: "section",
                name: name.to_string(),
            });
        }
        let id = SectionId(self.set.sections.len());
        self.set.sections.push(RulesSection {
            id,
            name: name.to_string(),
            description,
            enabled,
            rules: Vec::new(),
        });
        Ok(id)
    }

    pub fn rule(
        &mut self,
        section: SectionId,
        name: &str,
        description: Option<String>,
        function: ValidationFunction,
    ) -> Result<RuleId, EngineError> {
        let owner = &self.set.sections[section.0];
        if owner
            .rules
            .iter()
            .any(|id| self.set.rules[id.0].name == name)
        {
            return Err(EngineError::DuplicateDefinition {
                kind: "rule",
                name: format!("{}/{name}", owner.name),
            });
        }
        let id = RuleId(self.set.rules.len());
        self.set.rules.push(Rule {
            id,
            section,
            name: name.to_string(),
            description,
            function,
        });
        self.set.sections[section.0].rules.push(id);
        Ok(id)
    }

    pub fn variable(&mut self, name: &str, function: EvaluationFunction) -> Result<(), EngineError> {
        if self.set.variables.iter().any(|variable| variable.name == name) {
            return Err(EngineError::DuplicateDefinition {
                kind: "variable",
                name: name.to_string(),
            });
        }
        self.set.variables.push(VariableDefinition {
            name: name.to_string(),
            function,
        });
        Ok(())
    }

    pub fn pattern(&mut self, name: &str, pattern: Pattern) -> Result<(), EngineError> {
        insert_unique(&mut self.set.patterns, "pattern", name, pattern)
    }

    pub fn metadata_profile(&mut self, profile: MetadataProfile) -> Result<(), EngineError> {
        let name = profile.name.clone();
        insert_unique(
            &mut self.set.metadata_profiles,
            "metadata profile",
            &name,
            Arc::new(profile),
        )
    }

    pub fn binary_profile(&mut self, profile: BinaryFileProfile) -> Result<(), EngineError> {
        let name = profile.name.clone();
        insert_unique(
            &mut self.set.binary_profiles,
            "binary profile",
            &name,
            Arc::new(profile),
        )
    }

    pub fn build(self) -> RuleSet {
        self.set
    }
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    name: &str,
    value: T,
) -> Result<(), EngineError> {
    if map.contains_key(name) {
        return Err(EngineError::DuplicateDefinition {
            kind,
            name: name.to_string(),
        });
    }
    map.insert(name.to_string(), value);
    Ok(())
}
