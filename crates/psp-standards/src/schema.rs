//! Serialized form of `fdmf.toml`.
//!
//! ```toml
//! [fdmf]
//! schema = "psp-validator.fdmf"
//! schema_version = 1
//! document_type = "MONOGRAPH"
//! version = "1.2"
//!
//! [namespaces]
//! mets = "http://www.loc.gov/METS/"
//!
//! [[pattern]]
//! name = "INFO_FILE"
//! expressions = [{ regex = 'info_${PSP_ID}\.xml', case_sensitive = false }]
//!
//! [[variable]]
//! name = "PSP_ROOT"
//! function = "getProvidedFile"
//! params = { file_id = "PSP_DIR" }
//!
//! [[section]]
//! name = "Root directory"
//!
//! [[section.rule]]
//! name = "info file exists"
//! function = "checkFilelistExactSize"
//! params = { files = { ref = "INFO_FILES" }, size = 1 }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use psp_model::{DmfVersion, DocumentType};

pub const FDMF_SCHEMA: &str = "psp-validator.fdmf";
pub const FDMF_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FdmfFile {
    pub fdmf: FdmfHeader,
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    #[serde(default, rename = "pattern")]
    pub patterns: Vec<NamedPatternSpec>,
    #[serde(default, rename = "variable")]
    pub variables: Vec<VariableSpec>,
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FdmfHeader {
    pub schema: String,
    pub schema_version: u32,
    pub document_type: DocumentType,
    pub version: DmfVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedPatternSpec {
    pub name: String,
    pub expressions: Vec<ExpressionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpressionSpec {
    pub regex: String,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

fn default_true() -> bool {
    true
}

/// A pattern parameter: either inline expressions or a named pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Reference(ReferenceSpec),
    Inline(InlinePatternSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InlinePatternSpec {
    pub expressions: Vec<ExpressionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceSpec {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypedValueSpec {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: toml::Value,
}

/// One value bound to a parameter.
///
/// A bare string is a STRING constant and a bare integer an INTEGER constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSpec {
    Reference(ReferenceSpec),
    Typed(TypedValueSpec),
    Text(String),
    Integer(i64),
}

/// A parameter may be bound once or several times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingList {
    One(BindingSpec),
    Many(Vec<BindingSpec>),
}

impl BindingList {
    pub fn iter(&self) -> std::slice::Iter<'_, BindingSpec> {
        match self {
            BindingList::One(binding) => std::slice::from_ref(binding).iter(),
            BindingList::Many(bindings) => bindings.iter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    pub name: String,
    pub function: String,
    #[serde(default)]
    pub params: BTreeMap<String, BindingList>,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub function: String,
    #[serde(default)]
    pub params: BTreeMap<String, BindingList>,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternSpec>,
}
