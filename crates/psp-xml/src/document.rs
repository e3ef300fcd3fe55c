//! Owned, immutable XML document model.
//!
//! Documents are parsed with `roxmltree` and copied into an arena of elements
//! indexed in document order, so they can be cached and shared between rules
//! without borrowing the source text.

use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use crate::error::XmlError;

/// Index of an element inside its [`XmlDocument`]. Ordering is document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    /// Name as written in the document, e.g. `xlink:href`.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Text(String),
    Element(ElementId),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    pub(crate) prefix: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) local_name: String,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) content: Vec<Content>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) parent: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    elements: Vec<ElementData>,
    source: Option<PathBuf>,
}

impl XmlDocument {
    /// Parse a document from text.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        Self::parse_inner(text).map_err(|message| XmlError::Parse { message })
    }

    /// Read and parse a document from disk.
    pub fn load(path: &Path) -> Result<Self, XmlError> {
        let bytes = std::fs::read(path).map_err(|e| XmlError::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| XmlError::Encoding {
            path: path.to_path_buf(),
        })?;
        let mut document =
            Self::parse_inner(&text).map_err(|message| XmlError::ParseFile {
                path: path.to_path_buf(),
                message,
            })?;
        document.source = Some(path.to_path_buf());
        debug!(
            path = %path.display(),
            elements = document.element_count(),
            "parsed XML document"
        );
        Ok(document)
    }

    fn parse_inner(text: &str) -> Result<Self, String> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let parsed = Document::parse_with_options(text, options).map_err(|e| e.to_string())?;
        let mut elements = Vec::new();
        build_element(parsed.root_element(), None, &mut elements);
        Ok(Self {
            elements,
            source: None,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn root(&self) -> Element<'_> {
        Element {
            document: self,
            id: ElementId(0),
        }
    }

    pub fn element(&self, id: ElementId) -> Element<'_> {
        Element { document: self, id }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub(crate) fn data(&self, id: ElementId) -> &ElementData {
        &self.elements[id.0]
    }
}

fn build_element(
    node: Node<'_, '_>,
    parent: Option<ElementId>,
    elements: &mut Vec<ElementData>,
) -> ElementId {
    let id = ElementId(elements.len());
    let tag = node.tag_name();
    let namespace = tag.namespace().map(str::to_string);
    let prefix = tag
        .namespace()
        .and_then(|uri| node.lookup_prefix(uri))
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string);
    let attributes = node
        .attributes()
        .map(|attr| Attribute {
            prefix: attr
                .namespace()
                .and_then(|uri| node.lookup_prefix(uri))
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_string),
            namespace: attr.namespace().map(str::to_string),
            local_name: attr.name().to_string(),
            value: attr.value().to_string(),
        })
        .collect();
    elements.push(ElementData {
        prefix,
        namespace,
        local_name: tag.name().to_string(),
        attributes,
        content: Vec::new(),
        children: Vec::new(),
        parent,
    });

    for child in node.children() {
        if child.is_element() {
            let child_id = build_element(child, Some(id), elements);
            elements[id.0].children.push(child_id);
            elements[id.0].content.push(Content::Element(child_id));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                elements[id.0].content.push(Content::Text(text.to_string()));
            }
        }
    }
    id
}

/// Borrowed view of one element.
#[derive(Clone, Copy)]
pub struct Element<'a> {
    document: &'a XmlDocument,
    id: ElementId,
}

impl<'a> Element<'a> {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn document(&self) -> &'a XmlDocument {
        self.document
    }

    fn data(&self) -> &'a ElementData {
        self.document.data(self.id)
    }

    pub fn local_name(&self) -> &'a str {
        &self.data().local_name
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.data().namespace.as_deref()
    }

    pub fn prefix(&self) -> Option<&'a str> {
        self.data().prefix.as_deref()
    }

    /// Tag name as written in the document, e.g. `mods:titleInfo`.
    pub fn qualified_name(&self) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}:{}", self.local_name()),
            None => self.local_name().to_string(),
        }
    }

    pub fn attributes(&self) -> &'a [Attribute] {
        &self.data().attributes
    }

    /// Look up an attribute by its qualified name.
    pub fn attribute(&self, qualified_name: &str) -> Option<&'a Attribute> {
        self.attributes()
            .iter()
            .find(|attr| attr.qualified_name() == qualified_name)
    }

    pub fn parent(&self) -> Option<Element<'a>> {
        self.data().parent.map(|id| self.document.element(id))
    }

    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + use<'a> {
        let document = self.document;
        self.data()
            .children
            .iter()
            .map(move |id| document.element(*id))
    }

    pub fn child_ids(&self) -> &'a [ElementId] {
        &self.data().children
    }

    /// Concatenation of this element's own text nodes, excluding descendants.
    pub fn direct_text(&self) -> String {
        self.data()
            .content
            .iter()
            .filter_map(|content| match content {
                Content::Text(text) => Some(text.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }

    /// XPath string-value: all descendant text in document order.
    pub fn string_value(&self) -> String {
        let mut out = String::new();
        collect_text(self.document, self.id, &mut out);
        out
    }
}

fn collect_text(document: &XmlDocument, id: ElementId, out: &mut String) {
    for content in &document.data(id).content {
        match content {
            Content::Text(text) => out.push_str(text),
            Content::Element(child) => collect_text(document, *child, out),
        }
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("name", &self.qualified_name())
            .finish()
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.document, other.document) && self.id == other.id
    }
}

impl Eq for Element<'_> {}
