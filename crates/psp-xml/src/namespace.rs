use std::collections::BTreeMap;

/// Prefix to namespace-URI bindings used when compiling XPath expressions.
///
/// The prefixes are those of the rule set, not of the checked document, so a
/// profile written for `mods:` still matches a file that binds the MODS
/// namespace to another prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: BTreeMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.insert(prefix, uri);
        self
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some("http://www.w3.org/XML/1998/namespace");
        }
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }

    /// Bindings of `other` override bindings of `self` with the same prefix.
    #[must_use]
    pub fn merged(&self, other: &NamespaceContext) -> NamespaceContext {
        let mut bindings = self.bindings.clone();
        bindings.extend(other.bindings.clone());
        NamespaceContext { bindings }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NamespaceContext {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut context = Self::new();
        for (prefix, uri) in iter {
            context.insert(prefix, uri);
        }
        context
    }
}
