pub mod document;
pub mod error;
pub mod namespace;
pub mod xpath;

pub use document::{Attribute, Element, ElementId, XmlDocument};
pub use error::{XPathError, XmlError};
pub use namespace::NamespaceContext;
pub use xpath::XPath;
