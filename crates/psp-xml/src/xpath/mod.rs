//! Compiled XPath expressions.

mod eval;
mod lexer;
mod parser;

use std::fmt;

use crate::document::{Element, ElementId, XmlDocument};
use crate::error::XPathError;
use crate::namespace::NamespaceContext;

use eval::{EvalError, Evaluator, Node, Value};
use parser::{Expr, Parser};

/// An XPath expression compiled against a [`NamespaceContext`].
///
/// Namespace prefixes are resolved at compile time, so an unknown prefix is
/// reported by [`XPath::compile`] rather than at evaluation.
#[derive(Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn compile(source: &str, namespaces: &NamespaceContext) -> Result<Self, XPathError> {
        let invalid = |message: String| XPathError::InvalidExpression {
            expression: source.to_string(),
            message,
        };
        let tokens = lexer::tokenize(source).map_err(invalid)?;
        let expr = Parser::new(tokens, namespaces).parse().map_err(invalid)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Elements selected by the expression, in document order.
    ///
    /// Non-element nodes in the result are skipped.
    pub fn select_elements(&self, context: Element<'_>) -> Result<Vec<ElementId>, XPathError> {
        let nodes = self.select_nodes(context)?;
        Ok(nodes
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    /// String values of every node selected by the expression.
    pub fn select_strings(&self, context: Element<'_>) -> Result<Vec<String>, XPathError> {
        let evaluator = Evaluator::new(context.document());
        let nodes = self.select_nodes(context)?;
        Ok(nodes
            .into_iter()
            .map(|node| evaluator.string_value(node))
            .collect())
    }

    /// XPath `string()` of the result.
    pub fn evaluate_string(&self, context: Element<'_>) -> Result<String, XPathError> {
        let evaluator = Evaluator::new(context.document());
        let value = self.run(&evaluator, context.id())?;
        Ok(evaluator.to_string_value(&value))
    }

    /// XPath `boolean()` of the result.
    pub fn evaluate_boolean(&self, context: Element<'_>) -> Result<bool, XPathError> {
        let evaluator = Evaluator::new(context.document());
        let value = self.run(&evaluator, context.id())?;
        Ok(evaluator.to_bool(&value))
    }

    /// Evaluate against the document node rather than an element.
    pub fn evaluate_string_in(&self, document: &XmlDocument) -> Result<String, XPathError> {
        let evaluator = Evaluator::new(document);
        let value = evaluator
            .evaluate(&self.expr, Node::Document)
            .map_err(|e| self.eval_error(e))?;
        Ok(evaluator.to_string_value(&value))
    }

    /// Elements selected when evaluated against the document node.
    pub fn select_elements_in(&self, document: &XmlDocument) -> Result<Vec<ElementId>, XPathError> {
        let evaluator = Evaluator::new(document);
        match evaluator
            .evaluate(&self.expr, Node::Document)
            .map_err(|e| self.eval_error(e))?
        {
            Value::Nodes(nodes) => Ok(nodes
                .into_iter()
                .filter_map(|node| match node {
                    Node::Element(id) => Some(id),
                    _ => None,
                })
                .collect()),
            _ => Err(self.not_node_set()),
        }
    }

    fn select_nodes(&self, context: Element<'_>) -> Result<Vec<Node>, XPathError> {
        let evaluator = Evaluator::new(context.document());
        match self.run(&evaluator, context.id())? {
            Value::Nodes(nodes) => Ok(nodes),
            _ => Err(self.not_node_set()),
        }
    }

    fn run(&self, evaluator: &Evaluator<'_>, context: ElementId) -> Result<Value, XPathError> {
        evaluator
            .evaluate(&self.expr, Node::Element(context))
            .map_err(|e| self.eval_error(e))
    }

    fn eval_error(&self, error: EvalError) -> XPathError {
        match error {
            EvalError::NotNodeSet => self.not_node_set(),
        }
    }

    fn not_node_set(&self) -> XPathError {
        XPathError::NotNodeSet {
            expression: self.source.clone(),
        }
    }
}

impl fmt::Debug for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPath").field(&self.source).finish()
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::eval::format_number;

    #[test]
    fn numbers_format_like_xpath() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
