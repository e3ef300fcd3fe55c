use std::cmp::Ordering;

use crate::document::{Content, ElementId, XmlDocument};
use crate::xpath::parser::{Axis, CompareOp, Expr, Function, NodeTest, PathStart, Step};

/// A node of the XPath data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Node {
    Document,
    Element(ElementId),
    /// Attribute `index` of the element.
    Attribute(ElementId, usize),
    /// Content item `index` of the element, always a text item.
    Text(ElementId, usize),
}

impl Node {
    fn order_key(self) -> (usize, u8, usize) {
        match self {
            Node::Document => (0, 0, 0),
            Node::Element(id) => (id.index() + 1, 0, 0),
            Node::Attribute(id, index) => (id.index() + 1, 1, index),
            Node::Text(id, index) => (id.index() + 1, 2, index),
        }
    }

    fn document_order(&self, other: &Node) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Nodes(Vec<Node>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Clone, Copy)]
struct Context {
    node: Node,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'d> {
    document: &'d XmlDocument,
}

pub(crate) enum EvalError {
    NotNodeSet,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(document: &'d XmlDocument) -> Self {
        Self { document }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, node: Node) -> Result<Value, EvalError> {
        self.eval(
            expr,
            Context {
                node,
                position: 1,
                size: 1,
            },
        )
    }

    fn eval(&self, expr: &Expr, ctx: Context) -> Result<Value, EvalError> {
        match expr {
            Expr::Or(left, right) => {
                if self.to_bool(&self.eval(left, ctx)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.to_bool(&self.eval(right, ctx)?)))
            }
            Expr::And(left, right) => {
                if !self.to_bool(&self.eval(left, ctx)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.to_bool(&self.eval(right, ctx)?)))
            }
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                Ok(Value::Bool(self.compare(*op, &left, &right)))
            }
            Expr::Union(left, right) => {
                let Value::Nodes(mut nodes) = self.eval(left, ctx)? else {
                    return Err(EvalError::NotNodeSet);
                };
                let Value::Nodes(more) = self.eval(right, ctx)? else {
                    return Err(EvalError::NotNodeSet);
                };
                nodes.extend(more);
                Ok(Value::Nodes(sorted_unique(nodes)))
            }
            Expr::Literal(text) => Ok(Value::Str(text.clone())),
            Expr::Number(number) => Ok(Value::Num(*number)),
            Expr::Call(function, args) => self.call(*function, args, ctx),
            Expr::Filter(primary, predicates) => {
                let Value::Nodes(nodes) = self.eval(primary, ctx)? else {
                    return Err(EvalError::NotNodeSet);
                };
                let mut nodes = nodes;
                for predicate in predicates {
                    nodes = self.apply_predicate(&nodes, predicate)?;
                }
                Ok(Value::Nodes(nodes))
            }
            Expr::Path { start, steps } => {
                let mut nodes = match start {
                    PathStart::Root => vec![Node::Document],
                    PathStart::Context => vec![ctx.node],
                    PathStart::Filter(inner) => match self.eval(inner, ctx)? {
                        Value::Nodes(nodes) => nodes,
                        _ => return Err(EvalError::NotNodeSet),
                    },
                };
                for step in steps {
                    nodes = self.apply_step(&nodes, step)?;
                }
                Ok(Value::Nodes(nodes))
            }
        }
    }

    fn apply_step(&self, input: &[Node], step: &Step) -> Result<Vec<Node>, EvalError> {
        let mut output = Vec::new();
        for node in input {
            let mut candidates: Vec<Node> = self
                .axis_nodes(*node, step.axis)
                .into_iter()
                .filter(|candidate| self.matches_test(*candidate, step.axis, &step.test))
                .collect();
            for predicate in &step.predicates {
                candidates = self.apply_predicate(&candidates, predicate)?;
            }
            output.extend(candidates);
        }
        Ok(sorted_unique(output))
    }

    fn apply_predicate(&self, nodes: &[Node], predicate: &Expr) -> Result<Vec<Node>, EvalError> {
        let size = nodes.len();
        let mut kept = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            let ctx = Context {
                node: *node,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, ctx)? {
                Value::Num(number) => number == (index + 1) as f64,
                other => self.to_bool(&other),
            };
            if keep {
                kept.push(*node);
            }
        }
        Ok(kept)
    }

    fn axis_nodes(&self, node: Node, axis: Axis) -> Vec<Node> {
        match axis {
            Axis::SelfNode => vec![node],
            Axis::Parent => match node {
                Node::Document => Vec::new(),
                Node::Element(id) => match self.document.data(id).parent {
                    Some(parent) => vec![Node::Element(parent)],
                    None => vec![Node::Document],
                },
                Node::Attribute(id, _) | Node::Text(id, _) => vec![Node::Element(id)],
            },
            Axis::Attribute => match node {
                Node::Element(id) => (0..self.document.data(id).attributes.len())
                    .map(|index| Node::Attribute(id, index))
                    .collect(),
                _ => Vec::new(),
            },
            Axis::Child => self.children(node),
            Axis::Descendant => {
                let mut out = Vec::new();
                self.collect_descendants(node, &mut out);
                out
            }
            Axis::DescendantOrSelf => {
                let mut out = vec![node];
                self.collect_descendants(node, &mut out);
                out
            }
        }
    }

    fn children(&self, node: Node) -> Vec<Node> {
        match node {
            Node::Document => vec![Node::Element(self.document.root().id())],
            Node::Element(id) => self
                .document
                .data(id)
                .content
                .iter()
                .enumerate()
                .map(|(index, content)| match content {
                    Content::Element(child) => Node::Element(*child),
                    Content::Text(_) => Node::Text(id, index),
                })
                .collect(),
            Node::Attribute(..) | Node::Text(..) => Vec::new(),
        }
    }

    fn collect_descendants(&self, node: Node, out: &mut Vec<Node>) {
        for child in self.children(node) {
            out.push(child);
            if matches!(child, Node::Element(_)) {
                self.collect_descendants(child, out);
            }
        }
    }

    fn matches_test(&self, node: Node, axis: Axis, test: &NodeTest) -> bool {
        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(node, Node::Text(..)),
            NodeTest::AnyName => match node {
                Node::Element(_) => axis != Axis::Attribute,
                Node::Attribute(..) => axis == Axis::Attribute,
                _ => false,
            },
            NodeTest::AnyInNamespace(uri) => {
                self.node_name(node, axis)
                    .is_some_and(|(namespace, _)| namespace == Some(uri.as_str()))
            }
            NodeTest::Name { namespace, local } => {
                self.node_name(node, axis).is_some_and(|(node_ns, node_local)| {
                    node_local == local && node_ns == namespace.as_deref()
                })
            }
        }
    }

    /// Expanded name of an element or attribute, if it is the principal node
    /// type of the axis.
    fn node_name(&self, node: Node, axis: Axis) -> Option<(Option<&'d str>, &'d str)> {
        match (node, axis) {
            (Node::Element(id), axis) if axis != Axis::Attribute => {
                let data = self.document.data(id);
                Some((data.namespace.as_deref(), data.local_name.as_str()))
            }
            (Node::Attribute(id, index), Axis::Attribute) => {
                let attr = &self.document.data(id).attributes[index];
                Some((attr.namespace.as_deref(), attr.local_name.as_str()))
            }
            _ => None,
        }
    }

    pub(crate) fn string_value(&self, node: Node) -> String {
        match node {
            Node::Document => self.document.root().string_value(),
            Node::Element(id) => self.document.element(id).string_value(),
            Node::Attribute(id, index) => self.document.data(id).attributes[index].value.clone(),
            Node::Text(id, index) => match &self.document.data(id).content[index] {
                Content::Text(text) => text.clone(),
                Content::Element(_) => String::new(),
            },
        }
    }

    fn qualified_name(&self, node: Node) -> String {
        match node {
            Node::Element(id) => self.document.element(id).qualified_name(),
            Node::Attribute(id, index) => self.document.data(id).attributes[index].qualified_name(),
            _ => String::new(),
        }
    }

    fn local_name(&self, node: Node) -> String {
        match node {
            Node::Element(id) => self.document.data(id).local_name.clone(),
            Node::Attribute(id, index) => {
                self.document.data(id).attributes[index].local_name.clone()
            }
            _ => String::new(),
        }
    }

    pub(crate) fn to_string_value(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|node| self.string_value(*node))
                .unwrap_or_default(),
            Value::Str(text) => text.clone(),
            Value::Num(number) => format_number(*number),
            Value::Bool(flag) => flag.to_string(),
        }
    }

    fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(number) => *number,
            Value::Bool(flag) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&self.to_string_value(other)),
        }
    }

    pub(crate) fn to_bool(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Str(text) => !text.is_empty(),
            Value::Num(number) => *number != 0.0 && !number.is_nan(),
            Value::Bool(flag) => *flag,
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(left_nodes), Value::Nodes(right_nodes)) => {
                let right_strings: Vec<String> = right_nodes
                    .iter()
                    .map(|node| self.string_value(*node))
                    .collect();
                left_nodes.iter().any(|node| {
                    let left_string = self.string_value(*node);
                    right_strings
                        .iter()
                        .any(|right_string| compare_strings(op, &left_string, right_string))
                })
            }
            (Value::Nodes(nodes), other) => self.compare_node_set(op, nodes, other, false),
            (other, Value::Nodes(nodes)) => self.compare_node_set(op, nodes, other, true),
            _ => self.compare_atomic(op, left, right),
        }
    }

    fn compare_node_set(&self, op: CompareOp, nodes: &[Node], other: &Value, swapped: bool) -> bool {
        if let Value::Bool(flag) = other {
            let set_flag = !nodes.is_empty();
            let (left, right) = if swapped {
                (*flag, set_flag)
            } else {
                (set_flag, *flag)
            };
            return compare_numbers(op, f64::from(u8::from(left)), f64::from(u8::from(right)));
        }
        nodes.iter().any(|node| {
            let node_value = Value::Str(self.string_value(*node));
            if swapped {
                self.compare_atomic(op, other, &node_value)
            } else {
                self.compare_atomic(op, &node_value, other)
            }
        })
    }

    fn compare_atomic(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match op {
            CompareOp::Eq | CompareOp::NotEq => {
                if matches!(left, Value::Bool(_)) || matches!(right, Value::Bool(_)) {
                    let equal = self.to_bool(left) == self.to_bool(right);
                    equal == (op == CompareOp::Eq)
                } else if matches!(left, Value::Num(_)) || matches!(right, Value::Num(_)) {
                    compare_numbers(op, self.to_number(left), self.to_number(right))
                } else {
                    compare_strings(op, &self.to_string_value(left), &self.to_string_value(right))
                }
            }
            _ => compare_numbers(op, self.to_number(left), self.to_number(right)),
        }
    }

    fn call(&self, function: Function, args: &[Expr], ctx: Context) -> Result<Value, EvalError> {
        let values = args
            .iter()
            .map(|arg| self.eval(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        let string_arg = |index: usize| -> String {
            match values.get(index) {
                Some(value) => self.to_string_value(value),
                None => self.string_value(ctx.node),
            }
        };
        let node_arg = |index: usize| -> Result<Option<Node>, EvalError> {
            match values.get(index) {
                Some(Value::Nodes(nodes)) => Ok(nodes.first().copied()),
                Some(_) => Err(EvalError::NotNodeSet),
                None => Ok(Some(ctx.node)),
            }
        };
        let value = match function {
            Function::Boolean => Value::Bool(self.to_bool(&values[0])),
            Function::Concat => Value::Str(
                values
                    .iter()
                    .map(|value| self.to_string_value(value))
                    .collect(),
            ),
            Function::Contains => Value::Bool(string_arg(0).contains(&string_arg(1))),
            Function::Count => match &values[0] {
                Value::Nodes(nodes) => Value::Num(nodes.len() as f64),
                _ => return Err(EvalError::NotNodeSet),
            },
            Function::False => Value::Bool(false),
            Function::Last => Value::Num(ctx.size as f64),
            Function::LocalName => Value::Str(
                node_arg(0)?
                    .map(|node| self.local_name(node))
                    .unwrap_or_default(),
            ),
            Function::Name => Value::Str(
                node_arg(0)?
                    .map(|node| self.qualified_name(node))
                    .unwrap_or_default(),
            ),
            Function::NormalizeSpace => Value::Str(
                string_arg(0)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Function::Not => Value::Bool(!self.to_bool(&values[0])),
            Function::Number => Value::Num(match values.first() {
                Some(value) => self.to_number(value),
                None => parse_number(&self.string_value(ctx.node)),
            }),
            Function::Position => Value::Num(ctx.position as f64),
            Function::StartsWith => Value::Bool(string_arg(0).starts_with(&string_arg(1))),
            Function::String => Value::Str(string_arg(0)),
            Function::StringLength => Value::Num(string_arg(0).chars().count() as f64),
            Function::True => Value::Bool(true),
        };
        Ok(value)
    }
}

fn sorted_unique(mut nodes: Vec<Node>) -> Vec<Node> {
    nodes.sort_by(Node::document_order);
    nodes.dedup();
    nodes
}

fn compare_strings(op: CompareOp, left: &str, right: &str) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        _ => compare_numbers(op, parse_number(left), parse_number(right)),
    }
}

fn compare_numbers(op: CompareOp, left: f64, right: f64) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::Lt => left < right,
        CompareOp::LtEq => left <= right,
        CompareOp::Gt => left > right,
        CompareOp::GtEq => left >= right,
    }
}

fn parse_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

pub(crate) fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        if number > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}
