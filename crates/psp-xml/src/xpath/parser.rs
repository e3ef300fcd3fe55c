//! Recursive-descent parser for the supported XPath 1.0 subset.
//!
//! Supported: location paths (absolute, relative, `//`), the child,
//! attribute, descendant, descendant-or-self, self and parent axes, name,
//! wildcard and `text()`/`node()` tests, predicates, `|`, comparisons,
//! `and`/`or`, literals, numbers and a core function library.

use crate::namespace::NamespaceContext;
use crate::xpath::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Attribute,
    Descendant,
    DescendantOrSelf,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
    /// `*`: any element (or any attribute on the attribute axis).
    AnyName,
    /// `prefix:*`
    AnyInNamespace(String),
    Name {
        namespace: Option<String>,
        local: String,
    },
    Text,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Boolean,
    Concat,
    Contains,
    Count,
    False,
    Last,
    LocalName,
    Name,
    NormalizeSpace,
    Not,
    Number,
    Position,
    StartsWith,
    String,
    StringLength,
    True,
}

impl Function {
    fn lookup(name: &str) -> Option<(Function, usize, Option<usize>)> {
        let entry = match name {
            "boolean" => (Function::Boolean, 1, Some(1)),
            "concat" => (Function::Concat, 2, None),
            "contains" => (Function::Contains, 2, Some(2)),
            "count" => (Function::Count, 1, Some(1)),
            "false" => (Function::False, 0, Some(0)),
            "last" => (Function::Last, 0, Some(0)),
            "local-name" => (Function::LocalName, 0, Some(1)),
            "name" => (Function::Name, 0, Some(1)),
            "normalize-space" => (Function::NormalizeSpace, 0, Some(1)),
            "not" => (Function::Not, 1, Some(1)),
            "number" => (Function::Number, 0, Some(1)),
            "position" => (Function::Position, 0, Some(0)),
            "starts-with" => (Function::StartsWith, 2, Some(2)),
            "string" => (Function::String, 0, Some(1)),
            "string-length" => (Function::StringLength, 0, Some(1)),
            "true" => (Function::True, 0, Some(0)),
            _ => return None,
        };
        Some(entry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathStart {
    Root,
    Context,
    Filter(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
    Filter(Box<Expr>, Vec<Expr>),
    Path { start: PathStart, steps: Vec<Step> },
}

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    namespaces: &'a NamespaceContext,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Token>, namespaces: &'a NamespaceContext) -> Self {
        Self {
            tokens,
            pos: 0,
            namespaces,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("empty expression".to_string());
        }
        let expr = self.or_expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected token {token:?}")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {:?}", self.peek()))
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(name)) if name == keyword)
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.and_expr()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.equality_expr()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.equality_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.relational_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn relational_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.union_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::LtEq) => CompareOp::LtEq,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::GtEq) => CompareOp::GtEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.union_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn union_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path_expr(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if self.starts_step() {
                    self.relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path {
                    start: PathStart::Root,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![descendant_or_self()];
                steps.extend(self.relative_steps()?);
                Ok(Expr::Path {
                    start: PathStart::Root,
                    steps,
                })
            }
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => self.filter_path(),
            Some(Token::Name(name)) if self.is_function_call(name) => self.filter_path(),
            _ => {
                let steps = self.relative_steps()?;
                Ok(Expr::Path {
                    start: PathStart::Context,
                    steps,
                })
            }
        }
    }

    fn is_function_call(&self, name: &str) -> bool {
        self.tokens.get(self.pos + 1) == Some(&Token::LParen)
            && name != "text"
            && name != "node"
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot | Token::Axis(_)
            )
        )
    }

    fn filter_path(&mut self) -> Result<Expr, String> {
        let primary = self.primary_expr()?;
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        let filtered = if predicates.is_empty() {
            primary
        } else {
            Expr::Filter(Box::new(primary), predicates)
        };
        let mut steps = Vec::new();
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self());
                steps.push(self.step()?);
            } else {
                break;
            }
        }
        if steps.is_empty() {
            Ok(filtered)
        } else {
            Ok(Expr::Path {
                start: PathStart::Filter(Box::new(filtered)),
                steps,
            })
        }
    }

    fn primary_expr(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Literal(text)) => Ok(Expr::Literal(text)),
            Some(Token::Number(number)) => Ok(Expr::Number(number)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                let (function, min, max) =
                    Function::lookup(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.or_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(format!(
                        "wrong number of arguments for {name}(): {}",
                        args.len()
                    ));
                }
                Ok(Expr::Call(function, args))
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }

    fn relative_steps(&mut self) -> Result<Vec<Step>, String> {
        let mut steps = vec![self.step()?];
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn step(&mut self) -> Result<Step, String> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let Some(Token::Axis(name)) = self.peek().cloned() {
            self.pos += 1;
            match name.as_str() {
                "child" => Axis::Child,
                "attribute" => Axis::Attribute,
                "descendant" => Axis::Descendant,
                "descendant-or-self" => Axis::DescendantOrSelf,
                "self" => Axis::SelfNode,
                "parent" => Axis::Parent,
                other => return Err(format!("unsupported axis '{other}'")),
            }
        } else {
            Axis::Child
        };
        let test = self.node_test()?;
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, String> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::AnyName),
            Some(Token::Name(name)) => {
                if (name == "text" || name == "node") && self.eat(&Token::LParen) {
                    self.expect(&Token::RParen)?;
                    return Ok(if name == "text" {
                        NodeTest::Text
                    } else {
                        NodeTest::Node
                    });
                }
                match name.split_once(':') {
                    Some((prefix, "*")) => Ok(NodeTest::AnyInNamespace(self.resolve(prefix)?)),
                    Some((prefix, local)) => Ok(NodeTest::Name {
                        namespace: Some(self.resolve(prefix)?),
                        local: local.to_string(),
                    }),
                    None => Ok(NodeTest::Name {
                        namespace: None,
                        local: name,
                    }),
                }
            }
            other => Err(format!("expected node test, found {other:?}")),
        }
    }

    fn resolve(&self, prefix: &str) -> Result<String, String> {
        self.namespaces
            .uri(prefix)
            .map(str::to_string)
            .ok_or_else(|| format!("undefined namespace prefix '{prefix}'"))
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: Vec::new(),
    }
}
