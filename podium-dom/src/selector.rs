//! Structural selector language.
//!
//! Covers the subset of CSS selectors the chat surface is addressed with: selector lists,
//! compound selectors (tag, `.class`, `#id`, attribute tests) and the descendant / child
//! combinators. Matching follows `querySelector` semantics, i.e. the full ancestry of a
//! candidate is considered, not only the part below the query scope.

use crate::snapshot::DomSnapshot;
use crate::node::NodeId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected {found:?} at offset {position} in {selector:?}")]
    Unexpected {
        selector: String,
        found: char,
        position: usize,
    },
    #[error("expected identifier at offset {position} in {selector:?}")]
    ExpectedIdent { selector: String, position: usize },
    #[error("unterminated attribute test in {0:?}")]
    UnterminatedAttribute(String),
    #[error("unterminated string in {0:?}")]
    UnterminatedString(String),
}

/// Parsed selector list. Matches when any alternative matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    /// Left to right; `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeTest {
    name: String,
    op: AttributeOp,
}

#[derive(Debug, Clone, PartialEq)]
enum AttributeOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Includes(String),
}

impl AttributeOp {
    fn test(&self, value: &str) -> bool {
        match self {
            AttributeOp::Exists => true,
            AttributeOp::Equals(expected) => value == expected,
            AttributeOp::Prefix(expected) => !expected.is_empty() && value.starts_with(expected),
            AttributeOp::Suffix(expected) => !expected.is_empty() && value.ends_with(expected),
            AttributeOp::Contains(expected) => !expected.is_empty() && value.contains(expected),
            AttributeOp::Includes(expected) => value
                .split_ascii_whitespace()
                .any(|word| word == expected),
        }
    }
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        Parser::new(source).parse_list()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, doc: &DomSnapshot, id: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(doc, id))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Complex {
    fn matches(&self, doc: &DomSnapshot, id: NodeId) -> bool {
        self.matches_from(doc, id, self.compounds.len() - 1)
    }

    fn matches_from(&self, doc: &DomSnapshot, id: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent_element(id)
                .map(|parent| self.matches_from(doc, parent, index - 1))
                .unwrap_or(false),
            Combinator::Descendant => doc
                .ancestors(id)
                .any(|ancestor| self.matches_from(doc, ancestor, index - 1)),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, doc: &DomSnapshot, id: NodeId) -> bool {
        let Some(node) = doc.node(id) else {
            return false;
        };
        let Some(tag) = node.tag() else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != "*" && !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(expected) = &self.id {
            if node.attribute("id") != Some(expected.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|test| {
            node.attribute(&test.name)
                .map(|value| test.op.test(value))
                .unwrap_or(false)
        })
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            position: self.pos,
        }
    }

    fn parse_list(mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(other) => {
                    self.pos -= 1;
                    return Err(self.unexpected(other));
                }
            }
        }
        Ok(Selector {
            source: self.source.trim().to_string(),
            alternatives,
        })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_space => combinators.push(Combinator::Descendant),
                Some(other) => return Err(self.unexpected(other)),
            }
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(match self.peek() {
                None => SelectorError::Empty,
                Some(other) => self.unexpected(other),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(SelectorError::ExpectedIdent {
                selector: self.source.to_string(),
                position: start,
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeTest, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();

        let op_kind = match self.bump() {
            Some(']') => {
                return Ok(AttributeTest {
                    name,
                    op: AttributeOp::Exists,
                })
            }
            Some('=') => '=',
            Some(c @ ('^' | '$' | '*' | '~')) => {
                if self.bump() != Some('=') {
                    return Err(SelectorError::UnterminatedAttribute(
                        self.source.to_string(),
                    ));
                }
                c
            }
            Some(other) => {
                self.pos -= 1;
                return Err(self.unexpected(other));
            }
            None => {
                return Err(SelectorError::UnterminatedAttribute(
                    self.source.to_string(),
                ))
            }
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(SelectorError::UnterminatedString(self.source.to_string()));
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(SelectorError::UnterminatedAttribute(
                self.source.to_string(),
            ));
        }

        let op = match op_kind {
            '=' => AttributeOp::Equals(value),
            '^' => AttributeOp::Prefix(value),
            '$' => AttributeOp::Suffix(value),
            '*' => AttributeOp::Contains(value),
            _ => AttributeOp::Includes(value),
        };
        Ok(AttributeTest { name, op })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
