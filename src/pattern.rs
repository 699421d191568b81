//! Pattern representation
//!
//! This module defines the AST produced by the parser. Nodes are built
//! bottom-up; the modifiers (`negate`, `make_optional`, `with_child`) take a
//! finished node by value and return a new one, so nothing is mutated once
//! it has been handed to an enclosing production.

use regex::Regex;
use std::fmt::{self, Debug, Display};

use crate::relation::{Relation, RelationKind};

/// A regex descriptor: the text written between the slashes, plus the
/// compiled regex
#[derive(Clone)]
pub struct RegexDescriptor {
    source: String,
    regex: Regex,
}

impl RegexDescriptor {
    /// Compile the body of a `/.../` literal. `\/` stands for a slash.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&source.replace("\\/", "/"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Build from a complete literal, slashes included
    pub fn from_literal(literal: &str) -> Result<Self, regex::Error> {
        let body = literal
            .strip_prefix('/')
            .and_then(|s| s.strip_suffix('/'))
            .unwrap_or(literal);
        Self::new(body)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Number of capture groups, not counting the implicit group 0
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }
}

// Manual Debug implementation
impl Debug for RegexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexDescriptor").field(&self.source).finish()
    }
}

// Manual PartialEq implementation (compare pattern strings, not compiled regex)
impl PartialEq for RegexDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// What a description node says about the node label
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    /// A literal label, possibly with `|`-separated alternatives
    Identifier(String),
    Regex(RegexDescriptor),
    /// `__`, matches any node
    Blank,
    /// Links and back-references carry no descriptor of their own
    None,
}

impl Descriptor {
    /// Literal alternatives of an identifier descriptor
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            Descriptor::Identifier(s) => s.split('|').collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Descriptor::None)
    }
}

impl Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Identifier(s) => f.write_str(s),
            Descriptor::Regex(r) => write!(f, "/{}/", r.source()),
            Descriptor::Blank => f.write_str("__"),
            Descriptor::None => Ok(()),
        }
    }
}

/// `#N=var`: binds regex group N of the node's descriptor to `var`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCapture {
    pub group: usize,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionNode {
    /// How this node relates to the node it hangs from
    pub relation: Relation,
    /// The relation must not hold
    pub negated: bool,
    /// The relation may fail to hold without failing the match
    pub optional: bool,
    pub descriptor: Descriptor,
    /// The label must not match the descriptor
    pub descriptor_negated: bool,
    /// Compare the basic category of the label rather than the label itself
    pub category_match: bool,
    pub capture_name: Option<String>,
    /// `~name`: same label as the node captured as `name`
    pub linked_name: Option<String>,
    /// `=name` with no descriptor: the very node captured as `name`
    pub backreference: Option<String>,
    pub group_captures: Vec<GroupCapture>,
    pub child: Option<Box<PatternNode>>,
}

impl DescriptionNode {
    pub fn new(relation: Relation, descriptor: Descriptor) -> Self {
        Self {
            relation,
            negated: false,
            optional: false,
            descriptor,
            descriptor_negated: false,
            category_match: false,
            capture_name: None,
            linked_name: None,
            backreference: None,
            group_captures: Vec::new(),
            child: None,
        }
    }

    pub fn negate(self) -> Self {
        Self {
            negated: true,
            ..self
        }
    }

    pub fn make_optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    /// Attach a child constraint. A node that already has one gets a
    /// conjunction of the old and new children.
    pub fn with_child(self, child: PatternNode) -> Self {
        let child = match self.child {
            Some(existing) => PatternNode::coordinate(vec![*existing, child], true),
            None => child,
        };
        Self {
            child: Some(Box::new(child)),
            ..self
        }
    }

    pub fn is_root(&self) -> bool {
        self.relation.kind() == &RelationKind::Root
    }

    fn fmt_body(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descriptor_negated {
            f.write_str("!")?;
        }
        if self.category_match {
            f.write_str("@")?;
        }
        write!(f, "{}", self.descriptor)?;
        for group in &self.group_captures {
            write!(f, "#{}={}", group.group, group.variable)?;
        }
        if let Some(linked) = &self.linked_name {
            write!(f, "~{}", linked)?;
        }
        if let Some(reference) = &self.backreference {
            write!(f, "={}", reference)?;
        }
        if let Some(name) = &self.capture_name {
            write!(f, "={}", name)?;
        }
        if let Some(child) = &self.child {
            f.write_str(" ")?;
            child.fmt_child(f, false)?;
        }
        Ok(())
    }
}

/// Renders the node in pattern syntax. A root node renders as its body; any
/// other node renders with its relation in front.
impl Display for DescriptionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return self.fmt_body(f);
        }
        if self.negated {
            f.write_str("!")?;
        }
        if self.optional {
            f.write_str("?")?;
        }
        write!(f, "{} ", self.relation)?;
        if self.child.is_some() {
            f.write_str("(")?;
            self.fmt_body(f)?;
            f.write_str(")")
        } else {
            self.fmt_body(f)
        }
    }
}

/// A boolean combination of child constraints
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinationNode {
    pub children: Vec<PatternNode>,
    /// All children must hold (AND) rather than any one (OR)
    pub conjunctive: bool,
    pub negated: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternNode {
    Description(DescriptionNode),
    Coordination(CoordinationNode),
}

impl PatternNode {
    /// Combine sibling constraints. A single child is returned as is.
    pub fn coordinate(mut children: Vec<PatternNode>, conjunctive: bool) -> PatternNode {
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        PatternNode::Coordination(CoordinationNode {
            children,
            conjunctive,
            negated: false,
            optional: false,
        })
    }

    pub fn negate(self) -> Self {
        match self {
            PatternNode::Description(d) => PatternNode::Description(d.negate()),
            PatternNode::Coordination(c) => PatternNode::Coordination(CoordinationNode {
                negated: true,
                ..c
            }),
        }
    }

    pub fn make_optional(self) -> Self {
        match self {
            PatternNode::Description(d) => PatternNode::Description(d.make_optional()),
            PatternNode::Coordination(c) => PatternNode::Coordination(CoordinationNode {
                optional: true,
                ..c
            }),
        }
    }

    pub fn as_description(&self) -> Option<&DescriptionNode> {
        match self {
            PatternNode::Description(d) => Some(d),
            PatternNode::Coordination(_) => None,
        }
    }

    pub fn as_coordination(&self) -> Option<&CoordinationNode> {
        match self {
            PatternNode::Coordination(c) => Some(c),
            PatternNode::Description(_) => None,
        }
    }

    /// All description nodes, in the order they appear in the pattern text
    pub fn descriptions(&self) -> Vec<&DescriptionNode> {
        let mut out = Vec::new();
        self.collect_descriptions(&mut out);
        out
    }

    fn collect_descriptions<'a>(&'a self, out: &mut Vec<&'a DescriptionNode>) {
        match self {
            PatternNode::Description(d) => {
                out.push(d);
                if let Some(child) = &d.child {
                    child.collect_descriptions(out);
                }
            }
            PatternNode::Coordination(c) => {
                for child in &c.children {
                    child.collect_descriptions(out);
                }
            }
        }
    }

    // A plain conjunction directly inside another conjunction needs brackets,
    // otherwise it would re-parse as part of its parent.
    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, in_conjunction: bool) -> fmt::Result {
        match self {
            PatternNode::Description(d) => write!(f, "{}", d),
            PatternNode::Coordination(c) => {
                let bracketed = c.negated || c.optional || !c.conjunctive || in_conjunction;
                if c.negated {
                    f.write_str("!")?;
                }
                if c.optional {
                    f.write_str("?")?;
                }
                if bracketed {
                    f.write_str("[")?;
                }
                let separator = if c.conjunctive { " " } else { " | " };
                for (i, child) in c.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    child.fmt_child(f, c.conjunctive)?;
                }
                if bracketed {
                    f.write_str("]")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_child(f, false)
    }
}
