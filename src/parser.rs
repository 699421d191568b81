//! Pattern language parser
//!
//! Predictive recursive descent with one token of lookahead; one function
//! per grammar production:
//!
//! ```text
//! Root        := SubNode(ROOT) ';'
//! Node(r)     := '(' SubNode(r) ')' | ModDescription(r)
//! SubNode(r)  := '(' SubNode(r) ')' [ChildrenDisj] | ModDescription(r) [ChildrenDisj]
//! ModDescription(r) := ['!'] ['@'] Description(r)
//! Description := (IDENTIFIER | REGEX | BLANK) {'#' NUMBER '=' IDENTIFIER} ['=' IDENTIFIER]
//!              | '~' IDENTIFIER ['=' IDENTIFIER]
//!              | '=' IDENTIFIER
//! ChildrenDisj := ChildrenConj {'|' ChildrenConj}
//! ChildrenConj := ModChild {['&'] ModChild}
//! ModChild     := Child | '!' Child | '?' Child
//! Child        := '[' ChildrenDisj ']' | Relation
//! Relation     := (RELATION [NUMBER] | REL_W_STR_ARG StrArg) Node(relation)
//! ```
//!
//! The semantic state (declared names and whether we are under a negation)
//! lives in a [`ParseContext`] that each production takes by value and hands
//! back with its result.

use std::collections::BTreeSet;

use crate::error::PatternError;
use crate::lexer::{Token, TokenKind, TokenStream};
use crate::pattern::{DescriptionNode, Descriptor, GroupCapture, PatternNode, RegexDescriptor};
use crate::relation::{Relation, RelationResolver};
use crate::scope::ScopeTracker;

/// Tokens that can start a description
const DESCRIPTION_START: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::Regex,
    TokenKind::Blank,
    TokenKind::Bang,
    TokenKind::At,
    TokenKind::Tilde,
    TokenKind::Equals,
];
/// Tokens that carry a description's label
const DESCRIPTOR: &[TokenKind] = &[TokenKind::Identifier, TokenKind::Regex, TokenKind::Blank];
/// Tokens that can start a (possibly modified) child
const CHILD_START: &[TokenKind] = &[
    TokenKind::Relation,
    TokenKind::RelWithStrArg,
    TokenKind::Bang,
    TokenKind::Question,
    TokenKind::LBracket,
];
/// Tokens that continue a conjunction of children
const CONJUNCT_START: &[TokenKind] = &[
    TokenKind::Relation,
    TokenKind::RelWithStrArg,
    TokenKind::Bang,
    TokenKind::Question,
    TokenKind::LBracket,
    TokenKind::Amp,
];
/// Tokens that can start an unmodified child
const PLAIN_CHILD_START: &[TokenKind] = &[
    TokenKind::Relation,
    TokenKind::RelWithStrArg,
    TokenKind::LBracket,
];

/// Deepest nesting of relations, parentheses and brackets a pattern may use
pub const MAX_NESTING_DEPTH: usize = 50;

/// Semantic state threaded through the productions. The scope is boxed so
/// that moving the context between frames stays cheap.
#[derive(Debug, Default)]
struct ParseContext {
    scope: Box<ScopeTracker>,
    under_negation: bool,
}

impl ParseContext {
    fn with_negation(self, under_negation: bool) -> Self {
        Self {
            under_negation,
            ..self
        }
    }

    /// Declare a node name, which is illegal under negation
    fn declare_capture(&mut self, name: &Token) -> Result<(), PatternError> {
        self.scope
            .declare(&name.text)
            .map_err(|e| e.at(name.position))?;
        if self.under_negation {
            return Err(PatternError::CaptureUnderNegation {
                name: name.text.clone(),
                position: name.position,
            });
        }
        Ok(())
    }

    fn reference(&self, name: &Token) -> Result<(), PatternError> {
        self.scope
            .reference(&name.text)
            .map_err(|e| e.at(name.position))
    }
}

/// Result of a production: the value built plus the updated context
type Parsed<T> = Result<(T, ParseContext), PatternError>;

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub root: PatternNode,
    pub declared_names: BTreeSet<String>,
}

/// One-shot parser: owns the token stream, borrows the resolver.
pub struct Parser<'r> {
    tokens: TokenStream,
    resolver: &'r RelationResolver,
    depth: usize,
}

impl<'r> Parser<'r> {
    pub fn new(input: &str, resolver: &'r RelationResolver) -> Result<Self, PatternError> {
        Ok(Self::from_tokens(TokenStream::new(input)?, resolver))
    }

    pub fn from_tokens(tokens: TokenStream, resolver: &'r RelationResolver) -> Self {
        Self {
            tokens,
            resolver,
            depth: 0,
        }
    }

    /// Parse a whole pattern (through its `;` terminator and end of input)
    pub fn parse(mut self) -> Result<ParseOutput, PatternError> {
        let (root, ctx) = self.root(ParseContext::default())?;
        self.tokens.consume(TokenKind::Eof)?;
        Ok(ParseOutput {
            root: PatternNode::Description(root),
            declared_names: ctx.scope.declared_names(),
        })
    }

    /// Step one level deeper, failing once the nesting limit is passed
    fn enter(&mut self, opener: &Token) -> Result<(), PatternError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(PatternError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                position: opener.position,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn root(&mut self, ctx: ParseContext) -> Parsed<DescriptionNode> {
        let root_relation = self.resolver.root();
        let (node, ctx) = self.sub_node(ctx, root_relation)?;
        self.tokens.consume(TokenKind::Semicolon)?;
        Ok((node, ctx))
    }

    fn node(&mut self, ctx: ParseContext, relation: Relation) -> Parsed<DescriptionNode> {
        if self.tokens.check(TokenKind::LParen) {
            let open = self.tokens.advance();
            self.enter(&open)?;
            let (node, ctx) = self.sub_node(ctx, relation)?;
            self.tokens.consume(TokenKind::RParen)?;
            self.leave();
            Ok((node, ctx))
        } else if self.tokens.check_any(DESCRIPTION_START) {
            self.mod_description(ctx, relation)
        } else {
            Err(self.tokens.unexpected())
        }
    }

    fn sub_node(&mut self, ctx: ParseContext, relation: Relation) -> Parsed<DescriptionNode> {
        let (node, ctx) = if self.tokens.check(TokenKind::LParen) {
            let open = self.tokens.advance();
            self.enter(&open)?;
            let (node, ctx) = self.sub_node(ctx, relation)?;
            self.tokens.consume(TokenKind::RParen)?;
            self.leave();
            (node, ctx)
        } else if self.tokens.check_any(DESCRIPTION_START) {
            self.mod_description(ctx, relation)?
        } else {
            return Err(self.tokens.unexpected());
        };

        if self.tokens.check_any(CHILD_START) {
            let (children, ctx) = self.children_disj(ctx)?;
            Ok((node.with_child(children), ctx))
        } else {
            Ok((node, ctx))
        }
    }

    fn mod_description(&mut self, ctx: ParseContext, relation: Relation) -> Parsed<DescriptionNode> {
        let negated = self.tokens.accept(TokenKind::Bang).is_some();
        let category = self.tokens.accept(TokenKind::At).is_some();
        let (node, ctx) = self.description(ctx, relation)?;
        Ok((
            DescriptionNode {
                descriptor_negated: negated,
                category_match: category,
                ..node
            },
            ctx,
        ))
    }

    fn description(&mut self, mut ctx: ParseContext, relation: Relation) -> Parsed<DescriptionNode> {
        if self.tokens.check_any(DESCRIPTOR) {
            let label = self.tokens.advance();
            let descriptor = descriptor_for(&label)?;

            let mut group_captures = Vec::new();
            while self.tokens.accept(TokenKind::Hash).is_some() {
                let group = self.tokens.consume(TokenKind::Number)?;
                self.tokens.consume(TokenKind::Equals)?;
                let variable = self.tokens.consume(TokenKind::Identifier)?;
                let group = group_index(&descriptor, &group)?;
                ctx.scope
                    .declare_group(&variable.text)
                    .map_err(|e| e.at(variable.position))?;
                group_captures.push(GroupCapture {
                    group,
                    variable: variable.text,
                });
            }

            let capture_name = match self.tokens.accept(TokenKind::Equals) {
                Some(_) => {
                    let name = self.tokens.consume(TokenKind::Identifier)?;
                    ctx.declare_capture(&name)?;
                    Some(name.text)
                }
                None => None,
            };

            let node = DescriptionNode {
                capture_name,
                group_captures,
                ..DescriptionNode::new(relation, descriptor)
            };
            Ok((node, ctx))
        } else if self.tokens.check(TokenKind::Tilde) {
            self.tokens.advance();
            let linked = self.tokens.consume(TokenKind::Identifier)?;
            let name = match self.tokens.accept(TokenKind::Equals) {
                Some(_) => Some(self.tokens.consume(TokenKind::Identifier)?),
                None => None,
            };
            ctx.reference(&linked)?;
            if let Some(name) = &name {
                ctx.declare_capture(name)?;
            }

            let node = DescriptionNode {
                linked_name: Some(linked.text),
                capture_name: name.map(|t| t.text),
                ..DescriptionNode::new(relation, Descriptor::None)
            };
            Ok((node, ctx))
        } else if self.tokens.check(TokenKind::Equals) {
            self.tokens.advance();
            let name = self.tokens.consume(TokenKind::Identifier)?;
            ctx.reference(&name)?;

            let node = DescriptionNode {
                backreference: Some(name.text),
                ..DescriptionNode::new(relation, Descriptor::None)
            };
            Ok((node, ctx))
        } else {
            Err(self.tokens.unexpected())
        }
    }

    /// Branches of a disjunction are parsed in isolation: each one starts
    /// from the names known before the first branch. Afterwards every name
    /// declared in any branch is known.
    fn children_disj(&mut self, ctx: ParseContext) -> Parsed<PatternNode> {
        let before = ctx.scope.snapshot();
        let mut branches = Vec::new();
        let mut branch_scopes = Vec::new();

        let (branch, mut ctx) = self.children_conj(ctx)?;
        branches.push(branch);
        branch_scopes.push(ctx.scope.snapshot());

        while self.tokens.accept(TokenKind::Pipe).is_some() {
            ctx.scope.restore(before.clone());
            let (branch, next) = self.children_conj(ctx)?;
            ctx = next;
            branches.push(branch);
            branch_scopes.push(ctx.scope.snapshot());
        }

        if branches.len() > 1 {
            log::trace!(
                "merging scopes of {} disjuncts ({} names known before)",
                branches.len(),
                before.len()
            );
        }
        ctx.scope.merge_union(branch_scopes);
        Ok((PatternNode::coordinate(branches, false), ctx))
    }

    fn children_conj(&mut self, ctx: ParseContext) -> Parsed<PatternNode> {
        let (child, mut ctx) = self.mod_child(ctx)?;
        let mut children = vec![child];
        while self.tokens.check_any(CONJUNCT_START) {
            self.tokens.accept(TokenKind::Amp);
            let (child, next) = self.mod_child(ctx)?;
            ctx = next;
            children.push(child);
        }
        Ok((PatternNode::coordinate(children, true), ctx))
    }

    fn mod_child(&mut self, ctx: ParseContext) -> Parsed<PatternNode> {
        if self.tokens.check_any(PLAIN_CHILD_START) {
            self.child(ctx)
        } else if self.tokens.check(TokenKind::Bang) {
            self.tokens.advance();
            let outer = ctx.under_negation;
            let (child, ctx) = self.child(ctx.with_negation(true))?;
            Ok((child.negate(), ctx.with_negation(outer)))
        } else if self.tokens.check(TokenKind::Question) {
            self.tokens.advance();
            let (child, ctx) = self.child(ctx)?;
            Ok((child.make_optional(), ctx))
        } else {
            Err(self.tokens.unexpected())
        }
    }

    fn child(&mut self, ctx: ParseContext) -> Parsed<PatternNode> {
        if self.tokens.check(TokenKind::LBracket) {
            let open = self.tokens.advance();
            self.enter(&open)?;
            let (children, ctx) = self.children_disj(ctx)?;
            self.tokens.consume(TokenKind::RBracket)?;
            self.leave();
            Ok((children, ctx))
        } else if self.tokens.check_any(&[TokenKind::Relation, TokenKind::RelWithStrArg]) {
            self.relation(ctx)
        } else {
            Err(self.tokens.unexpected())
        }
    }

    fn relation(&mut self, ctx: ParseContext) -> Parsed<PatternNode> {
        let (symbol, argument) = if self.tokens.check(TokenKind::Relation) {
            let op = self.tokens.advance();
            match self.tokens.accept(TokenKind::Number) {
                // `<-2` lexes as `<-` `2` and means the second child from the right
                Some(number) => {
                    let (base, index) = match op.text.strip_suffix('-') {
                        Some(base) => (base, format!("-{}", number.text)),
                        None => (op.text.as_str(), number.text),
                    };
                    (Token::new(op.kind, base, op.position), Some(index))
                }
                None => (op, None),
            }
        } else if self.tokens.check(TokenKind::RelWithStrArg) {
            let op = self.tokens.advance();
            let argument = self.string_argument()?;
            (op, Some(argument))
        } else {
            return Err(self.tokens.unexpected());
        };

        let relation = self
            .resolver
            .resolve(&symbol.text, argument.as_deref())
            .map_err(|source| PatternError::InvalidRelation {
                position: symbol.position,
                source,
            })?;
        self.enter(&symbol)?;
        let (node, ctx) = self.node(ctx, relation)?;
        self.leave();
        Ok((PatternNode::Description(node), ctx))
    }

    /// `( [!] [@] (REGEX | IDENTIFIER | BLANK) )` or `[!] REGEX`, folded into
    /// the `[!][@]text` string the resolver expects
    fn string_argument(&mut self) -> Result<String, PatternError> {
        let mut argument = String::new();
        if self.tokens.check(TokenKind::LParen) {
            self.tokens.advance();
            if self.tokens.accept(TokenKind::Bang).is_some() {
                argument.push('!');
            }
            if self.tokens.accept(TokenKind::At).is_some() {
                argument.push('@');
            }
            if !self.tokens.check_any(DESCRIPTOR) {
                return Err(self.tokens.unexpected());
            }
            argument.push_str(&self.tokens.advance().text);
            self.tokens.consume(TokenKind::RParen)?;
        } else if self.tokens.check_any(&[TokenKind::Regex, TokenKind::Bang]) {
            if self.tokens.accept(TokenKind::Bang).is_some() {
                argument.push('!');
            }
            argument.push_str(&self.tokens.consume(TokenKind::Regex)?.text);
        } else {
            return Err(self.tokens.unexpected());
        }
        Ok(argument)
    }
}

fn descriptor_for(label: &Token) -> Result<Descriptor, PatternError> {
    match label.kind {
        TokenKind::Regex => RegexDescriptor::from_literal(&label.text)
            .map(Descriptor::Regex)
            .map_err(|e| PatternError::InvalidRegex {
                pattern: label.text.trim_matches('/').to_string(),
                message: e.to_string(),
                position: label.position,
            }),
        TokenKind::Blank => Ok(Descriptor::Blank),
        _ => Ok(Descriptor::Identifier(label.text.clone())),
    }
}

/// Group numbers are 1-based and, on regex descriptors, must name an
/// existing group
fn group_index(descriptor: &Descriptor, number: &Token) -> Result<usize, PatternError> {
    let invalid = |message: String| PatternError::InvalidGroupCapture {
        index: number.text.clone(),
        message,
        position: number.position,
    };
    let index = atoi::atoi::<usize>(number.text.as_bytes())
        .ok_or_else(|| invalid("group number out of range".to_string()))?;
    if index == 0 {
        return Err(invalid("groups are numbered from 1".to_string()));
    }
    if let Descriptor::Regex(regex) = descriptor {
        if index > regex.group_count() {
            return Err(invalid(format!(
                "/{}/ has {} group(s)",
                regex.source(),
                regex.group_count()
            )));
        }
    }
    Ok(index)
}
