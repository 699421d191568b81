//! Pattern tokenizer
//!
//! Splits pattern text into tokens using the pest grammar in `pattern.pest`,
//! and exposes them to the parser through a one-token-lookahead pull
//! interface ([`TokenStream`]).

use pest::Parser;
use pest_derive::Parser;
use std::fmt;

use crate::error::{ExpectedTokens, PatternError};

#[derive(Parser)]
#[grammar = "pattern.pest"]
struct PatternLexer;

/// Location of a token in the pattern text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset into the pattern text
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    Blank,
    Regex,
    Relation,
    RelWithStrArg,
    Semicolon,
    LParen,
    RParen,
    Bang,
    At,
    Hash,
    Equals,
    Tilde,
    Pipe,
    Amp,
    Question,
    LBracket,
    RBracket,
    Eof,
}

impl TokenKind {
    fn from_rule(rule: Rule) -> Option<TokenKind> {
        let kind = match rule {
            Rule::identifier => TokenKind::Identifier,
            Rule::number => TokenKind::Number,
            Rule::blank => TokenKind::Blank,
            Rule::regex => TokenKind::Regex,
            Rule::relation => TokenKind::Relation,
            Rule::rel_w_str_arg => TokenKind::RelWithStrArg,
            Rule::semicolon => TokenKind::Semicolon,
            Rule::lparen => TokenKind::LParen,
            Rule::rparen => TokenKind::RParen,
            Rule::bang => TokenKind::Bang,
            Rule::at => TokenKind::At,
            Rule::hash => TokenKind::Hash,
            Rule::equals => TokenKind::Equals,
            Rule::tilde => TokenKind::Tilde,
            Rule::pipe => TokenKind::Pipe,
            Rule::amp => TokenKind::Amp,
            Rule::question => TokenKind::Question,
            Rule::lbracket => TokenKind::LBracket,
            Rule::rbracket => TokenKind::RBracket,
            Rule::EOI => TokenKind::Eof,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::Blank => "BLANK",
            TokenKind::Regex => "REGEX",
            TokenKind::Relation => "RELATION",
            TokenKind::RelWithStrArg => "REL_W_STR_ARG",
            TokenKind::Semicolon => "\";\"",
            TokenKind::LParen => "\"(\"",
            TokenKind::RParen => "\")\"",
            TokenKind::Bang => "\"!\"",
            TokenKind::At => "\"@\"",
            TokenKind::Hash => "\"#\"",
            TokenKind::Equals => "\"=\"",
            TokenKind::Tilde => "\"~\"",
            TokenKind::Pipe => "\"|\"",
            TokenKind::Amp => "\"&\"",
            TokenKind::Question => "\"?\"",
            TokenKind::LBracket => "\"[\"",
            TokenKind::RBracket => "\"]\"",
            TokenKind::Eof => "<EOF>",
        };
        f.write_str(name)
    }
}

/// A lexed token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, position: Position) -> Self {
        Self {
            kind,
            text: text.to_string(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input at {}", self.position),
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::Blank
            | TokenKind::Regex
            | TokenKind::Relation
            | TokenKind::RelWithStrArg => {
                write!(f, "{} \"{}\" at {}", self.kind, self.text, self.position)
            }
            _ => write!(f, "\"{}\" at {}", self.text, self.position),
        }
    }
}

/// Split pattern text into tokens. The last token is always `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, PatternError> {
    let mut pairs = PatternLexer::parse(Rule::tokens, input).map_err(lex_error)?;
    let Some(tokens_pair) = pairs.next() else {
        return Ok(vec![eof_token(input)]);
    };

    let mut tokens = Vec::new();
    for pair in tokens_pair.into_inner() {
        let Some(kind) = TokenKind::from_rule(pair.as_rule()) else {
            continue;
        };
        let span = pair.as_span();
        let (line, column) = span.start_pos().line_col();
        let position = Position::new(span.start(), line, column);
        tokens.push(Token::new(kind, span.as_str(), position));
    }

    if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
        tokens.push(eof_token(input));
    }
    Ok(tokens)
}

fn eof_token(input: &str) -> Token {
    let line = input.matches('\n').count() + 1;
    let last_line = input.rsplit('\n').next().unwrap_or_default();
    let column = last_line.chars().count() + 1;
    Token::new(TokenKind::Eof, "", Position::new(input.len(), line, column))
}

fn lex_error(err: pest::error::Error<Rule>) -> PatternError {
    let offset = match err.location {
        pest::error::InputLocation::Pos(pos) => pos,
        pest::error::InputLocation::Span((start, _)) => start,
    };
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos(lc) => lc,
        pest::error::LineColLocation::Span(lc, _) => lc,
    };
    PatternError::LexError {
        position: Position::new(offset, line, column),
        message: format!("unrecognized input near \"{}\"", err.line().trim()),
    }
}

/// Token pull interface with one token of lookahead.
///
/// Every `check`/`check_any` call records the kinds the caller was prepared
/// to accept at the current position, so a failure can report everything
/// that would have been valid there. The record is cleared whenever a token
/// is consumed.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
    expected: Vec<TokenKind>,
}

impl TokenStream {
    pub fn new(input: &str) -> Result<Self, PatternError> {
        Ok(Self::from_tokens(tokenize(input)?))
    }

    /// Build a stream from already-lexed tokens. An `Eof` token is appended
    /// if the list does not end with one.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", position));
        }
        Self {
            tokens,
            pos: 0,
            expected: Vec::new(),
        }
    }

    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    #[inline]
    pub fn peek_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Is the next token of `kind`? Records `kind` as expected.
    pub fn check(&mut self, kind: TokenKind) -> bool {
        self.expected.push(kind);
        self.peek_kind() == kind
    }

    /// Is the next token one of `kinds`? Records all of them as expected.
    pub fn check_any(&mut self, kinds: &[TokenKind]) -> bool {
        self.expected.extend_from_slice(kinds);
        kinds.contains(&self.peek_kind())
    }

    /// Consume the next token if it is of `kind`.
    pub fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume the next token, failing unless it is of `kind`.
    pub fn consume(&mut self, kind: TokenKind) -> Result<Token, PatternError> {
        self.accept(kind).ok_or_else(|| self.unexpected())
    }

    /// Consume the next token regardless of its kind.
    pub fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        self.expected.clear();
        token
    }

    /// Syntax error at the current token, listing every kind recorded as
    /// expected since the last consumed token.
    pub fn unexpected(&self) -> PatternError {
        PatternError::SyntaxError {
            found: self.current().clone(),
            expected: ExpectedTokens::new(self.expected.iter().copied()),
        }
    }
}
