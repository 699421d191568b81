//! Pattern compilation errors
//!
//! Every failure aborts the whole compilation; there is no recovery and no
//! partial result.

use std::fmt;
use thiserror::Error;

use crate::lexer::{Position, Token, TokenKind};
use crate::relation::RelationError;

/// Error type for pattern compilation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("Pattern error: unexpected {found}; expected {expected}")]
    SyntaxError {
        found: Token,
        expected: ExpectedTokens,
    },

    #[error("Pattern error: variable {name} has been declared twice ({position})")]
    DuplicateCapture { name: String, position: Position },

    #[error("Pattern error: variable {name} was referenced before it was declared ({position})")]
    UndeclaredReference { name: String, position: Position },

    #[error("Pattern error: no named nodes allowed in the scope of negation: {name} ({position})")]
    CaptureUnderNegation { name: String, position: Position },

    #[error("Pattern error: {message} ({position})")]
    LexError { position: Position, message: String },

    #[error("Pattern error: invalid regex /{pattern}/: {message} ({position})")]
    InvalidRegex {
        pattern: String,
        message: String,
        position: Position,
    },

    #[error("Pattern error: invalid group capture #{index}: {message} ({position})")]
    InvalidGroupCapture {
        index: String,
        message: String,
        position: Position,
    },

    #[error("Pattern error: pattern is nested more than {limit} levels deep ({position})")]
    NestingTooDeep { limit: usize, position: Position },

    #[error("Pattern error: {source} ({position})")]
    InvalidRelation {
        position: Position,
        #[source]
        source: RelationError,
    },
}

impl PatternError {
    /// Where in the pattern text the error was detected
    pub fn position(&self) -> Position {
        match self {
            PatternError::SyntaxError { found, .. } => found.position,
            PatternError::DuplicateCapture { position, .. }
            | PatternError::UndeclaredReference { position, .. }
            | PatternError::CaptureUnderNegation { position, .. }
            | PatternError::LexError { position, .. }
            | PatternError::InvalidRegex { position, .. }
            | PatternError::InvalidGroupCapture { position, .. }
            | PatternError::NestingTooDeep { position, .. }
            | PatternError::InvalidRelation { position, .. } => *position,
        }
    }
}

/// The set of token kinds that would have been accepted where a syntax
/// error occurred. Sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpectedTokens(Vec<TokenKind>);

impl ExpectedTokens {
    pub fn new(kinds: impl IntoIterator<Item = TokenKind>) -> Self {
        let mut kinds: Vec<TokenKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self(kinds)
    }

    pub fn kinds(&self) -> &[TokenKind] {
        &self.0
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExpectedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("nothing"),
            [only] => write!(f, "{}", only),
            kinds => {
                f.write_str("one of ")?;
                for (i, kind) in kinds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", kind)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_tokens_sorted_and_deduplicated() {
        let expected = ExpectedTokens::new([
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::Semicolon,
        ]);
        assert_eq!(
            expected.kinds(),
            &[TokenKind::Identifier, TokenKind::Semicolon]
        );
        assert_eq!(expected.to_string(), "one of IDENTIFIER, \";\"");
    }

    #[test]
    fn test_syntax_error_message() {
        let err = PatternError::SyntaxError {
            found: Token::new(TokenKind::RParen, ")", Position::new(3, 1, 4)),
            expected: ExpectedTokens::new([TokenKind::Identifier]),
        };
        assert_eq!(
            err.to_string(),
            "Pattern error: unexpected \")\" at line 1, column 4; expected IDENTIFIER"
        );
        assert_eq!(err.position().offset, 3);
    }
}
