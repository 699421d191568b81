//! Treepattern: compiler front end for Tregex-style tree patterns
//!
//! Turns pattern text such as `S < (NP=subj $++ VP)` into a validated
//! pattern tree: description nodes joined by structural relations and
//! boolean coordination, with capture names checked for duplicates, forward
//! references and capture inside negation.

pub mod compiler; // Configuration and the compile entry points
pub mod error; // Pattern compilation errors
pub mod lexer; // Tokenizer and lookahead token stream
pub mod parser; // Recursive-descent parser
pub mod pattern; // Pattern AST
pub mod relation; // Relation kinds, resolver and strategies
pub mod scope; // Capture-name tracking

#[cfg(test)]
mod fuzz_tests;

// Re-exports for convenience
pub use compiler::{CompiledPattern, PatternCompiler, compile_pattern};
pub use error::{ExpectedTokens, PatternError};
pub use lexer::{Position, Token, TokenKind, tokenize};
pub use parser::{MAX_NESTING_DEPTH, ParseOutput, Parser};
pub use pattern::{
    CoordinationNode, DescriptionNode, Descriptor, GroupCapture, PatternNode, RegexDescriptor,
};
pub use relation::{
    BasicCategory, ChainArg, HeadFinder, LeftmostHeadFinder, Relation, RelationError,
    RelationKind, RelationResolver, RightmostHeadFinder,
};
pub use scope::{ScopeError, ScopeTracker};
