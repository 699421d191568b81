//! Pattern compilation
//!
//! [`PatternCompiler`] holds the configuration (basic-category function and
//! head finder) and turns pattern text into a [`CompiledPattern`]. A
//! compiler is read-only once built; every `compile` call runs a fresh
//! parser, so one compiler can be shared between threads.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::PatternError;
use crate::parser::Parser;
use crate::pattern::PatternNode;
use crate::relation::{BasicCategory, HeadFinder, RelationResolver};

/// Compiler configuration
#[derive(Debug, Clone, Default)]
pub struct PatternCompiler {
    resolver: RelationResolver,
}

impl PatternCompiler {
    /// Penn Treebank basic categories and the leftmost-child head finder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_basic_category(self, basic_category: BasicCategory) -> Self {
        let head_finder = Arc::clone(self.resolver.head_finder());
        Self {
            resolver: RelationResolver::new(basic_category, head_finder),
        }
    }

    pub fn with_head_finder(self, head_finder: Arc<dyn HeadFinder>) -> Self {
        let basic_category = self.resolver.basic_category().clone();
        Self {
            resolver: RelationResolver::new(basic_category, head_finder),
        }
    }

    pub fn resolver(&self) -> &RelationResolver {
        &self.resolver
    }

    /// Compile a pattern. The trailing `;` may be left off; nothing but
    /// whitespace may follow it.
    pub fn compile(&self, text: &str) -> Result<CompiledPattern, PatternError> {
        log::debug!("compiling pattern {:?}", text);

        let terminated = if text.trim_end().ends_with(';') {
            text.to_string()
        } else {
            format!("{};", text)
        };

        let output = Parser::new(&terminated, &self.resolver)
            .and_then(|parser| parser.parse())
            .inspect_err(|e| log::debug!("rejected pattern {:?}: {}", text, e))?;

        log::debug!(
            "compiled pattern {:?}: {} description node(s), {} name(s)",
            text,
            output.root.descriptions().len(),
            output.declared_names.len()
        );

        Ok(CompiledPattern {
            root: output.root,
            declared_names: output.declared_names,
            source: text.to_string(),
            resolver: self.resolver.clone(),
        })
    }
}

/// Compile with the default configuration
pub fn compile_pattern(text: &str) -> Result<CompiledPattern, PatternError> {
    PatternCompiler::new().compile(text)
}

/// A successfully compiled pattern, ready to hand to a matcher
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    root: PatternNode,
    declared_names: BTreeSet<String>,
    source: String,
    resolver: RelationResolver,
}

impl CompiledPattern {
    pub fn root(&self) -> &PatternNode {
        &self.root
    }

    /// Every node and group-capture name the pattern declares
    pub fn declared_names(&self) -> &BTreeSet<String> {
        &self.declared_names
    }

    /// The text the pattern was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn basic_category(&self) -> &BasicCategory {
        self.resolver.basic_category()
    }

    pub fn head_finder(&self) -> &Arc<dyn HeadFinder> {
        self.resolver.head_finder()
    }
}

/// Canonical pattern text, which compiles back to the same tree
impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Descriptor;
    use crate::relation::{RelationKind, RightmostHeadFinder};

    #[test]
    fn test_compile_adds_terminator() {
        let with = compile_pattern("NP < NN;").unwrap();
        let without = compile_pattern("NP < NN").unwrap();
        assert_eq!(with.root(), without.root());
        assert_eq!(without.source(), "NP < NN");
        assert!(compile_pattern("NP < NN;  \n").is_ok());
    }

    #[test]
    fn test_compile_rejects_trailing_input() {
        assert!(matches!(
            compile_pattern("NP; VP"),
            Err(PatternError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_compile_empty_pattern() {
        match compile_pattern("") {
            Err(PatternError::SyntaxError { found, expected }) => {
                assert_eq!(found.text, ";");
                assert!(expected.contains(crate::lexer::TokenKind::Identifier));
            }
            other => panic!("Expected SyntaxError, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_names() {
        let pattern = compile_pattern("S < NP=subj < (VP < /^(VB)/#1=verb)").unwrap();
        assert_eq!(
            pattern.declared_names().iter().collect::<Vec<_>>(),
            vec!["subj", "verb"]
        );
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "NP < NN",
            "S < (NP=subj $++ (VP < ~subj)) [< PP | !< SBAR]",
            "!@NP <2 __ <-1 DT >>: /^S/",
            "VP <+(!@VP) NN=x ?.. JJ , =x",
            "(NP=x < DT) < NN",
            "S [< NP < VP] | < SBAR",
        ] {
            let first = match compile_pattern(text) {
                Ok(pattern) => pattern,
                Err(e) => panic!("failed to compile {:?}: {}", text, e),
            };
            let second = compile_pattern(&first.to_string()).unwrap();
            assert_eq!(first.root(), second.root(), "round trip of {:?}", text);
        }
    }

    #[test]
    fn test_custom_strategies() {
        let compiler = PatternCompiler::new()
            .with_head_finder(Arc::new(RightmostHeadFinder))
            .with_basic_category(BasicCategory::new("lowercase", |label: &str| {
                label.to_lowercase()
            }));
        let pattern = compiler.compile("VP <# VB <+(@vp) NN").unwrap();
        assert_eq!(pattern.head_finder().name(), "rightmost");
        assert_eq!(pattern.basic_category().name(), "lowercase");

        let descriptions = pattern.root().descriptions();
        let head = &descriptions[1].relation;
        assert_eq!(head.kind(), &RelationKind::HasImmediateHead);
        assert_eq!(head.head_finder().map(|h| h.name()), Some("rightmost"));

        let chain = &descriptions[2].relation;
        assert_eq!(chain.basic_category().map(|b| b.name()), Some("lowercase"));
        assert_eq!(
            chain.kind().chain_arg().map(|a| &a.descriptor),
            Some(&Descriptor::Identifier("vp".to_string()))
        );
    }

    #[test]
    fn test_compiler_is_reusable() {
        let compiler = PatternCompiler::new();
        let first = compiler.compile("S < NP=x").unwrap();
        // Names from one compilation do not leak into the next
        let second = compiler.compile("S < VP=x").unwrap();
        assert_eq!(first.declared_names(), second.declared_names());
        assert!(matches!(
            compiler.compile("S < =x"),
            Err(PatternError::UndeclaredReference { .. })
        ));
    }

    #[test]
    fn test_compiler_shared_between_threads() {
        let compiler = Arc::new(PatternCompiler::new());
        let handles: Vec<_> = ["NP < NN", "VP < VB", "S < NP < VP"]
            .into_iter()
            .map(|text| {
                let compiler = Arc::clone(&compiler);
                std::thread::spawn(move || compiler.compile(text).map(|p| p.to_string()))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
    }
}
