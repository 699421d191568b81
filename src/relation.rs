//! Structural relations between pattern nodes
//!
//! A relation token (plus an optional numeric or string argument) is
//! resolved into a [`Relation`] by a [`RelationResolver`], which also hands
//! the caller's head finder and basic-category function to the relations
//! that need them.

use atoi::FromRadix10SignedChecked;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;
use thiserror::Error;

use crate::pattern::{Descriptor, RegexDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationError {
    #[error("unknown relation {0}")]
    UnknownRelation(String),

    #[error("relation {0} requires an argument")]
    MissingArgument(String),

    #[error("relation {symbol} does not take the argument {argument}")]
    UnexpectedArgument { symbol: String, argument: String },

    #[error("relation {symbol} has an invalid child index {argument}")]
    InvalidIndex { symbol: String, argument: String },

    #[error("relation {symbol} has an invalid regex argument {argument}: {message}")]
    InvalidRegex {
        symbol: String,
        argument: String,
        message: String,
    },
}

/// Signature of a basic-category function
pub type BasicCategoryFn = dyn Fn(&str) -> String + Send + Sync;

/// A named label-normalization function.
///
/// Two `BasicCategory` values are equal when their names are.
#[derive(Clone)]
pub struct BasicCategory {
    name: Arc<str>,
    func: Arc<BasicCategoryFn>,
}

impl BasicCategory {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    /// Penn Treebank conventions: `NP-SBJ-1` → `NP`, `-NONE-` stays whole
    pub fn penn_treebank() -> Self {
        Self::new("penn-treebank", |label| {
            penn_basic_category(label).to_string()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, label: &str) -> String {
        (self.func)(label)
    }
}

impl Default for BasicCategory {
    fn default() -> Self {
        Self::penn_treebank()
    }
}

impl Debug for BasicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BasicCategory").field(&self.name).finish()
    }
}

impl PartialEq for BasicCategory {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

const ANNOTATION_CHARS: [char; 7] = ['-', '=', '|', '#', '^', '~', '_'];

fn penn_basic_category(label: &str) -> &str {
    let mut opened_with: Option<char> = None;
    for (i, ch) in label.char_indices() {
        if !ANNOTATION_CHARS.contains(&ch) {
            continue;
        }
        if i == 0 {
            opened_with = Some(ch);
        } else if opened_with == Some(ch) {
            opened_with = None;
        } else {
            return &label[..i];
        }
    }
    label
}

/// Picks the head among a phrase's children
pub trait HeadFinder: Send + Sync {
    fn name(&self) -> &str;

    /// Index into `children` of the head of a phrase labeled `parent`
    fn head_index(&self, parent: &str, children: &[&str]) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LeftmostHeadFinder;

impl HeadFinder for LeftmostHeadFinder {
    fn name(&self) -> &str {
        "leftmost"
    }

    fn head_index(&self, _parent: &str, children: &[&str]) -> Option<usize> {
        if children.is_empty() { None } else { Some(0) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RightmostHeadFinder;

impl HeadFinder for RightmostHeadFinder {
    fn name(&self) -> &str {
        "rightmost"
    }

    fn head_index(&self, _parent: &str, children: &[&str]) -> Option<usize> {
        children.len().checked_sub(1)
    }
}

/// Argument of the chain relations (`<+(C)` and friends): the nodes the
/// chain may pass through
#[derive(Debug, Clone, PartialEq)]
pub struct ChainArg {
    pub descriptor: Descriptor,
    pub negated: bool,
    pub category_match: bool,
}

impl ChainArg {
    /// Decode the combined `[!][@]descriptor` argument string
    fn parse(symbol: &str, argument: &str) -> Result<Self, RelationError> {
        let (negated, rest) = match argument.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, argument),
        };
        let (category_match, rest) = match rest.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let descriptor = if rest == "__" {
            Descriptor::Blank
        } else if rest.len() >= 2 && rest.starts_with('/') && rest.ends_with('/') {
            let regex = RegexDescriptor::from_literal(rest).map_err(|e| {
                RelationError::InvalidRegex {
                    symbol: symbol.to_string(),
                    argument: argument.to_string(),
                    message: e.to_string(),
                }
            })?;
            Descriptor::Regex(regex)
        } else if rest.is_empty() {
            return Err(RelationError::MissingArgument(symbol.to_string()));
        } else {
            Descriptor::Identifier(rest.to_string())
        };
        Ok(Self {
            descriptor,
            negated,
            category_match,
        })
    }
}

impl Display for ChainArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        if self.category_match {
            f.write_str("@")?;
        }
        write!(f, "{}", self.descriptor)
    }
}

/// Relation kinds, read as "A op B" where A is the node the relation hangs
/// from and B the node it introduces
#[derive(Debug, Clone, PartialEq)]
pub enum RelationKind {
    /// The pattern's top node
    Root,
    Equals,
    ParentEquals,
    Dominates,
    DominatedBy,
    ImmediatelyDominates,
    ImmediatelyDominatedBy,
    /// B is the i-th child of A; negative counts from the right
    HasIthChild(i32),
    IthChildOf(i32),
    HasOnlyChild,
    OnlyChildOf,
    HasLeftmostChild,
    LeftmostChildOf,
    HasRightmostChild,
    RightmostChildOf,
    HasLeftmostDescendant,
    LeftmostDescendantOf,
    HasRightmostDescendant,
    RightmostDescendantOf,
    UnaryPathDominates,
    UnaryPathDominatedBy,
    SisterOf,
    LeftSisterOf,
    RightSisterOf,
    ImmediateLeftSisterOf,
    ImmediateRightSisterOf,
    Precedes,
    ImmediatelyPrecedes,
    Follows,
    ImmediatelyFollows,
    HasImmediateHead,
    ImmediateHeadOf,
    HasHead,
    HeadOf,
    UnbrokenCategoryDominates(ChainArg),
    UnbrokenCategoryDominatedBy(ChainArg),
    UnbrokenCategoryPrecedes(ChainArg),
    UnbrokenCategoryFollows(ChainArg),
}

impl RelationKind {
    /// Relations written as a bare symbol
    fn simple(symbol: &str) -> Option<RelationKind> {
        let kind = match symbol {
            "==" => RelationKind::Equals,
            "<=" => RelationKind::ParentEquals,
            "<<" => RelationKind::Dominates,
            ">>" => RelationKind::DominatedBy,
            "<" => RelationKind::ImmediatelyDominates,
            ">" => RelationKind::ImmediatelyDominatedBy,
            "<:" => RelationKind::HasOnlyChild,
            ">:" => RelationKind::OnlyChildOf,
            "<," => RelationKind::HasLeftmostChild,
            ">," => RelationKind::LeftmostChildOf,
            "<-" => RelationKind::HasRightmostChild,
            ">-" => RelationKind::RightmostChildOf,
            "<<," => RelationKind::HasLeftmostDescendant,
            ">>," => RelationKind::LeftmostDescendantOf,
            "<<-" => RelationKind::HasRightmostDescendant,
            ">>-" => RelationKind::RightmostDescendantOf,
            "<<:" => RelationKind::UnaryPathDominates,
            ">>:" => RelationKind::UnaryPathDominatedBy,
            "$" => RelationKind::SisterOf,
            "$++" | "$.." => RelationKind::LeftSisterOf,
            "$--" | "$,," => RelationKind::RightSisterOf,
            "$+" | "$." => RelationKind::ImmediateLeftSisterOf,
            "$-" | "$," => RelationKind::ImmediateRightSisterOf,
            ".." => RelationKind::Precedes,
            "." => RelationKind::ImmediatelyPrecedes,
            ",," => RelationKind::Follows,
            "," => RelationKind::ImmediatelyFollows,
            "<#" => RelationKind::HasImmediateHead,
            ">#" => RelationKind::ImmediateHeadOf,
            "<<#" => RelationKind::HasHead,
            ">>#" => RelationKind::HeadOf,
            _ => return None,
        };
        Some(kind)
    }

    fn takes_string_argument(symbol: &str) -> bool {
        matches!(symbol, "<+" | ">+" | ".+" | ",+")
    }

    /// Canonical symbol, without any argument
    pub fn symbol(&self) -> &'static str {
        match self {
            RelationKind::Root => "",
            RelationKind::Equals => "==",
            RelationKind::ParentEquals => "<=",
            RelationKind::Dominates => "<<",
            RelationKind::DominatedBy => ">>",
            RelationKind::ImmediatelyDominates | RelationKind::HasIthChild(_) => "<",
            RelationKind::ImmediatelyDominatedBy | RelationKind::IthChildOf(_) => ">",
            RelationKind::HasOnlyChild => "<:",
            RelationKind::OnlyChildOf => ">:",
            RelationKind::HasLeftmostChild => "<,",
            RelationKind::LeftmostChildOf => ">,",
            RelationKind::HasRightmostChild => "<-",
            RelationKind::RightmostChildOf => ">-",
            RelationKind::HasLeftmostDescendant => "<<,",
            RelationKind::LeftmostDescendantOf => ">>,",
            RelationKind::HasRightmostDescendant => "<<-",
            RelationKind::RightmostDescendantOf => ">>-",
            RelationKind::UnaryPathDominates => "<<:",
            RelationKind::UnaryPathDominatedBy => ">>:",
            RelationKind::SisterOf => "$",
            RelationKind::LeftSisterOf => "$++",
            RelationKind::RightSisterOf => "$--",
            RelationKind::ImmediateLeftSisterOf => "$+",
            RelationKind::ImmediateRightSisterOf => "$-",
            RelationKind::Precedes => "..",
            RelationKind::ImmediatelyPrecedes => ".",
            RelationKind::Follows => ",,",
            RelationKind::ImmediatelyFollows => ",",
            RelationKind::HasImmediateHead => "<#",
            RelationKind::ImmediateHeadOf => ">#",
            RelationKind::HasHead => "<<#",
            RelationKind::HeadOf => ">>#",
            RelationKind::UnbrokenCategoryDominates(_) => "<+",
            RelationKind::UnbrokenCategoryDominatedBy(_) => ">+",
            RelationKind::UnbrokenCategoryPrecedes(_) => ".+",
            RelationKind::UnbrokenCategoryFollows(_) => ",+",
        }
    }

    pub fn is_head_relation(&self) -> bool {
        matches!(
            self,
            RelationKind::HasImmediateHead
                | RelationKind::ImmediateHeadOf
                | RelationKind::HasHead
                | RelationKind::HeadOf
        )
    }

    pub fn chain_arg(&self) -> Option<&ChainArg> {
        match self {
            RelationKind::UnbrokenCategoryDominates(arg)
            | RelationKind::UnbrokenCategoryDominatedBy(arg)
            | RelationKind::UnbrokenCategoryPrecedes(arg)
            | RelationKind::UnbrokenCategoryFollows(arg) => Some(arg),
            _ => None,
        }
    }
}

/// A resolved relation, with the strategies it needs at match time
#[derive(Clone)]
pub struct Relation {
    kind: RelationKind,
    head_finder: Option<Arc<dyn HeadFinder>>,
    basic_category: Option<BasicCategory>,
}

impl Relation {
    fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            head_finder: None,
            basic_category: None,
        }
    }

    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }

    /// Set only for head relations
    pub fn head_finder(&self) -> Option<&Arc<dyn HeadFinder>> {
        self.head_finder.as_ref()
    }

    /// Set only for chain relations whose argument matches basic categories
    pub fn basic_category(&self) -> Option<&BasicCategory> {
        self.basic_category.as_ref()
    }
}

impl Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Relation");
        s.field("kind", &self.kind);
        if let Some(head_finder) = &self.head_finder {
            s.field("head_finder", &head_finder.name());
        }
        if let Some(basic_category) = &self.basic_category {
            s.field("basic_category", basic_category);
        }
        s.finish()
    }
}

// Strategies compare by name
impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        let head_finders_match = match (&self.head_finder, &other.head_finder) {
            (Some(a), Some(b)) => a.name() == b.name(),
            (None, None) => true,
            _ => false,
        };
        self.kind == other.kind && head_finders_match && self.basic_category == other.basic_category
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.symbol())?;
        match &self.kind {
            RelationKind::HasIthChild(i) | RelationKind::IthChildOf(i) => write!(f, "{}", i),
            kind => match kind.chain_arg() {
                Some(arg) => write!(f, "({})", arg),
                None => Ok(()),
            },
        }
    }
}

/// Turns relation tokens into [`Relation`]s. Read-only once built, and
/// cheap to clone and share.
#[derive(Clone)]
pub struct RelationResolver {
    basic_category: BasicCategory,
    head_finder: Arc<dyn HeadFinder>,
}

impl Default for RelationResolver {
    fn default() -> Self {
        Self::new(BasicCategory::default(), Arc::new(LeftmostHeadFinder))
    }
}

impl Debug for RelationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationResolver")
            .field("basic_category", &self.basic_category)
            .field("head_finder", &self.head_finder.name())
            .finish()
    }
}

impl RelationResolver {
    pub fn new(basic_category: BasicCategory, head_finder: Arc<dyn HeadFinder>) -> Self {
        Self {
            basic_category,
            head_finder,
        }
    }

    pub fn basic_category(&self) -> &BasicCategory {
        &self.basic_category
    }

    pub fn head_finder(&self) -> &Arc<dyn HeadFinder> {
        &self.head_finder
    }

    /// The relation of the pattern's top node
    pub fn root(&self) -> Relation {
        Relation::new(RelationKind::Root)
    }

    /// Resolve a relation symbol and its optional argument.
    ///
    /// Numeric arguments (`"2"`, `"-1"`) are accepted by `<` and `>`. String
    /// arguments use the `[!][@]descriptor` encoding and are accepted by the
    /// chain relations `<+ >+ .+ ,+`.
    pub fn resolve(&self, symbol: &str, argument: Option<&str>) -> Result<Relation, RelationError> {
        let Some(argument) = argument else {
            if RelationKind::takes_string_argument(symbol) {
                return Err(RelationError::MissingArgument(symbol.to_string()));
            }
            let kind = RelationKind::simple(symbol)
                .ok_or_else(|| RelationError::UnknownRelation(symbol.to_string()))?;
            let mut relation = Relation::new(kind);
            if relation.kind.is_head_relation() {
                relation.head_finder = Some(Arc::clone(&self.head_finder));
            }
            return Ok(relation);
        };

        if RelationKind::takes_string_argument(symbol) {
            let arg = ChainArg::parse(symbol, argument)?;
            let basic_category = arg.category_match.then(|| self.basic_category.clone());
            let kind = match symbol {
                "<+" => RelationKind::UnbrokenCategoryDominates(arg),
                ">+" => RelationKind::UnbrokenCategoryDominatedBy(arg),
                ".+" => RelationKind::UnbrokenCategoryPrecedes(arg),
                _ => RelationKind::UnbrokenCategoryFollows(arg),
            };
            return Ok(Relation {
                kind,
                head_finder: None,
                basic_category,
            });
        }

        match symbol {
            "<" | ">" => {
                let index = parse_index(argument).ok_or_else(|| RelationError::InvalidIndex {
                    symbol: symbol.to_string(),
                    argument: argument.to_string(),
                })?;
                let kind = if symbol == "<" {
                    RelationKind::HasIthChild(index)
                } else {
                    RelationKind::IthChildOf(index)
                };
                Ok(Relation::new(kind))
            }
            _ if RelationKind::simple(symbol).is_some() => Err(RelationError::UnexpectedArgument {
                symbol: symbol.to_string(),
                argument: argument.to_string(),
            }),
            _ => Err(RelationError::UnknownRelation(symbol.to_string())),
        }
    }
}

/// A nonzero child index; the whole argument must be consumed
fn parse_index(argument: &str) -> Option<i32> {
    let bytes = argument.as_bytes();
    let (value, used) = i32::from_radix_10_signed_checked(bytes);
    match value {
        Some(0) | None => None,
        Some(index) if used == bytes.len() => Some(index),
        Some(_) => None,
    }
}
