//! Traversal scope and element materialization options.
//!
//! These enums describe how much of the tree a fetch plan covers and how
//! returned elements are materialized. Both carry the provider defaults:
//! [`TreeScope::Element`] (the element itself, nothing else) and
//! [`ElementMode::Full`] (fully materialized elements).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Breadth of tree traversal a fetch plan applies to.
///
/// # Examples
///
/// ```
/// use fetchplan::TreeScope;
///
/// assert_eq!(TreeScope::default(), TreeScope::Element);
/// assert_eq!(TreeScope::parse("subtree").unwrap(), TreeScope::Subtree);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeScope {
    /// The element itself only.
    Element,
    /// The element's immediate children.
    Children,
    /// All descendants of the element.
    Descendants,
    /// The element and all of its descendants.
    Subtree,
    /// The element's ancestors up to the root.
    Ancestors,
}

impl Default for TreeScope {
    fn default() -> Self {
        Self::Element
    }
}

impl fmt::Display for TreeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element => write!(f, "element"),
            Self::Children => write!(f, "children"),
            Self::Descendants => write!(f, "descendants"),
            Self::Subtree => write!(f, "subtree"),
            Self::Ancestors => write!(f, "ancestors"),
        }
    }
}

impl TreeScope {
    /// Parses a tree scope from a string.
    ///
    /// Recognizes the lowercase variant names, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not recognized.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::TreeScope;
    ///
    /// assert_eq!(TreeScope::parse("SUBTREE").unwrap(), TreeScope::Subtree);
    /// assert!(TreeScope::parse("sideways").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "element" => Ok(Self::Element),
            "children" => Ok(Self::Children),
            "descendants" => Ok(Self::Descendants),
            "subtree" => Ok(Self::Subtree),
            "ancestors" => Ok(Self::Ancestors),
            _ => Err(format!("invalid tree scope: {s}")),
        }
    }
}

/// How elements returned under a fetch plan are materialized.
///
/// # Examples
///
/// ```
/// use fetchplan::ElementMode;
///
/// assert_eq!(ElementMode::default(), ElementMode::Full);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementMode {
    /// Elements carry the fetched data and a live provider reference.
    Full,
    /// Elements are lightweight references; only the declared data is fetched.
    Reference,
}

impl Default for ElementMode {
    fn default() -> Self {
        Self::Full
    }
}

impl fmt::Display for ElementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

impl ElementMode {
    /// Parses an element mode from a string, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not recognized.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "reference" => Ok(Self::Reference),
            _ => Err(format!("invalid element mode: {s}")),
        }
    }
}
