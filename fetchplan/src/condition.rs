//! Tree-filter conditions.
//!
//! A fetch plan's tree filter is a predicate over tree nodes, expressed as a
//! small condition algebra. Providers evaluate the condition against each node
//! while walking; this module supplies the value model, combinators, and a
//! reference evaluator usable by in-process providers and tests.
//!
//! The default filter is [`Condition::True`], which matches every node ("no
//! filter").
//!
//! # Examples
//!
//! ```
//! use fetchplan::{Condition, PropertyId, PropertyValue};
//!
//! let enabled = PropertyId::try_from(30010).unwrap();
//! let cond = Condition::property(enabled, PropertyValue::Bool(true)).not();
//!
//! // Matches a node whose "enabled" property is false
//! let lookup = |id| {
//!     if id == enabled {
//!         Some(PropertyValue::Bool(false))
//!     } else {
//!         None
//!     }
//! };
//! assert!(cond.matches(&lookup));
//! ```

use serde::{Deserialize, Serialize};

use crate::ident::PropertyId;

/// A typed property value a condition can compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A text value.
    Text(String),
}

/// A predicate over tree nodes.
///
/// Conditions form a small algebra: property comparisons combined with
/// `and`/`or`/`not`. An empty `And` matches everything; an empty `Or` matches
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Matches every node. This is the "no filter" value.
    True,
    /// Matches no node.
    False,
    /// Matches a node whose property equals the given value.
    Property {
        /// The property to inspect.
        property: PropertyId,
        /// The value the property must equal.
        value: PropertyValue,
    },
    /// Matches when all inner conditions match.
    And(Vec<Condition>),
    /// Matches when any inner condition matches.
    Or(Vec<Condition>),
    /// Matches when the inner condition does not.
    Not(Box<Condition>),
}

impl Default for Condition {
    fn default() -> Self {
        Self::True
    }
}

impl Condition {
    /// Builds a property-equality condition.
    #[must_use]
    pub const fn property(property: PropertyId, value: PropertyValue) -> Self {
        Self::Property { property, value }
    }

    /// Combines this condition with another; both must match.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::Condition;
    ///
    /// let cond = Condition::True.and(Condition::False);
    /// assert!(!cond.matches(&|_| None));
    /// ```
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut inner) => {
                inner.push(other);
                Self::And(inner)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Combines this condition with another; either may match.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut inner) => {
                inner.push(other);
                Self::Or(inner)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negates this condition.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Returns `true` when this is the "no filter" condition.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Evaluates the condition against a node described by `lookup`.
    ///
    /// `lookup` maps a property identifier to the node's value for it, or
    /// `None` when the node does not carry the property. A property condition
    /// never matches an absent property.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::{Condition, PropertyId, PropertyValue};
    ///
    /// let name = PropertyId::try_from(30005).unwrap();
    /// let cond = Condition::property(name, PropertyValue::Text("ok".into()));
    ///
    /// assert!(cond.matches(&|id| {
    ///     (id == name).then(|| PropertyValue::Text("ok".into()))
    /// }));
    /// assert!(!cond.matches(&|_| None));
    /// ```
    pub fn matches<F>(&self, lookup: &F) -> bool
    where
        F: Fn(PropertyId) -> Option<PropertyValue>,
    {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Property { property, value } => {
                lookup(*property).as_ref() == Some(value)
            }
            Self::And(inner) => inner.iter().all(|c| c.matches(lookup)),
            Self::Or(inner) => inner.iter().any(|c| c.matches(lookup)),
            Self::Not(inner) => !inner.matches(lookup),
        }
    }
}
