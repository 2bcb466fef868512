//! Property and pattern identifier types.
//!
//! This module provides validated newtypes for the opaque identifiers a fetch
//! plan collects. Identifiers are provider-assigned integers; the value 0 is
//! reserved and never names a real property or pattern.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque identifier for a fetchable property.
///
/// Identifier 0 is reserved by providers and is rejected at construction.
///
/// # Examples
///
/// ```
/// use fetchplan::PropertyId;
///
/// // Valid identifier
/// let id = PropertyId::try_from(30005).unwrap();
/// assert_eq!(id.value(), 30005);
///
/// // Invalid identifier (0)
/// assert!(PropertyId::try_from(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(u32);

impl PropertyId {
    /// The minimum valid identifier value.
    pub const MIN: u32 = 1;

    /// Returns the underlying identifier value.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::PropertyId;
    ///
    /// let id = PropertyId::try_from(30005).unwrap();
    /// assert_eq!(id.value(), 30005);
    /// ```
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PropertyId {
    type Error = InvalidIdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(InvalidIdError {
                kind: "property",
                value,
                reason: "identifier 0 is reserved".into(),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque identifier for a fetchable interaction pattern.
///
/// Identifier 0 is reserved by providers and is rejected at construction.
///
/// # Examples
///
/// ```
/// use fetchplan::PatternId;
///
/// let id = PatternId::try_from(10002).unwrap();
/// assert_eq!(id.value(), 10002);
/// assert!(PatternId::try_from(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(u32);

impl PatternId {
    /// The minimum valid identifier value.
    pub const MIN: u32 = 1;

    /// Returns the underlying identifier value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PatternId {
    type Error = InvalidIdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(InvalidIdError {
                kind: "pattern",
                value,
                reason: "identifier 0 is reserved".into(),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for invalid identifier values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdError {
    /// Which kind of identifier was invalid ("property" or "pattern").
    pub kind: &'static str,
    /// The invalid value.
    pub value: u32,
    /// The reason the value is invalid.
    pub reason: String,
}

impl fmt::Display for InvalidIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} identifier {}: {}",
            self.kind, self.value, self.reason
        )
    }
}

impl std::error::Error for InvalidIdError {}
