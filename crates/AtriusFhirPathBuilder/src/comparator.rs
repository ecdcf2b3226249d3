//! Comparison operators and their binding strength.

use serde::Deserialize;
use std::fmt;

/// Precedence of `=` and `!=`.
pub const EQUALITY_PRECEDENCE: u8 = 6;
/// Precedence of `<`, `<=`, `>` and `>=`.
pub const INEQUALITY_PRECEDENCE: u8 = 7;

/// A binary comparison operator.
///
/// Deserializes from the short codes used in query documents
/// (`eq`, `ne`/`ue`, `lt`, `le`, `gt`, `ge`).
///
/// # Examples
///
/// ```rust
/// use atrius_fhirpath_builder::Comparator;
///
/// let comparator: Comparator = serde_json::from_str("\"ge\"").unwrap();
/// assert_eq!(comparator, Comparator::GreaterEqual);
/// assert_eq!(comparator.to_string(), ">=");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Comparator {
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "ne", alias = "ue")]
    NotEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "le")]
    LessEqual,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "ge")]
    GreaterEqual,
}

impl Comparator {
    /// Returns the binding strength of this operator when printed infix.
    pub fn precedence(self) -> u8 {
        match self {
            Comparator::Equal | Comparator::NotEqual => EQUALITY_PRECEDENCE,
            _ => INEQUALITY_PRECEDENCE,
        }
    }

    /// Returns the FHIRPath operator token.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::NotEqual => "!=",
            Comparator::LessThan => "<",
            Comparator::LessEqual => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
