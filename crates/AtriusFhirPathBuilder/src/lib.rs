//! # FHIRPath Expression Builder
//!
//! This crate provides an algebraic model of FHIRPath filter expressions together
//! with a precedence-aware printer. It is construction-only: expressions are built
//! from typed nodes and rendered to text, never parsed back.
//!
//! ## Overview
//!
//! - **Literals**: booleans, strings, date/times and quantities ([`Literal`])
//! - **Paths**: identifiers, member access, function calls, `where(...)` and
//!   `reverseResolve(...)` ([`Term`], [`Invocation`])
//! - **Operators**: comparisons, membership, `between`, `and`, `or` ([`Expression`])
//! - **Printing**: minimal parenthesization driven by operator precedence
//!   ([`PrintContext`])
//!
//! ## Smoothing Constructors
//!
//! [`Expression::and`] and [`Expression::or`] simplify while they build:
//!
//! - `true and X` is `X`
//! - `true or X` is `true`, `false or X` is `X`
//! - a conjunction on the left is extended in place, so chains of `and` stay flat
//! - disjunctions are never flattened
//!
//! ## Examples
//!
//! ```rust
//! use atrius_fhirpath_builder::{Comparator, Expression};
//! use rust_decimal_macros::dec;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let weight = Expression::comparison(
//!     Expression::member("valueQuantity"),
//!     Comparator::GreaterThan,
//!     Expression::quantity(dec!(50), Some("kg")),
//! );
//! let status = Expression::comparison(
//!     Expression::identifier("status")?,
//!     Comparator::Equal,
//!     Expression::string("final"),
//! );
//!
//! let filter = Expression::and(weight, status);
//! assert_eq!(filter.to_string(), "valueQuantity > 50 'kg' and\nstatus = 'final'");
//! # Ok(())
//! # }
//! ```

pub mod comparator;
pub mod error;
pub mod expression;
pub mod print;

pub use comparator::Comparator;
pub use error::{ExpressionError, ExpressionResult};
pub use expression::{Expression, Invocation, Literal, MembershipOperator, Term};
pub use print::PrintContext;
