//! # Expression Model
//!
//! Typed nodes for the subset of FHIRPath emitted by the cohort translator. The
//! shape follows the FHIRPath grammar: a [`Term`] is a literal, an identifier or a
//! free-standing [`Invocation`]; an [`Expression`] adds member/function invocation
//! on a target and the binary operators.
//!
//! All nodes are plain owned values. Trees are built bottom-up and never mutated
//! afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use tracing::warn;

use crate::comparator::Comparator;
use crate::error::{ExpressionError, ExpressionResult};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_'.]*$").expect("valid identifier regex"));

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}(-[0-9]{2}(-[0-9]{2})?)?$").expect("valid date regex"));

static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]+)?)?(Z|[+-][0-9]{2}:[0-9]{2})?$",
    )
    .expect("valid date/time regex")
});

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `true` or `false`
    Boolean(bool),
    /// A string literal, printed in single quotes
    String(String),
    /// A validated date or date/time, stored without the leading `@`
    DateTime(String),
    /// A number with an optional UCUM unit, such as `50 'kg'`
    Quantity(Decimal, Option<String>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Literal::DateTime(dt) => write!(f, "@{}", dt),
            Literal::Quantity(value, None) => write!(f, "{}", value),
            Literal::Quantity(value, Some(unit)) => write!(f, "{} '{}'", value, unit),
        }
    }
}

/// The right-hand side of a `.` or a free-standing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Member access (e.g. `subject`)
    Member(String),
    /// Function call with arguments (e.g. `exists(code = 'x')`, `not()`)
    Function(String, Vec<Expression>),
    /// `where(<criteria>)`
    Where(Box<Expression>),
    /// `reverseResolve(<Type>.<reference>)`
    ReverseResolve(Box<Expression>),
}

/// A primary expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Literal(Literal),
    Identifier(String),
    Invocation(Invocation),
}

/// Membership operators (`in`, `contains`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOperator {
    In,
    Contains,
}

impl fmt::Display for MembershipOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipOperator::In => f.write_str("in"),
            MembershipOperator::Contains => f.write_str("contains"),
        }
    }
}

/// A FHIRPath expression tree.
///
/// Build trees with the associated constructors rather than the variants
/// directly: [`Expression::and`] and [`Expression::or`] apply the smoothing rules
/// the printer relies on, and [`Expression::identifier`] and
/// [`Expression::date_time`] validate their input.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A basic term (literal, identifier, free-standing invocation)
    Term(Term),

    /// An invocation on a target (e.g. `Observation.subject`, `x.not()`)
    Invocation(Box<Expression>, Invocation),

    /// A comparison (e.g. `value >= 20 'g/dl'`)
    Comparison(Box<Expression>, Comparator, Box<Expression>),

    /// A membership test (e.g. `code in codes`)
    Membership(Box<Expression>, MembershipOperator, Box<Expression>),

    /// `<expr> between <lower> and <upper>`
    Between(Box<Expression>, Box<Expression>, Box<Expression>),

    /// An n-ary conjunction
    And(Vec<Expression>),

    /// An n-ary disjunction
    Or(Vec<Expression>),
}

impl Expression {
    pub const TRUE: Expression = Expression::Term(Term::Literal(Literal::Boolean(true)));
    pub const FALSE: Expression = Expression::Term(Term::Literal(Literal::Boolean(false)));

    /// Returns `true` if this is the literal `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Expression::Term(Term::Literal(Literal::Boolean(true))))
    }

    /// Returns `true` if this is the literal `false`.
    pub fn is_false(&self) -> bool {
        matches!(self, Expression::Term(Term::Literal(Literal::Boolean(false))))
    }

    pub fn boolean(value: bool) -> Expression {
        if value { Expression::TRUE } else { Expression::FALSE }
    }

    /// Builds a validated identifier.
    ///
    /// Identifiers must match `^[A-Za-z_][A-Za-z0-9_'.]*$`. Quotes and dots are
    /// accepted so that mapping paths like `code.coding` can pass through as one
    /// token, but they are not valid FHIRPath identifiers, so a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::MalformedLiteral`] if the name does not match.
    pub fn identifier(name: impl Into<String>) -> ExpressionResult<Expression> {
        let name = name.into();
        if !IDENTIFIER.is_match(&name) {
            return Err(ExpressionError::malformed("identifier", name));
        }
        if name.contains('\'') || name.contains('.') {
            warn!(identifier = %name, "identifier contains characters outside the FHIRPath identifier grammar");
        }
        Ok(Expression::Term(Term::Identifier(name)))
    }

    /// Builds an unvalidated member access term, used for mapping-supplied paths.
    pub fn member(path: impl Into<String>) -> Expression {
        Expression::Term(Term::Invocation(Invocation::Member(path.into())))
    }

    pub fn string(value: impl Into<String>) -> Expression {
        Expression::Term(Term::Literal(Literal::String(value.into())))
    }

    /// Builds a date or date/time literal.
    ///
    /// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD` and full timestamps with optional
    /// fractional seconds and `Z`/`+HH:MM` offsets. A single trailing `T` is
    /// dropped before validation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atrius_fhirpath_builder::Expression;
    ///
    /// let date = Expression::date_time("2021-01-01T").unwrap();
    /// assert_eq!(date.to_string(), "@2021-01-01");
    /// assert!(Expression::date_time("01.01.2021").is_err());
    /// ```
    pub fn date_time(value: &str) -> ExpressionResult<Expression> {
        let trimmed = value.strip_suffix('T').unwrap_or(value);
        if DATE.is_match(trimmed) || DATE_TIME.is_match(trimmed) {
            Ok(Expression::Term(Term::Literal(Literal::DateTime(
                trimmed.to_string(),
            ))))
        } else {
            Err(ExpressionError::malformed("date/time", value))
        }
    }

    pub fn quantity(value: Decimal, unit: Option<&str>) -> Expression {
        Expression::Term(Term::Literal(Literal::Quantity(
            value,
            unit.map(str::to_string),
        )))
    }

    /// Builds a free-standing function call such as `count()`.
    pub fn function_call(name: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::Term(Term::Invocation(Invocation::Function(name.into(), args)))
    }

    /// Builds `reverseResolve(<reference>)`.
    pub fn reverse_resolve(reference: Expression) -> Expression {
        Expression::Term(Term::Invocation(Invocation::ReverseResolve(Box::new(
            reference,
        ))))
    }

    pub fn comparison(a: Expression, comparator: Comparator, b: Expression) -> Expression {
        Expression::Comparison(Box::new(a), comparator, Box::new(b))
    }

    pub fn membership(a: Expression, op: MembershipOperator, b: Expression) -> Expression {
        Expression::Membership(Box::new(a), op, Box::new(b))
    }

    /// Builds a bounded range test as `expr >= lower and expr <= upper`.
    ///
    /// This is the form emitted for range criteria; see [`Expression::between_node`]
    /// for the dedicated `between` operator.
    pub fn between(expr: Expression, lower: Expression, upper: Expression) -> Expression {
        Expression::and(
            Expression::comparison(expr.clone(), Comparator::GreaterEqual, lower),
            Expression::comparison(expr, Comparator::LessEqual, upper),
        )
    }

    /// Builds the `between` operator node, printed as `expr between lower and upper`.
    pub fn between_node(expr: Expression, lower: Expression, upper: Expression) -> Expression {
        Expression::Between(Box::new(expr), Box::new(lower), Box::new(upper))
    }

    /// Conjunction with smoothing.
    ///
    /// A `true` operand is dropped. A conjunction on the left is extended with the
    /// right operand; the right operand is never flattened.
    pub fn and(e1: Expression, e2: Expression) -> Expression {
        if e1.is_true() {
            return e2;
        }
        if e2.is_true() {
            return e1;
        }
        match e1 {
            Expression::And(mut operands) => {
                operands.push(e2);
                Expression::And(operands)
            }
            e1 => Expression::And(vec![e1, e2]),
        }
    }

    /// Disjunction with smoothing.
    ///
    /// A `true` operand absorbs the disjunction and a `false` operand is dropped.
    /// Nested disjunctions are kept as they are.
    pub fn or(e1: Expression, e2: Expression) -> Expression {
        if e1.is_true() || e2.is_true() {
            return Expression::TRUE;
        }
        if e1.is_false() {
            return e2;
        }
        if e2.is_false() {
            return e1;
        }
        Expression::Or(vec![e1, e2])
    }

    /// Invokes `invocation` on this expression.
    pub fn invoke(self, invocation: Invocation) -> Expression {
        Expression::Invocation(Box::new(self), invocation)
    }

    /// `<self>.<member>`
    pub fn dot(self, member: impl Into<String>) -> Expression {
        self.invoke(Invocation::Member(member.into()))
    }

    /// `<self>.where(<criteria>)`
    pub fn filter(self, criteria: Expression) -> Expression {
        self.invoke(Invocation::Where(Box::new(criteria)))
    }

    /// `<self>.exists(<criteria>)`
    pub fn exists(self, criteria: Expression) -> Expression {
        self.invoke(Invocation::Function("exists".to_string(), vec![criteria]))
    }

    /// `<self>.not()`
    pub fn not(self) -> Expression {
        self.invoke(Invocation::Function("not".to_string(), Vec::new()))
    }
}
