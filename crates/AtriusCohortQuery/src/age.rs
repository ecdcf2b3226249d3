//! Age criteria are rewritten into comparisons on the birth date.
//!
//! Age is derived, not stored, so `age > 5 a` becomes
//! `birthDate <= <today minus 5 years>`. Both the operator and the operand flip
//! because the birth date moves backwards as the age grows.

use atrius_fhirpath_builder::{Comparator, Expression};
use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{TranslationError, TranslationResult};
use crate::term::Term;

pub const AGE_SYSTEM: &str = "http://snomed.info/sct";
pub const AGE_CODE: &str = "424144002";

/// The "current chronological age" concept.
pub fn age_term() -> Term {
    Term::new(AGE_SYSTEM, AGE_CODE, "Current chronological age")
}

pub fn is_age(term: &Term) -> bool {
    term.system == AGE_SYSTEM && term.code == AGE_CODE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgeUnit {
    Years,
    Months,
    Weeks,
}

impl AgeUnit {
    fn parse(unit: Option<&str>) -> TranslationResult<AgeUnit> {
        match unit {
            Some("a") => Ok(AgeUnit::Years),
            Some("mo") => Ok(AgeUnit::Months),
            Some("wk") => Ok(AgeUnit::Weeks),
            other => Err(TranslationError::UnknownAgeUnit(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

fn whole_units(age: Decimal) -> TranslationResult<u32> {
    age.trunc().to_u32().ok_or_else(|| {
        TranslationError::InvalidQueryShape(format!("age `{}` is out of range", age))
    })
}

fn birth_date(today: NaiveDate, age: Decimal, unit: AgeUnit) -> TranslationResult<Expression> {
    let n = whole_units(age)?;
    let date = match unit {
        AgeUnit::Years => n.checked_mul(12).and_then(|m| today.checked_sub_months(Months::new(m))),
        AgeUnit::Months => today.checked_sub_months(Months::new(n)),
        AgeUnit::Weeks => today.checked_sub_days(Days::new(u64::from(n) * 7)),
    }
    .ok_or_else(|| TranslationError::InvalidQueryShape(format!("age `{}` is out of range", age)))?;
    Ok(Expression::date_time(&date.format("%Y-%m-%d").to_string())?)
}

/// Translates `age <comparator> <value> <unit>` into a birth date comparison
/// on `path`.
pub fn translate_age(
    path: &str,
    comparator: Comparator,
    age: Decimal,
    unit: Option<&str>,
    today: NaiveDate,
) -> TranslationResult<Expression> {
    let unit = AgeUnit::parse(unit)?;
    let flipped = match comparator {
        Comparator::Equal => Comparator::Equal,
        Comparator::NotEqual => Comparator::NotEqual,
        Comparator::GreaterThan => Comparator::LessEqual,
        Comparator::GreaterEqual => Comparator::LessThan,
        Comparator::LessThan => Comparator::GreaterEqual,
        Comparator::LessEqual => Comparator::GreaterThan,
    };
    Ok(Expression::comparison(
        Expression::member(path),
        flipped,
        birth_date(today, age, unit)?,
    ))
}

/// Translates an age range into
/// `path >= today - upper and path <= today - lower`.
pub fn translate_age_range(
    path: &str,
    lower: Decimal,
    upper: Decimal,
    unit: Option<&str>,
    today: NaiveDate,
) -> TranslationResult<Expression> {
    let unit = AgeUnit::parse(unit)?;
    Ok(Expression::and(
        Expression::comparison(
            Expression::member(path),
            Comparator::GreaterEqual,
            birth_date(today, upper, unit)?,
        ),
        Expression::comparison(
            Expression::member(path),
            Comparator::LessEqual,
            birth_date(today, lower, unit)?,
        ),
    ))
}
