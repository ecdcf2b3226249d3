//! # Modifiers
//!
//! Reusable boolean filter fragments attached to a mapping (fixed criteria) or
//! resolved from a user supplied attribute filter. Each modifier targets one path
//! of the resource it filters.

use atrius_fhirpath_builder::{Comparator, Expression};
use rust_decimal::Decimal;

use crate::error::{TranslationError, TranslationResult};
use crate::term::Term;

/// A filter fragment over one resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    /// `<path> = '<code>'`, or a disjunction for several codes
    Code { path: String, codes: Vec<String> },

    /// `<path>.coding.where(system = '<s>').exists(code = '<c>')` per term, joined with `or`
    Coding { path: String, terms: Vec<Term> },

    /// `<path> <comparator> <value> '<unit>'`
    Numeric {
        path: String,
        comparator: Comparator,
        value: Decimal,
        unit: Option<String>,
    },

    /// `<path> >= <lower> and <path> <= <upper>`
    Range {
        path: String,
        lower: Decimal,
        upper: Decimal,
        unit: Option<String>,
    },

    /// A date window over `<path>.dateTime` and `<path>.period`
    TimeRestriction {
        path: String,
        after: Option<String>,
        before: Option<String>,
    },
}

impl Modifier {
    /// Builds the boolean expression for this modifier.
    ///
    /// # Errors
    ///
    /// - [`TranslationError::InvalidQueryShape`] for code and coding modifiers
    ///   without values
    /// - [`TranslationError::MalformedLiteral`] for invalid paths or dates
    pub fn expression(&self) -> TranslationResult<Expression> {
        match self {
            Modifier::Code { path, codes } => code_expression(path, codes),
            Modifier::Coding { path, terms } => coding_expression(path, terms),
            Modifier::Numeric {
                path,
                comparator,
                value,
                unit,
            } => Ok(Expression::comparison(
                Expression::member(path.as_str()),
                *comparator,
                Expression::quantity(*value, unit.as_deref()),
            )),
            Modifier::Range {
                path,
                lower,
                upper,
                unit,
            } => Ok(Expression::between(
                Expression::member(path.as_str()),
                Expression::quantity(*lower, unit.as_deref()),
                Expression::quantity(*upper, unit.as_deref()),
            )),
            Modifier::TimeRestriction {
                path,
                after,
                before,
            } => time_restriction_expression(path, after.as_deref(), before.as_deref()),
        }
    }
}

/// `<target>.where(system = '<system>').exists(code = '<code>')`
pub(crate) fn system_and_code(target: Expression, term: &Term) -> TranslationResult<Expression> {
    let system = Expression::comparison(
        Expression::identifier("system")?,
        Comparator::Equal,
        Expression::string(term.system.as_str()),
    );
    let code = Expression::comparison(
        Expression::identifier("code")?,
        Comparator::Equal,
        Expression::string(term.code.as_str()),
    );
    Ok(target.filter(system).exists(code))
}

/// Equality against a single code, or a disjunction of equalities.
pub(crate) fn code_expression(path: &str, codes: &[String]) -> TranslationResult<Expression> {
    if codes.is_empty() {
        return Err(TranslationError::InvalidQueryShape(format!(
            "no codes given for path `{}`",
            path
        )));
    }
    codes.iter().try_fold(Expression::FALSE, |acc, code| {
        let equality = Expression::comparison(
            Expression::identifier(path)?,
            Comparator::Equal,
            Expression::string(code.as_str()),
        );
        Ok(Expression::or(acc, equality))
    })
}

/// Disjunction of system/code tests over `<path>.coding`.
pub(crate) fn coding_expression(path: &str, terms: &[Term]) -> TranslationResult<Expression> {
    if terms.is_empty() {
        return Err(TranslationError::InvalidQueryShape(format!(
            "no codings given for path `{}`",
            path
        )));
    }
    terms.iter().try_fold(Expression::FALSE, |acc, term| {
        let coding = Expression::identifier(path)?.dot("coding");
        Ok(Expression::or(acc, system_and_code(coding, term)?))
    })
}

fn time_restriction_expression(
    path: &str,
    after: Option<&str>,
    before: Option<&str>,
) -> TranslationResult<Expression> {
    let date_time = || -> TranslationResult<Expression> {
        Ok(Expression::identifier(path)?.dot("dateTime"))
    };
    let period = |bound: &str| -> TranslationResult<Expression> {
        Ok(Expression::identifier(path)?.dot("period").dot(bound))
    };
    let compare = |target: Expression, comparator: Comparator, date: &str| -> TranslationResult<Expression> {
        Ok(Expression::comparison(target, comparator, Expression::date_time(date)?))
    };
    let within = |target: Expression, after: &str, before: &str| -> TranslationResult<Expression> {
        Ok(Expression::and(
            compare(target.clone(), Comparator::GreaterThan, after)?,
            compare(target, Comparator::LessThan, before)?,
        ))
    };

    match (after, before) {
        (None, None) => Ok(Expression::TRUE),
        (None, Some(before)) => Ok(Expression::or(
            compare(date_time()?, Comparator::LessThan, before)?,
            compare(period("start")?, Comparator::LessThan, before)?,
        )),
        (Some(after), None) => Ok(Expression::or(
            compare(date_time()?, Comparator::GreaterThan, after)?,
            compare(period("end")?, Comparator::GreaterThan, after)?,
        )),
        (Some(after), Some(before)) => Ok(Expression::or(
            within(date_time()?, after, before)?,
            Expression::or(
                within(period("start")?, after, before)?,
                within(period("end")?, after, before)?,
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn time(after: Option<&str>, before: Option<&str>) -> Modifier {
        Modifier::TimeRestriction {
            path: "effective".to_string(),
            after: after.map(str::to_string),
            before: before.map(str::to_string),
        }
    }

    #[test]
    fn test_single_code() {
        let modifier = Modifier::Code {
            path: "status".to_string(),
            codes: vec!["final".to_string()],
        };
        assert_eq!(modifier.expression().unwrap().to_string(), "status = 'final'");
    }

    #[test]
    fn test_multiple_codes() {
        let modifier = Modifier::Code {
            path: "status".to_string(),
            codes: vec!["final".to_string(), "amended".to_string()],
        };
        assert_eq!(
            modifier.expression().unwrap().to_string(),
            "status = 'final' or\nstatus = 'amended'"
        );
    }

    #[test]
    fn test_code_without_values_is_rejected() {
        let modifier = Modifier::Code {
            path: "status".to_string(),
            codes: Vec::new(),
        };
        assert!(matches!(
            modifier.expression(),
            Err(TranslationError::InvalidQueryShape(_))
        ));
    }

    #[test]
    fn test_coding() {
        let modifier = Modifier::Coding {
            path: "verificationStatus".to_string(),
            terms: vec![Term::new(
                "http://terminology.hl7.org/CodeSystem/condition-ver-status",
                "confirmed",
                "",
            )],
        };
        assert_eq!(
            modifier.expression().unwrap().to_string(),
            "verificationStatus.coding.where(system = 'http://terminology.hl7.org/CodeSystem/condition-ver-status').exists(code = 'confirmed')"
        );
    }

    #[test]
    fn test_coding_without_values_is_rejected() {
        let modifier = Modifier::Coding {
            path: "verificationStatus".to_string(),
            terms: Vec::new(),
        };
        assert!(modifier.expression().is_err());
    }

    #[test]
    fn test_numeric() {
        let modifier = Modifier::Numeric {
            path: "dose.value".to_string(),
            comparator: Comparator::LessThan,
            value: dec!(2.5),
            unit: Some("mg".to_string()),
        };
        assert_eq!(modifier.expression().unwrap().to_string(), "dose.value < 2.5 'mg'");
    }

    #[test]
    fn test_range() {
        let modifier = Modifier::Range {
            path: "value".to_string(),
            lower: dec!(1),
            upper: dec!(3),
            unit: None,
        };
        assert_eq!(
            modifier.expression().unwrap().to_string(),
            "value >= 1 and\nvalue <= 3"
        );
    }

    #[test]
    fn test_time_restriction_without_dates_is_true() {
        assert!(time(None, None).expression().unwrap().is_true());
    }

    #[test]
    fn test_time_restriction_before() {
        assert_eq!(
            time(None, Some("2022-01-01")).expression().unwrap().to_string(),
            "effective.dateTime < @2022-01-01 or\neffective.period.start < @2022-01-01"
        );
    }

    #[test]
    fn test_time_restriction_after() {
        assert_eq!(
            time(Some("2021-01-01"), None).expression().unwrap().to_string(),
            "effective.dateTime > @2021-01-01 or\neffective.period.end > @2021-01-01"
        );
    }

    #[test]
    fn test_time_restriction_both() {
        assert_eq!(
            time(Some("2021-01-01"), Some("2022-01-01"))
                .expression()
                .unwrap()
                .to_string(),
            "effective.dateTime > @2021-01-01 and\n\
             effective.dateTime < @2022-01-01 or\n\
             effective.period.start > @2021-01-01 and\n\
             effective.period.start < @2022-01-01 or\n\
             effective.period.end > @2021-01-01 and\n\
             effective.period.end < @2022-01-01"
        );
    }

    #[test]
    fn test_time_restriction_rejects_malformed_date() {
        let err = time(Some("01.01.2021"), None).expression().unwrap_err();
        assert!(matches!(err, TranslationError::MalformedLiteral(_)));
    }
}
