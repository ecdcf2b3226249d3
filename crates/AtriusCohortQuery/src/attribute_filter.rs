//! User supplied constraints on a sub-attribute of a criterion's resource.

use atrius_fhirpath_builder::Comparator;
use rust_decimal::Decimal;

use crate::error::{TranslationError, TranslationResult};
use crate::mapping::AttributeMapping;
use crate::modifier::Modifier;
use crate::term::Term;

/// An attribute filter, keyed by the code of the attribute it constrains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeFilter {
    Numeric {
        attribute_code: Term,
        comparator: Comparator,
        value: Decimal,
        unit: Option<String>,
    },
    Range {
        attribute_code: Term,
        lower: Decimal,
        upper: Decimal,
        unit: Option<String>,
    },
    ValueSet {
        attribute_code: Term,
        selected: Vec<Term>,
    },
}

impl AttributeFilter {
    pub fn attribute_code(&self) -> &Term {
        match self {
            AttributeFilter::Numeric { attribute_code, .. }
            | AttributeFilter::Range { attribute_code, .. }
            | AttributeFilter::ValueSet { attribute_code, .. } => attribute_code,
        }
    }

    /// Resolves this filter into a modifier on the path named by `mapping`.
    ///
    /// Value set filters become code modifiers for `Code` attributes and coding
    /// modifiers for `Coding` attributes.
    pub fn to_modifier(&self, mapping: &AttributeMapping) -> TranslationResult<Modifier> {
        let path = mapping.path.clone();
        match self {
            AttributeFilter::Numeric {
                comparator,
                value,
                unit,
                ..
            } => Ok(Modifier::Numeric {
                path,
                comparator: *comparator,
                value: *value,
                unit: unit.clone(),
            }),
            AttributeFilter::Range {
                lower, upper, unit, ..
            } => Ok(Modifier::Range {
                path,
                lower: *lower,
                upper: *upper,
                unit: unit.clone(),
            }),
            AttributeFilter::ValueSet { selected, .. } => match mapping.kind.as_str() {
                "Code" => Ok(Modifier::Code {
                    path,
                    codes: selected.iter().map(|term| term.code.clone()).collect(),
                }),
                "Coding" => Ok(Modifier::Coding {
                    path,
                    terms: selected.clone(),
                }),
                other => Err(TranslationError::UnknownAttributeMappingType(
                    other.to_string(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn attribute(kind: &str) -> AttributeMapping {
        AttributeMapping {
            kind: kind.to_string(),
            key: Term::new("mii.abide", "lokalisation", ""),
            path: "bodySite".to_string(),
        }
    }

    fn value_set() -> AttributeFilter {
        AttributeFilter::ValueSet {
            attribute_code: Term::new("mii.abide", "lokalisation", ""),
            selected: vec![Term::new("http://snomed.info/sct", "7771000", "Left")],
        }
    }

    #[test]
    fn test_value_set_on_code_attribute() {
        let modifier = value_set().to_modifier(&attribute("Code")).unwrap();
        assert_eq!(
            modifier,
            Modifier::Code {
                path: "bodySite".to_string(),
                codes: vec!["7771000".to_string()]
            }
        );
    }

    #[test]
    fn test_value_set_on_coding_attribute() {
        let modifier = value_set().to_modifier(&attribute("Coding")).unwrap();
        assert!(matches!(modifier, Modifier::Coding { ref terms, .. } if terms.len() == 1));
    }

    #[test]
    fn test_value_set_on_unknown_attribute_type() {
        let err = value_set().to_modifier(&attribute("Reference")).unwrap_err();
        assert!(matches!(err, TranslationError::UnknownAttributeMappingType(ref t) if t == "Reference"));
    }

    #[test]
    fn test_numeric_keeps_comparator_and_unit() {
        let filter = AttributeFilter::Numeric {
            attribute_code: Term::new("x", "y", ""),
            comparator: Comparator::GreaterEqual,
            value: dec!(3),
            unit: Some("cm".to_string()),
        };
        let modifier = filter.to_modifier(&attribute("Code")).unwrap();
        assert_eq!(
            modifier.expression().unwrap().to_string(),
            "bodySite >= 3 'cm'"
        );
    }

    #[test]
    fn test_range() {
        let filter = AttributeFilter::Range {
            attribute_code: Term::new("x", "y", ""),
            lower: dec!(1),
            upper: dec!(2),
            unit: None,
        };
        assert_eq!(filter.attribute_code().code, "y");
        let modifier = filter.to_modifier(&attribute("Code")).unwrap();
        assert!(matches!(modifier, Modifier::Range { .. }));
    }
}
