//! # Criteria
//!
//! A [`Criterion`] selects patients that have at least one resource matching a
//! concept, optionally constrained by a value, attribute filters and a time
//! window.
//!
//! All non-trivial kinds share one translation backbone:
//!
//! 1. Resolve the concept into mapped terms ([`MappingContext::resolve`]).
//! 2. Build one expression per resolved term and join them with `or`.
//! 3. For the `Patient` resource the per-term expression is the value and
//!    modifier expression itself. For any other resource it is wrapped as
//!    `reverseResolve(<Type>.subject).exists(<code identity> and <value and modifiers>)`.
//!
//! Only the value expression differs between kinds.

use atrius_fhirpath_builder::{Comparator, Expression};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::age;
use crate::attribute_filter::AttributeFilter;
use crate::error::{TranslationError, TranslationResult};
use crate::mapping::{CODING_VALUE_KIND, Mapping, MappingContext};
use crate::models::CriterionDocument;
use crate::modifier::{Modifier, code_expression, coding_expression, system_and_code};
use crate::term::{ContextualConcept, ContextualTerm, Term};

/// The resource type representing the subject itself.
pub const PATIENT_RESOURCE_TYPE: &str = "Patient";

/// A date window; either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRestriction {
    pub after: Option<String>,
    pub before: Option<String>,
}

impl TimeRestriction {
    pub fn new(after: Option<String>, before: Option<String>) -> Self {
        TimeRestriction { after, before }
    }

    /// Resolves this window against the time restriction path of `mapping`.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::MissingTimeRestrictionPath`] if the mapping
    /// declares no such path.
    pub fn to_modifier(&self, mapping: &Mapping) -> TranslationResult<Modifier> {
        let path = mapping
            .time_restriction_path()
            .ok_or_else(|| TranslationError::MissingTimeRestrictionPath(mapping.key().clone()))?;
        Ok(Modifier::TimeRestriction {
            path: path.to_string(),
            after: self.after.clone(),
            before: self.before.clone(),
        })
    }
}

/// The parts every concept based criterion carries.
///
/// # Examples
///
/// ```rust
/// use atrius_cohort_query::{Concept, ContextualConcept, CriterionBase, Term, TimeRestriction};
///
/// let concept = ContextualConcept::new(
///     Term::new("fdpg.mii.cds", "Diagnose", ""),
///     Concept::of(Term::new("http://fhir.de/CodeSystem/bfarm/icd-10-gm", "E10", "")),
/// );
/// let base = CriterionBase::new(concept)
///     .with_time_restriction(TimeRestriction::new(Some("2021-01-01".into()), None));
/// assert!(base.time_restriction.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionBase {
    pub concept: ContextualConcept,
    pub attribute_filters: Vec<AttributeFilter>,
    pub time_restriction: Option<TimeRestriction>,
}

impl CriterionBase {
    pub fn new(concept: ContextualConcept) -> Self {
        CriterionBase {
            concept,
            attribute_filters: Vec::new(),
            time_restriction: None,
        }
    }

    pub fn with_attribute_filter(mut self, filter: AttributeFilter) -> Self {
        self.attribute_filters.push(filter);
        self
    }

    pub fn with_attribute_filters(mut self, filters: impl IntoIterator<Item = AttributeFilter>) -> Self {
        self.attribute_filters.extend(filters);
        self
    }

    pub fn with_time_restriction(mut self, time_restriction: TimeRestriction) -> Self {
        self.time_restriction = Some(time_restriction);
        self
    }
}

/// A single, atomic criterion of a structured query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CriterionDocument")]
pub enum Criterion {
    /// Always `true`
    True,
    /// Always `false`
    False,
    /// Presence of the concept
    Concept(CriterionBase),
    /// The concept's value compared against a quantity
    Numeric {
        base: CriterionBase,
        comparator: Comparator,
        value: Decimal,
        unit: Option<String>,
    },
    /// The concept's value within an inclusive range
    Range {
        base: CriterionBase,
        lower: Decimal,
        upper: Decimal,
        unit: Option<String>,
    },
    /// The concept's coded value is one of the selected terms
    ValueSet {
        base: CriterionBase,
        selected: Vec<Term>,
    },
    /// Presence of the concept linked through a reference. The reference itself
    /// is not followed yet; its value expression is `true`.
    Reference {
        base: CriterionBase,
        referenced: Term,
    },
}

impl Criterion {
    pub fn concept(base: CriterionBase) -> Self {
        Criterion::Concept(base)
    }

    pub fn numeric(
        base: CriterionBase,
        comparator: Comparator,
        value: Decimal,
        unit: Option<String>,
    ) -> Self {
        Criterion::Numeric {
            base,
            comparator,
            value,
            unit,
        }
    }

    pub fn range(base: CriterionBase, lower: Decimal, upper: Decimal, unit: Option<String>) -> Self {
        Criterion::Range {
            base,
            lower,
            upper,
            unit,
        }
    }

    /// Creates a value set criterion.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::InvalidQueryShape`] if `selected` is empty.
    pub fn value_set(base: CriterionBase, selected: Vec<Term>) -> TranslationResult<Self> {
        if selected.is_empty() {
            return Err(TranslationError::InvalidQueryShape(
                "empty selected concepts".to_string(),
            ));
        }
        Ok(Criterion::ValueSet { base, selected })
    }

    pub fn reference(base: CriterionBase, referenced: Term) -> Self {
        Criterion::Reference { base, referenced }
    }

    pub fn base(&self) -> Option<&CriterionBase> {
        match self {
            Criterion::True | Criterion::False => None,
            Criterion::Concept(base)
            | Criterion::Numeric { base, .. }
            | Criterion::Range { base, .. }
            | Criterion::ValueSet { base, .. }
            | Criterion::Reference { base, .. } => Some(base),
        }
    }

    /// Translates this criterion into a FHIRPath filter expression.
    ///
    /// `today` anchors age criteria.
    pub fn to_filter(&self, context: &MappingContext, today: NaiveDate) -> TranslationResult<Expression> {
        let Some(base) = self.base() else {
            return Ok(Expression::boolean(matches!(self, Criterion::True)));
        };
        context
            .resolve(&base.concept)?
            .iter()
            .try_fold(Expression::FALSE, |acc, term| {
                Ok(Expression::or(acc, self.term_expression(base, context, term, today)?))
            })
    }

    fn term_expression(
        &self,
        base: &CriterionBase,
        context: &MappingContext,
        term: &ContextualTerm,
        today: NaiveDate,
    ) -> TranslationResult<Expression> {
        let mapping = context
            .find_mapping(term)
            .ok_or_else(|| TranslationError::MappingNotFound(term.clone()))?;
        let value_and_modifiers = self.value_and_modifier_expression(base, mapping, today)?;
        if mapping.resource_type() == PATIENT_RESOURCE_TYPE {
            return Ok(value_and_modifiers);
        }

        let subject = Expression::identifier(mapping.resource_type())?.dot("subject");
        let identity = code_identity(mapping, &term.term)?;
        Ok(Expression::reverse_resolve(subject).exists(Expression::and(identity, value_and_modifiers)))
    }

    fn value_and_modifier_expression(
        &self,
        base: &CriterionBase,
        mapping: &Mapping,
        today: NaiveDate,
    ) -> TranslationResult<Expression> {
        let value = self.value_expression(mapping, today)?;

        let mut modifiers: Vec<Modifier> = mapping.fixed_modifiers().to_vec();
        for filter in &base.attribute_filters {
            let attribute = mapping
                .attribute_mapping(filter.attribute_code())
                .ok_or_else(|| TranslationError::AttributeMappingNotFound(filter.attribute_code().clone()))?;
            modifiers.push(filter.to_modifier(attribute)?);
        }
        if let Some(time_restriction) = &base.time_restriction {
            modifiers.push(time_restriction.to_modifier(mapping)?);
        }

        if modifiers.is_empty() {
            return Ok(value);
        }
        let conjunction = modifiers
            .iter()
            .try_fold(Expression::TRUE, |acc, modifier| {
                Ok::<_, TranslationError>(Expression::and(acc, modifier.expression()?))
            })?;
        Ok(Expression::and(value, conjunction))
    }

    fn value_expression(&self, mapping: &Mapping, today: NaiveDate) -> TranslationResult<Expression> {
        let path = mapping.value_path();
        match self {
            Criterion::True | Criterion::False | Criterion::Concept(_) | Criterion::Reference { .. } => {
                Ok(Expression::TRUE)
            }
            Criterion::Numeric {
                comparator,
                value,
                unit,
                ..
            } => {
                if age::is_age(&mapping.key().term) {
                    return age::translate_age(path, *comparator, *value, unit.as_deref(), today);
                }
                Ok(Expression::comparison(
                    Expression::member(path),
                    *comparator,
                    Expression::quantity(*value, unit.as_deref()),
                ))
            }
            Criterion::Range {
                lower, upper, unit, ..
            } => {
                if age::is_age(&mapping.key().term) {
                    return age::translate_age_range(path, *lower, *upper, unit.as_deref(), today);
                }
                Ok(Expression::between(
                    Expression::member(path),
                    Expression::quantity(*lower, unit.as_deref()),
                    Expression::quantity(*upper, unit.as_deref()),
                ))
            }
            Criterion::ValueSet { selected, .. } => {
                if mapping.value_kind() == Some(CODING_VALUE_KIND) {
                    coding_expression(path, selected)
                } else {
                    let codes: Vec<String> = selected.iter().map(|term| term.code.clone()).collect();
                    code_expression(path, &codes)
                }
            }
        }
    }
}

/// `<termCodePath>.where(system = '<system>').exists(code = '<code>')`, or `true`
/// for mappings without a code path.
fn code_identity(mapping: &Mapping, term: &Term) -> TranslationResult<Expression> {
    match mapping.term_code_path() {
        None => Ok(Expression::TRUE),
        Some(path) => system_and_code(Expression::identifier(path)?, term),
    }
}
