//! # Structured Query Translator
//!
//! Turns a [`StructuredQuery`] into FHIRPath filter parameters for a `count()`
//! aggregation.
//!
//! Inclusion criteria are in conjunctive normal form (the outer list is joined
//! with `and`, every inner list with `or`); exclusion criteria are in
//! disjunctive normal form (outer `or`, inner `and`). The inclusion expression
//! becomes the first filter. If there are exclusion criteria, their negation
//! becomes a second filter; the aggregation backend conjoins filters implicitly.
//!
//! ## Examples
//!
//! ```rust
//! use atrius_cohort_query::{MappingContext, Mapping, StructuredQuery, Translator};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mappings: Vec<Mapping> = serde_json::from_str(r#"[{
//!     "context": {"system": "fdpg.mii.cds", "code": "Diagnose"},
//!     "key": {"system": "http://fhir.de/CodeSystem/bfarm/icd-10-gm", "code": "E10"},
//!     "resourceType": "Condition",
//!     "termCodeFhirPath": "code.coding"
//! }]"#)?;
//! let query: StructuredQuery = serde_json::from_str(r#"{
//!     "inclusionCriteria": [[{
//!         "context": {"system": "fdpg.mii.cds", "code": "Diagnose"},
//!         "termCodes": [{"system": "http://fhir.de/CodeSystem/bfarm/icd-10-gm", "code": "E10"}]
//!     }]]
//! }"#)?;
//!
//! let translator = Translator::new(Arc::new(MappingContext::new(mappings, None)));
//! let parameters = translator.translate(&query)?;
//!
//! assert_eq!(parameters.aggregation(), Some("count()"));
//! assert_eq!(
//!     parameters.filters().collect::<Vec<_>>(),
//!     ["reverseResolve(Condition.subject).exists(code.coding.where(system = 'http://fhir.de/CodeSystem/bfarm/icd-10-gm').exists(code = 'E10'))"]
//! );
//! # Ok(())
//! # }
//! ```

use atrius_fhirpath_builder::Expression;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::criterion::Criterion;
use crate::error::{TranslationError, TranslationResult};
use crate::mapping::MappingContext;
use crate::models::StructuredQueryDocument;

pub const AGGREGATION_PARAMETER: &str = "aggregation";
pub const FILTER_PARAMETER: &str = "filter";

/// A cohort query: inclusion criteria in CNF, exclusion criteria in DNF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "StructuredQueryDocument")]
pub struct StructuredQuery {
    pub version: Option<String>,
    pub display: Option<String>,
    pub inclusion_criteria: Vec<Vec<Criterion>>,
    pub exclusion_criteria: Vec<Vec<Criterion>>,
}

impl StructuredQuery {
    pub fn new(inclusion_criteria: Vec<Vec<Criterion>>) -> Self {
        StructuredQuery {
            inclusion_criteria,
            ..Default::default()
        }
    }

    pub fn with_exclusion_criteria(mut self, exclusion_criteria: Vec<Vec<Criterion>>) -> Self {
        self.exclusion_criteria = exclusion_criteria;
        self
    }

    fn has_exclusions(&self) -> bool {
        self.exclusion_criteria.iter().any(|group| !group.is_empty())
    }
}

/// One named string parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "valueString")]
    pub value_string: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            value_string: value.into(),
        }
    }
}

/// The translation result, serialized as a FHIR `Parameters` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename = "Parameters")]
pub struct Parameters {
    pub parameter: Vec<Parameter>,
}

impl Parameters {
    /// Returns the value of the aggregation parameter.
    pub fn aggregation(&self) -> Option<&str> {
        self.values(AGGREGATION_PARAMETER).next()
    }

    /// Returns the filter expressions in order.
    pub fn filters(&self) -> impl Iterator<Item = &str> + '_ {
        self.values(FILTER_PARAMETER)
    }

    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.parameter
            .iter()
            .filter(move |p| p.name == name)
            .map(|p| p.value_string.as_str())
    }
}

/// Translates structured queries against a shared [`MappingContext`].
///
/// `Translator` is cheap to clone and safe to use from several threads.
#[derive(Debug, Clone)]
pub struct Translator {
    mapping_context: Arc<MappingContext>,
    today: Option<NaiveDate>,
}

impl Translator {
    pub fn new(mapping_context: Arc<MappingContext>) -> Self {
        Translator {
            mapping_context,
            today: None,
        }
    }

    /// Fixes the date age criteria are computed against. Without it the local
    /// date at translation time is used.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn mapping_context(&self) -> &MappingContext {
        &self.mapping_context
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Builds `and` over the inclusion groups of `or`ed criteria.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::InvalidQueryShape`] if there is no inclusion
    /// criterion or an inclusion group is empty.
    pub fn inclusion_expression(&self, query: &StructuredQuery) -> TranslationResult<Expression> {
        if query.inclusion_criteria.is_empty() {
            return Err(TranslationError::InvalidQueryShape(
                "a query needs at least one inclusion criterion".to_string(),
            ));
        }
        let today = self.today();
        query
            .inclusion_criteria
            .iter()
            .try_fold(Expression::TRUE, |acc, group| {
                let disjunction = self.fold_group(group, Expression::FALSE, Expression::or, today)?;
                Ok(Expression::and(acc, disjunction))
            })
    }

    /// Builds `or` over the exclusion groups of `and`ed criteria.
    pub fn exclusion_expression(&self, query: &StructuredQuery) -> TranslationResult<Expression> {
        let today = self.today();
        query
            .exclusion_criteria
            .iter()
            .try_fold(Expression::FALSE, |acc, group| {
                let conjunction = self.fold_group(group, Expression::TRUE, Expression::and, today)?;
                Ok(Expression::or(acc, conjunction))
            })
    }

    fn fold_group(
        &self,
        group: &[Criterion],
        seed: Expression,
        join: fn(Expression, Expression) -> Expression,
        today: NaiveDate,
    ) -> TranslationResult<Expression> {
        if group.is_empty() {
            return Err(TranslationError::InvalidQueryShape(
                "criteria groups must not be empty".to_string(),
            ));
        }
        group.iter().try_fold(seed, |acc, criterion| {
            Ok(join(acc, criterion.to_filter(&self.mapping_context, today)?))
        })
    }

    /// Translates `query` into the `count()` aggregation and its filters.
    pub fn translate(&self, query: &StructuredQuery) -> TranslationResult<Parameters> {
        let aggregation = Expression::function_call("count", Vec::new());
        let mut parameter = vec![
            Parameter::new(AGGREGATION_PARAMETER, aggregation.to_string()),
            Parameter::new(FILTER_PARAMETER, self.inclusion_expression(query)?.to_string()),
        ];
        if query.has_exclusions() {
            let exclusion = self.exclusion_expression(query)?;
            parameter.push(Parameter::new(FILTER_PARAMETER, exclusion.not().to_string()));
        }
        debug!(
            inclusion_groups = query.inclusion_criteria.len(),
            exclusion_groups = query.exclusion_criteria.len(),
            filters = parameter.len() - 1,
            "translated structured query"
        );
        Ok(Parameters { parameter })
    }
}

/// Translates `query` against `mapping_context`, computing ages from the local
/// date.
pub fn translate(query: &StructuredQuery, mapping_context: Arc<MappingContext>) -> TranslationResult<Parameters> {
    Translator::new(mapping_context).translate(query)
}
