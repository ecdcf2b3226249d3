//! # JSON Documents
//!
//! Serde representations of the structured query, mapping and concept tree
//! documents, and their conversion into the domain types. Shape errors are
//! reported through `serde_json::Error` by way of `#[serde(try_from = ...)]`.
//!
//! ## Criterion
//!
//! ```json
//! {
//!   "context": {"system": "fdpg.mii.cds", "code": "Laboruntersuchung"},
//!   "termCodes": [{"system": "http://loinc.org", "code": "718-7"}],
//!   "valueFilter": {
//!     "type": "quantity-comparator",
//!     "comparator": "gt",
//!     "value": 50,
//!     "unit": {"code": "g/dl"}
//!   },
//!   "timeRestriction": {"afterDate": "2021-01-01", "beforeDate": "2022-01-01"},
//!   "attributeFilters": []
//! }
//! ```
//!
//! `valueFilter.type` is one of `quantity-comparator`, `quantity-range` or
//! `concept`. Without a value filter the criterion is a plain concept criterion.

use atrius_fhirpath_builder::Comparator;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::attribute_filter::AttributeFilter;
use crate::concept_tree::ConceptNode;
use crate::criterion::{Criterion, CriterionBase, TimeRestriction};
use crate::mapping::{AttributeMapping, Mapping};
use crate::modifier::Modifier;
use crate::term::{Concept, ContextualConcept, ContextualTerm, Term};
use crate::translator::StructuredQuery;

#[derive(Debug, Deserialize)]
pub(crate) struct UnitDocument {
    code: String,
}

/// The value part shared by value filters and attribute filters.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ValueFilterDocument {
    #[serde(rename = "quantity-comparator")]
    QuantityComparator {
        comparator: Comparator,
        value: Decimal,
        unit: Option<UnitDocument>,
    },
    #[serde(rename = "quantity-range", rename_all = "camelCase")]
    QuantityRange {
        min_value: Decimal,
        max_value: Decimal,
        unit: Option<UnitDocument>,
    },
    #[serde(rename = "concept", rename_all = "camelCase")]
    Concept {
        #[serde(default)]
        selected_concepts: Vec<Term>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttributeFilterDocument {
    attribute_code: Term,
    #[serde(flatten)]
    filter: ValueFilterDocument,
}

impl AttributeFilterDocument {
    /// Empty concept filters are skipped.
    fn into_filter(self) -> Option<AttributeFilter> {
        let attribute_code = self.attribute_code;
        match self.filter {
            ValueFilterDocument::QuantityComparator {
                comparator,
                value,
                unit,
            } => Some(AttributeFilter::Numeric {
                attribute_code,
                comparator,
                value,
                unit: unit.map(|u| u.code),
            }),
            ValueFilterDocument::QuantityRange {
                min_value,
                max_value,
                unit,
            } => Some(AttributeFilter::Range {
                attribute_code,
                lower: min_value,
                upper: max_value,
                unit: unit.map(|u| u.code),
            }),
            ValueFilterDocument::Concept { selected_concepts } if selected_concepts.is_empty() => {
                warn!(
                    attribute_code = %attribute_code.code,
                    "Skip attribute filter because of empty selected concepts"
                );
                None
            }
            ValueFilterDocument::Concept { selected_concepts } => Some(AttributeFilter::ValueSet {
                attribute_code,
                selected: selected_concepts,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimeRestrictionDocument {
    after_date: Option<String>,
    before_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CriterionDocument {
    context: Term,
    term_codes: Vec<Term>,
    value_filter: Option<ValueFilterDocument>,
    time_restriction: Option<TimeRestrictionDocument>,
    #[serde(default)]
    attribute_filters: Vec<AttributeFilterDocument>,
}

impl TryFrom<CriterionDocument> for Criterion {
    type Error = String;

    fn try_from(doc: CriterionDocument) -> Result<Self, Self::Error> {
        let concept = Concept::new(doc.term_codes).map_err(|e| e.to_string())?;
        let mut base = CriterionBase::new(ContextualConcept::new(doc.context, concept))
            .with_attribute_filters(
                doc.attribute_filters
                    .into_iter()
                    .filter_map(AttributeFilterDocument::into_filter),
            );
        if let Some(window) = doc.time_restriction {
            base = base.with_time_restriction(TimeRestriction::new(
                window.after_date,
                window.before_date,
            ));
        }

        match doc.value_filter {
            None => Ok(Criterion::concept(base)),
            Some(ValueFilterDocument::QuantityComparator {
                comparator,
                value,
                unit,
            }) => Ok(Criterion::numeric(
                base,
                comparator,
                value,
                unit.map(|u| u.code),
            )),
            Some(ValueFilterDocument::QuantityRange {
                min_value,
                max_value,
                unit,
            }) => Ok(Criterion::range(
                base,
                min_value,
                max_value,
                unit.map(|u| u.code),
            )),
            Some(ValueFilterDocument::Concept { selected_concepts }) => {
                if selected_concepts.is_empty() {
                    return Err(
                        "Missing or empty `selectedConcepts` key in concept criterion.".to_string(),
                    );
                }
                Criterion::value_set(base, selected_concepts).map_err(|e| e.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StructuredQueryDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    inclusion_criteria: Vec<Vec<Criterion>>,
    #[serde(default)]
    exclusion_criteria: Vec<Vec<Criterion>>,
}

impl From<StructuredQueryDocument> for StructuredQuery {
    fn from(doc: StructuredQueryDocument) -> Self {
        StructuredQuery {
            version: doc.version,
            display: doc.display,
            inclusion_criteria: doc.inclusion_criteria,
            exclusion_criteria: doc.exclusion_criteria,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FixedCriterionDocument {
    #[serde(rename = "type")]
    kind: String,
    fhir_path: String,
    #[serde(default)]
    value: Vec<Term>,
}

impl TryFrom<FixedCriterionDocument> for Modifier {
    type Error = String;

    fn try_from(doc: FixedCriterionDocument) -> Result<Self, Self::Error> {
        if doc.value.is_empty() {
            return Err("empty modifier values".to_string());
        }
        match doc.kind.as_str() {
            "code" => Ok(Modifier::Code {
                path: doc.fhir_path,
                codes: doc.value.into_iter().map(|term| term.code).collect(),
            }),
            "coding" => Ok(Modifier::Coding {
                path: doc.fhir_path,
                terms: doc.value,
            }),
            other => Err(format!("unknown type: {}", other)),
        }
    }
}

/// Mapping document as found in mapping tables. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MappingDocument {
    context: Term,
    key: Term,
    resource_type: String,
    term_code_fhir_path: Option<String>,
    value_fhir_path: Option<String>,
    value_type: Option<String>,
    #[serde(default)]
    fixed_criteria: Vec<FixedCriterionDocument>,
    #[serde(default)]
    attribute_fhir_paths: Vec<AttributeMapping>,
    time_restriction_fhir_path: Option<String>,
}

impl TryFrom<MappingDocument> for Mapping {
    type Error = String;

    fn try_from(doc: MappingDocument) -> Result<Self, Self::Error> {
        let mut mapping = Mapping::new(ContextualTerm::new(doc.context, doc.key), doc.resource_type);
        mapping = match doc.term_code_fhir_path {
            Some(path) => mapping.with_term_code_path(path),
            None => mapping.without_term_code_path(),
        };
        if let Some(path) = doc.value_fhir_path {
            mapping = mapping.with_value_path(path);
        }
        if let Some(kind) = doc.value_type {
            mapping = mapping.with_value_kind(kind);
        }
        for fixed in doc.fixed_criteria {
            mapping = mapping.with_fixed_modifier(Modifier::try_from(fixed)?);
        }
        for attribute in doc.attribute_fhir_paths {
            mapping = mapping.with_attribute_mapping(attribute);
        }
        if let Some(path) = doc.time_restriction_fhir_path {
            mapping = mapping.with_time_restriction_path(path);
        }
        Ok(mapping)
    }
}

/// Concept tree document. A node without `context` inherits its parent's.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConceptTreeDocument {
    context: Option<Term>,
    term_code: Term,
    #[serde(default)]
    children: Vec<ConceptTreeDocument>,
}

impl ConceptTreeDocument {
    pub(crate) fn into_node(self, inherited: Option<&Term>) -> Result<ConceptNode, String> {
        let context = match (self.context, inherited) {
            (Some(context), _) => context,
            (None, Some(context)) => context.clone(),
            (None, None) => {
                return Err(format!(
                    "concept tree node `{}|{}` has no context",
                    self.term_code.system, self.term_code.code
                ));
            }
        };
        let children = self
            .children
            .into_iter()
            .map(|child| child.into_node(Some(&context)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConceptNode::new(
            ContextualTerm::new(context, self.term_code),
            children,
        ))
    }
}

impl<'de> Deserialize<'de> for ConceptNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        ConceptTreeDocument::deserialize(deserializer)?
            .into_node(None)
            .map_err(serde::de::Error::custom)
    }
}
