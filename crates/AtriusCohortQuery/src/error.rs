//! Error types for cohort query translation.

use atrius_fhirpath_builder::ExpressionError;
use thiserror::Error;

use crate::term::{ContextualConcept, ContextualTerm, Term};

/// Result type alias for translation operations
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Errors raised while translating a structured query.
///
/// All variants are terminal: a single failing criterion fails the whole
/// translation, and no partial result is produced.
///
/// # Examples
///
/// ```rust
/// use atrius_cohort_query::{MappingContext, StructuredQuery, TranslationError, Translator};
/// use std::sync::Arc;
///
/// let query: StructuredQuery = serde_json::from_str(r#"{
///     "inclusionCriteria": [[{
///         "context": {"system": "fdpg.mii.cds", "code": "Diagnose"},
///         "termCodes": [{"system": "http://fhir.de/CodeSystem/bfarm/icd-10-gm", "code": "E10"}]
///     }]]
/// }"#).unwrap();
///
/// let translator = Translator::new(Arc::new(MappingContext::empty()));
/// match translator.translate(&query) {
///     Err(TranslationError::ConceptExpansionFailed(concept)) => {
///         eprintln!("no mapping for {}", concept);
///     }
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
#[derive(Debug, Error)]
pub enum TranslationError {
    /// None of the concept's terms, expanded or literal, has a mapping.
    #[error("Failed to expand the concept {0}.")]
    ConceptExpansionFailed(ContextualConcept),

    /// A resolved term has no entry in the mapping table.
    #[error("Mapping for {0} not found")]
    MappingNotFound(ContextualTerm),

    /// An attribute filter's code has no entry in the owning mapping's
    /// attribute table.
    #[error("Mapping for concept with {0}")]
    AttributeMappingNotFound(Term),

    /// A criterion asks for a time window but its mapping declares no path for it.
    #[error("Missing timeRestrictionPath in mapping with key {0}")]
    MissingTimeRestrictionPath(ContextualTerm),

    /// An identifier, date or date/time literal failed validation.
    #[error(transparent)]
    MalformedLiteral(#[from] ExpressionError),

    /// The query or one of its parts is structurally unusable.
    #[error("Invalid query: {0}")]
    InvalidQueryShape(String),

    /// An age criterion carries a unit other than `a`, `mo` or `wk`.
    #[error("Unknown age unit `{0}`")]
    UnknownAgeUnit(String),

    /// An attribute mapping type other than `Code` or `Coding` was used for a
    /// value set attribute filter.
    #[error("Unknown attribute mapping type: {0}")]
    UnknownAttributeMappingType(String),
}
