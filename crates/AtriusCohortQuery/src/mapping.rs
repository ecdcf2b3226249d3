//! # Mappings
//!
//! A [`Mapping`] describes where a concept is found on a FHIR resource: the
//! resource type, the path of its code, the path of its value, fixed criteria
//! that always apply, attribute sub-mappings and the path used for time
//! restrictions.
//!
//! The [`MappingContext`] bundles all mappings with the optional concept tree. It
//! is built once, never mutated, and can be shared between threads behind an
//! `Arc`.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::concept_tree::ConceptNode;
use crate::error::{TranslationError, TranslationResult};
use crate::models::MappingDocument;
use crate::modifier::Modifier;
use crate::term::{ContextualConcept, ContextualTerm, Term};

/// Value kind marking values held in a `Coding` (or `CodeableConcept`).
pub const CODING_VALUE_KIND: &str = "Coding";

/// How an attribute filter maps onto a resource path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeMapping {
    /// `Code` or `Coding`
    #[serde(rename = "attributeType")]
    pub kind: String,
    #[serde(rename = "attributeKey")]
    pub key: Term,
    #[serde(rename = "attributePath")]
    pub path: String,
}

/// The mapping of one contextual term onto a resource.
///
/// # Examples
///
/// ```rust
/// use atrius_cohort_query::{ContextualTerm, Mapping, Modifier, Term};
///
/// let key = ContextualTerm::new(
///     Term::new("fdpg.mii.cds", "Laboruntersuchung", ""),
///     Term::new("http://loinc.org", "718-7", "Hemoglobin"),
/// );
/// let mapping = Mapping::new(key, "Observation")
///     .with_term_code_path("code.coding")
///     .with_value_path("value")
///     .with_fixed_modifier(Modifier::Code {
///         path: "status".to_string(),
///         codes: vec!["final".to_string()],
///     });
///
/// assert_eq!(mapping.resource_type(), "Observation");
/// assert_eq!(mapping.term_code_path(), Some("code.coding"));
/// assert_eq!(mapping.fixed_modifiers().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MappingDocument")]
pub struct Mapping {
    key: ContextualTerm,
    resource_type: String,
    term_code_path: Option<String>,
    value_path: String,
    value_kind: Option<String>,
    fixed_modifiers: Vec<Modifier>,
    attribute_mappings: HashMap<Term, AttributeMapping>,
    time_restriction_path: Option<String>,
}

impl Mapping {
    /// Creates a mapping with code path `code` and value path `value`.
    pub fn new(key: ContextualTerm, resource_type: impl Into<String>) -> Self {
        Mapping {
            key,
            resource_type: resource_type.into(),
            term_code_path: Some("code".to_string()),
            value_path: "value".to_string(),
            value_kind: None,
            fixed_modifiers: Vec::new(),
            attribute_mappings: HashMap::new(),
            time_restriction_path: None,
        }
    }

    pub fn with_term_code_path(mut self, path: impl Into<String>) -> Self {
        self.term_code_path = Some(path.into());
        self
    }

    /// Marks the value path as already code specific; no code identity filter
    /// is generated for this mapping.
    pub fn without_term_code_path(mut self) -> Self {
        self.term_code_path = None;
        self
    }

    pub fn with_value_path(mut self, path: impl Into<String>) -> Self {
        self.value_path = path.into();
        self
    }

    pub fn with_value_kind(mut self, kind: impl Into<String>) -> Self {
        self.value_kind = Some(kind.into());
        self
    }

    pub fn with_fixed_modifier(mut self, modifier: Modifier) -> Self {
        self.fixed_modifiers.push(modifier);
        self
    }

    pub fn with_attribute_mapping(mut self, attribute: AttributeMapping) -> Self {
        self.attribute_mappings.insert(attribute.key.clone(), attribute);
        self
    }

    pub fn with_time_restriction_path(mut self, path: impl Into<String>) -> Self {
        self.time_restriction_path = Some(path.into());
        self
    }

    pub fn key(&self) -> &ContextualTerm {
        &self.key
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn term_code_path(&self) -> Option<&str> {
        self.term_code_path.as_deref()
    }

    pub fn value_path(&self) -> &str {
        &self.value_path
    }

    pub fn value_kind(&self) -> Option<&str> {
        self.value_kind.as_deref()
    }

    pub fn fixed_modifiers(&self) -> &[Modifier] {
        &self.fixed_modifiers
    }

    pub fn attribute_mapping(&self, code: &Term) -> Option<&AttributeMapping> {
        self.attribute_mappings.get(code)
    }

    pub fn time_restriction_path(&self) -> Option<&str> {
        self.time_restriction_path.as_deref()
    }
}

/// Read-only lookup service over all mappings and the concept tree.
#[derive(Debug, Clone, Default)]
pub struct MappingContext {
    mappings: HashMap<ContextualTerm, Mapping>,
    concept_tree: Option<ConceptNode>,
}

impl MappingContext {
    /// Builds a context from mappings keyed by their own key. Later mappings
    /// with the same key replace earlier ones.
    pub fn new(mappings: impl IntoIterator<Item = Mapping>, concept_tree: Option<ConceptNode>) -> Self {
        MappingContext {
            mappings: mappings
                .into_iter()
                .map(|mapping| (mapping.key.clone(), mapping))
                .collect(),
            concept_tree,
        }
    }

    pub fn empty() -> Self {
        MappingContext::default()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn concept_tree(&self) -> Option<&ConceptNode> {
        self.concept_tree.as_ref()
    }

    pub fn find_mapping(&self, key: &ContextualTerm) -> Option<&Mapping> {
        self.mappings.get(key)
    }

    /// Resolves a concept into the mapped terms it stands for.
    ///
    /// Every term of the concept is expanded through the concept tree. If that
    /// yields nothing (or there is no tree) the concept's own terms are used.
    /// Only terms with a mapping are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::ConceptExpansionFailed`] if no mapped term
    /// remains.
    pub fn resolve(&self, concept: &ContextualConcept) -> TranslationResult<Vec<ContextualTerm>> {
        let expanded: Vec<ContextualTerm> = match &self.concept_tree {
            Some(tree) => concept
                .contextual_terms()
                .flat_map(|term| tree.expand(&term).cloned().collect::<Vec<_>>())
                .collect(),
            None => Vec::new(),
        };
        let candidates = if expanded.is_empty() {
            concept.contextual_terms().collect()
        } else {
            expanded
        };

        let resolved: Vec<ContextualTerm> = candidates
            .into_iter()
            .filter(|term| self.mappings.contains_key(term))
            .collect();
        if resolved.is_empty() {
            return Err(TranslationError::ConceptExpansionFailed(concept.clone()));
        }
        debug!(concept = %concept, terms = resolved.len(), "resolved concept");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Concept;

    fn context() -> Term {
        Term::new("fdpg.mii.cds", "Diagnose", "Diagnose")
    }

    fn at(code: &str) -> ContextualTerm {
        ContextualTerm::new(context(), Term::new("icd10", code, ""))
    }

    fn concept(code: &str) -> ContextualConcept {
        ContextualConcept::new(context(), Concept::of(Term::new("icd10", code, "")))
    }

    fn tree() -> ConceptNode {
        ConceptNode::new(
            at("E10-E14"),
            vec![
                ConceptNode::leaf(at("E10")),
                ConceptNode::leaf(at("E11")),
                ConceptNode::leaf(at("E12")),
            ],
        )
    }

    #[test]
    fn test_resolve_without_tree_uses_own_terms() {
        let ctx = MappingContext::new([Mapping::new(at("E10"), "Condition")], None);
        assert_eq!(ctx.resolve(&concept("E10")).unwrap(), vec![at("E10")]);
    }

    #[test]
    fn test_resolve_expands_and_filters_by_mapping() {
        let ctx = MappingContext::new(
            [
                Mapping::new(at("E10"), "Condition"),
                Mapping::new(at("E12"), "Condition"),
            ],
            Some(tree()),
        );
        assert_eq!(ctx.resolve(&concept("E10-E14")).unwrap(), vec![at("E10"), at("E12")]);
    }

    #[test]
    fn test_resolve_falls_back_when_tree_has_no_entry() {
        let ctx = MappingContext::new([Mapping::new(at("I10"), "Condition")], Some(tree()));
        assert_eq!(ctx.resolve(&concept("I10")).unwrap(), vec![at("I10")]);
    }

    #[test]
    fn test_resolve_fails_without_any_mapping() {
        let ctx = MappingContext::new([], Some(tree()));
        let err = ctx.resolve(&concept("E10-E14")).unwrap_err();
        match err {
            TranslationError::ConceptExpansionFailed(c) => assert_eq!(c, concept("E10-E14")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_attribute_mapping_lookup_ignores_display() {
        let mapping = Mapping::new(at("E10"), "Condition").with_attribute_mapping(AttributeMapping {
            kind: "Coding".to_string(),
            key: Term::new("mii.abide", "lokalisation", "Lokalisation"),
            path: "bodySite".to_string(),
        });
        assert!(mapping
            .attribute_mapping(&Term::new("mii.abide", "lokalisation", ""))
            .is_some());
        assert!(mapping.attribute_mapping(&Term::new("mii.abide", "other", "")).is_none());
    }

    #[test]
    fn test_builder_defaults() {
        let mapping = Mapping::new(at("E10"), "Condition");
        assert_eq!(mapping.term_code_path(), Some("code"));
        assert_eq!(mapping.value_path(), "value");
        assert_eq!(mapping.value_kind(), None);
        assert_eq!(mapping.without_term_code_path().term_code_path(), None);
    }
}
