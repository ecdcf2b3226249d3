//! Coded terms and concepts.
//!
//! A [`Term`] is identified by its `(system, code)` pair; the display text is
//! carried along for diagnostics only. Every concept reading is qualified by a
//! usage context, which makes [`ContextualTerm`] the key of the mapping table.

use serde::Deserialize;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{TranslationError, TranslationResult};

/// A coded term such as `http://loinc.org|29463-7`.
///
/// Equality and hashing ignore `display`.
#[derive(Debug, Clone, Eq, Deserialize)]
pub struct Term {
    pub system: String,
    pub code: String,
    #[serde(default)]
    pub display: String,
}

impl Term {
    pub fn new(
        system: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Term {
            system: system.into(),
            code: code.into(),
            display: display.into(),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.system == other.system && self.code == other.code
    }
}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.system.hash(state);
        self.code.hash(state);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system `{}`, code `{}` and display `{}`",
            self.system, self.code, self.display
        )
    }
}

/// A term read under a usage context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextualTerm {
    pub context: Term,
    pub term: Term,
}

impl ContextualTerm {
    pub fn new(context: Term, term: Term) -> Self {
        ContextualTerm { context, term }
    }
}

impl fmt::Display for ContextualTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "concept with {} and context with {}", self.term, self.context)
    }
}

/// Alternative codings of one clinical idea. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    terms: Vec<Term>,
}

impl Concept {
    /// Creates a concept from at least one term.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::InvalidQueryShape`] if `terms` is empty.
    pub fn new(terms: Vec<Term>) -> TranslationResult<Self> {
        if terms.is_empty() {
            return Err(TranslationError::InvalidQueryShape(
                "a concept needs at least one term".to_string(),
            ));
        }
        Ok(Concept { terms })
    }

    pub fn of(term: Term) -> Self {
        Concept { terms: vec![term] }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

/// A concept paired with the context it is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualConcept {
    pub context: Term,
    pub concept: Concept,
}

impl ContextualConcept {
    pub fn new(context: Term, concept: Concept) -> Self {
        ContextualConcept { context, concept }
    }

    /// Returns every term of the concept qualified by the concept's context.
    pub fn contextual_terms(&self) -> impl Iterator<Item = ContextualTerm> + '_ {
        self.concept
            .terms()
            .iter()
            .map(|term| ContextualTerm::new(self.context.clone(), term.clone()))
    }
}

impl fmt::Display for ContextualConcept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self
            .concept
            .terms()
            .iter()
            .map(|term| format!("{}|{}", term.system, term.code))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "[{}] in context {}|{}",
            terms, self.context.system, self.context.code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_display() {
        let a = Term::new("http://loinc.org", "29463-7", "Body weight");
        let b = Term::new("http://loinc.org", "29463-7", "");
        assert_eq!(a, b);

        let set: HashSet<Term> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_different_system_is_different_term() {
        let a = Term::new("http://loinc.org", "1", "");
        let b = Term::new("http://snomed.info/sct", "1", "");
        assert_ne!(a, b);
    }

    #[test]
    fn test_deserialize_without_display() {
        let term: Term =
            serde_json::from_str(r#"{"system": "http://loinc.org", "code": "718-7", "version": "2.71"}"#)
                .unwrap();
        assert_eq!(term.code, "718-7");
        assert_eq!(term.display, "");
    }

    #[test]
    fn test_empty_concept_is_rejected() {
        assert!(matches!(
            Concept::new(Vec::new()),
            Err(TranslationError::InvalidQueryShape(_))
        ));
    }

    #[test]
    fn test_contextual_terms_share_context() {
        let context = Term::new("fdpg.mii.cds", "Laboruntersuchung", "");
        let concept = ContextualConcept::new(
            context.clone(),
            Concept::new(vec![Term::new("a", "1", ""), Term::new("b", "2", "")]).unwrap(),
        );
        let terms: Vec<_> = concept.contextual_terms().collect();
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(|t| t.context == context));
        assert_eq!(terms[1].term.code, "2");
    }
}
