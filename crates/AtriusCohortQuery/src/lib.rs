//! # Cohort Query Translation
//!
//! Translates structured cohort queries into FHIRPath filter expressions for a
//! `count()` aggregation over patients.
//!
//! A structured query selects patients by criteria on clinical concepts (a
//! diagnosis, a lab value, an age). Every criterion is resolved through a
//! [`MappingContext`], which tells where a concept lives on a FHIR resource, and
//! an optional concept tree, which expands a parent concept into its
//! descendants. The resulting filters are evaluated per `Patient`: criteria on
//! other resources are reached through `reverseResolve(<Type>.subject)`.
//!
//! ## Overview
//!
//! - [`term`]: coded terms, concepts and their contexts
//! - [`concept_tree`]: expansion of a concept into its leaf concepts
//! - [`mapping`]: per-concept mappings and the read-only [`MappingContext`]
//! - [`modifier`] and [`attribute_filter`]: additional constraints on a resource
//! - [`criterion`]: the atomic criteria and their translation
//! - [`age`]: age criteria rewritten against the birth date
//! - [`translator`]: query level combination into `Parameters`
//! - [`load`] and [`cli`]: reading JSON inputs and the command-line tool
//!
//! ## Examples
//!
//! ```rust
//! use atrius_cohort_query::{Criterion, MappingContext, StructuredQuery, Translator};
//! use std::sync::Arc;
//!
//! let query = StructuredQuery::new(vec![vec![Criterion::True]])
//!     .with_exclusion_criteria(vec![vec![Criterion::False]]);
//! let parameters = Translator::new(Arc::new(MappingContext::empty()))
//!     .translate(&query)
//!     .unwrap();
//!
//! assert_eq!(parameters.filters().collect::<Vec<_>>(), ["true", "false.not()"]);
//! ```

pub mod age;
pub mod attribute_filter;
pub mod cli;
pub mod concept_tree;
pub mod criterion;
pub mod error;
pub mod load;
pub mod mapping;
mod models;
pub mod modifier;
pub mod term;
pub mod translator;

pub use attribute_filter::AttributeFilter;
pub use concept_tree::ConceptNode;
pub use criterion::{Criterion, CriterionBase, TimeRestriction};
pub use error::{TranslationError, TranslationResult};
pub use load::{LoadError, read_mapping_context, read_structured_query};
pub use mapping::{AttributeMapping, Mapping, MappingContext};
pub use modifier::Modifier;
pub use term::{Concept, ContextualConcept, ContextualTerm, Term};
pub use translator::{Parameter, Parameters, StructuredQuery, Translator, translate};
