//! Reading mapping tables, concept trees and queries from JSON files.
//!
//! The mapping file holds a JSON array of mapping documents; the concept tree
//! file holds a single root node. A path of `-` reads from stdin.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::concept_tree::ConceptNode;
use crate::mapping::{Mapping, MappingContext};
use crate::translator::StructuredQuery;

/// Errors raised while reading input documents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn read_input(path: &Path) -> Result<String, LoadError> {
    if path.to_str() == Some("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = read_input(path)?;
    debug!(path = %path.display(), bytes = content.len(), "read input");
    Ok(serde_json::from_str(&content)?)
}

/// Reads the mapping table and, if given, the concept tree.
pub fn read_mapping_context(mappings: &Path, tree: Option<&Path>) -> Result<MappingContext, LoadError> {
    let mappings: Vec<Mapping> = read_json(mappings)?;
    let tree = tree.map(read_json::<ConceptNode>).transpose()?;
    let context = MappingContext::new(mappings, tree);
    info!(
        mappings = context.len(),
        concept_tree = context.concept_tree().is_some(),
        "loaded mapping context"
    );
    Ok(context)
}

pub fn read_structured_query(path: &Path) -> Result<StructuredQuery, LoadError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{ContextualTerm, Term};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_mapping_context_with_tree() {
        let mappings = file_with(
            r#"[{
                "context": {"system": "fdpg.mii.cds", "code": "Diagnose"},
                "key": {"system": "icd10", "code": "E10"},
                "resourceType": "Condition"
            }]"#,
        );
        let tree = file_with(
            r#"{
                "context": {"system": "fdpg.mii.cds", "code": "Diagnose"},
                "termCode": {"system": "icd10", "code": "E10-E14"},
                "children": [{"termCode": {"system": "icd10", "code": "E10"}}]
            }"#,
        );
        let context = read_mapping_context(mappings.path(), Some(tree.path())).unwrap();
        assert_eq!(context.len(), 1);
        assert!(context.concept_tree().is_some());
        let key = ContextualTerm::new(
            Term::new("fdpg.mii.cds", "Diagnose", ""),
            Term::new("icd10", "E10", ""),
        );
        assert!(context.find_mapping(&key).is_some());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_structured_query(Path::new("/nonexistent/query.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_malformed_query_is_json_error() {
        let query = file_with(r#"{"inclusionCriteria": [[{"context": 1}]]}"#);
        let err = read_structured_query(query.path()).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
