//! # Concept Hierarchy
//!
//! An owned tree of [`ContextualTerm`]s used to expand a broad concept into the
//! specific leaf concepts that carry mappings.
//!
//! Expansion is lazy and iterative: [`ConceptNode::expand`] walks the tree with an
//! explicit stack, so deep hierarchies cannot exhaust the call stack. Because the
//! tree owns its children, cycles cannot be represented.

use crate::term::ContextualTerm;

/// A node in the concept hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptNode {
    pub term: ContextualTerm,
    pub children: Vec<ConceptNode>,
}

impl ConceptNode {
    pub fn new(term: ContextualTerm, children: Vec<ConceptNode>) -> Self {
        ConceptNode { term, children }
    }

    pub fn leaf(term: ContextualTerm) -> Self {
        ConceptNode {
            term,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Expands `term` into the leaf terms below every node carrying it.
    ///
    /// A matching leaf yields itself. A term that does not occur in the tree
    /// yields nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atrius_cohort_query::{ConceptNode, ContextualTerm, Term};
    ///
    /// let ctx = Term::new("fdpg.mii.cds", "Diagnose", "");
    /// let at = |code: &str| ContextualTerm::new(ctx.clone(), Term::new("icd10", code, ""));
    ///
    /// let tree = ConceptNode::new(
    ///     at("E10-E14"),
    ///     vec![ConceptNode::leaf(at("E10")), ConceptNode::leaf(at("E11"))],
    /// );
    ///
    /// let target = at("E10-E14");
    /// let codes: Vec<_> = tree.expand(&target).map(|t| t.term.code.as_str()).collect();
    /// assert_eq!(codes, ["E10", "E11"]);
    /// assert_eq!(tree.expand(&at("E11")).count(), 1);
    /// assert_eq!(tree.expand(&at("I10")).count(), 0);
    /// ```
    pub fn expand<'a>(&'a self, term: &'a ContextualTerm) -> Expand<'a> {
        Expand {
            target: term,
            search: vec![self],
            leaves: Vec::new(),
        }
    }
}

/// Iterator returned by [`ConceptNode::expand`].
pub struct Expand<'a> {
    target: &'a ContextualTerm,
    search: Vec<&'a ConceptNode>,
    leaves: Vec<&'a ConceptNode>,
}

impl<'a> Iterator for Expand<'a> {
    type Item = &'a ContextualTerm;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.leaves.pop() {
                if node.is_leaf() {
                    return Some(&node.term);
                }
                self.leaves.extend(node.children.iter().rev());
                continue;
            }

            let node = self.search.pop()?;
            if node.term == *self.target {
                self.leaves.push(node);
            } else {
                self.search.extend(node.children.iter().rev());
            }
        }
    }
}
