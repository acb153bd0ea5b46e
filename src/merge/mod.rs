//! Mail-merge over slides: find marker-bearing templates, clone one copy
//! per name, substitute the marker, and remove the templates.

pub mod engine;
pub mod scanner;
pub mod substitute;

pub use engine::MergeEngine;

use std::fmt;

use crate::error::{MergeError, Result};
use crate::opc::PackUri;

/// Default marker looked for in template slides.
pub const DEFAULT_MARKER: &str = "{{NOMBRE}}";

/// Where generated slides land in the slide list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementPolicy {
    /// Leave clones at the tail of the slide list, in generation order.
    AppendOnly,
    /// Move each clone directly after its template, keeping name order.
    #[default]
    InsertAfterTemplate,
}

/// Knobs for a merge run.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Literal text to find and replace. No pattern syntax.
    pub marker: String,
    pub placement: PlacementPolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            marker: DEFAULT_MARKER.to_string(),
            placement: PlacementPolicy::default(),
        }
    }
}

/// An ordered, de-noised list of names to merge.
#[derive(Debug, Clone)]
pub struct NameList {
    names: Vec<String>,
}

impl NameList {
    /// Parse raw text, one name per line. Surrounding whitespace is trimmed
    /// and blank lines dropped; duplicates are kept, order preserved.
    pub fn parse(raw: &str) -> Result<Self> {
        let names: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(MergeError::EmptyNameList);
        }
        Ok(NameList { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A non-fatal condition noticed during a merge run.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    /// A clone was generated but the marker text never changed in it.
    MarkerNotReplaced { name: String, slide: PackUri },
    /// A relationship on the source slide could not be carried onto a clone.
    RelationshipSkipped {
        slide: PackUri,
        r_id: String,
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MarkerNotReplaced { name, slide } => {
                write!(f, "marker not replaced for \"{name}\" in {slide}")
            }
            Diagnostic::RelationshipSkipped { slide, r_id, reason } => {
                write!(f, "relationship {r_id} skipped on {slide}: {reason}")
            }
        }
    }
}

/// Summary of a completed merge run.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Clones produced, equal to templates times names.
    pub slides_generated: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_list_trims_and_drops_blanks() {
        let list = NameList::parse("  Ana \n\n\tLuis\n   \nAna\n").unwrap();
        assert_eq!(list.names(), ["Ana", "Luis", "Ana"]);
    }

    #[test]
    fn empty_name_list_is_an_error() {
        assert!(matches!(
            NameList::parse("\n   \n\t\n"),
            Err(MergeError::EmptyNameList)
        ));
    }
}
