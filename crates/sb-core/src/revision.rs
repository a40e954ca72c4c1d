//! Revision identifiers: points in the script repository's history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// Identifier of a specific changeset (a commit hash for git).
    pub struct ChangesetId;
}

define_newtype_string! {
    /// Name of a tag in the script repository.
    pub struct TagName;
}

/// A point in source history.
///
/// Two revisions compare equal only when both the variant and the payload
/// match. There is no `Ord`: the relative order of two
/// changesets is only known to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionId {
    /// The live working tree, including uncommitted edits
    #[serde(rename = "working")]
    WorkingCopy,
    /// A specific changeset
    Changeset(ChangesetId),
    /// A named tag
    Tag(TagName),
}

impl RevisionId {
    /// Shorthand for a changeset revision.
    ///
    /// # Panics
    /// When `id` is empty. Parse user input with [`FromStr`] instead.
    pub fn changeset(id: impl Into<String>) -> Self {
        RevisionId::Changeset(ChangesetId::new(id))
    }

    /// Shorthand for a tag revision.
    ///
    /// # Panics
    /// When `name` is empty.
    pub fn tag(name: impl Into<String>) -> Self {
        RevisionId::Tag(TagName::new(name))
    }

    /// Whether this revision refers to the working tree.
    pub fn is_working_copy(&self) -> bool {
        matches!(self, RevisionId::WorkingCopy)
    }

    /// Label of the revision kind, as used in the textual form.
    pub fn kind_label(&self) -> &'static str {
        match self {
            RevisionId::WorkingCopy => "working",
            RevisionId::Changeset(_) => "changeset",
            RevisionId::Tag(_) => "tag",
        }
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionId::WorkingCopy => write!(f, "working"),
            RevisionId::Changeset(id) => write!(f, "changeset:{}", id),
            RevisionId::Tag(name) => write!(f, "tag:{}", name),
        }
    }
}

impl FromStr for RevisionId {
    type Err = CoreError;

    /// Parse `working`, `changeset:<id>`, or `tag:<name>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("working") {
            return Ok(RevisionId::WorkingCopy);
        }

        let invalid = |reason: &str| CoreError::InvalidRevision {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let Some((kind, value)) = s.split_once(':') else {
            return Err(invalid(
                "expected 'working', 'changeset:<id>', or 'tag:<name>'",
            ));
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid("revision value must not be empty"));
        }

        match kind.to_ascii_lowercase().as_str() {
            "changeset" | "cs" => Ok(RevisionId::changeset(value)),
            "tag" => Ok(RevisionId::tag(value)),
            other => Err(invalid(&format!("unknown revision kind '{}'", other))),
        }
    }
}

#[cfg(test)]
#[path = "revision_test.rs"]
mod tests;
