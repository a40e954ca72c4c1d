//! Versioned script files, the changes between two revisions, and the parser
//! capability that turns script text into object descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checksum::compute_checksum;
use crate::error::CoreResult;
use crate::newtype_string::define_newtype_string;
use crate::object::ObjectDescriptor;

define_newtype_string! {
    /// Repository-relative path of a script, always with forward slashes.
    pub struct ScriptPath;
}

/// A single versioned SQL file and its content at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFile {
    /// Repository-relative path
    pub path: ScriptPath,

    /// Raw text content
    pub content: String,

    /// SHA-256 of `content`
    pub checksum: String,
}

impl ScriptFile {
    /// Create a script file, computing its checksum.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        let content = content.into();
        Self {
            checksum: compute_checksum(&content),
            path: ScriptPath::new(path),
            content,
        }
    }
}

/// How a script changed between two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// A changed script between a `from` and a `to` revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum ScriptChange {
    /// Present at `to` only
    Added { script: ScriptFile },
    /// Present at both revisions with different content
    Modified {
        previous: ScriptFile,
        current: ScriptFile,
    },
    /// Present at `from` only; `script` holds the last-known content
    Deleted { script: ScriptFile },
}

impl ScriptChange {
    /// Kind of change
    pub fn kind(&self) -> ChangeKind {
        match self {
            ScriptChange::Added { .. } => ChangeKind::Added,
            ScriptChange::Modified { .. } => ChangeKind::Modified,
            ScriptChange::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    /// Path of the changed script
    pub fn path(&self) -> &ScriptPath {
        &self.script().path
    }

    /// The script as of `to`, or the last-known content for deletions.
    pub fn script(&self) -> &ScriptFile {
        match self {
            ScriptChange::Added { script } | ScriptChange::Deleted { script } => script,
            ScriptChange::Modified { current, .. } => current,
        }
    }

    /// The script as of `from`, if it existed there.
    pub fn previous(&self) -> Option<&ScriptFile> {
        match self {
            ScriptChange::Added { .. } => None,
            ScriptChange::Modified { previous, .. } => Some(previous),
            ScriptChange::Deleted { script } => Some(script),
        }
    }

    /// The same change seen from the other direction (`to` → `from`).
    pub fn inverse(self) -> Self {
        match self {
            ScriptChange::Added { script } => ScriptChange::Deleted { script },
            ScriptChange::Deleted { script } => ScriptChange::Added { script },
            ScriptChange::Modified { previous, current } => ScriptChange::Modified {
                previous: current,
                current: previous,
            },
        }
    }
}

/// SQL dependency parser capability.
///
/// Converts script text into zero or more object descriptors. Implementations
/// report failures as [`CoreError::ParseError`](crate::CoreError::ParseError)
/// naming the script path.
pub trait ScriptParser: Send + Sync {
    /// Parse a script into the objects it declares.
    fn parse(&self, script: &ScriptFile) -> CoreResult<Vec<ObjectDescriptor>>;
}
