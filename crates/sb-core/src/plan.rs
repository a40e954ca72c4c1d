//! Build items and the ordered plan the executor applies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::object::{BuildActionType, ObjectDescriptor, ObjectName};
use crate::revision::RevisionId;
use crate::script::ScriptFile;

/// Why an item is part of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildReason {
    /// Declared by a newly added script
    Added,
    /// Declaration changed in a modified script
    Modified,
    /// Declaration no longer exists
    Deleted,
    /// Script unchanged, but something it depends on is being rebuilt
    DependencyChanged,
}

impl fmt::Display for BuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildReason::Added => write!(f, "added"),
            BuildReason::Modified => write!(f, "modified"),
            BuildReason::Deleted => write!(f, "deleted"),
            BuildReason::DependencyChanged => write!(f, "dependency changed"),
        }
    }
}

/// One unit of planning and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildItem {
    /// The object being built
    pub object: ObjectDescriptor,

    /// Script that declares (or last declared) the object
    pub script: ScriptFile,

    /// Action the executor performs
    pub action: BuildActionType,

    /// Why the item was planned
    pub reason: BuildReason,
}

impl BuildItem {
    /// Identity of the object this item builds
    pub fn name(&self) -> &ObjectName {
        &self.object.name
    }

    /// Whether the existing object is removed and created again from its
    /// `CREATE` statement
    pub fn is_redefinition(&self) -> bool {
        self.action == BuildActionType::Alter && self.object.is_definition()
    }

    /// Whether the item takes something out of the database before the
    /// creation pass runs
    pub fn is_removal(&self) -> bool {
        self.action == BuildActionType::Drop || self.is_redefinition()
    }
}

impl fmt::Display for BuildItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.action, self.object.kind, self.object.name, self.script.path
        )
    }
}

/// An ordered, dependency-consistent sequence of build items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Revision the plan builds towards
    pub target: RevisionId,

    /// Revision the target database was last built from
    pub baseline: Option<RevisionId>,

    /// Items in execution order
    pub items: Vec<BuildItem>,

    /// Drops and redefinitions in the order they come out of the database,
    /// dependents before what they depend on. Runs before `items`.
    #[serde(default)]
    pub teardown: Vec<ObjectName>,
}

impl BuildPlan {
    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing needs to be built
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Object names in execution order
    pub fn order(&self) -> Vec<&ObjectName> {
        self.items.iter().map(BuildItem::name).collect()
    }

    /// Position of an object in the plan
    pub fn position(&self, name: &ObjectName) -> Option<usize> {
        self.items.iter().position(|item| item.name() == name)
    }

    /// Removal items with their plan index, in teardown order
    pub fn teardown_items(&self) -> impl Iterator<Item = (usize, &BuildItem)> + '_ {
        self.teardown
            .iter()
            .filter_map(|name| self.position(name))
            .map(|index| (index, &self.items[index]))
    }
}
