//! Database object identities and the descriptors scripts declare.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};

/// Schema-qualified identity of a database object.
///
/// Both parts are stored lowercased so that `Sales.Orders` and
/// `sales.orders` name the same object. Ordering is by schema, then name,
/// which is the tie-break order the planner relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectName {
    /// Schema the object lives in
    pub schema: String,
    /// Unqualified object name
    pub name: String,
}

impl ObjectName {
    /// Create a new object name, normalising case and stripping identifier quotes.
    pub fn new(schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            schema: normalize_part(schema.as_ref()),
            name: normalize_part(name.as_ref()),
        }
    }

    /// Identity of a schema itself. Sorts before every object in the schema.
    pub fn schema(schema: impl AsRef<str>) -> Self {
        Self {
            schema: normalize_part(schema.as_ref()),
            name: String::new(),
        }
    }

    /// Whether this names a schema rather than an object inside one
    pub fn is_schema(&self) -> bool {
        self.name.is_empty()
    }

    /// Parse a possibly qualified name (`name`, `schema.name`, or
    /// `catalog.schema.name`), resolving unqualified names to `default_schema`.
    pub fn parse(qualified: &str, default_schema: &str) -> CoreResult<Self> {
        let parts = split_qualified(qualified);
        let invalid = || CoreError::InvalidObjectName {
            input: qualified.to_string(),
        };

        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        match parts.as_slice() {
            [name] => Ok(Self::new(default_schema, name)),
            [.., schema, name] => Ok(Self::new(schema, name)),
            [] => Err(invalid()),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_schema() {
            write!(f, "{}", self.schema)
        } else {
            write!(f, "{}.{}", self.schema, self.name)
        }
    }
}

/// Strip surrounding identifier quotes and lowercase.
fn normalize_part(part: &str) -> String {
    let trimmed = part.trim();
    let unquoted = match (trimmed.chars().next(), trimmed.chars().last()) {
        (Some('"'), Some('"')) | (Some('`'), Some('`')) if trimmed.len() >= 2 => {
            &trimmed[1..trimmed.len() - 1]
        }
        (Some('['), Some(']')) if trimmed.len() >= 2 => &trimmed[1..trimmed.len() - 1],
        _ => trimmed,
    };
    unquoted.to_lowercase()
}

/// Split on dots that are not inside quoted identifiers.
fn split_qualified(qualified: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in qualified.trim().chars() {
        match (quote, c) {
            (None, '"') | (None, '`') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                quote = Some(']');
                current.push(c);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, '.') => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Kind of database object a script declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
    Macro,
    Sequence,
    Index,
    Schema,
    Type,
    Trigger,
}

impl ObjectKind {
    /// Keyword used in `CREATE`/`DROP` statements for this kind.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Macro => "MACRO",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::Index => "INDEX",
            ObjectKind::Schema => "SCHEMA",
            ObjectKind::Type => "TYPE",
            ObjectKind::Trigger => "TRIGGER",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_keyword().to_lowercase())
    }
}

/// Action required to bring an object to its scripted definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildActionType {
    Create,
    Alter,
    Drop,
    Rename,
    #[serde(rename = "noop")]
    NoOp,
}

impl fmt::Display for BuildActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildActionType::Create => write!(f, "create"),
            BuildActionType::Alter => write!(f, "alter"),
            BuildActionType::Drop => write!(f, "drop"),
            BuildActionType::Rename => write!(f, "rename"),
            BuildActionType::NoOp => write!(f, "noop"),
        }
    }
}

/// An object declared by a script: its identity, the action the script
/// performs on it, what it depends on, and the SQL that builds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Object identity
    pub name: ObjectName,

    /// Object kind
    pub kind: ObjectKind,

    /// Action declared by the script
    pub action: BuildActionType,

    /// Objects that must exist before this one is built
    pub dependencies: BTreeSet<ObjectName>,

    /// Statement text that builds the object
    pub sql: String,
}

impl ObjectDescriptor {
    /// Create a descriptor with no dependencies.
    pub fn new(
        name: ObjectName,
        kind: ObjectKind,
        action: BuildActionType,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            name,
            kind,
            action,
            dependencies: BTreeSet::new(),
            sql: sql.into(),
        }
    }

    /// Add dependencies. A reference to the object itself is discarded.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = ObjectName>) -> Self {
        for dep in deps {
            if dep != self.name {
                self.dependencies.insert(dep);
            }
        }
        self
    }

    /// Checksum of the building statement, used to detect unchanged objects.
    pub fn checksum(&self) -> String {
        compute_checksum(self.sql.trim())
    }

    /// Whether the statement defines the object from scratch (`CREATE ...`),
    /// as opposed to altering it in place.
    pub fn is_definition(&self) -> bool {
        self.sql
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("create"))
    }
}

#[cfg(test)]
#[path = "object_test.rs"]
mod tests;
