//! Script parser: turns script text into object descriptors

use log::{debug, warn};
use sb_core::{
    BuildActionType, Config, CoreError, CoreResult, Dialect, ObjectDescriptor, ObjectKind,
    ObjectName, ScriptFile, ScriptParser,
};
use std::collections::HashMap;

use crate::dialect::{DuckDbDialect, GenericDialect, SqlDialect};
use crate::error::{SqlError, SqlResult};
use crate::extractor::extract_dependencies;
use crate::header::StatementHeader;
use crate::split::split_statements;

/// sqlparser-backed implementation of [`ScriptParser`].
///
/// Every `CREATE`, `ALTER`, or `DROP` statement declares an object. Other
/// statements (inserts, comments, grants) belong to the object declared
/// before them and run together with it. Repeated statements on the same
/// object within one script merge into a single descriptor.
pub struct SqlScriptParser {
    dialect: Box<dyn SqlDialect>,
    default_schema: String,
}

impl SqlScriptParser {
    /// Create a parser for a dialect, resolving unqualified names to
    /// `default_schema`
    pub fn new(dialect: Dialect, default_schema: impl Into<String>) -> Self {
        let dialect: Box<dyn SqlDialect> = match dialect {
            Dialect::DuckDb => Box::new(DuckDbDialect::new()),
            Dialect::Generic => Box::new(GenericDialect::new()),
        };
        Self {
            dialect,
            default_schema: default_schema.into().to_lowercase(),
        }
    }

    /// DuckDB parser with the `main` default schema
    pub fn duckdb() -> Self {
        Self::new(Dialect::DuckDb, "main")
    }

    /// Parser configured from the project config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dialect, config.default_schema.clone())
    }

    /// Parse script text into the objects it declares, in declaration order
    pub fn parse_sql(&self, sql: &str) -> SqlResult<Vec<ObjectDescriptor>> {
        let mut objects: Vec<ObjectDescriptor> = Vec::new();
        let mut by_name: HashMap<ObjectName, usize> = HashMap::new();
        let mut last: Option<usize> = None;

        for raw in split_statements(self.dialect.as_ref(), sql)? {
            let mut statements = self.dialect.parse(raw.text, raw.line)?;
            let statement = match statements.len() {
                0 => continue,
                1 => statements.remove(0),
                count => {
                    return Err(SqlError::MultipleStatements {
                        line: raw.line,
                        count,
                    })
                }
            };

            let references = extract_dependencies(&statement, &raw.tokens)
                .iter()
                .map(|parts| self.resolve(parts, raw.line))
                .collect::<SqlResult<Vec<_>>>()?;

            let Some(header) = StatementHeader::parse(&raw.tokens) else {
                match last {
                    Some(idx) => merge(&mut objects[idx], raw.text, references),
                    None => warn!(
                        "Statement at line {} precedes any object declaration and is ignored",
                        raw.line
                    ),
                }
                continue;
            };

            for declared in self.declarations(&header, references, raw.line)? {
                let idx = match by_name.get(&declared.name) {
                    Some(&idx) => {
                        debug!("Merging repeated statement on {}", declared.name);
                        merge(&mut objects[idx], raw.text, declared.dependencies);
                        idx
                    }
                    None => {
                        let descriptor = ObjectDescriptor::new(
                            declared.name.clone(),
                            header.kind,
                            header.action(),
                            raw.text,
                        )
                        .with_dependencies(declared.dependencies);
                        by_name.insert(declared.name, objects.len());
                        objects.push(descriptor);
                        objects.len() - 1
                    }
                };
                last = Some(idx);
            }
        }

        Ok(objects)
    }

    /// Objects a declaring statement names, with their dependencies
    fn declarations(
        &self,
        header: &StatementHeader,
        references: Vec<ObjectName>,
        line: usize,
    ) -> SqlResult<Vec<Declared>> {
        if header.action() == BuildActionType::Drop {
            return header
                .names
                .iter()
                .map(|parts| {
                    Ok(Declared {
                        name: self.object_name(header.kind, parts, None, line)?,
                        dependencies: Vec::new(),
                    })
                })
                .collect();
        }

        let Some(parts) = header.names.first() else {
            return Ok(Vec::new());
        };

        let on_table = header
            .on_table
            .as_deref()
            .map(|table| self.resolve(table, line))
            .transpose()?;
        let mut name = self.object_name(
            header.kind,
            parts,
            on_table.as_ref().map(|t| t.schema.as_str()),
            line,
        )?;
        let mut dependencies = references;
        dependencies.extend(on_table);

        if let Some(target) = &header.renamed_to {
            let renamed =
                self.object_name(header.kind, target, Some(name.schema.as_str()), line)?;
            dependencies.retain(|dep| dep != &renamed);
            dependencies.push(std::mem::replace(&mut name, renamed));
        }

        if !name.is_schema() && name.schema != self.default_schema {
            dependencies.push(ObjectName::schema(&name.schema));
        }

        Ok(vec![Declared { name, dependencies }])
    }

    /// Identity of a declared object. Unqualified names live in
    /// `schema_hint` when given, otherwise in the default schema.
    fn object_name(
        &self,
        kind: ObjectKind,
        parts: &[String],
        schema_hint: Option<&str>,
        line: usize,
    ) -> SqlResult<ObjectName> {
        if kind == ObjectKind::Schema {
            return match parts.last() {
                Some(schema) if !schema.is_empty() => Ok(ObjectName::schema(schema)),
                _ => Err(invalid_name(parts, line)),
            };
        }
        match (parts, schema_hint) {
            ([name], Some(schema)) if !name.is_empty() => Ok(ObjectName::new(schema, name)),
            _ => self.resolve(parts, line),
        }
    }

    /// Resolve a referenced name against the default schema
    fn resolve(&self, parts: &[String], line: usize) -> SqlResult<ObjectName> {
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid_name(parts, line));
        }
        match parts {
            [name] => Ok(ObjectName::new(&self.default_schema, name)),
            [.., schema, name] => Ok(ObjectName::new(schema, name)),
            [] => Err(invalid_name(parts, line)),
        }
    }
}

impl Default for SqlScriptParser {
    fn default() -> Self {
        Self::duckdb()
    }
}

impl ScriptParser for SqlScriptParser {
    fn parse(&self, script: &ScriptFile) -> CoreResult<Vec<ObjectDescriptor>> {
        let objects = self
            .parse_sql(&script.content)
            .map_err(|e| CoreError::ParseError {
                path: script.path.to_string(),
                message: e.to_string(),
            })?;
        debug!(
            "{} declares {} object(s) ({} dialect)",
            script.path,
            objects.len(),
            self.dialect.name()
        );
        Ok(objects)
    }
}

struct Declared {
    name: ObjectName,
    dependencies: Vec<ObjectName>,
}

/// Append a statement to an object's SQL
fn merge(object: &mut ObjectDescriptor, text: &str, dependencies: Vec<ObjectName>) {
    object.sql = format!("{};\n{}", object.sql, text);
    let name = object.name.clone();
    object
        .dependencies
        .extend(dependencies.into_iter().filter(|dep| dep != &name));
}

fn invalid_name(parts: &[String], line: usize) -> SqlError {
    SqlError::InvalidName {
        message: format!("'{}'", parts.join(".")),
        line,
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
