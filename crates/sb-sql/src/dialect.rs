//! SQL dialect abstraction

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect, DuckDbDialect as SqlParserDuckDb, GenericDialect as SqlParserGeneric,
};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{TokenWithSpan, Tokenizer};

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Tokenize SQL, keeping source locations
    fn tokenize(&self, sql: &str) -> SqlResult<Vec<TokenWithSpan>> {
        Tokenizer::new(self.parser_dialect(), sql)
            .tokenize_with_location()
            .map_err(|e| SqlError::TokenizeError {
                message: e.message.clone(),
                line: e.location.line as usize,
                column: e.location.column as usize,
            })
    }

    /// Parse SQL into AST statements.
    ///
    /// `first_line` is the line of the script `sql` starts on, so reported
    /// locations point into the whole script rather than the fragment.
    fn parse(&self, sql: &str, first_line: usize) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line: if line == 0 { first_line } else { line + first_line - 1 },
                column,
            }
        })
    }
}

/// Read "Line: N, Column: M" back out of a sqlparser error message.
///
/// `ParserError` carries no structured location. Missing parts read as 0.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    fn number_after(msg: &str, label: &str) -> usize {
        msg.rfind(label)
            .map(|idx| &msg[idx + label.len()..])
            .map(|rest| {
                rest.trim_start()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
            })
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0)
    }

    match number_after(msg, "Line:") {
        0 => (0, 0),
        line => (line, number_after(msg, "Column:")),
    }
}

/// DuckDB SQL dialect
#[derive(Debug, Default)]
pub struct DuckDbDialect {
    dialect: SqlParserDuckDb,
}

impl DuckDbDialect {
    /// Create a new DuckDB dialect
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlDialect for DuckDbDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }
}

/// Vendor-neutral SQL dialect
#[derive(Debug, Default)]
pub struct GenericDialect {
    dialect: SqlParserGeneric,
}

impl GenericDialect {
    /// Create a new generic dialect
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlDialect for GenericDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "generic"
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
