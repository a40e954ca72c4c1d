//! Splitting a script into its statements while keeping the original text.

use sqlparser::tokenizer::{Location, Token, TokenWithSpan};

use crate::dialect::SqlDialect;
use crate::error::SqlResult;

/// One statement of a script, as written.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatement<'a> {
    /// Original text, from the first significant token up to (not including)
    /// the terminating semicolon
    pub text: &'a str,

    /// 1-based line the statement starts on
    pub line: usize,

    /// Tokens of the statement without whitespace and comments
    pub tokens: Vec<Token>,
}

/// Split `sql` on top-level semicolons.
///
/// Semicolons inside string literals, quoted identifiers, comments, and
/// dollar-quoted bodies are part of a single token and never split a
/// statement. Chunks holding only whitespace and comments are dropped.
pub fn split_statements<'a>(
    dialect: &dyn SqlDialect,
    sql: &'a str,
) -> SqlResult<Vec<RawStatement<'a>>> {
    let tokens = dialect.tokenize(sql)?;
    let offsets = LineOffsets::new(sql);

    let mut statements = Vec::new();
    let mut current: Vec<&TokenWithSpan> = Vec::new();

    for token in &tokens {
        match &token.token {
            Token::SemiColon => {
                if let Some(stmt) = finish(sql, &offsets, &current, Some(token.span.start)) {
                    statements.push(stmt);
                }
                current.clear();
            }
            Token::Whitespace(_) | Token::EOF => {}
            _ => current.push(token),
        }
    }
    if let Some(stmt) = finish(sql, &offsets, &current, None) {
        statements.push(stmt);
    }

    Ok(statements)
}

fn finish<'a>(
    sql: &'a str,
    offsets: &LineOffsets,
    tokens: &[&TokenWithSpan],
    end: Option<Location>,
) -> Option<RawStatement<'a>> {
    let first = tokens.first()?;
    let start = offsets.byte_offset(sql, first.span.start);
    let end = end.map_or(sql.len(), |loc| offsets.byte_offset(sql, loc));
    let text = sql.get(start..end)?.trim_end();

    Some(RawStatement {
        text,
        line: first.span.start.line as usize,
        tokens: tokens.iter().map(|t| t.token.clone()).collect(),
    })
}

/// Maps tokenizer locations (1-based line, 1-based character column) back to
/// byte offsets.
struct LineOffsets {
    starts: Vec<usize>,
}

impl LineOffsets {
    fn new(sql: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn byte_offset(&self, sql: &str, loc: Location) -> usize {
        let Some(&line_start) = (loc.line as usize)
            .checked_sub(1)
            .and_then(|idx| self.starts.get(idx))
        else {
            return sql.len();
        };
        let column = (loc.column as usize).saturating_sub(1);
        sql[line_start..]
            .char_indices()
            .nth(column)
            .map_or(sql.len(), |(i, _)| line_start + i)
    }
}

#[cfg(test)]
#[path = "split_test.rs"]
mod tests;
