//! Error types for sb-sql

use thiserror::Error;

/// SQL parsing errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Script could not be tokenized (S002)
    #[error("[S002] SQL tokenizer error at line {line}, column {column}: {message}")]
    TokenizeError {
        message: String,
        line: usize,
        column: usize,
    },

    /// A chunk between separators held more than one statement (S003)
    #[error("[S003] Expected one statement at line {line}, found {count}")]
    MultipleStatements { line: usize, count: usize },

    /// Invalid object name in a declaration (S004)
    #[error("[S004] Invalid object name at line {line}: {message}")]
    InvalidName { message: String, line: usize },
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
