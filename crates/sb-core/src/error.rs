//! Error types for sb-core

use thiserror::Error;

use crate::object::ObjectName;

/// Core error type for Schemabuild
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Unknown database name
    #[error("[E004] Database not configured: {name}")]
    DatabaseNotFound { name: String },

    /// E005: Invalid revision text
    #[error("[E005] Invalid revision '{input}': {reason}")]
    InvalidRevision { input: String, reason: String },

    /// E006: Script could not be parsed into object descriptors
    #[error("[E006] SQL parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    /// E007: Circular dependency among objects that need rebuilding
    #[error("[E007] Circular dependency detected: {cycle}")]
    CyclicDependency {
        members: Vec<ObjectName>,
        cycle: String,
    },

    /// E008: Two scripts declare the same object
    #[error("[E008] Object {name} is declared by both {path1} and {path2}")]
    DuplicateObject {
        name: ObjectName,
        path1: String,
        path2: String,
    },

    /// E009: Invalid object name
    #[error("[E009] Invalid object name '{input}'")]
    InvalidObjectName { input: String },

    /// E010: IO error
    #[error("[E010] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E011: IO error with file path context
    #[error("[E011] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E012: YAML parse error
    #[error("[E012] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// E013: State file (de)serialization error
    #[error("[E013] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
