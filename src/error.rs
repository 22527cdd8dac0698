// 🚨 Error Model
// Two families: problems with the backing file (StoreError) and problems
// with what the user typed (CommandError).

use std::path::PathBuf;

// ============================================================================
// STORE ERRORS
// ============================================================================

/// Failures while reading or writing the backing JSON file.
///
/// Only `Syntax` is recovered (the registry starts empty). Everything else
/// surfaces to the process boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document is not valid JSON at all
    #[error("invalid JSON document: {0}")]
    Syntax(#[source] serde_json::Error),

    /// Valid JSON, but an entry does not look like a stored entity
    #[error("cannot decode entry '{key}': {reason}")]
    Decode { key: String, reason: String },

    /// Kind tag that is not one of the seven known kinds
    #[error("unknown kind '{kind}' for entry '{key}'")]
    UnknownKind { key: String, kind: String },

    /// Timestamp not in the stored format
    #[error("malformed timestamp '{value}' for attribute '{field}'")]
    Timestamp { field: String, value: String },

    /// Read/write failure on the backing file
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// COMMAND ERRORS
// ============================================================================

/// User input problems. The `Display` text is exactly what the shell prints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("** class name missing **")]
    ClassNameMissing,

    #[error("** class doesn't exist **")]
    ClassDoesntExist,

    #[error("** instance id missing **")]
    InstanceIdMissing,

    #[error("** no instance found **")]
    NoInstanceFound,

    #[error("** attribute name missing **")]
    AttributeNameMissing,

    #[error("** value missing **")]
    ValueMissing,

    #[error("** invalid value for {field} **")]
    InvalidValue { field: String },

    #[error("** malformed dictionary **")]
    MalformedDictionary,

    #[error("** attribute can't be updated **")]
    ReservedAttribute,

    #[error("*** Unknown syntax: {0}")]
    UnknownSyntax(String),
}

// ============================================================================
// CONSOLE ERRORS
// ============================================================================

/// Everything a command handler can fail with.
///
/// `Command` and `Syntax` are printed and the shell continues; the rest end
/// the session.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Syntax(#[from] crate::grammar::UnbalancedQuotes),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot write to output: {0}")]
    Output(#[from] std::io::Error),
}
