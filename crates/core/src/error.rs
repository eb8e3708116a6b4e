//! Error types for weft.

use thiserror::Error;

/// Result type alias for weft operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for weft operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A property path could not be parsed.
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },
    /// A path segment does not exist in the data context.
    #[error("Path not found: {path}")]
    PathNotFound { path: String },
    /// A write targeted a key that was never instrumented.
    #[error("Key '{key}' is not declared on '{parent}'; introduce it with set_dynamic")]
    UndeclaredKey { parent: String, key: String },
    /// A path walked through a scalar where an object or array was needed.
    #[error("Value at '{path}' is not an object or array")]
    NotAContainer { path: String },
    /// Expression text failed to parse.
    #[error("Expression error at {position}: {message}")]
    Expression { message: String, position: usize },
    /// A `for` directive did not match `(item[, index]) in collection`.
    #[error("Invalid for expression: '{expression}'")]
    InvalidForExpression { expression: String },
    /// A directive was malformed in a way that prevents binding it.
    #[error("Invalid directive {name}=\"{value}\": {message}")]
    InvalidDirective {
        name: String,
        value: String,
        message: String,
    },
    /// Markup given to the in-memory render tree could not be parsed.
    #[error("Invalid markup at {position}: {message}")]
    InvalidMarkup { message: String, position: usize },
    /// The render root could not be located.
    #[error("Render root not found: {selector}")]
    RootNotFound { selector: String },
    /// A scheduled task failed.
    #[error("Task failed: {message}")]
    TaskFailed { message: String },
    /// Data could not be decoded.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl Error {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a path not found error.
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Error::PathNotFound { path: path.into() }
    }

    /// Creates an undeclared key error.
    pub fn undeclared_key(parent: impl Into<String>, key: impl Into<String>) -> Self {
        Error::UndeclaredKey {
            parent: parent.into(),
            key: key.into(),
        }
    }

    /// Creates a not-a-container error.
    pub fn not_a_container(path: impl Into<String>) -> Self {
        Error::NotAContainer { path: path.into() }
    }

    /// Creates an invalid for expression error.
    pub fn invalid_for(expression: impl Into<String>) -> Self {
        Error::InvalidForExpression {
            expression: expression.into(),
        }
    }

    /// Creates an invalid directive error.
    pub fn invalid_directive(
        name: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidDirective {
            name: name.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid markup error.
    pub fn invalid_markup(message: impl Into<String>, position: usize) -> Self {
        Error::InvalidMarkup {
            message: message.into(),
            position,
        }
    }

    /// Creates a task failure error.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Error::TaskFailed {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::path_not_found("user.name");
        assert!(err.to_string().contains("user.name"));

        let err = Error::undeclared_key("user", "age");
        assert!(err.to_string().contains("set_dynamic"));

        let err = Error::invalid_for("item of items");
        assert!(err.to_string().contains("item of items"));
    }

    #[test]
    fn test_error_from_json() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        match err {
            Error::InvalidData { .. } => {}
            other => panic!("Wrong error type: {other:?}"),
        }
    }
}
