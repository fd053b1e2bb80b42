//! Error types for graft-tree

use std::fmt;

use crate::cursor::Cursor;

/// Result type for graft-tree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in graft-tree operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A cursor could not be followed through the tree
    #[error("`$.{path}` could not be found in the YAML datastructure")]
    NotFound { path: Cursor },

    /// Path text that cannot be turned into a cursor
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// One or more locations failed to merge
    #[error(transparent)]
    Merge(MultiError),
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A failure tied to one location in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub path: Cursor,
    pub message: String,
}

impl PathError {
    pub fn new(path: Cursor, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$.{}: {}", self.path, self.message)
    }
}

/// A set of path-tagged failures reported together.
///
/// Entries are kept sorted by their rendered path so reports are stable
/// across runs.
///
/// ```
/// use graft_tree::{Cursor, MultiError, PathError};
///
/// let mut errors = MultiError::default();
/// errors.push(PathError::new(Cursor::parse("b").unwrap(), "second"));
/// errors.push(PathError::new(Cursor::parse("a").unwrap(), "first"));
/// assert_eq!(
///     errors.to_string(),
///     "2 error(s) detected:\n - $.a: first\n - $.b: second\n"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiError {
    errors: Vec<PathError>,
}

impl MultiError {
    pub fn push(&mut self, error: PathError) {
        let key = error.to_string();
        let at = self
            .errors
            .partition_point(|existing| existing.to_string() <= key);
        self.errors.insert(at, error);
    }

    pub fn extend(&mut self, other: MultiError) {
        for error in other.errors {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), MultiError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} error(s) detected:", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, " - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

impl From<PathError> for MultiError {
    fn from(error: PathError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoIterator for MultiError {
    type Item = PathError;
    type IntoIter = std::vec::IntoIter<PathError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_error_format() {
        let errors = MultiError::from(PathError::new(
            Cursor::parse("secret").unwrap(),
            "vault operator requires exactly one argument",
        ));
        assert_eq!(
            errors.to_string(),
            "1 error(s) detected:\n - $.secret: vault operator requires exactly one argument\n"
        );
    }

    #[test]
    fn test_sorted_by_path() {
        let mut errors = MultiError::default();
        for path in ["zeta", "alpha.b", "alpha.a", "mid"] {
            errors.push(PathError::new(Cursor::parse(path).unwrap(), "x"));
        }
        let paths: Vec<_> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["alpha.a", "alpha.b", "mid", "zeta"]);
    }

    #[test]
    fn test_into_result() {
        assert!(MultiError::default().into_result().is_ok());
        let errors = MultiError::from(PathError::new(Cursor::root(), "boom"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound {
            path: Cursor::parse("meta.key").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "`$.meta.key` could not be found in the YAML datastructure"
        );
    }
}
