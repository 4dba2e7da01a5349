//! Virtual content paths inside the editor project (`/Game/Props/Chair`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a string is not a valid content path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentPathError {
    /// The path is empty.
    #[error("content path is empty")]
    Empty,
    /// The path does not start with `/`.
    #[error("content path '{0}' must start with '/'")]
    NotAbsolute(String),
    /// The path contains a backslash.
    #[error("content path '{0}' must use forward slashes")]
    Backslash(String),
    /// The path has an empty segment or a trailing slash.
    #[error("content path '{0}' has an empty segment")]
    EmptySegment(String),
    /// A `.` or `..` segment.
    #[error("content path '{0}' must not contain '.' or '..' segments")]
    RelativeSegment(String),
    /// A segment appended with [`ContentPath::join`] contains a slash.
    #[error("path segment '{0}' must not contain '/'")]
    InvalidSegment(String),
}

/// A validated, absolute content path.
///
/// Always starts with `/`, uses forward slashes only and has no empty,
/// `.` or `..` segments (so no trailing slash and no way out of the root).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentPath(String);

impl ContentPath {
    /// Parse and validate a content path.
    pub fn parse(value: &str) -> Result<Self, ContentPathError> {
        if value.is_empty() {
            return Err(ContentPathError::Empty);
        }
        if value.contains('\\') {
            return Err(ContentPathError::Backslash(value.to_string()));
        }
        let Some(rest) = value.strip_prefix('/') else {
            return Err(ContentPathError::NotAbsolute(value.to_string()));
        };
        if rest.split('/').any(str::is_empty) {
            return Err(ContentPathError::EmptySegment(value.to_string()));
        }
        if rest.split('/').any(is_dot_segment) {
            return Err(ContentPathError::RelativeSegment(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Append a single segment.
    pub fn join(&self, segment: &str) -> Result<Self, ContentPathError> {
        if segment.is_empty() || is_dot_segment(segment) || segment.contains('/') || segment.contains('\\') {
            return Err(ContentPathError::InvalidSegment(segment.to_string()));
        }
        Ok(Self(format!("{}/{segment}", self.0)))
    }

    /// The containing path, or `None` for a single-segment root like `/Game`.
    pub fn parent(&self) -> Option<Self> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            return None;
        }
        Some(Self(self.0[..idx].to_string()))
    }

    /// The last segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Whether `self` is a direct child of `folder`.
    pub fn is_child_of(&self, folder: &ContentPath) -> bool {
        self.parent().as_ref() == Some(folder)
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentPath {
    type Err = ContentPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentPath {
    type Error = ContentPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ContentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}
