//! Paths inside the durable tree.
//!
//! A [`TreePath`] is a sequence of plain name segments relative to the tree
//! root. It can never escape the root: empty, `.` and `..` segments are
//! rejected when parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// A root-relative path in the durable tree, e.g. `project7/3/index.html`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// The tree root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Append one segment.
    pub fn join(&self, segment: impl Into<String>) -> Result<Self, TypeError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    /// The containing path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// The last segment, or `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every proper ancestor, shortest first, excluding the root.
    pub fn ancestors(&self) -> impl Iterator<Item = TreePath> + '_ {
        (1..self.segments.len()).map(|n| Self {
            segments: self.segments[..n].to_vec(),
        })
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for TreePath {
    type Err = TypeError;

    /// Parse a slash-separated path. A single leading or trailing slash is
    /// tolerated; anything else that would not round-trip is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches('/').trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let segments = trimmed
            .split('/')
            .map(|segment| {
                validate_segment(segment).map_err(|_| TypeError::InvalidPath(s.to_string()))?;
                Ok(segment.to_string())
            })
            .collect::<Result<Vec<_>, TypeError>>()?;
        Ok(Self { segments })
    }
}

fn validate_segment(segment: &str) -> Result<(), TypeError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(TypeError::InvalidPath(segment.to_string()));
    }
    Ok(())
}
