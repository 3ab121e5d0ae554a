//! Path handles for addressing records in the store.
//!
//! A `StorePath` is an absolute, `/`-separated address. Handles are cheap to
//! clone and compare; `child` produces a handle rooted one level deeper.

use std::fmt;

/// An absolute path addressing one record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root path (`/`).
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Parse a `/`-separated path. Empty segments are dropped, so
    /// `"/data//a/"` and `"data/a"` address the same record.
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// A handle addressing `name` one level below this path.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// The final segment, if any.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
