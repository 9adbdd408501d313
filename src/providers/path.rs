//! Response field paths like `candidates[0].content.parts[0].text`.
//!
//! A path is a sequence of `.`-separated segments; each segment is a bare
//! object key optionally followed by one or more `[<index>]` array accesses
//! applied left to right. Paths are parsed once when a provider descriptor is
//! built and resolved against every response body, so malformed paths fail at
//! catalog construction instead of mid-send.

use serde_json::Value;
use thiserror::Error;

/// One step of a parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member access by key.
    Key(String),
    /// Array element access by index.
    Index(usize),
}

/// Errors from parsing a field path string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("field path is empty")]
    Empty,
    #[error("empty segment in field path `{0}`")]
    EmptySegment(String),
    #[error("malformed index in field path segment `{0}`")]
    BadIndex(String),
}

/// Errors from resolving a parsed path against a JSON body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no value at `{0}`")]
    Missing(String),
    #[error("null value at `{0}`")]
    Null(String),
    #[error("index {index} out of bounds at `{at}`")]
    OutOfBounds { at: String, index: usize },
}

/// A dotted/bracket field path, parsed once and resolved many times.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a path string like `choices[0].message.content`.
    pub fn parse(raw: &str) -> Result<Self, PathParseError> {
        if raw.trim().is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(PathParseError::EmptySegment(raw.to_string()));
            }

            let key_end = part.find('[').unwrap_or(part.len());
            let key = &part[..key_end];
            if key.is_empty() {
                return Err(PathParseError::EmptySegment(raw.to_string()));
            }
            segments.push(PathSegment::Key(key.to_string()));

            let mut rest = &part[key_end..];
            while !rest.is_empty() {
                let Some(inner) = rest.strip_prefix('[') else {
                    return Err(PathParseError::BadIndex(part.to_string()));
                };
                let Some(close) = inner.find(']') else {
                    return Err(PathParseError::BadIndex(part.to_string()));
                };
                let index: usize = inner[..close]
                    .parse()
                    .map_err(|_| PathParseError::BadIndex(part.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The original path string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk the path through `root`.
    ///
    /// Fails when an intermediate value is missing or null, or an index is
    /// out of bounds. A null *final* value resolves successfully; callers
    /// decide what an empty result means.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<&'a Value, ResolveError> {
        let mut current = root;
        let mut crumb = String::new();

        for segment in &self.segments {
            if current.is_null() {
                return Err(ResolveError::Null(breadcrumb_or_root(&crumb)));
            }

            match segment {
                PathSegment::Key(key) => {
                    let next_crumb = if crumb.is_empty() {
                        key.clone()
                    } else {
                        format!("{crumb}.{key}")
                    };
                    match current.get(key.as_str()) {
                        Some(value) => {
                            current = value;
                            crumb = next_crumb;
                        }
                        None => return Err(ResolveError::Missing(next_crumb)),
                    }
                }
                PathSegment::Index(index) => match current.get(*index) {
                    Some(value) => {
                        current = value;
                        crumb = format!("{crumb}[{index}]");
                    }
                    None => {
                        if current.is_array() {
                            return Err(ResolveError::OutOfBounds {
                                at: breadcrumb_or_root(&crumb),
                                index: *index,
                            });
                        }
                        return Err(ResolveError::Missing(format!("{crumb}[{index}]")));
                    }
                },
            }
        }

        Ok(current)
    }
}

fn breadcrumb_or_root(crumb: &str) -> String {
    if crumb.is_empty() {
        "(root)".to_string()
    } else {
        crumb.to_string()
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}
