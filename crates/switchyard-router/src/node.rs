//! Segment trie node implementation.
//!
//! Each node holds one `/`-delimited path segment. A node at which a route
//! ends carries that route's full pattern.

use smallvec::SmallVec;

use crate::error::RouteError;

/// Type of path segment in the trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal path segment (e.g., "users", "api")
    Static,
    /// Named parameter (e.g., ":id"), matches exactly one segment
    Param(String),
    /// Trailing wildcard (e.g., "*filepath"), matches the remainder
    Wildcard(String),
}

/// Path segments split on `/` with empty segments dropped.
pub(crate) type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Splits a concrete path or a pattern into its non-empty segments.
pub(crate) fn split_path(path: &str) -> Segments<'_> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// A node in the routing trie.
#[derive(Debug, Clone)]
pub struct Node {
    /// The pattern segment this node represents (e.g. "users", ":id", "*path")
    pub part: String,

    /// The kind of segment
    pub kind: SegmentKind,

    /// Full route pattern, set only if a route terminates here
    pub pattern: Option<String>,

    /// Children in registration order
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a node for the given segment.
    #[must_use]
    pub fn new(part: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            part: part.into(),
            kind,
            pattern: None,
            children: Vec::new(),
        }
    }

    /// Creates a root node for a method tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new("", SegmentKind::Static)
    }

    /// Returns true for parameter and wildcard segments.
    #[must_use]
    pub fn is_wild(&self) -> bool {
        !matches!(self.kind, SegmentKind::Static)
    }

    fn is_catch_all(&self) -> bool {
        matches!(self.kind, SegmentKind::Wildcard(_))
    }

    /// Parses a route pattern into typed segments.
    ///
    /// Rejects patterns without a leading `/`, empty parameter names,
    /// wildcards that are not the final segment and repeated names.
    pub fn parse_pattern(pattern: &str) -> Result<Vec<(String, SegmentKind)>, RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern must start with '/'",
            });
        }

        let parts = split_path(pattern);
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: SmallVec<[&str; 4]> = SmallVec::new();

        for (i, part) in parts.iter().enumerate() {
            let kind = if let Some(name) = part.strip_prefix(':') {
                SegmentKind::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if i + 1 != parts.len() {
                    return Err(RouteError::WildcardNotLast {
                        pattern: pattern.to_string(),
                    });
                }
                SegmentKind::Wildcard(name.to_string())
            } else {
                SegmentKind::Static
            };

            if let SegmentKind::Param(name) | SegmentKind::Wildcard(name) = &kind {
                if name.is_empty() {
                    return Err(RouteError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: "parameter name must not be empty",
                    });
                }
                if names.contains(&name.as_str()) {
                    return Err(RouteError::DuplicateParam {
                        pattern: pattern.to_string(),
                        name: name.clone(),
                    });
                }
                names.push(&part[1..]);
            }

            segments.push(((*part).to_string(), kind));
        }

        Ok(segments)
    }

    /// Inserts a route pattern into the subtree rooted here.
    ///
    /// Children are matched by exact segment text, so `:id` and `:name`
    /// at the same depth become sibling nodes.
    pub fn insert(&mut self, pattern: &str) -> Result<(), RouteError> {
        let segments = Self::parse_pattern(pattern)?;
        self.insert_segments(pattern, &segments)
    }

    fn insert_segments(
        &mut self,
        pattern: &str,
        segments: &[(String, SegmentKind)],
    ) -> Result<(), RouteError> {
        let Some(((part, kind), remaining)) = segments.split_first() else {
            self.pattern = Some(pattern.to_string());
            return Ok(());
        };

        if matches!(kind, SegmentKind::Wildcard(_)) {
            if let Some(existing) = self
                .children
                .iter()
                .find(|c| c.is_catch_all() && c.part != *part)
            {
                return Err(RouteError::WildcardConflict {
                    pattern: pattern.to_string(),
                    existing: existing.pattern.clone().unwrap_or_default(),
                });
            }
        }

        let index = match self.children.iter().position(|c| c.part == *part) {
            Some(index) => index,
            None => {
                self.children.push(Node::new(part.clone(), kind.clone()));
                self.children.len() - 1
            }
        };

        self.children[index].insert_segments(pattern, remaining)
    }

    /// Finds the terminal node for a concrete path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<&Node> {
        self.search(&split_path(path))
    }

    /// Searches the subtree depth-first for a terminal node.
    ///
    /// At every depth children are tried literal first, then named
    /// parameters, then wildcards; registration order breaks ties within a
    /// class. When the path runs out on a non-terminal node, a wildcard
    /// child still matches with an empty capture.
    #[must_use]
    pub fn search(&self, segments: &[&str]) -> Option<&Node> {
        let Some((segment, remaining)) = segments.split_first() else {
            if self.pattern.is_some() {
                return Some(self);
            }
            return self
                .children
                .iter()
                .find(|c| c.is_catch_all() && c.pattern.is_some());
        };

        for child in self.candidates(segment) {
            if child.is_catch_all() {
                if child.pattern.is_some() {
                    return Some(child);
                }
                continue;
            }
            if let Some(found) = child.search(remaining) {
                return Some(found);
            }
        }

        None
    }

    /// Children that may match `segment`, in precedence order.
    fn candidates(&self, segment: &str) -> SmallVec<[&Node; 4]> {
        let literals = self
            .children
            .iter()
            .filter(|c| c.kind == SegmentKind::Static && c.part == segment);
        let params = self
            .children
            .iter()
            .filter(|c| matches!(c.kind, SegmentKind::Param(_)));
        let wildcards = self.children.iter().filter(|c| c.is_catch_all());

        literals.chain(params).chain(wildcards).collect()
    }
}
