//! Route registration errors.

use thiserror::Error;

/// Errors raised while registering a route pattern.
///
/// Matching never fails with an error; a miss is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern is malformed (missing leading `/`, empty parameter name).
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A wildcard segment was followed by further segments.
    #[error("wildcard must be the last segment in '{pattern}'")]
    WildcardNotLast {
        /// The offending pattern.
        pattern: String,
    },

    /// The same parameter name appears twice in one pattern.
    #[error("duplicate parameter '{name}' in '{pattern}'")]
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated name.
        name: String,
    },

    /// The method and pattern pair was already registered.
    #[error("route already registered: {method} {pattern}")]
    Duplicate {
        /// HTTP method of the route.
        method: String,
        /// The pattern that was registered twice.
        pattern: String,
    },

    /// Two differently named wildcards were registered at the same position.
    #[error("wildcard in '{pattern}' conflicts with existing route '{existing}'")]
    WildcardConflict {
        /// The pattern being registered.
        pattern: String,
        /// The pattern already owning the wildcard position.
        existing: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouteError::Duplicate {
            method: "GET".to_string(),
            pattern: "/users".to_string(),
        };
        assert_eq!(err.to_string(), "route already registered: GET /users");

        let err = RouteError::WildcardNotLast {
            pattern: "/files/*path/meta".to_string(),
        };
        assert!(err.to_string().contains("last segment"));
    }
}
