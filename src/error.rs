//! Error types for apiconform.

use thiserror::Error;

/// Failures while building a validator. These are the only errors
/// surfaced to a caller; everything after construction becomes a diagnostic.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch schema \"{url}\": {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Wrong openapi schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wrong openapi schema: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid path template \"{template}\": {source}")]
    Template {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("No document was supplied to the validator builder")]
    MissingDocument,
}

/// Failures while dereferencing a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Reference schema is missing: {0}")]
    MissingReference(String),

    #[error("Reference cycle detected at: {0}")]
    CyclicReference(String),

    #[error("Reference or type should be present")]
    InvalidSchema,
}

/// Failures while mapping a request onto an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Operation not defined for the path: {url}")]
    PathNotFound { url: String },

    #[error("Operation not defined for the method: {method} {url}")]
    MethodNotFound { method: String, url: String },
}
