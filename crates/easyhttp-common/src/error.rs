//! Error types for the EasyHttp operator
//!
//! Errors carry the identity of the object being acted on so that a failure
//! in the logs can be attributed without correlating spans.

use thiserror::Error;

/// Main error type for EasyHttp operations
#[derive(Debug, Error)]
pub enum Error {
    /// A store call (get/create/replace/status) failed for a specific object
    #[error("kubernetes error on {kind} {namespace}/{name}: {source}")]
    Store {
        /// Kind of the object acted on (e.g. "Deployment")
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// Owner reference could not be attached to a managed object
    #[error("ownership error for {kind} {name}: {message}")]
    Ownership {
        /// Kind of the managed object
        kind: String,
        /// Name of the managed object
        name: String,
        /// Description of what's wrong
        message: String,
    },

    /// The EasyHttp resource itself is unusable as handed in
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// Name of the offending resource
        resource: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Wrap a failed store call with the identity of the object it targeted
    pub fn store(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        source: kube::Error,
    ) -> Self {
        Self::Store {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            source,
        }
    }

    /// Create an ownership error for a managed object
    pub fn ownership(
        kind: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Ownership {
            kind: kind.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error naming the offending resource
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Check if this error is retryable
    ///
    /// Store errors are retryable (the next pass re-reads the cluster).
    /// Ownership, validation and serialization errors need an external fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store { .. } => true,
            Error::Ownership { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
        }
    }

    /// Whether the underlying store error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Store { source, .. } => {
                matches!(source, kube::Error::Api(ae) if ae.code == 409)
            }
            _ => false,
        }
    }

    /// Get the `(kind, namespace/name)` of the object this error is about, if any
    pub fn object(&self) -> Option<(&str, String)> {
        match self {
            Error::Store {
                kind,
                namespace,
                name,
                ..
            } => Some((kind, format!("{}/{}", namespace, name))),
            Error::Ownership { kind, name, .. } => Some((kind, name.clone())),
            _ => None,
        }
    }
}
