//! Common types for the EasyHttp operator: CRDs, errors, events and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod telemetry;

pub use error::Error;
pub use events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager / controller name used for writes and event reporting
pub const FIELD_MANAGER: &str = "easyhttp-operator";

/// Label key selecting the pods of an EasyHttp application
pub const APP_LABEL_KEY: &str = "app";

/// Standard label marking objects written by this operator
pub const MANAGED_BY_LABEL_KEY: &str = "app.kubernetes.io/managed-by";
