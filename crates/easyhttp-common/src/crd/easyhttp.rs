//! EasyHttp CRD types
//!
//! An `EasyHttp` declares a single-container HTTP application. The operator
//! derives a Deployment, a Service and an Ingress from it and records
//! per-kind convergence in the status sub-resource.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Replica count used when `spec.replicas` is absent
pub const DEFAULT_REPLICAS: i32 = 1;

/// Desired state of an HTTP application.
///
/// Example:
/// ```yaml
/// apiVersion: httpapi.github.com/v1
/// kind: EasyHttp
/// metadata:
///   name: shop
///   namespace: web
/// spec:
///   host: shop.example.com
///   image: ghcr.io/acme/shop
///   imageTag: "1.4.2"
///   port: 8080
///   replicas: 2
///   env:
///     LOG_LEVEL: info
///   certIssuer: letsencrypt-prod
///   path: /shop
/// ```
///
/// Equality is semantic: an absent replica count equals an explicit `1`.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "httpapi.github.com",
    version = "v1",
    kind = "EasyHttp",
    plural = "easyhttps",
    namespaced,
    status = "EasyHttpStatus",
    printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.host"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Deployed","type":"boolean","jsonPath":".status.deploymentReady"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EasyHttpSpec {
    /// Host the application is reachable on; base of the Ingress rule and certificate
    #[serde(default)]
    pub host: String,

    /// Replicas of the HTTP server (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Container image repository
    #[serde(default)]
    pub image: String,

    /// Image tag
    #[serde(default)]
    pub image_tag: String,

    /// Port the application listens on
    #[serde(default)]
    pub port: i32,

    /// Environment variables of the application container
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// cert-manager issuer (e.g. "letsencrypt-prod"); TLS is disabled when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_issuer: String,

    /// Path prefix the application is served under; root when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl EasyHttpSpec {
    /// Replica count with the default applied
    pub fn effective_replicas(&self) -> i32 {
        self.replicas.unwrap_or(DEFAULT_REPLICAS)
    }

    /// Full image reference (`image:tag`)
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.image_tag)
    }

    /// Whether cert-manager TLS is requested
    pub fn tls_enabled(&self) -> bool {
        !self.cert_issuer.is_empty()
    }

    /// Name of the TLS secret cert-manager populates for `host`
    pub fn tls_secret_name(&self) -> String {
        format!("{}-tls", self.host.replace('.', "-"))
    }

    /// Semantic equality used for change detection.
    ///
    /// Scalars compare by value, replicas compare after defaulting, and env
    /// compares as a map (order-independent, empty equals absent).
    pub fn is_equivalent(&self, other: &EasyHttpSpec) -> bool {
        self.host == other.host
            && self.image == other.image
            && self.image_tag == other.image_tag
            && self.port == other.port
            && self.cert_issuer == other.cert_issuer
            && self.path == other.path
            && self.effective_replicas() == other.effective_replicas()
            && self.env == other.env
    }
}

impl PartialEq for EasyHttpSpec {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent(other)
    }
}

impl Eq for EasyHttpSpec {}

/// Convergence bookkeeping for an EasyHttp.
///
/// The three flags record whether each managed kind has been written since
/// the last detected spec change. `last_synced_spec` is the spec those flags
/// refer to. Flags are cleared in the same status write that replaces the
/// snapshot, never after it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EasyHttpStatus {
    /// Deployment has been created/updated for the current spec
    #[serde(default)]
    pub deployment_ready: bool,

    /// Service has been created/updated for the current spec
    #[serde(default)]
    pub service_ready: bool,

    /// Ingress has been created/updated for the current spec
    #[serde(default)]
    pub ingress_ready: bool,

    /// Spec observed at the start of the last reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_spec: Option<EasyHttpSpec>,
}

impl EasyHttpStatus {
    /// Clear all readiness flags
    pub fn reset_readiness(&mut self) {
        self.deployment_ready = false;
        self.service_ready = false;
        self.ingress_ready = false;
    }

    /// All three managed kinds are converged
    pub fn is_converged(&self) -> bool {
        self.deployment_ready && self.service_ready && self.ingress_ready
    }
}

impl EasyHttp {
    /// Name of the managed Deployment (same as the EasyHttp)
    pub fn deployment_name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    /// Name of the managed Service
    pub fn service_name(&self) -> String {
        format!("{}-svc", self.metadata.name.as_deref().unwrap_or_default())
    }

    /// Name of the managed Ingress
    pub fn ingress_name(&self) -> String {
        format!("{}-ingress", self.metadata.name.as_deref().unwrap_or_default())
    }
}
