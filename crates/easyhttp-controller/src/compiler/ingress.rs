//! Ingress generation
//!
//! One rule for `spec.host` routing to the application Service. A non-empty
//! `spec.path` becomes an nginx regex path whose second capture group is
//! forwarded as the upstream path. A non-empty `spec.certIssuer` adds a TLS
//! block and the cert-manager annotations that request the certificate.

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};

use super::managed_metadata;
use crate::crd::EasyHttp;

/// cert-manager issuer used for the TLS certificate
pub const CERT_ISSUER_ANNOTATION: &str = "cert-manager.io/issuer";

/// Solve HTTP-01 challenges on this Ingress instead of a temporary one
pub const ACME_EDIT_IN_PLACE_ANNOTATION: &str = "acme.cert-manager.io/http01-edit-in-place";

/// nginx rewrite of the matched path to the second capture group
pub const REWRITE_TARGET_ANNOTATION: &str = "nginx.ingress.kubernetes.io/rewrite-target";

/// Annotations derived from the spec; every other annotation belongs to someone else
pub const MANAGED_ANNOTATIONS: [&str; 3] = [
    CERT_ISSUER_ANNOTATION,
    ACME_EDIT_IN_PLACE_ANNOTATION,
    REWRITE_TARGET_ANNOTATION,
];

const ROOT_PATH: &str = "/";
const PATH_CAPTURE_SUFFIX: &str = "(/|$)(.*)";
const REWRITE_TARGET: &str = "/$2";
const PATH_TYPE_PREFIX: &str = "Prefix";
const PATH_TYPE_IMPLEMENTATION_SPECIFIC: &str = "ImplementationSpecific";

/// Compile the Ingress routing `spec.host` to `service_name` on `spec.port`
pub fn compile_ingress(app: &EasyHttp, service_name: &str) -> Ingress {
    let spec = &app.spec;

    let mut annotations = BTreeMap::new();
    if spec.tls_enabled() {
        annotations.insert(
            CERT_ISSUER_ANNOTATION.to_string(),
            spec.cert_issuer.clone(),
        );
        annotations.insert(
            ACME_EDIT_IN_PLACE_ANNOTATION.to_string(),
            "true".to_string(),
        );
    }
    if !spec.path.is_empty() && spec.path != ROOT_PATH {
        annotations.insert(
            REWRITE_TARGET_ANNOTATION.to_string(),
            REWRITE_TARGET.to_string(),
        );
    }

    let (path, path_type) = if spec.path.is_empty() {
        (ROOT_PATH.to_string(), PATH_TYPE_PREFIX)
    } else {
        (
            format!("{}{}", spec.path, PATH_CAPTURE_SUFFIX),
            PATH_TYPE_IMPLEMENTATION_SPECIFIC,
        )
    };

    let rule = IngressRule {
        host: Some(spec.host.clone()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some(path),
                path_type: path_type.to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: service_name.to_string(),
                        port: Some(ServiceBackendPort {
                            name: None,
                            number: Some(spec.port),
                        }),
                    }),
                    resource: None,
                },
            }],
        }),
    };

    let tls = spec.tls_enabled().then(|| {
        vec![IngressTLS {
            hosts: Some(vec![spec.host.clone()]),
            secret_name: Some(spec.tls_secret_name()),
        }]
    });

    let mut metadata = managed_metadata(app, app.ingress_name());
    if !annotations.is_empty() {
        metadata.annotations = Some(annotations);
    }

    Ingress {
        metadata,
        spec: Some(IngressSpec {
            rules: Some(vec![rule]),
            tls,
            ..Default::default()
        }),
        status: None,
    }
}
