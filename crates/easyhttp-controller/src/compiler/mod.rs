//! Manifest compilation for EasyHttp applications
//!
//! Each builder maps an `EasyHttp` to the full desired manifest of one managed
//! kind. Builders are pure: no I/O, and every map is a `BTreeMap`, so the same
//! input always serializes to the same bytes.

mod deployment;
mod ingress;
mod service;

use std::collections::BTreeMap;

use easyhttp_common::{APP_LABEL_KEY, FIELD_MANAGER, MANAGED_BY_LABEL_KEY};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::crd::EasyHttp;

pub use deployment::compile_deployment;
pub use ingress::{
    compile_ingress, ACME_EDIT_IN_PLACE_ANNOTATION, CERT_ISSUER_ANNOTATION, MANAGED_ANNOTATIONS,
    REWRITE_TARGET_ANNOTATION,
};
pub use service::{compile_service, SERVICE_PORT_NAME};

/// Pod selector labels for an application
pub fn selector_labels(app_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL_KEY.to_string(), app_name.to_string())])
}

/// Metadata shared by every managed object: identity plus the managed-by label
fn managed_metadata(app: &EasyHttp, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: app.metadata.namespace.clone(),
        labels: Some(BTreeMap::from([(
            MANAGED_BY_LABEL_KEY.to_string(),
            FIELD_MANAGER.to_string(),
        )])),
        ..Default::default()
    }
}
