//! Service generation

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};

use super::{managed_metadata, selector_labels};
use crate::crd::EasyHttp;

/// Name of the single Service port
pub const SERVICE_PORT_NAME: &str = "http";

/// Compile the Service exposing the application pods on `spec.port`
pub fn compile_service(app: &EasyHttp) -> Service {
    Service {
        metadata: managed_metadata(app, app.service_name()),
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&app.deployment_name())),
            ports: Some(vec![ServicePort {
                name: Some(SERVICE_PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                port: app.spec.port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}
