//! Deployment generation

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::{managed_metadata, selector_labels};
use crate::crd::EasyHttp;

const RECREATE_STRATEGY: &str = "Recreate";

/// Compile the Deployment running the application container.
///
/// The container and its port are both named after the application. The pod
/// template is selected by `app=<name>` and pods are replaced with the
/// `Recreate` strategy.
pub fn compile_deployment(app: &EasyHttp) -> Deployment {
    let name = app.deployment_name();
    let spec = &app.spec;
    let labels = selector_labels(&name);

    let env: Vec<EnvVar> = spec
        .env
        .iter()
        .map(|(key, value)| EnvVar {
            name: key.clone(),
            value: Some(value.clone()),
            value_from: None,
        })
        .collect();

    let container = Container {
        name: name.clone(),
        image: Some(spec.image_ref()),
        ports: Some(vec![ContainerPort {
            name: Some(name.clone()),
            container_port: spec.port,
            ..Default::default()
        }]),
        env: (!env.is_empty()).then_some(env),
        ..Default::default()
    };

    Deployment {
        metadata: managed_metadata(app, name),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.effective_replicas()),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                match_expressions: None,
            },
            strategy: Some(DeploymentStrategy {
                type_: Some(RECREATE_STRATEGY.to_string()),
                rolling_update: None,
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}
