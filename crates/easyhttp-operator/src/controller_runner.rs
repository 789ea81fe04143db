//! Controller runner - wires the EasyHttp reconciler to the watch machinery

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

use easyhttp_common::crd::EasyHttp;
use easyhttp_controller::{error_policy, reconcile, AppContext};

use crate::config::ControllerArgs;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// so the API server closes idle watches before the client times out.
const WATCH_TIMEOUT_SECS: u32 = 25;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Api over one namespace, or all namespaces when `namespace` is None
fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Build the EasyHttp controller future.
///
/// Changes to an owned Deployment, Service or Ingress (including deletion)
/// requeue the owning EasyHttp. The future completes on SIGTERM/SIGINT.
pub fn build_controller(
    client: Client,
    args: &ControllerArgs,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(AppContext::from_client(client.clone(), args.retry_delay()));
    let namespace = args.namespace.as_deref();

    match namespace {
        Some(ns) => tracing::info!(namespace = %ns, "- EasyHttp controller (single namespace)"),
        None => tracing::info!("- EasyHttp controller (all namespaces)"),
    }

    Box::pin(
        Controller::new(scoped_api::<EasyHttp>(client.clone(), namespace), watcher_config())
            .owns(scoped_api::<Deployment>(client.clone(), namespace), watcher_config())
            .owns(scoped_api::<Service>(client.clone(), namespace), watcher_config())
            .owns(scoped_api::<Ingress>(client, namespace), watcher_config())
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("EasyHttp")),
    )
}

fn log_reconcile_result<T: Debug, E: Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(object) => tracing::debug!(?object, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
