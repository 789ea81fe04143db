//! The three object kinds the controller manages
//!
//! [`ManagedObject`] binds each kind to its readiness flag in
//! [`EasyHttpStatus`] and to its get/create/replace calls on
//! [`AppKubeClient`], so the convergence step can be written once.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::Resource;

use crate::compiler::MANAGED_ANNOTATIONS;
use crate::crd::EasyHttpStatus;
use crate::kube_client::AppKubeClient;
use crate::Error;

/// A Kubernetes kind derived from an EasyHttp
#[async_trait]
pub trait ManagedObject: Resource<DynamicType = ()> + Clone + Send + Sync + Sized {
    /// The readiness flag tracking this kind
    fn ready_flag(status: &mut EasyHttpStatus) -> &mut bool;

    /// Overwrite the desired part of a stored object, keeping server-owned fields
    fn refresh_spec(&mut self, desired: &Self);

    /// Fetch the stored object; `None` when it does not exist
    async fn fetch(
        kube: &dyn AppKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error>;

    /// Create the object
    async fn create(kube: &dyn AppKubeClient, namespace: &str, obj: &Self)
        -> Result<Self, Error>;

    /// Replace the stored object
    async fn replace(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error>;
}

#[async_trait]
impl ManagedObject for Deployment {
    fn ready_flag(status: &mut EasyHttpStatus) -> &mut bool {
        &mut status.deployment_ready
    }

    fn refresh_spec(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();
    }

    async fn fetch(
        kube: &dyn AppKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error> {
        kube.get_deployment(name, namespace).await
    }

    async fn create(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error> {
        kube.create_deployment(namespace, obj).await
    }

    async fn replace(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error> {
        kube.replace_deployment(namespace, obj).await
    }
}

#[async_trait]
impl ManagedObject for Service {
    fn ready_flag(status: &mut EasyHttpStatus) -> &mut bool {
        &mut status.service_ready
    }

    /// clusterIP is immutable once allocated, so the allocation survives the refresh
    fn refresh_spec(&mut self, desired: &Self) {
        let allocated = self.spec.take();
        let mut spec = desired.spec.clone().unwrap_or_default();
        if let Some(allocated) = allocated {
            spec.cluster_ip = allocated.cluster_ip;
            spec.cluster_ips = allocated.cluster_ips;
            spec.ip_families = allocated.ip_families;
            spec.ip_family_policy = allocated.ip_family_policy;
        }
        self.spec = Some(spec);
    }

    async fn fetch(
        kube: &dyn AppKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error> {
        kube.get_service(name, namespace).await
    }

    async fn create(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error> {
        kube.create_service(namespace, obj).await
    }

    async fn replace(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error> {
        kube.replace_service(namespace, obj).await
    }
}

#[async_trait]
impl ManagedObject for Ingress {
    fn ready_flag(status: &mut EasyHttpStatus) -> &mut bool {
        &mut status.ingress_ready
    }

    /// TLS and rewrite behavior live in annotations, so the spec-derived keys
    /// follow the desired object while foreign annotations stay untouched
    fn refresh_spec(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();

        let wanted = desired.metadata.annotations.as_ref();
        let annotations = self.metadata.annotations.get_or_insert_with(BTreeMap::new);
        for key in MANAGED_ANNOTATIONS {
            match wanted.and_then(|a| a.get(key)) {
                Some(value) => {
                    annotations.insert(key.to_string(), value.clone());
                }
                None => {
                    annotations.remove(key);
                }
            }
        }
        if annotations.is_empty() {
            self.metadata.annotations = None;
        }
    }

    async fn fetch(
        kube: &dyn AppKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error> {
        kube.get_ingress(name, namespace).await
    }

    async fn create(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error> {
        kube.create_ingress(namespace, obj).await
    }

    async fn replace(
        kube: &dyn AppKubeClient,
        namespace: &str,
        obj: &Self,
    ) -> Result<Self, Error> {
        kube.replace_ingress(namespace, obj).await
    }
}
