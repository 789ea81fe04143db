//! Store access for the EasyHttp controller
//!
//! [`AppKubeClient`] is the only way the reconciler touches the cluster. It is
//! mocked in tests; [`AppKubeClientImpl`] is the kube-rs backed implementation.
//! NotFound on a read is `Ok(None)`, every other failure is an
//! [`Error::Store`] naming the object acted on.

use std::fmt::Debug;

use async_trait::async_trait;
use easyhttp_common::FIELD_MANAGER;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

#[cfg(test)]
use mockall::automock;

use crate::crd::EasyHttp;
use crate::Error;

/// Trait abstracting the Kubernetes calls made during reconciliation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AppKubeClient: Send + Sync {
    /// Get an EasyHttp by name and namespace
    async fn get_app(&self, name: &str, namespace: &str) -> Result<Option<EasyHttp>, Error>;

    /// Replace the status sub-resource, guarded by the object's resourceVersion.
    /// Returns the stored object with its new resourceVersion.
    async fn replace_app_status(&self, app: &EasyHttp) -> Result<EasyHttp, Error>;

    /// Get a Deployment by name and namespace
    async fn get_deployment(&self, name: &str, namespace: &str)
        -> Result<Option<Deployment>, Error>;

    /// Create a Deployment
    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, Error>;

    /// Replace an existing Deployment
    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, Error>;

    /// Get a Service by name and namespace
    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error>;

    /// Create a Service
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, Error>;

    /// Replace an existing Service
    async fn replace_service(&self, namespace: &str, service: &Service)
        -> Result<Service, Error>;

    /// Get an Ingress by name and namespace
    async fn get_ingress(&self, name: &str, namespace: &str) -> Result<Option<Ingress>, Error>;

    /// Create an Ingress
    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error>;

    /// Replace an existing Ingress
    async fn replace_ingress(&self, namespace: &str, ingress: &Ingress)
        -> Result<Ingress, Error>;
}

/// Real Kubernetes client implementation
pub struct AppKubeClientImpl {
    client: Client,
}

impl AppKubeClientImpl {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }

    async fn get_opt<K>(&self, name: &str, namespace: &str) -> Result<Option<K>, Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| Error::store(K::kind(&()), namespace, name, e))
    }

    async fn create<K>(&self, namespace: &str, obj: &K) -> Result<K, Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        trace!(kind = %K::kind(&()), name = %obj.name_any(), namespace, "creating");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&Self::post_params(), obj)
            .await
            .map_err(|e| Error::store(K::kind(&()), namespace, obj.name_any(), e))
    }

    async fn replace<K>(&self, namespace: &str, obj: &K) -> Result<K, Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let name = obj.name_any();
        trace!(kind = %K::kind(&()), %name, namespace, "replacing");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.replace(&name, &Self::post_params(), obj)
            .await
            .map_err(|e| Error::store(K::kind(&()), namespace, &name, e))
    }
}

#[async_trait]
impl AppKubeClient for AppKubeClientImpl {
    async fn get_app(&self, name: &str, namespace: &str) -> Result<Option<EasyHttp>, Error> {
        self.get_opt(name, namespace).await
    }

    async fn replace_app_status(&self, app: &EasyHttp) -> Result<EasyHttp, Error> {
        let name = app.name_any();
        let namespace = app
            .namespace()
            .ok_or_else(|| Error::validation_for(&name, "EasyHttp has no namespace"))?;

        let data = serde_json::to_vec(app)
            .map_err(|e| Error::serialization_for_kind(EasyHttp::kind(&()), e.to_string()))?;

        let api: Api<EasyHttp> = Api::namespaced(self.client.clone(), &namespace);
        api.replace_status(&name, &Self::post_params(), data)
            .await
            .map_err(|e| Error::store(EasyHttp::kind(&()), &namespace, &name, e))
    }

    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, Error> {
        self.get_opt(name, namespace).await
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, Error> {
        self.create(namespace, deployment).await
    }

    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, Error> {
        self.replace(namespace, deployment).await
    }

    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error> {
        self.get_opt(name, namespace).await
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, Error> {
        self.create(namespace, service).await
    }

    async fn replace_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, Error> {
        self.replace(namespace, service).await
    }

    async fn get_ingress(&self, name: &str, namespace: &str) -> Result<Option<Ingress>, Error> {
        self.get_opt(name, namespace).await
    }

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error> {
        self.create(namespace, ingress).await
    }

    async fn replace_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, Error> {
        self.replace(namespace, ingress).await
    }
}
