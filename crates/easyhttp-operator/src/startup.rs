//! CRD generation and installation
//!
//! The operator installs its own CRD on startup using server-side apply, so
//! the stored schema always matches the running binary.

use anyhow::Context as _;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use easyhttp_common::crd::EasyHttp;
use easyhttp_common::FIELD_MANAGER;

/// The EasyHttp CRD rendered as YAML
pub fn crd_yaml() -> anyhow::Result<String> {
    serde_yaml::to_string(&EasyHttp::crd()).context("failed to serialize EasyHttp CRD")
}

/// Server-side-apply the EasyHttp CRD
pub async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let name = EasyHttp::crd_name();

    tracing::info!(crd = %name, "installing CRD");
    crds.patch(name, &params, &Patch::Apply(&EasyHttp::crd()))
        .await
        .with_context(|| format!("failed to install {} CRD", name))?;
    tracing::info!(crd = %name, "CRD installed/updated");

    Ok(())
}
