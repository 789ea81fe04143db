//! Reconciliation engine for EasyHttp
//!
//! This crate turns an `EasyHttp` into its managed Kubernetes objects and
//! keeps them converged:
//!
//! - **Compiler**: pure builders for the Deployment, Service and Ingress
//! - **Kube client**: mockable store trait with the kube-rs implementation
//! - **Converge**: the generic create/update/skip step run once per kind
//! - **Controller**: the reconcile entry point, error policy and shared context

pub mod compiler;
pub mod controller;
pub mod converge;
pub mod kube_client;
pub mod managed;

#[cfg(test)]
mod testing;

pub use controller::{error_policy, reconcile, AppContext};
pub use kube_client::{AppKubeClient, AppKubeClientImpl};

// Internal modules use `crate::crd` and `crate::Error`.
pub(crate) use easyhttp_common::{crd, Error};
