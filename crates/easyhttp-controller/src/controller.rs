//! EasyHttp controller implementation
//!
//! [`reconcile`] runs once per reconciliation request. It owns the readiness
//! flag state machine:
//!
//! 1. Re-read the EasyHttp; if it is gone there is nothing to do.
//! 2. If the last pass fully deployed and the spec has since changed, clear
//!    all three flags.
//! 3. Record the spec as `lastSyncedSpec` in the same status write.
//! 4. Converge Deployment, Service and Ingress in that order, stopping at the
//!    first error.
//!
//! Progress lives only in the status sub-resource, so a restart resumes from
//! whatever the last successful status write recorded.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use easyhttp_common::events::{actions, reasons, EventPublisher};
use easyhttp_common::{KubeEventPublisher, FIELD_MANAGER};
#[cfg(test)]
use easyhttp_common::NoopEventPublisher;

use crate::compiler::{compile_deployment, compile_ingress, compile_service};
use crate::converge::{converge, StepOutcome};
use crate::crd::{EasyHttp, EasyHttpStatus};
use crate::kube_client::{AppKubeClient, AppKubeClientImpl};
use crate::Error;

/// Requeue delay after a retryable failure
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15);

// =============================================================================
// Controller context
// =============================================================================

/// Shared state handed to every reconciliation
pub struct AppContext {
    /// Store access
    pub kube: Arc<dyn AppKubeClient>,
    /// Event publisher for emitting Kubernetes Events
    pub events: Arc<dyn EventPublisher>,
    /// Requeue delay used by [`error_policy`] for retryable errors
    pub retry_delay: Duration,
}

impl AppContext {
    /// Create a context from explicit dependencies
    pub fn new(
        kube: Arc<dyn AppKubeClient>,
        events: Arc<dyn EventPublisher>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            kube,
            events,
            retry_delay,
        }
    }

    /// Create a context backed by a live cluster
    pub fn from_client(client: Client, retry_delay: Duration) -> Self {
        let events = Arc::new(KubeEventPublisher::new(client.clone(), FIELD_MANAGER));
        Self::new(
            Arc::new(AppKubeClientImpl::new(client)),
            events,
            retry_delay,
        )
    }

    /// Create a context for testing with a mock client
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn AppKubeClient>) -> Self {
        Self::new(kube, Arc::new(NoopEventPublisher), DEFAULT_RETRY_DELAY)
    }
}

// =============================================================================
// Steps
// =============================================================================

/// One managed kind, in the order the orchestrator converges them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The application Deployment
    Deployment,
    /// The Service in front of the pods
    Service,
    /// The Ingress routing to the Service
    Ingress,
}

impl Step {
    /// Fixed convergence order; the Ingress needs the Service name
    pub const ORDER: [Step; 3] = [Step::Deployment, Step::Service, Step::Ingress];
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconcile an EasyHttp
#[instrument(skip(app, ctx), fields(app = %app.name_any(), namespace = ?app.namespace()))]
pub async fn reconcile(app: Arc<EasyHttp>, ctx: Arc<AppContext>) -> Result<Action, Error> {
    let name = app.name_any();
    let namespace = app
        .namespace()
        .ok_or_else(|| Error::validation_for(&name, "EasyHttp has no namespace"))?;

    let Some(current) = ctx.kube.get_app(&name, &namespace).await? else {
        debug!("EasyHttp no longer exists");
        return Ok(Action::await_change());
    };

    match sync(&ctx, current).await {
        Ok(synced) => {
            log_certificate_mode(&synced);
            let converged = synced.status.as_ref().is_some_and(EasyHttpStatus::is_converged);
            debug!(converged, "reconciliation complete");
            Ok(Action::await_change())
        }
        Err(e) => {
            ctx.events
                .publish(
                    &app.object_ref(&()),
                    EventType::Warning,
                    reasons::RECONCILE_FAILED,
                    actions::RECONCILE,
                    Some(e.to_string()),
                )
                .await;
            Err(e)
        }
    }
}

/// Record the spec and converge every step. Returns the EasyHttp as last stored.
async fn sync(ctx: &AppContext, mut app: EasyHttp) -> Result<EasyHttp, Error> {
    let spec_changed = mark_spec_change(&mut app);
    if spec_changed {
        info!("spec changed since last sync, re-converging all objects");
    }
    app = ctx.kube.replace_app_status(&app).await?;

    let mut service_name = app.service_name();
    for step in Step::ORDER {
        let outcome = match step {
            Step::Deployment => {
                let desired = compile_deployment(&app);
                converge(ctx, &mut app, desired, spec_changed).await?.outcome
            }
            Step::Service => {
                let desired = compile_service(&app);
                let converged = converge(ctx, &mut app, desired, spec_changed).await?;
                service_name = converged.object.name_any();
                converged.outcome
            }
            Step::Ingress => {
                let desired = compile_ingress(&app, &service_name);
                converge(ctx, &mut app, desired, spec_changed).await?.outcome
            }
        };
        if outcome != StepOutcome::InSync {
            debug!(?step, ?outcome, "step converged");
        }
    }

    Ok(app)
}

/// Clear the flags on a spec change and take the new snapshot.
///
/// A change only counts once the previous pass deployed; before that the
/// flags are already false. Both edits land in the same status write.
fn mark_spec_change(app: &mut EasyHttp) -> bool {
    let spec = app.spec.clone();
    let status = app.status.get_or_insert_with(EasyHttpStatus::default);

    let changed = status.deployment_ready
        && !status
            .last_synced_spec
            .as_ref()
            .is_some_and(|last| last.is_equivalent(&spec));
    if changed {
        status.reset_readiness();
    }
    status.last_synced_spec = Some(spec);
    changed
}

fn log_certificate_mode(app: &EasyHttp) {
    if app.spec.tls_enabled() {
        info!(
            issuer = %app.spec.cert_issuer,
            secret = %app.spec.tls_secret_name(),
            "certificate manager issuer in use"
        );
    } else {
        info!("certificate manager disabled");
    }
}

/// Error policy for the EasyHttp controller
///
/// Retryable errors requeue after the configured delay. Everything else waits
/// for the next change to the EasyHttp or one of its objects. Conflicts are
/// expected under concurrent writers and log at warn.
pub fn error_policy(app: Arc<EasyHttp>, error: &Error, ctx: Arc<AppContext>) -> Action {
    if error.is_conflict() {
        // Another writer moved the resourceVersion; the requeued pass re-reads it
        warn!(
            ?error,
            app = %app.name_any(),
            object = ?error.object(),
            "stale write, requeueing"
        );
    } else {
        error!(
            ?error,
            app = %app.name_any(),
            object = ?error.object(),
            retryable = error.is_retryable(),
            "reconciliation failed"
        );
    }

    if error.is_retryable() {
        Action::requeue(ctx.retry_delay)
    } else {
        Action::await_change()
    }
}
