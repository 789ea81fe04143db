//! Per-kind convergence step
//!
//! One pass of [`converge`] brings a single managed object in line with the
//! EasyHttp it is derived from:
//!
//! ```text
//! fetch ──► missing ─────────────────► create  ─┐
//!   │                                           ├─► flag = true ─► status write
//!   ├─► present, flag false ─► refresh ► replace┘
//!   └─► present, flag true  ─► InSync (no writes)
//! ```
//!
//! The flag only flips to true after both the object write and the status
//! write succeed. A failure at either point leaves the persisted flag false,
//! so the next pass re-applies the object.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use easyhttp_common::events::{actions, reasons};

use crate::controller::AppContext;
use crate::crd::{EasyHttp, EasyHttpStatus};
use crate::managed::ManagedObject;
use crate::Error;

/// What a convergence step did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Flag was set and the object exists; nothing written
    InSync,
    /// Object did not exist and was created
    Created,
    /// Object existed and was replaced with the desired spec
    Updated,
}

/// Result of a successful step: the outcome plus the object as stored
#[derive(Clone, Debug)]
pub struct Converged<K> {
    /// What the step did
    pub outcome: StepOutcome,
    /// The object as returned by the store
    pub object: K,
}

/// Converge one managed object.
///
/// `desired` is the compiled manifest. `spec_changed` reports whether the
/// orchestrator detected a spec change on this pass; it is only logged.
/// Every write refreshes the stored object from `desired`, so a pass that
/// failed after a change is finished with the new spec. On a write, `app` is
/// replaced with the object returned by the status write so the next step
/// carries the fresh resourceVersion.
pub async fn converge<K: ManagedObject>(
    ctx: &AppContext,
    app: &mut EasyHttp,
    desired: K,
    spec_changed: bool,
) -> Result<Converged<K>, Error> {
    let kind = K::kind(&()).to_string();
    let name = desired.name_any();
    let namespace = app
        .namespace()
        .ok_or_else(|| Error::validation_for(app.name_any(), "EasyHttp has no namespace"))?;

    let existing = K::fetch(ctx.kube.as_ref(), &name, &namespace).await?;
    let ready = existing.is_some() && *K::ready_flag(status_mut(app));

    let (outcome, mut object) = match existing {
        Some(current) if ready => {
            debug!(%kind, %name, "in sync");
            return Ok(Converged {
                outcome: StepOutcome::InSync,
                object: current,
            });
        }
        Some(mut current) => {
            current.refresh_spec(&desired);
            (StepOutcome::Updated, current)
        }
        None => (StepOutcome::Created, desired),
    };

    set_controller_reference(&mut object, app)?;

    let written = match outcome {
        StepOutcome::Created => K::create(ctx.kube.as_ref(), &namespace, &object).await?,
        _ => K::replace(ctx.kube.as_ref(), &namespace, &object).await?,
    };
    info!(%kind, %name, ?outcome, spec_changed, "managed object written");

    *K::ready_flag(status_mut(app)) = true;
    *app = ctx.kube.replace_app_status(app).await?;

    let reason = match outcome {
        StepOutcome::Created => reasons::CREATED,
        _ => reasons::UPDATED,
    };
    ctx.events
        .publish(
            &app.object_ref(&()),
            EventType::Normal,
            reason,
            actions::RECONCILE,
            Some(format!("{} {} {}", reason, kind, name)),
        )
        .await;

    Ok(Converged {
        outcome,
        object: written,
    })
}

fn status_mut(app: &mut EasyHttp) -> &mut EasyHttpStatus {
    app.status.get_or_insert_with(EasyHttpStatus::default)
}

/// Make `app` the controller owner of `obj`.
///
/// Fails when `app` has no uid yet or when another controller already owns
/// the object.
pub fn set_controller_reference<K: Resource<DynamicType = ()>>(
    obj: &mut K,
    app: &EasyHttp,
) -> Result<(), Error> {
    let kind = K::kind(&()).to_string();
    let name = obj.meta().name.clone().unwrap_or_default();

    let owner = app
        .controller_owner_ref(&())
        .ok_or_else(|| Error::ownership(&kind, &name, "owner EasyHttp has no uid"))?;

    let refs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(Error::ownership(
            &kind,
            &name,
            format!("already controlled by {} {}", other.kind, other.name),
        ));
    }

    refs.retain(|r: &OwnerReference| r.uid != owner.uid);
    refs.push(owner);
    Ok(())
}
