//! In-memory cluster behind `MockAppKubeClient` for story tests
//!
//! Every mock expectation reads and writes one shared [`ClusterState`], so a
//! test can run several reconciliation passes and then inspect what was
//! stored and which calls were made. Individual operations can be made to
//! fail by name (e.g. `"get_deployment"`).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ObjectReference, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};

use easyhttp_common::EventPublisher;

use crate::crd::{EasyHttp, EasyHttpSpec, EasyHttpStatus};
use crate::kube_client::MockAppKubeClient;
use crate::Error;

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} from fake apiserver", reason),
        reason: reason.to_string(),
        code,
    })
}

#[derive(Default)]
struct ClusterState {
    app: Option<EasyHttp>,
    deployments: BTreeMap<String, Deployment>,
    services: BTreeMap<String, Service>,
    ingresses: BTreeMap<String, Ingress>,
    calls: Vec<String>,
    status_history: Vec<EasyHttpStatus>,
    failing: BTreeSet<&'static str>,
    version: u64,
}

impl ClusterState {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn check(&self, op: &'static str, kind: &str, namespace: &str, name: &str) -> Result<(), Error> {
        if self.failing.contains(op) {
            return Err(Error::store(
                kind,
                namespace,
                name,
                api_error(500, "InternalError"),
            ));
        }
        Ok(())
    }
}

/// Kinds the fake stores, keyed by name
trait Stored: Resource<DynamicType = ()> + Clone {
    fn table(state: &mut ClusterState) -> &mut BTreeMap<String, Self>;

    /// Server-side defaulting applied on create
    fn on_create(&mut self) {}
}

impl Stored for Deployment {
    fn table(state: &mut ClusterState) -> &mut BTreeMap<String, Self> {
        &mut state.deployments
    }
}

impl Stored for Service {
    fn table(state: &mut ClusterState) -> &mut BTreeMap<String, Self> {
        &mut state.services
    }

    fn on_create(&mut self) {
        if let Some(spec) = self.spec.as_mut() {
            spec.cluster_ip = Some("10.96.0.10".to_string());
            spec.cluster_ips = Some(vec!["10.96.0.10".to_string()]);
        }
    }
}

impl Stored for Ingress {
    fn table(state: &mut ClusterState) -> &mut BTreeMap<String, Self> {
        &mut state.ingresses
    }
}

#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl FakeCluster {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_app(mut app: EasyHttp) -> Self {
        let cluster = Self::empty();
        {
            let mut state = cluster.lock();
            app.metadata.resource_version = Some(state.next_version());
            state.app = Some(app);
        }
        cluster
    }

    fn lock(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().expect("cluster state poisoned")
    }

    pub fn stored_app(&self) -> EasyHttp {
        self.lock().app.clone().expect("no EasyHttp stored")
    }

    /// Simulate a user edit of the spec
    pub fn edit_spec(&self, edit: impl FnOnce(&mut EasyHttpSpec)) {
        let mut state = self.lock();
        let version = state.next_version();
        let app = state.app.as_mut().expect("no EasyHttp stored");
        edit(&mut app.spec);
        app.metadata.resource_version = Some(version);
    }

    pub fn fail(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.lock().failing.remove(op);
    }

    pub fn deployment(&self, name: &str) -> Option<Deployment> {
        self.lock().deployments.get(name).cloned()
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        self.lock().services.get(name).cloned()
    }

    pub fn ingress(&self, name: &str) -> Option<Ingress> {
        self.lock().ingresses.get(name).cloned()
    }

    pub fn delete_service(&self, name: &str) {
        self.lock().services.remove(name);
    }

    pub fn delete_ingress(&self, name: &str) {
        self.lock().ingresses.remove(name);
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Calls whose description (`"<verb> <Kind> <name>"`) contains `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }

    /// Create and replace calls on managed objects
    pub fn write_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with("create ") || c.starts_with("replace "))
            .count()
    }

    /// Successful status writes
    pub fn status_write_count(&self) -> usize {
        self.lock().status_history.len()
    }

    pub fn status_history(&self) -> Vec<EasyHttpStatus> {
        self.lock().status_history.clone()
    }

    fn get<K: Stored>(&self, op: &'static str, name: &str, namespace: &str) -> Result<Option<K>, Error> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let kind = K::kind(&()).to_string();
        state.calls.push(format!("get {} {}", kind, name));
        state.check(op, &kind, namespace, name)?;
        Ok(K::table(state).get(name).cloned())
    }

    fn create<K: Stored>(&self, op: &'static str, namespace: &str, obj: &K) -> Result<K, Error> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let kind = K::kind(&()).to_string();
        let name = obj.name_any();
        state.calls.push(format!("create {} {}", kind, name));
        state.check(op, &kind, namespace, &name)?;

        if K::table(state).contains_key(&name) {
            return Err(Error::store(kind, namespace, name, api_error(409, "AlreadyExists")));
        }

        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(state.next_version());
        stored.meta_mut().uid = Some(format!("{}-uid", name));
        stored.on_create();
        K::table(state).insert(name, stored.clone());
        Ok(stored)
    }

    fn replace<K: Stored>(&self, op: &'static str, namespace: &str, obj: &K) -> Result<K, Error> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let kind = K::kind(&()).to_string();
        let name = obj.name_any();
        state.calls.push(format!("replace {} {}", kind, name));
        state.check(op, &kind, namespace, &name)?;

        let Some(current) = K::table(state).get(&name) else {
            return Err(Error::store(kind, namespace, name, api_error(404, "NotFound")));
        };
        if obj.meta().resource_version.is_some()
            && obj.meta().resource_version != current.meta().resource_version
        {
            return Err(Error::store(kind, namespace, name, api_error(409, "Conflict")));
        }

        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(state.next_version());
        K::table(state).insert(name, stored.clone());
        Ok(stored)
    }

    fn get_app(&self, name: &str, namespace: &str) -> Result<Option<EasyHttp>, Error> {
        let mut state = self.lock();
        state.calls.push(format!("get EasyHttp {}", name));
        state.check("get_app", "EasyHttp", namespace, name)?;
        Ok(state.app.clone().filter(|app| app.name_any() == name))
    }

    fn replace_status(&self, app: &EasyHttp) -> Result<EasyHttp, Error> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let name = app.name_any();
        let namespace = app.namespace().unwrap_or_default();
        state.calls.push(format!("status EasyHttp {}", name));
        state.check("replace_app_status", "EasyHttp", &namespace, &name)?;

        let version = state.next_version();
        let Some(stored) = state.app.as_mut() else {
            return Err(Error::store("EasyHttp", namespace, name, api_error(404, "NotFound")));
        };
        if stored.metadata.resource_version != app.metadata.resource_version {
            return Err(Error::store("EasyHttp", namespace, name, api_error(409, "Conflict")));
        }

        stored.status = app.status.clone();
        stored.metadata.resource_version = Some(version);
        state.status_history.push(app.status.clone().unwrap_or_default());
        Ok(stored.clone())
    }

    /// A mock whose every method is served by this cluster
    pub fn mock(&self) -> MockAppKubeClient {
        let mut mock = MockAppKubeClient::new();

        let c = self.clone();
        mock.expect_get_app()
            .returning(move |name, ns| c.get_app(name, ns));
        let c = self.clone();
        mock.expect_replace_app_status()
            .returning(move |app| c.replace_status(app));

        let c = self.clone();
        mock.expect_get_deployment()
            .returning(move |name, ns| c.get("get_deployment", name, ns));
        let c = self.clone();
        mock.expect_create_deployment()
            .returning(move |ns, obj| c.create("create_deployment", ns, obj));
        let c = self.clone();
        mock.expect_replace_deployment()
            .returning(move |ns, obj| c.replace("replace_deployment", ns, obj));

        let c = self.clone();
        mock.expect_get_service()
            .returning(move |name, ns| c.get("get_service", name, ns));
        let c = self.clone();
        mock.expect_create_service()
            .returning(move |ns, obj| c.create("create_service", ns, obj));
        let c = self.clone();
        mock.expect_replace_service()
            .returning(move |ns, obj| c.replace("replace_service", ns, obj));

        let c = self.clone();
        mock.expect_get_ingress()
            .returning(move |name, ns| c.get("get_ingress", name, ns));
        let c = self.clone();
        mock.expect_create_ingress()
            .returning(move |ns, obj| c.create("create_ingress", ns, obj));
        let c = self.clone();
        mock.expect_replace_ingress()
            .returning(move |ns, obj| c.replace("replace_ingress", ns, obj));

        mock
    }
}

#[derive(Clone, Debug)]
pub struct RecordedEvent {
    pub object: Option<String>,
    pub type_: EventType,
    pub reason: String,
    pub note: Option<String>,
}

/// Event publisher that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.events.lock().expect("events poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events
            .lock()
            .expect("events poisoned")
            .push(RecordedEvent {
                object: resource_ref.name.clone(),
                type_,
                reason: reason.to_string(),
                note,
            });
    }
}
