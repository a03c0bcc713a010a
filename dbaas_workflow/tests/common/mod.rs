//! Common test utilities for workflow integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbaas_core::{
    Bundle, BundleId, CredentialKind, Credentials, DatabaseInfra, DeployRequest, EngineId,
    Environment, Host, HostAttr, HostAttrId, InfrastructureProvider, Instance, InstanceType,
    MemoryStore, Nic, Offering, Plan, PlanAttr, ProviderError, ResourceStore, SharedProvider,
    StaticCredentialGateway, VmDescriptor,
};
use dbaas_workflow::{ErrorCode, Step, StepError, WorkflowContext, WorkflowServices};

/// Network every source VM sits on unless overridden.
pub const SOURCE_NETWORK: &str = "source-net";

/// Deployment recorded by [`MockProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub vm_name: String,
    pub bundle_id: BundleId,
    pub project: String,
    pub affinity_group_id: Option<String>,
}

/// Infrastructure provider that records calls instead of touching a cloud.
#[derive(Default)]
pub struct MockProvider {
    deployments: Mutex<Vec<Deployment>>,
    destroyed: Mutex<Vec<String>>,
    networks: Mutex<HashMap<String, String>>,
    network_lookups: AtomicUsize,
    deploy_calls: AtomicUsize,
    no_vm_at: Mutex<Option<usize>>,
    refuse_destroy: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the deploy call with this zero-based index return no VM.
    pub fn return_no_vm_at(&self, call: usize) {
        *self.no_vm_at.lock().unwrap() = Some(call);
    }

    pub fn set_refuse_destroy(&self, refuse: bool) {
        self.refuse_destroy.store(refuse, Ordering::SeqCst);
    }

    pub fn set_network(&self, vm_id: &str, network: &str) {
        self.networks
            .lock()
            .unwrap()
            .insert(vm_id.to_string(), network.to_string());
    }

    pub fn deployments(&self) -> Vec<Deployment> {
        self.deployments.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn network_lookups(&self) -> usize {
        self.network_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InfrastructureProvider for MockProvider {
    async fn deploy_vm(
        &self,
        request: DeployRequest<'_>,
    ) -> Result<Option<VmDescriptor>, ProviderError> {
        let call = self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        if *self.no_vm_at.lock().unwrap() == Some(call) {
            return Ok(None);
        }

        self.deployments.lock().unwrap().push(Deployment {
            vm_name: request.vm_name.to_string(),
            bundle_id: request.bundle.id,
            project: request.project.to_string(),
            affinity_group_id: request.affinity_group_id.map(str::to_string),
        });

        let vm_id = format!("vm-{}", call);
        self.set_network(&vm_id, &request.bundle.network_id);
        Ok(Some(VmDescriptor {
            id: vm_id,
            name: request.vm_name.to_string(),
            nics: vec![Nic {
                ip_address: format!("10.0.1.{}", call + 1),
                network_id: request.bundle.network_id.clone(),
            }],
        }))
    }

    async fn destroy_vm(
        &self,
        _project: &str,
        _environment: &Environment,
        vm_id: &str,
    ) -> Result<bool, ProviderError> {
        if self.refuse_destroy.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.destroyed.lock().unwrap().push(vm_id.to_string());
        Ok(true)
    }

    async fn get_vm_network(&self, vm_id: &str, _project: &str) -> Result<String, ProviderError> {
        self.network_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .networks
            .lock()
            .unwrap()
            .get(vm_id)
            .cloned()
            .unwrap_or_else(|| SOURCE_NETWORK.to_string()))
    }
}

/// Seeded store, gateway and provider shared by one test.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub credentials: Arc<StaticCredentialGateway>,
    pub provider: Arc<MockProvider>,
    pub services: WorkflowServices,
    pub environment: Environment,
    pub plan: Plan,
    pub bundles: Vec<Bundle>,
    pub infra: DatabaseInfra,
    pub offering: Offering,
}

/// Creates a fixture whose plan owns one active bundle per network.
///
/// CloudStack and VM credentials are registered for the environment.
pub async fn fixture(bundle_networks: &[&str]) -> anyhow::Result<Fixture> {
    let fixture = bare_fixture(bundle_networks).await?;
    register_credentials(&fixture).await;
    Ok(fixture)
}

/// Like [`fixture`], but without any credentials registered.
pub async fn bare_fixture(bundle_networks: &[&str]) -> anyhow::Result<Fixture> {
    let store = Arc::new(MemoryStore::new());
    let credentials = Arc::new(StaticCredentialGateway::new());
    let provider = Arc::new(MockProvider::new());

    let mut plan = Plan::new("mysql-ha", EngineId(1));
    store.create_plan(&mut plan).await?;

    let mut bundles = Vec::new();
    for (index, network) in bundle_networks.iter().enumerate() {
        let mut bundle = Bundle::new(format!("bundle-{}", index), *network);
        store.create_bundle(&mut bundle).await?;
        bundles.push(bundle);
    }
    store
        .put_plan_attr(PlanAttr {
            plan_id: plan.id,
            bundle_ids: bundles.iter().map(|bundle| bundle.id).collect(),
        })
        .await?;

    let environment = Environment::new(1, "dev");
    let mut infra = DatabaseInfra::new("mysql-infra", EngineId(1), Some(plan.id), environment.id);
    store.create_databaseinfra(&mut infra).await?;

    let services = WorkflowServices::new(
        store.clone(),
        credentials.clone(),
        Arc::new(SharedProvider(provider.clone() as Arc<dyn InfrastructureProvider>)),
    );

    Ok(Fixture {
        store,
        credentials,
        provider,
        services,
        environment,
        plan,
        bundles,
        infra,
        offering: Offering {
            service_offering_id: "so-medium".to_string(),
            name: "medium".to_string(),
        },
    })
}

pub async fn register_credentials(fixture: &Fixture) {
    fixture
        .credentials
        .register(
            fixture.environment.name.clone(),
            CredentialKind::CloudStack,
            Credentials::new("cs-user", "cs-pass")
                .with_project("project-1")
                .with_parameter("affinity_group_id", "ag-1"),
        )
        .await;
    fixture
        .credentials
        .register(
            fixture.environment.name.clone(),
            CredentialKind::Vm,
            Credentials::new("vm-user", "vm-pass"),
        )
        .await;
}

/// Persists `count` source hosts (with provider metadata) and instances.
pub async fn seed_sources(
    fixture: &Fixture,
    count: usize,
) -> anyhow::Result<(Vec<Instance>, Vec<Host>)> {
    let mut instances = Vec::new();
    let mut hosts = Vec::new();

    for index in 0..count {
        let mut host = Host::new(
            format!("db-{:02}-a1b2.example.com", index),
            format!("10.0.0.{}", index + 1),
        );
        fixture.store.create_host(&mut host).await?;

        let mut attr = HostAttr {
            id: HostAttrId::UNSAVED,
            host_id: host.id,
            vm_id: format!("source-vm-{}", index),
            vm_user: "root".to_string(),
            vm_password: "secret".to_string(),
            bundle_id: BundleId::UNSAVED,
        };
        fixture.store.create_host_attr(&mut attr).await?;

        let mut instance = Instance::new(&host, 3306, fixture.infra.id);
        instance.instance_type = InstanceType::MySql;
        fixture.store.create_instance(&mut instance).await?;

        hosts.push(host);
        instances.push(instance);
    }

    Ok((instances, hosts))
}

/// Context for migrating `count` freshly seeded sources.
pub async fn seeded_context(fixture: &Fixture, count: usize) -> anyhow::Result<WorkflowContext> {
    let (instances, hosts) = seed_sources(fixture, count).await?;
    let context = WorkflowContext::new(
        fixture.environment.clone(),
        fixture.plan.clone(),
        fixture.offering.clone(),
        fixture.infra.clone(),
    )
    .with_sources(instances, hosts)?;
    Ok(context)
}

/// Number of hosts, host attributes and instances in the store.
pub async fn entity_counts(store: &MemoryStore) -> anyhow::Result<(usize, usize, usize)> {
    Ok((
        store.list_hosts(&|_| true).await?.len(),
        store.list_host_attrs(&|_| true).await?.len(),
        store.list_instances(&|_| true).await?.len(),
    ))
}

/// Shared log of step calls, e.g. `["execute:a", "undo:a"]`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Step that logs its calls and fails on demand.
pub struct RecordingStep {
    name: &'static str,
    log: CallLog,
    fail_execute: bool,
    fail_undo: bool,
}

impl RecordingStep {
    /// Creates a step whose error code equals its name.
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail_execute: false,
            fail_undo: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn failing_undo(mut self) -> Self {
        self.fail_undo = true;
        self
    }
}

#[async_trait]
impl Step for RecordingStep {
    fn name(&self) -> &str {
        self.name
    }

    fn error_code(&self) -> ErrorCode {
        ErrorCode::new(self.name)
    }

    async fn execute(&self, _context: &mut WorkflowContext) -> Result<(), StepError> {
        self.log.lock().unwrap().push(format!("execute:{}", self.name));
        if self.fail_execute {
            return Err(anyhow::anyhow!("{} refused to run", self.name).into());
        }
        Ok(())
    }

    async fn undo(&self, _context: &mut WorkflowContext) -> Result<(), StepError> {
        self.log.lock().unwrap().push(format!("undo:{}", self.name));
        if self.fail_undo {
            return Err(anyhow::anyhow!("{} refused to undo", self.name).into());
        }
        Ok(())
    }
}

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Minimal context for steps that never touch it.
pub fn empty_context() -> WorkflowContext {
    WorkflowContext::new(
        Environment::new(1, "dev"),
        Plan::new("plan", EngineId(1)),
        Offering {
            service_offering_id: "so".to_string(),
            name: "small".to_string(),
        },
        DatabaseInfra::new("infra", EngineId(1), None, dbaas_core::EnvironmentId(1)),
    )
}
