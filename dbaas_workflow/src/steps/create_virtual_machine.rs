//! Provisions one replacement VM per source instance.

use std::sync::Arc;

use async_trait::async_trait;

use dbaas_core::storage::active_bundles_for_plan;
use dbaas_core::{
    Bundle, CredentialKind, Credentials, DbaasError, DeployRequest, Host, HostAttr, HostAttrId,
    InfrastructureProvider, Instance,
};

use crate::allocator::BundleAllocator;
use crate::context::WorkflowContext;
use crate::error::{AllocationError, ErrorCode, StepError, DBAAS_0020};
use crate::services::WorkflowServices;
use crate::step::Step;

/// Deploys a VM, host, host attributes and instance for every source
/// instance, linking each source to its replacement.
///
/// Resources are appended to the context's target lists as soon as they
/// are persisted, so `undo` also cleans up after a partial `execute`.
/// `undo` leaves those lists intact and skips rows that are already gone
/// from the store, so a failed compensation can be retried.
pub struct CreateVirtualMachine {
    services: WorkflowServices,
    allocator: BundleAllocator,
}

impl CreateVirtualMachine {
    pub fn new(services: WorkflowServices) -> Self {
        let allocator = BundleAllocator::new(
            services.store.clone(),
            services.config.bundle_rotation_max_retries,
        );
        Self {
            services,
            allocator,
        }
    }

    async fn cloudstack(
        &self,
        context: &WorkflowContext,
    ) -> Result<(Credentials, Arc<dyn InfrastructureProvider>), StepError> {
        let credentials = self
            .services
            .credentials
            .resolve(&context.environment, CredentialKind::CloudStack)
            .await?;
        let provider = self.services.providers.connect(&credentials)?;
        Ok((credentials, provider))
    }

    async fn source_network(
        &self,
        provider: &dyn InfrastructureProvider,
        source_host: &Host,
        project: &str,
    ) -> Result<String, StepError> {
        let attr = self
            .services
            .store
            .get_host_attr_by_host(source_host.id)
            .await?
            .ok_or_else(|| DbaasError::not_found("host attributes", &source_host.hostname))?;
        tracing::debug!("Looking up network of vm {}", attr.vm_id);
        Ok(provider.get_vm_network(&attr.vm_id, project).await?)
    }
}

#[async_trait]
impl Step for CreateVirtualMachine {
    fn name(&self) -> &str {
        "create_virtual_machine"
    }

    fn description(&self) -> &str {
        "Creating virtualmachines..."
    }

    fn error_code(&self) -> ErrorCode {
        DBAAS_0020
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<(), StepError> {
        let store = self.services.store.as_ref();
        let (cs_credentials, provider) = self.cloudstack(context).await?;
        let vm_credentials = self
            .services
            .credentials
            .resolve(&context.environment, CredentialKind::Vm)
            .await?;

        context.target_hosts.clear();
        context.target_instances.clear();

        let bundles = active_bundles_for_plan(store, context.target_plan.id).await?;
        let min_bundles = self.services.config.ha_min_number_of_bundles;
        context
            .target_plan
            .validate_min_environment_bundles(bundles.len(), min_bundles)?;
        if bundles.is_empty() {
            return Err(AllocationError::NoActiveBundles.into());
        }

        let affinity_group_id = cs_credentials
            .get_parameter_by_name(&self.services.config.affinity_group_parameter)
            .map(str::to_string);
        let mut previous: Option<Bundle> = None;

        for index in 0..context.source_instances.len() {
            let source_host = context
                .source_hosts
                .get(index)
                .cloned()
                .ok_or_else(|| StepError::MissingContext(format!("source host {}", index)))?;

            let bundle = if bundles.len() == 1 {
                bundles[0].clone()
            } else {
                let source_network = self
                    .source_network(provider.as_ref(), &source_host, &cs_credentials.project)
                    .await?;
                self.allocator
                    .rotate(
                        previous.as_ref(),
                        &context.target_plan,
                        &bundles,
                        &source_network,
                    )
                    .await?
            };

            let vm_name = source_host.short_name().to_string();
            tracing::debug!(
                "Deploying new vm {} on bundle {} with offering {}",
                vm_name,
                bundle,
                context.offering.name
            );
            let vm = provider
                .deploy_vm(DeployRequest {
                    offering: &context.offering,
                    bundle: &bundle,
                    project: &cs_credentials.project,
                    vm_name: &vm_name,
                    affinity_group_id: affinity_group_id.as_deref(),
                })
                .await?
                .ok_or_else(|| StepError::NoVirtualMachine(vm_name.clone()))?;

            let address = vm.primary_ip()?.to_string();
            let mut host = Host::new(address.clone(), address);
            store.create_host(&mut host).await?;
            context.target_hosts.push(host.clone());

            context.source_hosts[index].future_host = Some(host.id);
            store.update_host(&context.source_hosts[index]).await?;

            let mut host_attr = HostAttr {
                id: HostAttrId::UNSAVED,
                host_id: host.id,
                vm_id: vm.id.clone(),
                vm_user: vm_credentials.user.clone(),
                vm_password: vm_credentials.password.clone(),
                bundle_id: bundle.id,
            };
            store.create_host_attr(&mut host_attr).await?;
            tracing::info!("Host attrs custom attributes created for {}", host.hostname);

            let source_instance = &context.source_instances[index];
            let mut instance =
                Instance::new(&host, source_instance.port, context.databaseinfra.id);
            instance.is_active = source_instance.is_active;
            instance.instance_type = source_instance.instance_type;
            store.create_instance(&mut instance).await?;
            context.target_instances.push(instance.clone());
            tracing::info!("Instance {} created", instance.connection());

            context.source_instances[index].future_instance = Some(instance.id);
            store.update_instance(&context.source_instances[index]).await?;

            context.databaseinfra.last_vm_created += 1;
            store.update_databaseinfra(&context.databaseinfra).await?;

            self.allocator
                .set_last_infra_bundle(&context.databaseinfra, &bundle)
                .await?;
            previous = Some(bundle);
        }

        Ok(())
    }

    async fn undo(&self, context: &mut WorkflowContext) -> Result<(), StepError> {
        tracing::info!("Running undo...");
        let store = self.services.store.as_ref();
        let (cs_credentials, provider) = self.cloudstack(context).await?;

        for source_instance in context.source_instances.iter_mut() {
            source_instance.future_instance = None;
            store.update_instance(source_instance).await?;
        }
        tracing::info!("Source instances updated");

        for target_instance in &context.target_instances {
            if store.delete_instance(target_instance.id).await? {
                tracing::info!("Target instance {} deleted", target_instance.connection());
            }
        }

        for source_host in context.source_hosts.iter_mut() {
            source_host.future_host = None;
            store.update_host(source_host).await?;
        }
        tracing::info!("Source hosts updated");

        // Target lists stay intact; rows already gone from the store were
        // handled by an earlier attempt.
        let mut first_error = None;
        for target_host in &context.target_hosts {
            if store.get_host(target_host.id).await?.is_none() {
                continue;
            }

            let Some(host_attr) = store.get_host_attr_by_host(target_host.id).await? else {
                tracing::error!(
                    "Host {} has no provider attributes, its vm was not destroyed",
                    target_host.hostname
                );
                first_error.get_or_insert(StepError::MissingProviderMetadata(
                    target_host.hostname.clone(),
                ));
                continue;
            };

            tracing::info!("Destroying virtualmachine {}", host_attr.vm_id);
            let destroyed = provider
                .destroy_vm(
                    &cs_credentials.project,
                    &context.environment,
                    &host_attr.vm_id,
                )
                .await?;
            if !destroyed {
                tracing::warn!("Virtual machine {} was not destroyed", host_attr.vm_id);
                first_error.get_or_insert(StepError::DestroyRefused(host_attr.vm_id));
                continue;
            }

            store.delete_host_attr(host_attr.id).await?;
            tracing::info!("HostAttr deleted");
            store.delete_host(target_host.id).await?;
            tracing::info!("Target host {} deleted", target_host.hostname);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
