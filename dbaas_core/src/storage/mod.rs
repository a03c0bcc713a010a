//! Resource store abstraction.
//!
//! The workflow engine treats persistence as a passive collaborator: every
//! call persists exactly one entity atomically, and no multi-entity
//! transactions are assumed. Implementations can sit on a relational
//! database, an API, or the in-memory [`MemoryStore`] used by tests.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::{DbaasError, Result};
use crate::models::{Bundle, DatabaseInfra, Host, HostAttr, Instance, Plan, PlanAttr};
use crate::types::{
    BundleId, BundleScope, DatabaseInfraId, HostAttrId, HostId, InstanceId, PlanId,
};

/// Borrowed filter used by the `list_*` queries.
pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Durable store for control plane entities.
///
/// `create_*` assigns a fresh id, writes it back into the entity and
/// returns it. `update_*` fails with [`DbaasError::NotFound`] for unknown
/// ids. `delete_*` returns whether something was removed. `list_*` results
/// are ordered by id.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn create_host(&self, host: &mut Host) -> Result<HostId>;
    async fn update_host(&self, host: &Host) -> Result<()>;
    async fn delete_host(&self, id: HostId) -> Result<bool>;
    async fn get_host(&self, id: HostId) -> Result<Option<Host>>;
    async fn list_hosts(&self, filter: Predicate<'_, Host>) -> Result<Vec<Host>>;

    async fn create_host_attr(&self, attr: &mut HostAttr) -> Result<HostAttrId>;
    async fn delete_host_attr(&self, id: HostAttrId) -> Result<bool>;
    /// Provider metadata of a host, if the host was deployed by a provider.
    async fn get_host_attr_by_host(&self, host_id: HostId) -> Result<Option<HostAttr>>;
    async fn list_host_attrs(&self, filter: Predicate<'_, HostAttr>) -> Result<Vec<HostAttr>>;

    async fn create_instance(&self, instance: &mut Instance) -> Result<InstanceId>;
    async fn update_instance(&self, instance: &Instance) -> Result<()>;
    async fn delete_instance(&self, id: InstanceId) -> Result<bool>;
    async fn get_instance(&self, id: InstanceId) -> Result<Option<Instance>>;
    async fn list_instances(&self, filter: Predicate<'_, Instance>) -> Result<Vec<Instance>>;

    async fn create_databaseinfra(&self, infra: &mut DatabaseInfra) -> Result<DatabaseInfraId>;
    async fn update_databaseinfra(&self, infra: &DatabaseInfra) -> Result<()>;
    async fn get_databaseinfra(&self, id: DatabaseInfraId) -> Result<Option<DatabaseInfra>>;
    async fn list_databaseinfras(
        &self,
        filter: Predicate<'_, DatabaseInfra>,
    ) -> Result<Vec<DatabaseInfra>>;

    async fn create_plan(&self, plan: &mut Plan) -> Result<PlanId>;
    async fn update_plan(&self, plan: &Plan) -> Result<()>;
    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>>;
    async fn list_plans(&self, filter: Predicate<'_, Plan>) -> Result<Vec<Plan>>;

    async fn create_bundle(&self, bundle: &mut Bundle) -> Result<BundleId>;
    async fn update_bundle(&self, bundle: &Bundle) -> Result<()>;
    async fn get_bundle(&self, id: BundleId) -> Result<Option<Bundle>>;
    async fn list_bundles(&self, filter: Predicate<'_, Bundle>) -> Result<Vec<Bundle>>;

    /// Replaces the bundle assignment of a plan.
    async fn put_plan_attr(&self, attr: PlanAttr) -> Result<()>;
    async fn get_plan_attr(&self, plan_id: PlanId) -> Result<Option<PlanAttr>>;

    async fn get_last_used_bundle(&self, scope: BundleScope) -> Result<Option<BundleId>>;
    /// Unconditionally points `scope` at `bundle`.
    async fn set_last_used_bundle(&self, scope: BundleScope, bundle: BundleId) -> Result<()>;
    /// Points `scope` at `new` only if it currently holds `expected`.
    ///
    /// Returns false, leaving the pointer untouched, when another writer got
    /// there first.
    async fn compare_and_swap_last_used_bundle(
        &self,
        scope: BundleScope,
        expected: Option<BundleId>,
        new: BundleId,
    ) -> Result<bool>;
}

/// Active bundles assigned to a plan, in the plan's allocation order.
///
/// Fails with [`DbaasError::NotFound`] when the plan has no bundle
/// assignment at all.
pub async fn active_bundles_for_plan(
    store: &dyn ResourceStore,
    plan_id: PlanId,
) -> Result<Vec<Bundle>> {
    let attr = store
        .get_plan_attr(plan_id)
        .await?
        .ok_or_else(|| DbaasError::not_found("plan attributes", plan_id))?;

    let mut bundles = Vec::with_capacity(attr.bundle_ids.len());
    for bundle_id in &attr.bundle_ids {
        match store.get_bundle(*bundle_id).await? {
            Some(bundle) if bundle.is_active => bundles.push(bundle),
            Some(_) => {}
            None => tracing::warn!("Plan {} references unknown bundle {}", plan_id, bundle_id),
        }
    }
    Ok(bundles)
}

/// Returns `base_name`, or the first free `base_name-N` when taken.
pub async fn unique_databaseinfra_name(
    store: &dyn ResourceStore,
    base_name: &str,
) -> Result<String> {
    let taken: Vec<String> = store
        .list_databaseinfras(&|_| true)
        .await?
        .into_iter()
        .map(|infra| infra.name)
        .collect();

    let mut name = base_name.to_string();
    let mut suffix = 0;
    while taken.iter().any(|existing| *existing == name) {
        suffix += 1;
        name = format!("{}-{}", base_name, suffix);
    }
    tracing::info!("databaseinfra unique name to be returned: {}", name);
    Ok(name)
}

/// Recomputes `last_vm_created` as the number of distinct hostnames among
/// the infra's instances and persists it.
pub async fn recount_last_vm_created(
    store: &dyn ResourceStore,
    infra: &mut DatabaseInfra,
) -> Result<u32> {
    let infra_id = infra.id;
    let instances = store
        .list_instances(&move |instance: &Instance| instance.databaseinfra_id == infra_id)
        .await?;

    let mut hostnames = std::collections::BTreeSet::new();
    for instance in instances {
        let host = store
            .get_host(instance.host_id)
            .await?
            .ok_or_else(|| DbaasError::not_found("host", instance.host_id))?;
        hostnames.insert(host.hostname);
    }

    infra.last_vm_created = hostnames.len() as u32;
    store.update_databaseinfra(infra).await?;
    Ok(infra.last_vm_created)
}
