//! In-memory resource store.
//!
//! All tables live behind one `tokio::sync::RwLock`, so every single-entity
//! write (and the last-used-bundle compare-and-swap) is atomic with respect
//! to concurrent workflow runs sharing the store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Predicate, ResourceStore};
use crate::error::{DbaasError, Result};
use crate::models::{Bundle, DatabaseInfra, Host, HostAttr, Instance, Plan, PlanAttr};
use crate::types::{
    BundleId, BundleScope, DatabaseInfraId, HostAttrId, HostId, InstanceId, PlanId,
};

/// Entity with an integer primary key.
trait Record: Clone {
    const ENTITY: &'static str;

    fn key(&self) -> i64;
    fn set_key(&mut self, key: i64);
}

macro_rules! record {
    ($ty:ty, $id:ident, $entity:literal) => {
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn key(&self) -> i64 {
                self.id.0
            }

            fn set_key(&mut self, key: i64) {
                self.id = $id(key);
            }
        }
    };
}

record!(Host, HostId, "host");
record!(HostAttr, HostAttrId, "host attribute");
record!(Instance, InstanceId, "instance");
record!(DatabaseInfra, DatabaseInfraId, "databaseinfra");
record!(Plan, PlanId, "plan");
record!(Bundle, BundleId, "bundle");

/// One table: rows ordered by key plus an id sequence.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_key: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_key: 1,
        }
    }
}

impl<T: Record> Table<T> {
    fn create(&mut self, row: &mut T) -> i64 {
        let key = self.next_key;
        self.next_key += 1;
        row.set_key(key);
        self.rows.insert(key, row.clone());
        key
    }

    fn update(&mut self, row: &T) -> Result<()> {
        match self.rows.get_mut(&row.key()) {
            Some(stored) => {
                *stored = row.clone();
                Ok(())
            }
            None => Err(DbaasError::not_found(T::ENTITY, row.key())),
        }
    }

    fn delete(&mut self, key: i64) -> bool {
        self.rows.remove(&key).is_some()
    }

    fn get(&self, key: i64) -> Option<T> {
        self.rows.get(&key).cloned()
    }

    fn list(&self, filter: Predicate<'_, T>) -> Vec<T> {
        self.rows.values().filter(|row| filter(row)).cloned().collect()
    }
}

#[derive(Debug, Default)]
struct Tables {
    hosts: Table<Host>,
    host_attrs: Table<HostAttr>,
    instances: Table<Instance>,
    databaseinfras: Table<DatabaseInfra>,
    plans: Table<Plan>,
    bundles: Table<Bundle>,
    plan_attrs: HashMap<PlanId, PlanAttr>,
    last_used_bundles: HashMap<BundleScope, BundleId>,
}

/// Resource store kept entirely in process memory.
///
/// # Example
///
/// ```ignore
/// let store = MemoryStore::new();
/// let mut host = Host::new("db-01", "10.0.0.1");
/// let id = store.create_host(&mut host).await?;
/// assert_eq!(host.id, id);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn create_host(&self, host: &mut Host) -> Result<HostId> {
        Ok(HostId(self.tables.write().await.hosts.create(host)))
    }

    async fn update_host(&self, host: &Host) -> Result<()> {
        self.tables.write().await.hosts.update(host)
    }

    async fn delete_host(&self, id: HostId) -> Result<bool> {
        Ok(self.tables.write().await.hosts.delete(id.0))
    }

    async fn get_host(&self, id: HostId) -> Result<Option<Host>> {
        Ok(self.tables.read().await.hosts.get(id.0))
    }

    async fn list_hosts(&self, filter: Predicate<'_, Host>) -> Result<Vec<Host>> {
        Ok(self.tables.read().await.hosts.list(filter))
    }

    async fn create_host_attr(&self, attr: &mut HostAttr) -> Result<HostAttrId> {
        Ok(HostAttrId(self.tables.write().await.host_attrs.create(attr)))
    }

    async fn delete_host_attr(&self, id: HostAttrId) -> Result<bool> {
        Ok(self.tables.write().await.host_attrs.delete(id.0))
    }

    async fn get_host_attr_by_host(&self, host_id: HostId) -> Result<Option<HostAttr>> {
        let tables = self.tables.read().await;
        Ok(tables
            .host_attrs
            .rows
            .values()
            .find(|attr| attr.host_id == host_id)
            .cloned())
    }

    async fn list_host_attrs(&self, filter: Predicate<'_, HostAttr>) -> Result<Vec<HostAttr>> {
        Ok(self.tables.read().await.host_attrs.list(filter))
    }

    async fn create_instance(&self, instance: &mut Instance) -> Result<InstanceId> {
        Ok(InstanceId(self.tables.write().await.instances.create(instance)))
    }

    async fn update_instance(&self, instance: &Instance) -> Result<()> {
        self.tables.write().await.instances.update(instance)
    }

    async fn delete_instance(&self, id: InstanceId) -> Result<bool> {
        Ok(self.tables.write().await.instances.delete(id.0))
    }

    async fn get_instance(&self, id: InstanceId) -> Result<Option<Instance>> {
        Ok(self.tables.read().await.instances.get(id.0))
    }

    async fn list_instances(&self, filter: Predicate<'_, Instance>) -> Result<Vec<Instance>> {
        Ok(self.tables.read().await.instances.list(filter))
    }

    async fn create_databaseinfra(&self, infra: &mut DatabaseInfra) -> Result<DatabaseInfraId> {
        Ok(DatabaseInfraId(
            self.tables.write().await.databaseinfras.create(infra),
        ))
    }

    async fn update_databaseinfra(&self, infra: &DatabaseInfra) -> Result<()> {
        self.tables.write().await.databaseinfras.update(infra)
    }

    async fn get_databaseinfra(&self, id: DatabaseInfraId) -> Result<Option<DatabaseInfra>> {
        Ok(self.tables.read().await.databaseinfras.get(id.0))
    }

    async fn list_databaseinfras(
        &self,
        filter: Predicate<'_, DatabaseInfra>,
    ) -> Result<Vec<DatabaseInfra>> {
        Ok(self.tables.read().await.databaseinfras.list(filter))
    }

    async fn create_plan(&self, plan: &mut Plan) -> Result<PlanId> {
        Ok(PlanId(self.tables.write().await.plans.create(plan)))
    }

    async fn update_plan(&self, plan: &Plan) -> Result<()> {
        self.tables.write().await.plans.update(plan)
    }

    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        Ok(self.tables.read().await.plans.get(id.0))
    }

    async fn list_plans(&self, filter: Predicate<'_, Plan>) -> Result<Vec<Plan>> {
        Ok(self.tables.read().await.plans.list(filter))
    }

    async fn create_bundle(&self, bundle: &mut Bundle) -> Result<BundleId> {
        Ok(BundleId(self.tables.write().await.bundles.create(bundle)))
    }

    async fn update_bundle(&self, bundle: &Bundle) -> Result<()> {
        self.tables.write().await.bundles.update(bundle)
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Option<Bundle>> {
        Ok(self.tables.read().await.bundles.get(id.0))
    }

    async fn list_bundles(&self, filter: Predicate<'_, Bundle>) -> Result<Vec<Bundle>> {
        Ok(self.tables.read().await.bundles.list(filter))
    }

    async fn put_plan_attr(&self, attr: PlanAttr) -> Result<()> {
        self.tables.write().await.plan_attrs.insert(attr.plan_id, attr);
        Ok(())
    }

    async fn get_plan_attr(&self, plan_id: PlanId) -> Result<Option<PlanAttr>> {
        Ok(self.tables.read().await.plan_attrs.get(&plan_id).cloned())
    }

    async fn get_last_used_bundle(&self, scope: BundleScope) -> Result<Option<BundleId>> {
        Ok(self.tables.read().await.last_used_bundles.get(&scope).copied())
    }

    async fn set_last_used_bundle(&self, scope: BundleScope, bundle: BundleId) -> Result<()> {
        self.tables.write().await.last_used_bundles.insert(scope, bundle);
        Ok(())
    }

    async fn compare_and_swap_last_used_bundle(
        &self,
        scope: BundleScope,
        expected: Option<BundleId>,
        new: BundleId,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.last_used_bundles.get(&scope).copied() != expected {
            return Ok(false);
        }
        tables.last_used_bundles.insert(scope, new);
        Ok(true)
    }
}
