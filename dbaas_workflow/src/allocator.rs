//! Bundle rotation for new virtual machines.
//!
//! VMs of one plan are spread across its active bundles round robin. The
//! rotation is remembered per plan, so consecutive runs keep spreading,
//! and per database infra, to record where an infra last deployed.

use std::sync::Arc;

use dbaas_core::{Bundle, BundleId, BundleScope, DatabaseInfra, Plan, ResourceStore};

use crate::error::AllocationError;

/// Bundle after `current` in `bundles`, wrapping from last to first.
///
/// Returns the first bundle when `current` is not among `bundles`, e.g.
/// because it was deactivated since it was last used.
pub fn get_next_bundle(current: BundleId, bundles: &[Bundle]) -> Result<Bundle, AllocationError> {
    let first = bundles.first().ok_or(AllocationError::NoActiveBundles)?;
    let next = match bundles.iter().position(|bundle| bundle.id == current) {
        Some(index) => &bundles[(index + 1) % bundles.len()],
        None => first,
    };
    Ok(next.clone())
}

/// Advances `chosen` one extra step when it sits on the source network.
///
/// Only one extra step is taken; if the next bundle shares the network
/// too, it is used anyway.
pub fn avoid_source_network(
    chosen: Bundle,
    source_network: &str,
    bundles: &[Bundle],
) -> Result<Bundle, AllocationError> {
    if chosen.network_id != source_network {
        return Ok(chosen);
    }
    tracing::debug!(
        "Bundle {} shares network {} with the source vm, skipping it",
        chosen,
        source_network
    );
    get_next_bundle(chosen.id, bundles)
}

/// Store-backed bundle rotation.
#[derive(Clone)]
pub struct BundleAllocator {
    store: Arc<dyn ResourceStore>,
    max_retries: u32,
}

impl BundleAllocator {
    /// Creates an allocator.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the last-used pointers
    /// * `max_retries` - Attempts at advancing a plan pointer under contention
    pub fn new(store: Arc<dyn ResourceStore>, max_retries: u32) -> Self {
        Self {
            store,
            max_retries: max_retries.max(1),
        }
    }

    /// Next bundle for `plan`, advancing the plan's last-used pointer.
    ///
    /// Without a pointer the first bundle is used. The pointer is moved with
    /// compare-and-swap; when another run moves it first, the rotation is
    /// recomputed from the new value.
    ///
    /// # Returns
    ///
    /// - `Ok(Bundle)` - Bundle now recorded as the plan's last used
    /// - `Err(AllocationError::NoActiveBundles)` - If `bundles` is empty
    /// - `Err(AllocationError::Contention)` - If every attempt lost its race
    pub async fn get_next_infra_bundle(
        &self,
        plan: &Plan,
        bundles: &[Bundle],
    ) -> Result<Bundle, AllocationError> {
        let first = bundles.first().ok_or(AllocationError::NoActiveBundles)?;
        let scope = BundleScope::Plan(plan.id);

        for attempt in 1..=self.max_retries {
            let last = self.store.get_last_used_bundle(scope).await?;
            let next = match last {
                Some(current) => get_next_bundle(current, bundles)?,
                None => first.clone(),
            };

            if self
                .store
                .compare_and_swap_last_used_bundle(scope, last, next.id)
                .await?
            {
                tracing::debug!("Plan {} rotated to bundle {}", plan.name, next);
                return Ok(next);
            }
            tracing::debug!(
                "Last used bundle of {} moved concurrently (attempt {}/{})",
                scope,
                attempt,
                self.max_retries
            );
        }

        Err(AllocationError::Contention {
            scope,
            attempts: self.max_retries,
        })
    }

    /// Records `bundle` as the infra's last-used bundle.
    pub async fn set_last_infra_bundle(
        &self,
        infra: &DatabaseInfra,
        bundle: &Bundle,
    ) -> Result<(), AllocationError> {
        self.store
            .set_last_used_bundle(BundleScope::DatabaseInfra(infra.id), bundle.id)
            .await?;
        Ok(())
    }

    /// Bundle for the next VM of a run over several active bundles.
    ///
    /// The first VM of a run continues the plan rotation; later VMs follow
    /// the bundle chosen for the one before them. Either way the choice is
    /// moved off `source_network` once.
    pub async fn rotate(
        &self,
        previous: Option<&Bundle>,
        plan: &Plan,
        bundles: &[Bundle],
        source_network: &str,
    ) -> Result<Bundle, AllocationError> {
        let chosen = match previous {
            None => self.get_next_infra_bundle(plan, bundles).await?,
            Some(previous) => get_next_bundle(previous.id, bundles)?,
        };
        avoid_source_network(chosen, source_network, bundles)
    }
}
