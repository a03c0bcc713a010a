//! Explicit defaulting rules applied by callers before persisting entities.

use crate::error::Result;
use crate::models::{DatabaseInfra, Plan};
use crate::storage::ResourceStore;

/// Keeps `plan` the only default plan of its engine.
///
/// When `plan.is_default` is set, every other default plan of the same
/// engine is unmarked and persisted. Returns how many plans were unmarked.
/// Call before creating or updating `plan` itself.
pub async fn apply_plan_defaults(store: &dyn ResourceStore, plan: &Plan) -> Result<usize> {
    if !plan.is_default {
        return Ok(0);
    }

    let engine_id = plan.engine_id;
    let plan_id = plan.id;
    let others = store
        .list_plans(&move |other: &Plan| {
            other.is_default && other.engine_id == engine_id && other.id != plan_id
        })
        .await?;

    for mut other in others.iter().cloned() {
        tracing::info!("marking plan {} attr is_default to False", other.name);
        other.is_default = false;
        store.update_plan(&other).await?;
    }
    Ok(others.len())
}

/// Fills in the plan of an infra created without one.
///
/// The engine's default plan is used, together with its disk offering.
/// Returns true when a plan was assigned.
pub async fn apply_databaseinfra_defaults(
    store: &dyn ResourceStore,
    infra: &mut DatabaseInfra,
) -> Result<bool> {
    if infra.plan_id.is_some() {
        return Ok(false);
    }

    let engine_id = infra.engine_id;
    let default_plan = store
        .list_plans(&move |plan: &Plan| plan.is_default && plan.engine_id == engine_id)
        .await?
        .into_iter()
        .next();

    match default_plan {
        Some(plan) => {
            tracing::warn!(
                "No plan specified, using default plan ({}) for engine {}",
                plan.name,
                engine_id
            );
            infra.plan_id = Some(plan.id);
            infra.disk_offering_id = plan.disk_offering_id;
            Ok(true)
        }
        None => {
            tracing::debug!("No default plan found for engine {}", engine_id);
            Ok(false)
        }
    }
}
