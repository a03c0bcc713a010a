//! Identifier types shared across the control plane.
//!
//! Every persisted entity is addressed by a typed integer id. Id `0` means
//! "not saved yet"; the resource store assigns a real id on create.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl $name {
            /// Id carried by entities that were never persisted.
            pub const UNSAVED: Self = Self(0);

            /// Returns true once the store has assigned this id.
            pub fn is_saved(&self) -> bool {
                self.0 != 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of an [`Environment`](crate::models::Environment).
    EnvironmentId
);
entity_id!(
    /// Identifier of a database engine.
    EngineId
);
entity_id!(
    /// Identifier of a [`Plan`](crate::models::Plan).
    PlanId
);
entity_id!(
    /// Identifier of a [`Bundle`](crate::models::Bundle).
    BundleId
);
entity_id!(
    /// Identifier of a [`Host`](crate::models::Host).
    HostId
);
entity_id!(
    /// Identifier of a [`HostAttr`](crate::models::HostAttr).
    HostAttrId
);
entity_id!(
    /// Identifier of an [`Instance`](crate::models::Instance).
    InstanceId
);
entity_id!(
    /// Identifier of a [`DatabaseInfra`](crate::models::DatabaseInfra).
    DatabaseInfraId
);
entity_id!(
    /// Identifier of a disk offering.
    DiskOfferingId
);

/// Scope of a "last used bundle" pointer.
///
/// Plan-scoped pointers seed the first allocation of a run; infra-scoped
/// pointers remember where the latest VM of one database infra landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleScope {
    Plan(PlanId),
    DatabaseInfra(DatabaseInfraId),
}

impl std::fmt::Display for BundleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleScope::Plan(id) => write!(f, "plan:{}", id),
            BundleScope::DatabaseInfra(id) => write!(f, "databaseinfra:{}", id),
        }
    }
}
