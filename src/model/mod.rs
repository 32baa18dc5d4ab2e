//! Declarative cloud model
//!
//! Typed views over the configuration processor's output: ring
//! specifications, servers with their disk models, and the network bindings
//! of the swift services.

pub mod consumes;
pub mod device;
pub mod normalize;
pub mod ring_spec;
pub mod servers;

use std::fmt;

use serde::{Deserialize, Deserializer};

pub use consumes::{Consumes, NetworkBinding, RingType};
pub use device::{
    BlockDevices, DeviceKey, DeviceRecord, GroupType, Presence, Weight, DEFAULT_REGION_NAME,
};
pub use normalize::dash_to_underscore;
pub use ring_spec::{
    ControlPlaneRings, ErasureCodingPolicy, GroupLookup, ReplicationPolicy, RingSpecification,
    RingSpecifications, ServerGroupAssignment,
};
pub use servers::{Placement, Server, ServersModel};

/// A deployment site: one control plane of one cloud
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId {
    pub cloud: String,
    pub control_plane: String,
}

impl SiteId {
    pub fn new(cloud: impl Into<String>, control_plane: impl Into<String>) -> Self {
        Self {
            cloud: cloud.into(),
            control_plane: control_plane.into(),
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cloud {} control-plane {}", self.cloud, self.control_plane)
    }
}

/// Treat an explicit YAML `null` like an absent key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
