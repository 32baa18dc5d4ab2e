//! Device records
//!
//! A [`DeviceRecord`] describes one drive slot in one ring. Records come from
//! two places: the server/disk model (desired state) and builder files
//! (existing state). The delta engine merges both populations and tags each
//! record with a [`Presence`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Region name given to every device; only one region name is in use.
pub const DEFAULT_REGION_NAME: &str = "unknown";

// =============================================================================
// Presence / Group Type
// =============================================================================

/// Action to take on a device (or ring)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    #[default]
    Present,
    Add,
    Remove,
    SetWeight,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Presence::Present => "present",
            Presence::Add => "add",
            Presence::Remove => "remove",
            Presence::SetWeight => "set-weight",
        };
        f.write_str(s)
    }
}

/// How the drive is provisioned on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// A whole block device (or partition) from a device group
    #[default]
    Device,
    /// A logical volume from a volume group
    Lvm,
}

// =============================================================================
// Weight
// =============================================================================

/// Device weight, held to two decimal places.
///
/// Weights are compared after rounding so that values read back from a
/// builder listing (`2048.00`) equal values computed from drive sizes.
/// Serialized as a two-decimal string, accepting plain numbers on input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Weight(f64);

impl Weight {
    pub const ZERO: Weight = Weight(0.0);

    pub fn new(value: f64) -> Self {
        Weight((value * 100.0).round() / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Weight in hundredths, the unit all comparisons use
    fn hundredths(self) -> i64 {
        (self.0 * 100.0).round() as i64
    }
}

impl PartialEq for Weight {
    fn eq(&self, other: &Self) -> bool {
        self.hundredths() == other.hundredths()
    }
}

impl Eq for Weight {}

impl PartialOrd for Weight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Weight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hundredths().cmp(&other.hundredths())
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<f64> for Weight {
    fn from(value: f64) -> Self {
        Weight::new(value)
    }
}

impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Weight::new(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Weight::new)
                .map_err(|_| serde::de::Error::custom(format!("invalid weight: {}", s))),
        }
    }
}

// =============================================================================
// Device Record
// =============================================================================

/// Underlying storage of a drive, used to size it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockDevices {
    /// Share of the physical volumes, e.g. `100%`
    pub percent: String,
    pub physicals: Vec<String>,
}

/// Identity of a device: (region name, ring, server ip, drive name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceKey {
    pub region_name: String,
    pub ring_name: String,
    pub server_ip: String,
    pub swift_drive_name: String,
}

/// One drive slot in one ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceRecord {
    #[serde(default = "default_region_name")]
    pub region_name: String,

    pub ring_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub server_groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_names: Vec<String>,

    pub server_ip: String,
    pub server_bind_port: u16,

    #[serde(default)]
    pub replication_ip: Option<String>,
    #[serde(default)]
    pub replication_bind_port: Option<u16>,

    #[serde(default = "default_group_id")]
    pub region_id: i64,
    #[serde(default = "default_group_id")]
    pub zone_id: i64,

    /// Ring-visible drive name, e.g. `disk3` or `lvm0`
    pub swift_drive_name: String,

    /// Block device path; only known for devices from the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default)]
    pub group_type: GroupType,

    #[serde(default)]
    pub presence: Presence,

    #[serde(default)]
    pub current_weight: Weight,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<Weight>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_weight: Option<Weight>,

    #[serde(default)]
    pub balance: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_devices: Option<BlockDevices>,
}

fn default_region_name() -> String {
    DEFAULT_REGION_NAME.to_string()
}

fn default_group_id() -> i64 {
    1
}

impl DeviceRecord {
    /// Identity and canonical sort key
    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            region_name: self.region_name.clone(),
            ring_name: self.ring_name.clone(),
            server_ip: self.server_ip.clone(),
            swift_drive_name: self.swift_drive_name.clone(),
        }
    }

    pub fn is_same_device(&self, other: &DeviceRecord) -> bool {
        self.region_name == other.region_name
            && self.ring_name == other.ring_name
            && self.server_ip == other.server_ip
            && self.swift_drive_name == other.swift_drive_name
    }

    /// Describe a zone or region change against the existing device
    pub fn bad_change(&self, existing: &DeviceRecord) -> Option<String> {
        if self.zone_id != existing.zone_id {
            return Some(format!(
                "swift-zone id from {} to {}",
                existing.zone_id, self.zone_id
            ));
        }
        if self.region_id != existing.region_id {
            return Some(format!(
                "swift-region id from {} to {}",
                existing.region_id, self.region_id
            ));
        }
        None
    }

    /// Meta string, falling back to `server:drive:device`
    pub fn meta(&self) -> String {
        if let Some(meta) = &self.meta {
            return meta.clone();
        }
        format!(
            "{}:{}:{}",
            self.server_name.as_deref().unwrap_or(""),
            self.swift_drive_name,
            self.device_name.as_deref().unwrap_or("")
        )
    }

    /// Fill in defaults for records loaded from a delta file or builder
    pub fn apply_defaults(&mut self) {
        if self.region_name.is_empty() {
            self.region_name = default_region_name();
        }
        if self.meta.is_none() && self.device_name.is_some() {
            self.meta = Some(self.meta());
        }
    }

    pub fn replication_ip(&self) -> &str {
        self.replication_ip.as_deref().unwrap_or(&self.server_ip)
    }

    pub fn replication_bind_port(&self) -> u16 {
        self.replication_bind_port.unwrap_or(self.server_bind_port)
    }

    /// Weight the device will have after the delta is applied
    pub fn planned_weight(&self) -> Weight {
        self.target_weight.unwrap_or(self.current_weight)
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} ({}) r{}z{} {} weight {}",
            self.ring_name,
            self.server_ip,
            self.swift_drive_name,
            self.meta(),
            self.region_id,
            self.zone_id,
            self.presence,
            self.current_weight
        )
    }
}
