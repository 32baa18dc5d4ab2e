//! Ring Delta
//!
//! The outcome of one reconciliation: every ring with the actions pending on
//! it, and every device tagged with its [`Presence`](crate::model::Presence).
//! A delta can be persisted and replayed later, so `--make-delta` and
//! `--rebalance` may run as separate invocations.
//!
//! Persisted layout:
//!
//! ```yaml
//! delta_rings:
//!   - ring_name: account
//!     ring_specification: { name: account, ... }
//! delta_ring_actions:
//!   - ring_name: account
//!     action: [present, set-replica-count]
//! delta_devices:
//!   - { ring_name: account, server_ip: 192.168.245.4, ... }
//! primary: false            # only written for a secondary site
//! ```

mod report;

pub use report::{human_size, ReportDetail, ReportOptions};

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{DeviceRecord, RingSpecification};

// =============================================================================
// Ring Actions
// =============================================================================

/// Action pending on a whole ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RingAction {
    /// The ring has no builder file yet
    Add,
    Present,
    SetReplicaCount,
    SetMinPartHours,
    /// The ring is no longer in the model
    Remove,
}

impl fmt::Display for RingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RingAction::Add => "add",
            RingAction::Present => "present",
            RingAction::SetReplicaCount => "set-replica-count",
            RingAction::SetMinPartHours => "set-min-part-hours",
            RingAction::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// A ring of the delta and its pending actions
#[derive(Debug, Clone, PartialEq)]
pub struct RingEntry {
    pub specification: RingSpecification,
    pub actions: Vec<RingAction>,
}

impl RingEntry {
    pub fn has_action(&self, action: RingAction) -> bool {
        self.actions.contains(&action)
    }

    /// The ring will be created rather than modified
    pub fn is_new(&self) -> bool {
        self.has_action(RingAction::Add)
    }
}

// =============================================================================
// Delta File Format
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaFormat {
    #[default]
    Yaml,
    Json,
}

impl FromStr for DeltaFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(DeltaFormat::Yaml),
            "json" => Ok(DeltaFormat::Json),
            other => Err(format!("format must be yaml or json, not '{}'", other)),
        }
    }
}

impl fmt::Display for DeltaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaFormat::Yaml => f.write_str("yaml"),
            DeltaFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StagedRing {
    ring_name: String,
    ring_specification: RingSpecification,
}

#[derive(Debug, Serialize, Deserialize)]
struct StagedRingAction {
    ring_name: String,
    action: Vec<RingAction>,
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StagedDelta {
    #[serde(default)]
    delta_rings: Vec<StagedRing>,
    #[serde(default)]
    delta_ring_actions: Vec<StagedRingAction>,
    #[serde(default)]
    delta_devices: Vec<DeviceRecord>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    primary: bool,
}

// =============================================================================
// Ring Delta
// =============================================================================

/// Rings and devices in actionable terms
#[derive(Debug, Clone, PartialEq)]
pub struct RingDelta {
    /// Rings keyed by name; iteration (and so command emission) is by name
    pub rings: BTreeMap<String, RingEntry>,
    pub devices: Vec<DeviceRecord>,
    /// False on a secondary site, where rings are never mutated
    pub primary: bool,
}

impl Default for RingDelta {
    fn default() -> Self {
        Self {
            rings: BTreeMap::new(),
            devices: Vec::new(),
            primary: true,
        }
    }
}

impl RingDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a ring with its first action
    pub fn register_ring(&mut self, specification: RingSpecification, action: RingAction) {
        self.rings.insert(
            specification.name.clone(),
            RingEntry {
                specification,
                actions: vec![action],
            },
        );
    }

    pub fn push_action(&mut self, ring_name: &str, action: RingAction) {
        if let Some(entry) = self.rings.get_mut(ring_name) {
            entry.actions.push(action);
        }
    }

    pub fn ring(&self, ring_name: &str) -> Option<&RingEntry> {
        self.rings.get(ring_name)
    }

    pub fn ring_mut(&mut self, ring_name: &str) -> Option<&mut RingEntry> {
        self.rings.get_mut(ring_name)
    }

    pub fn append_device(&mut self, device: DeviceRecord) {
        self.devices.push(device);
    }

    /// Order devices by identity for deterministic output
    pub fn sort(&mut self) {
        self.devices.sort_by_key(DeviceRecord::key);
    }

    /// Devices of one ring, in delta order
    pub fn ring_devices<'a>(&'a self, ring_name: &'a str) -> impl Iterator<Item = &'a DeviceRecord> {
        self.devices.iter().filter(move |d| d.ring_name == ring_name)
    }

    fn to_staged(&self) -> StagedDelta {
        StagedDelta {
            delta_rings: self
                .rings
                .iter()
                .map(|(name, entry)| StagedRing {
                    ring_name: name.clone(),
                    ring_specification: entry.specification.clone(),
                })
                .collect(),
            delta_ring_actions: self
                .rings
                .iter()
                .map(|(name, entry)| StagedRingAction {
                    ring_name: name.clone(),
                    action: entry.actions.clone(),
                })
                .collect(),
            delta_devices: self.devices.clone(),
            primary: self.primary,
        }
    }

    fn from_staged(staged: StagedDelta) -> Result<Self> {
        let mut actions: BTreeMap<String, Vec<RingAction>> = staged
            .delta_ring_actions
            .into_iter()
            .map(|a| (a.ring_name, a.action))
            .collect();
        let mut rings = BTreeMap::new();
        for staged_ring in staged.delta_rings {
            let actions = actions.remove(&staged_ring.ring_name).ok_or_else(|| {
                Error::Config(format!(
                    "ring delta has no actions for ring {}",
                    staged_ring.ring_name
                ))
            })?;
            rings.insert(
                staged_ring.ring_name,
                RingEntry {
                    specification: staged_ring.ring_specification,
                    actions,
                },
            );
        }
        if let Some(ring_name) = actions.keys().next() {
            return Err(Error::Config(format!(
                "ring delta has actions for unknown ring {}",
                ring_name
            )));
        }
        let mut devices = staged.delta_devices;
        devices.iter_mut().for_each(DeviceRecord::apply_defaults);
        Ok(Self {
            rings,
            devices,
            primary: staged.primary,
        })
    }

    /// Serialize the delta
    pub fn dump(&self, format: DeltaFormat) -> Result<String> {
        let staged = self.to_staged();
        Ok(match format {
            DeltaFormat::Yaml => serde_yaml::to_string(&staged)?,
            DeltaFormat::Json => {
                let mut text = serde_json::to_string_pretty(&staged)?;
                text.push('\n');
                text
            }
        })
    }

    /// Parse a serialized delta
    pub fn load(text: &str, format: DeltaFormat) -> Result<Self> {
        let staged: StagedDelta = match format {
            DeltaFormat::Yaml => serde_yaml::from_str(text)?,
            DeltaFormat::Json => serde_json::from_str(text)?,
        };
        Self::from_staged(staged)
    }

    pub fn write_to<W: Write>(&self, mut writer: W, format: DeltaFormat) -> Result<()> {
        writer.write_all(self.dump(format)?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R, format: DeltaFormat) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::load(&text, format)
    }
}
