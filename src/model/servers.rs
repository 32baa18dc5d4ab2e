//! Server and disk model
//!
//! Servers come from `control_plane_servers` (or the legacy
//! `global.all_servers`) of every site. Each server carries a disk model
//! whose device groups and logical volumes may be consumed by swift:
//!
//! ```yaml
//! - ardana_ansible_host: standard-ccp-c1-m1-mgmt
//!   network_names: [standard-ccp-c1-m1-mgmt, standard-ccp-c1-m1-obj]
//!   server_group_list: [AZ1, RACK1]
//!   pass_through:
//!     swift: {drain: true}
//!   disk_model:
//!     name: DISK_SET_CONTROLLER
//!     device_groups:
//!       - name: swiftobj
//!         devices: [{name: /dev/sdc}, {name: /dev/sdd}]
//!         consumer:
//!           name: swift
//!           attrs:
//!             rings: [object-0, {name: object-1}]
//! ```
//!
//! [`ServersModel::iter_devices`] flattens this into one [`DeviceRecord`]
//! per (drive, ring).

use std::collections::HashMap;

use serde::Deserialize;
use serde_yaml::Value;

use super::consumes::Consumes;
use super::device::{BlockDevices, DeviceRecord, GroupType, Presence, Weight, DEFAULT_REGION_NAME};
use super::{null_as_default, SiteId};
use crate::error::{Error, Result};

/// Prefix of generated block device drive names
pub const DISK_PREFIX: &str = "disk";
/// Prefix of generated logical volume drive names
pub const LVM_PREFIX: &str = "lvm";

const SWIFT_CONSUMER: &str = "swift";

// =============================================================================
// Disk Model
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskModel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_groups: Vec<DeviceGroup>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volume_groups: Vec<VolumeGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub devices: Vec<DiskDevice>,
    #[serde(default)]
    pub consumer: Option<Consumer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskDevice {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeGroup {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub physical_volumes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logical_volumes: Vec<LogicalVolume>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogicalVolume {
    pub name: String,
    /// Share of the volume group, e.g. `20%`
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub consumer: Option<Consumer>,
}

/// Consumer of a device group or logical volume.
///
/// Only swift consumers are interpreted; other consumers' attrs are opaque.
#[derive(Debug, Clone, Deserialize)]
pub struct Consumer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: Option<Value>,
}

impl Consumer {
    fn is_swift(&self) -> bool {
        self.name.as_deref() == Some(SWIFT_CONSUMER)
    }

    /// Ring names; entries are either a plain name or `{name: ...}`
    fn ring_names(&self) -> Vec<String> {
        self.attrs
            .as_ref()
            .and_then(|attrs| attrs.get("rings"))
            .and_then(Value::as_sequence)
            .map(|rings| {
                rings
                    .iter()
                    .filter_map(|ring| {
                        ring.as_str()
                            .or_else(|| ring.get("name").and_then(Value::as_str))
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate(&self, what: &str, owner: Option<&str>, disk_model: Option<&str>) -> Result<()> {
        let owner = owner.unwrap_or("<unnamed>");
        let disk_model = disk_model.unwrap_or("<unnamed>");
        let attrs = match &self.attrs {
            Some(attrs) if !attrs.is_null() => attrs,
            _ => {
                return Err(Error::validation(format!(
                    "The attrs item is missing from {} {} in disk model {}",
                    what, owner, disk_model
                )))
            }
        };
        let has_rings = attrs
            .get("rings")
            .and_then(Value::as_sequence)
            .map_or(false, |rings| !rings.is_empty());
        if !has_rings {
            return Err(Error::validation(format!(
                "The rings item is missing from {} {} in disk model {}",
                what, owner, disk_model
            )));
        }
        Ok(())
    }
}

fn swift_consumer(consumer: &Option<Consumer>) -> Option<&Consumer> {
    consumer.as_ref().filter(|c| c.is_swift())
}

// =============================================================================
// Server
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ardana_ansible_host: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub network_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub server_group_list: Vec<String>,
    #[serde(default)]
    pub disk_model: DiskModel,
    #[serde(default)]
    pub pass_through: Option<Value>,
    #[serde(skip)]
    pub site: Option<SiteId>,
}

impl Server {
    /// Ansible host name, falling back to the server name
    pub fn server_name(&self) -> &str {
        self.ardana_ansible_host
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("")
    }

    fn swift_pass_through(&self, item: &str) -> bool {
        self.pass_through
            .as_ref()
            .and_then(|p| p.get(SWIFT_CONSUMER))
            .and_then(|swift| swift.get(item))
            .map_or(false, is_truthy)
    }

    fn validate(&self) -> Result<()> {
        if self.server_name().is_empty() {
            return Err(Error::validation(
                "A server in the model has neither ardana_ansible_host nor name",
            ));
        }
        let disk_model = self.disk_model.name.as_deref();
        for group in &self.disk_model.device_groups {
            if let Some(consumer) = swift_consumer(&group.consumer) {
                consumer.validate("device-groups", group.name.as_deref(), disk_model)?;
            }
        }
        for volume_group in &self.disk_model.volume_groups {
            for volume in &volume_group.logical_volumes {
                if let Some(consumer) = swift_consumer(&volume.consumer) {
                    consumer.validate("logical volume", Some(&volume.name), disk_model)?;
                }
            }
        }
        Ok(())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false") && !s.eq_ignore_ascii_case("no"),
        Value::Sequence(s) => !s.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(t) => is_truthy(&t.value),
    }
}

// =============================================================================
// Placements
// =============================================================================

/// A swift drive of a server assigned to one ring, before network binding
#[derive(Debug, Clone)]
pub struct Placement<'a> {
    pub server: &'a Server,
    pub ring_name: String,
    pub swift_drive_name: String,
    pub device_name: String,
    pub group_type: GroupType,
    pub block_devices: BlockDevices,
}

fn device_group_placements(server: &Server) -> impl Iterator<Item = Placement<'_>> + '_ {
    server
        .disk_model
        .device_groups
        .iter()
        .filter_map(|group| swift_consumer(&group.consumer).map(|c| (group, c)))
        .flat_map(|(group, consumer)| group.devices.iter().map(move |device| (consumer, device)))
        .enumerate()
        .flat_map(move |(index, (consumer, device))| {
            consumer.ring_names().into_iter().map(move |ring_name| Placement {
                server,
                ring_name,
                swift_drive_name: format!("{}{}", DISK_PREFIX, index),
                device_name: device.name.clone(),
                group_type: GroupType::Device,
                block_devices: BlockDevices {
                    percent: "100%".to_string(),
                    physicals: vec![device.name.clone()],
                },
            })
        })
}

fn volume_group_placements(server: &Server) -> impl Iterator<Item = Placement<'_>> + '_ {
    server
        .disk_model
        .volume_groups
        .iter()
        .flat_map(|vg| vg.logical_volumes.iter().map(move |lv| (vg, lv)))
        .filter_map(|(vg, lv)| swift_consumer(&lv.consumer).map(|c| (vg, lv, c)))
        .enumerate()
        .flat_map(move |(index, (vg, lv, consumer))| {
            consumer.ring_names().into_iter().map(move |ring_name| Placement {
                server,
                ring_name,
                swift_drive_name: format!("{}{}", LVM_PREFIX, index),
                device_name: format!("/dev/{}/{}", vg.name, lv.name),
                group_type: GroupType::Lvm,
                block_devices: BlockDevices {
                    percent: lv.size.clone().unwrap_or_default(),
                    physicals: vg.physical_volumes.clone(),
                },
            })
        })
}

// =============================================================================
// Servers Model
// =============================================================================

/// All servers of all sites plus their network bindings
#[derive(Debug, Clone, Default)]
pub struct ServersModel {
    servers: Vec<Server>,
    consumes: Consumes,
}

impl ServersModel {
    pub fn new(consumes: Consumes) -> Self {
        Self {
            servers: Vec::new(),
            consumes,
        }
    }

    /// Add the servers of one site, validating their disk models.
    pub fn add_servers(&mut self, site: &SiteId, servers: Value) -> Result<()> {
        let servers: Vec<Server> = serde_yaml::from_value(servers)
            .map_err(|e| Error::validation(format!("Invalid server list for {}: {}", site, e)))?;
        for mut server in servers {
            server.validate()?;
            server.site = Some(site.clone());
            self.servers.push(server);
        }
        Ok(())
    }

    pub fn set_consumes(&mut self, consumes: Consumes) {
        self.consumes = consumes;
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Every swift drive × ring, numbered per server in declaration order.
    pub fn iter_placements(&self) -> impl Iterator<Item = Placement<'_>> + '_ {
        let groups = self.servers.iter().flat_map(|s| device_group_placements(s));
        let volumes = self.servers.iter().flat_map(|s| volume_group_placements(s));
        groups.chain(volumes)
    }

    /// Desired device records.
    ///
    /// Recomputed from the model on every call. Placements with no network
    /// binding for their ring are not yielded; see [`Self::unbound_placements`].
    pub fn iter_devices(&self) -> impl Iterator<Item = DeviceRecord> + '_ {
        self.iter_placements()
            .filter_map(move |placement| self.device_record(placement))
    }

    /// Placements dropped by [`Self::iter_devices`] for lack of a binding
    pub fn unbound_placements(&self) -> impl Iterator<Item = Placement<'_>> + '_ {
        self.iter_placements().filter(move |p| {
            self.consumes
                .network_binding(&p.ring_name, &p.server.network_names)
                .is_none()
        })
    }

    fn device_record(&self, placement: Placement<'_>) -> Option<DeviceRecord> {
        let server = placement.server;
        let binding = self
            .consumes
            .network_binding(&placement.ring_name, &server.network_names)?;
        let server_name = server.server_name().to_string();
        let meta = format!(
            "{}:{}:{}",
            server_name, placement.swift_drive_name, placement.device_name
        );
        Some(DeviceRecord {
            region_name: DEFAULT_REGION_NAME.to_string(),
            ring_name: placement.ring_name,
            server_name: Some(server_name),
            server_groups: server.server_group_list.clone(),
            network_names: server.network_names.clone(),
            server_ip: binding.ip_address.clone(),
            server_bind_port: binding.port,
            replication_ip: Some(binding.ip_address.clone()),
            replication_bind_port: Some(binding.port),
            region_id: 1,
            zone_id: 1,
            swift_drive_name: placement.swift_drive_name,
            device_name: Some(placement.device_name),
            group_type: placement.group_type,
            presence: Presence::Present,
            current_weight: Weight::ZERO,
            target_weight: None,
            model_weight: None,
            balance: 0.0,
            meta: Some(meta),
            block_devices: Some(placement.block_devices),
        })
    }

    /// Number of desired devices in each ring
    pub fn device_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for device in self.iter_devices() {
            *counts.entry(device.ring_name).or_insert(0) += 1;
        }
        counts
    }

    fn server(&self, server_name: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.server_name() == server_name)
    }

    pub fn server_draining(&self, server_name: &str) -> bool {
        self.server(server_name)
            .map_or(false, |s| s.swift_pass_through("drain"))
    }

    pub fn server_removing(&self, server_name: &str) -> bool {
        self.server(server_name)
            .map_or(false, |s| s.swift_pass_through("remove"))
    }
}
