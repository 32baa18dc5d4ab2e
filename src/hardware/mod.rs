//! Drive Size Catalog
//!
//! Physical drive and partition sizes of every known server, as measured on the
//! servers and copied into the site's `drive_configurations` directory. The
//! delta engine uses them to turn drives into ring weights.
//!
//! # Input
//!
//! ```yaml
//! ardana_drive_configuration:
//!   - hostname: standard-ccp-c1-m1-mgmt
//!     ipaddr: null
//!     drives:
//!       - name: /dev/sda
//!         bytes: 100000000
//!         partitions:
//!           - {partition: sda1, bytes: 100000000}
//!       - name: /dev/sdc
//!         bytes: 300000
//!         partitions:
//!           - {partition: sdc1, bytes: 100000}
//!           - {partition: sdc2, bytes: 200000}
//! ```
//!
//! A drive with at most one partition is used whole; the drive name stands
//! for both. A drive split into several partitions yields the drive and each
//! partition, none of them counting as a full drive.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::model::{null_as_default, DeviceRecord, GroupType};

/// Templated suffix of boot-adjusted physical volume names
const ROOT_SUFFIX: &str = "_root";

// =============================================================================
// Drive Configuration (one server)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Partition {
    pub partition: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Drive {
    pub name: String,
    pub bytes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partitions: Vec<Partition>,
}

/// Drive layout of one server
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfiguration {
    pub hostname: String,
    #[serde(default)]
    pub ipaddr: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub drives: Vec<Drive>,
}

/// Size of one named block device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveInfo {
    pub name: String,
    pub bytes: u64,
    /// False when the device is one of several partitions of a drive
    pub full_drive: bool,
}

impl DriveConfiguration {
    /// Every addressable drive and partition with its size
    pub fn drive_info(&self) -> Vec<DriveInfo> {
        let mut info = Vec::new();
        for drive in &self.drives {
            if drive.partitions.len() <= 1 {
                info.push(DriveInfo {
                    name: drive.name.clone(),
                    bytes: drive.bytes,
                    full_drive: true,
                });
                continue;
            }
            info.push(DriveInfo {
                name: drive.name.clone(),
                bytes: drive.bytes,
                full_drive: false,
            });
            for partition in &drive.partitions {
                info.push(DriveInfo {
                    name: format!("/dev/{}", partition.partition),
                    bytes: partition.bytes,
                    full_drive: false,
                });
            }
        }
        info
    }
}

// =============================================================================
// Drive Configurations (all servers)
// =============================================================================

/// Size of a swift device as far as the catalog knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSize {
    pub bytes: Option<u64>,
    pub full_drive: bool,
}

/// Drive sizes of every known server
#[derive(Debug, Clone, Default)]
pub struct DriveConfigurations {
    configurations: BTreeMap<String, DriveConfiguration>,
    drive_data: HashMap<(String, String), (u64, bool)>,
}

impl DriveConfigurations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, configuration: DriveConfiguration) {
        for info in configuration.drive_info() {
            self.drive_data.insert(
                (configuration.hostname.clone(), info.name),
                (info.bytes, info.full_drive),
            );
        }
        self.configurations
            .insert(configuration.hostname.clone(), configuration);
    }

    /// Add every entry of a `drive_configuration.yml` document
    pub fn load_model(&mut self, model: &Value) -> Result<usize> {
        let items = match model.get("ardana_drive_configuration") {
            Some(items) if !items.is_null() => items.clone(),
            _ => return Ok(0),
        };
        let configurations: Vec<DriveConfiguration> = serde_yaml::from_value(items)
            .map_err(|e| Error::validation(format!("Invalid drive configuration: {}", e)))?;
        let count = configurations.len();
        for configuration in configurations {
            self.add(configuration);
        }
        Ok(count)
    }

    pub fn configuration(&self, hostname: &str) -> Option<&DriveConfiguration> {
        self.configurations.get(hostname)
    }

    pub fn drive_data(&self, hostname: &str, name: &str) -> Option<(u64, bool)> {
        self.drive_data
            .get(&(hostname.to_string(), name.to_string()))
            .copied()
    }

    /// Size of a swift device and whether it owns its whole drive.
    ///
    /// A block device is looked up directly. A logical volume is the
    /// declared share of the sum of its physical volumes and always counts
    /// as a full drive.
    pub fn get_hw(&self, server_name: &str, device: &DeviceRecord) -> DeviceSize {
        let Some(block_devices) = &device.block_devices else {
            return DeviceSize {
                bytes: None,
                full_drive: false,
            };
        };

        match device.group_type {
            GroupType::Device => {
                let found = block_devices
                    .physicals
                    .first()
                    .and_then(|physical| self.drive_data(server_name, physical));
                match found {
                    Some((bytes, full_drive)) => DeviceSize {
                        bytes: Some(bytes),
                        full_drive,
                    },
                    None => DeviceSize {
                        bytes: None,
                        full_drive: false,
                    },
                }
            }
            GroupType::Lvm => {
                let total: u128 = block_devices
                    .physicals
                    .iter()
                    .map(|physical| physical.strip_suffix(ROOT_SUFFIX).unwrap_or(physical))
                    .filter_map(|physical| self.drive_data(server_name, physical))
                    .map(|(bytes, _)| u128::from(bytes))
                    .sum();
                let bytes = if total == 0 {
                    None
                } else {
                    parse_percent(&block_devices.percent).and_then(|pct| lvm_share(total, pct))
                };
                DeviceSize {
                    bytes,
                    full_drive: true,
                }
            }
        }
    }
}

/// `pct` percent of `total` bytes; `None` when it does not fit a `u64`
fn lvm_share(total: u128, pct: u64) -> Option<u64> {
    let share = total.checked_mul(u128::from(pct))? / 100;
    u64::try_from(share).ok()
}

/// Parse a share such as `20%`
fn parse_percent(percent: &str) -> Option<u64> {
    percent.split('%').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::tests::record;
    use crate::model::BlockDevices;

    const DRIVES: &str = r#"
ardana_drive_configuration:
  - hostname: host1
    ipaddr: null
    drives:
      - name: /dev/sda
        bytes: 100000000
        partitions:
          - {partition: sda1, bytes: 100000000}
      - name: /dev/sdb
        bytes: 200000000
        partitions: []
      - name: /dev/sdc
        bytes: 300000
        partitions:
          - {partition: sdc1, bytes: 100000}
          - {partition: sdc2, bytes: 200000}
"#;

    fn catalog() -> DriveConfigurations {
        let mut catalog = DriveConfigurations::new();
        let added = catalog
            .load_model(&serde_yaml::from_str(DRIVES).unwrap())
            .unwrap();
        assert_eq!(added, 1);
        catalog
    }

    fn device(group_type: GroupType, percent: &str, physicals: &[&str]) -> DeviceRecord {
        let mut device = record("object-0", "10.0.0.1", "disk0");
        device.group_type = group_type;
        device.block_devices = Some(BlockDevices {
            percent: percent.to_string(),
            physicals: physicals.iter().map(|s| s.to_string()).collect(),
        });
        device
    }

    #[test]
    fn test_drive_info() {
        let catalog = catalog();
        let info = catalog.configuration("host1").unwrap().drive_info();
        let names: Vec<_> = info.iter().map(|d| (d.name.as_str(), d.full_drive)).collect();
        assert_eq!(
            names,
            vec![
                ("/dev/sda", true),
                ("/dev/sdb", true),
                ("/dev/sdc", false),
                ("/dev/sdc1", false),
                ("/dev/sdc2", false),
            ]
        );
        assert_eq!(catalog.drive_data("host1", "/dev/sdc2"), Some((200000, false)));
        assert_eq!(catalog.drive_data("host2", "/dev/sda"), None);
    }

    #[test]
    fn test_block_device_size() {
        let catalog = catalog();
        let sdb = catalog.get_hw("host1", &device(GroupType::Device, "100%", &["/dev/sdb"]));
        assert_eq!(sdb, DeviceSize { bytes: Some(200000000), full_drive: true });

        let sdc1 = catalog.get_hw("host1", &device(GroupType::Device, "100%", &["/dev/sdc1"]));
        assert_eq!(sdc1, DeviceSize { bytes: Some(100000), full_drive: false });

        let missing = catalog.get_hw("host1", &device(GroupType::Device, "100%", &["/dev/sdx"]));
        assert_eq!(missing.bytes, None);
    }

    #[test]
    fn test_lvm_size() {
        let catalog = catalog();
        let lv = catalog.get_hw(
            "host1",
            &device(GroupType::Lvm, "20%", &["/dev/sda_root", "/dev/sdb"]),
        );
        assert_eq!(lv, DeviceSize { bytes: Some(60000000), full_drive: true });

        let unknown = catalog.get_hw("host1", &device(GroupType::Lvm, "20%", &["/dev/sdx"]));
        assert_eq!(unknown, DeviceSize { bytes: None, full_drive: true });

        let bad_percent = catalog.get_hw("host1", &device(GroupType::Lvm, "most", &["/dev/sdb"]));
        assert_eq!(bad_percent.bytes, None);
    }

    #[test]
    fn test_lvm_size_out_of_range() {
        let catalog = catalog();
        let large = catalog.get_hw(
            "host1",
            &device(GroupType::Lvm, "100000000000%", &["/dev/sdb"]),
        );
        assert_eq!(large.bytes, Some(200000000000000000));

        let too_large = catalog.get_hw(
            "host1",
            &device(GroupType::Lvm, "18446744073709551615%", &["/dev/sdb"]),
        );
        assert_eq!(too_large, DeviceSize { bytes: None, full_drive: true });
    }

    #[test]
    fn test_missing_key_adds_nothing() {
        let mut catalog = DriveConfigurations::new();
        let added = catalog
            .load_model(&serde_yaml::from_str("other: 1").unwrap())
            .unwrap();
        assert_eq!(added, 0);
    }
}
