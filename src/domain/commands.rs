//! Ring Commands
//!
//! Structured form of the `swift-ring-builder` invocations the supervisor
//! issues. Commands are built and asserted on as values and only rendered to
//! program arguments at the tool boundary.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::Weight;

/// Name of the external ring tool
pub const RING_BUILDER_PROGRAM: &str = "swift-ring-builder";

/// Seed passed to every rebalance so repeated runs place partitions alike
pub const REBALANCE_SEED: u32 = 999;

/// One operation against a builder file
#[derive(Debug, Clone, PartialEq)]
pub enum RingOperation {
    Create {
        partition_power: u32,
        replicas: f64,
        min_part_hours: u32,
    },
    SetReplicas {
        replicas: f64,
    },
    SetMinPartHours {
        hours: u32,
    },
    AddDevice {
        region: i64,
        zone: i64,
        ip: String,
        port: u16,
        replication_ip: String,
        replication_port: u16,
        device: String,
        meta: String,
        weight: Weight,
    },
    SetWeight {
        ip: String,
        device: String,
        weight: Weight,
    },
    RemoveDevice {
        ip: String,
        device: String,
    },
    PretendMinPartHoursPassed,
    Rebalance {
        seed: u32,
    },
}

/// A ring operation bound to its builder file
#[derive(Debug, Clone, PartialEq)]
pub struct RingCommand {
    pub builder_file: PathBuf,
    pub operation: RingOperation,
}

impl RingCommand {
    pub fn new(builder_file: impl Into<PathBuf>, operation: RingOperation) -> Self {
        Self {
            builder_file: builder_file.into(),
            operation,
        }
    }

    /// Builder file of a ring inside a builder directory
    pub fn builder_file(builder_dir: &Path, ring_name: &str) -> PathBuf {
        builder_dir.join(format!("{}.builder", ring_name))
    }

    pub fn program(&self) -> &'static str {
        RING_BUILDER_PROGRAM
    }

    /// Arguments passed to the ring tool, builder file first
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.builder_file.display().to_string()];
        match &self.operation {
            RingOperation::Create {
                partition_power,
                replicas,
                min_part_hours,
            } => {
                args.push("create".to_string());
                args.push(partition_power.to_string());
                args.push(format_replicas(*replicas));
                args.push(min_part_hours.to_string());
            }
            RingOperation::SetReplicas { replicas } => {
                args.push("set_replicas".to_string());
                args.push(format_replicas(*replicas));
            }
            RingOperation::SetMinPartHours { hours } => {
                args.push("set_min_part_hours".to_string());
                args.push(hours.to_string());
            }
            RingOperation::AddDevice {
                region,
                zone,
                ip,
                port,
                replication_ip,
                replication_port,
                device,
                meta,
                weight,
            } => {
                args.push("add".to_string());
                for (flag, value) in [
                    ("--region", region.to_string()),
                    ("--zone", zone.to_string()),
                    ("--ip", ip.clone()),
                    ("--port", port.to_string()),
                    ("--replication-port", replication_port.to_string()),
                    ("--replication-ip", replication_ip.clone()),
                    ("--device", device.clone()),
                    ("--meta", meta.clone()),
                    ("--weight", weight.to_string()),
                ] {
                    args.push(flag.to_string());
                    args.push(value);
                }
            }
            RingOperation::SetWeight { ip, device, weight } => {
                args.push("set_weight".to_string());
                args.push(search_value(ip, device));
                args.push(weight.to_string());
            }
            RingOperation::RemoveDevice { ip, device } => {
                args.push("remove".to_string());
                args.push(search_value(ip, device));
            }
            RingOperation::PretendMinPartHoursPassed => {
                args.push("pretend_min_part_hours_passed".to_string());
            }
            RingOperation::Rebalance { seed } => {
                args.push("rebalance".to_string());
                args.push(seed.to_string());
            }
        }
        args
    }

    /// Ring name, from the builder file stem
    pub fn ring_name(&self) -> String {
        self.builder_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for RingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program(), self.args().join(" "))
    }
}

/// Device search value understood by the ring tool: `<ip>/<device>`
fn search_value(ip: &str, device: &str) -> String {
    if ip.contains(':') {
        format!("[{}]/{}", ip, device)
    } else {
        format!("{}/{}", ip, device)
    }
}

/// Whole replica counts print without a fraction
fn format_replicas(replicas: f64) -> String {
    if replicas.fract() == 0.0 {
        format!("{}", replicas as i64)
    } else {
        format!("{}", replicas)
    }
}
