//! Command emission
//!
//! Turns a delta into the ordered ring tool commands that apply it:
//!
//! 1. ring level: `create`, `set_replicas`, `set_min_part_hours`
//! 2. devices: `add`, `remove`, `set_weight`
//! 3. per ring: optional `pretend_min_part_hours_passed`, then `rebalance`

use std::path::Path;

use crate::delta::{RingAction, RingDelta, RingEntry};
use crate::domain::{RingCommand, RingOperation, REBALANCE_SEED};
use crate::model::{DeviceRecord, Presence};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Only emit commands for this ring
    pub limit_ring: Option<String>,
    /// Let an existing ring rebalance before min-part-hours have passed
    pub pretend_min_part_hours_passed: bool,
}

impl EmitOptions {
    fn selects(&self, ring_name: &str) -> bool {
        self.limit_ring.as_deref().map_or(true, |limit| limit == ring_name)
    }
}

fn ring_commands(builder_file: &Path, entry: &RingEntry) -> Vec<RingCommand> {
    let spec = &entry.specification;
    let mut commands = Vec::new();
    if entry.has_action(RingAction::Add) {
        commands.push(RingCommand::new(
            builder_file,
            RingOperation::Create {
                partition_power: spec.partition_power,
                replicas: spec.replica_count(),
                min_part_hours: spec.min_part_hours(),
            },
        ));
    }
    if entry.has_action(RingAction::SetReplicaCount) {
        commands.push(RingCommand::new(
            builder_file,
            RingOperation::SetReplicas {
                replicas: spec.replica_count(),
            },
        ));
    }
    if entry.has_action(RingAction::SetMinPartHours) {
        commands.push(RingCommand::new(
            builder_file,
            RingOperation::SetMinPartHours {
                hours: spec.min_part_hours(),
            },
        ));
    }
    commands
}

fn device_command(builder_file: &Path, device: &DeviceRecord) -> Option<RingCommand> {
    let operation = match device.presence {
        Presence::Add => RingOperation::AddDevice {
            region: device.region_id,
            zone: device.zone_id,
            ip: device.server_ip.clone(),
            port: device.server_bind_port,
            replication_ip: device.replication_ip().to_string(),
            replication_port: device.replication_bind_port(),
            device: device.swift_drive_name.clone(),
            meta: device.meta(),
            weight: device.planned_weight(),
        },
        Presence::Remove => RingOperation::RemoveDevice {
            ip: device.server_ip.clone(),
            device: device.swift_drive_name.clone(),
        },
        Presence::SetWeight => RingOperation::SetWeight {
            ip: device.server_ip.clone(),
            device: device.swift_drive_name.clone(),
            weight: device.planned_weight(),
        },
        Presence::Present => return None,
    };
    Some(RingCommand::new(builder_file, operation))
}

/// Commands that bring the builder files in `builder_dir` to the delta.
///
/// A secondary site's delta yields no commands.
pub fn emit(delta: &RingDelta, builder_dir: &Path, options: &EmitOptions) -> Vec<RingCommand> {
    if !delta.primary {
        return Vec::new();
    }
    let builder_file = |ring_name: &str| RingCommand::builder_file(builder_dir, ring_name);
    let mut commands = Vec::new();

    for (ring_name, entry) in &delta.rings {
        if options.selects(ring_name) {
            commands.extend(ring_commands(&builder_file(ring_name), entry));
        }
    }

    commands.extend(
        delta
            .devices
            .iter()
            .filter(|device| options.selects(&device.ring_name))
            .filter_map(|device| device_command(&builder_file(&device.ring_name), device)),
    );

    for (ring_name, entry) in &delta.rings {
        if !options.selects(ring_name) {
            continue;
        }
        let file = builder_file(ring_name);
        if !entry.is_new() && options.pretend_min_part_hours_passed {
            commands.push(RingCommand::new(
                &file,
                RingOperation::PretendMinPartHoursPassed,
            ));
        }
        commands.push(RingCommand::new(
            file,
            RingOperation::Rebalance {
                seed: REBALANCE_SEED,
            },
        ));
    }
    commands
}
