//! Builder State Reader
//!
//! Reads the existing rings from a builder directory. Each `<ring>.builder`
//! file is inspected through the ring tool port; the listing yields a
//! [`RingSpecification`] (replicas, min-part-hours, balance, ...) and one
//! [`DeviceRecord`] per device.
//!
//! Devices flagged for deletion by the builder have been removed but not yet
//! rebalanced away; they are not reported.

mod listing;

pub use listing::{parse_listing, BuilderListing, ListedDevice};

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::domain::RingBuilderTool;
use crate::error::{Error, Result};
use crate::model::{
    DeviceRecord, GroupType, Presence, ReplicationPolicy, RingSpecification, Weight,
    DEFAULT_REGION_NAME,
};

const BUILDER_EXTENSION: &str = "builder";

/// Display name given to rings read back from builder files
const UNKNOWN_DISPLAY_NAME: &str = "unknown";

/// Rings and devices as recorded in the builder files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    pub rings: BTreeMap<String, RingSpecification>,
    pub devices: Vec<DeviceRecord>,
}

impl BuilderState {
    /// Empty state, as when building rings from scratch
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read every builder file in `builder_dir`.
    ///
    /// With `read_existing` false nothing is read and the state is empty.
    /// Any unreadable builder fails the whole read.
    #[instrument(skip(tool))]
    pub async fn read(
        builder_dir: &Path,
        read_existing: bool,
        tool: &dyn RingBuilderTool,
    ) -> Result<Self> {
        let mut state = Self::empty();
        if !read_existing {
            debug!("Not reading existing builder files");
            return Ok(state);
        }

        let mut entries = tokio::fs::read_dir(builder_dir)
            .await
            .map_err(|e| Error::read_file(builder_dir, e))?;
        let mut builder_files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(BUILDER_EXTENSION) {
                builder_files.push(path);
            }
        }
        builder_files.sort();

        for builder_file in builder_files {
            let Some(ring_name) = builder_file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let ring_name = ring_name.to_string();
            let text = tool.describe(&builder_file).await?;
            let listing = parse_listing(&text).map_err(|reason| Error::BuilderRead {
                path: builder_file.clone(),
                reason,
            })?;
            debug!(
                ring = %ring_name,
                devices = listing.devices.len(),
                "Read builder file"
            );
            state.add_listing(&ring_name, listing);
        }

        info!(
            rings = state.rings.len(),
            devices = state.devices.len(),
            "Loaded existing rings"
        );
        Ok(state)
    }

    /// Register the ring and its live devices from one listing
    pub fn add_listing(&mut self, ring_name: &str, listing: BuilderListing) {
        let mut ringspec = RingSpecification {
            name: ring_name.to_string(),
            display_name: Some(UNKNOWN_DISPLAY_NAME.to_string()),
            partition_power: 0,
            min_part_hours: Some(listing.min_part_hours),
            min_part_time: None,
            remaining: Some(listing.remaining.clone()),
            default: false,
            server_bind_port: None,
            replication_bind_port: None,
            replication_policy: Some(ReplicationPolicy {
                replica_count: listing.replicas,
            }),
            erasure_coding_policy: None,
            swift_zones: Vec::new(),
            weight_step: None,
            balance: Some(listing.balance),
            dispersion: Some(listing.dispersion),
            overload: Some(listing.overload),
        };
        ringspec.apply_default_ports();
        self.rings.insert(ring_name.to_string(), ringspec);

        for device in listing.devices.into_iter().filter(|d| !d.deleted) {
            self.devices.push(device_record(ring_name, device));
        }
    }

    pub fn ring(&self, ring_name: &str) -> Option<&RingSpecification> {
        self.rings.get(ring_name)
    }

    /// Existing device with the same identity as `device`
    pub fn find_device(&self, device: &DeviceRecord) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.is_same_device(device))
    }
}

fn device_record(ring_name: &str, device: ListedDevice) -> DeviceRecord {
    DeviceRecord {
        region_name: DEFAULT_REGION_NAME.to_string(),
        ring_name: ring_name.to_string(),
        server_name: None,
        server_groups: Vec::new(),
        network_names: Vec::new(),
        server_ip: device.ip,
        server_bind_port: device.port,
        replication_ip: Some(device.replication_ip),
        replication_bind_port: Some(device.replication_port),
        region_id: device.region,
        zone_id: device.zone,
        swift_drive_name: device.name,
        device_name: None,
        group_type: GroupType::Device,
        presence: Presence::Present,
        current_weight: Weight::new(device.weight),
        target_weight: None,
        model_weight: None,
        balance: device.balance,
        meta: Some(device.meta),
        block_devices: None,
    }
}
