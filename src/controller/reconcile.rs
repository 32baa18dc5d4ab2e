//! Ring delta reconciliation
//!
//! Compares the desired rings and devices of the model with what the
//! builder files hold and works out, per ring and per device, what has to
//! change.
//!
//! ```text
//!  ring specifications ──┐
//!  servers / disks ──────┤                       ┌──▶ ring actions
//!  drive sizes ──────────┼──▶ Reconciler ──▶ RingDelta
//!  builder state ────────┘                       └──▶ device presence + weights
//! ```
//!
//! Mismatches are collected over the whole pass and reported together.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use super::diagnostics::Diagnostics;
use crate::builder::BuilderState;
use crate::delta::{RingAction, RingDelta};
use crate::error::{Error, Result};
use crate::hardware::DriveConfigurations;
use crate::model::{
    ControlPlaneRings, DeviceRecord, GroupLookup, Presence, RingSpecification,
    RingSpecifications, ServersModel, SiteId, Weight,
};

/// Bytes per unit of weight unless configured otherwise (1 GiB)
pub const DEFAULT_SIZE_TO_WEIGHT: f64 = 1024.0 * 1024.0 * 1024.0;

/// Replica counts closer than this are equal; listings print six decimals
const REPLICA_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Options / Outcome
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    /// Bytes per unit of weight
    pub size_to_weight: f64,
    /// Largest weight change per rebalance; overrides the ring's own step
    pub weight_step: Option<f64>,
    /// Accept drives that are split into several partitions
    pub allow_partitions: bool,
    /// Treat model warnings as fatal
    pub stop_on_warnings: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            size_to_weight: DEFAULT_SIZE_TO_WEIGHT,
            weight_step: None,
            allow_partitions: false,
            stop_on_warnings: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub delta: RingDelta,
    /// Non-fatal model warnings
    pub warnings: Vec<String>,
}

// =============================================================================
// Weights
// =============================================================================

/// Weight of a drive of `bytes`; never below 1.00
pub fn model_weight(bytes: u64, size_to_weight: f64) -> Weight {
    Weight::new(bytes as f64 / size_to_weight).max(Weight::new(1.0))
}

/// Move from `current` toward `model` by at most `step`.
///
/// Without a step the model weight is reached at once.
pub fn step_toward(current: Weight, model: Weight, step: Option<f64>) -> Weight {
    let Some(step) = step else {
        return model;
    };
    match model.cmp(&current) {
        Ordering::Greater => model.min(Weight::new(current.value() + step)),
        Ordering::Less => model.max(Weight::new(current.value() - step)),
        Ordering::Equal => current,
    }
}

/// Starting weight of a new drive: the model weight capped at one step
pub fn initial_weight(model: Weight, step: Option<f64>) -> Weight {
    match step {
        Some(step) if model.value() > step => Weight::new(step),
        _ => model,
    }
}

fn replicas_differ(a: f64, b: f64) -> bool {
    (a - b).abs() > REPLICA_TOLERANCE
}

/// Replica count to use when the ring has fewer devices than replicas.
///
/// A replicated ring is clamped with a warning. An erasure coded ring cannot
/// be, so it is an error.
fn override_replica_count(
    ringspec: &RingSpecification,
    device_counts: &HashMap<String, usize>,
    diagnostics: &mut Diagnostics,
) -> Option<f64> {
    let num_devices = device_counts.get(&ringspec.name).copied().unwrap_or(0);
    if num_devices == 0 {
        diagnostics.error(format!(
            "There are no devices assigned to ring {}",
            ringspec.name
        ));
        return None;
    }
    if ringspec.replica_count() <= num_devices as f64 {
        return None;
    }
    if ringspec.is_erasure_coded() {
        diagnostics.error(format!(
            "In ring {} there are not enough devices to support this number \
             of data and parity fragments",
            ringspec.name
        ));
        return None;
    }
    diagnostics.warning(format!(
        "In ring {} there are not enough devices --  changing the replica count to {}",
        ringspec.name, num_devices
    ));
    Some(num_devices as f64)
}

// =============================================================================
// Reconciler
// =============================================================================

/// Everything one reconciliation pass looks at
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    /// The site the rings are built for
    pub site: &'a SiteId,
    /// Every site of the deployment
    pub sites: &'a [SiteId],
    pub ring_specifications: &'a RingSpecifications,
    pub servers: &'a ServersModel,
    pub builder: &'a BuilderState,
    pub drives: &'a DriveConfigurations,
}

impl<'a> Reconciler<'a> {
    /// Work out the delta between the model and the builder files.
    ///
    /// Fails with [`Error::ModelMismatch`] listing every mismatch found, or
    /// with [`Error::ModelMismatchWarnings`] when warnings are fatal.
    #[instrument(skip_all, fields(site = %self.site))]
    pub fn reconcile(&self, options: &ReconcileOptions) -> Result<ReconcileOutcome> {
        let control_plane = self
            .ring_specifications
            .control_plane(self.site)
            .ok_or_else(|| {
                Error::validation(format!(
                    "Cannot find ring specifications for {}",
                    self.site
                ))
            })?;

        let mut delta = RingDelta::new();
        if !control_plane.is_primary() {
            info!("Not the primary control plane; rings are not built here");
            delta.primary = false;
            return Ok(ReconcileOutcome {
                delta,
                warnings: Vec::new(),
            });
        }

        let mut diagnostics = Diagnostics::new();
        self.reconcile_rings(control_plane, &mut delta, &mut diagnostics)?;
        self.reconcile_devices(control_plane, options, &mut delta, &mut diagnostics);
        delta.sort();
        self.sweep_orphans(&mut delta);

        let warnings = diagnostics.finish(options.stop_on_warnings)?;
        info!(
            rings = delta.rings.len(),
            devices = delta.devices.len(),
            warnings = warnings.len(),
            "Reconciled rings"
        );
        Ok(ReconcileOutcome { delta, warnings })
    }

    fn reconcile_rings(
        &self,
        control_plane: &ControlPlaneRings,
        delta: &mut RingDelta,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let device_counts = self.servers.device_counts();
        for ringspec in &control_plane.rings {
            let mut ringspec = ringspec.clone();
            if self.builder.ring(&ringspec.name).is_some() {
                delta.register_ring(ringspec, RingAction::Present);
                continue;
            }
            if let Some(count) = override_replica_count(&ringspec, &device_counts, diagnostics) {
                ringspec.set_replica_count(count)?;
            }
            debug!(ring = %ringspec.name, "Ring will be created");
            delta.register_ring(ringspec, RingAction::Add);
        }

        for site in self.sites {
            if self.ring_specifications.control_plane(site).is_none() {
                diagnostics.error(format!(
                    "Model Mismatch: Cannot find rings-specification for cloud {} \
                     control-plane {}. This error may cause many subsequent errors.",
                    site.cloud, site.control_plane
                ));
            }
        }

        for (ring_name, builder_ring) in &self.builder.rings {
            let Some(entry) = delta.ring_mut(ring_name) else {
                debug!(ring = %ring_name, "Ring is no longer in the model");
                delta.register_ring(builder_ring.clone(), RingAction::Remove);
                continue;
            };
            if let Some(count) =
                override_replica_count(&entry.specification, &device_counts, diagnostics)
            {
                entry.specification.set_replica_count(count)?;
            }
            entry.actions = vec![RingAction::Present];
            if replicas_differ(
                entry.specification.replica_count(),
                builder_ring.replica_count(),
            ) {
                entry.actions.push(RingAction::SetReplicaCount);
            }
            if entry.specification.min_part_hours() != builder_ring.min_part_hours() {
                entry.actions.push(RingAction::SetMinPartHours);
            }
            entry.specification.remaining = builder_ring.remaining.clone();
        }
        Ok(())
    }

    fn reconcile_devices(
        &self,
        control_plane: &ControlPlaneRings,
        options: &ReconcileOptions,
        delta: &mut RingDelta,
        diagnostics: &mut Diagnostics,
    ) {
        for placement in self.servers.unbound_placements() {
            warn!(
                server = placement.server.server_name(),
                device = %placement.device_name,
                ring = %placement.ring_name,
                "No network binding for the ring; device skipped"
            );
        }

        let weight_step = |ring_name: &str| {
            options
                .weight_step
                .filter(|step| *step > 0.0)
                .or_else(|| control_plane.ring(ring_name).and_then(|r| r.weight_step()))
        };

        for mut device in self.servers.iter_devices() {
            let server_name = device.server_name.clone().unwrap_or_default();

            let (region, zone) = control_plane.region_zone(&device.ring_name, &device.server_groups);
            let (region_id, zone_id) = match (region.resolve(), zone.resolve()) {
                (Some(region_id), Some(zone_id)) => (region_id, zone_id),
                _ => {
                    let item = if zone == GroupLookup::NotFound {
                        "swift-zones"
                    } else {
                        "swift-regions"
                    };
                    diagnostics.error(format!(
                        "Model Mismatch: Cannot find server-groups {} in \"ring-specifications\". \
                         Check the \"{}\" item for ring {}. Server is {}",
                        device.server_groups.join(","),
                        item,
                        device.ring_name,
                        server_name
                    ));
                    continue;
                }
            };
            device.region_id = region_id;
            device.zone_id = zone_id;

            let draining = self.servers.server_draining(&server_name);
            let removing = self.servers.server_removing(&server_name);
            let size = self.drives.get_hw(&server_name, &device);
            let hw_bytes = size.bytes.filter(|bytes| *bytes > 0);
            let device_name = device.device_name.clone().unwrap_or_default();

            if let Some(existing) = self.builder.find_device(&device) {
                let current = existing.current_weight;
                let model = if draining {
                    Weight::ZERO
                } else if let Some(bytes) = hw_bytes {
                    model_weight(bytes, options.size_to_weight)
                } else {
                    current
                };
                let target = step_toward(current, model, weight_step(&device.ring_name));

                device.presence = if target != current {
                    Presence::SetWeight
                } else {
                    Presence::Present
                };
                device.current_weight = current;
                device.target_weight = Some(target);
                device.model_weight = Some(model);

                if removing {
                    device.presence = Presence::Remove;
                    device.target_weight = Some(Weight::ZERO);
                    device.model_weight = Some(Weight::ZERO);
                }

                if let Some(change) = device.bad_change(existing) {
                    diagnostics.error(format!(
                        "Model Mismatch: Illegal change of {} for {} on {} ({})",
                        change, device_name, server_name, device.server_ip
                    ));
                }
            } else {
                if control_plane.ring(&device.ring_name).is_none() {
                    diagnostics.error(format!(
                        "Model Mismatch: There is no specification for ring {}. \
                         See disk model for {}",
                        device.ring_name, server_name
                    ));
                    continue;
                }
                device.presence = Presence::Add;
                match hw_bytes {
                    None => diagnostics.error(format!(
                        "Model Mismatch: Cannot find drive {} on {} ({})",
                        device_name, server_name, device.server_ip
                    )),
                    Some(_) if !size.full_drive && !options.allow_partitions => {
                        diagnostics.error(format!(
                            "Model Mismatch: Drive {} on {} ({}) has several partitions",
                            device_name, server_name, device.server_ip
                        ))
                    }
                    Some(bytes) => {
                        let model = model_weight(bytes, options.size_to_weight);
                        device.current_weight = Weight::ZERO;
                        device.target_weight =
                            Some(initial_weight(model, weight_step(&device.ring_name)));
                        device.model_weight = Some(model);
                    }
                }
                if removing || draining {
                    debug!(device = %device, "Not adding a device of a departing server");
                    continue;
                }
            }
            delta.append_device(device);
        }
    }

    /// Devices in the builder files that the model no longer has
    fn sweep_orphans(&self, delta: &mut RingDelta) {
        let desired: HashSet<_> = self.servers.iter_devices().map(|d| d.key()).collect();
        for existing in &self.builder.devices {
            if desired.contains(&existing.key()) {
                continue;
            }
            let mut orphan: DeviceRecord = existing.clone();
            orphan.presence = Presence::Remove;
            debug!(device = %orphan, "Device is no longer in the model");
            delta.append_device(orphan);
        }
    }
}
