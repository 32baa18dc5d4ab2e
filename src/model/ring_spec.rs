//! Ring Specifications
//!
//! Typed view of the ring definitions in the declarative model: one
//! [`RingSpecification`] per ring, grouped per control plane in
//! [`ControlPlaneRings`] and per site in [`RingSpecifications`].
//!
//! The model looks like:
//!
//! ```yaml
//! control_plane_rings:
//!   primary_control_plane: true     # optional, default true
//!   swift_regions:
//!     - id: 1
//!       server_groups: [AZ1, AZ2]
//!   swift_zones:
//!     - id: 1
//!       server_groups: [AZ1]
//!   rings:
//!     - name: account
//!       display_name: Account Ring
//!       min_part_hours: 24
//!       partition_power: 17
//!       replication_policy:
//!         replica_count: 3
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use super::normalize::dash_to_underscore;
use super::{null_as_default, SiteId};
use crate::error::{Error, Result};

/// Default `min_part_hours` when a ring read from elsewhere carries none.
const DEFAULT_MIN_PART_HOURS: u32 = 48;

// =============================================================================
// Policies
// =============================================================================

/// Replicated storage policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicationPolicy {
    pub replica_count: f64,
}

/// Erasure coded storage policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErasureCodingPolicy {
    pub ec_num_data_fragments: u32,
    pub ec_num_parity_fragments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec_object_segment_size: Option<u64>,
}

impl ErasureCodingPolicy {
    /// Total fragments written per object
    pub fn total_fragments(&self) -> u32 {
        self.ec_num_data_fragments + self.ec_num_parity_fragments
    }
}

// =============================================================================
// Region / Zone Assignment
// =============================================================================

/// Group identifier as written in the model; only numeric values are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupId {
    Number(i64),
    Text(String),
}

impl GroupId {
    /// Numeric value of the id, if it has one
    pub fn as_number(&self) -> Option<i64> {
        match self {
            GroupId::Number(n) => Some(*n),
            GroupId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One `swift_regions` or `swift_zones` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerGroupAssignment {
    #[serde(default)]
    pub id: Option<GroupId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub server_groups: Vec<String>,
}

/// Result of resolving a server's groups against region or zone assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLookup {
    /// No assignments declared at all; nothing to enforce
    NotConfigured,
    /// Assignments declared, but none of the server's groups appear in them
    NotFound,
    /// The id of the first matching assignment
    Found(i64),
}

impl GroupLookup {
    /// Resolve to an id, defaulting "not configured" to 1
    pub fn resolve(self) -> Option<i64> {
        match self {
            GroupLookup::NotConfigured => Some(1),
            GroupLookup::NotFound => None,
            GroupLookup::Found(id) => Some(id),
        }
    }
}

fn lookup_group(assignments: &[ServerGroupAssignment], server_groups: &[String]) -> GroupLookup {
    if assignments.is_empty() {
        return GroupLookup::NotConfigured;
    }
    for assignment in assignments {
        if server_groups
            .iter()
            .any(|group| assignment.server_groups.contains(group))
        {
            // Validation guarantees the id is numeric
            return match assignment.id.as_ref().and_then(GroupId::as_number) {
                Some(id) => GroupLookup::Found(id),
                None => GroupLookup::NotFound,
            };
        }
    }
    GroupLookup::NotFound
}

/// Check ids are present and numeric, and group names are not reused.
fn validate_assignments(
    assignments: &[ServerGroupAssignment],
    owner: &str,
    item: &str,
) -> Result<()> {
    let mut seen = HashSet::new();
    for assignment in assignments {
        match &assignment.id {
            None => {
                return Err(Error::validation(format!(
                    "{} is missing id field in a {} entry",
                    owner, item
                )))
            }
            Some(id) if id.as_number().is_none() => {
                return Err(Error::validation(format!(
                    "{} has invalid id value in a {} entry",
                    owner, item
                )))
            }
            Some(_) => {}
        }
        for group in &assignment.server_groups {
            if !seen.insert(group.as_str()) {
                return Err(Error::validation(format!(
                    "{} has duplicate server-group name {} in a {} entry",
                    owner, group, item
                )));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Ring Specification
// =============================================================================

/// Specification of a single ring.
///
/// Rings read from a builder file also carry `remaining`, `balance`,
/// `dispersion` and `overload`; these never appear in the input model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RingSpecification {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub partition_power: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_part_hours: Option<u32>,

    /// Legacy name of `min_part_hours`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_part_time: Option<u32>,

    /// Time left before the builder allows another rebalance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<String>,

    #[serde(default)]
    pub default: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_bind_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_bind_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_policy: Option<ReplicationPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erasure_coding_policy: Option<ErasureCodingPolicy>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub swift_zones: Vec<ServerGroupAssignment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_step: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overload: Option<f64>,
}

impl RingSpecification {
    /// Parse and validate a ring specification from the declarative model.
    pub fn from_model(model: Value) -> Result<Self> {
        let model = dash_to_underscore(model);
        let name = model
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        let mut ringspec: RingSpecification = serde_yaml::from_value(model)
            .map_err(|e| Error::validation(format!("Ring: {} is invalid: {}", name, e)))?;
        ringspec.apply_default_ports();
        ringspec.validate()?;
        Ok(ringspec)
    }

    /// Fill in the default bind ports for the ring type
    pub fn apply_default_ports(&mut self) {
        if self.server_bind_port.is_none() {
            let port = if self.name.starts_with("account") {
                6002
            } else if self.name.starts_with("container") {
                6001
            } else {
                6000
            };
            self.server_bind_port = Some(port);
            self.replication_bind_port = Some(port);
        }
    }

    /// Validate the specification; every error names the ring.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: Option<u32>| v.filter(|h| *h > 0);
        if positive(self.min_part_hours).is_some() && positive(self.min_part_time).is_some() {
            return Err(Error::validation(format!(
                "Ring: {} has specified both min-part-time and min-part-hours. \
                 Please use min-part-hours.",
                self.name
            )));
        }
        if positive(self.min_part_hours).is_none() && positive(self.min_part_time).is_none() {
            return Err(Error::validation(format!(
                "Ring: {} is missing min-part-hours or has a value of zero.",
                self.name
            )));
        }
        match (&self.replication_policy, &self.erasure_coding_policy) {
            (Some(_), Some(_)) => {
                return Err(Error::validation(format!(
                    "Ring: {} has specified both replication_policy and \
                     erasure_coding_policy. Only one may be specified.",
                    self.name
                )))
            }
            (None, None) => {
                return Err(Error::validation(format!(
                    "Ring: {} is missing a policy type (replication_policy or \
                     erasure_coding_policy).",
                    self.name
                )))
            }
            _ => {}
        }
        validate_assignments(
            &self.swift_zones,
            &format!("Ring: {}", self.name),
            "swift-zones",
        )
    }

    /// Replica count: the replication count, or data + parity fragments
    pub fn replica_count(&self) -> f64 {
        if let Some(policy) = &self.replication_policy {
            policy.replica_count
        } else if let Some(policy) = &self.erasure_coding_policy {
            f64::from(policy.total_fragments())
        } else {
            0.0
        }
    }

    /// Change the replica count of a replicated ring
    pub fn set_replica_count(&mut self, replica_count: f64) -> Result<()> {
        match &mut self.replication_policy {
            Some(policy) => {
                policy.replica_count = replica_count;
                Ok(())
            }
            None => Err(Error::validation(format!(
                "Ring: {} cannot set replica-count directly on an EC ring",
                self.name
            ))),
        }
    }

    pub fn is_erasure_coded(&self) -> bool {
        self.erasure_coding_policy.is_some()
    }

    /// Effective min-part-hours, accepting the legacy name
    pub fn min_part_hours(&self) -> u32 {
        self.min_part_hours
            .filter(|h| *h > 0)
            .or(self.min_part_time)
            .unwrap_or(DEFAULT_MIN_PART_HOURS)
    }

    /// Declared weight step; zero means unset
    pub fn weight_step(&self) -> Option<f64> {
        self.weight_step.filter(|step| *step > 0.0)
    }

    /// Zone id for the given server groups, from the ring's own zoning
    pub fn zone(&self, server_groups: &[String]) -> GroupLookup {
        lookup_group(&self.swift_zones, server_groups)
    }
}

impl std::fmt::Display for RingSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(ring) name: {}, display-name: {}, partition-power: {}, replica_count: {}",
            self.name,
            self.display_name.as_deref().unwrap_or("-"),
            self.partition_power,
            self.replica_count()
        )
    }
}

// =============================================================================
// Control Plane Rings
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ControlPlaneRingsModel {
    #[serde(default)]
    region_name: Option<String>,
    /// Legacy key used by older models
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    primary_control_plane: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    rings: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    swift_regions: Vec<ServerGroupAssignment>,
    #[serde(default, deserialize_with = "null_as_default")]
    swift_zones: Vec<ServerGroupAssignment>,
}

/// The rings of one control plane.
///
/// In multi-site deployments exactly one control plane is primary; only the
/// primary's rings, regions and zones are loaded and acted on.
#[derive(Debug, Clone, Default)]
pub struct ControlPlaneRings {
    pub region_name: String,
    pub primary: bool,
    pub rings: Vec<RingSpecification>,
    pub swift_regions: Vec<ServerGroupAssignment>,
    pub swift_zones: Vec<ServerGroupAssignment>,
}

impl ControlPlaneRings {
    /// Parse and validate a `control_plane_rings` object.
    pub fn from_model(model: Value) -> Result<Self> {
        let model: ControlPlaneRingsModel = serde_yaml::from_value(dash_to_underscore(model))
            .map_err(|e| Error::validation(format!("Invalid ring specifications: {}", e)))?;

        let region_name = model.region_name.or(model.region).unwrap_or_default();
        let primary = model.primary_control_plane.unwrap_or(true);
        if !primary {
            debug!("Control plane in region {} is not primary", region_name);
            return Ok(Self {
                region_name,
                primary,
                ..Default::default()
            });
        }

        let rings = model
            .rings
            .into_iter()
            .map(RingSpecification::from_model)
            .collect::<Result<Vec<_>>>()?;

        let control_plane = Self {
            region_name,
            primary,
            rings,
            swift_regions: model.swift_regions,
            swift_zones: model.swift_zones,
        };
        control_plane.validate()?;
        Ok(control_plane)
    }

    /// Validate control-plane level regions and zones
    pub fn validate(&self) -> Result<()> {
        let owner = format!("Rings in region {}", self.region_name);
        validate_assignments(&self.swift_regions, &owner, "swift-regions")?;
        validate_assignments(&self.swift_zones, &owner, "swift-zones")
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Look up a ring by name
    pub fn ring(&self, ring_name: &str) -> Option<&RingSpecification> {
        self.rings.iter().find(|r| r.name == ring_name)
    }

    pub fn region(&self, server_groups: &[String]) -> GroupLookup {
        lookup_group(&self.swift_regions, server_groups)
    }

    /// Zone at the control plane level
    pub fn zone(&self, server_groups: &[String]) -> GroupLookup {
        lookup_group(&self.swift_zones, server_groups)
    }

    /// Region and zone for a server in a ring.
    ///
    /// Zoning declared on the ring itself takes precedence over zoning
    /// declared for the whole control plane.
    pub fn region_zone(&self, ring_name: &str, server_groups: &[String]) -> (GroupLookup, GroupLookup) {
        let region = self.region(server_groups);
        let zone = match self.ring(ring_name).map(|r| r.zone(server_groups)) {
            None | Some(GroupLookup::NotConfigured) => self.zone(server_groups),
            Some(ring_level) => ring_level,
        };
        (region, zone)
    }
}

// =============================================================================
// Ring Specifications (all sites)
// =============================================================================

/// Ring specifications of every known site, keyed by (cloud, control plane)
#[derive(Debug, Clone, Default)]
pub struct RingSpecifications {
    control_planes: BTreeMap<SiteId, ControlPlaneRings>,
}

impl RingSpecifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rings from a configuration-data object.
    ///
    /// Returns false when the object holds no ring specifications.
    pub fn load_configuration(&mut self, site: &SiteId, config_data: Value) -> Result<bool> {
        let config_data = dash_to_underscore(config_data);
        match config_data.get("control_plane_rings") {
            Some(rings) if !rings.is_null() => {
                let control_plane = ControlPlaneRings::from_model(rings.clone())?;
                self.control_planes.insert(site.clone(), control_plane);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Load rings from a legacy input model (`global.all_ring_specifications`).
    ///
    /// Only one entry is meaningful; later entries replace earlier ones.
    pub fn load_legacy_model(&mut self, site: &SiteId, input_model: &Value) -> Result<bool> {
        let specs = input_model
            .get("global")
            .and_then(|g| g.get("all_ring_specifications"))
            .and_then(Value::as_sequence);
        let Some(specs) = specs else {
            return Ok(false);
        };
        let mut loaded = false;
        for spec in specs {
            let control_plane = ControlPlaneRings::from_model(spec.clone())?;
            self.control_planes.insert(site.clone(), control_plane);
            loaded = true;
        }
        Ok(loaded)
    }

    pub fn insert(&mut self, site: SiteId, control_plane: ControlPlaneRings) {
        self.control_planes.insert(site, control_plane);
    }

    pub fn control_plane(&self, site: &SiteId) -> Option<&ControlPlaneRings> {
        self.control_planes.get(site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const REGION_ZONES: &str = r#"
region_name: regionone
swift_regions:
  - id: 2
    server_groups: [sg21, sg22]
  - id: 3
    server_groups: [sg31, sg32]
rings:
  - name: account
    min_part_hours: 24
    partition_power: 10
    replication_policy:
      replica_count: 1
  - name: container
    min_part_hours: 24
    partition_power: 10
    replication_policy:
      replica_count: 2
  - name: object-0
    min_part_hours: 24
    partition_power: 10
    swift_zones:
      - id: 4
        server_groups: [sg31]
    replication_policy:
      replica_count: 3
"#;

    #[test]
    fn test_ringspec_load_legacy_min_part_time() {
        let ringspec = RingSpecification::from_model(yaml(
            r#"
name: dummy
partition_power: 1
replication_policy:
  replica_count: 3
min_part_time: 2
display_name: dummy_display
balance: 100.0
weight_step: 30
"#,
        ))
        .unwrap();

        assert_eq!(ringspec.name, "dummy");
        assert_eq!(ringspec.display_name.as_deref(), Some("dummy_display"));
        assert_eq!(ringspec.partition_power, 1);
        assert_eq!(ringspec.min_part_hours(), 2);
        assert_eq!(ringspec.balance, Some(100.0));
        assert_eq!(ringspec.replica_count(), 3.0);
        assert_eq!(ringspec.weight_step(), Some(30.0));
        assert_eq!(ringspec.server_bind_port, Some(6000));
    }

    #[test]
    fn test_dashed_keys_are_accepted() {
        let ringspec = RingSpecification::from_model(yaml(
            r#"
name: account
partition-power: 12
min-part-hours: 16
replication-policy:
  replica-count: 3
"#,
        ))
        .unwrap();
        assert_eq!(ringspec.min_part_hours(), 16);
        assert_eq!(ringspec.server_bind_port, Some(6002));
        assert_eq!(ringspec.replication_bind_port, Some(6002));
    }

    #[test]
    fn test_zero_min_part_hours_rejected() {
        let err = RingSpecification::from_model(yaml(
            "{name: dummy, partition_power: 1, min_part_hours: 0, replication_policy: {replica_count: 3}}",
        ))
        .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("Ring: dummy"));
    }

    #[test]
    fn test_both_min_part_names_rejected() {
        let err = RingSpecification::from_model(yaml(
            "{name: dummy, partition_power: 1, min_part_hours: 12, min_part_time: 6, replication_policy: {replica_count: 3}}",
        ))
        .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("both min-part-time"));
    }

    #[test]
    fn test_policy_required_exactly_once() {
        let none = RingSpecification::from_model(yaml(
            "{name: object-0, partition_power: 1, min_part_hours: 12}",
        ))
        .unwrap_err();
        assert_matches!(none, Error::ModelValidation(msg) if msg.contains("missing a policy"));

        let both = RingSpecification::from_model(yaml(
            r#"
name: object-0
partition_power: 1
min_part_hours: 12
replication_policy: {replica_count: 3}
erasure_coding_policy: {ec_num_data_fragments: 4, ec_num_parity_fragments: 2}
"#,
        ))
        .unwrap_err();
        assert_matches!(both, Error::ModelValidation(msg) if msg.contains("Only one"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = RingSpecification::from_model(yaml(
            "{name: account, partition_power: 1, min_part_hours: 1, replication_policy: {replica_count: 3}, junk: 1}",
        ))
        .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("Ring: account"));
    }

    #[test]
    fn test_erasure_coded_replica_count() {
        let mut ringspec = RingSpecification::from_model(yaml(
            r#"
name: object-1
partition_power: 14
min_part_hours: 24
erasure_coding_policy:
  ec_type: jerasure_rs_vand
  ec_num_data_fragments: 10
  ec_num_parity_fragments: 4
  ec_object_segment_size: 1048576
"#,
        ))
        .unwrap();
        assert_eq!(ringspec.replica_count(), 14.0);
        assert!(ringspec.is_erasure_coded());
        assert!(ringspec.set_replica_count(3.0).is_err());
    }

    #[test]
    fn test_duplicate_group_in_ring_zones() {
        let err = RingSpecification::from_model(yaml(
            r#"
name: object-0
partition_power: 10
min_part_hours: 24
replication_policy: {replica_count: 3}
swift_zones:
  - id: 1
    server_groups: [sg1, sg2]
  - id: 2
    server_groups: [sg2]
"#,
        ))
        .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("duplicate server-group"));
    }

    #[test]
    fn test_zone_id_must_be_numeric() {
        let err = RingSpecification::from_model(yaml(
            r#"
name: object-0
partition_power: 10
min_part_hours: 24
replication_policy: {replica_count: 3}
swift_zones:
  - id: one
    server_groups: [sg1]
"#,
        ))
        .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("invalid id"));
    }

    #[test]
    fn test_region_zones() {
        let cp = ControlPlaneRings::from_model(yaml(REGION_ZONES)).unwrap();
        let scenarios = [
            ("container", groups(&["sg21"]), GroupLookup::Found(2), GroupLookup::NotConfigured),
            (
                "container",
                groups(&["other21", "sg21", "other22"]),
                GroupLookup::Found(2),
                GroupLookup::NotConfigured,
            ),
            ("object-0", groups(&["sg31"]), GroupLookup::Found(3), GroupLookup::Found(4)),
            ("object-0", groups(&["junk1", "junk2"]), GroupLookup::NotFound, GroupLookup::NotFound),
            ("container", groups(&[]), GroupLookup::NotFound, GroupLookup::NotConfigured),
        ];
        for (ring, server_groups, region, zone) in scenarios {
            assert_eq!(cp.region_zone(ring, &server_groups), (region, zone), "ring {}", ring);
        }
    }

    #[test]
    fn test_ring_zones_override_control_plane_zones() {
        let cp = ControlPlaneRings::from_model(yaml(
            r#"
swift_zones:
  - id: 1
    server_groups: [AZ1]
rings:
  - name: account
    min_part_hours: 24
    replication_policy: {replica_count: 3}
    swift_zones:
      - id: 7
        server_groups: [AZ1]
  - name: container
    min_part_hours: 24
    replication_policy: {replica_count: 3}
"#,
        ))
        .unwrap();
        let az1 = groups(&["AZ1"]);
        assert_eq!(cp.region_zone("account", &az1).1, GroupLookup::Found(7));
        assert_eq!(cp.region_zone("container", &az1).1, GroupLookup::Found(1));
        assert_eq!(cp.region_zone("account", &az1).0, GroupLookup::NotConfigured);
    }

    #[test]
    fn test_null_zones_mean_not_configured() {
        let cp = ControlPlaneRings::from_model(yaml(
            r#"
rings:
  - name: container
    min_part_hours: 24
    replication_policy: {replica_count: 3}
    swift_zones:
"#,
        ))
        .unwrap();
        assert_eq!(
            cp.region_zone("container", &groups(&["any"])),
            (GroupLookup::NotConfigured, GroupLookup::NotConfigured)
        );
        assert_eq!(GroupLookup::NotConfigured.resolve(), Some(1));
        assert_eq!(GroupLookup::NotFound.resolve(), None);
    }

    #[test]
    fn test_duplicate_group_in_control_plane_regions() {
        let err = ControlPlaneRings::from_model(yaml(
            r#"
region_name: regionone
swift_regions:
  - id: 1
    server_groups: [AZ1]
  - id: 2
    server_groups: [AZ1]
rings: []
"#,
        ))
        .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("Rings in region regionone"));
    }

    #[test]
    fn test_secondary_control_plane_skips_rings() {
        let cp = ControlPlaneRings::from_model(yaml(
            r#"
primary_control_plane: false
rings:
  - name: broken
"#,
        ))
        .unwrap();
        assert!(!cp.is_primary());
        assert!(cp.rings.is_empty());
    }

    #[test]
    fn test_load_configuration_data() {
        let site = SiteId::new("standard", "ccp");
        let mut specs = RingSpecifications::new();
        let loaded = specs
            .load_configuration(&site, yaml(&format!("control-plane-rings:\n{}", indent(REGION_ZONES))))
            .unwrap();
        assert!(loaded);
        let cp = specs.control_plane(&site).unwrap();
        assert_eq!(cp.rings.len(), 3);
        assert_eq!(cp.ring("container").unwrap().replica_count(), 2.0);

        let absent = specs
            .load_configuration(&SiteId::new("other", "ccp"), yaml("unrelated: 1"))
            .unwrap();
        assert!(!absent);
    }

    fn indent(text: &str) -> String {
        text.lines().map(|l| format!("  {}\n", l)).collect()
    }
}
