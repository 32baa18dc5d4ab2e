//! End-to-end tests of the ring supervisor over a temporary site layout

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_matches::assert_matches;
use swiftlm::domain::RingCommand;
use swiftlm::{
    DeltaFormat, Error, ReportDetail, RingDelta, RingSupervisor, ScriptedRingBuilder,
    SupervisorOptions,
};

const CLOUD: &str = "my_cloud";
const CONTROL_PLANE: &str = "my_control_plane";

const SERVERS: &str = r#"
control_plane_servers:
  - name: standard-ccp-c1-m1-mgmt
    network-names: [standard-ccp-c1-m1-mgmt, standard-ccp-c1-m1-obj]
    server-group-list: [AZ1]
    disk-model:
      name: SWIFT
      device-groups:
        - name: swiftac
          devices: [{name: /dev/sdb}]
          consumer: {name: swift, attrs: {rings: [account]}}
"#;

const CONSUMES: &str = r#"
consumes_SWF_ACC:
  members:
    private:
      - {host: standard-ccp-c1-m1-obj, ip_address: 192.168.245.4, port: 6002}
consumes_SWF_CON:
  members:
    private:
      - {host: standard-ccp-c1-m1-obj, ip_address: 192.168.245.4, port: 6001}
consumes_SWF_OBJ:
  members:
    private:
      - {host: standard-ccp-c1-m1-mgmt, ip_address: 192.168.222.4, port: 6000}
"#;

const CONFIGURATION_DATA: &str = r#"
control-plane-rings:
  region-name: region1
  swift-zones:
    - {id: 1, server-groups: [AZ1]}
  rings:
    - name: account
      partition-power: 10
      min-part-hours: 24
      replication-policy: {replica-count: 1}
"#;

/// 2TiB: a weight of 2048 at the default size-to-weight
const DRIVES: &str = r#"
ardana_drive_configuration:
  - hostname: standard-ccp-c1-m1-mgmt
    drives:
      - {name: /dev/sdb, bytes: 2199023255552, partitions: []}
"#;

const ACCOUNT_LISTING: &str = "account.builder, build version 4\n\
1024 partitions, 1.000000 replicas, 1 regions, 1 zones, 1 devices, 0.00 balance, 0.00 dispersion\n\
The minimum number of hours before a partition can be reassigned is 24 (0:00:00 remaining)\n\
The overload factor is 0.00% (0.000000)\n\
Devices:   id region zone   ip address:port replication ip:port  name weight partitions balance flags meta\n\
  0 1 1 192.168.245.4:6002 192.168.245.4:6002 disk0 2048.00 1024 0.00   standard-ccp-c1-m1-mgmt:disk0:/dev/sdb\n";

const OTHER_CLOUD: &str = "other_cloud";
const OTHER_CONTROL_PLANE: &str = "other_cp";

const OTHER_SERVERS: &str = r#"
control_plane_servers:
  - name: other-ccp-c1-m1-mgmt
    network-names: [other-ccp-c1-m1-mgmt, other-ccp-c1-m1-obj]
    server-group-list: [AZ1]
    disk-model:
      name: SWIFT
      device-groups:
        - name: swiftac
          devices: [{name: /dev/sdb}]
          consumer: {name: swift, attrs: {rings: [account]}}
"#;

const OTHER_CONSUMES: &str = r#"
consumes_SWF_ACC:
  members:
    private:
      - {host: other-ccp-c1-m1-obj, ip_address: 192.168.246.4, port: 6002}
consumes_SWF_CON:
  members:
    private:
      - {host: other-ccp-c1-m1-obj, ip_address: 192.168.246.4, port: 6001}
consumes_SWF_OBJ:
  members:
    private:
      - {host: other-ccp-c1-m1-mgmt, ip_address: 192.168.223.4, port: 6000}
"#;

const OTHER_CONFIGURATION_DATA: &str = r#"
control-plane-rings:
  region-name: region2
  primary-control-plane: false
"#;

const OTHER_DRIVES: &str = r#"
ardana_drive_configuration:
  - hostname: other-ccp-c1-m1-mgmt
    drives:
      - {name: /dev/sdb, bytes: 2199023255552, partitions: []}
"#;

struct Site {
    _etc: tempfile::TempDir,
    etc: PathBuf,
}

impl Site {
    fn new() -> Self {
        let etc = tempfile::tempdir().unwrap();
        let root = etc.path().to_path_buf();
        let site_dir = root.join(CLOUD).join(CONTROL_PLANE);
        let config = site_dir.join("config");
        let host_dir = config
            .join("drive_configurations")
            .join("standard-ccp-c1-m1-mgmt");
        fs::create_dir_all(&host_dir).unwrap();
        fs::create_dir_all(site_dir.join("builder_dir")).unwrap();
        fs::write(config.join("control_plane_servers.yml"), SERVERS).unwrap();
        fs::write(config.join("swift_ring_builder_consumes.yml"), CONSUMES).unwrap();
        fs::write(config.join("configuration_data.yml"), CONFIGURATION_DATA).unwrap();
        fs::write(host_dir.join("drive_configuration.yml"), DRIVES).unwrap();
        Self { _etc: etc, etc: root }
    }

    /// Add a secondary control plane in another cloud
    fn with_secondary(self) -> Self {
        let site_dir = self.etc.join(OTHER_CLOUD).join(OTHER_CONTROL_PLANE);
        let config = site_dir.join("config");
        let host_dir = config
            .join("drive_configurations")
            .join("other-ccp-c1-m1-mgmt");
        fs::create_dir_all(&host_dir).unwrap();
        fs::create_dir_all(site_dir.join("builder_dir")).unwrap();
        fs::write(config.join("control_plane_servers.yml"), OTHER_SERVERS).unwrap();
        fs::write(config.join("swift_ring_builder_consumes.yml"), OTHER_CONSUMES).unwrap();
        fs::write(config.join("configuration_data.yml"), OTHER_CONFIGURATION_DATA).unwrap();
        fs::write(host_dir.join("drive_configuration.yml"), OTHER_DRIVES).unwrap();
        self
    }

    fn site_dir(&self) -> PathBuf {
        self.etc.join(CLOUD).join(CONTROL_PLANE)
    }

    fn builder_dir(&self) -> PathBuf {
        self.site_dir().join("builder_dir")
    }

    fn options(&self) -> SupervisorOptions {
        let mut options = SupervisorOptions::new(CLOUD, CONTROL_PLANE);
        options.etc = self.etc.clone();
        options
    }

    /// Place an (opaque) builder file whose listing the tool serves
    fn existing_ring(&self, tool: ScriptedRingBuilder) -> ScriptedRingBuilder {
        let builder_file = self.builder_dir().join("account.builder");
        fs::write(&builder_file, b"builder").unwrap();
        tool.with_listing(builder_file, ACCOUNT_LISTING)
    }
}

async fn run(
    options: SupervisorOptions,
    tool: Arc<ScriptedRingBuilder>,
) -> (swiftlm::Result<swiftlm::RunSummary>, String) {
    let supervisor = RingSupervisor::new(options, tool);
    let mut out = Vec::new();
    let result = supervisor.run(&mut out).await;
    (result, String::from_utf8(out).unwrap())
}

fn operations(commands: &[RingCommand]) -> Vec<String> {
    commands.iter().map(|c| c.args()[1].clone()).collect()
}

fn read_delta(path: &Path, format: DeltaFormat) -> RingDelta {
    RingDelta::load(&fs::read_to_string(path).unwrap(), format).unwrap()
}

#[tokio::test]
async fn test_make_delta_and_rebalance_new_ring() {
    let site = Site::new();
    let tool = Arc::new(ScriptedRingBuilder::new());
    let mut options = site.options();
    options.make_delta = true;
    options.rebalance = true;

    let (result, out) = run(options, tool.clone()).await;
    let summary = result.unwrap();

    assert!(summary.warnings.is_empty());
    let delta = read_delta(&site.site_dir().join("ring-delta.yml"), DeltaFormat::Yaml);
    assert!(delta.ring("account").unwrap().is_new());
    assert_eq!(delta.devices.len(), 1);

    let commands = tool.commands();
    assert_eq!(operations(&commands), vec!["create", "add", "rebalance"]);
    assert!(commands[1].args().contains(&"2048.00".to_string()));
    assert_eq!(commands[0].builder_file, site.builder_dir().join("account.builder"));
    assert_eq!(out.matches("Running: swift-ring-builder").count(), 3);
    assert_eq!(summary.execution.unwrap().commands.len(), 3);
}

#[tokio::test]
async fn test_existing_ring_only_rebalances() {
    let site = Site::new();
    let tool = Arc::new(site.existing_ring(ScriptedRingBuilder::new()));
    let mut options = site.options();
    options.make_delta = true;
    options.rebalance = true;
    options.pretend_min_part_hours_passed = true;

    let (result, _) = run(options, tool.clone()).await;
    result.unwrap();

    assert_eq!(
        operations(&tool.commands()),
        vec!["pretend_min_part_hours_passed", "rebalance"]
    );
}

#[tokio::test]
async fn test_report_after_make_delta() {
    let site = Site::new();
    let tool = Arc::new(ScriptedRingBuilder::new());
    let mut options = site.options();
    options.make_delta = true;
    let (result, out) = run(options, tool.clone()).await;
    result.unwrap();
    assert!(out.is_empty());

    let mut options = site.options();
    options.report = true;
    options.detail = ReportDetail::Full;
    let (result, out) = run(options, tool.clone()).await;
    result.unwrap();

    assert!(out.starts_with("Rings:\n  ACCOUNT:\n    ring will be created\n"));
    assert!(out.contains("      add: standard-ccp-c1-m1-mgmt:disk0:/dev/sdb\n"));
    assert!(out.contains("    will add 1 devices (2.00TB)\n"));
    assert!(out.ends_with("    ring will be rebalanced\n"));
    assert!(tool.is_empty());
}

#[tokio::test]
async fn test_delta_to_stdout_as_json() {
    let site = Site::new();
    let mut options = site.options();
    options.make_delta = true;
    options.ring_delta = Some("-".to_string());
    options.format = DeltaFormat::Json;

    let (result, out) = run(options, Arc::new(ScriptedRingBuilder::new())).await;
    result.unwrap();

    let delta = RingDelta::load(&out, DeltaFormat::Json).unwrap();
    assert_eq!(delta.devices.len(), 1);
    assert!(!site.site_dir().join("ring-delta.yml").exists());
}

#[tokio::test]
async fn test_dry_run_runs_nothing() {
    let site = Site::new();
    let tool = Arc::new(ScriptedRingBuilder::new());
    let delta_file = site.etc.join("custom-delta.yml");
    let mut options = site.options();
    options.make_delta = true;
    options.rebalance = true;
    options.dry_run = true;
    options.ring_delta = Some(delta_file.display().to_string());

    let (result, out) = run(options, tool.clone()).await;
    result.unwrap();

    assert!(delta_file.exists());
    assert!(tool.is_empty());
    assert_eq!(out.lines().filter(|l| l.starts_with("DRY-RUN: ")).count(), 3);
}

#[tokio::test]
async fn test_unknown_site() {
    let site = Site::new();
    let mut options = SupervisorOptions::new(CLOUD, "elsewhere");
    options.etc = site.etc.clone();
    options.make_delta = true;

    let (result, _) = run(options, Arc::new(ScriptedRingBuilder::new())).await;
    assert_matches!(result, Err(Error::Config(msg)) if msg.starts_with("Cannot find configuration files"));
}

#[tokio::test]
async fn test_missing_drive_is_a_mismatch() {
    let site = Site::new();
    fs::remove_dir_all(site.site_dir().join("config").join("drive_configurations")).unwrap();
    let mut options = site.options();
    options.make_delta = true;

    let (result, _) = run(options, Arc::new(ScriptedRingBuilder::new())).await;
    assert_matches!(result, Err(Error::ModelMismatch { errors }) if errors.iter().any(|e| e.contains("Cannot find drive /dev/sdb")));
    assert!(!site.site_dir().join("ring-delta.yml").exists());
}

#[tokio::test]
async fn test_report_without_delta_file() {
    let site = Site::new();
    let mut options = site.options();
    options.report = true;

    let (result, _) = run(options, Arc::new(ScriptedRingBuilder::new())).await;
    assert_matches!(result, Err(Error::ReadFile { path, .. }) if path.ends_with("ring-delta.yml"));
}

#[tokio::test]
async fn test_make_delta_with_secondary_control_plane() {
    let site = Site::new().with_secondary();
    let tool = Arc::new(ScriptedRingBuilder::new());
    let mut options = site.options();
    options.make_delta = true;
    options.rebalance = true;

    let (result, _) = run(options, tool.clone()).await;
    let summary = result.unwrap();

    assert!(summary.warnings.is_empty());
    let delta = read_delta(&site.site_dir().join("ring-delta.yml"), DeltaFormat::Yaml);
    assert!(delta.primary);
    let mut servers: Vec<_> = delta
        .devices
        .iter()
        .map(|d| d.server_name.clone().unwrap())
        .collect();
    servers.sort();
    assert_eq!(servers, vec!["other-ccp-c1-m1-mgmt", "standard-ccp-c1-m1-mgmt"]);
    assert_eq!(operations(&tool.commands()), vec!["create", "add", "add", "rebalance"]);
}

#[tokio::test]
async fn test_secondary_control_plane_builds_nothing() {
    let site = Site::new().with_secondary();
    let tool = Arc::new(ScriptedRingBuilder::new());
    let delta_file = site.etc.join("secondary-delta.yml");
    let mut options = SupervisorOptions::new(OTHER_CLOUD, OTHER_CONTROL_PLANE);
    options.etc = site.etc.clone();
    options.make_delta = true;
    options.rebalance = true;
    options.ring_delta = Some(delta_file.display().to_string());

    let (result, _) = run(options, tool.clone()).await;
    result.unwrap();

    let delta = read_delta(&delta_file, DeltaFormat::Yaml);
    assert!(!delta.primary);
    assert!(delta.devices.is_empty());
    assert!(tool.is_empty());
}
