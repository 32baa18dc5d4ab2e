//! Operator report of a ring delta (`--report`)

use std::fmt::Write as _;
use std::str::FromStr;

use super::{RingAction, RingDelta};
use crate::model::{Presence, Weight};

const SIZE_UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with a binary unit, e.g. `1.50TB`
pub fn human_size(bytes: f64) -> String {
    let mut value = bytes;
    for unit in &SIZE_UNITS[..SIZE_UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{:.2}{}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2}{}", value, SIZE_UNITS[SIZE_UNITS.len() - 1])
}

/// How much of each ring to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportDetail {
    #[default]
    Summary,
    /// Also list every device change
    Full,
}

impl FromStr for ReportDetail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ReportDetail::Summary),
            "full" => Ok(ReportDetail::Full),
            other => Err(format!("detail must be summary or full, not '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub limit_ring: Option<String>,
    pub detail: ReportDetail,
    /// Bytes per unit of weight
    pub size_to_weight: f64,
}

#[derive(Debug, Default)]
struct Tally {
    count: usize,
    bytes: f64,
}

impl Tally {
    fn add(&mut self, weight: f64, size_to_weight: f64) {
        self.count += 1;
        self.bytes += weight * size_to_weight;
    }
}

fn show(weight: Option<Weight>) -> String {
    weight.map_or_else(|| "-".to_string(), |w| w.to_string())
}

impl RingDelta {
    /// Describe what a rebalance of this delta would do
    pub fn report(&self, options: &ReportOptions) -> String {
        let mut output = String::new();
        if !self.primary {
            output.push_str(
                "This is a secondary site - copy builder and ring\nfiles from the primary site.",
            );
            return output;
        }
        let full = options.detail == ReportDetail::Full;

        output.push_str("Rings:\n");
        for (ring_name, entry) in &self.rings {
            if options
                .limit_ring
                .as_deref()
                .is_some_and(|limit| limit != ring_name)
            {
                continue;
            }
            let _ = writeln!(output, "  {}:", ring_name.to_uppercase());
            if entry.is_new() {
                output.push_str("    ring will be created\n");
            } else {
                let _ = writeln!(
                    output,
                    "    ring exists (minimum time to next rebalance: {})",
                    entry.specification.remaining.as_deref().unwrap_or("unknown")
                );
            }
            if entry.has_action(RingAction::SetReplicaCount) {
                output.push_str("    replica-count will be changed\n");
            }
            if entry.has_action(RingAction::SetMinPartHours) {
                output.push_str("    min-part-hours will be changed\n");
            }

            let mut added = Tally::default();
            let mut removed = Tally::default();
            let mut reweighted = Tally::default();
            for device in self.ring_devices(ring_name) {
                let meta = device.meta();
                match device.presence {
                    Presence::Add => {
                        if full {
                            let _ = writeln!(output, "      add: {}", meta);
                        }
                        added.add(device.planned_weight().value(), options.size_to_weight);
                    }
                    Presence::Remove => {
                        if full {
                            let _ = writeln!(output, "      remove: {}", meta);
                        }
                        removed.add(device.current_weight.value(), options.size_to_weight);
                    }
                    Presence::SetWeight => {
                        if full {
                            let _ = writeln!(
                                output,
                                "      set-weight {} {} > {} > {}",
                                meta,
                                device.current_weight,
                                show(device.target_weight),
                                show(device.model_weight)
                            );
                        }
                        let change = device.planned_weight().value() - device.current_weight.value();
                        reweighted.add(change.abs(), options.size_to_weight);
                    }
                    Presence::Present => {}
                }
            }

            if added.count > 0 {
                let _ = writeln!(
                    output,
                    "    will add {} devices ({})",
                    added.count,
                    human_size(added.bytes)
                );
            }
            if reweighted.count > 0 {
                let _ = writeln!(
                    output,
                    "    will change weight on {} devices ({})",
                    reweighted.count,
                    human_size(reweighted.bytes)
                );
            }
            if removed.count > 0 {
                let _ = writeln!(
                    output,
                    "    will remove {} devices ({})",
                    removed.count,
                    human_size(removed.bytes)
                );
            }
            if added.count + reweighted.count + removed.count == 0 {
                output.push_str("    no device changes\n");
            }
            output.push_str("    ring will be rebalanced\n");
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::ring;
    use super::*;
    use crate::model::device::tests::record;

    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    fn options(detail: ReportDetail, limit_ring: Option<&str>) -> ReportOptions {
        ReportOptions {
            limit_ring: limit_ring.map(str::to_string),
            detail,
            size_to_weight: GIB,
        }
    }

    fn delta() -> RingDelta {
        let mut delta = RingDelta::new();
        delta.register_ring(ring("object-0", 3.0), RingAction::Add);
        let mut account = ring("account", 3.0);
        account.remaining = Some("1:02:03".to_string());
        delta.register_ring(account, RingAction::Present);
        delta.push_action("account", RingAction::SetMinPartHours);

        for drive in ["disk0", "disk1"] {
            let mut device = record("object-0", "192.168.222.4", drive);
            device.presence = Presence::Add;
            device.target_weight = Some(Weight::new(1024.0));
            device.model_weight = Some(Weight::new(1024.0));
            delta.append_device(device);
        }
        let mut shrinking = record("account", "192.168.245.4", "disk0");
        shrinking.presence = Presence::SetWeight;
        shrinking.current_weight = Weight::new(100.0);
        shrinking.target_weight = Some(Weight::new(50.0));
        shrinking.model_weight = Some(Weight::ZERO);
        shrinking.meta = Some("host1:disk0:/dev/sdb".to_string());
        delta.append_device(shrinking);
        let mut leaving = record("account", "192.168.245.3", "disk0");
        leaving.presence = Presence::Remove;
        leaving.current_weight = Weight::new(512.0);
        leaving.meta = Some("host2:disk0:/dev/sda".to_string());
        delta.append_device(leaving);
        delta.sort();
        delta
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512.0), "512.00Bytes");
        assert_eq!(human_size(1536.0), "1.50KB");
        assert_eq!(human_size(2048.0 * GIB), "2.00TB");
        assert_eq!(human_size(1024f64.powi(7)), "1024.00EB");
    }

    #[test]
    fn test_summary_report() {
        let report = delta().report(&options(ReportDetail::Summary, None));
        assert_eq!(
            report,
            "Rings:\n\
             \x20 ACCOUNT:\n\
             \x20   ring exists (minimum time to next rebalance: 1:02:03)\n\
             \x20   min-part-hours will be changed\n\
             \x20   will change weight on 1 devices (50.00GB)\n\
             \x20   will remove 1 devices (512.00GB)\n\
             \x20   ring will be rebalanced\n\
             \x20 OBJECT-0:\n\
             \x20   ring will be created\n\
             \x20   will add 2 devices (2.00TB)\n\
             \x20   ring will be rebalanced\n"
        );
    }

    #[test]
    fn test_full_report_lists_devices() {
        let report = delta().report(&options(ReportDetail::Full, Some("account")));
        assert!(report.contains("      set-weight host1:disk0:/dev/sdb 100.00 > 50.00 > 0.00\n"));
        assert!(report.contains("      remove: host2:disk0:/dev/sda\n"));
        assert!(!report.contains("OBJECT-0"));
    }

    #[test]
    fn test_no_device_changes() {
        let mut delta = RingDelta::new();
        delta.register_ring(ring("container", 3.0), RingAction::Present);
        delta.append_device(record("container", "192.168.245.4", "disk0"));
        let report = delta.report(&options(ReportDetail::Summary, None));
        assert!(report.contains("    ring exists (minimum time to next rebalance: unknown)\n"));
        assert!(report.contains("    no device changes\n"));
    }

    #[test]
    fn test_secondary_site() {
        let mut delta = delta();
        delta.primary = false;
        assert_eq!(
            delta.report(&options(ReportDetail::Full, None)),
            "This is a secondary site - copy builder and ring\nfiles from the primary site."
        );
    }

    #[test]
    fn test_detail_names() {
        assert_eq!("full".parse::<ReportDetail>(), Ok(ReportDetail::Full));
        assert!("verbose".parse::<ReportDetail>().is_err());
    }
}
