//! Parser for the `swift-ring-builder <file>` listing.
//!
//! ```text
//! /etc/swiftlm/cloud1/cp1/builder_dir/account.builder, build version 6, id 3d4f
//! 1024 partitions, 3.000000 replicas, 1 regions, 2 zones, 3 devices, 0.00 balance, 0.00 dispersion
//! The minimum number of hours before a partition can be reassigned is 24 (23:59:59 remaining)
//! The overload factor is 0.00% (0.000000)
//! Ring file /etc/swiftlm/cloud1/cp1/builder_dir/account.ring.gz is up-to-date
//! Devices:   id region zone   ip address:port replication ip:port  name weight partitions balance flags meta
//!             0      1    1 192.168.245.4:6002   192.168.245.4:6002 disk0  18.63       1024    0.00       host1:disk0:/dev/sdb
//! ```
//!
//! Older releases print address and port in separate columns and have no
//! flags column; both layouts are accepted.

/// One row of the device table
#[derive(Debug, Clone, PartialEq)]
pub struct ListedDevice {
    pub id: u32,
    pub region: i64,
    pub zone: i64,
    pub ip: String,
    pub port: u16,
    pub replication_ip: String,
    pub replication_port: u16,
    pub name: String,
    pub weight: f64,
    pub partitions: u64,
    pub balance: f64,
    /// Marked for removal at the next rebalance
    pub deleted: bool,
    pub meta: String,
}

/// Everything the listing reports about one builder file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuilderListing {
    pub partitions: u64,
    pub replicas: f64,
    pub balance: f64,
    pub dispersion: f64,
    pub min_part_hours: u32,
    pub remaining: String,
    pub overload: f64,
    pub devices: Vec<ListedDevice>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TableLayout {
    /// `ip:port` columns, with a flags column
    Joined { flags: bool },
    /// separate ip and port columns
    Split { flags: bool },
}

/// Parse a listing. The error is a human-readable reason.
pub fn parse_listing(text: &str) -> Result<BuilderListing, String> {
    let mut listing = BuilderListing::default();
    let mut saw_summary = false;
    let mut layout = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(layout) = layout {
            listing.devices.push(parse_device(trimmed, layout)?);
        } else if trimmed.contains(" partitions, ") && trimmed.contains(" replicas") {
            parse_summary(trimmed, &mut listing)?;
            saw_summary = true;
        } else if trimmed.contains("minimum number of hours") {
            parse_min_part_hours(trimmed, &mut listing)?;
        } else if trimmed.starts_with("The overload factor is") {
            listing.overload = between(trimmed, '(', ')')
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| format!("cannot parse overload from '{}'", trimmed))?;
        } else if trimmed.starts_with("Devices:") {
            let flags = trimmed.contains(" flags");
            layout = Some(if trimmed.contains("ip address:port") {
                TableLayout::Joined { flags }
            } else {
                TableLayout::Split { flags }
            });
        }
    }

    if !saw_summary {
        return Err("no partitions/replicas summary line".to_string());
    }
    Ok(listing)
}

fn parse_summary(line: &str, listing: &mut BuilderListing) -> Result<(), String> {
    for item in line.split(", ") {
        let mut words = item.split_whitespace();
        let (Some(value), Some(label)) = (words.next(), words.next()) else {
            continue;
        };
        let bad = || format!("cannot parse '{}' in '{}'", item, line);
        match label {
            "partitions" => listing.partitions = value.parse().map_err(|_| bad())?,
            "replicas" => listing.replicas = value.parse().map_err(|_| bad())?,
            "balance" => listing.balance = value.parse().map_err(|_| bad())?,
            "dispersion" => listing.dispersion = value.parse().map_err(|_| bad())?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_min_part_hours(line: &str, listing: &mut BuilderListing) -> Result<(), String> {
    let hours = line
        .split(" is ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| format!("cannot parse min_part_hours from '{}'", line))?;
    listing.min_part_hours = hours;
    listing.remaining = between(line, '(', ')')
        .map(|v| v.trim_end_matches("remaining").trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(())
}

fn between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)? + open.len_utf8();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

/// Split `ip:port`, accepting bracketed IPv6 addresses
fn split_address(address: &str) -> Option<(String, u16)> {
    let (ip, port) = address.rsplit_once(':')?;
    let ip = ip.trim_start_matches('[').trim_end_matches(']');
    Some((ip.to_string(), port.parse().ok()?))
}

fn parse_device(line: &str, layout: TableLayout) -> Result<ListedDevice, String> {
    let bad = |what: &str| format!("cannot parse {} in device line '{}'", what, line);
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let (ip, port, replication_ip, replication_port, rest, flags) = match layout {
        TableLayout::Joined { flags } => {
            if tokens.len() < 8 {
                return Err(bad("columns"));
            }
            let (ip, port) = split_address(tokens[3]).ok_or_else(|| bad("address"))?;
            let (rip, rport) =
                split_address(tokens[4]).ok_or_else(|| bad("replication address"))?;
            (ip, port, rip, rport, &tokens[5..], flags)
        }
        TableLayout::Split { flags } => {
            if tokens.len() < 10 {
                return Err(bad("columns"));
            }
            let ip = tokens[3].trim_start_matches('[').trim_end_matches(']').to_string();
            let port = tokens[4].parse().map_err(|_| bad("port"))?;
            let rip = tokens[5].trim_start_matches('[').trim_end_matches(']').to_string();
            let rport = tokens[6].parse().map_err(|_| bad("replication port"))?;
            (ip, port, rip, rport, &tokens[7..], flags)
        }
    };

    if rest.len() < 4 {
        return Err(bad("columns"));
    }
    let mut tail = &rest[4..];
    let deleted = flags && tail.first() == Some(&"DEL");
    if deleted {
        tail = &tail[1..];
    }

    Ok(ListedDevice {
        id: tokens[0].parse().map_err(|_| bad("id"))?,
        region: tokens[1].parse().map_err(|_| bad("region"))?,
        zone: tokens[2].parse().map_err(|_| bad("zone"))?,
        ip,
        port,
        replication_ip,
        replication_port,
        name: rest[0].to_string(),
        weight: rest[1].parse().map_err(|_| bad("weight"))?,
        partitions: rest[2].parse().map_err(|_| bad("partitions"))?,
        balance: rest[3].parse().map_err(|_| bad("balance"))?,
        deleted,
        meta: tail.join(" "),
    })
}
