//! Network bindings of the swift services
//!
//! The ring builder service consumes the account, container and object
//! services, so the configuration processor tells us, per service, which
//! network host name (and so which IP address and port) each server uses:
//!
//! ```yaml
//! consumes_SWF_ACC:
//!   members:
//!     private:
//!       - host: standard-ccp-c1-m1-obj
//!         ip_address: 192.168.245.11
//!         port: 6002
//! consumes_SWF_CON: ...
//! consumes_SWF_OBJ: ...
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use serde_yaml::Value;

use super::null_as_default;
use crate::error::{Error, Result};

/// Service type a ring is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingType {
    Account,
    Container,
    Object,
}

impl RingType {
    /// Ring type of a ring name; every `object*` ring is an object ring
    pub fn of_ring(ring_name: &str) -> Option<RingType> {
        if ring_name.starts_with("object") {
            Some(RingType::Object)
        } else if ring_name == "account" {
            Some(RingType::Account)
        } else if ring_name == "container" {
            Some(RingType::Container)
        } else {
            None
        }
    }

    fn consumes_key(self) -> &'static str {
        match self {
            RingType::Account => "consumes_SWF_ACC",
            RingType::Container => "consumes_SWF_CON",
            RingType::Object => "consumes_SWF_OBJ",
        }
    }
}

/// Where a server listens for one ring type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBinding {
    pub network_name: String,
    pub ip_address: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
struct ConsumesEntry {
    #[serde(default)]
    members: Option<ConsumesMembers>,
}

#[derive(Debug, Deserialize)]
struct ConsumesMembers {
    #[serde(default, deserialize_with = "null_as_default")]
    private: Vec<ConsumesMember>,
}

#[derive(Debug, Deserialize)]
struct ConsumesMember {
    host: String,
    ip_address: String,
    port: u16,
}

/// Network bindings of every server, merged across sites
#[derive(Debug, Clone, Default)]
pub struct Consumes {
    bindings: HashMap<(RingType, String), NetworkBinding>,
}

impl Consumes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the bindings from one `swift_ring_builder_consumes` document.
    pub fn load_model(&mut self, model: &Value) -> Result<()> {
        for ring_type in [RingType::Account, RingType::Container, RingType::Object] {
            let key = ring_type.consumes_key();
            let entry = model.get(key).ok_or_else(|| {
                Error::validation(format!("The {} item is missing from the consumes model", key))
            })?;
            let entry: ConsumesEntry = serde_yaml::from_value(entry.clone())
                .map_err(|e| Error::validation(format!("Invalid {} item: {}", key, e)))?;
            let members = entry.members.map(|m| m.private).unwrap_or_default();
            for member in members {
                self.bindings.insert(
                    (ring_type, member.host.clone()),
                    NetworkBinding {
                        network_name: member.host,
                        ip_address: member.ip_address,
                        port: member.port,
                    },
                );
            }
        }
        Ok(())
    }

    /// Find the binding of a server for a ring.
    ///
    /// `network_names` are the server's names on each network; the first one
    /// that serves the ring type wins.
    pub fn network_binding(&self, ring_name: &str, network_names: &[String]) -> Option<&NetworkBinding> {
        let ring_type = RingType::of_ring(ring_name)?;
        network_names
            .iter()
            .find_map(|name| self.bindings.get(&(ring_type, name.clone())))
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const CONSUMES: &str = r#"
consumes_SWF_ACC:
  members:
    private:
      - host: standard-ccp-c1-m3-obj
        ip_address: 192.168.245.9
        port: 6002
        use_tls: false
      - host: standard-ccp-c1-m2-obj
        ip_address: 192.168.245.10
        port: 6002
        use_tls: false
consumes_SWF_CON:
  members:
    private:
      - host: standard-ccp-c1-m2-obj
        ip_address: 192.168.245.10
        port: 6001
consumes_SWF_OBJ:
  members:
    private:
      - host: standard-ccp-c1-m2-mgmt
        ip_address: 192.168.222.10
        port: 6000
"#;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_network_binding_picks_serving_network() {
        let mut consumes = Consumes::new();
        consumes
            .load_model(&serde_yaml::from_str(CONSUMES).unwrap())
            .unwrap();
        let host = names(&[
            "standard-ccp-c1-m2-ardana",
            "standard-ccp-c1-m2-mgmt",
            "standard-ccp-c1-m2-obj",
        ]);

        let account = consumes.network_binding("account", &host).unwrap();
        assert_eq!(account.network_name, "standard-ccp-c1-m2-obj");
        assert_eq!(account.ip_address, "192.168.245.10");
        assert_eq!(account.port, 6002);

        let container = consumes.network_binding("container", &host).unwrap();
        assert_eq!(container.port, 6001);

        let object = consumes.network_binding("object-1", &host).unwrap();
        assert_eq!(object.ip_address, "192.168.222.10");
    }

    #[test]
    fn test_unbound_server_has_no_binding() {
        let mut consumes = Consumes::new();
        consumes
            .load_model(&serde_yaml::from_str(CONSUMES).unwrap())
            .unwrap();
        let compute = names(&["standard-ccp-compute0002-mgmt"]);
        assert!(consumes.network_binding("account", &compute).is_none());
        assert!(consumes
            .network_binding("unknown-ring", &names(&["standard-ccp-c1-m2-obj"]))
            .is_none());
    }

    #[test]
    fn test_missing_service_is_rejected() {
        let mut consumes = Consumes::new();
        let err = consumes
            .load_model(&serde_yaml::from_str("consumes_SWF_ACC: {members: {private: []}}").unwrap())
            .unwrap_err();
        assert_matches!(err, Error::ModelValidation(msg) if msg.contains("consumes_SWF_CON"));
    }
}
