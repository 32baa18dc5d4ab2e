//! Site layout and model loading
//!
//! Every control plane the supervisor knows about has a directory under the
//! etc directory:
//!
//! ```text
//! <etc>/<cloud>/<control-plane>/
//! ├── config/
//! │   ├── input-model.yml                  (legacy servers and rings)
//! │   ├── control_plane_servers.yml
//! │   ├── swift_ring_builder_consumes.yml
//! │   ├── configuration_data.yml           (ring specifications)
//! │   └── drive_configurations/<host>/drive_configuration.yml
//! ├── ring-delta.yml
//! └── builder_dir/
//! ```
//!
//! Servers, network bindings, drive sizes and ring specifications are
//! gathered from every site. Only the local site must have rings.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::hardware::DriveConfigurations;
use crate::model::{dash_to_underscore, Consumes, RingSpecifications, ServersModel, SiteId};

pub const DEFAULT_ETC: &str = "/etc/swiftlm";

/// Top-level directory of pre-site builder files; never a cloud
const LEGACY_BUILDER_DIR: &str = "legacy_builder_dir";

const CONFIG_DIR: &str = "config";
const INPUT_MODEL: &str = "input-model.yml";
const CONTROL_PLANE_SERVERS: &str = "control_plane_servers.yml";
const CONSUMES: &str = "swift_ring_builder_consumes.yml";
const CONFIGURATION_DATA: &str = "configuration_data.yml";
const DRIVE_CONFIGURATIONS: &str = "drive_configurations";
const DRIVE_CONFIGURATION: &str = "drive_configuration.yml";
const RING_DELTA: &str = "ring-delta.yml";
const BUILDER_DIR: &str = "builder_dir";

// =============================================================================
// Site Paths
// =============================================================================

/// Input and output locations of one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub input_model: PathBuf,
    pub control_plane_servers: PathBuf,
    pub consumes: PathBuf,
    pub configuration_data: PathBuf,
    pub drive_configurations: PathBuf,
    pub ring_delta: PathBuf,
    pub builder_dir: PathBuf,
}

impl SitePaths {
    pub fn new(site_dir: &Path) -> Self {
        let config = site_dir.join(CONFIG_DIR);
        Self {
            input_model: config.join(INPUT_MODEL),
            control_plane_servers: config.join(CONTROL_PLANE_SERVERS),
            consumes: config.join(CONSUMES),
            configuration_data: config.join(CONFIGURATION_DATA),
            drive_configurations: config.join(DRIVE_CONFIGURATIONS),
            ring_delta: site_dir.join(RING_DELTA),
            builder_dir: site_dir.join(BUILDER_DIR),
        }
    }
}

// =============================================================================
// Site Layout
// =============================================================================

/// Every site found under the etc directory
#[derive(Debug, Clone)]
pub struct SiteLayout {
    local: SiteId,
    sites: BTreeMap<SiteId, SitePaths>,
}

impl SiteLayout {
    /// Walk `<etc>/<cloud>/<control-plane>` directories.
    ///
    /// Fails when the local site has no directory.
    #[instrument]
    pub async fn discover(etc: &Path, local: SiteId) -> Result<Self> {
        let mut sites = BTreeMap::new();
        for cloud in subdirectories(etc).await? {
            if cloud == LEGACY_BUILDER_DIR {
                continue;
            }
            let cloud_dir = etc.join(&cloud);
            for control_plane in subdirectories(&cloud_dir).await? {
                let paths = SitePaths::new(&cloud_dir.join(&control_plane));
                sites.insert(SiteId::new(cloud.clone(), control_plane), paths);
            }
        }

        if !sites.contains_key(&local) {
            return Err(Error::Config(format!(
                "Cannot find configuration files in {}",
                etc.join(&local.cloud).join(&local.control_plane).display()
            )));
        }
        info!(sites = sites.len(), "Discovered site layout");
        Ok(Self { local, sites })
    }

    pub fn local(&self) -> &SiteId {
        &self.local
    }

    pub fn local_paths(&self) -> &SitePaths {
        &self.sites[&self.local]
    }

    pub fn paths(&self, site: &SiteId) -> Option<&SitePaths> {
        self.sites.get(site)
    }

    /// Site ids in sorted order
    pub fn sites(&self) -> Vec<SiteId> {
        self.sites.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SiteId, &SitePaths)> {
        self.sites.iter()
    }
}

async fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::read_file(dir, e))?;
    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::read_file(dir, e))?
    {
        if entry.file_type().await?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

// =============================================================================
// YAML Loading
// =============================================================================

/// Parse a YAML file with its keys normalised
pub async fn read_yaml(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::read_file(path, e))?;
    let value: Value = serde_yaml::from_str(&text).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(dash_to_underscore(value))
}

/// Like [`read_yaml`], but a missing file is `None`
async fn read_optional_yaml(path: &Path) -> Result<Option<Value>> {
    match tokio::fs::metadata(path).await {
        Ok(_) => read_yaml(path).await.map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::read_file(path, e)),
    }
}

fn legacy_global<'a>(input_model: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    input_model?
        .get("global")?
        .get(key)
        .filter(|value| !value.is_null())
}

// =============================================================================
// Cloud Model
// =============================================================================

/// The declarative model of the whole deployment
#[derive(Debug, Clone)]
pub struct CloudModel {
    pub servers: ServersModel,
    pub ring_specifications: RingSpecifications,
}

impl CloudModel {
    /// Load servers, bindings and rings of every site.
    #[instrument(skip(layout), fields(local = %layout.local()))]
    pub async fn load(layout: &SiteLayout) -> Result<Self> {
        let mut servers = ServersModel::default();
        let mut consumes = Consumes::new();
        let mut ring_specifications = RingSpecifications::new();

        for (site, paths) in layout.iter() {
            let input_model = read_optional_yaml(&paths.input_model).await?;
            let control_plane_servers = read_yaml(&paths.control_plane_servers).await?;
            let consumes_model = read_yaml(&paths.consumes).await?;

            let site_servers = match control_plane_servers.get("control_plane_servers") {
                Some(list) if !list.is_null() => list.clone(),
                _ => legacy_global(input_model.as_ref(), "all_servers")
                    .cloned()
                    .ok_or_else(|| {
                        Error::validation(format!("No servers found in control plane ({})", site))
                    })?,
            };
            servers.add_servers(site, site_servers)?;
            consumes.load_model(&consumes_model)?;
            debug!(site = %site, "Loaded servers");

            if site == layout.local() {
                load_local_rings(&mut ring_specifications, site, paths, input_model.as_ref())
                    .await?;
            } else if let Some(data) = read_optional_yaml(&paths.configuration_data).await? {
                if ring_specifications.load_configuration(site, data)? {
                    debug!(site = %site, "Loaded ring specifications");
                }
            }
        }
        servers.set_consumes(consumes);

        Ok(Self {
            servers,
            ring_specifications,
        })
    }
}

/// Legacy rings from the input model, replaced by configuration-data rings.
/// The local site must have one or the other.
async fn load_local_rings(
    specs: &mut RingSpecifications,
    site: &SiteId,
    paths: &SitePaths,
    input_model: Option<&Value>,
) -> Result<()> {
    let config_data = read_yaml(&paths.configuration_data).await.map_err(|e| {
        Error::Config(format!(
            "Rings should be in configuration-data. Using old configuration processor? ({})",
            e
        ))
    })?;

    let mut loaded = false;
    if let Some(model) = input_model {
        loaded |= specs.load_legacy_model(site, model)?;
    }
    loaded |= specs.load_configuration(site, config_data)?;
    if !loaded {
        return Err(Error::validation("No ring specifications in input model"));
    }
    Ok(())
}

/// Drive sizes reported by the servers of every site.
#[instrument(skip(layout))]
pub async fn load_drive_configurations(layout: &SiteLayout) -> Result<DriveConfigurations> {
    let mut drives = DriveConfigurations::new();
    for (site, paths) in layout.iter() {
        let dir = &paths.drive_configurations;
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            debug!(site = %site, "No drive configurations");
            continue;
        }
        for host in subdirectories(dir).await? {
            let file = dir.join(&host).join(DRIVE_CONFIGURATION);
            if let Some(model) = read_optional_yaml(&file).await? {
                let count = drives.load_model(&model)?;
                debug!(host = %host, count, "Loaded drive configuration");
            }
        }
    }
    Ok(drives)
}
