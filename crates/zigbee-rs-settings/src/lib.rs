// crates/zigbee-rs-settings/src/lib.rs
//! Persists the network configuration and the node inventory as a single
//! JSON document on disk.
//!
//! Every mutation rewrites the whole document: it is written to a sibling
//! temporary file first and then renamed over the previous one.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use zigbee_rs::network::NetworkConfiguration;
use zigbee_rs::{ExtendedAddress, NetworkStorage, Node, ZigbeeError};

/// Default file name of the settings document.
pub const DEFAULT_SETTINGS_FILE: &str = "zigbee-network.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    network: Option<NetworkConfiguration>,
    /// Keyed by the extended address as 16 upper case hex digits.
    #[serde(default)]
    nodes: BTreeMap<String, Node>,
}

fn node_key(extended_address: ExtendedAddress) -> String {
    format!("{:016X}", extended_address.0)
}

/// A `NetworkStorage` backed by one JSON file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    document: SettingsDocument,
}

impl JsonFileStorage {
    /// Opens the settings file at `path`. A missing file is an empty store;
    /// it is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ZigbeeError> {
        let path = path.as_ref().to_path_buf();
        let document = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                warn!("[SETTINGS] Failed to parse {}: {}", path.display(), e);
                ZigbeeError::StorageError("Settings file is not a valid document")
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[SETTINGS] {} does not exist yet.", path.display());
                SettingsDocument::default()
            }
            Err(e) => {
                warn!("[SETTINGS] Failed to read {}: {}", path.display(), e);
                return Err(ZigbeeError::IoError);
            }
        };
        info!(
            "[SETTINGS] Opened {} with {} node(s).",
            path.display(),
            document.nodes.len()
        );
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), ZigbeeError> {
        let text = serde_json::to_string_pretty(&self.document)
            .map_err(|_| ZigbeeError::StorageError("Failed to serialize settings"))?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&temp, text).map_err(io_error)?;
        fs::rename(&temp, &self.path).map_err(io_error)?;
        debug!("[SETTINGS] Wrote {}.", self.path.display());
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> ZigbeeError {
    warn!("[SETTINGS] I/O error: {}", e);
    ZigbeeError::IoError
}

impl NetworkStorage for JsonFileStorage {
    fn save_network(&mut self, config: &NetworkConfiguration) -> Result<(), ZigbeeError> {
        self.document.network = Some(config.clone());
        self.flush()
    }

    fn load_network(&mut self) -> Result<Option<NetworkConfiguration>, ZigbeeError> {
        Ok(self.document.network.clone())
    }

    fn save_node(&mut self, node: &Node) -> Result<(), ZigbeeError> {
        self.document
            .nodes
            .insert(node_key(node.extended_address), node.clone());
        self.flush()
    }

    fn remove_node(&mut self, extended_address: ExtendedAddress) -> Result<(), ZigbeeError> {
        if self
            .document
            .nodes
            .remove(&node_key(extended_address))
            .is_none()
        {
            return Ok(());
        }
        self.flush()
    }

    fn load_nodes(&mut self) -> Result<Vec<Node>, ZigbeeError> {
        Ok(self.document.nodes.values().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), ZigbeeError> {
        info!("[SETTINGS] Clearing {}.", self.path.display());
        self.document = SettingsDocument::default();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}
