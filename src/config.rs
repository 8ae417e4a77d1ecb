use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, RouteLabError};

/// Topology file: `{"type": "topo", "config": {id: [neighbor_id, ...]}}`.
#[derive(Debug, Deserialize)]
struct RawTopologyFile {
    #[serde(rename = "type")]
    file_type: String,
    config: BTreeMap<String, Vec<String>>,
}

/// Names file: `{"type": "names", "config": {id: "host:port"}}`.
#[derive(Debug, Deserialize)]
struct RawNamesFile {
    #[serde(rename = "type")]
    file_type: String,
    config: BTreeMap<String, String>,
}

/// Loads a topology file, failing fatally if `type` isn't `"topo"` so a
/// names file can never be silently misread as a topology.
pub fn load_topology(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let raw_text = fs::read_to_string(path)
        .map_err(|err| RouteLabError::Config(format!("reading {}: {err}", path.display())))?;
    let raw: RawTopologyFile = serde_json::from_str(&raw_text)
        .map_err(|err| RouteLabError::Config(format!("parsing {}: {err}", path.display())))?;

    if raw.file_type != "topo" {
        return Err(RouteLabError::Config(format!(
            "{}: expected type \"topo\", found \"{}\"",
            path.display(),
            raw.file_type
        )));
    }

    Ok(raw.config)
}

/// Loads a names file mapping node id -> `host:port`, failing fatally if
/// `type` isn't `"names"`.
pub fn load_names(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw_text = fs::read_to_string(path)
        .map_err(|err| RouteLabError::Config(format!("reading {}: {err}", path.display())))?;
    let raw: RawNamesFile = serde_json::from_str(&raw_text)
        .map_err(|err| RouteLabError::Config(format!("parsing {}: {err}", path.display())))?;

    if raw.file_type != "names" {
        return Err(RouteLabError::Config(format!(
            "{}: expected type \"names\", found \"{}\"",
            path.display(),
            raw.file_type
        )));
    }

    Ok(raw.config)
}
