use crate::domain::{InMemoryAssetDirectory, InMemoryReaderDirectory};
use anyhow::Context;
use common::domain::{Asset, Gate, Location};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Static reader, gate and asset setup for the in-memory directories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub gates: Vec<GateSeed>,
    #[serde(default)]
    pub readers: Vec<ReaderSeed>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSeed {
    pub gate_id: String,
    pub name: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSeed {
    pub reader_id: String,
    #[serde(default)]
    pub gate_id: Option<String>,
}

fn default_is_active() -> bool {
    true
}

impl DirectorySeed {
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read directory seed {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse directory seed {}", path.display()))
    }

    /// Build populated directories. Gates must reference a seeded location.
    pub async fn into_directories(
        self,
    ) -> anyhow::Result<(InMemoryReaderDirectory, InMemoryAssetDirectory)> {
        let locations: HashMap<String, Location> = self
            .locations
            .into_iter()
            .map(|location| (location.location_id.clone(), location))
            .collect();

        let readers = InMemoryReaderDirectory::new();
        let gate_count = self.gates.len();
        for gate in self.gates {
            let location = match gate.location_id {
                Some(location_id) => Some(locations.get(&location_id).cloned().with_context(
                    || format!("gate {} references unknown location {}", gate.gate_id, location_id),
                )?),
                None => None,
            };
            readers
                .upsert_gate(Gate {
                    gate_id: gate.gate_id,
                    name: gate.name,
                    is_active: gate.is_active,
                    location,
                })
                .await;
        }

        let reader_count = self.readers.len();
        for reader in self.readers {
            readers.register_reader(reader.reader_id, reader.gate_id).await;
        }

        let assets = InMemoryAssetDirectory::new();
        let asset_count = self.assets.len();
        for asset in self.assets {
            assets.upsert_asset(asset).await;
        }

        info!(
            locations = locations.len(),
            gates = gate_count,
            readers = reader_count,
            assets = asset_count,
            "directories seeded"
        );

        Ok((readers, assets))
    }
}
