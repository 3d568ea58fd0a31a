use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::probe::MarkerTechnique;

/// Marker techniques remembered for one driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerHints {
    pub blob: MarkerTechnique,
    pub cross: MarkerTechnique,
}

/// Settings store for capability-probe results, keyed by driver identity.
pub trait HintStore {
    fn load(&self, key: &str) -> Option<MarkerHints>;
    fn store(&mut self, key: &str, hints: MarkerHints);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryHints {
    map: HashMap<String, MarkerHints>,
    writes: usize,
}

impl MemoryHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, hints: MarkerHints) -> Self {
        let mut store = Self::default();
        store.map.insert(key.to_string(), hints);
        store
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl HintStore for MemoryHints {
    fn load(&self, key: &str) -> Option<MarkerHints> {
        self.map.get(key).copied()
    }

    fn store(&mut self, key: &str, hints: MarkerHints) {
        self.writes += 1;
        self.map.insert(key.to_string(), hints);
    }
}

/// Hints persisted as a JSON object in a file.
#[derive(Clone, Debug)]
pub struct JsonHints {
    path: PathBuf,
    map: BTreeMap<String, MarkerHints>,
}

impl JsonHints {
    /// A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, map })
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.map)?;
        std::fs::write(&self.path, text).with_context(|| format!("writing {}", self.path.display()))
    }
}

impl HintStore for JsonHints {
    fn load(&self, key: &str) -> Option<MarkerHints> {
        self.map.get(key).copied()
    }

    fn store(&mut self, key: &str, hints: MarkerHints) {
        self.map.insert(key.to_string(), hints);
        if let Err(err) = self.save() {
            warn!("failed to persist marker hints: {err:#}");
        }
    }
}
