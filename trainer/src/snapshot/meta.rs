use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    model::{ParamLayout, ParamSpec},
};

pub const META_FILE: &str = "meta.json";

/// The shape of one store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub name: String,
    pub file: String,
    pub rows: usize,
    pub cols: usize,
}

/// Everything needed to read the stores back and de-flatten their rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Parameter names and shapes in flattening order.
    pub params: Vec<ParamSpec>,
    pub stores: Vec<StoreMeta>,
    pub dtype: String,
    pub endianness: String,
}

impl SnapshotMeta {
    pub fn new(layout: &ParamLayout, stores: Vec<StoreMeta>) -> Self {
        let endianness = if cfg!(target_endian = "little") {
            "little"
        } else {
            "big"
        };

        Self {
            params: layout.params().to_vec(),
            stores,
            dtype: "f64".into(),
            endianness: endianness.into(),
        }
    }

    /// The layout the rows were flattened with.
    pub fn layout(&self) -> ParamLayout {
        ParamLayout::new(self.params.clone())
    }

    pub fn store(&self, name: &str) -> Option<&StoreMeta> {
        self.stores.iter().find(|s| s.name == name)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(META_FILE), json)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let content = fs::read_to_string(dir.join(META_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}
