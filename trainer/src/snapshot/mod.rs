mod meta;
mod store;

pub use meta::{META_FILE, SnapshotMeta, StoreMeta};
pub use store::SnapshotStore;

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use ndarray::ArrayD;

use crate::{Result, TrainErr, model::ParamLayout};

/// Sub directory of the output directory holding the stores.
pub const SNAPSHOT_DIR: &str = "weights";
pub const WEIGHTS_STORE: &str = "all_weights";
pub const GRADS_STORE: &str = "training_grads";

fn store_file(name: &str) -> String {
    format!("{name}.bin")
}

/// The stores of one run: parameters before recorded iterations and per-iteration gradients.
///
/// Both are optional and sized up front; rows are addressed by the training loop.
#[derive(Debug)]
pub struct SnapshotSet {
    dir: PathBuf,
    weights: Option<SnapshotStore>,
    grads: Option<SnapshotStore>,
}

impl SnapshotSet {
    /// Creates the enabled stores under `<output_dir>/weights` along with their metadata.
    ///
    /// # Arguments
    /// * `output_dir` - The run's output directory.
    /// * `layout` - The flattening layout, fixes the row length.
    /// * `weight_rows` - The capacity of the parameter store, `None` to disable it.
    /// * `grad_rows` - The capacity of the gradient store, `None` to disable it.
    ///
    /// # Errors
    /// An io error if a store already exists or cannot be created.
    pub fn create(
        output_dir: &Path,
        layout: &ParamLayout,
        weight_rows: Option<usize>,
        grad_rows: Option<usize>,
    ) -> Result<Self> {
        let dir = output_dir.join(SNAPSHOT_DIR);
        fs::create_dir_all(&dir)?;

        let cols = layout.len();
        let mut stores = Vec::new();
        let mut open = |name: &str, rows: Option<usize>| -> Result<Option<SnapshotStore>> {
            let Some(rows) = rows else {
                return Ok(None);
            };

            let file = store_file(name);
            let store = SnapshotStore::create(name, dir.join(&file), rows, cols)?;
            info!("snapshot store {name}: {rows} x {cols} f64");
            stores.push(StoreMeta {
                name: name.to_string(),
                file,
                rows,
                cols,
            });
            Ok(Some(store))
        };

        let weights = open(WEIGHTS_STORE, weight_rows)?;
        let grads = open(GRADS_STORE, grad_rows)?;

        SnapshotMeta::new(layout, stores).save(&dir)?;

        Ok(Self {
            dir,
            weights,
            grads,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn weights(&mut self) -> Option<&mut SnapshotStore> {
        self.weights.as_mut()
    }

    pub fn grads(&mut self) -> Option<&mut SnapshotStore> {
        self.grads.as_mut()
    }

    /// Syncs and releases every store.
    pub fn close(self) -> Result<()> {
        let Self { weights, grads, .. } = self;

        for store in [weights, grads].into_iter().flatten() {
            store.close()?;
        }

        Ok(())
    }
}

/// Reads the stores of a finished run.
#[derive(Debug)]
pub struct SnapshotReader {
    dir: PathBuf,
    meta: SnapshotMeta,
}

impl SnapshotReader {
    /// Opens the snapshot directory of `output_dir`.
    pub fn open(output_dir: &Path) -> Result<Self> {
        let dir = output_dir.join(SNAPSHOT_DIR);
        let meta = SnapshotMeta::load(&dir)?;
        Ok(Self { dir, meta })
    }

    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }

    /// Opens the store named `name` for reading.
    ///
    /// # Errors
    /// A data error if the run did not create such a store.
    pub fn store(&self, name: &str) -> Result<SnapshotStore> {
        let store = self
            .meta
            .store(name)
            .ok_or_else(|| TrainErr::Data(format!("no snapshot store named {name}")))?;

        SnapshotStore::open(name, self.dir.join(&store.file), store.rows, store.cols)
    }

    /// Reads a row of `name` and de-flattens it into one array per parameter.
    pub fn read_params(&self, name: &str, row: usize) -> Result<Vec<ArrayD<f64>>> {
        let flat = self.store(name)?.read_row(row)?;
        self.meta.layout().split_and_shape(&flat)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::IxDyn;
    use tempfile::tempdir;

    use super::*;
    use crate::model::ParamSpec;

    fn layout() -> ParamLayout {
        ParamLayout::new(vec![
            ParamSpec::new("dense_0/kernel", vec![2, 2]),
            ParamSpec::new("dense_0/bias", vec![2]),
        ])
    }

    #[test]
    fn only_enabled_stores_are_created() {
        let dir = tempdir().unwrap();

        let mut set = SnapshotSet::create(dir.path(), &layout(), Some(3), None).unwrap();

        assert!(set.weights().is_some());
        assert!(set.grads().is_none());
        let meta = SnapshotMeta::load(set.dir()).unwrap();
        assert_eq!(meta.stores.len(), 1);
        assert_eq!(meta.stores[0].rows, 3);
        assert_eq!(meta.stores[0].cols, 6);
    }

    #[test]
    fn written_rows_come_back_shaped() {
        let dir = tempdir().unwrap();
        let mut set = SnapshotSet::create(dir.path(), &layout(), Some(2), Some(1)).unwrap();

        if let Some(weights) = set.weights() {
            weights.write(1, &[1., 2., 3., 4., 5., 6.]).unwrap();
        }
        set.close().unwrap();

        let reader = SnapshotReader::open(dir.path()).unwrap();
        let params = reader.read_params(WEIGHTS_STORE, 1).unwrap();

        assert_eq!(reader.meta().layout(), layout());
        assert_eq!(params[0].shape(), [2, 2]);
        assert_eq!(params[0][IxDyn(&[1, 0])], 3.);
        assert_eq!(params[1][IxDyn(&[1])], 6.);
    }

    #[test]
    fn second_run_into_same_dir_fails() {
        let dir = tempdir().unwrap();
        SnapshotSet::create(dir.path(), &layout(), Some(1), None)
            .unwrap()
            .close()
            .unwrap();

        assert!(SnapshotSet::create(dir.path(), &layout(), Some(1), None).is_err());
    }
}
