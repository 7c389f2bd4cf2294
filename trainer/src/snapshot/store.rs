use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    mem,
    path::Path,
};

use log::{debug, warn};

use crate::{Result, TrainErr};

const ELEM_SIZE: usize = mem::size_of::<f64>();

/// A fixed-shape `capacity × row_len` array of `f64` stored row major in a single file.
///
/// The file is created exclusively and pre-sized, so rows that are never written read back as
/// zeros. Rows are written by index, in any order, but never past `capacity`.
#[derive(Debug)]
pub struct SnapshotStore {
    name: String,
    file: Option<File>,
    capacity: usize,
    row_len: usize,
    rows_written: usize,
    buf: Vec<f64>,
}

impl SnapshotStore {
    /// Creates a new zero initialized store.
    ///
    /// # Arguments
    /// * `name` - The name the store is reported under.
    /// * `path` - The file to create, it must not exist.
    /// * `capacity` - The amount of rows.
    /// * `row_len` - The length of every row.
    ///
    /// # Errors
    /// An io error if the file already exists or cannot be sized.
    pub fn create<P: AsRef<Path>>(
        name: &str,
        path: P,
        capacity: usize,
        row_len: usize,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        file.set_len((capacity * row_len * ELEM_SIZE) as u64)?;
        debug!(store = name, rows = capacity, cols = row_len; "created snapshot store");

        Ok(Self {
            name: name.to_string(),
            file: Some(file),
            capacity,
            row_len,
            rows_written: 0,
            buf: Vec::with_capacity(row_len),
        })
    }

    /// Opens an existing store for reading.
    ///
    /// # Errors
    /// An io error if the file cannot be opened, a data error if its size does not match.
    pub fn open<P: AsRef<Path>>(
        name: &str,
        path: P,
        capacity: usize,
        row_len: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).open(path)?;

        let expected = (capacity * row_len * ELEM_SIZE) as u64;
        let got = file.metadata()?.len();
        if got != expected {
            return Err(TrainErr::Data(format!(
                "{} is {got} bytes but a {capacity}x{row_len} store needs {expected}",
                path.display()
            )));
        }

        Ok(Self {
            name: name.to_string(),
            file: Some(file),
            capacity,
            row_len,
            rows_written: capacity,
            buf: Vec::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One past the highest row written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Writes `vector` as row `row`, widening it to `f64`.
    ///
    /// # Errors
    /// `CapacityExceeded` if `row >= capacity`, `RowLengthMismatch` if the vector has the wrong
    /// length and an io error if the write fails.
    pub fn write(&mut self, row: usize, vector: &[f32]) -> Result<()> {
        if row >= self.capacity {
            return Err(TrainErr::CapacityExceeded {
                store: self.name.clone(),
                row,
                capacity: self.capacity,
            });
        }

        if vector.len() != self.row_len {
            return Err(TrainErr::RowLengthMismatch {
                store: self.name.clone(),
                got: vector.len(),
                expected: self.row_len,
            });
        }

        self.buf.clear();
        self.buf.extend(vector.iter().map(|&v| f64::from(v)));

        let file = self.file.as_mut().ok_or_else(closed)?;
        file.seek(SeekFrom::Start(Self::offset(row, vector.len())))?;
        file.write_all(bytemuck::cast_slice(&self.buf))?;

        self.rows_written = self.rows_written.max(row + 1);
        Ok(())
    }

    /// Reads row `row` back.
    ///
    /// # Errors
    /// `CapacityExceeded` if `row >= capacity` and an io error if the read fails.
    pub fn read_row(&mut self, row: usize) -> Result<Vec<f64>> {
        if row >= self.capacity {
            return Err(TrainErr::CapacityExceeded {
                store: self.name.clone(),
                row,
                capacity: self.capacity,
            });
        }

        let row_len = self.row_len;
        let mut bytes = vec![0u8; row_len * ELEM_SIZE];

        let file = self.file.as_mut().ok_or_else(closed)?;
        file.seek(SeekFrom::Start(Self::offset(row, row_len)))?;
        file.read_exact(&mut bytes)?;

        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Flushes everything to disk and releases the file.
    ///
    /// # Errors
    /// An io error if syncing fails.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    fn sync(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            debug!(store = self.name.as_str(), rows = self.rows_written; "closed snapshot store");
        }

        Ok(())
    }

    fn offset(row: usize, row_len: usize) -> u64 {
        (row * row_len * ELEM_SIZE) as u64
    }
}

fn closed() -> TrainErr {
    TrainErr::Io(io::Error::other("snapshot store already closed"))
}

impl Drop for SnapshotStore {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!("failed to sync snapshot store {}: {e}", self.name);
        }
    }
}
