use crate::extract::Table;
use crate::output::{OutputError, OutputResult};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One persisted page: the unit appended to the records file
///
/// Records are immutable once written; the file is append-only JSONL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub merged_text: String,
    pub images: Vec<String>,
    pub files: Vec<String>,
    pub tables: Vec<Table>,
}

struct WriterState {
    file: File,
    bytes: u64,
}

/// Appends records to a JSONL file, rotating it by size
///
/// When the live file grows past `rotate_bytes` it is renamed to the first
/// free `<path>.N` suffix and a fresh file is opened, so earlier rotations
/// are never overwritten.
pub struct RecordWriter {
    path: PathBuf,
    rotate_bytes: u64,
    state: Mutex<WriterState>,
}

impl RecordWriter {
    pub fn open(path: &Path, rotate_bytes: u64) -> OutputResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let bytes = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            rotate_bytes,
            state: Mutex::new(WriterState { file, bytes }),
        })
    }

    /// Appends one record as a single JSON line
    pub fn append(&self, record: &Record) -> OutputResult<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| OutputError::Format(e.to_string()))?;

        let mut state = self.state.lock().unwrap();

        if state.bytes > 0 && state.bytes + line.len() as u64 > self.rotate_bytes {
            self.rotate(&mut state)?;
        }

        state.file.write_all(line.as_bytes())?;
        state.file.write_all(b"\n")?;
        state.bytes += line.len() as u64 + 1;
        Ok(())
    }

    /// Flushes buffered data to disk; called once at shutdown
    pub fn flush(&self) -> OutputResult<()> {
        let mut state = self.state.lock().unwrap();
        state.file.flush()?;
        state.file.sync_all()?;
        Ok(())
    }

    fn rotate(&self, state: &mut WriterState) -> OutputResult<()> {
        state.file.flush()?;

        let target = next_rotation_path(&self.path);
        std::fs::rename(&self.path, &target)?;
        tracing::info!(
            "Rotated records file to {} ({} bytes)",
            target.display(),
            state.bytes
        );

        state.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        state.bytes = 0;
        Ok(())
    }
}

/// Finds the first unused `<path>.N` rotation name
fn next_rotation_path(path: &Path) -> PathBuf {
    let mut n = 1u32;
    loop {
        let candidate = PathBuf::from(format!("{}.{}", path.display(), n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
