//! Persistence for the inventory table.
//!
//! File layout is one slot per line, `"<id> <ml>"`, rewritten in full on
//! every save via temp file + fsync + rename so a crash never leaves a
//! half-written table behind.

use crate::error::BlendError;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// `(slot_id, current_ml)` pairs in slot order.
pub type StockRows = Vec<(u32, u32)>;

/// External store collaborator for the ledger.
pub trait InventoryStore {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<StockRows>, BlendError>;
    fn save(&self, rows: &[(u32, u32)]) -> Result<(), BlendError>;
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[must_use]
pub fn render_rows(rows: &[(u32, u32)]) -> String {
    let mut out = String::with_capacity(rows.len() * 8);
    for (id, ml) in rows {
        out.push_str(&format!("{id} {ml}\n"));
    }
    out
}

pub fn parse_rows(text: &str) -> Result<StockRows, BlendError> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let parsed = match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(ml), None) => id.parse::<u32>().ok().zip(ml.parse::<u32>().ok()),
            _ => None,
        };
        match parsed {
            Some(row) => rows.push(row),
            None => {
                return Err(BlendError::Persistence(format!(
                    "line {}: expected '<id> <ml>', got '{line}'",
                    idx + 1
                )));
            }
        }
    }
    Ok(rows)
}

/// File-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InventoryStore for FileStore {
    fn load(&self) -> Result<Option<StockRows>, BlendError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => parse_rows(&text)
                .map(Some)
                .map_err(|e| BlendError::Persistence(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlendError::Persistence(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, rows: &[(u32, u32)]) -> Result<(), BlendError> {
        write_atomic(&self.path, render_rows(rows).as_bytes()).map_err(|e| {
            BlendError::Persistence(format!("write {}: {e}", self.path.display()))
        })
    }
}
