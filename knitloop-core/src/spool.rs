//! On-disk work queue, one directory tree per loop type.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   <loop_type>/
//!     pending/
//!       <enqueued_at µs, zero padded>-<id>.json   (waiting to be reconciled)
//!     done/
//!       <same file name>.json                     (reconciled, reconciled_at set)
//! ```
//!
//! File names sort in enqueue order. Every write goes through a `.tmp`
//! sibling and a `rename`, so readers never observe a half-written item.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SpoolError};
use crate::types::{LoopType, WorkItem};

const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct Spool {
    root: PathBuf,
}

impl Spool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // 1. Path helpers
    // -----------------------------------------------------------------------

    /// `<root>/<loop_type>/pending/`. Pure, no I/O.
    pub fn pending_dir(&self, loop_type: LoopType) -> PathBuf {
        self.root.join(loop_type.as_str()).join("pending")
    }

    /// `<root>/<loop_type>/done/`. Pure, no I/O.
    pub fn done_dir(&self, loop_type: LoopType) -> PathBuf {
        self.root.join(loop_type.as_str()).join("done")
    }

    /// Path of `item` while it waits in `pending/`.
    pub fn pending_path(&self, item: &WorkItem) -> PathBuf {
        self.pending_dir(item.loop_type).join(file_name(item))
    }

    /// Path of `item` once reconciled.
    pub fn done_path(&self, item: &WorkItem) -> PathBuf {
        self.done_dir(item.loop_type).join(file_name(item))
    }

    // -----------------------------------------------------------------------
    // 2. Enqueue
    // -----------------------------------------------------------------------

    /// Write `item` into its loop type's `pending/` directory.
    ///
    /// Returns [`SpoolError::InvalidId`] if the id is not file-name safe.
    pub fn enqueue(&self, item: &WorkItem) -> Result<PathBuf, SpoolError> {
        if !item.id.is_valid() {
            return Err(SpoolError::InvalidId(item.id.0.clone()));
        }
        let path = self.pending_path(item);
        write_atomic(&path, item)?;
        tracing::debug!(loop_type = %item.loop_type, id = %item.id, "enqueued work item");
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // 3. Read
    // -----------------------------------------------------------------------

    /// Pending item files for `loop_type`, oldest first.
    ///
    /// A missing directory means no work. Leftover `.tmp` files are skipped.
    pub fn list_pending(&self, loop_type: LoopType) -> Result<Vec<PathBuf>, SpoolError> {
        list_json(&self.pending_dir(loop_type))
    }

    /// Reconciled item files for `loop_type`, oldest first.
    pub fn list_done(&self, loop_type: LoopType) -> Result<Vec<PathBuf>, SpoolError> {
        list_json(&self.done_dir(loop_type))
    }

    /// The oldest pending item for `loop_type`, if any.
    pub fn next_pending(&self, loop_type: LoopType) -> Result<Option<WorkItem>, SpoolError> {
        match self.list_pending(loop_type)?.first() {
            Some(path) => load(path).map(Some),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // 4. Complete
    // -----------------------------------------------------------------------

    /// Record `item` as reconciled: write it to `done/`, then drop the
    /// pending copy.
    ///
    /// The item must still be pending; completing twice fails with an I/O
    /// `NotFound` on the pending path.
    pub fn complete(&self, item: &WorkItem) -> Result<PathBuf, SpoolError> {
        let pending = self.pending_path(item);
        if !pending.exists() {
            return Err(io_err(
                pending,
                std::io::Error::new(std::io::ErrorKind::NotFound, "work item is not pending"),
            ));
        }
        let done = self.done_path(item);
        write_atomic(&done, item)?;
        std::fs::remove_file(&pending).map_err(|e| io_err(&pending, e))?;
        tracing::debug!(loop_type = %item.loop_type, id = %item.id, "completed work item");
        Ok(done)
    }
}

/// Read one work item file.
pub fn load(path: &Path) -> Result<WorkItem, SpoolError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|source| SpoolError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn file_name(item: &WorkItem) -> String {
    let micros = item.enqueued_at.timestamp_micros().max(0);
    format!("{micros:020}-{}.json", item.id)
}

fn list_json(dir: &Path) -> Result<Vec<PathBuf>, SpoolError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// serialize → `<name>.tmp` sibling → `rename`. The `.tmp` file lives in the
/// target directory so the rename never crosses filesystems.
fn write_atomic(path: &Path, item: &WorkItem) -> Result<(), SpoolError> {
    let dir = path
        .parent()
        .ok_or_else(|| io_err(path, std::io::Error::other("spool path has no parent")))?;
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_vec_pretty(item).map_err(|source| SpoolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::WorkItemId;

    #[test]
    fn file_name_is_zero_padded_for_lexical_order() {
        let mut item = WorkItem::new(
            WorkItemId::from("a"),
            LoopType::Finishing,
            serde_json::json!({}),
        );
        item.enqueued_at = Utc.timestamp_opt(1, 0).unwrap();
        assert_eq!(file_name(&item), "00000000000001000000-a.json");
    }

    #[test]
    fn paths_are_grouped_by_loop_type() {
        let spool = Spool::new("/srv/spool");
        assert_eq!(
            spool.pending_dir(LoopType::RunManagement),
            PathBuf::from("/srv/spool/run_management/pending")
        );
        assert_eq!(
            spool.done_dir(LoopType::Housekeeping),
            PathBuf::from("/srv/spool/housekeeping/done")
        );
    }
}
