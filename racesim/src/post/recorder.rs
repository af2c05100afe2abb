use crate::post::race_result::RaceResult;
use crate::pre::roster::{roster_path, update_roster_scores};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// RecordReport carries the outcome of the two independent writes of a recording.
#[derive(Debug)]
pub struct RecordReport {
    pub result_file: anyhow::Result<PathBuf>,
    pub roster_rows: anyhow::Result<usize>,
}

impl RecordReport {
    pub fn is_ok(&self) -> bool {
        self.result_file.is_ok() && self.roster_rows.is_ok()
    }
}

/// ResultRecorder persists race results into a data directory and folds the earned points into
/// the roster. All recorders of the process writing the same roster file share one lock, so races
/// recorded from several threads update the roster one after another.
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    data_dir: PathBuf,
    roster_path: PathBuf,
    roster_lock: Arc<Mutex<()>>,
}

impl ResultRecorder {
    pub fn new(data_dir: &Path) -> ResultRecorder {
        ResultRecorder::with_roster(data_dir, &roster_path(data_dir))
    }

    pub fn with_roster(data_dir: &Path, roster_path: &Path) -> ResultRecorder {
        ResultRecorder {
            data_dir: data_dir.to_path_buf(),
            roster_path: roster_path.to_path_buf(),
            roster_lock: roster_lock(roster_path),
        }
    }

    pub fn roster_path(&self) -> &Path {
        &self.roster_path
    }

    /// record writes the result file and then updates the roster. A failure of one write does not
    /// prevent or undo the other.
    pub fn record(&self, result: &RaceResult) -> RecordReport {
        let result_file = result.write_to_dir(&self.data_dir);
        match &result_file {
            Ok(path) => info!("Race {} saved to {}", result.race_id, path.display()),
            Err(e) => warn!("Could not save race {}: {:#}", result.race_id, e),
        }

        let roster_rows = {
            let _guard = self
                .roster_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            update_roster_scores(&self.roster_path, &result.standings)
        };
        match &roster_rows {
            Ok(no_rows) => info!("Updated {} roster scores in {}", no_rows, self.roster_path.display()),
            Err(e) => warn!("Could not update roster scores: {:#}", e),
        }

        RecordReport {
            result_file,
            roster_rows,
        }
    }
}

/// roster_lock returns the process-wide lock guarding rewrites of the roster file at path.
fn roster_lock(roster_path: &Path) -> Arc<Mutex<()>> {
    static ROSTER_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = ROSTER_LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(locks.entry(lock_key(roster_path)).or_default())
}

// the roster may not exist yet, so only its folder is resolved
fn lock_key(roster_path: &Path) -> PathBuf {
    let file_name = match roster_path.file_name() {
        Some(file_name) => file_name,
        None => return roster_path.to_path_buf(),
    };
    let dir = match roster_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    dir.canonicalize()
        .map(|dir| dir.join(file_name))
        .unwrap_or_else(|_| roster_path.to_path_buf())
}
