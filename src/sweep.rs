use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tokio::fs;

use crate::classifier::classify;
use crate::error::AppError;
use crate::intake::{base_name, report, Intake, Warmup};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub(crate) fn directory_access(dir: &Path, source: io::Error) -> AppError {
    AppError::DirectoryAccess { path: dir.to_path_buf(), source }
}

/// Fails unless `dir` exists and is a directory.
pub async fn ensure_watch_dir(dir: &Path) -> Result<(), AppError> {
    let meta = fs::metadata(dir).await.map_err(|e| directory_access(dir, e))?;
    if !meta.is_dir() {
        return Err(directory_access(dir, io::Error::other("not a directory")));
    }
    Ok(())
}

/// Hands every torrent or magnet file already sitting directly in `dir` to
/// `intake`, one after the other, in name order.
pub async fn sweep(dir: &Path, intake: &Intake) -> Result<SweepReport, AppError> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| directory_access(dir, e))?;
    let mut report_counts = SweepReport::default();
    let mut candidates: Vec<PathBuf> = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| directory_access(dir, e))? {
        let path = entry.path();
        match entry.file_type().await {
            Ok(t) if t.is_dir() => {
                report_counts.skipped += 1;
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                report_counts.skipped += 1;
                continue;
            }
        }
        if classify(&base_name(&path)).is_err() {
            debug!("Ignoring {}", path.display());
            report_counts.skipped += 1;
            continue;
        }
        candidates.push(path);
    }
    candidates.sort();

    for path in candidates {
        let result = intake.process(&path, Warmup::None).await;
        match result {
            Ok(_) => report_counts.delivered += 1,
            Err(_) => report_counts.failed += 1,
        }
        report(&path, &result);
    }

    info!(
        "Startup sweep of {}: {} delivered, {} failed, {} skipped",
        dir.display(),
        report_counts.delivered,
        report_counts.failed,
        report_counts.skipped
    );
    Ok(report_counts)
}
