//! Modification-time staleness checks.
//!
//! A missing file has no modification time. `Option<SystemTime>` orders `None`
//! before every `Some`, which is exactly "older than any real file":
//!
//! - a missing output drags the earliest output time down to `None`, so the
//!   command is stale;
//! - a missing dependency never raises the latest dependency time, so on its
//!   own it does not make the command stale.

use crate::error::{BuildError, Result};
use std::fs::File;
use std::path::Path;
use std::time::SystemTime;

/// Modification time of `path`, or `None` if it is not an existing file.
pub fn modification_time(path: &Path) -> Option<SystemTime> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok()
}

/// `true` when the newest input is at least as new as the oldest output.
pub fn out_of_date<I, O>(inputs: I, outputs: O) -> bool
where
    I: IntoIterator<Item = Option<SystemTime>>,
    O: IntoIterator<Item = Option<SystemTime>>,
{
    let latest_input = inputs.into_iter().max().flatten();
    let earliest_output = outputs.into_iter().min().flatten();
    latest_input >= earliest_output
}

/// [`out_of_date`] over files on disk.
pub fn files_out_of_date<'a, I, O>(inputs: I, outputs: O) -> bool
where
    I: IntoIterator<Item = &'a Path>,
    O: IntoIterator<Item = &'a Path>,
{
    out_of_date(
        inputs.into_iter().map(modification_time),
        outputs.into_iter().map(modification_time),
    )
}

/// Set the modification time of every existing file in `paths` to now.
///
/// Content is left untouched and missing files are not created.
pub fn touch_existing<'a, I>(paths: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Path>,
{
    let now = SystemTime::now();
    let mut touched = 0;
    for path in paths {
        if modification_time(path).is_none() {
            continue;
        }
        // Setting times needs ownership, not write access.
        File::open(path)
            .and_then(|file| file.set_modified(now))
            .map_err(|e| BuildError::io(path, e))?;
        touched += 1;
    }
    Ok(touched)
}
