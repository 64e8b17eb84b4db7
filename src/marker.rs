// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Active-selection marker file
//!
//! The marker is a plain-text `.dkp` file in the working directory holding the
//! identifier of the last release installed from there.

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::MARKER_FILE;

/// Path of the marker file inside `dir`
#[must_use]
pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILE)
}

/// Read the recorded release identifier
///
/// # Returns
/// `None` if no marker exists or it is blank
///
/// # Errors
/// Returns error if the marker exists but cannot be read
pub fn read_marker(dir: &Path) -> Result<Option<String>, Box<dyn Error>> {
    let path = marker_path(dir);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let content = content.trim();
            Ok((!content.is_empty()).then(|| content.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("Failed to read {}: {e}", path.display()).into()),
    }
}

/// Replace the marker content with `tag`
///
/// # Errors
/// Returns error if the old marker cannot be removed or the new one written
pub fn write_marker(dir: &Path, tag: &str) -> Result<(), Box<dyn Error>> {
    let path = marker_path(dir);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(format!("Failed to remove {}: {e}", path.display()).into()),
    }
    fs::write(&path, tag).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}
