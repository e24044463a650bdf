//! Custom `validator` checks for the paths handed in on the command line.

use std::path::Path;
use validator::ValidationError;

pub fn validate_dir_exist<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("{:?} not found", dir).into()));
    }

    Ok(())
}

/// The directory must exist and accept new files
///
/// Checked by creating and dropping an anonymous temporary file, which is
/// what the archive step is about to do anyway. The directory is not created
/// when missing.
pub fn validate_writable_dir<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    validate_dir_exist(dir)?;
    tempfile::tempfile_in(dir).map(drop).map_err(|e| {
        ValidationError::new("UnwritableDirectory")
            .with_message(format!("cannot write to dir {:?}: {}", dir, e).into())
    })
}
