use std::path::{Component, Path};

use crate::TransferError;

/// Validates a commit destination name.
///
/// The destination is created directly under the content root, so the name
/// must be a single plain file name. Rejects:
/// - Empty names
/// - Path separators (`/` or `\`)
/// - `.` and `..`
/// - Absolute paths and Windows prefix components (`C:`, `\\server`)
pub fn validate_destination_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }

    if name.contains(['/', '\\']) {
        return Err(TransferError::InvalidName(format!(
            "path separators not allowed: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        (Some(Component::ParentDir | Component::CurDir), _) => {
            return Err(TransferError::InvalidName(format!(
                "relative directory not allowed: {name}"
            )));
        }
        _ => {
            return Err(TransferError::InvalidName(format!(
                "not a plain file name: {name}"
            )));
        }
    }

    if name.len() >= 2 && name.as_bytes()[1] == b':' {
        return Err(TransferError::InvalidName(format!(
            "drive prefix not allowed: {name}"
        )));
    }

    Ok(())
}
