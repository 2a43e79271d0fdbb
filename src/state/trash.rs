/// Trash integration
///
/// Deleting a project never erases it: the folder is handed to the
/// operating system's trash so the user can restore it.
use std::path::Path;

/// Anything that can move a path to a recoverable trash location
pub trait Trash {
    /// Move `path` to the trash, returning the failure message on error
    fn trash(&self, path: &Path) -> Result<(), String>;
}

/// The desktop trash / recycle bin of the host OS
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn trash(&self, path: &Path) -> Result<(), String> {
        trash::delete(path).map_err(|e| e.to_string())
    }
}
