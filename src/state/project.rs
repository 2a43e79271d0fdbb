use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::data::Project;
use super::sheet;
use super::trash::{SystemTrash, Trash};
use crate::error::{LogError, Result};

/// Image extensions shown in a project's image listing
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// True if the file name ends in one of the supported image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// The ProjectStore manages the project namespace on disk.
/// Each immediate subdirectory of the projects root is one project.
pub struct ProjectStore {
    root: PathBuf,
    trash: Box<dyn Trash>,
}

impl ProjectStore {
    /// Open the store at `root`, creating the directory if needed.
    /// Deleted projects go to the system trash.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_trash(root, Box::new(SystemTrash))
    }

    /// Open the store with a custom trash implementation
    pub fn with_trash(root: impl Into<PathBuf>, trash: Box<dyn Trash>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!("Project store at {}", root.display());
        Ok(Self { root, trash })
    }

    /// Get the projects root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every project folder, in directory-listing order
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            projects.push(Project::new(&self.root, &name));
        }
        Ok(projects)
    }

    /// Create a project, or return the existing one untouched.
    ///
    /// Creates the image directory and a header-only table file if there
    /// is no table yet. Existing records and images are never truncated.
    pub fn create_project(&self, name: &str) -> Result<Project> {
        let name = validate_name(name)?;
        let project = Project::new(&self.root, name);

        fs::create_dir_all(&project.image_dir)?;
        if !project.table_file.exists() {
            sheet::write_table(&project.table_file, &Default::default())?;
            info!("Created project '{}' at {}", project.name, project.dir.display());
        } else {
            debug!("Project '{}' already exists", project.name);
        }

        Ok(project)
    }

    /// Resolve an existing project by name
    pub fn open_project(&self, name: &str) -> Result<Project> {
        let name = validate_name(name)?;
        let project = Project::new(&self.root, name);
        if !project.dir.is_dir() {
            return Err(LogError::NotFound(name.to_string()));
        }
        Ok(project)
    }

    /// Move the whole project folder (table and images) to the trash
    pub fn delete_project(&self, name: &str) -> Result<()> {
        let project = self.open_project(name)?;

        self.trash.trash(&project.dir).map_err(|message| {
            warn!("Trash failed for '{}': {}", project.name, message);
            LogError::TrashFailed {
                path: project.dir.clone(),
                message,
            }
        })?;

        info!("Moved project '{}' to the trash", project.name);
        Ok(())
    }

    /// Image files in the project's image directory, sorted by file name
    pub fn project_images(&self, project: &Project) -> Result<Vec<PathBuf>> {
        if !project.image_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        for entry in fs::read_dir(&project.image_dir)? {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                images.push(path);
            }
        }
        images.sort();
        Ok(images)
    }
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("root", &self.root)
            .finish()
    }
}

/// Trim a project name and make sure it is usable as a single folder name
fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let is_path_like = trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\');
    if trimmed.is_empty() || is_path_like {
        return Err(LogError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}
