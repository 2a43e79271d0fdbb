/// Shared data structures for the activity log
///
/// These structs represent the data model that flows between
/// the table file, the project folders and the exporters.
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Folder inside a project that holds uploaded photos
pub const IMAGE_DIR_NAME: &str = "imagenes";
/// Activity table file inside a project
pub const TABLE_FILE_NAME: &str = "actividades.xlsx";
/// Delimiter between image references in the Images cell
pub const IMAGE_DELIMITER: &str = ", ";
/// Timestamp format for the Date column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named unit of work: one folder, one table, one image directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Unique name, also the folder name
    pub name: String,
    /// `<projects_dir>/<name>`
    pub dir: PathBuf,
    /// `<dir>/imagenes`
    pub image_dir: PathBuf,
    /// `<dir>/actividades.xlsx`
    pub table_file: PathBuf,
}

impl Project {
    /// Derive every path of a project from its name
    pub fn new(projects_dir: &Path, name: &str) -> Self {
        let dir = projects_dir.join(name);
        Self {
            name: name.to_string(),
            image_dir: dir.join(IMAGE_DIR_NAME),
            table_file: dir.join(TABLE_FILE_NAME),
            dir,
        }
    }

    /// Where the PDF report is written (beside the project's other files)
    pub fn report_file(&self) -> PathBuf {
        self.dir.join(format!("Informe_{}.pdf", self.name))
    }

    /// Where the ZIP bundle is written, given the cache directory
    pub fn bundle_file(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(format!("{}.zip", self.name))
    }

    /// Resolve an image reference stored in the table to a file on disk.
    ///
    /// Relative references are joined to the project folder. If that does not
    /// exist, the file name is looked up in the image directory, which also
    /// covers absolute paths written on another machine.
    pub fn resolve_image(&self, reference: &str) -> Option<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let path = Path::new(reference);
        let direct = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        };
        if direct.is_file() {
            return Some(direct);
        }

        let by_name = self.image_dir.join(path.file_name()?);
        by_name.is_file().then_some(by_name)
    }
}

/// One logged event: a row of the activity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    /// `YYYY-MM-DD HH:MM:SS`, set once when the activity is first recorded
    pub timestamp: String,
    /// Natural key for upserts (first match wins)
    pub activity: String,
    pub description: String,
    /// References relative to the project folder, in upload order
    pub images: Vec<String>,
}

impl ActivityRecord {
    /// Serialize the image list for the Images cell.
    /// An empty list becomes an empty string, never a lone delimiter.
    pub fn images_cell(&self) -> String {
        self.images.join(IMAGE_DELIMITER)
    }

    /// Parse an Images cell back into references
    pub fn parse_images(cell: &str) -> Vec<String> {
        cell.split(IMAGE_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// The in-memory activity table of one project.
/// Row order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub records: Vec<ActivityRecord>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the first record whose activity matches exactly
    pub fn position(&self, activity: &str) -> Option<usize> {
        self.records.iter().position(|r| r.activity == activity)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActivityRecord> {
        self.records.iter()
    }
}

/// A photo handed over by the caller (file picker, camera) before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Suggested file name, e.g. "photo1.jpg"
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an upload from a local file, keeping its file name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Ok(Self {
            name,
            bytes: std::fs::read(path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(images: Vec<&str>) -> ActivityRecord {
        ActivityRecord {
            timestamp: "2024-05-01 10:00:00".to_string(),
            activity: "Inspect roof".to_string(),
            description: "Visible cracking".to_string(),
            images: images.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_empty_images_serialize_to_empty_cell() {
        let rec = record(vec![]);
        assert_eq!(rec.images_cell(), "");
        assert!(ActivityRecord::parse_images("").is_empty());
    }

    #[test]
    fn test_images_cell_uses_comma_space() {
        let rec = record(vec!["imagenes/a.jpg", "imagenes/b.png"]);
        assert_eq!(rec.images_cell(), "imagenes/a.jpg, imagenes/b.png");
        assert_eq!(ActivityRecord::parse_images(&rec.images_cell()), rec.images);
    }

    #[test]
    fn test_parse_images_ignores_blank_segments() {
        let parsed = ActivityRecord::parse_images("  , imagenes/a.jpg,  ");
        assert_eq!(parsed, vec!["imagenes/a.jpg".to_string()]);
    }

    #[test]
    fn test_project_paths_are_derived_from_name() {
        let project = Project::new(Path::new("/data/projects"), "Site-A");
        assert_eq!(project.dir, PathBuf::from("/data/projects/Site-A"));
        assert_eq!(project.image_dir, PathBuf::from("/data/projects/Site-A/imagenes"));
        assert_eq!(
            project.table_file,
            PathBuf::from("/data/projects/Site-A/actividades.xlsx")
        );
        assert_eq!(
            project.report_file(),
            PathBuf::from("/data/projects/Site-A/Informe_Site-A.pdf")
        );
        assert_eq!(
            project.bundle_file(Path::new("/cache")),
            PathBuf::from("/cache/Site-A.zip")
        );
    }

    #[test]
    fn test_position_is_exact_and_first_match() {
        let mut table = Table::new();
        table.records.push(record(vec![]));
        table.records.push(record(vec!["x.jpg"]));
        assert_eq!(table.position("Inspect roof"), Some(0));
        assert_eq!(table.position("inspect roof"), None);
        assert_eq!(table.position("Inspect roof "), None);
    }

    #[test]
    fn test_resolve_image_falls_back_to_basename() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), "P");
        std::fs::create_dir_all(&project.image_dir).unwrap();
        std::fs::write(project.image_dir.join("a.jpg"), b"x").unwrap();

        assert!(project.resolve_image("imagenes/a.jpg").is_some());
        assert!(project.resolve_image("/elsewhere/Proyecto/P/imagenes/a.jpg").is_some());
        assert!(project.resolve_image("imagenes/missing.jpg").is_none());
        assert!(project.resolve_image("").is_none());
    }
}
