use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::data::{ActivityRecord, ImageUpload, Project, Table, IMAGE_DIR_NAME, TIMESTAMP_FORMAT};
use super::project::is_image_file;
use super::sheet;
use crate::error::{LogError, Result};

/// The ActivityLog reads and writes the record table of one project.
///
/// There is no locking: every save rewrites the whole table, so two
/// writers on the same project simply race and the last one wins.
#[derive(Debug, Clone, Copy)]
pub struct ActivityLog<'a> {
    project: &'a Project,
}

impl<'a> ActivityLog<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    /// Read the table. A missing file is an empty table and is not created here.
    pub fn load(&self) -> Result<Table> {
        if !self.project.table_file.exists() {
            debug!("No table yet for '{}'", self.project.name);
            return Ok(Table::new());
        }
        sheet::read_table(&self.project.table_file)
    }

    /// Overwrite the table file with every row of `table`
    pub fn save(&self, table: &Table) -> Result<()> {
        sheet::write_table(&self.project.table_file, table)?;
        debug!("Saved {} rows for '{}'", table.len(), self.project.name);
        Ok(())
    }

    /// Insert a new activity, or append images to the first record with the
    /// same activity name.
    ///
    /// An existing record keeps its description and timestamp; only its image
    /// list grows. Validation runs before anything touches the disk. If one of
    /// the images cannot be written, the ones already written by this call are
    /// removed and the table is left as it was.
    pub fn upsert_activity(
        &self,
        activity: &str,
        description: &str,
        uploads: impl IntoIterator<Item = ImageUpload>,
    ) -> Result<Table> {
        if activity.trim().is_empty() {
            return Err(LogError::Validation("activity name is required".to_string()));
        }
        if description.trim().is_empty() {
            return Err(LogError::Validation("description is required".to_string()));
        }
        if !self.project.dir.is_dir() {
            return Err(LogError::NotFound(self.project.name.clone()));
        }

        let uploads: Vec<ImageUpload> = uploads.into_iter().collect();
        let names = uploads
            .iter()
            .map(|u| upload_file_name(&u.name))
            .collect::<Result<Vec<String>>>()?;

        let mut table = self.load()?;

        let saved = self.store_images(&names, &uploads)?;
        let new_refs: Vec<String> = saved.iter().map(|(_, reference)| reference.clone()).collect();

        match table.position(activity) {
            Some(idx) => {
                let record = &mut table.records[idx];
                record.images.extend(new_refs);
                info!(
                    "Added {} image(s) to '{}' in '{}'",
                    saved.len(),
                    activity,
                    self.project.name
                );
            }
            None => {
                table.records.push(ActivityRecord {
                    timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
                    activity: activity.to_string(),
                    description: description.to_string(),
                    images: new_refs,
                });
                info!("Recorded new activity '{}' in '{}'", activity, self.project.name);
            }
        }

        if let Err(e) = self.save(&table) {
            // Without a saved table the new files are unreferenced
            remove_files(saved.iter().map(|(path, _)| path.as_path()));
            return Err(e);
        }

        Ok(table)
    }

    /// Write each upload under a fresh name in the image directory.
    /// Returns (absolute path, table reference) pairs in upload order.
    fn store_images(&self, names: &[String], uploads: &[ImageUpload]) -> Result<Vec<(PathBuf, String)>> {
        fs::create_dir_all(&self.project.image_dir)?;

        let mut saved: Vec<(PathBuf, String)> = Vec::with_capacity(uploads.len());
        for (name, upload) in names.iter().zip(uploads) {
            let path = unique_image_path(&self.project.image_dir, name);
            if let Err(e) = fs::write(&path, &upload.bytes) {
                warn!("Failed to store {}: {}", path.display(), e);
                remove_files(saved.iter().map(|(p, _)| p.as_path()));
                remove_files(std::iter::once(path.as_path()));
                return Err(e.into());
            }

            let file_name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            debug!("Stored image {}", path.display());
            saved.push((path, format!("{}/{}", IMAGE_DIR_NAME, file_name)));
        }

        Ok(saved)
    }
}

/// Keep only the final path component of a suggested name and check its type.
/// Commas become underscores so the name cannot contain the Images delimiter.
fn upload_file_name(name: &str) -> Result<String> {
    let file_name = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().replace(',', "_"))
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| LogError::Validation(format!("image {name:?} has no file name")))?;

    if !is_image_file(Path::new(&file_name)) {
        return Err(LogError::Validation(format!(
            "image {file_name:?} must be a png, jpg or jpeg file"
        )));
    }
    Ok(file_name)
}

/// `photo.jpg` becomes `photo_20240501_101500_123456.jpg`; if that is taken
/// too, a counter is appended until the name is free.
fn unique_image_path(dir: &Path, file_name: &str) -> PathBuf {
    let original = Path::new(file_name);
    let stem = original
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();

    let mut candidate = dir.join(format!("{stem}_{stamp}{ext}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{stamp}_{counter}{ext}"));
        counter += 1;
    }
    candidate
}

fn remove_files<'p>(paths: impl Iterator<Item = &'p Path>) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {}
            // A failed write may never have created the file
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not clean up {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::project::ProjectStore;

    fn setup() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path().join("projects")).unwrap();
        let project = store.create_project("Site-A").unwrap();
        (dir, project)
    }

    fn photo(name: &str, fill: u8) -> ImageUpload {
        ImageUpload::new(name, vec![fill; 16])
    }

    #[test]
    fn test_load_missing_table_does_not_create_it() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), "Ghost");

        let table = ActivityLog::new(&project).load().unwrap();
        assert!(table.is_empty());
        assert!(!project.table_file.exists());
    }

    #[test]
    fn test_save_of_loaded_table_is_a_no_op() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);
        log.upsert_activity("Inspect roof", "Visible cracking", vec![photo("a.jpg", 1)])
            .unwrap();
        log.upsert_activity("Check gutters", "Clear", Vec::new()).unwrap();

        let before = log.load().unwrap();
        log.save(&before).unwrap();
        assert_eq!(log.load().unwrap(), before);
    }

    #[test]
    fn test_new_activity_appends_one_row() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let table = log
            .upsert_activity("Inspect roof", "Visible cracking", vec![photo("photo1.jpg", 1)])
            .unwrap();

        assert_eq!(table.len(), 1);
        let rec = &table.records[0];
        assert_eq!(rec.activity, "Inspect roof");
        assert_eq!(rec.description, "Visible cracking");
        assert_eq!(rec.images.len(), 1);
        assert!(rec.images[0].starts_with("imagenes/photo1_"));
        assert!(chrono::NaiveDateTime::parse_from_str(&rec.timestamp, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(log.load().unwrap(), table);
    }

    #[test]
    fn test_existing_activity_only_gains_images() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let first = log
            .upsert_activity("A", "d1", vec![photo("i1.jpg", 1)])
            .unwrap();
        let original = first.records[0].clone();

        let second = log
            .upsert_activity("A", "d2", vec![photo("x.png", 2)])
            .unwrap();

        assert_eq!(second.len(), 1);
        let rec = &second.records[0];
        assert_eq!(rec.description, "d1");
        assert_eq!(rec.timestamp, original.timestamp);
        assert_eq!(rec.images.len(), 2);
        assert_eq!(rec.images[0], original.images[0]);
        assert!(rec.images[1].starts_with("imagenes/x_"));
    }

    #[test]
    fn test_first_matching_record_is_updated() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let mut table = Table::new();
        for desc in ["first", "second"] {
            table.records.push(ActivityRecord {
                timestamp: "2024-01-01 00:00:00".to_string(),
                activity: "Dup".to_string(),
                description: desc.to_string(),
                images: Vec::new(),
            });
        }
        log.save(&table).unwrap();

        let table = log.upsert_activity("Dup", "ignored", vec![photo("p.jpg", 3)]).unwrap();
        assert_eq!(table.records[0].images.len(), 1);
        assert!(table.records[1].images.is_empty());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        log.upsert_activity("Inspect roof", "one", Vec::new()).unwrap();
        let table = log.upsert_activity("inspect roof", "two", Vec::new()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_same_name_images_never_overwrite() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        log.upsert_activity("A", "d", vec![photo("same.jpg", 1), photo("same.jpg", 2)])
            .unwrap();
        let table = log.upsert_activity("A", "d", vec![photo("same.jpg", 3)]).unwrap();

        let images = &table.records[0].images;
        assert_eq!(images.len(), 3);
        let mut unique = images.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);

        let contents: Vec<Vec<u8>> = images
            .iter()
            .map(|r| fs::read(project.dir.join(r)).unwrap())
            .collect();
        assert_eq!(contents, vec![vec![1; 16], vec![2; 16], vec![3; 16]]);
    }

    #[test]
    fn test_validation_has_no_side_effects() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);
        log.upsert_activity("Inspect roof", "Visible cracking", vec![photo("photo1.jpg", 1)])
            .unwrap();
        let before = log.load().unwrap();

        let err = log
            .upsert_activity("Inspect roof", "", vec![photo("photo2.jpg", 2)])
            .unwrap_err();
        assert!(matches!(err, LogError::Validation(_)));

        let err = log.upsert_activity("", "desc", Vec::new()).unwrap_err();
        assert!(matches!(err, LogError::Validation(_)));

        assert_eq!(log.load().unwrap(), before);
        assert_eq!(fs::read_dir(&project.image_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_unsupported_upload_rejected_before_writing() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let err = log
            .upsert_activity("A", "d", vec![photo("ok.jpg", 1), photo("notes.txt", 2)])
            .unwrap_err();
        assert!(matches!(err, LogError::Validation(_)));
        assert_eq!(fs::read_dir(&project.image_dir).unwrap().count(), 0);
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_upload_name_is_reduced_to_file_name() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let table = log
            .upsert_activity("A", "d", vec![photo("../../escape.jpg", 1)])
            .unwrap();
        let reference = &table.records[0].images[0];
        assert!(reference.starts_with("imagenes/escape_"));
        assert!(project.dir.join(reference).is_file());
    }

    #[test]
    fn test_upsert_requires_existing_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), "Ghost");

        let err = ActivityLog::new(&project)
            .upsert_activity("A", "d", Vec::new())
            .unwrap_err();
        assert!(matches!(err, LogError::NotFound(_)));
    }

    #[test]
    fn test_scenario_roof_inspection() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let after_first = log
            .upsert_activity("Inspect roof", "Visible cracking", vec![photo("photo1.jpg", 1)])
            .unwrap();

        assert!(log
            .upsert_activity("Inspect roof", "", vec![photo("photo2.jpg", 2)])
            .is_err());
        assert_eq!(log.load().unwrap(), after_first);

        let table = log
            .upsert_activity("Inspect roof", "Visible cracking", vec![photo("photo2.jpg", 2)])
            .unwrap();
        assert_eq!(table.len(), 1);
        let images = &table.records[0].images;
        assert_eq!(images.len(), 2);
        assert!(images[0].starts_with("imagenes/photo1_"));
        assert!(images[1].starts_with("imagenes/photo2_"));
    }

    #[test]
    fn test_comma_in_upload_name_survives_reload() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);

        let table = log
            .upsert_activity("A", "d", vec![photo("roof, north.jpg", 1)])
            .unwrap();
        let images = &table.records[0].images;
        assert_eq!(images.len(), 1);
        assert!(!images[0].contains(','));
        assert!(project.resolve_image(&images[0]).is_some());

        assert_eq!(log.load().unwrap(), table);
    }

    #[test]
    fn test_failed_image_write_removes_earlier_images() {
        let (_dir, project) = setup();
        let log = ActivityLog::new(&project);
        let before = log
            .upsert_activity("A", "d", vec![photo("first.jpg", 1)])
            .unwrap();

        // A file name longer than any filesystem allows fails on write
        let too_long = format!("{}.jpg", "x".repeat(300));
        let err = log
            .upsert_activity("A", "d", vec![photo("second.jpg", 2), photo(&too_long, 3)])
            .unwrap_err();
        assert!(matches!(err, LogError::Io(_)));

        assert_eq!(log.load().unwrap(), before);
        assert_eq!(fs::read_dir(&project.image_dir).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_table_save_removes_new_images() {
        let (dir, project) = setup();
        let log = ActivityLog::new(&project);

        // Dangling link: loads as a missing table, but cannot be written through
        fs::remove_file(&project.table_file).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone").join("t.xlsx"), &project.table_file).unwrap();

        let result = log.upsert_activity("A", "d", vec![photo("a.jpg", 1), photo("b.jpg", 2)]);
        assert!(result.is_err());
        assert_eq!(fs::read_dir(&project.image_dir).unwrap().count(), 0);
    }
}
