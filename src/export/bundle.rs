/// ZIP bundle generation
///
/// A bundle holds the project's activity table at the archive root and
/// every file under its image directory, with paths relative to the
/// project folder (`actividades.xlsx`, `imagenes/...`).
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{LogError, Result};
use crate::state::data::{Project, Table, TABLE_FILE_NAME};
use crate::state::sheet;

/// Archive entry name for a file inside the project folder
fn entry_name(project: &Project, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(&project.dir).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Build the bundle in memory.
///
/// With `Some(table)` the table entry is encoded from that table; with
/// `None` the table file on disk is copied as-is, if there is one.
pub fn render_bundle(project: &Project, table: Option<&Table>) -> Result<Vec<u8>> {
    if !project.dir.is_dir() {
        return Err(LogError::NotFound(project.name.clone()));
    }

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        match table {
            Some(table) => {
                zip.start_file(TABLE_FILE_NAME, options)?;
                zip.write_all(&sheet::table_bytes(table)?)?;
            }
            None if project.table_file.is_file() => {
                zip.start_file(TABLE_FILE_NAME, options)?;
                let mut file = File::open(&project.table_file)?;
                std::io::copy(&mut file, &mut zip)?;
            }
            None => debug!("No table file for '{}'", project.name),
        }

        let mut image_count = 0;
        if project.image_dir.is_dir() {
            // Walk the image directory tree recursively; links are not followed
            for entry in WalkDir::new(&project.image_dir).follow_links(false) {
                let entry = entry.map_err(std::io::Error::from)?;
                let path = entry.path();

                // Only files; directories are implied by the entry names
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(name) = entry_name(project, path) else {
                    continue;
                };

                zip.start_file(name, options)?;
                let mut file = File::open(path)?;
                std::io::copy(&mut file, &mut zip)?;
                image_count += 1;
            }
        }

        zip.finish()?;
        debug!("Bundled {} image files for '{}'", image_count, project.name);
    }

    Ok(cursor.into_inner())
}

/// Build the bundle and write it as `<cache_dir>/<project>.zip`.
///
/// The cache directory must lie outside the project folder, otherwise a
/// later bundle would contain the earlier one.
pub fn write_bundle(project: &Project, cache_dir: &Path, table: Option<&Table>) -> Result<PathBuf> {
    let path = project.bundle_file(cache_dir);
    if path.starts_with(&project.dir) {
        return Err(LogError::Validation(format!(
            "bundle directory {} is inside the project folder",
            cache_dir.display()
        )));
    }

    let bytes = render_bundle(project, table)?;
    fs::create_dir_all(cache_dir)?;
    fs::write(&path, &bytes)?;

    info!("Generated bundle {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
