/// State management module
///
/// This module handles everything stored on disk:
/// - Project folders and their lifecycle (project.rs)
/// - Shared data structures (data.rs)
/// - The per-project activity table (log.rs, sheet.rs)
/// - Handing deleted projects to the OS trash (trash.rs)

pub mod data;
pub mod log;
pub mod project;
pub mod sheet;
pub mod trash;
