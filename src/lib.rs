//! Project activity log with photo attachments.
//!
//! A project is a folder holding an activity table and an image directory.
//! [`ProjectStore`] manages the folders, [`ActivityLog`] records activities
//! in one project's table, and the `export` module renders a PDF report or
//! a ZIP bundle from it.

pub mod config;
pub mod error;
pub mod export;
pub mod state;

pub use config::Config;
pub use error::{LogError, Result};
pub use export::bundle::{render_bundle, write_bundle};
pub use export::report::{render_report, write_report, RenderedReport};
pub use state::data::{ActivityRecord, ImageUpload, Project, Table};
pub use state::log::ActivityLog;
pub use state::project::ProjectStore;
pub use state::trash::{SystemTrash, Trash};
