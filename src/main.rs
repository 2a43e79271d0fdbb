use anyhow::{bail, Context};
use bitacora::state::project::is_image_file;
use bitacora::{
    write_bundle, write_report, ActivityLog, Config, ImageUpload, LogError, ProjectStore,
};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Record project activities with photos, then export them as a PDF report or ZIP bundle
#[derive(Debug, Parser)]
#[command(name = "bitacora", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder that holds one subfolder per project
    #[arg(long, global = true, env = "BITACORA_PROJECTS_DIR")]
    projects_dir: Option<PathBuf>,

    /// Folder where ZIP bundles are written
    #[arg(long, global = true, env = "BITACORA_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a project (does nothing if it already exists)
    Create { name: String },

    /// List saved projects
    List {
        #[arg(long)]
        json: bool,
    },

    /// Move a project and all its files to the trash
    Delete {
        name: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Record an activity, or add photos to an existing one
    Add {
        project: String,
        activity: String,
        description: String,
        /// Photo to attach (png, jpg, jpeg); repeatable
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
    },

    /// Show a project's activities and photos
    Show {
        project: String,
        #[arg(long)]
        json: bool,
    },

    /// Generate the PDF report in the project folder
    Report { project: String },

    /// Generate a ZIP bundle of the table and photos
    Bundle { project: String },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.projects_dir, cli.cache_dir);
    let store = ProjectStore::open(&config.projects_dir)
        .with_context(|| format!("Cannot open projects folder {}", config.projects_dir.display()))?;

    match cli.command {
        Command::Create { name } => {
            let project = store.create_project(&name)?;
            println!("✅ Project '{}' ready at {}", project.name, project.dir.display());
        }
        Command::List { json } => {
            let projects = store.list_projects()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("⚠️  No saved projects.");
            } else {
                for project in projects {
                    println!("{}", project.name);
                }
            }
        }
        Command::Delete { name, yes } => {
            if !yes {
                bail!("Refusing to delete '{}' without --yes", name);
            }
            store.delete_project(&name)?;
            println!("🗑️  Project '{}' moved to the trash.", name);
        }
        Command::Add {
            project,
            activity,
            description,
            images,
        } => {
            let project = store.open_project(&project)?;
            let mut uploads = Vec::with_capacity(images.len());
            for path in &images {
                if !is_image_file(path) {
                    return Err(LogError::Validation(format!(
                        "{} is not a png, jpg or jpeg file",
                        path.display()
                    ))
                    .into());
                }
                uploads.push(
                    ImageUpload::from_path(path)
                        .with_context(|| format!("Cannot read {}", path.display()))?,
                );
            }

            let table = ActivityLog::new(&project).upsert_activity(&activity, &description, uploads)?;
            println!(
                "✅ Activity '{}' saved ({} activities in '{}').",
                activity,
                table.len(),
                project.name
            );
        }
        Command::Show { project, json } => {
            let project = store.open_project(&project)?;
            let table = ActivityLog::new(&project).load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table.records)?);
                return Ok(());
            }

            println!("## Project: {}", project.name);
            for record in table.iter() {
                println!("{}  {}", record.timestamp, record.activity);
                println!("    {}", record.description);
            }
            let images = store.project_images(&project)?;
            if !images.is_empty() {
                println!("### 📷 {} images", images.len());
                for image in images {
                    println!("    {}", image.display());
                }
            }
        }
        Command::Report { project } => {
            let project = store.open_project(&project)?;
            let table = ActivityLog::new(&project).load()?;
            let (path, report) = write_report(&project, &table)?;
            for missing in &report.missing_assets {
                eprintln!("⚠️  Missing image: {}", missing);
            }
            println!("✅ PDF report generated: {}", path.display());
        }
        Command::Bundle { project } => {
            let project = store.open_project(&project)?;
            let path = write_bundle(&project, &config.cache_dir, None)?;
            println!("✅ Bundle generated: {}", path.display());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_collects_repeated_images() {
        let cli = Cli::try_parse_from([
            "bitacora", "add", "Site-A", "Inspect roof", "Visible cracking", "-i", "a.jpg", "--image", "b.png",
        ])
        .unwrap();
        match cli.command {
            Command::Add { images, .. } => {
                assert_eq!(images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let projects = dir.path().join("projects");
        let cli = Cli::try_parse_from([
            "bitacora",
            "--projects-dir",
            projects.to_str().unwrap(),
            "delete",
            "Site-A",
        ])
        .unwrap();
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }
}
