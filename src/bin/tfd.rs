use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tfdigest::{
    config::Config,
    email::{EmailContext, ROLE_PRESETS},
    extract::{SUPPORTED_EXTENSIONS, Upload},
    logging,
    service::{DigestApi, DigestService, EmailRequest, IngestRequest, resolve_outline},
    templates,
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "tfd",
    about = "Operator CLI for the tf-digest meeting document store"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a file, or every supported file under a directory, into a project.
    Ingest {
        path: PathBuf,
        #[arg(long)]
        project: String,
        /// Catalog template name.
        #[arg(long)]
        template: Option<String>,
        /// File holding a custom outline; wins over --template.
        #[arg(long)]
        outline_file: Option<PathBuf>,
        #[arg(long)]
        instructions: Option<String>,
        /// Push each summary to the knowledge index.
        #[arg(long)]
        publish: bool,
    },
    /// List project names.
    Projects,
    /// Document counts per project and workspace totals.
    Overview,
    /// List the records of a project, newest first.
    List {
        project: String,
        /// Show only the most recent records.
        #[arg(long)]
        recent: bool,
        /// Print full record contents.
        #[arg(long)]
        full: bool,
    },
    /// Delete one record, or a whole project with --all.
    Delete {
        project: String,
        /// Generated name of the record, e.g. 2024-05-02_sync_1.
        document: Option<String>,
        /// Position in file-name order instead of a generated name.
        #[arg(long, conflicts_with = "document")]
        index: Option<usize>,
        #[arg(long, conflicts_with_all = ["document", "index"])]
        all: bool,
    },
    /// Compose an email from every record of a project.
    Email {
        project: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        organization: String,
        #[arg(long, default_value = "")]
        organization_role: String,
        #[arg(long, default_value = "")]
        recipient: String,
        /// Free text or a preset: Marketer, Designer, Engineer, Project Manager.
        #[arg(long, default_value = "")]
        role: String,
        /// Post the email to the chat channel.
        #[arg(long)]
        notify: bool,
    },
    /// List built-in templates and role presets.
    Templates,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;
    logging::init_tracing("warn");
    config.log_summary();
    let service = DigestService::new(&config);

    match cli.command {
        Command::Ingest {
            path,
            project,
            template,
            outline_file,
            instructions,
            publish,
        } => {
            let custom = outline_file
                .map(|file| {
                    fs::read_to_string(&file)
                        .with_context(|| format!("failed to read {}", file.display()))
                })
                .transpose()?;
            let outline = resolve_outline(template.as_deref(), custom.as_deref())?;
            ingest_path(
                &service,
                &path,
                &project,
                &outline,
                instructions.as_deref(),
                publish,
            )
            .await
        }
        Command::Projects => {
            for project in service.list_projects()? {
                println!("{project}");
            }
            Ok(())
        }
        Command::Overview => {
            let overview = service.overview()?;
            for project in &overview.projects {
                let latest = project
                    .latest_update
                    .map(|instant| instant.date().to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<24} {:>4} documents  last update {latest}",
                    project.name, project.document_count
                );
            }
            println!(
                "{} projects, {} documents, {:.1} per project",
                overview.projects.len(),
                overview.total_documents,
                overview.average_documents
            );
            Ok(())
        }
        Command::List {
            project,
            recent,
            full,
        } => {
            let records = if recent {
                service.recent_documents(&project)?
            } else {
                service.documents(&project)?
            };
            for record in records {
                println!(
                    "{}  {}  ({})",
                    record.generated_filename, record.original_filename, record.date
                );
                if full {
                    println!("{}\n", record.content);
                }
            }
            Ok(())
        }
        Command::Delete {
            project,
            document,
            index,
            all,
        } => {
            let deleted = match (document, index) {
                (Some(document), _) => service.delete_document(&project, &document)?,
                (None, Some(index)) => service.store().delete_at(&project, index)?,
                (None, None) if all => service.delete_project(&project)?,
                (None, None) => bail!("name a document, pass --index, or pass --all"),
            };
            if !deleted {
                bail!("nothing matched in project '{project}'");
            }
            println!("deleted");
            Ok(())
        }
        Command::Email {
            project,
            subject,
            organization,
            organization_role,
            recipient,
            role,
            notify,
        } => {
            let outcome = service
                .compose_email(EmailRequest {
                    project,
                    context: EmailContext {
                        meeting_subject: subject,
                        organization,
                        organization_role,
                        recipient_name: recipient,
                        recipient_role: role,
                    },
                    notify,
                })
                .await?;
            println!("{}", outcome.email);
            if let Some(report) = outcome.notification {
                eprintln!("notification: {}", report.message);
            }
            Ok(())
        }
        Command::Templates => {
            for template in templates::entries() {
                println!("{:<20} {}", template.name, template.title);
            }
            println!();
            for (name, description) in ROLE_PRESETS {
                println!("{name:<20} {description}");
            }
            Ok(())
        }
    }
}

async fn ingest_path(
    service: &DigestService,
    path: &Path,
    project: &str,
    outline: &str,
    instructions: Option<&str>,
    publish: bool,
) -> Result<()> {
    let files = collect_files(path)?;
    if files.is_empty() {
        bail!("no supported files found under {}", path.display());
    }

    for file in files {
        let bytes = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let outcome = service
            .ingest(IngestRequest {
                project: project.to_string(),
                upload: Upload::new(filename, None, bytes),
                outline: outline.to_string(),
                instructions: instructions.map(str::to_string),
                publish,
            })
            .await?;
        println!(
            "{} -> {} ({:?})",
            file.display(),
            outcome.generated_name,
            outcome.summary_kind
        );
        if let Some(report) = outcome.publish {
            println!("  publish: {}", report.message);
        }
    }
    Ok(())
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let dotted = format!(".{}", extension.to_ascii_lowercase());
    SUPPORTED_EXTENSIONS.contains(&dotted.as_str())
}
