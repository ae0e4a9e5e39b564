//! CLI binary for bindery.
//!
//! A thin shim over the library crate that maps CLI flags onto a
//! [`Session`] and prints results. The transport concerns a web shell
//! would own (upload handling, download streaming) collapse here to local
//! paths and stdout.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bindery::{
    OutputStore, PipelineStrategy, Session, SubmissionConfig, UploadedFile,
};

#[derive(Parser)]
#[command(
    name = "bindery",
    version,
    about = "Collate PDF and image files into a single PDF"
)]
struct Cli {
    /// Output store directory.
    #[arg(long, global = true, env = "BINDERY_STORE", default_value = "./outputs")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge files into one stored PDF, in the order given.
    Merge {
        /// Input files (PDF or image).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Down-sample embedded raster content.
        #[arg(long)]
        compress: bool,

        /// Sampling density in DPI.
        #[arg(long, default_value_t = 120)]
        density: u32,

        /// JPEG quality (1-100).
        #[arg(long, default_value_t = 20)]
        quality: u32,

        /// Base name for the stored artifact (random when omitted).
        #[arg(long)]
        output: Option<String>,

        /// Pipeline strategy: single-pass convert, or merge then compress.
        #[arg(long, value_parser = parse_strategy, default_value = "convert")]
        strategy: PipelineStrategy,
    },

    /// List stored outputs, newest first.
    List {
        /// Emit the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a first-page preview of one file to an image.
    Preview {
        /// Input file (PDF or image).
        file: PathBuf,

        /// Where to write the preview bytes.
        #[arg(long)]
        out: PathBuf,

        /// Apply compression flags to the preview raster.
        #[arg(long)]
        compress: bool,

        /// Sampling density in DPI.
        #[arg(long, default_value_t = 120)]
        density: u32,

        /// JPEG quality (1-100).
        #[arg(long, default_value_t = 20)]
        quality: u32,
    },

    /// Copy one stored output to a local path.
    Download {
        /// Stored name, with or without the .pdf suffix.
        name: String,

        /// Destination path (defaults to the stored name in the current
        /// directory).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Delete one stored output.
    Delete {
        /// Stored name, with or without the .pdf suffix.
        name: String,
    },

    /// Delete every stored output.
    Clear,
}

fn parse_strategy(s: &str) -> Result<PipelineStrategy, String> {
    match s {
        "convert" => Ok(PipelineStrategy::ConvertOnly),
        "merge" => Ok(PipelineStrategy::MergeThenCompress),
        other => Err(format!("unknown strategy '{other}': use convert | merge")),
    }
}

/// Build an upload record from a local path, sniffing the content type from
/// the file bytes and falling back to the extension.
fn upload_from_path(path: &Path) -> Result<UploadedFile> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a regular file", path.display());
    }

    let content_type = match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.mime_type().to_string(),
        _ => mime_from_extension(path),
    };

    let original_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadedFile {
        original_name,
        content_type,
        size: meta.len(),
        path: path.to_path_buf(),
    })
}

fn mime_from_extension(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Normalise a user-supplied artifact name to the stored form.
fn stored_name(name: &str) -> String {
    if name.ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = OutputStore::open(&cli.store)
        .await
        .with_context(|| format!("opening store at {}", cli.store.display()))?;

    match cli.command {
        Command::Merge {
            files,
            compress,
            density,
            quality,
            output,
            strategy,
        } => {
            let uploads = files
                .iter()
                .map(|p| upload_from_path(p))
                .collect::<Result<Vec<_>>>()?;

            let mut session = Session::with_system_runner(store);
            session.on_upload_set_changed(uploads);

            // Pairing sorts by filename; restore the order the user typed.
            for (position, path) in files.iter().enumerate() {
                let index = session
                    .paired()
                    .iter()
                    .position(|p| p.file.path == *path)
                    .context("paired entry vanished")?;
                session.set_order(index, position as i64 + 1)?;
            }

            let mut builder = SubmissionConfig::builder()
                .compress(compress)
                .image_density(density)
                .quality(quality)
                .strategy(strategy);
            if let Some(name) = output {
                builder = builder.output_name(name);
            }
            let config = builder.build()?;

            let artifact = session.submit(&config).await?;
            println!(
                "{}  {}  ({} inputs)",
                artifact.filename,
                artifact.display_size(),
                files.len()
            );
        }

        Command::List { json } => {
            let session = Session::with_system_runner(store);
            let artifacts = session.list_outputs().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
            } else if artifacts.is_empty() {
                println!("store is empty");
            } else {
                let now = Utc::now();
                for a in &artifacts {
                    println!("{:<40} {:>8}  {}", a.filename, a.display_size(), a.age(now));
                }
            }
        }

        Command::Preview {
            file,
            out,
            compress,
            density,
            quality,
        } => {
            let upload = upload_from_path(&file)?;
            let mut session = Session::with_system_runner(store);
            session.on_upload_set_changed(vec![upload]);

            let config = SubmissionConfig::builder()
                .compress(compress)
                .image_density(density)
                .quality(quality)
                .build()?;

            match session.preview(0, &config).await? {
                Some(bytes) => {
                    std::fs::write(&out, &bytes)
                        .with_context(|| format!("writing {}", out.display()))?;
                    println!("wrote {} ({} bytes)", out.display(), bytes.len());
                }
                None => bail!("{} has no previewable content type", file.display()),
            }
        }

        Command::Download { name, out } => {
            let filename = stored_name(&name);
            let session = Session::with_system_runner(store);
            let mut file = session.download(&filename).await?;
            let dest = out.unwrap_or_else(|| PathBuf::from(&filename));
            let mut dest_file = tokio::fs::File::create(&dest)
                .await
                .with_context(|| format!("creating {}", dest.display()))?;
            let copied = tokio::io::copy(&mut file, &mut dest_file)
                .await
                .with_context(|| format!("writing {}", dest.display()))?;
            println!("wrote {} ({copied} bytes)", dest.display());
        }

        Command::Delete { name } => {
            let session = Session::with_system_runner(store);
            session.delete(&stored_name(&name)).await?;
            println!("deleted {}", stored_name(&name));
        }

        Command::Clear => {
            let session = Session::with_system_runner(store);
            let removed = session.delete_all().await?;
            println!("removed {removed} outputs");
        }
    }

    Ok(())
}
