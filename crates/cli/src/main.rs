use clap::{Parser, Subcommand};
use std::path::PathBuf;
use upload_core::{AuditLogger, FileStore, UploadConfig};

#[derive(Parser)]
#[command(name = "ehr-upload")]
#[command(about = "Inspect stored EHR uploads and their audit log")]
struct Cli {
    /// Uploads directory
    #[arg(
        long,
        global = true,
        env = "UPLOADS_DIR",
        default_value = upload_core::DEFAULT_UPLOADS_DIR
    )]
    uploads_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print audit log entries
    Log {
        /// Only show uploads from this EHR system
        #[arg(long)]
        ehr_system: Option<String>,
    },
    /// List stored files
    Files,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = UploadConfig::with_uploads_dir(cli.uploads_dir);

    match cli.command {
        Commands::Log { ehr_system } => {
            let entries = AuditLogger::new(cfg.audit_log_path()).read_entries()?;
            let matching: Vec<_> = entries
                .into_iter()
                .filter(|e| ehr_system.as_deref().map_or(true, |s| e.ehr_system == s))
                .collect();

            if matching.is_empty() {
                println!("No uploads logged.");
            }
            for entry in matching {
                println!("{}", entry);
            }
        }
        Commands::Files => {
            let files = FileStore::new(cfg.uploads_dir()).list()?;
            if files.is_empty() {
                println!("No files stored.");
            }
            for file in files {
                println!("{:>10}  {}", file.size_bytes, file.filename);
            }
        }
    }

    Ok(())
}
