use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use medchain_types::{Digest, ForgeryStatus, SnapshotId};

#[derive(Parser)]
#[command(
    name = "medchain",
    about = "Tamper-evident ledger of treatment records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory; overrides the configuration file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the data directory and an empty ledger
    Init(InitArgs),
    /// Append a treatment record
    Append(AppendArgs),
    /// Show one block
    Show(ShowArgs),
    /// Show the most recent blocks
    Log(LogArgs),
    /// Verify chain integrity, stopping at the first break
    Verify,
    /// List every integrity violation
    Audit,
    /// Show ledger statistics
    Stats,
    /// Back up the current chain
    Backup(BackupArgs),
    /// List backups
    Backups,
    /// Replace the chain with a backup
    Rollback(RollbackArgs),
    /// Write the chain to a JSON file
    Export(ExportArgs),
    /// Append records from a JSON array of payloads
    Import(ImportArgs),
    /// Look up blocks by hash, patient or doctor
    Find(FindArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Also write the effective configuration to this TOML file
    #[arg(long)]
    pub write_config: Option<PathBuf>,
}

#[derive(Args)]
pub struct AppendArgs {
    #[arg(long)]
    pub patient: String,
    #[arg(long)]
    pub doctor: String,
    #[arg(long)]
    pub disease: String,
    #[arg(long, default_value = "")]
    pub symptoms: String,
    #[arg(long)]
    pub medicine: String,
    #[arg(long)]
    pub dosage: String,
    #[arg(long)]
    pub duration: String,
    #[arg(long)]
    pub prescription_file: Option<String>,
    /// Forgery classification of the prescription
    #[arg(long, default_value = "original")]
    pub status: ForgeryStatus,
    /// Classifier confidence, in percent
    #[arg(long, default_value = "100")]
    pub confidence: f64,
}

#[derive(Args)]
pub struct ShowArgs {
    pub index: u64,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct BackupArgs {
    #[arg(short, long, default_value = "manual")]
    pub label: String,
}

#[derive(Args)]
pub struct RollbackArgs {
    pub id: SnapshotId,
}

#[derive(Args)]
pub struct ExportArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ImportArgs {
    pub path: PathBuf,
}

#[derive(Args)]
#[command(group(ArgGroup::new("by").required(true).args(["hash", "patient", "doctor"])))]
pub struct FindArgs {
    #[arg(long)]
    pub hash: Option<Digest>,
    #[arg(long)]
    pub patient: Option<String>,
    #[arg(long)]
    pub doctor: Option<String>,
}
